//! Finalizer helpers.

use kube::{Api, Resource, ResourceExt, api::PatchParams};
use serde::de::DeserializeOwned;

use crate::controller::error::Error;

/// Add a finalizer to a resource.
pub async fn add_finalizer<T>(api: &Api<T>, name: &str, finalizer: &str) -> Result<(), Error>
where
    T: Resource + Clone + DeserializeOwned + std::fmt::Debug,
    <T as Resource>::DynamicType: Default,
{
    let resource = api.get(name).await?;
    let mut finalizers = resource.finalizers().to_vec();

    if !finalizers.iter().any(|f| f == finalizer) {
        finalizers.push(finalizer.to_string());
        patch_finalizers(api, name, &resource, finalizers).await?;
    }
    Ok(())
}

/// Remove a specific finalizer from a resource.
///
/// A resource that is already gone counts as done.
pub async fn remove_finalizer<T>(api: &Api<T>, name: &str, finalizer: &str) -> Result<(), Error>
where
    T: Resource + Clone + DeserializeOwned + std::fmt::Debug,
    <T as Resource>::DynamicType: Default,
{
    let resource = match api.get_opt(name).await? {
        Some(r) => r,
        None => return Ok(()),
    };

    let mut finalizers = resource.finalizers().to_vec();
    if let Some(pos) = finalizers.iter().position(|f| f == finalizer) {
        finalizers.remove(pos);
        patch_finalizers(api, name, &resource, finalizers).await?;
    }
    Ok(())
}

/// Merge-patch the finalizer list, guarded by the resourceVersion it was read at.
async fn patch_finalizers<T>(
    api: &Api<T>,
    name: &str,
    resource: &T,
    finalizers: Vec<String>,
) -> Result<(), Error>
where
    T: Resource + Clone + DeserializeOwned + std::fmt::Debug,
    <T as Resource>::DynamicType: Default,
{
    let patch = serde_json::json!({
        "metadata": {
            "resourceVersion": resource.resource_version(),
            "finalizers": finalizers
        }
    });
    api.patch(
        name,
        &PatchParams::default(),
        &kube::api::Patch::Merge(&patch),
    )
    .await?;
    Ok(())
}
