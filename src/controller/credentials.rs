//! Credential resolution for the cloud API.

use std::sync::Arc;

use crate::client::{CloudApi, CloudConnector, Credential};
use crate::controller::error::{Error, Result};
use crate::controller::store::SecretStore;

/// Secret key holding the access key ID.
pub const ACCESS_KEY_ID_KEY: &str = "tkecredentialConfig-accessKeyId";
/// Secret key holding the access key secret.
pub const ACCESS_KEY_SECRET_KEY: &str = "tkecredentialConfig-accessKeySecret";

/// Split a `namespace:name` reference on its first `:`.
///
/// A bare `name` resolves in `default_namespace`.
pub fn parse_reference<'a>(reference: &'a str, default_namespace: &'a str) -> (&'a str, &'a str) {
    match reference.split_once(':') {
        Some((namespace, name)) => (namespace, name),
        None => (default_namespace, reference),
    }
}

/// Region to talk to, falling back to `default_region` when unset.
pub fn effective_region<'a>(region: &'a str, default_region: &'a str) -> &'a str {
    if region.is_empty() { default_region } else { region }
}

/// Load the access key pair named by `reference`.
pub async fn load_credential(
    secrets: &dyn SecretStore,
    reference: &str,
    default_namespace: &str,
) -> Result<Credential> {
    if reference.is_empty() {
        return Err(Error::Validation(
            "error while getting tkeCredentialSecret".to_string(),
        ));
    }

    let (namespace, name) = parse_reference(reference, default_namespace);
    let secret = secrets
        .get_secret(namespace, name)
        .await?
        .ok_or_else(|| Error::Credential(format!("secret {}/{} not found", namespace, name)))?;

    let data = secret.data.unwrap_or_default();
    let value = |key: &str| -> Result<String> {
        data.get(key)
            .map(|bytes| String::from_utf8_lossy(&bytes.0).into_owned())
            .ok_or_else(|| Error::Credential(format!("secret {}/{} has no {}", namespace, name, key)))
    };

    Ok(Credential {
        access_key_id: value(ACCESS_KEY_ID_KEY)?,
        access_key_secret: value(ACCESS_KEY_SECRET_KEY)?,
    })
}

/// Build a cloud API handle for a config's credential and region.
pub async fn connect(
    secrets: &dyn SecretStore,
    connector: &dyn CloudConnector,
    reference: &str,
    region: &str,
    default_namespace: &str,
    default_region: &str,
) -> Result<Arc<dyn CloudApi>> {
    let credential = load_credential(secrets, reference, default_namespace).await?;
    Ok(connector.connect(&credential, effective_region(region, default_region))?)
}
