//! TC3-HMAC-SHA256 request signing for Tencent Cloud APIs.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::cloud_api::Credential;
use super::error::CloudError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "TC3-HMAC-SHA256";
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host";

fn hmac_sha256(key: &[u8], message: &str) -> Result<Vec<u8>, CloudError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| CloudError::InvalidRequest(format!("signing key rejected: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

/// Compute the `Authorization` header for a POST of `payload` to `host`.
///
/// `date` is the UTC calendar date (`YYYY-MM-DD`) of `timestamp`.
pub fn authorization(
    credential: &Credential,
    service: &str,
    host: &str,
    payload: &str,
    timestamp: i64,
    date: &str,
) -> Result<String, CloudError> {
    let canonical_request = format!(
        "POST\n/\n\ncontent-type:{}\nhost:{}\n\n{}\n{}",
        CONTENT_TYPE,
        host,
        SIGNED_HEADERS,
        sha256_hex(payload)
    );

    let credential_scope = format!("{}/{}/tc3_request", date, service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        timestamp,
        credential_scope,
        sha256_hex(&canonical_request)
    );

    let secret_date = hmac_sha256(
        format!("TC3{}", credential.access_key_secret).as_bytes(),
        date,
    )?;
    let secret_service = hmac_sha256(&secret_date, service)?;
    let secret_signing = hmac_sha256(&secret_service, "tc3_request")?;
    let signature = hex::encode(hmac_sha256(&secret_signing, &string_to_sign)?);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credential.access_key_id, credential_scope, SIGNED_HEADERS, signature
    ))
}
