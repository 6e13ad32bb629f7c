//! Presigned upload URLs for client-side uploads.
//!
//! The service never proxies large uploads itself; clients receive a
//! time-limited PUT URL for the configured bucket. Signing follows the
//! S3-compatible SigV4 query-string scheme (HMAC-SHA256), which object stores
//! such as MinIO and the GCS interop layer accept.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

use crate::config::UploadsConfig;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("uploads are not configured: {0}")]
    Config(String),
}

/// Capability for handing out signed upload URLs.
pub trait UploadSigner: Send + Sync {
    /// A URL a client can PUT `object_name` to until the TTL expires.
    fn signed_upload_url(&self, object_name: &str) -> Result<String, SignerError>;
}

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// SigV4 presigner for a single configured bucket.
pub struct SigV4Signer {
    endpoint: String,
    host: String,
    bucket: String,
    region: String,
    access_key: String,
    secret_key: String,
    ttl: Duration,
}

impl SigV4Signer {
    /// Build from config. Every missing field is named so the operator can
    /// fix the configuration in one pass.
    pub fn from_config(config: &UploadsConfig) -> Result<Self, SignerError> {
        let mut missing = Vec::new();
        if config.endpoint.is_none() {
            missing.push("uploads.endpoint");
        }
        if config.bucket.is_none() {
            missing.push("uploads.bucket");
        }
        if config.access_key.is_none() {
            missing.push("uploads.access_key");
        }
        if config.secret_key.is_none() {
            missing.push("uploads.secret_key");
        }
        if !missing.is_empty() {
            return Err(SignerError::Config(missing.join(", ")));
        }

        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();
        let host = endpoint
            .strip_prefix("https://")
            .or_else(|| endpoint.strip_prefix("http://"))
            .unwrap_or(&endpoint)
            .to_string();

        Ok(Self {
            endpoint,
            host,
            bucket: config.bucket.clone().unwrap_or_default(),
            region: config.region.clone(),
            access_key: config.access_key.clone().unwrap_or_default(),
            secret_key: config.secret_key.clone().unwrap_or_default(),
            ttl: Duration::from_secs(config.url_ttl_secs),
        })
    }

    /// Presign at an explicit instant. Split out so tests are deterministic.
    fn presign_at(&self, object_name: &str, now: DateTime<Utc>) -> String {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let datestamp = now.format("%Y%m%d").to_string();
        let scope = format!("{datestamp}/{}/{SERVICE}/aws4_request", self.region);

        let canonical_uri = format!(
            "/{}/{}",
            uri_encode(&self.bucket, false),
            uri_encode(object_name, false)
        );

        // Query parameters in canonical (sorted) order.
        let credential = uri_encode(&format!("{}/{scope}", self.access_key), true);
        let canonical_query = format!(
            "X-Amz-Algorithm={ALGORITHM}\
             &X-Amz-Credential={credential}\
             &X-Amz-Date={amz_date}\
             &X-Amz-Expires={}\
             &X-Amz-SignedHeaders=host",
            self.ttl.as_secs()
        );

        let canonical_request = format!(
            "PUT\n{canonical_uri}\n{canonical_query}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
            self.host
        );

        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let date_key = hmac_sign(
            format!("AWS4{}", self.secret_key).as_bytes(),
            datestamp.as_bytes(),
        );
        let region_key = hmac_sign(&date_key, self.region.as_bytes());
        let service_key = hmac_sign(&region_key, SERVICE.as_bytes());
        let signing_key = hmac_sign(&service_key, b"aws4_request");
        let signature = hex::encode(hmac_sign(&signing_key, string_to_sign.as_bytes()));

        format!(
            "{}{canonical_uri}?{canonical_query}&X-Amz-Signature={signature}",
            self.endpoint
        )
    }
}

impl UploadSigner for SigV4Signer {
    fn signed_upload_url(&self, object_name: &str) -> Result<String, SignerError> {
        Ok(self.presign_at(object_name, Utc::now()))
    }
}

fn hmac_sign(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Percent-encode per the SigV4 rules: unreserved characters pass through,
/// everything else is encoded; `/` only when `encode_slash` is set.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
