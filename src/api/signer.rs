//! Request signing for the search-ads API.
//!
//! Every call carries `X-Timestamp`, `X-API-KEY`, `X-Customer` and
//! `X-Signature`, where the signature is
//! `base64(HMAC-SHA256(secret, "{timestamp}.{METHOD}.{path}"))`.
//! The path is the resource path only, without the query string.

use crate::config::AdsConfig;
use crate::error::ApiError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Complete set of ads credentials. Built only when all three are present.
#[derive(Debug, Clone)]
pub struct AdsCredentials {
    pub customer_id: String,
    pub access_license: String,
    pub secret_key: String,
}

impl AdsCredentials {
    pub fn from_config(cfg: &AdsConfig) -> Option<Self> {
        let pick = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some(Self {
            customer_id: pick(&cfg.customer_id)?,
            access_license: pick(&cfg.access_license)?,
            secret_key: pick(&cfg.secret_key)?,
        })
    }

    /// Names of the settings that are missing, for the operator.
    pub fn missing(cfg: &AdsConfig) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        let mut out = Vec::new();
        if blank(&cfg.customer_id) {
            out.push("CUSTOMER_ID");
        }
        if blank(&cfg.access_license) {
            out.push("ACCESS_LICENSE");
        }
        if blank(&cfg.secret_key) {
            out.push("SECRET_KEY");
        }
        out
    }
}

pub fn signature(timestamp: &str, method: &str, path: &str, secret: &str) -> Result<String, ApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Signing(format!("invalid secret key: {}", e)))?;
    mac.update(format!("{}.{}.{}", timestamp, method, path).as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn signed_headers(
    creds: &AdsCredentials,
    method: &str,
    path: &str,
    timestamp_ms: i64,
) -> Result<Vec<(&'static str, String)>, ApiError> {
    let timestamp = timestamp_ms.to_string();
    let sig = signature(&timestamp, method, path, &creds.secret_key)?;
    Ok(vec![
        ("X-Timestamp", timestamp),
        ("X-API-KEY", creds.access_license.clone()),
        ("X-Customer", creds.customer_id.clone()),
        ("X-Signature", sig),
    ])
}
