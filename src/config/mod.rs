use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub shopping: ShoppingConfig,
    #[serde(default)]
    pub ads: AdsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Naver shopping search (open API) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShoppingConfig {
    #[serde(default = "default_shopping_url")]
    pub base_url: String,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    /// `display` parameter; the API caps it at 100.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Highest `start` offset the scanner will request.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    #[serde(default = "default_sort")]
    pub sort: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Naver search-ads keyword tool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdsConfig {
    #[serde(default = "default_ads_url")]
    pub base_url: String,

    #[serde(default = "default_ads_path")]
    pub path: String,

    #[serde(default)]
    pub customer_id: Option<String>,

    #[serde(default)]
    pub access_license: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,

    /// Pause between keywords so the shopping API does not throttle us.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_related_limit")]
    pub related_limit: usize,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_shopping_url() -> String {
    "https://openapi.naver.com/v1/search/shop.json".to_string()
}
fn default_page_size() -> u32 {
    100
}
fn default_max_results() -> u32 {
    1000
}
fn default_sort() -> String {
    "sim".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "naver-rank/0.1".to_string()
}
fn default_ads_url() -> String {
    "https://api.naver.com".to_string()
}
fn default_ads_path() -> String {
    "/keywordstool".to_string()
}
fn default_max_keywords() -> usize {
    10
}
fn default_request_delay_ms() -> u64 {
    200
}
fn default_related_limit() -> usize {
    50
}

impl Default for ShoppingConfig {
    fn default() -> Self {
        Self {
            base_url: default_shopping_url(),
            client_id: None,
            client_secret: None,
            page_size: default_page_size(),
            max_results: default_max_results(),
            sort: default_sort(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            base_url: default_ads_url(),
            path: default_ads_path(),
            customer_id: None,
            access_license: None,
            secret_key: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_keywords: default_max_keywords(),
            request_delay_ms: default_request_delay_ms(),
            related_limit: default_related_limit(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("NAVER_RANK").separator("__"))
            .build()
            .context("Failed to assemble configuration sources")?;

        let mut app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        app_cfg.apply_legacy_env(|key| env::var(key).ok());
        Ok(app_cfg)
    }

    /// Plain variable names used by existing deployments' `.env` files.
    fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |slot: &mut Option<String>, key: &str| {
            if let Some(v) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = Some(v);
            }
        };
        set(&mut self.shopping.client_id, "NAVER_CLIENT_ID");
        set(&mut self.shopping.client_secret, "NAVER_CLIENT_SECRET");
        set(&mut self.ads.customer_id, "CUSTOMER_ID");
        set(&mut self.ads.access_license, "ACCESS_LICENSE");
        set(&mut self.ads.secret_key, "SECRET_KEY");
    }
}

/// Show only the first few characters of a credential.
pub fn mask_secret(value: Option<&str>) -> String {
    match value {
        None => "(unset)".to_string(),
        Some(v) if v.trim().is_empty() => "(unset)".to_string(),
        Some(v) => {
            let head: String = v.chars().take(4).collect();
            format!("{}****", head)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_api_limits() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.shopping.page_size, 100);
        assert_eq!(cfg.shopping.max_results, 1000);
        assert_eq!(cfg.ads.path, "/keywordstool");
        assert_eq!(cfg.pipeline.max_keywords, 10);
        assert_eq!(cfg.pipeline.request_delay_ms, 200);
    }

    #[test]
    fn test_legacy_env_overrides_blank_ignored() {
        let vars: HashMap<&str, &str> = [
            ("NAVER_CLIENT_ID", "cid"),
            ("CUSTOMER_ID", "1234"),
            ("SECRET_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppConfig::default();
        cfg.ads.secret_key = Some("from-file".into());
        cfg.apply_legacy_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.shopping.client_id.as_deref(), Some("cid"));
        assert_eq!(cfg.ads.customer_id.as_deref(), Some("1234"));
        assert_eq!(cfg.ads.secret_key.as_deref(), Some("from-file"));
        assert!(cfg.ads.access_license.is_none());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(None), "(unset)");
        assert_eq!(mask_secret(Some("")), "(unset)");
        assert_eq!(mask_secret(Some("abcdefgh")), "abcd****");
        assert_eq!(mask_secret(Some("ab")), "ab****");
    }
}
