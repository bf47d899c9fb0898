pub mod http_client;
pub mod signer;

use crate::config::{AdsConfig, ShoppingConfig};
use crate::error::ApiError;
use crate::models::{KeywordToolResponse, ShopSearchPage};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use url::Url;

use self::http_client::HttpClient;
use self::signer::{AdsCredentials, signed_headers};

// ── Source traits ─────────────────────────────────────────────────────────────

/// Paged product search.
#[async_trait]
pub trait ShoppingSource: Send + Sync {
    async fn search_page(
        &self,
        query: &str,
        start: u32,
        display: u32,
        sort: &str,
    ) -> Result<ShopSearchPage, ApiError>;
}

/// Related-keyword statistics lookup; returns raw, loosely typed records.
#[async_trait]
pub trait KeywordToolSource: Send + Sync {
    async fn keyword_tool(&self, hints: &[String]) -> Result<Vec<Value>, ApiError>;
}

// ── Shopping search ───────────────────────────────────────────────────────────

pub struct NaverShoppingClient {
    client: HttpClient,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl NaverShoppingClient {
    pub fn new(config: &ShoppingConfig) -> Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::MissingCredentials("NAVER_CLIENT_ID".into()))?;
        let client_secret = config
            .client_secret
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::MissingCredentials("NAVER_CLIENT_SECRET".into()))?;

        Ok(Self {
            client: HttpClient::new(&config.user_agent, config.timeout_secs)?,
            base_url: config.base_url.clone(),
            client_id,
            client_secret,
        })
    }

    fn page_url(&self, query: &str, start: u32, display: u32, sort: &str) -> Result<Url, ApiError> {
        let display = display.to_string();
        let start = start.to_string();
        let mut params = vec![
            ("query", query),
            ("display", display.as_str()),
            ("start", start.as_str()),
        ];
        if !sort.is_empty() {
            params.push(("sort", sort));
        }
        Ok(Url::parse_with_params(&self.base_url, &params)?)
    }
}

#[async_trait]
impl ShoppingSource for NaverShoppingClient {
    async fn search_page(
        &self,
        query: &str,
        start: u32,
        display: u32,
        sort: &str,
    ) -> Result<ShopSearchPage, ApiError> {
        let url = self.page_url(query, start, display, sort)?;
        let headers = [
            ("X-Naver-Client-Id", self.client_id.clone()),
            ("X-Naver-Client-Secret", self.client_secret.clone()),
        ];
        let page: ShopSearchPage = self.client.get_json(&url, &headers).await?;
        debug!("{} start={}: {} items", query, start, page.items.len());
        Ok(page)
    }
}

// ── Search-ads keyword tool ───────────────────────────────────────────────────

pub struct NaverAdsClient {
    client: HttpClient,
    base_url: String,
    path: String,
    credentials: AdsCredentials,
}

impl NaverAdsClient {
    pub fn new(config: &AdsConfig, credentials: AdsCredentials, user_agent: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(user_agent, timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            path: config.path.clone(),
            credentials,
        })
    }

    fn tool_url(&self, hints: &[String]) -> Result<Url, ApiError> {
        let joined = hints.join(",");
        Ok(Url::parse_with_params(
            &format!("{}{}", self.base_url, self.path),
            &[("hintKeywords", joined.as_str()), ("showDetail", "1")],
        )?)
    }
}

#[async_trait]
impl KeywordToolSource for NaverAdsClient {
    async fn keyword_tool(&self, hints: &[String]) -> Result<Vec<Value>, ApiError> {
        if hints.is_empty() {
            return Err(ApiError::InvalidInput("no hint keywords given".into()));
        }

        let url = self.tool_url(hints)?;
        let headers = signed_headers(
            &self.credentials,
            "GET",
            &self.path,
            Utc::now().timestamp_millis(),
        )?;

        let resp: KeywordToolResponse = self.client.get_json(&url, &headers).await?;
        let records = resp.keyword_list.unwrap_or_default();
        debug!("keywordstool {:?}: {} records", hints, records.len());
        Ok(records)
    }
}
