use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Shopping search ───────────────────────────────────────────────────────────

/// One page of `/v1/search/shop.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopSearchPage {
    #[serde(default)]
    pub items: Vec<ProductListing>,
}

/// A product as returned by the shopping API. `title` still carries the
/// `<b>` highlight tags around the query terms.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub lprice: String,
    #[serde(default)]
    pub mall_name: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category1: String,
    #[serde(default)]
    pub category2: String,
    #[serde(default)]
    pub category3: String,
    #[serde(default)]
    pub category4: String,
}

impl ProductListing {
    /// Non-empty categories joined by a space.
    pub fn categories(&self) -> String {
        [&self.category1, &self.category2, &self.category3, &self.category4]
            .iter()
            .filter(|c| !c.trim().is_empty())
            .map(|c| c.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Best-ranked listing of a seller for one keyword.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankResult {
    pub keyword: String,
    /// 1-based position across all fetched pages.
    pub rank: u32,
    pub title: String,
    pub price: String,
    pub link: String,
    pub mall_name: String,
    pub category: String,
}

impl RankResult {
    /// Lowest price as a number; the API sends it as a string.
    pub fn price_value(&self) -> Option<u64> {
        self.price.trim().replace(',', "").parse().ok()
    }
}

// ── Search-ads keyword tool ───────────────────────────────────────────────────

/// `/keywordstool` response. Records are kept loosely typed: the API mixes
/// numbers, numeric strings and sentinels like `"< 10"` in the same field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordToolResponse {
    #[serde(default)]
    pub keyword_list: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl CompetitionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unknown => "unknown",
        }
    }

    /// Label as shown in the Naver ads console.
    pub fn korean(&self) -> &'static str {
        match self {
            Self::Low => "낮음",
            Self::Medium => "보통",
            Self::High => "높음",
            Self::Unknown => "알 수 없음",
        }
    }
}

impl std::fmt::Display for CompetitionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Competition {
    pub level: CompetitionLevel,
    /// 0–100 proxy for advertiser pressure.
    pub index: f64,
}

/// Normalized keyword statistics.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KeywordStat {
    pub keyword: String,

    pub pc_search: u64,
    pub mobile_search: u64,
    pub total_search: u64,

    pub pc_click: f64,
    pub mobile_click: f64,
    pub total_click: f64,

    pub pc_ctr: f64,
    pub mobile_ctr: f64,
    pub avg_ctr: f64,

    pub competition: Competition,
    /// `compIdx` exactly as received, for display.
    pub competition_raw: Option<String>,

    pub pc_exposure: u64,
    pub mobile_exposure: u64,
    pub total_exposure: u64,

    pub estimated_ads_count: u32,
}

// ── Related terms ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RelatedTerm {
    pub term: String,
    pub frequency: usize,
    /// Share of collected documents mentioning the term, in percent.
    pub relevance: f64,
}

// ── Batch jobs ────────────────────────────────────────────────────────────────

/// One `keyword,seller` row of a batch CSV.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawJobRow {
    pub keyword: Option<String>,
    pub seller: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankJob {
    pub keyword: String,
    pub seller: String,
}
