//! Orchestration: ties API clients → rank scanner / normalizer together.
//!
//! ## Run modes
//!
//! `check_ranks()` scans up to `max_keywords` keywords for one seller,
//!   one after another with a fixed pause in between. A failing keyword is
//!   recorded and the run moves on.
//!
//! `analyze_keywords()` looks up related-keyword statistics. Without a full
//!   set of ads credentials it does not call the API and returns nothing.

use crate::api::signer::AdsCredentials;
use crate::api::{KeywordToolSource, NaverAdsClient, NaverShoppingClient, ShoppingSource};
use crate::config::AppConfig;
use crate::models::{KeywordStat, RankResult, RelatedTerm};
use crate::normalize::{normalize, sort_by_total_search};
use crate::rank::{RankScanner, ScanReport, ScanSettings};
use crate::related;
use anyhow::{Context, Result, bail};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Split `"a, b,,c"` into trimmed, non-empty keywords.
pub fn split_keyword_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            page_size: self.config.shopping.page_size,
            max_results: self.config.shopping.max_results,
            sort: self.config.shopping.sort.clone(),
        }
    }

    pub fn shopping_client(&self) -> Result<NaverShoppingClient> {
        NaverShoppingClient::new(&self.config.shopping).context("Failed to build shopping client")
    }

    /// `None` when ads credentials are incomplete.
    pub fn ads_client(&self) -> Result<Option<NaverAdsClient>> {
        let Some(creds) = AdsCredentials::from_config(&self.config.ads) else {
            warn!(
                "Search-ads credentials missing ({}), skipping keyword lookup",
                AdsCredentials::missing(&self.config.ads).join(", ")
            );
            return Ok(None);
        };
        let client = NaverAdsClient::new(
            &self.config.ads,
            creds,
            &self.config.shopping.user_agent,
            self.config.shopping.timeout_secs,
        )
        .context("Failed to build ads client")?;
        Ok(Some(client))
    }

    pub async fn check_ranks<S: ShoppingSource + ?Sized>(
        &self,
        source: &S,
        seller: &str,
        keywords: &[String],
    ) -> Result<RankRunStats> {
        let seller = seller.trim();
        if seller.is_empty() {
            bail!("Seller name is required");
        }

        let keywords: Vec<&str> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            bail!("At least one keyword is required");
        }
        let max = self.config.pipeline.max_keywords;
        if keywords.len() > max {
            bail!("At most {} keywords per run ({} given)", max, keywords.len());
        }

        info!("=== Rank check: {} keywords for '{}' ===", keywords.len(), seller);

        let scanner = RankScanner::new(source, self.scan_settings());
        let delay = Duration::from_millis(self.config.pipeline.request_delay_ms);
        let mut stats = RankRunStats::default();

        for (i, keyword) in keywords.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                sleep(delay).await;
            }
            info!("({}/{}) '{}'", i + 1, keywords.len(), keyword);

            match scanner.find_best_rank(keyword, seller).await {
                Ok(report) => {
                    if let Some(e) = &report.failure {
                        error!("'{}': scan aborted after {} pages: {}", keyword, report.pages_scanned, e);
                    }
                    match (&report.best, report.is_complete()) {
                        (Some(_), true) => stats.found += 1,
                        (Some(_), false) => {
                            stats.found += 1;
                            stats.partial += 1;
                        }
                        (None, true) => stats.not_found += 1,
                        (None, false) => stats.failed += 1,
                    }
                    stats.reports.push(report);
                }
                Err(e) => {
                    warn!("'{}': {}", keyword, e);
                    stats.failed += 1;
                }
            }
        }

        stats.keywords = keywords.len();
        info!(
            "=== Done: {} keywords | {} found ({} partial) | {} not found | {} failed ===",
            stats.keywords, stats.found, stats.partial, stats.not_found, stats.failed
        );
        Ok(stats)
    }

    pub async fn analyze_keywords<K: KeywordToolSource + ?Sized>(
        &self,
        source: Option<&K>,
        hints: &[String],
    ) -> Result<Vec<KeywordStat>> {
        let Some(source) = source else {
            return Ok(Vec::new());
        };

        let records = source
            .keyword_tool(hints)
            .await
            .with_context(|| format!("Keyword tool lookup failed for {:?}", hints))?;
        info!("{} raw keyword records", records.len());

        let mut stats = normalize(&records);
        sort_by_total_search(&mut stats);
        Ok(stats)
    }

    pub async fn related_terms<S: ShoppingSource + ?Sized>(
        &self,
        source: &S,
        keyword: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RelatedTerm>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            bail!("Keyword is required");
        }
        let limit = limit.unwrap_or(self.config.pipeline.related_limit);
        Ok(related::related_terms(source, keyword, limit).await)
    }
}

/// Outcome of a rank run. `found`, `not_found` and `failed` are disjoint
/// and add up to `keywords`.
#[derive(Debug, Default)]
pub struct RankRunStats {
    pub keywords: usize,
    pub found: usize,
    /// Of `found`: matches from scans that stopped early on an error.
    pub partial: usize,
    pub not_found: usize,
    /// Keywords with no match and a failed or rejected scan.
    pub failed: usize,
    pub reports: Vec<ScanReport>,
}

impl RankRunStats {
    /// Matches ordered by rank, best first.
    pub fn ranked(&self) -> Vec<&RankResult> {
        let mut found: Vec<&RankResult> = self.reports.iter().filter_map(|r| r.best.as_ref()).collect();
        found.sort_by_key(|b| b.rank);
        found
    }

    /// Share of keywords with a match, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.keywords == 0 {
            return 0.0;
        }
        self.found as f64 / self.keywords as f64 * 100.0
    }

    pub fn best_rank(&self) -> Option<u32> {
        self.ranks().min()
    }

    pub fn worst_rank(&self) -> Option<u32> {
        self.ranks().max()
    }

    pub fn average_rank(&self) -> Option<f64> {
        let (sum, n) = self.ranks().fold((0u64, 0u32), |(sum, n), r| (sum + r as u64, n + 1));
        (n > 0).then(|| sum as f64 / n as f64)
    }

    fn ranks(&self) -> impl Iterator<Item = u32> + '_ {
        self.reports.iter().filter_map(|r| r.best.as_ref().map(|b| b.rank))
    }
}
