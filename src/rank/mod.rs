//! Best-rank scan: where does a seller's best listing sit for a keyword?
//!
//! Pages through the shopping search in fixed-size steps, keeps only items
//! whose mall name contains the seller fragment, drops repeated titles
//! (first occurrence wins) and remembers the smallest position seen.
//!
//! A page that fails to load ends the scan. What was found before the
//! failure is still reported, alongside the error.

use crate::api::ShoppingSource;
use crate::error::ApiError;
use crate::models::{ProductListing, RankResult};
use regex::Regex;
use std::collections::HashSet;
use std::iter::StepBy;
use std::ops::RangeInclusive;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.*?>").expect("valid regex"));

/// Remove HTML tags (the API wraps query hits in `<b>…</b>`).
pub fn strip_tags(s: &str) -> String {
    TAG_RE.replace_all(s, "").into_owned()
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub page_size: u32,
    pub max_results: u32,
    pub sort: String,
}

/// Outcome of one keyword scan.
#[derive(Debug)]
pub struct ScanReport {
    pub keyword: String,
    pub best: Option<RankResult>,
    pub pages_scanned: u32,
    /// Set when a page failed and the scan stopped early.
    pub failure: Option<ApiError>,
}

impl ScanReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Running state of a scan: seen titles plus the current best.
#[derive(Debug, Default)]
struct BestTracker {
    seen_titles: HashSet<String>,
    best: Option<RankResult>,
}

impl BestTracker {
    fn offer(&mut self, keyword: &str, seller: &str, offset: u32, items: &[ProductListing]) {
        for (i, item) in items.iter().enumerate() {
            if item.mall_name.is_empty() || !item.mall_name.contains(seller) {
                continue;
            }

            let title = strip_tags(&item.title);
            if !self.seen_titles.insert(title.clone()) {
                debug!("duplicate title skipped: {}", title);
                continue;
            }

            let rank = offset + i as u32;
            if self.best.as_ref().is_some_and(|b| b.rank <= rank) {
                continue;
            }

            self.best = Some(RankResult {
                keyword: keyword.to_string(),
                rank,
                title,
                price: item.lprice.clone(),
                link: item.link.clone(),
                mall_name: item.mall_name.clone(),
                category: item.categories(),
            });
        }
    }
}

pub struct RankScanner<'a, S: ShoppingSource + ?Sized> {
    source: &'a S,
    settings: ScanSettings,
}

impl<'a, S: ShoppingSource + ?Sized> RankScanner<'a, S> {
    pub fn new(source: &'a S, settings: ScanSettings) -> Self {
        Self { source, settings }
    }

    /// Offsets requested for one keyword: 1, 1+page, … up to `max_results`.
    pub fn offsets(&self) -> StepBy<RangeInclusive<u32>> {
        let step = self.settings.page_size.max(1) as usize;
        (1..=self.settings.max_results).step_by(step)
    }

    pub async fn find_best_rank(&self, keyword: &str, seller: &str) -> Result<ScanReport, ApiError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(ApiError::InvalidInput("keyword is empty".into()));
        }
        if seller.trim().is_empty() {
            return Err(ApiError::InvalidInput("seller name is empty".into()));
        }

        let mut tracker = BestTracker::default();
        let mut pages_scanned = 0u32;
        let mut failure = None;

        for offset in self.offsets() {
            let page = match self
                .source
                .search_page(keyword, offset, self.settings.page_size, &self.settings.sort)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!("'{}' start={}: {}, stopping scan", keyword, offset, e);
                    failure = Some(e);
                    break;
                }
            };
            pages_scanned += 1;

            if page.items.is_empty() {
                debug!("'{}' start={}: empty page, no further results", keyword, offset);
                break;
            }

            tracker.offer(keyword, seller, offset, &page.items);

            if (page.items.len() as u32) < self.settings.page_size {
                break;
            }
        }

        match &tracker.best {
            Some(b) => info!("'{}' → rank {} ({})", keyword, b.rank, b.mall_name),
            None => info!("'{}' → no listing from '{}'", keyword, seller),
        }

        Ok(ScanReport {
            keyword: keyword.to_string(),
            best: tracker.best,
            pages_scanned,
            failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShopSearchPage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn item(title: &str, mall: &str) -> ProductListing {
        ProductListing {
            title: title.to_string(),
            mall_name: mall.to_string(),
            lprice: "10000".to_string(),
            link: format!("https://shop.example/{}", title.len()),
            ..Default::default()
        }
    }

    fn filler(n: usize) -> Vec<ProductListing> {
        (0..n).map(|i| item(&format!("other {}", i), "남의가게")).collect()
    }

    /// Serves canned pages keyed by offset; offsets listed in `fail_at` error out.
    #[derive(Default)]
    struct FakeShop {
        pages: HashMap<u32, Vec<ProductListing>>,
        fail_at: Vec<u32>,
        requested: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl ShoppingSource for FakeShop {
        async fn search_page(
            &self,
            _query: &str,
            start: u32,
            _display: u32,
            _sort: &str,
        ) -> Result<ShopSearchPage, ApiError> {
            self.requested.lock().unwrap().push(start);
            if self.fail_at.contains(&start) {
                return Err(ApiError::Status {
                    url: format!("fake?start={}", start),
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(ShopSearchPage {
                items: self.pages.get(&start).cloned().unwrap_or_default(),
            })
        }
    }

    fn settings(page_size: u32, max_results: u32) -> ScanSettings {
        ScanSettings {
            page_size,
            max_results,
            sort: "sim".into(),
        }
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>아기</b> 물티슈 <b>100</b>매"), "아기 물티슈 100매");
        assert_eq!(strip_tags("no tags"), "no tags");
    }

    #[test]
    fn test_offsets_cover_thousand_results() {
        let shop = FakeShop::default();
        let scanner = RankScanner::new(&shop, settings(100, 1000));
        let offsets: Vec<u32> = scanner.offsets().collect();
        assert_eq!(offsets.len(), 10);
        assert_eq!(offsets.first(), Some(&1));
        assert_eq!(offsets.last(), Some(&901));
    }

    #[tokio::test]
    async fn test_best_rank_across_pages() {
        // page 1 match at index 3 → rank 3, page 2 match at index 1 → rank 101
        let mut p1 = filler(100);
        p1[2] = item("<b>물티슈</b> A", "우리가게 공식");
        let mut p2 = filler(100);
        p2[0] = item("물티슈 B", "우리가게");

        let shop = FakeShop {
            pages: HashMap::from([(1, p1), (101, p2)]),
            ..Default::default()
        };
        let scanner = RankScanner::new(&shop, settings(100, 1000));
        let report = scanner.find_best_rank("물티슈", "우리가게").await.unwrap();

        let best = report.best.unwrap();
        assert_eq!(best.rank, 3);
        assert_eq!(best.title, "물티슈 A");
        assert!(report.failure.is_none());
    }

    #[tokio::test]
    async fn test_later_page_can_hold_the_only_match() {
        let mut p2 = filler(100);
        p2[0] = item("물티슈 B", "우리가게");
        let shop = FakeShop {
            pages: HashMap::from([(1, filler(100)), (101, p2)]),
            ..Default::default()
        };
        let report = RankScanner::new(&shop, settings(100, 1000))
            .find_best_rank("물티슈", "우리가게")
            .await
            .unwrap();
        assert_eq!(report.best.map(|b| b.rank), Some(101));
    }

    #[test]
    fn test_duplicate_title_first_occurrence_wins() {
        // Same cleaned title appears at rank 2 (page 1) and rank 4 (page 1, tagged).
        // A different seller product sits at rank 5. Only one candidate per title.
        let mut p1 = filler(10);
        p1[1] = item("물티슈 대용량", "우리가게");
        p1[3] = item("<b>물티슈</b> 대용량", "우리가게");
        p1[4] = item("물티슈 소용량", "우리가게");

        let mut tracker = BestTracker::default();
        tracker.offer("물티슈", "우리가게", 1, &p1);

        assert_eq!(tracker.seen_titles.len(), 2);
        assert_eq!(tracker.best.map(|b| b.rank), Some(2));
    }

    #[tokio::test]
    async fn test_duplicate_title_across_pages_counts_once() {
        // Same cleaned title on page 1 (rank 60) and page 2 (rank 101, tagged).
        // Page 2 also has a new title at rank 102. The repeat at 101 never competes.
        let mut p1 = filler(100);
        p1[59] = item("물티슈 대용량", "우리가게");
        let mut p2 = filler(100);
        p2[0] = item("<b>물티슈</b> 대용량", "우리가게");
        p2[1] = item("물티슈 소용량", "우리가게");

        let shop = FakeShop {
            pages: HashMap::from([(1, p1), (101, p2)]),
            ..Default::default()
        };
        let scanner = RankScanner::new(&shop, settings(100, 200));
        let report = scanner.find_best_rank("물티슈", "우리가게").await.unwrap();

        let best = report.best.unwrap();
        assert_eq!(best.rank, 60);
        assert_eq!(best.title, "물티슈 대용량");

        // The tagged repeat on page 2 is not tracked as a second title.
        let mut tracker = BestTracker::default();
        let mut p1 = filler(100);
        p1[59] = item("물티슈 대용량", "우리가게");
        let mut p2 = filler(100);
        p2[0] = item("<b>물티슈</b> 대용량", "우리가게");
        tracker.offer("물티슈", "우리가게", 1, &p1);
        tracker.offer("물티슈", "우리가게", 101, &p2);
        assert_eq!(tracker.seen_titles.len(), 1);
        assert_eq!(tracker.best.map(|b| b.rank), Some(60));
    }

    #[test]
    fn test_seller_match_is_case_sensitive_substring() {
        let mut p1 = filler(5);
        p1[0] = item("a", "MyShop");
        p1[1] = item("b", "the myshop outlet");

        let mut tracker = BestTracker::default();
        tracker.offer("k", "myshop", 1, &p1);
        assert_eq!(tracker.best.map(|b| b.rank), Some(2));
    }

    #[tokio::test]
    async fn test_failure_keeps_partial_best() {
        let mut p1 = filler(100);
        p1[49] = item("물티슈", "우리가게");
        let shop = FakeShop {
            pages: HashMap::from([(1, p1), (101, filler(100))]),
            fail_at: vec![201],
            ..Default::default()
        };
        let report = RankScanner::new(&shop, settings(100, 1000))
            .find_best_rank("물티슈", "우리가게")
            .await
            .unwrap();

        assert_eq!(report.best.as_ref().map(|b| b.rank), Some(50));
        assert_eq!(report.pages_scanned, 2);
        assert!(!report.is_complete());
        assert_eq!(*shop.requested.lock().unwrap(), vec![1, 101, 201]);
    }

    #[tokio::test]
    async fn test_empty_page_ends_scan() {
        let shop = FakeShop {
            pages: HashMap::from([(1, filler(100))]),
            ..Default::default()
        };
        let report = RankScanner::new(&shop, settings(100, 1000))
            .find_best_rank("물티슈", "우리가게")
            .await
            .unwrap();
        assert!(report.best.is_none());
        assert!(report.is_complete());
        assert_eq!(*shop.requested.lock().unwrap(), vec![1, 101]);
    }

    #[tokio::test]
    async fn test_rejects_blank_inputs() {
        let shop = FakeShop::default();
        let scanner = RankScanner::new(&shop, settings(100, 1000));
        assert!(matches!(
            scanner.find_best_rank("  ", "shop").await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            scanner.find_best_rank("kw", "").await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(shop.requested.lock().unwrap().is_empty());
    }

    #[test]
    fn test_best_never_worse_than_any_match() {
        // Matches scattered over three pages in shuffled order.
        let mut tracker = BestTracker::default();
        let mut pages = Vec::new();
        for (offset, hit) in [(201u32, 7usize), (1, 40), (101, 2)] {
            let mut p = filler(100);
            p[hit] = item(&format!("상품 {}", offset), "우리가게");
            pages.push((offset, p));
        }
        for (offset, p) in &pages {
            tracker.offer("k", "우리가게", *offset, p);
        }
        assert_eq!(tracker.best.map(|b| b.rank), Some(41));
    }
}
