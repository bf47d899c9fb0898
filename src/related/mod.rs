//! Related terms from shopping results.
//!
//! Collects product texts for a keyword under several sort orders, splits
//! them into words, phrases and number+unit tokens, and counts how often
//! each appears. Marketing filler and the seed keyword are dropped.

use crate::api::ShoppingSource;
use crate::models::{ProductListing, RelatedTerm};
use crate::rank::strip_tags;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[가-힣a-zA-Z0-9]+").expect("valid regex"));
static PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[가-힣a-zA-Z0-9\s]{2,20}").expect("valid regex"));
static UNIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+[가-힣a-zA-Z]+").expect("valid regex"));

pub const SORT_ORDERS: [&str; 4] = ["sim", "date", "asc", "dsc"];
const PAGES_PER_SORT: u32 = 3;
const PAGE_SIZE: u32 = 100;

const MIN_TERM_CHARS: usize = 2;
const MAX_TERM_CHARS: usize = 30;

const STOP_WORDS: &[&str] = &[
    "상품", "제품", "브랜드", "공식", "정품", "무료", "배송", "할인", "세트", "특가", "이벤트",
    "쿠폰", "적립", "포인트", "원", "개", "매", "구매", "판매", "스토어", "쇼핑", "마트", "몰",
    "샵", "온라인", "오프라인", "신상", "신제품", "런칭", "출시", "한정", "단독", "독점", "전용",
    "추천", "베스트", "인기", "랭킹", "순위", "top", "best", "당일", "오늘", "내일", "빠른",
    "즉시", "바로", "직접", "직구", "해외", "국내", "한국", "전국", "서울", "부산", "대구",
    "광주", "대전", "울산", "인천", "경기", "강원", "리뷰", "후기", "평점", "별점", "만족",
    "불만", "최고", "최저", "평균",
];

/// Searchable text of one listing: title, categories, brand, mall.
pub fn document_text(item: &ProductListing) -> String {
    [
        strip_tags(&item.title),
        item.categories(),
        item.brand.clone(),
        item.mall_name.clone(),
    ]
    .iter()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Tokens of one document; the same text may yield a word and a phrase.
pub fn extract_terms(text: &str) -> Vec<String> {
    let words = WORD_RE.find_iter(text).map(|m| m.as_str().to_string());
    let phrases = PHRASE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|p| p.chars().count() >= MIN_TERM_CHARS);
    let units = UNIT_RE.find_iter(text).map(|m| m.as_str().to_string());

    words
        .chain(phrases)
        .chain(units)
        .filter(|t| (MIN_TERM_CHARS..=MAX_TERM_CHARS).contains(&t.chars().count()))
        .collect()
}

fn is_excluded(term: &str, seed: &str) -> bool {
    let lower = term.to_lowercase();
    lower == seed
        || STOP_WORDS.contains(&lower.as_str())
        || term.chars().all(|c| c.is_ascii_digit())
        || term.chars().count() < MIN_TERM_CHARS
}

/// Count terms across documents, most frequent first; ties keep first-seen order.
pub fn rank_terms(documents: &[String], seed: &str, limit: usize) -> Vec<RelatedTerm> {
    if documents.is_empty() {
        return Vec::new();
    }
    let seed = seed.trim().to_lowercase();

    // term → (count, first position)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut next = 0usize;
    for doc in documents {
        for term in extract_terms(doc) {
            let entry = counts.entry(term).or_insert_with(|| {
                next += 1;
                (0, next)
            });
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .filter(|(term, _)| !is_excluded(term, &seed))
        .map(|(term, (count, first))| (term, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    let total = documents.len() as f64;
    ranked
        .into_iter()
        .take(limit)
        .map(|(term, frequency, _)| RelatedTerm {
            term,
            frequency,
            relevance: ((frequency as f64 / total) * 100.0 * 100.0).round() / 100.0,
        })
        .collect()
}

/// Gather listing texts for `keyword`. Per-page failures are logged and skipped.
pub async fn collect_documents<S: ShoppingSource + ?Sized>(source: &S, keyword: &str) -> Vec<String> {
    let mut documents = Vec::new();

    for sort in SORT_ORDERS {
        for page in 0..PAGES_PER_SORT {
            let start = 1 + page * PAGE_SIZE;
            let items = match source.search_page(keyword, start, PAGE_SIZE, sort).await {
                Ok(p) => p.items,
                Err(e) => {
                    warn!("'{}' sort={} start={}: {}", keyword, sort, start, e);
                    continue;
                }
            };
            if items.is_empty() {
                debug!("'{}' sort={}: empty at start={}", keyword, sort, start);
                break;
            }
            documents.extend(
                items
                    .iter()
                    .map(document_text)
                    .filter(|t| !t.is_empty()),
            );
        }
        debug!("'{}' after sort={}: {} documents", keyword, sort, documents.len());
    }

    info!("'{}': {} product documents collected", keyword, documents.len());
    documents
}

pub async fn related_terms<S: ShoppingSource + ?Sized>(
    source: &S,
    keyword: &str,
    limit: usize,
) -> Vec<RelatedTerm> {
    let documents = collect_documents(source, keyword).await;
    rank_terms(&documents, keyword, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::ShopSearchPage;
    use async_trait::async_trait;

    #[test]
    fn test_document_text() {
        let item = ProductListing {
            title: "<b>물티슈</b> 캡형 100매".into(),
            category1: "생활/건강".into(),
            brand: "깨끗해".into(),
            mall_name: "우리가게".into(),
            ..Default::default()
        };
        assert_eq!(document_text(&item), "물티슈 캡형 100매 생활/건강 깨끗해 우리가게");
    }

    #[test]
    fn test_extract_terms_kinds() {
        let terms = extract_terms("캡형 100매");
        assert!(terms.contains(&"캡형".to_string()));
        assert!(terms.contains(&"100매".to_string()));
        // phrase covering the whole text
        assert!(terms.contains(&"캡형 100매".to_string()));
        // single characters never survive
        assert!(!extract_terms("a b c").iter().any(|t| t == "a" || t == "b"));
    }

    #[test]
    fn test_rank_terms_filters_and_orders() {
        let docs = vec![
            "물티슈 캡형 무료 배송".to_string(),
            "물티슈 캡형 2024".to_string(),
            "물티슈 휴대용".to_string(),
        ];
        let terms = rank_terms(&docs, "물티슈", 100);
        let names: Vec<&str> = terms.iter().map(|t| t.term.as_str()).collect();

        assert!(!names.contains(&"물티슈"));
        assert!(!names.contains(&"무료"));
        assert!(!names.contains(&"배송"));
        assert!(!names.contains(&"2024"));
        assert_eq!(terms[0].term, "캡형");
        assert_eq!(terms[0].frequency, 2);
        assert_eq!(terms[0].relevance, 66.67);
        assert!(names.contains(&"휴대용"));

        assert!(terms.windows(2).all(|w| w[0].frequency >= w[1].frequency));
    }

    #[test]
    fn test_rank_terms_limit_and_empty() {
        assert!(rank_terms(&[], "x", 10).is_empty());
        let docs = vec!["가방 지갑 벨트 모자".to_string()];
        assert_eq!(rank_terms(&docs, "x", 2).len(), 2);
    }

    struct OnePageShop;

    #[async_trait]
    impl ShoppingSource for OnePageShop {
        async fn search_page(
            &self,
            _query: &str,
            start: u32,
            _display: u32,
            sort: &str,
        ) -> Result<ShopSearchPage, ApiError> {
            if sort == "date" {
                return Err(ApiError::InvalidInput("down".into()));
            }
            let items = if start == 1 {
                vec![ProductListing {
                    title: format!("<b>물티슈</b> {}", sort),
                    mall_name: "우리가게".into(),
                    ..Default::default()
                }]
            } else {
                Vec::new()
            };
            Ok(ShopSearchPage { items })
        }
    }

    #[tokio::test]
    async fn test_collect_skips_failed_pages() {
        let docs = collect_documents(&OnePageShop, "물티슈").await;
        // sim, asc, dsc each contribute one listing; date fails every page
        assert_eq!(docs.len(), 3);
        assert!(docs.iter().all(|d| d.starts_with("물티슈")));
    }
}
