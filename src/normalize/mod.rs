use crate::models::{Competition, CompetitionLevel, KeywordStat};
use serde_json::Value;
use tracing::debug;

// Figures below ten are reported as "< 10"; we count them as 5.
const UNDER_TEN_SENTINEL: &str = "< 10";
const UNDER_TEN_VALUE: u64 = 5;

// Index assumed when competition cannot be read.
const UNKNOWN_COMPETITION_INDEX: f64 = 50.0;

// ── Value coercion ────────────────────────────────────────────────────────────

/// Strings the API uses for "no data".
fn is_blank(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s == "-"
}

fn parse_number(s: &str) -> Option<f64> {
    let cleaned = s.trim().replace(',', "");
    let n: f64 = cleaned.parse().ok()?;
    n.is_finite().then_some(n)
}

/// Coerce a volume/count field.
/// `"< 10"` → 5 | `""`, `"-"`, null → 0 | `"1,234"` → 1234 | `12.7` → 12 | junk → 0
pub fn coerce_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) => v,
            None => n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map_or(0, |f| f as u64),
        },
        Some(Value::String(s)) => {
            if s.contains(UNDER_TEN_SENTINEL) {
                UNDER_TEN_VALUE
            } else if is_blank(s) {
                0
            } else {
                parse_number(s).filter(|f| *f > 0.0).map_or(0, |f| f as u64)
            }
        }
        _ => 0,
    }
}

/// Coerce a fractional field (clicks, CTR). Same policy as [`coerce_count`].
pub fn coerce_rate(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite() && *f > 0.0).unwrap_or(0.0),
        Some(Value::String(s)) => {
            if s.contains(UNDER_TEN_SENTINEL) {
                UNDER_TEN_VALUE as f64
            } else if is_blank(s) {
                0.0
            } else {
                parse_number(s).filter(|f| *f > 0.0).unwrap_or(0.0)
            }
        }
        _ => 0.0,
    }
}

// ── Competition ───────────────────────────────────────────────────────────────

/// Thresholds: ≤30 low, ≤70 medium, >70 high.
pub fn level_for_index(index: f64) -> CompetitionLevel {
    if index.is_nan() {
        CompetitionLevel::Unknown
    } else if index <= 30.0 {
        CompetitionLevel::Low
    } else if index <= 70.0 {
        CompetitionLevel::Medium
    } else {
        CompetitionLevel::High
    }
}

fn level_for_label(label: &str) -> Option<(CompetitionLevel, f64)> {
    match label.trim().to_lowercase().as_str() {
        "낮음" | "low" => Some((CompetitionLevel::Low, 20.0)),
        "보통" | "medium" | "mid" => Some((CompetitionLevel::Medium, 50.0)),
        "높음" | "high" => Some((CompetitionLevel::High, 80.0)),
        _ => None,
    }
}

/// Resolve `compIdx`, which arrives either as a label or as a number.
pub fn resolve_competition(value: Option<&Value>) -> Competition {
    let unknown = Competition {
        level: CompetitionLevel::Unknown,
        index: UNKNOWN_COMPETITION_INDEX,
    };

    let index = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            if let Some((level, index)) = level_for_label(s) {
                return Competition { level, index };
            }
            parse_number(s)
        }
        _ => None,
    };

    match index {
        Some(index) => Competition {
            level: level_for_index(index),
            index,
        },
        None => unknown,
    }
}

/// Rough number of advertisers bidding, derived from the competition index.
pub fn estimated_ads_count(index: f64) -> u32 {
    let n = (index / 10.0).round();
    if n.is_finite() && n > 1.0 { n as u32 } else { 1 }
}

// ── Record → KeywordStat ──────────────────────────────────────────────────────

fn raw_display(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Normalize one `keywordList` record. `None` when the record has no
/// keyword text; every other defect degrades to a default.
pub fn normalize_record(item: &Value) -> Option<KeywordStat> {
    let keyword = item.get("relKeyword").and_then(Value::as_str).map(str::trim)?;
    if keyword.is_empty() {
        return None;
    }

    let pc_search = coerce_count(item.get("monthlyPcQcCnt"));
    let mobile_search = coerce_count(item.get("monthlyMobileQcCnt"));

    let pc_click = coerce_rate(item.get("monthlyAvePcClkCnt"));
    let mobile_click = coerce_rate(item.get("monthlyAveMobileClkCnt"));

    let pc_ctr = coerce_rate(item.get("monthlyAvePcCtr"));
    let mobile_ctr = coerce_rate(item.get("monthlyAveMobileCtr"));
    let avg_ctr = if pc_ctr > 0.0 || mobile_ctr > 0.0 {
        (pc_ctr + mobile_ctr) / 2.0
    } else {
        0.0
    };

    // One depth figure, reported for both channels.
    let exposure = coerce_count(item.get("plAvgDepth"));

    let comp_value = item.get("compIdx");
    let competition = resolve_competition(comp_value);

    Some(KeywordStat {
        keyword: keyword.to_string(),
        pc_search,
        mobile_search,
        total_search: pc_search.saturating_add(mobile_search),
        pc_click,
        mobile_click,
        total_click: pc_click + mobile_click,
        pc_ctr,
        mobile_ctr,
        avg_ctr,
        competition,
        competition_raw: raw_display(comp_value),
        pc_exposure: exposure,
        mobile_exposure: exposure,
        total_exposure: exposure.saturating_mul(2),
        estimated_ads_count: estimated_ads_count(competition.index),
    })
}

/// Normalize a batch; records without keyword text are dropped.
pub fn normalize(items: &[Value]) -> Vec<KeywordStat> {
    let stats: Vec<KeywordStat> = items.iter().filter_map(normalize_record).collect();
    if stats.len() < items.len() {
        debug!("{} of {} records had no keyword text", items.len() - stats.len(), items.len());
    }
    stats
}

/// Highest total search volume first; ties keep API order.
pub fn sort_by_total_search(stats: &mut [KeywordStat]) {
    stats.sort_by(|a, b| b.total_search.cmp(&a.total_search));
}

// ── Filtering & insights ──────────────────────────────────────────────────────

/// Parse a competition level given on the command line (`low`, `보통`, ...).
pub fn parse_competition_level(s: &str) -> Option<CompetitionLevel> {
    match s.trim().to_lowercase().as_str() {
        "unknown" | "알 수 없음" => Some(CompetitionLevel::Unknown),
        other => level_for_label(other).map(|(level, _)| level),
    }
}

/// Narrowing applied to normalized stats before display. Empty filter keeps everything.
#[derive(Debug, Clone, Default)]
pub struct StatFilter {
    /// Case-insensitive keyword substring.
    pub contains: Option<String>,
    pub min_search: u64,
    pub competition: Option<CompetitionLevel>,
}

impl StatFilter {
    pub fn is_empty(&self) -> bool {
        self.contains.as_deref().is_none_or(|c| c.trim().is_empty())
            && self.min_search == 0
            && self.competition.is_none()
    }

    pub fn matches(&self, stat: &KeywordStat) -> bool {
        if let Some(needle) = self.contains.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            if !stat.keyword.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if stat.total_search < self.min_search {
            return false;
        }
        self.competition.is_none_or(|level| stat.competition.level == level)
    }

    /// Keep matching stats, preserving order.
    pub fn apply(&self, stats: Vec<KeywordStat>) -> Vec<KeywordStat> {
        stats.into_iter().filter(|s| self.matches(s)).collect()
    }
}

fn median(values: &mut [u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] as f64 + values[mid] as f64) / 2.0
    } else {
        values[mid] as f64
    })
}

/// Keywords worth targeting: total search above the median of `stats`
/// and low or medium competition. At most `limit`, in input order.
pub fn opportunity_keywords(stats: &[KeywordStat], limit: usize) -> Vec<&KeywordStat> {
    let mut totals: Vec<u64> = stats.iter().map(|s| s.total_search).collect();
    let Some(median) = median(&mut totals) else {
        return Vec::new();
    };

    stats
        .iter()
        .filter(|s| s.total_search as f64 > median)
        .filter(|s| matches!(s.competition.level, CompetitionLevel::Low | CompetitionLevel::Medium))
        .take(limit)
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
