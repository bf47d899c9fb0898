//! CSV loader for batch rank checks (`keyword,seller` per row).

use crate::models::{RankJob, RawJobRow};
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

fn clean(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse jobs from any reader. Bad or incomplete rows are skipped.
pub fn parse_jobs<R: Read>(reader: R) -> Result<Vec<RankJob>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut jobs = Vec::new();

    for (i, result) in reader.deserialize::<RawJobRow>().enumerate() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {}: {}", i + 1, e);
                continue;
            }
        };

        match (clean(row.keyword), clean(row.seller)) {
            (Some(keyword), Some(seller)) => jobs.push(RankJob { keyword, seller }),
            _ => debug!("Row {}: keyword or seller missing, skipped", i + 1),
        }
    }

    Ok(jobs)
}

pub fn load_jobs(path: &Path) -> Result<Vec<RankJob>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Could not open job file {:?}", path))?;
    let jobs = parse_jobs(file).with_context(|| format!("Failed to read {:?}", path))?;
    info!("{} jobs loaded from {:?}", jobs.len(), path);
    Ok(jobs)
}

/// Group keywords by seller, sellers and keywords in first-seen order.
pub fn group_by_seller(jobs: &[RankJob]) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for job in jobs {
        match groups.iter_mut().find(|(seller, _)| *seller == job.seller) {
            Some((_, keywords)) => {
                if !keywords.contains(&job.keyword) {
                    keywords.push(job.keyword.clone());
                }
            }
            None => groups.push((job.seller.clone(), vec![job.keyword.clone()])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jobs_skips_incomplete_rows() {
        let data = "keyword,seller\n물티슈, 우리가게 \n,우리가게\n기저귀,\n기저귀,남의가게\n";
        let jobs = parse_jobs(data.as_bytes()).unwrap();
        assert_eq!(
            jobs,
            vec![
                RankJob { keyword: "물티슈".into(), seller: "우리가게".into() },
                RankJob { keyword: "기저귀".into(), seller: "남의가게".into() },
            ]
        );
    }

    #[test]
    fn test_parse_jobs_tolerates_extra_columns() {
        let data = "keyword,seller,note\n물티슈,우리가게,first\n";
        let jobs = parse_jobs(data.as_bytes()).unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn test_group_by_seller_keeps_order() {
        let jobs = vec![
            RankJob { keyword: "a".into(), seller: "s1".into() },
            RankJob { keyword: "b".into(), seller: "s2".into() },
            RankJob { keyword: "c".into(), seller: "s1".into() },
            RankJob { keyword: "a".into(), seller: "s1".into() },
        ];
        let groups = group_by_seller(&jobs);
        assert_eq!(
            groups,
            vec![
                ("s1".to_string(), vec!["a".to_string(), "c".to_string()]),
                ("s2".to_string(), vec!["b".to_string()]),
            ]
        );
    }
}
