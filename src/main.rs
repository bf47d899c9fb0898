mod api;
mod config;
mod error;
mod loader;
mod models;
mod normalize;
mod pipeline;
mod rank;
mod related;
mod utils;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{AppConfig, mask_secret};
use crate::loader::{group_by_seller, load_jobs};
use crate::models::{KeywordStat, RelatedTerm};
use crate::normalize::{StatFilter, opportunity_keywords, parse_competition_level};
use crate::pipeline::{Pipeline, RankRunStats, split_keyword_list};
use crate::utils::{fmt_number, truncate_chars};

// The keyword tool accepts at most five hint keywords per call.
const MAX_HINT_KEYWORDS: usize = 5;
const OPPORTUNITY_PICKS: usize = 5;

#[derive(Parser)]
#[command(name = "naver-rank", about = "Naver shopping rank checker and keyword statistics", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Find a seller's best shopping rank for each keyword
    Rank {
        /// Seller (mall) name or part of it, case-sensitive
        #[arg(short, long)]
        seller: String,

        /// Keywords, space or comma separated
        #[arg(required = true, num_args = 1..)]
        keywords: Vec<String>,

        /// Show link and category of each match
        #[arg(short, long)]
        details: bool,
    },

    /// Run rank checks from a CSV file with `keyword,seller` columns
    Batch {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Related-keyword statistics from the search-ads keyword tool
    Keywords {
        /// Hint keywords (up to 5), space or comma separated
        #[arg(required = true, num_args = 1..)]
        hints: Vec<String>,

        /// Show only the top N keywords
        #[arg(short, long)]
        limit: Option<usize>,

        /// Keep keywords containing this text (case-insensitive)
        #[arg(long)]
        contains: Option<String>,

        /// Keep keywords with at least this total monthly search volume
        #[arg(long, default_value_t = 0)]
        min_search: u64,

        /// Keep one competition level: low, medium, high, unknown (or 낮음/보통/높음)
        #[arg(long)]
        competition: Option<String>,
    },

    /// Frequent terms in shopping listings for a keyword
    Related {
        keyword: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the effective configuration (credentials masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "naver_rank=info,warn",
        1 => "naver_rank=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Rank { seller, keywords, details } => {
            let _t = utils::Timer::start("Rank check");
            let keywords: Vec<String> = keywords.iter().flat_map(|k| split_keyword_list(k)).collect();
            let pipeline = Pipeline::new(config);
            let client = pipeline.shopping_client()?;
            let stats = pipeline.check_ranks(&client, &seller, &keywords).await?;
            print_rank_stats(&seller, &stats, details);
        }

        Command::Batch { file } => {
            let _t = utils::Timer::start("Batch rank check");
            let jobs = load_jobs(&file)?;
            if jobs.is_empty() {
                println!("No jobs in {:?}.", file);
                return Ok(());
            }

            let pipeline = Pipeline::new(config);
            let client = pipeline.shopping_client()?;
            let mut errors = 0usize;

            for (seller, keywords) in group_by_seller(&jobs) {
                match pipeline.check_ranks(&client, &seller, &keywords).await {
                    Ok(stats) => print_rank_stats(&seller, &stats, false),
                    Err(e) => {
                        warn!("Seller '{}': {:#}", seller, e);
                        errors += 1;
                    }
                }
            }

            info!("Done: {} jobs, {} seller groups failed", jobs.len(), errors);
        }

        Command::Keywords { hints, limit, contains, min_search, competition } => {
            let _t = utils::Timer::start("Keyword statistics");
            let hints: Vec<String> = hints.iter().flat_map(|h| split_keyword_list(h)).collect();
            if hints.len() > MAX_HINT_KEYWORDS {
                bail!("At most {} hint keywords per lookup ({} given)", MAX_HINT_KEYWORDS, hints.len());
            }

            let competition = match competition.as_deref() {
                Some(label) => match parse_competition_level(label) {
                    Some(level) => Some(level),
                    None => bail!("Unknown competition level '{}'", label),
                },
                None => None,
            };
            let filter = StatFilter { contains, min_search, competition };

            let pipeline = Pipeline::new(config);
            let client = pipeline.ads_client()?;
            let stats = pipeline.analyze_keywords(client.as_ref(), &hints).await?;
            if stats.is_empty() {
                println!("No keyword statistics; check the search-ads credentials.");
                return Ok(());
            }

            let total = stats.len();
            let stats = filter.apply(stats);
            if !filter.is_empty() {
                println!("  Filter kept {} of {} keywords", stats.len(), total);
            }
            print_keyword_stats(&stats, limit.unwrap_or(stats.len()));
            print_opportunities(&stats);
        }

        Command::Related { keyword, limit } => {
            let _t = utils::Timer::start("Related terms");
            let pipeline = Pipeline::new(config);
            let client = pipeline.shopping_client()?;
            let terms = pipeline.related_terms(&client, &keyword, limit).await?;
            print_related(&keyword, &terms);
        }

        Command::Config => {
            println!("─────────────────────────────────");
            println!("  naver-rank — Configuration");
            println!("─────────────────────────────────");
            println!("  Shopping URL   : {}", config.shopping.base_url);
            println!("  Client ID      : {}", mask_secret(config.shopping.client_id.as_deref()));
            println!("  Client secret  : {}", mask_secret(config.shopping.client_secret.as_deref()));
            println!("  Page size      : {}", config.shopping.page_size);
            println!("  Max results    : {}", config.shopping.max_results);
            println!("  Sort           : {}", config.shopping.sort);
            println!("  Ads endpoint   : {}{}", config.ads.base_url, config.ads.path);
            println!("  Customer ID    : {}", mask_secret(config.ads.customer_id.as_deref()));
            println!("  Access license : {}", mask_secret(config.ads.access_license.as_deref()));
            println!("  Secret key     : {}", mask_secret(config.ads.secret_key.as_deref()));
            println!("  Max keywords   : {}", config.pipeline.max_keywords);
            println!("  Delay          : {} ms", config.pipeline.request_delay_ms);
            println!("─────────────────────────────────");
        }
    }

    Ok(())
}

fn print_rank_stats(seller: &str, stats: &RankRunStats, details: bool) {
    println!("─────────────────────────────────");
    println!("  Seller: {}", seller);
    println!("─────────────────────────────────");
    for report in &stats.reports {
        match &report.best {
            Some(best) => {
                let price = best
                    .price_value()
                    .map(|p| format!("{}원", fmt_number(p)))
                    .unwrap_or_else(|| best.price.clone());
                println!(
                    "  {:<20} #{:<5} {:>12}  {}",
                    truncate_chars(&report.keyword, 20),
                    best.rank,
                    price,
                    truncate_chars(&best.title, 40)
                );
                if details {
                    println!("  {:<20} mall: {}", "", best.mall_name);
                    println!("  {:<20} link: {}", "", best.link);
                    if !best.category.is_empty() {
                        println!("  {:<20} category: {}", "", best.category);
                    }
                }
            }
            None => println!("  {:<20} not found", truncate_chars(&report.keyword, 20)),
        }
        if let Some(e) = &report.failure {
            println!("  {:<20} ! stopped after {} pages: {}", "", report.pages_scanned, e);
        }
    }
    println!("─────────────────────────────────");
    println!(
        "  {} keywords | {} found | {} not found | {} failed",
        stats.keywords, stats.found, stats.not_found, stats.failed
    );
    if stats.partial > 0 {
        println!("  {} of the found ranks come from scans that stopped early", stats.partial);
    }
    println!("  Success rate: {:.1}%", stats.success_rate());

    let ranked = stats.ranked();
    if ranked.is_empty() {
        return;
    }
    if let (Some(best), Some(worst), Some(avg)) = (stats.best_rank(), stats.worst_rank(), stats.average_rank()) {
        println!("  Best #{} | worst #{} | average #{:.1}", best, worst, avg);
    }
    println!("─────────────────────────────────");
    println!("  By rank:");
    for b in ranked {
        println!("  #{:<5} {:<20} {}", b.rank, truncate_chars(&b.keyword, 20), truncate_chars(&b.title, 40));
    }
}

fn print_keyword_stats(stats: &[KeywordStat], limit: usize) {
    println!(
        "  {:<24} {:>10} {:>10} {:>10} {:>9} {:>7} {:>8} {:>4}",
        "keyword", "pc", "mobile", "total", "clicks", "ctr%", "comp", "ads"
    );
    for s in stats.iter().take(limit) {
        println!(
            "  {:<24} {:>10} {:>10} {:>10} {:>9.1} {:>7.2} {:>8} {:>4}",
            truncate_chars(&s.keyword, 24),
            fmt_number(s.pc_search),
            fmt_number(s.mobile_search),
            fmt_number(s.total_search),
            s.total_click,
            s.avg_ctr,
            s.competition.level.korean(),
            s.estimated_ads_count,
        );
    }
    println!("  {} keywords", stats.len().min(limit));
}

fn print_opportunities(stats: &[KeywordStat]) {
    let picks = opportunity_keywords(stats, OPPORTUNITY_PICKS);
    if picks.is_empty() {
        return;
    }
    println!("─────────────────────────────────");
    println!("  Opportunities (above-median search, low/medium competition):");
    for s in picks {
        println!(
            "  {:<24} {:>10}  {}",
            truncate_chars(&s.keyword, 24),
            fmt_number(s.total_search),
            s.competition.level.korean()
        );
    }
}

fn print_related(keyword: &str, terms: &[RelatedTerm]) {
    if terms.is_empty() {
        println!("No related terms for '{}'.", keyword);
        return;
    }
    println!("  {:<30} {:>6} {:>8}", "term", "count", "share%");
    for t in terms {
        println!("  {:<30} {:>6} {:>8.2}", truncate_chars(&t.term, 30), t.frequency, t.relevance);
    }
}
