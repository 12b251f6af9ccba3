//! Ranking engine: seven-factor weighted scoring with diversity-aware
//! top-N selection.
//!
//! `rank` is a pure function over the accepted article set and can be
//! called independently of a live session, e.g. to re-rank a previously
//! collected set with different weights.

pub mod select;
pub mod subscores;
pub mod weights;

use chrono::Utc;
use metrics::histogram;

pub use weights::{RankingWeights, WEIGHT_SUM_EPSILON};

use crate::article::Article;
use crate::error::ValidationError;

/// Default size of the selected subset.
pub const DEFAULT_TOP_N: usize = 100;

/// Rank the accepted, deduplicated article set and return the top N in
/// descending score order with positions assigned.
///
/// The timeliness reference is the latest scrape time in the set, so the
/// same input always produces the same output. Weight validation is the
/// only fatal error; on failure nothing is mutated.
pub fn rank(
    articles: Vec<Article>,
    weights: &RankingWeights,
    top_n: usize,
) -> Result<Vec<Article>, ValidationError> {
    weights.validate()?;

    let t0 = std::time::Instant::now();
    let reference = articles
        .iter()
        .map(|a| a.scraped_at)
        .max()
        .unwrap_or_else(Utc::now);
    let total = articles.len();
    let selected = select::select(articles, weights, top_n, reference);

    histogram!("curator_rank_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    tracing::info!(
        candidates = total,
        selected = selected.len(),
        top_n,
        "ranked article set"
    );
    Ok(selected)
}
