//! Diversity-aware top-N selection.
//!
//! The two diversity subscores depend on what ranks above an article, so
//! they are computed in one deterministic left-to-right pass over the
//! set pre-sorted by the weighted partial sum of the other five
//! subscores. Ties are broken by credibility, then scrape time, then
//! content hash, which gives a total order and byte-identical output for
//! identical input.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::subscores;
use super::weights::RankingWeights;
use crate::article::Article;

/// Per-repetition penalty step for both diversity subscores.
const DIVERSITY_STEP: f32 = 0.2;

fn diversity_subscore(prior_occurrences: usize) -> f32 {
    (1.0 - DIVERSITY_STEP * prior_occurrences as f32).max(0.0)
}

/// Total order used for every sort in the engine. `key` is the score
/// being compared at that stage (base partial sum or final rank score).
fn compare(key_a: f32, a: &Article, key_b: f32, b: &Article) -> Ordering {
    key_b
        .partial_cmp(&key_a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.credibility
                .partial_cmp(&a.credibility)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.scraped_at.cmp(&b.scraped_at))
        .then_with(|| a.content_hash.cmp(&b.content_hash))
}

/// Score, order, and truncate the accepted article set.
///
/// `reference` anchors the timeliness decay; callers pass the session
/// window end so results are reproducible.
pub fn select(
    mut articles: Vec<Article>,
    weights: &RankingWeights,
    top_n: usize,
    reference: DateTime<Utc>,
) -> Vec<Article> {
    // Base subscores and their weighted partial sum.
    let mut base: Vec<f32> = Vec::with_capacity(articles.len());
    for article in articles.iter_mut() {
        let content_quality = subscores::content_quality(article);
        let source_credibility = subscores::source_credibility(article);
        let title_engagement = subscores::title_engagement(article);
        let visual_content = subscores::visual_content(article);
        let timeliness = subscores::timeliness(article, reference);
        let s = &mut article.subscores;
        s.content_quality = content_quality;
        s.source_credibility = source_credibility;
        s.title_engagement = title_engagement;
        s.visual_content = visual_content;
        s.timeliness = timeliness;
    }
    for article in articles.iter() {
        let s = &article.subscores;
        base.push(
            s.content_quality * weights.content_quality
                + s.source_credibility * weights.source_credibility
                + s.title_engagement * weights.title_engagement
                + s.visual_content * weights.visual_content
                + s.timeliness * weights.timeliness,
        );
    }

    // Provisional order by partial sum; diversity penalties then reflect
    // what already sits above each article.
    let mut order: Vec<usize> = (0..articles.len()).collect();
    order.sort_by(|&i, &j| compare(base[i], &articles[i], base[j], &articles[j]));

    let mut categories_seen: HashMap<String, usize> = HashMap::new();
    let mut regions_seen: HashMap<String, usize> = HashMap::new();
    for &i in &order {
        let cat_n = *categories_seen.get(&articles[i].category).unwrap_or(&0);
        let geo_n = *regions_seen.get(&articles[i].region).unwrap_or(&0);

        let article = &mut articles[i];
        article.subscores.category_diversity = diversity_subscore(cat_n);
        article.subscores.geographic_diversity = diversity_subscore(geo_n);
        article.rank_score = subscores::clamp01(
            base[i]
                + article.subscores.category_diversity * weights.category_diversity
                + article.subscores.geographic_diversity * weights.geographic_diversity,
        );

        *categories_seen.entry(article.category.clone()).or_insert(0) += 1;
        *regions_seen.entry(article.region.clone()).or_insert(0) += 1;
    }

    articles.sort_by(|a, b| compare(a.rank_score, a, b.rank_score, b));
    articles.truncate(top_n);
    for (i, article) in articles.iter_mut().enumerate() {
        article.rank_position = i + 1;
    }
    articles
}
