// tests/rank_diversity.rs
// Diversity-aware selection: when weighted scores are within a small
// margin, the category and region subscores spread the top of the list
// across categories instead of letting one dominate.

use chrono::{DateTime, Utc};
use frontpage_curator::{rank, Article, RankingWeights};

fn scraped() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-10T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn article(seed: u8, category: &str, region: &str) -> Article {
    let hash = format!("{seed:02x}").repeat(32);
    Article {
        id: hash[..12].to_string(),
        title: "Parliament passes annual budget after session".into(),
        url: format!("https://example.com/news/{seed}"),
        body_text: "x".repeat(1500),
        image_url: None,
        source_id: format!("s{seed}"),
        category: category.into(),
        region: region.into(),
        credibility: 0.8,
        scraped_at: scraped(),
        content_hash: hash,
        subscores: Default::default(),
        rank_score: 0.0,
        rank_position: 0,
    }
}

#[test]
fn near_tied_articles_select_across_categories() {
    // Ten otherwise-identical articles, two per category.
    let categories = ["World", "Tech", "Health", "Science", "Sports"];
    let regions = ["europe", "asia", "americas", "oceania", "africa"];
    let mut set = Vec::new();
    for (i, (cat, region)) in categories.iter().zip(regions.iter()).enumerate() {
        set.push(article(i as u8 * 2, cat, region));
        set.push(article(i as u8 * 2 + 1, cat, region));
    }

    let out = rank(set, &RankingWeights::default(), 2).unwrap();
    assert_eq!(out.len(), 2);
    assert_ne!(out[0].category, out[1].category);
}

#[test]
fn repeats_get_progressively_smaller_diversity_subscores() {
    let set = vec![
        article(1, "World", "europe"),
        article(2, "World", "europe"),
        article(3, "World", "europe"),
    ];
    let out = rank(set, &RankingWeights::default(), 3).unwrap();
    let divs: Vec<f32> = out.iter().map(|a| a.subscores.category_diversity).collect();
    assert!((divs[0] - 1.0).abs() < 1e-6);
    assert!((divs[1] - 0.8).abs() < 1e-6);
    assert!((divs[2] - 0.6).abs() < 1e-6);
    let geo: Vec<f32> = out.iter().map(|a| a.subscores.geographic_diversity).collect();
    assert_eq!(divs, geo);
}

#[test]
fn unique_categories_take_no_penalty() {
    let set = vec![
        article(1, "World", "europe"),
        article(2, "Tech", "asia"),
        article(3, "Health", "americas"),
    ];
    let out = rank(set, &RankingWeights::default(), 3).unwrap();
    for a in &out {
        assert!((a.subscores.category_diversity - 1.0).abs() < 1e-6);
        assert!((a.subscores.geographic_diversity - 1.0).abs() < 1e-6);
    }
}
