//! The five order-independent subscores, each normalized to [0,1].
//!
//! Missing fields score 0.0 rather than erroring; the two diversity
//! subscores are order-dependent and live in the selection pass.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

use crate::article::Article;

/// Body length past which extra characters stop adding quality.
const BODY_SATURATION_CHARS: usize = 2400;

/// Paragraph count past which extra paragraphs stop adding quality.
const PARAGRAPH_SATURATION: usize = 6;

/// Title words that mark time-critical stories.
const URGENCY_KEYWORDS: &[&str] = &["breaking", "urgent", "just in", "live updates"];

static RE_CLICKBAIT: Lazy<Vec<regex::Regex>> = Lazy::new(|| {
    [
        r"(?i)\byou won'?t believe\b",
        r"(?i)\bshocking\b",
        r"(?i)\bthis one trick\b",
        r"(?i)\b\d+ (things|reasons|ways)\b",
    ]
    .iter()
    .map(|p| regex::Regex::new(p).unwrap())
    .collect()
});

static RE_DIGITS: Lazy<regex::Regex> = Lazy::new(|| regex::Regex::new(r"\b\d+\b").unwrap());

pub(crate) fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Monotonic in body length, saturating at the length ceiling; blended
/// with a saturating paragraph-count component.
pub fn content_quality(article: &Article) -> f32 {
    let len = article.body_text.chars().count();
    let length_part = (len.min(BODY_SATURATION_CHARS) as f32) / BODY_SATURATION_CHARS as f32;

    let paragraphs = article
        .body_text
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .count();
    let para_part = (paragraphs.min(PARAGRAPH_SATURATION) as f32) / PARAGRAPH_SATURATION as f32;

    clamp01(0.7 * length_part + 0.3 * para_part)
}

/// The source's configured credibility weight, looked up directly.
pub fn source_credibility(article: &Article) -> f32 {
    clamp01(article.credibility)
}

/// Heuristic headline score: length band plus engagement markers, with
/// penalties for shouting, punctuation abuse, and clickbait patterns.
pub fn title_engagement(article: &Article) -> f32 {
    let title = article.title.trim();
    if title.is_empty() {
        return 0.0;
    }

    let mut score = 0.5_f32;
    let len = title.chars().count();
    if (40..=100).contains(&len) {
        score += 0.2;
    } else if (20..=120).contains(&len) {
        score += 0.1;
    }

    if title.contains('?') {
        score += 0.1;
    }
    if RE_DIGITS.is_match(title) {
        score += 0.05;
    }

    let letters: Vec<char> = title.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 8 {
        let upper = letters.iter().filter(|c| c.is_uppercase()).count();
        if upper as f32 / letters.len() as f32 > 0.7 {
            score -= 0.2;
        }
    }
    if title.contains("!!") || title.contains("??") {
        score -= 0.15;
    }
    for re in RE_CLICKBAIT.iter() {
        if re.is_match(title) {
            score -= 0.1;
        }
    }

    clamp01(score)
}

/// 1.0 iff the article carries a well-formed http(s) image URL.
pub fn visual_content(article: &Article) -> f32 {
    let Some(image) = &article.image_url else {
        return 0.0;
    };
    match url::Url::parse(image) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => 1.0,
        _ => 0.0,
    }
}

/// Stepwise decay by age relative to `reference` (the session window
/// end), plus a capped boost for urgency keywords in the title.
pub fn timeliness(article: &Article, reference: DateTime<Utc>) -> f32 {
    let hours = (reference - article.scraped_at).num_minutes() as f32 / 60.0;
    let base = if hours < 0.0 {
        1.0
    } else if hours < 1.0 {
        1.0
    } else if hours < 6.0 {
        0.9
    } else if hours < 12.0 {
        0.8
    } else if hours < 24.0 {
        0.7
    } else if hours < 48.0 {
        0.5
    } else if hours < 72.0 {
        0.3
    } else {
        0.1
    };

    let title = article.title.to_lowercase();
    let boost = if URGENCY_KEYWORDS.iter().any(|k| title.contains(k)) {
        0.1
    } else {
        0.0
    };
    clamp01(base + boost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn article(title: &str, body: &str) -> Article {
        Article {
            id: "aaaaaaaaaaaa".into(),
            title: title.into(),
            url: "https://example.com/a".into(),
            body_text: body.into(),
            image_url: None,
            source_id: "s1".into(),
            category: "World".into(),
            region: "global".into(),
            credibility: 0.8,
            scraped_at: Utc::now(),
            content_hash: "a".repeat(64),
            subscores: Default::default(),
            rank_score: 0.0,
            rank_position: 0,
        }
    }

    #[test]
    fn content_quality_is_monotonic_until_saturation() {
        let short = article("t", &"x".repeat(500));
        let long = article("t", &"x".repeat(2000));
        let saturated = article("t", &"x".repeat(3000));
        let very_long = article("t", &"x".repeat(9000));
        assert!(content_quality(&long) > content_quality(&short));
        assert!((content_quality(&saturated) - content_quality(&very_long)).abs() < 1e-6);
    }

    #[test]
    fn paragraph_structure_adds_quality() {
        let flat = article("t", &"x".repeat(1200));
        let structured = article("t", &vec!["y".repeat(400); 3].join("\n\n"));
        assert!(content_quality(&structured) > content_quality(&flat));
    }

    #[test]
    fn shouting_and_clickbait_lower_engagement() {
        let plain = article("Parliament passes the annual budget bill", "");
        let caps = article("PARLIAMENT PASSES THE ANNUAL BUDGET BILL", "");
        let bait = article("You Won't Believe What Parliament Did!!", "");
        assert!(title_engagement(&caps) < title_engagement(&plain));
        assert!(title_engagement(&bait) < title_engagement(&plain));
    }

    #[test]
    fn good_length_band_scores_best() {
        let good = article("Parliament passes annual budget after marathon session", "");
        let tiny = article("Budget passes", "");
        assert!(title_engagement(&good) > title_engagement(&tiny));
    }

    #[test]
    fn visual_content_requires_wellformed_url() {
        let mut a = article("t", "");
        assert_eq!(visual_content(&a), 0.0);
        a.image_url = Some("not a url".into());
        assert_eq!(visual_content(&a), 0.0);
        a.image_url = Some("https://example.com/lead.jpg".into());
        assert_eq!(visual_content(&a), 1.0);
    }

    #[test]
    fn timeliness_decays_with_age_and_boosts_urgency() {
        let now = Utc::now();
        let mut fresh = article("Quiet day on the markets today", "");
        fresh.scraped_at = now;
        let mut old = article("Quiet day on the markets today", "");
        old.scraped_at = now - Duration::hours(80);
        assert!(timeliness(&fresh, now) > timeliness(&old, now));
        assert!((timeliness(&old, now) - 0.1).abs() < 1e-6);

        let mut urgent = article("Breaking: markets halted", "");
        urgent.scraped_at = now;
        assert_eq!(timeliness(&urgent, now), 1.0); // capped at 1.0
    }
}
