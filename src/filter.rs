//! Quality filter: a pure predicate over canonical articles.
//!
//! Rejections are counted by the coordinator, never treated as errors,
//! and no article fields are mutated here.

use crate::article::Article;

/// Thresholds and deny lists for the quality gate.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Minimum body length in characters; articles exactly at the
    /// threshold are accepted.
    pub min_body_chars: usize,
    /// Lowercase phrases that disqualify a title.
    pub blocked_phrases: Vec<String>,
    /// Hosts (and their subdomains) whose articles are dropped.
    pub denied_domains: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_body_chars: 400,
            blocked_phrases: [
                "sign up",
                "subscribe now",
                "newsletter",
                "sponsored",
                "advertisement",
                "live updates gallery",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            denied_domains: Vec::new(),
        }
    }
}

/// Why an article failed the quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    BodyTooShort,
    EmptyTitle,
    BlockedPhrase,
    DeniedDomain,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::BodyTooShort => "body_too_short",
            RejectReason::EmptyTitle => "empty_title",
            RejectReason::BlockedPhrase => "blocked_phrase",
            RejectReason::DeniedDomain => "denied_domain",
        }
    }
}

/// Evaluate the gate; `None` means the article is accepted.
pub fn evaluate(article: &Article, cfg: &FilterConfig) -> Option<RejectReason> {
    if article.title.trim().is_empty() {
        return Some(RejectReason::EmptyTitle);
    }

    let title = article.title.to_lowercase();
    if cfg.blocked_phrases.iter().any(|p| title.contains(p.as_str())) {
        return Some(RejectReason::BlockedPhrase);
    }

    if article.body_text.chars().count() < cfg.min_body_chars {
        return Some(RejectReason::BodyTooShort);
    }

    if !cfg.denied_domains.is_empty() {
        if let Ok(parsed) = url::Url::parse(&article.url) {
            if let Some(host) = parsed.host_str() {
                let host = host.to_ascii_lowercase();
                let denied = cfg.denied_domains.iter().any(|d| {
                    let d = d.to_ascii_lowercase();
                    host == d || host.ends_with(&format!(".{d}"))
                });
                if denied {
                    return Some(RejectReason::DeniedDomain);
                }
            }
        }
    }

    None
}

pub fn accepts(article: &Article, cfg: &FilterConfig) -> bool {
    evaluate(article, cfg).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(title: &str, body_len: usize, url: &str) -> Article {
        Article {
            id: "abc123def456".into(),
            title: title.into(),
            url: url.into(),
            body_text: "x".repeat(body_len),
            image_url: None,
            source_id: "s1".into(),
            category: "World".into(),
            region: "global".into(),
            credibility: 0.8,
            scraped_at: Utc::now(),
            content_hash: "abc123def456".repeat(5),
            subscores: Default::default(),
            rank_score: 0.0,
            rank_position: 0,
        }
    }

    #[test]
    fn body_length_boundary_is_inclusive() {
        let cfg = FilterConfig::default();
        let at = article("Valid headline", 400, "https://example.com/a");
        let below = article("Valid headline", 399, "https://example.com/a");
        assert!(accepts(&at, &cfg));
        assert_eq!(evaluate(&below, &cfg), Some(RejectReason::BodyTooShort));
    }

    #[test]
    fn blocked_phrases_disqualify_titles() {
        let cfg = FilterConfig::default();
        let a = article("Subscribe now for more", 1000, "https://example.com/a");
        assert_eq!(evaluate(&a, &cfg), Some(RejectReason::BlockedPhrase));
    }

    #[test]
    fn denied_domains_cover_subdomains() {
        let cfg = FilterConfig {
            denied_domains: vec!["spam.example".into()],
            ..Default::default()
        };
        let direct = article("Headline", 1000, "https://spam.example/a");
        let sub = article("Headline", 1000, "https://news.spam.example/a");
        let other = article("Headline", 1000, "https://example.com/a");
        assert_eq!(evaluate(&direct, &cfg), Some(RejectReason::DeniedDomain));
        assert_eq!(evaluate(&sub, &cfg), Some(RejectReason::DeniedDomain));
        assert!(accepts(&other, &cfg));
    }

    #[test]
    fn empty_title_rejected() {
        let cfg = FilterConfig::default();
        let a = article("  ", 1000, "https://example.com/a");
        assert_eq!(evaluate(&a, &cfg), Some(RejectReason::EmptyTitle));
    }
}
