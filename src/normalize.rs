//! Normalization, content fingerprinting, and session-scoped deduplication.
//!
//! The content hash is computed from the normalized title plus the
//! canonicalized URL, so both exact re-scrapes and near-identical
//! syndication of the same wire story under a slightly different URL
//! collapse to one fingerprint.

use std::collections::HashSet;

use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use url::Url;

use crate::article::{Article, Candidate, Source};
use crate::error::ParseError;

/// Hex chars of the content hash used as the article id.
const ID_LEN: usize = 12;

/// Normalize a title for fingerprinting: entity decode, tag strip,
/// lowercase, whitespace collapse, trailing punctuation trim.
pub fn normalize_title(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .to_lowercase();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    out
}

/// Canonical form of an article URL: scheme, lowercased host, and path
/// only. Query and fragment are stripped, the trailing slash removed.
pub fn canonical_url(raw: &str) -> Result<String, ParseError> {
    let parsed =
        Url::parse(raw).map_err(|e| ParseError::new(raw, format!("invalid url: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(ParseError::new(raw, format!("unsupported scheme {other}"))),
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| ParseError::new(raw, "url has no host"))?
        .to_ascii_lowercase();
    let path = parsed.path().trim_end_matches('/');
    Ok(format!("{}://{}{}", parsed.scheme(), host, path))
}

/// SHA-256 fingerprint over the normalized title and canonical URL.
pub fn content_hash(normalized_title: &str, canonical_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_title.as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Turn an extractor candidate into a canonical `Article`, assigning the
/// content hash and id. Rejects candidates missing required fields at
/// construction rather than letting them surface deep in the pipeline.
pub fn canonicalize(candidate: Candidate, source: &Source) -> Result<Article, ParseError> {
    let title = candidate.title.trim().to_string();
    if title.is_empty() {
        return Err(ParseError::new(&candidate.url, "candidate has empty title"));
    }
    let canon = canonical_url(&candidate.url)?;
    let hash = content_hash(&normalize_title(&title), &canon);

    Ok(Article {
        id: hash[..ID_LEN].to_string(),
        title,
        url: candidate.url,
        body_text: candidate.body_text,
        image_url: candidate.image_url,
        source_id: candidate.source_id,
        category: candidate.category,
        region: source.region_tag(),
        credibility: source.credibility.clamp(0.0, 1.0),
        scraped_at: candidate.scraped_at,
        content_hash: hash,
        subscores: Default::default(),
        rank_score: 0.0,
        rank_position: 0,
    })
}

/// Near-duplicate handling for the deduplicator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupConfig {
    /// Optional normalized-Levenshtein threshold in (0,1]; titles at or
    /// above it are treated as duplicates even when hashes differ.
    /// Off by default.
    pub fuzzy_threshold: Option<f64>,
}

/// Session-scoped duplicate rejection. First occurrence wins; later
/// duplicates are counted, not errored. Idempotent: admitting the same
/// article twice always rejects the second.
#[derive(Debug, Default)]
pub struct Deduper {
    cfg: DedupConfig,
    seen_hashes: HashSet<String>,
    seen_titles: Vec<String>,
    duplicates: usize,
}

impl Deduper {
    pub fn new(cfg: DedupConfig) -> Self {
        Self {
            cfg,
            ..Default::default()
        }
    }

    /// Returns true if the article is the first of its fingerprint.
    pub fn admit(&mut self, article: &Article) -> bool {
        if !self.seen_hashes.insert(article.content_hash.clone()) {
            self.duplicates += 1;
            return false;
        }

        let title = normalize_title(&article.title);
        if let Some(threshold) = self.cfg.fuzzy_threshold {
            let near = self
                .seen_titles
                .iter()
                .any(|t| strsim::normalized_levenshtein(t, &title) >= threshold);
            if near {
                self.duplicates += 1;
                return false;
            }
        }
        self.seen_titles.push(title);
        true
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::RenderMode;
    use chrono::Utc;

    fn source() -> Source {
        Source {
            id: "bbc".into(),
            url: "https://bbc.co.uk".into(),
            category: "World".into(),
            credibility: 0.9,
            region: None,
            render_mode: RenderMode::Static,
        }
    }

    fn candidate(title: &str, url: &str) -> Candidate {
        Candidate {
            title: title.into(),
            url: url.into(),
            body_text: "body".into(),
            image_url: None,
            source_id: "bbc".into(),
            category: "World".into(),
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn title_normalization_collapses_case_ws_and_punct() {
        assert_eq!(
            normalize_title("  Storm&nbsp;Hits   COAST!!! "),
            "storm hits coast"
        );
        assert_eq!(normalize_title("<b>Vote</b> “today”"), "vote \"today\"");
    }

    #[test]
    fn canonical_url_strips_query_fragment_and_trailing_slash() {
        let c = canonical_url("https://Example.com/News/story/?utm=x#top").unwrap();
        assert_eq!(c, "https://example.com/News/story");
    }

    #[test]
    fn canonical_url_rejects_non_http() {
        assert!(canonical_url("ftp://example.com/a").is_err());
        assert!(canonical_url("javascript:void(0)").is_err());
    }

    #[test]
    fn syndicated_copies_share_a_hash() {
        let a = canonicalize(candidate("Storm hits coast", "https://example.com/a/?ref=rss"), &source())
            .unwrap();
        let b = canonicalize(candidate("Storm Hits Coast!", "https://example.com/a"), &source())
            .unwrap();
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.id.len(), 12);
    }

    #[test]
    fn first_occurrence_wins() {
        let s = source();
        let a = canonicalize(candidate("Storm hits coast", "https://example.com/a"), &s).unwrap();
        let b = canonicalize(candidate("storm hits coast", "https://example.com/a/"), &s).unwrap();

        let mut dedup = Deduper::new(DedupConfig::default());
        assert!(dedup.admit(&a));
        assert!(!dedup.admit(&b));
        assert!(!dedup.admit(&a));
        assert_eq!(dedup.duplicates(), 2);
    }

    #[test]
    fn fuzzy_gate_catches_rephrased_headlines() {
        let s = source();
        let a = canonicalize(candidate("Storm hits northern coast", "https://one.com/a"), &s).unwrap();
        let b = canonicalize(candidate("Storm hits northern coasts", "https://two.com/b"), &s).unwrap();

        let mut exact = Deduper::new(DedupConfig::default());
        assert!(exact.admit(&a));
        assert!(exact.admit(&b));

        let mut fuzzy = Deduper::new(DedupConfig {
            fuzzy_threshold: Some(0.9),
        });
        assert!(fuzzy.admit(&a));
        assert!(!fuzzy.admit(&b));
    }

    #[test]
    fn empty_title_is_rejected_at_construction() {
        let err = canonicalize(candidate("   ", "https://example.com/a"), &source());
        assert!(err.is_err());
    }
}
