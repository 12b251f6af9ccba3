//! Canonical data model for one ingestion session.
//!
//! `Source` is immutable once loaded. A `RawPage` is produced by the
//! fetcher, consumed once by the extractor, then discarded. `Candidate`
//! is the extractor's output; the normalizer turns it into an `Article`
//! with a content hash assigned, and the ranking engine fills in the
//! subscores and final position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a source's pages must be retrieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Direct HTTP GET.
    #[default]
    Static,
    /// Script-driven content; routed through the renderer with a longer
    /// timeout so the page can settle.
    Dynamic,
}

/// A configured origin site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub url: String,
    pub category: String,
    /// Trust weight in [0,1]; feeds the credibility subscore directly.
    #[serde(default = "default_credibility")]
    pub credibility: f32,
    /// Coarse region tag. Derived from the host TLD when absent.
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub render_mode: RenderMode,
}

fn default_credibility() -> f32 {
    0.5
}

impl Source {
    /// Resolve the coarse region tag used by the geographic-diversity
    /// subscore: explicit tag first, then a TLD bucket, else "global".
    pub fn region_tag(&self) -> String {
        if let Some(r) = &self.region {
            if !r.trim().is_empty() {
                return r.trim().to_ascii_lowercase();
            }
        }
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(region_from_host))
            .unwrap_or_else(|| "global".to_string())
    }
}

fn region_from_host(host: &str) -> String {
    let tld = host.rsplit('.').next().unwrap_or_default();
    let region = match tld {
        "uk" | "ie" | "de" | "fr" | "it" | "es" | "nl" | "pl" | "cz" | "se" | "no" => "europe",
        "jp" | "cn" | "in" | "kr" | "sg" | "hk" | "id" | "th" => "asia",
        "au" | "nz" => "oceania",
        "us" | "ca" | "mx" | "br" | "ar" => "americas",
        "za" | "ng" | "ke" | "eg" => "africa",
        _ => "global",
    };
    region.to_string()
}

/// Outcome of one page retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Ok,
    Timeout,
    Blocked,
    Error,
}

/// Raw page content for one URL. Transient: consumed by the extractor,
/// never persisted.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub source_id: String,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub status: FetchStatus,
    pub body: String,
}

/// Extractor output: an article before hashing and scoring.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub title: String,
    pub url: String,
    pub body_text: String,
    pub image_url: Option<String>,
    pub source_id: String,
    pub category: String,
    pub scraped_at: DateTime<Utc>,
}

/// The seven normalized [0,1] inputs to the weighted rank formula.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    pub content_quality: f32,
    pub source_credibility: f32,
    pub title_engagement: f32,
    pub visual_content: f32,
    pub timeliness: f32,
    pub category_diversity: f32,
    pub geographic_diversity: f32,
}

/// The canonical unit flowing through the pipeline.
///
/// Created by the normalizer from a `Candidate`; `subscores`,
/// `rank_score`, and `rank_position` are assigned by the ranking engine
/// and the record is never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Short id, the leading 12 hex chars of `content_hash`.
    pub id: String,
    pub title: String,
    pub url: String,
    pub body_text: String,
    pub image_url: Option<String>,
    pub source_id: String,
    pub category: String,
    pub region: String,
    pub credibility: f32,
    pub scraped_at: DateTime<Utc>,
    pub content_hash: String,
    #[serde(default)]
    pub subscores: Subscores,
    #[serde(default)]
    pub rank_score: f32,
    /// 1-based position within the selected subset; 0 while unranked.
    #[serde(default)]
    pub rank_position: usize,
}
