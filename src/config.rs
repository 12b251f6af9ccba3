//! Boundary loading for source lists and weight presets.
//!
//! The session consumes an ordered list of `Source` records owned by
//! configuration; this module reads them from TOML or JSON with an
//! env-var override and sensible fallback paths.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::article::Source;
use crate::rank::RankingWeights;

const ENV_PATH: &str = "CURATOR_SOURCES_PATH";

/// Load sources from an explicit path. Supports TOML or JSON.
pub fn load_sources_from(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load sources using env var + fallbacks:
/// 1) $CURATOR_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
pub fn load_sources_default() -> Result<Vec<Source>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("CURATOR_SOURCES_PATH points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<Source>> {
    #[derive(serde::Deserialize)]
    struct SourcesFile {
        sources: Vec<Source>,
    }
    let v: SourcesFile = toml::from_str(s)?;
    Ok(clean(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<Source>> {
    let v: Vec<Source> = serde_json::from_str(s)?;
    Ok(clean(v))
}

/// Drop entries with blank ids or urls; keep input order, first id wins.
fn clean(items: Vec<Source>) -> Vec<Source> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|s| !s.id.trim().is_empty() && !s.url.trim().is_empty())
        .filter(|s| seen.insert(s.id.clone()))
        .collect()
}

/// Named weight preset lookup for collaborators that configure weights
/// by name rather than by the seven raw numbers.
pub fn weights_preset(name: &str) -> Option<RankingWeights> {
    RankingWeights::preset(name)
}
