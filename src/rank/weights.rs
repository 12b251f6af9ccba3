//! Seven-factor ranking weights.
//!
//! Weights are supplied per ranking invocation, validated, and never
//! mutated. The sum must be 1.0 within a small epsilon so rank scores
//! stay in [0,1] by construction.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Tolerance on the weight sum.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub content_quality: f32,
    pub source_credibility: f32,
    pub title_engagement: f32,
    pub visual_content: f32,
    pub timeliness: f32,
    pub category_diversity: f32,
    pub geographic_diversity: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            content_quality: 0.20,
            source_credibility: 0.20,
            title_engagement: 0.15,
            visual_content: 0.10,
            timeliness: 0.15,
            category_diversity: 0.10,
            geographic_diversity: 0.10,
        }
    }
}

impl RankingWeights {
    /// Emphasize content quality and source credibility.
    pub fn quality_focused() -> Self {
        Self {
            content_quality: 0.30,
            source_credibility: 0.30,
            title_engagement: 0.10,
            visual_content: 0.05,
            timeliness: 0.10,
            category_diversity: 0.08,
            geographic_diversity: 0.07,
        }
    }

    /// Emphasize engagement and visuals.
    pub fn engagement_focused() -> Self {
        Self {
            content_quality: 0.15,
            source_credibility: 0.15,
            title_engagement: 0.25,
            visual_content: 0.20,
            timeliness: 0.10,
            category_diversity: 0.08,
            geographic_diversity: 0.07,
        }
    }

    /// Emphasize freshness.
    pub fn breaking_news() -> Self {
        Self {
            content_quality: 0.15,
            source_credibility: 0.20,
            title_engagement: 0.10,
            visual_content: 0.10,
            timeliness: 0.30,
            category_diversity: 0.08,
            geographic_diversity: 0.07,
        }
    }

    /// Look up a named preset.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "quality_focused" => Some(Self::quality_focused()),
            "engagement_focused" => Some(Self::engagement_focused()),
            "breaking_news" => Some(Self::breaking_news()),
            _ => None,
        }
    }

    fn factors(&self) -> [(&'static str, f32); 7] {
        [
            ("content_quality", self.content_quality),
            ("source_credibility", self.source_credibility),
            ("title_engagement", self.title_engagement),
            ("visual_content", self.visual_content),
            ("timeliness", self.timeliness),
            ("category_diversity", self.category_diversity),
            ("geographic_diversity", self.geographic_diversity),
        ]
    }

    /// Sum in f64 so the epsilon check is not dominated by f32 rounding.
    pub fn sum(&self) -> f64 {
        self.factors().iter().map(|(_, w)| *w as f64).sum()
    }

    /// All factors non-negative and summing to 1.0 within epsilon.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, w) in self.factors() {
            if w < 0.0 || !w.is_finite() {
                return Err(ValidationError(format!("{name} must be a non-negative finite number, got {w}")));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ValidationError(format!("weights must sum to 1.0, got {sum}")));
        }
        Ok(())
    }
}
