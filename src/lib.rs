// src/lib.rs
// Public library surface for the ingestion-and-ranking core.

pub mod article;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod normalize;
pub mod rank;
pub mod session;

// ---- Re-exports for stable public API ----
pub use crate::article::{Article, Candidate, FetchStatus, RawPage, RenderMode, Source, Subscores};
pub use crate::error::{FetchError, InternalError, ParseError, SourceError, ValidationError};
pub use crate::fetch::{HttpFetcher, PageFetcher, RetryPolicy};
pub use crate::filter::FilterConfig;
pub use crate::normalize::DedupConfig;
pub use crate::rank::{rank, RankingWeights, DEFAULT_TOP_N};
pub use crate::session::{
    Coordinator, SessionId, SessionOptions, SessionState, SessionStatus,
};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - a debug build
///   - CURATOR_DEV_LOG=1
pub fn init_dev_tracing() {
    let dev_flag = std::env::var("CURATOR_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");
    if !(dev_flag && cfg!(debug_assertions)) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("frontpage_curator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}
