//! Session coordination: dispatches fetch work across all sources,
//! funnels every completed result through one mutation point, and runs
//! the ranking engine once the session settles.
//!
//! Source-level failures are isolated into the per-source error map; a
//! session is `Failed` only when zero sources yield an accepted article.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::Semaphore;
use url::Url;

use crate::article::{Article, Candidate, FetchStatus, Source};
use crate::error::{InternalError, ParseError, SourceError, ValidationError};
use crate::extract;
use crate::fetch::{HttpFetcher, PageFetcher, PER_SOURCE_DELAY};
use crate::filter::{self, FilterConfig};
use crate::normalize::{canonicalize, DedupConfig, Deduper};
use crate::rank::{self, RankingWeights, DEFAULT_TOP_N};

/// Global wall-clock budget for one ingestion run.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Global cap on in-flight fetches.
pub const MAX_IN_FLIGHT: usize = 10;

/// Candidate links followed per source.
pub const MAX_ARTICLES_PER_SOURCE: usize = 10;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("curator_kept_total", "Articles accepted into the session set.");
        describe_counter!("curator_dedup_total", "Articles dropped as duplicates.");
        describe_counter!("curator_filtered_total", "Articles dropped by the quality filter.");
        describe_counter!("curator_source_errors_total", "Sources that failed outright.");
        describe_counter!("curator_fetch_retries_total", "Fetch attempts beyond the first.");
        describe_counter!("curator_fetch_failures_total", "Fetches that gave up.");
    });
}

/// Knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Size of the selected top-N subset.
    pub max_articles: usize,
    pub weights: RankingWeights,
    pub filter: FilterConfig,
    pub dedup: DedupConfig,
    pub session_timeout: Duration,
    pub max_in_flight: usize,
    pub per_source_cap: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_articles: DEFAULT_TOP_N,
            weights: RankingWeights::default(),
            filter: FilterConfig::default(),
            dedup: DedupConfig::default(),
            session_timeout: SESSION_TIMEOUT,
            max_in_flight: MAX_IN_FLIGHT,
            per_source_cap: MAX_ARTICLES_PER_SOURCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Running,
    Completed,
    Failed,
}

/// Progress snapshot returned to status queries. Always carries partial
/// counts and the per-source error breakdown, never an opaque failure.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub sources_attempted: usize,
    pub sources_succeeded: usize,
    pub articles_collected: usize,
    pub duplicates_dropped: usize,
    pub filtered_out: usize,
    pub articles_selected: usize,
    pub errors: BTreeMap<String, String>,
}

#[derive(Debug)]
struct SessionInner {
    status: SessionStatus,
    selected: Vec<Article>,
}

pub type SessionId = String;

/// Owns all session state. Results are merged under a single lock point
/// per completed fetch, so no other stage needs synchronization.
pub struct Coordinator {
    fetcher: Arc<dyn PageFetcher>,
    sessions: Mutex<HashMap<SessionId, Arc<Mutex<SessionInner>>>>,
    seq: AtomicU64,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self::with_fetcher(Arc::new(HttpFetcher::new()))
    }

    /// Inject a fetcher; tests use this to avoid the network.
    pub fn with_fetcher(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            sessions: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Begin an ingestion run asynchronously. Weights are validated up
    /// front so a malformed request never starts a doomed session.
    pub fn start_session(
        &self,
        sources: Vec<Source>,
        opts: SessionOptions,
    ) -> Result<SessionId, ValidationError> {
        opts.weights.validate()?;
        ensure_metrics_described();

        let id = format!(
            "session-{}-{}",
            Utc::now().timestamp_millis(),
            self.seq.fetch_add(1, Ordering::Relaxed)
        );
        let inner = Arc::new(Mutex::new(SessionInner {
            status: SessionStatus {
                state: SessionState::Running,
                started_at: Utc::now(),
                ended_at: None,
                sources_attempted: sources.len(),
                sources_succeeded: 0,
                articles_collected: 0,
                duplicates_dropped: 0,
                filtered_out: 0,
                articles_selected: 0,
                errors: BTreeMap::new(),
            },
            selected: Vec::new(),
        }));
        self.sessions
            .lock()
            .unwrap()
            .insert(id.clone(), inner.clone());

        let fetcher = self.fetcher.clone();
        let session_id = id.clone();
        tokio::spawn(async move {
            let run = tokio::spawn(run_session(fetcher, inner.clone(), sources, opts));
            if let Err(join_err) = run.await {
                // Invariant violation territory: the run task panicked.
                tracing::error!(session = %session_id, error = %join_err, "session task aborted");
                let mut guard = inner.lock().unwrap();
                guard.status.state = SessionState::Failed;
                guard.status.ended_at = Some(Utc::now());
                let err = InternalError(format!("session task aborted: {join_err}"));
                guard.status.errors.insert("session".into(), err.to_string());
            }
        });

        tracing::info!(session = %id, "session started");
        Ok(id)
    }

    /// Snapshot of a session's progress, or `None` for unknown ids.
    pub fn session_status(&self, id: &str) -> Option<SessionStatus> {
        let sessions = self.sessions.lock().unwrap();
        sessions.get(id).map(|s| s.lock().unwrap().status.clone())
    }

    /// Drop a session's record, returning its last status. Removing a
    /// session that is still running detaches it: the run keeps going
    /// but its outcome is no longer observable.
    pub fn remove_session(&self, id: &str) -> Option<SessionStatus> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(id).map(|s| s.lock().unwrap().status.clone())
    }

    /// Drop every session that is no longer running, returning how many
    /// were removed. Long-lived embedders call this between runs so the
    /// registry does not grow without bound.
    pub fn prune_completed(&self) -> usize {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.lock().unwrap().status.state == SessionState::Running);
        before - sessions.len()
    }

    /// The selected articles once the session completed; `None` while
    /// still running or for unknown ids.
    pub fn session_articles(&self, id: &str) -> Option<Vec<Article>> {
        let sessions = self.sessions.lock().unwrap();
        let inner = sessions.get(id)?;
        let guard = inner.lock().unwrap();
        match guard.status.state {
            SessionState::Running => None,
            _ => Some(guard.selected.clone()),
        }
    }
}

async fn run_session(
    fetcher: Arc<dyn PageFetcher>,
    inner: Arc<Mutex<SessionInner>>,
    sources: Vec<Source>,
    opts: SessionOptions,
) {
    let semaphore = Arc::new(Semaphore::new(opts.max_in_flight.max(1)));
    let mut deduper = Deduper::new(opts.dedup);
    let mut accepted: Vec<Article> = Vec::new();
    let mut completed: HashSet<String> = HashSet::new();

    {
        let mut results = stream::iter(sources.iter().cloned().map(|source| {
            let fetcher = fetcher.clone();
            let semaphore = semaphore.clone();
            let cap = opts.per_source_cap;
            async move {
                let outcome = harvest_source(fetcher.as_ref(), &source, cap, &semaphore).await;
                (source, outcome)
            }
        }))
        .buffer_unordered(opts.max_in_flight.max(1));

        let drain = async {
            while let Some((source, outcome)) = results.next().await {
                completed.insert(source.id.clone());
                merge_source_result(&inner, &mut deduper, &mut accepted, &opts.filter, &source, outcome);
            }
        };

        if tokio::time::timeout(opts.session_timeout, drain).await.is_err() {
            tracing::warn!("session deadline reached; ranking partial results");
            let mut guard = inner.lock().unwrap();
            for source in &sources {
                if !completed.contains(&source.id) {
                    guard
                        .status
                        .errors
                        .insert(source.id.clone(), SourceError::SessionTimeout.to_string());
                }
            }
        }
        // Dropping the stream cancels any fetch still in flight.
    }

    let collected = accepted.len();
    let ranked = rank::rank(accepted, &opts.weights, opts.max_articles);

    let mut guard = inner.lock().unwrap();
    match ranked {
        Ok(selected) => {
            guard.status.articles_selected = selected.len();
            guard.status.state = if collected == 0 {
                SessionState::Failed
            } else {
                SessionState::Completed
            };
            guard.selected = selected;
        }
        Err(e) => {
            // Weights were validated at start; reaching this is a bug.
            guard.status.state = SessionState::Failed;
            guard.status.errors.insert("ranking".into(), e.to_string());
        }
    }
    guard.status.ended_at = Some(Utc::now());
    tracing::info!(
        collected,
        selected = guard.status.articles_selected,
        succeeded = guard.status.sources_succeeded,
        attempted = guard.status.sources_attempted,
        state = ?guard.status.state,
        "session finished"
    );
}

/// The single mutation point: one completed source's articles enter the
/// session set here, through dedup and the quality gate.
fn merge_source_result(
    inner: &Arc<Mutex<SessionInner>>,
    deduper: &mut Deduper,
    accepted: &mut Vec<Article>,
    filter_cfg: &FilterConfig,
    source: &Source,
    outcome: Result<Vec<Article>, SourceError>,
) {
    let mut guard = inner.lock().unwrap();
    match outcome {
        Ok(articles) => {
            guard.status.sources_succeeded += 1;
            for article in articles {
                if !deduper.admit(&article) {
                    guard.status.duplicates_dropped += 1;
                    counter!("curator_dedup_total").increment(1);
                    continue;
                }
                if let Some(reason) = filter::evaluate(&article, filter_cfg) {
                    guard.status.filtered_out += 1;
                    counter!("curator_filtered_total").increment(1);
                    tracing::debug!(article = %article.id, reason = reason.as_str(), "rejected by quality gate");
                    continue;
                }
                guard.status.articles_collected += 1;
                counter!("curator_kept_total").increment(1);
                accepted.push(article);
            }
        }
        Err(err) => {
            tracing::warn!(source = %source.id, error = %err, "source contributed nothing");
            counter!("curator_source_errors_total").increment(1);
            guard.status.errors.insert(source.id.clone(), err.to_string());
        }
    }
}

/// Fetch one source end to end: landing page, candidate links, then each
/// article page at most once per second, all under the global semaphore.
async fn harvest_source(
    fetcher: &dyn PageFetcher,
    source: &Source,
    per_source_cap: usize,
    semaphore: &Semaphore,
) -> Result<Vec<Article>, SourceError> {
    let landing = {
        let _permit = match semaphore.acquire().await {
            Ok(p) => p,
            Err(_) => return Err(SourceError::SessionTimeout),
        };
        fetcher.fetch(source, &source.url).await?
    };

    let base = Url::parse(&source.url).map_err(|e| {
        SourceError::Parse(ParseError::new(&source.url, format!("invalid source url: {e}")))
    })?;
    let links = extract::index_candidates(&landing.body, &base)?;

    let mut articles = Vec::new();
    for link in links.into_iter().take(per_source_cap) {
        tokio::time::sleep(PER_SOURCE_DELAY).await;

        let page = {
            let _permit = match semaphore.acquire().await {
                Ok(p) => p,
                Err(_) => break,
            };
            match fetcher.fetch(source, &link.url).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(
                        source = %source.id, url = %link.url,
                        status = ?FetchStatus::from(&e), error = %e,
                        "article fetch failed"
                    );
                    continue;
                }
            }
        };

        let body_text = extract::extract_body(&page.body);
        let image_url = extract::extract_image(&page.body, &base);
        let candidate = Candidate {
            title: link.headline,
            url: link.url,
            body_text,
            image_url,
            source_id: source.id.clone(),
            category: source.category.clone(),
            scraped_at: page.fetched_at,
        };
        match canonicalize(candidate, source) {
            Ok(article) => articles.push(article),
            Err(e) => tracing::debug!(source = %source.id, error = %e, "candidate rejected at construction"),
        }
    }

    tracing::info!(source = %source.id, count = articles.len(), "source harvested");
    Ok(articles)
}
