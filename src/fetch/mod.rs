//! Page retrieval with retry, backoff, and anti-automation hygiene.
//!
//! `PageFetcher` is the seam the session coordinator fetches through;
//! `HttpFetcher` is the production implementation. Failures here are
//! never fatal to a session: after retries are exhausted the source is
//! recorded in the session error map and contributes zero articles.

pub mod render;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use rand::Rng;

use crate::article::{FetchStatus, RawPage, RenderMode, Source};
use crate::error::FetchError;
use render::{HttpRenderer, Renderer};

/// Per-request timeout for static sources.
pub const STATIC_TIMEOUT: Duration = Duration::from_secs(15);

/// Per-request timeout for rendered sources; longer so script-driven
/// content can settle.
pub const DYNAMIC_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between consecutive requests to the same source.
pub const PER_SOURCE_DELAY: Duration = Duration::from_secs(1);

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

fn pick_user_agent() -> &'static str {
    use rand::seq::IndexedRandom;
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// 2xx passes; 403/429 count as blocked; everything else is a plain
/// status failure (transience decided by the error itself).
pub(crate) fn classify_status(code: u16) -> Result<(), FetchError> {
    match code {
        200..=299 => Ok(()),
        403 | 429 => Err(FetchError::Blocked { status: code }),
        _ => Err(FetchError::Status(code)),
    }
}

/// Explicit retry policy: max attempts with exponential backoff and
/// proportional jitter. A forced floor (e.g. after 429) overrides the
/// computed delay when larger.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: f64,
    /// Proportional jitter, e.g. 0.2 for plus or minus 20 percent.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt number `attempt` (1-based; attempt 0 never
    /// waits).
    pub fn delay(&self, attempt: u32, floor: Option<Duration>) -> Duration {
        let exp = self.base_delay.mul_f64(self.factor.powi(attempt as i32 - 1));
        let spread = rand::rng().random_range(1.0 - self.jitter..=1.0 + self.jitter);
        let jittered = exp.mul_f64(spread);
        match floor {
            Some(f) if f > jittered => f,
            _ => jittered,
        }
    }
}

/// Retrieval seam for the coordinator; mocked in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one URL on behalf of `source`, honoring its render mode.
    async fn fetch(&self, source: &Source, url: &str) -> Result<RawPage, FetchError>;
}

/// Production fetcher: reqwest for static sources, the renderer seam
/// for dynamic ones, retries per `RetryPolicy`.
pub struct HttpFetcher {
    client: reqwest::Client,
    renderer: Arc<dyn Renderer>,
    policy: RetryPolicy,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_renderer(Arc::new(HttpRenderer::default()))
    }

    pub fn with_renderer(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            client: reqwest::Client::new(),
            renderer,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn attempt(&self, source: &Source, url: &str) -> Result<RawPage, FetchError> {
        let body = match source.render_mode {
            RenderMode::Static => {
                let resp = self
                    .client
                    .get(url)
                    .header(reqwest::header::USER_AGENT, pick_user_agent())
                    .timeout(STATIC_TIMEOUT)
                    .send()
                    .await?;
                classify_status(resp.status().as_u16())?;
                resp.text().await?
            }
            RenderMode::Dynamic => {
                self.renderer
                    .render(url, pick_user_agent(), DYNAMIC_TIMEOUT)
                    .await?
            }
        };

        Ok(RawPage {
            source_id: source.id.clone(),
            url: url.to_string(),
            fetched_at: Utc::now(),
            status: FetchStatus::Ok,
            body,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, source: &Source, url: &str) -> Result<RawPage, FetchError> {
        let mut last: Option<FetchError> = None;

        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                let floor = last.as_ref().and_then(|e| e.retry_floor());
                let delay = self.policy.delay(attempt, floor);
                tracing::debug!(source = %source.id, %url, attempt, ?delay, "retrying fetch");
                counter!("curator_fetch_retries_total").increment(1);
                tokio::time::sleep(delay).await;
            }

            match self.attempt(source, url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() => {
                    tracing::warn!(source = %source.id, %url, error = %e, "transient fetch failure");
                    last = Some(e);
                }
                Err(e) => {
                    counter!("curator_fetch_failures_total").increment(1);
                    tracing::warn!(
                        source = %source.id, %url,
                        status = ?FetchStatus::from(&e), error = %e,
                        "permanent fetch failure"
                    );
                    return Err(e);
                }
            }
        }

        counter!("curator_fetch_failures_total").increment(1);
        let err = FetchError::RetriesExhausted {
            attempts: self.policy.max_attempts,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        };
        tracing::warn!(
            source = %source.id, %url,
            status = ?FetchStatus::from(&err), error = %err,
            "fetch gave up"
        );
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(classify_status(200).is_ok());
        assert!(matches!(
            classify_status(429),
            Err(FetchError::Blocked { status: 429 })
        ));
        assert!(matches!(classify_status(404), Err(FetchError::Status(404))));
        assert!(matches!(classify_status(503), Err(FetchError::Status(503))));
    }

    #[test]
    fn backoff_grows_and_stays_within_jitter_band() {
        let policy = RetryPolicy::default();
        for _ in 0..20 {
            let d1 = policy.delay(1, None).as_secs_f64();
            let d2 = policy.delay(2, None).as_secs_f64();
            assert!((0.8..=1.2).contains(&d1), "d1 = {d1}");
            assert!((1.6..=2.4).contains(&d2), "d2 = {d2}");
        }
    }

    #[test]
    fn rate_limit_floor_overrides_small_backoff() {
        let policy = RetryPolicy::default();
        let d = policy.delay(1, Some(Duration::from_secs(2)));
        assert!(d >= Duration::from_secs(2));
    }

    #[test]
    fn user_agent_pool_is_nonempty_and_browserlike() {
        let ua = pick_user_agent();
        assert!(ua.starts_with("Mozilla/5.0"));
    }

    mod retry_loop {
        use super::*;
        use std::collections::VecDeque;
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Mutex;

        /// Renderer that replays a fixed sequence of outcomes and counts
        /// how often it was called.
        struct ScriptedRenderer {
            calls: AtomicU32,
            script: Mutex<VecDeque<Result<String, FetchError>>>,
        }

        impl ScriptedRenderer {
            fn new(script: Vec<Result<String, FetchError>>) -> Arc<Self> {
                Arc::new(Self {
                    calls: AtomicU32::new(0),
                    script: Mutex::new(script.into()),
                })
            }

            fn calls(&self) -> u32 {
                self.calls.load(Ordering::SeqCst)
            }
        }

        #[async_trait]
        impl Renderer for ScriptedRenderer {
            async fn render(
                &self,
                _url: &str,
                _user_agent: &str,
                _timeout: Duration,
            ) -> Result<String, FetchError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.script
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or(Err(FetchError::Timeout))
            }
        }

        fn dynamic_source() -> Source {
            Source {
                id: "dyn".into(),
                url: "https://dyn.example".into(),
                category: "World".into(),
                credibility: 0.5,
                region: None,
                render_mode: RenderMode::Dynamic,
            }
        }

        #[tokio::test(start_paused = true)]
        async fn transient_failures_retry_until_exhausted() {
            let renderer = ScriptedRenderer::new(vec![
                Err(FetchError::Timeout),
                Err(FetchError::Transport("connection reset".into())),
                Err(FetchError::Status(503)),
            ]);
            let fetcher = HttpFetcher::with_renderer(renderer.clone());

            let err = fetcher
                .fetch(&dynamic_source(), "https://dyn.example/a")
                .await
                .unwrap_err();
            assert!(matches!(err, FetchError::RetriesExhausted { attempts: 3, .. }));
            assert_eq!(renderer.calls(), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn recovery_within_the_attempt_budget_succeeds() {
            let renderer = ScriptedRenderer::new(vec![
                Err(FetchError::Timeout),
                Ok("<html><body>ok</body></html>".into()),
            ]);
            let fetcher = HttpFetcher::with_renderer(renderer.clone());

            let page = fetcher
                .fetch(&dynamic_source(), "https://dyn.example/a")
                .await
                .unwrap();
            assert_eq!(page.status, FetchStatus::Ok);
            assert_eq!(renderer.calls(), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn permanent_errors_abort_without_retry() {
            let renderer = ScriptedRenderer::new(vec![Err(FetchError::Status(404))]);
            let fetcher = HttpFetcher::with_renderer(renderer.clone());

            let err = fetcher
                .fetch(&dynamic_source(), "https://dyn.example/gone")
                .await
                .unwrap_err();
            assert!(matches!(err, FetchError::Status(404)));
            assert_eq!(renderer.calls(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn rate_limit_floor_is_honored_between_attempts() {
            let renderer = ScriptedRenderer::new(vec![
                Err(FetchError::Blocked { status: 429 }),
                Ok("<html><body>ok</body></html>".into()),
            ]);
            let fetcher = HttpFetcher::with_renderer(renderer.clone());

            let t0 = tokio::time::Instant::now();
            fetcher
                .fetch(&dynamic_source(), "https://dyn.example/a")
                .await
                .unwrap();
            // First backoff is at most 1.2 s; only the 429 floor gets us
            // to 2 s before the second attempt.
            assert!(t0.elapsed() >= Duration::from_secs(2));
            assert_eq!(renderer.calls(), 2);
        }
    }
}
