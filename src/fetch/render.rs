//! Rendering seam for dynamic sources.
//!
//! Script-heavy sources are routed through a `Renderer` so an embedder
//! can plug in a headless browser. The built-in renderer is plain HTTP
//! with the longer dynamic timeout, which is also the fallback behavior
//! when no browser is available.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::fetch::classify_status;

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Return the settled page markup for `url`.
    async fn render(
        &self,
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<String, FetchError>;
}

/// Plain-HTTP renderer: no script execution, just a GET with the
/// dynamic timeout budget.
#[derive(Default)]
pub struct HttpRenderer {
    client: reqwest::Client,
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(
        &self,
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .timeout(timeout)
            .send()
            .await?;
        classify_status(resp.status().as_u16())?;
        Ok(resp.text().await?)
    }
}
