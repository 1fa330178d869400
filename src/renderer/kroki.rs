//! Kroki-compatible HTTP rendering service.
//!
//! Diagram source is POSTed as plain text to `{base}/mermaid/svg` and the
//! response body is the SVG. Availability is probed with `GET {base}/health`.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;

use super::loader::{LoadError, RendererEndpoint};
use super::{ConfigSlot, DiagramRenderer, RenderBatch, RenderCall, RenderConfig, RenderError};

/// An HTTP endpoint serving the Kroki API.
#[derive(Debug, Clone)]
pub struct KrokiEndpoint {
    base_url: String,
    client: reqwest::Client,
}

impl KrokiEndpoint {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

#[async_trait::async_trait]
impl RendererEndpoint for KrokiEndpoint {
    fn location(&self) -> &str {
        &self.base_url
    }

    async fn load(&self) -> Result<Arc<dyn DiagramRenderer>, LoadError> {
        let unavailable = |reason: String| LoadError::Unavailable {
            location: self.base_url.clone(),
            reason,
        };
        let response = self
            .client
            .get(self.health_url())
            .send()
            .await
            .map_err(|err| unavailable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(unavailable(format!("health check returned {}", response.status())));
        }
        Ok(Arc::new(KrokiRenderer {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            config: ConfigSlot::default(),
        }))
    }
}

/// Renderer backed by a Kroki service.
#[derive(Debug)]
pub struct KrokiRenderer {
    base_url: String,
    client: reqwest::Client,
    config: ConfigSlot,
}

impl KrokiRenderer {
    fn render_url(&self) -> String {
        format!("{}/mermaid/svg", self.base_url)
    }

    async fn render_svg(&self, source: String) -> Result<String, RenderError> {
        let response = self
            .client
            .post(self.render_url())
            .header(CONTENT_TYPE, "text/plain")
            .body(source)
            .send()
            .await
            .map_err(|err| RenderError::Transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| RenderError::Transport(err.to_string()))?;
        if !status.is_success() {
            let detail = body.lines().next().unwrap_or_default().trim().to_string();
            return Err(RenderError::Transport(format!("{status}: {detail}")));
        }
        Ok(body)
    }
}

impl DiagramRenderer for KrokiRenderer {
    fn name(&self) -> &str {
        "kroki"
    }

    fn initialize(&self, config: &RenderConfig) -> Result<(), RenderError> {
        self.config.set(*config);
        Ok(())
    }

    fn run<'a>(&'a self, batch: RenderBatch<'a>) -> RenderCall<'a> {
        let config = self.config.get();
        RenderCall::Pending(Box::pin(super::render_each(batch, config, move |source| {
            self.render_svg(source)
        })))
    }
}
