//! Lazy, single-flight acquisition of a renderer from a fallback chain.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::OnceCell;

use super::DiagramRenderer;
use super::command::CommandEndpoint;
use super::kroki::KrokiEndpoint;

/// Mermaid CLI release used by the pinned `npx` fallback.
pub const MERMAID_CLI_VERSION: &str = "10.9.1";

/// Errors raised while acquiring a renderer.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("invalid renderer endpoint {spec:?}: {reason}")]
    InvalidEndpoint { spec: String, reason: String },

    #[error("renderer endpoint {location} unavailable: {reason}")]
    Unavailable { location: String, reason: String },

    #[error("no renderer endpoints configured")]
    NoEndpoints,

    #[error("all {} renderer endpoints failed: {}", .0.len(), join_errors(.0))]
    AllFailed(Vec<LoadError>),
}

fn join_errors(errors: &[LoadError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One place a renderer can be loaded from.
#[async_trait::async_trait]
pub trait RendererEndpoint: Send + Sync {
    /// Human-readable location (URL or command line).
    fn location(&self) -> &str;

    /// Attempt to acquire a renderer from this endpoint.
    async fn load(&self) -> Result<Arc<dyn DiagramRenderer>, LoadError>;
}

/// Parsed endpoint setting.
///
/// `http://` and `https://` URLs name a Kroki-compatible service;
/// `cmd:<command line>` names a Mermaid CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointSpec {
    Http(String),
    Command(String),
}

impl EndpointSpec {
    /// Build the endpoint this spec describes.
    ///
    /// # Errors
    ///
    /// Returns an error if a command line cannot be split into words.
    pub fn build(&self) -> Result<Arc<dyn RendererEndpoint>, LoadError> {
        match self {
            Self::Http(url) => Ok(Arc::new(KrokiEndpoint::new(url))),
            Self::Command(line) => Ok(Arc::new(CommandEndpoint::from_command_line(line)?)),
        }
    }
}

impl FromStr for EndpointSpec {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(line) = s.strip_prefix("cmd:") {
            let line = line.trim();
            if line.is_empty() {
                return Err(LoadError::InvalidEndpoint {
                    spec: s.to_string(),
                    reason: "empty command".to_string(),
                });
            }
            return Ok(Self::Command(line.to_string()));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(Self::Http(s.trim_end_matches('/').to_string()));
        }
        Err(LoadError::InvalidEndpoint {
            spec: s.to_string(),
            reason: "expected an http(s) URL or cmd:<command>".to_string(),
        })
    }
}

impl fmt::Display for EndpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => f.write_str(url),
            Self::Command(line) => write!(f, "cmd:{line}"),
        }
    }
}

/// Endpoints tried when none are configured, in order.
pub fn default_endpoint_specs() -> Vec<EndpointSpec> {
    vec![
        EndpointSpec::Http("https://kroki.io".to_string()),
        EndpointSpec::Command("mmdc".to_string()),
        EndpointSpec::Command(format!(
            "npx --yes @mermaid-js/mermaid-cli@{MERMAID_CLI_VERSION}"
        )),
    ]
}

/// Memoized async accessor for the page's renderer.
///
/// At most one load runs at a time; callers arriving while it is in flight
/// wait for it and share its result. A successful load is cached for the
/// loader's lifetime. A failed load is not cached.
pub struct RendererLoader {
    endpoints: Vec<Arc<dyn RendererEndpoint>>,
    handle: OnceCell<Arc<dyn DiagramRenderer>>,
}

impl fmt::Debug for RendererLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererLoader")
            .field(
                "endpoints",
                &self.endpoints.iter().map(|e| e.location()).collect::<Vec<_>>(),
            )
            .field("loaded", &self.handle.get().map(|r| r.name().to_string()))
            .finish()
    }
}

impl RendererLoader {
    /// Loader that tries `endpoints` in order.
    pub fn new(endpoints: Vec<Arc<dyn RendererEndpoint>>) -> Self {
        Self {
            endpoints,
            handle: OnceCell::new(),
        }
    }

    /// Loader whose renderer is already present; no endpoint is ever used.
    pub fn with_preloaded(renderer: Arc<dyn DiagramRenderer>) -> Self {
        Self {
            endpoints: Vec::new(),
            handle: OnceCell::new_with(Some(renderer)),
        }
    }

    /// Build a loader from endpoint settings.
    ///
    /// # Errors
    ///
    /// Returns an error if any spec cannot be turned into an endpoint.
    pub fn from_specs(specs: &[EndpointSpec]) -> Result<Self, LoadError> {
        let endpoints = specs
            .iter()
            .map(EndpointSpec::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(endpoints))
    }

    /// The renderer, if one has been loaded. Never starts a load.
    pub fn current(&self) -> Option<Arc<dyn DiagramRenderer>> {
        self.handle.get().cloned()
    }

    /// Return the renderer, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NoEndpoints`] when nothing is configured, or
    /// [`LoadError::AllFailed`] with every endpoint's error.
    pub async fn load(&self) -> Result<Arc<dyn DiagramRenderer>, LoadError> {
        self.handle
            .get_or_try_init(|| self.load_chain())
            .await
            .cloned()
    }

    async fn load_chain(&self) -> Result<Arc<dyn DiagramRenderer>, LoadError> {
        let _scope = crate::perf::scope("renderer.load");
        if self.endpoints.is_empty() {
            return Err(LoadError::NoEndpoints);
        }
        let mut failures = Vec::new();
        for endpoint in &self.endpoints {
            let location = endpoint.location();
            tracing::debug!(location, "loading diagram renderer");
            match endpoint.load().await {
                Ok(renderer) => {
                    tracing::info!(location, renderer = renderer.name(), "diagram renderer loaded");
                    crate::perf::log_event("renderer.loaded", location);
                    return Ok(renderer);
                }
                Err(err) => {
                    tracing::debug!(location, error = %err, "renderer endpoint failed");
                    crate::perf::log_event(
                        "renderer.endpoint_failed",
                        format!("{location}: {err}"),
                    );
                    failures.push(err);
                }
            }
        }
        Err(LoadError::AllFailed(failures))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::renderer::{RenderBatch, RenderCall, RenderConfig, RenderError};

    struct NullRenderer;

    impl DiagramRenderer for NullRenderer {
        fn name(&self) -> &str {
            "null"
        }

        fn initialize(&self, _config: &RenderConfig) -> Result<(), RenderError> {
            Ok(())
        }

        fn run<'a>(&'a self, _batch: RenderBatch<'a>) -> RenderCall<'a> {
            RenderCall::Ready(Ok(()))
        }
    }

    struct CountingEndpoint {
        location: String,
        succeed: bool,
        attempts: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl CountingEndpoint {
        fn new(location: &str, succeed: bool) -> (Arc<Self>, Arc<AtomicUsize>) {
            let attempts = Arc::new(AtomicUsize::new(0));
            let endpoint = Arc::new(Self {
                location: location.to_string(),
                succeed,
                attempts: Arc::clone(&attempts),
                delay: Duration::from_millis(0),
            });
            (endpoint, attempts)
        }
    }

    #[async_trait::async_trait]
    impl RendererEndpoint for CountingEndpoint {
        fn location(&self) -> &str {
            &self.location
        }

        async fn load(&self) -> Result<Arc<dyn DiagramRenderer>, LoadError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.succeed {
                Ok(Arc::new(NullRenderer))
            } else {
                Err(LoadError::Unavailable {
                    location: self.location.clone(),
                    reason: "offline".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_preloaded_renderer_resolves_without_endpoints() {
        let loader = RendererLoader::with_preloaded(Arc::new(NullRenderer));
        assert!(loader.current().is_some());
        let renderer = loader.load().await.unwrap();
        assert_eq!(renderer.name(), "null");
    }

    #[tokio::test]
    async fn test_falls_back_to_second_endpoint() {
        let (first, first_attempts) = CountingEndpoint::new("https://a.invalid", false);
        let (second, second_attempts) = CountingEndpoint::new("https://b.invalid", true);
        let (third, third_attempts) = CountingEndpoint::new("https://c.invalid", true);
        let loader = RendererLoader::new(vec![first, second, third]);

        assert!(loader.current().is_none());
        loader.load().await.unwrap();

        assert_eq!(first_attempts.load(Ordering::SeqCst), 1);
        assert_eq!(second_attempts.load(Ordering::SeqCst), 1);
        assert_eq!(third_attempts.load(Ordering::SeqCst), 0);
        assert!(loader.current().is_some());
    }

    #[tokio::test]
    async fn test_all_endpoints_failing_reports_each() {
        let (first, _) = CountingEndpoint::new("https://a.invalid", false);
        let (second, _) = CountingEndpoint::new("https://b.invalid", false);
        let loader = RendererLoader::new(vec![first, second]);

        let err = loader.load().await.err().unwrap();
        match &err {
            LoadError::AllFailed(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("https://b.invalid"));
        assert!(loader.current().is_none());
    }

    #[tokio::test]
    async fn test_no_endpoints_is_an_error() {
        let loader = RendererLoader::new(Vec::new());
        assert!(matches!(loader.load().await, Err(LoadError::NoEndpoints)));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let endpoint = Arc::new(CountingEndpoint {
            location: "https://slow.invalid".to_string(),
            succeed: true,
            attempts: Arc::clone(&attempts),
            delay: Duration::from_millis(20),
        });
        let loader = RendererLoader::new(vec![endpoint]);

        let (a, b, c) = tokio::join!(loader.load(), loader.load(), loader.load());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        loader.load().await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_endpoint_spec_parsing() {
        assert_eq!(
            "https://kroki.io/".parse::<EndpointSpec>().unwrap(),
            EndpointSpec::Http("https://kroki.io".to_string())
        );
        assert_eq!(
            "cmd: mmdc -p puppeteer.json".parse::<EndpointSpec>().unwrap(),
            EndpointSpec::Command("mmdc -p puppeteer.json".to_string())
        );
        assert!("ftp://example.com".parse::<EndpointSpec>().is_err());
        assert!("cmd:".parse::<EndpointSpec>().is_err());
    }

    #[test]
    fn test_default_endpoints_pin_cli_version() {
        let specs = default_endpoint_specs();
        assert_eq!(specs.len(), 3);
        assert!(matches!(specs[0], EndpointSpec::Http(_)));
        assert!(specs[2].to_string().contains(MERMAID_CLI_VERSION));
    }
}
