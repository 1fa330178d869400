//! External diagram renderers.
//!
//! Diagram layout is never done in this crate. A renderer is acquired at
//! runtime from one of several endpoints (a Kroki-compatible HTTP service or
//! the Mermaid CLI) and driven through the [`DiagramRenderer`] contract:
//! configure once with [`DiagramRenderer::initialize`], then render a batch of
//! placeholders in place.

pub mod command;
pub mod kroki;
mod loader;

use std::sync::{Mutex, PoisonError};

use futures::future::BoxFuture;
use serde::Serialize;

use crate::diagram::placeholder;
use crate::diagram::theme::Theme;
use crate::dom::{Document, NodeId};

pub use loader::{
    EndpointSpec, LoadError, MERMAID_CLI_VERSION, RendererEndpoint, RendererLoader,
    default_endpoint_specs,
};

/// How strictly the renderer treats markup inside diagram labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    #[default]
    Strict,
    Loose,
    Antiscript,
    Sandbox,
}

/// Flowchart-specific layout options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowchartConfig {
    /// Scale diagrams down to fit the containing element.
    pub use_max_width: bool,
}

/// Renderer configuration, serialized with Mermaid's own key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    /// Never scan the whole document on its own; only render what it is given.
    pub start_on_load: bool,
    pub security_level: SecurityLevel,
    pub theme: Theme,
    pub flowchart: FlowchartConfig,
}

impl RenderConfig {
    /// The fixed configuration used for every render pass.
    pub const fn for_theme(theme: Theme) -> Self {
        Self {
            start_on_load: false,
            security_level: SecurityLevel::Strict,
            theme,
            flowchart: FlowchartConfig {
                use_max_width: true,
            },
        }
    }

    /// Mermaid `%%{init: ...}%%` directive carrying the per-diagram options.
    ///
    /// `securityLevel` and `startOnLoad` are site-level settings that Mermaid
    /// refuses to take from a directive, so only theme and layout go here.
    pub fn init_directive(&self) -> String {
        #[derive(Serialize)]
        struct Directive<'a> {
            theme: Theme,
            flowchart: &'a FlowchartConfig,
        }
        let json = serde_json::to_string(&Directive {
            theme: self.theme,
            flowchart: &self.flowchart,
        })
        .unwrap_or_else(|_| "{}".to_string());
        format!("%%{{init: {json}}}%%")
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::for_theme(Theme::Default)
    }
}

/// Errors raised by a renderer. Callers log these; they never abort a page.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer initialization failed: {0}")]
    Initialize(String),

    /// One or more diagrams could not be rendered.
    #[error("{failed} of {total} diagrams failed to render: {first}")]
    Diagram {
        failed: usize,
        total: usize,
        first: String,
    },

    #[error("renderer transport failed: {0}")]
    Transport(String),

    #[error("renderer panicked: {0}")]
    Panicked(String),
}

/// Which render entry point a renderer exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// `run` over an explicit node list.
    Batch,
    /// Older `init` call taking the same node list.
    Legacy,
}

/// The placeholders a render call may mutate.
#[derive(Debug)]
pub struct RenderBatch<'a> {
    pub document: &'a mut Document,
    pub nodes: &'a [NodeId],
}

/// Result of starting a render: finished already, or still in flight.
pub enum RenderCall<'a> {
    Ready(Result<(), RenderError>),
    Pending(BoxFuture<'a, Result<(), RenderError>>),
}

impl std::fmt::Debug for RenderCall<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// A loaded diagram-rendering capability.
pub trait DiagramRenderer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Apply configuration for subsequent render calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is rejected.
    fn initialize(&self, config: &RenderConfig) -> Result<(), RenderError>;

    fn entry_point(&self) -> EntryPoint {
        EntryPoint::Batch
    }

    /// Render every node of `batch` in place.
    fn run<'a>(&'a self, batch: RenderBatch<'a>) -> RenderCall<'a>;

    /// Legacy entry point; same contract as [`DiagramRenderer::run`].
    fn init<'a>(&'a self, batch: RenderBatch<'a>) -> RenderCall<'a> {
        self.run(batch)
    }
}

/// Configuration slot shared by the concrete renderers.
#[derive(Debug, Default)]
pub(crate) struct ConfigSlot(Mutex<RenderConfig>);

impl ConfigSlot {
    pub(crate) fn set(&self, config: RenderConfig) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub(crate) fn get(&self) -> RenderConfig {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Render each unprocessed placeholder with `render_one`, one at a time.
///
/// The init directive is prefixed to every source. Successes replace the
/// placeholder content with the returned SVG; failures mark the placeholder
/// as failed and leave its source text visible. Every node is attempted even
/// after a failure.
pub(crate) async fn render_each<F, Fut>(
    batch: RenderBatch<'_>,
    config: RenderConfig,
    render_one: F,
) -> Result<(), RenderError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<String, RenderError>>,
{
    let directive = config.init_directive();
    let mut failed = 0;
    let mut first = None;
    for &node in batch.nodes {
        if placeholder::state(batch.document, node) == placeholder::RenderedState::Rendered {
            continue;
        }
        let source = batch.document.text_content(node);
        match render_one(format!("{directive}\n{source}")).await {
            Ok(svg) => placeholder::mark_rendered(batch.document, node, svg),
            Err(err) => {
                tracing::debug!(%node, error = %err, "diagram render failed");
                placeholder::mark_failed(batch.document, node, &err.to_string());
                failed += 1;
                first.get_or_insert_with(|| err.to_string());
            }
        }
    }
    match first {
        None => Ok(()),
        Some(first) => Err(RenderError::Diagram {
            failed,
            total: batch.nodes.len(),
            first,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_config_serializes_with_mermaid_keys() {
        let config = RenderConfig::for_theme(Theme::Dark);
        let json = serde_json::to_value(config).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "startOnLoad": false,
                "securityLevel": "strict",
                "theme": "dark",
                "flowchart": { "useMaxWidth": true }
            })
        );
    }

    #[test]
    fn test_init_directive_carries_theme_and_layout() {
        let directive = RenderConfig::for_theme(Theme::Default).init_directive();
        assert_eq!(
            directive,
            r#"%%{init: {"theme":"default","flowchart":{"useMaxWidth":true}}}%%"#
        );
    }

    #[test]
    fn test_config_slot_round_trips() {
        let slot = ConfigSlot::default();
        assert_eq!(slot.get().theme, Theme::Default);
        slot.set(RenderConfig::for_theme(Theme::Dark));
        assert_eq!(slot.get().theme, Theme::Dark);
    }

    #[tokio::test]
    async fn test_render_each_marks_successes_and_failures() {
        let mut doc = Document::new();
        let root = doc.root();
        let good = placeholder::create(&mut doc, "graph TD\nA-->B");
        let bad = placeholder::create(&mut doc, "not a diagram");
        doc.append_child(root, good);
        doc.append_child(root, bad);
        let nodes = [good, bad];

        let result = render_each(
            RenderBatch {
                document: &mut doc,
                nodes: &nodes,
            },
            RenderConfig::default(),
            |source| async move {
                assert!(source.starts_with("%%{init:"));
                if source.contains("graph") {
                    Ok("<svg>ok</svg>".to_string())
                } else {
                    Err(RenderError::Transport("bad syntax".to_string()))
                }
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(RenderError::Diagram {
                failed: 1,
                total: 2,
                ..
            })
        ));
        assert_eq!(placeholder::state(&doc, good), placeholder::RenderedState::Rendered);
        assert_eq!(placeholder::state(&doc, bad), placeholder::RenderedState::Failed);
        assert_eq!(doc.text_content(bad), "not a diagram");
    }
}
