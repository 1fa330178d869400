//! Render passes over the current placeholder set.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::FutureExt;

use super::placeholder::{self, RenderedState};
use super::theme::Theme;
use crate::dom::Document;
use crate::renderer::{
    DiagramRenderer, EntryPoint, RenderBatch, RenderCall, RenderConfig, RenderError,
};

/// What a render pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// No renderer has been loaded; nothing was touched.
    RendererUnavailable,
    /// The document holds no placeholders; nothing was touched.
    NoPlaceholders,
    /// The renderer finished without reporting an error.
    Rendered { placeholders: usize, theme: Theme },
    /// The renderer reported an error; it was logged and swallowed.
    Failed {
        placeholders: usize,
        theme: Theme,
        error: String,
    },
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Restore every placeholder and hand them all to `renderer`.
///
/// Errors and panics from the renderer are logged and reported in the
/// outcome; they never propagate.
pub async fn render_all(
    doc: &mut Document,
    renderer: Option<&dyn DiagramRenderer>,
) -> RenderOutcome {
    let Some(renderer) = renderer else {
        return RenderOutcome::RendererUnavailable;
    };
    let nodes = placeholder::find_all(doc);
    if nodes.is_empty() {
        return RenderOutcome::NoPlaceholders;
    }
    let _scope = crate::perf::scope("diagram.render_all");

    for &node in &nodes {
        placeholder::restore(doc, node);
    }

    let theme = Theme::from_document(doc);
    let config = RenderConfig::for_theme(theme);
    match catch_unwind(AssertUnwindSafe(|| renderer.initialize(&config))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(
            renderer = renderer.name(),
            error = %err,
            "renderer initialize failed"
        ),
        Err(payload) => tracing::warn!(
            renderer = renderer.name(),
            panic = %panic_message(payload.as_ref()),
            "renderer initialize panicked"
        ),
    }

    let result = {
        let mut slot = Some(RenderBatch {
            document: &mut *doc,
            nodes: &nodes,
        });
        let started = catch_unwind(AssertUnwindSafe(move || {
            slot.take().map(|batch| match renderer.entry_point() {
                EntryPoint::Batch => renderer.run(batch),
                EntryPoint::Legacy => renderer.init(batch),
            })
        }));
        match started {
            Ok(Some(RenderCall::Ready(result))) => result,
            Ok(Some(RenderCall::Pending(future))) => {
                AssertUnwindSafe(future).catch_unwind().await.unwrap_or_else(|payload| {
                    Err(RenderError::Panicked(panic_message(payload.as_ref())))
                })
            }
            Ok(None) => Ok(()),
            Err(payload) => Err(RenderError::Panicked(panic_message(payload.as_ref()))),
        }
    };

    let placeholders = placeholder::find_all(doc).len();
    crate::perf::log_event(
        "diagram.render_all",
        format!(
            "renderer={} placeholders={placeholders} theme={}",
            renderer.name(),
            theme.as_str()
        ),
    );
    match result {
        Ok(()) => RenderOutcome::Rendered {
            placeholders,
            theme,
        },
        Err(err) => {
            tracing::warn!(renderer = renderer.name(), error = %err, "diagram render failed");
            RenderOutcome::Failed {
                placeholders,
                theme,
                error: err.to_string(),
            }
        }
    }
}

/// Placeholder counts by render state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub unrendered: usize,
    pub rendered: usize,
    pub failed: usize,
}

/// Count the document's placeholders by render state.
pub fn tally(doc: &Document) -> Tally {
    let mut tally = Tally::default();
    for node in placeholder::find_all(doc) {
        match placeholder::state(doc, node) {
            RenderedState::Unrendered => tally.unrendered += 1,
            RenderedState::Rendered => tally.rendered += 1,
            RenderedState::Failed => tally.failed += 1,
        }
    }
    tally
}
