use std::borrow::Cow;

use crate::diagram::RenderOutcome;
use crate::dom::{Document, NodeId};

/// Loading progress of a page, as reported by its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Still being parsed; activation waits for `ContentLoaded`.
    Loading,
    Interactive,
    Complete,
}

/// A document plus the controller state attached to it.
#[derive(Debug, Clone)]
pub struct Page {
    pub document: Document,
    pub ready_state: ReadyState,
    pub(super) activated: bool,
    pub(super) toggle: Option<NodeId>,
}

impl Page {
    /// A page that is still loading.
    pub fn loading(document: Document) -> Self {
        Self::with_state(document, ReadyState::Loading)
    }

    /// A page that has finished loading.
    pub fn loaded(document: Document) -> Self {
        Self::with_state(document, ReadyState::Complete)
    }

    pub fn with_state(document: Document, ready_state: ReadyState) -> Self {
        Self {
            document,
            ready_state,
            activated: false,
            toggle: None,
        }
    }

    pub const fn is_activated(&self) -> bool {
        self.activated
    }

    /// The theme-toggle element whose clicks trigger a re-render, once armed.
    pub const fn armed_toggle(&self) -> Option<NodeId> {
        self.toggle
    }

    /// True when `target` is the armed toggle or lies inside it.
    pub fn hits_toggle(&self, target: NodeId) -> bool {
        let Some(toggle) = self.toggle else {
            return false;
        };
        std::iter::successors(Some(target), |&node| self.document.parent(node))
            .any(|node| node == toggle)
    }
}

/// What activating a page did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Diagram source blocks found.
    pub blocks: usize,
    /// Placeholders that replaced them.
    pub placeholders: usize,
    /// Name of the renderer used, when one loaded.
    pub renderer: Option<String>,
    /// Why the renderer could not be loaded.
    pub load_error: Option<String>,
    /// Result of the initial render pass.
    pub outcome: Option<RenderOutcome>,
}

impl ActivationReport {
    /// True when the page had nothing to activate.
    pub const fn is_idle(&self) -> bool {
        self.blocks == 0
    }

    /// The page text to publish. An idle page is returned as `source`
    /// byte for byte; otherwise `document` is serialized.
    pub fn output<'a>(&self, source: &'a str, document: &Document) -> Cow<'a, str> {
        if self.is_idle() {
            Cow::Borrowed(source)
        } else {
            Cow::Owned(document.to_html())
        }
    }
}

/// What an event loop did before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub activation: Option<ActivationReport>,
    /// Render passes triggered by the theme toggle.
    pub rerenders: usize,
    /// Toggle clicks folded into an earlier pass.
    pub coalesced: usize,
}
