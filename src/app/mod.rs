//! Page lifecycle controller.
//!
//! This module follows The Elm Architecture (TEA):
//! - [`Page`]: the document and its controller state
//! - [`PageEvent`]: everything the host can tell a page
//! - [`update`]: state transitions, deciding the [`Effect`] to perform
//! - [`Activator::run`]: event loop performing those effects

mod effects;
mod event_loop;
mod model;
mod update;

pub use model::{ActivationReport, Page, ReadyState, SessionReport};
pub use update::{Effect, PageEvent, update};

use std::sync::Arc;

use crate::renderer::RendererLoader;

/// Class of the page's theme-toggle control.
pub const THEME_TOGGLE_CLASS: &str = "theme-toggle";

/// Activates diagrams on pages, sharing one renderer loader between them.
#[derive(Debug, Clone)]
pub struct Activator {
    loader: Arc<RendererLoader>,
    toggle_class: String,
}

impl Activator {
    pub fn new(loader: Arc<RendererLoader>) -> Self {
        Self {
            loader,
            toggle_class: THEME_TOGGLE_CLASS.to_string(),
        }
    }

    /// Use a different class to find the theme toggle.
    pub fn with_toggle_class(mut self, class: impl Into<String>) -> Self {
        self.toggle_class = class.into();
        self
    }

    pub fn loader(&self) -> &RendererLoader {
        &self.loader
    }
}
