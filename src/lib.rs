// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. renderer::RenderError)
    clippy::module_name_repetitions
)]

//! # pagemaid
//!
//! Progressive enhancement of diagram code blocks in static documentation
//! pages, plus the small helpers the book site is built with.
//!
//! pagemaid takes a page produced by a static-site generator and:
//! - Finds diagram source blocks, tagged by language class or recognized by
//!   their first line
//! - Replaces each with a placeholder that keeps the raw source visible
//! - Loads an external renderer lazily, only when the page has diagrams
//! - Renders every placeholder, and re-renders from the stored source when
//!   the page theme changes
//!
//! ## Architecture
//!
//! The page lifecycle uses The Elm Architecture (TEA) pattern:
//! - **Page**: document and controller state
//! - **PageEvent**: events from the page's host
//! - **Update**: state transitions deciding the effect to run
//! - **Effects**: detection, loading and render passes
//!
//! ## Modules
//!
//! - [`app`]: Page lifecycle controller and event loop
//! - [`diagram`]: Detection, placeholders and render passes
//! - [`dom`]: HTML document tree
//! - [`renderer`]: Renderer contract, loader and backends
//! - [`markdown`]: Markdown input
//! - [`site`]: Navigation generation and Pages checks
//! - [`config`]: Persistent default flags
//! - [`watcher`]: File watching
//! - [`perf`]: Timing and debug event log

pub mod app;
pub mod config;
pub mod diagram;
pub mod dom;
pub mod markdown;
pub mod perf;
pub mod renderer;
pub mod site;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{Activator, Page, PageEvent};
    pub use crate::diagram::{RenderOutcome, Theme};
    pub use crate::dom::Document;
    pub use crate::renderer::{DiagramRenderer, EndpointSpec, RendererLoader};
}
