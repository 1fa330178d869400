//! Diagram activation: detection, placeholder substitution and render passes.
//!
//! Activation runs in two phases. [`detect`] and [`transform`] are
//! synchronous and turn every diagram code block into a placeholder that shows
//! the raw source. [`orchestrate`] then hands the placeholders to a loaded
//! renderer, restoring each from its stored source first so repeated passes
//! never stack output.

pub mod detect;
pub mod orchestrate;
pub mod placeholder;
pub mod theme;
pub mod transform;

pub use detect::{DetectionMethod, SourceBlock, detect, looks_like_diagram};
pub use orchestrate::{RenderOutcome, Tally, render_all, tally};
pub use placeholder::RenderedState;
pub use theme::Theme;
pub use transform::{TransformError, replace_all};
