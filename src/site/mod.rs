//! Helpers for the book site that hosts the diagrams.
//!
//! - [`navigation`]: generate `_data/navigation.yml` from `book-config.json`
//! - [`pages`]: check the GitHub Pages settings in `_config.yml`

pub mod navigation;
pub mod pages;

pub use navigation::{NavEntry, Navigation, NavigationError};
pub use pages::{PagesConfig, PagesError, PagesIssue};
