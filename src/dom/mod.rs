//! In-memory HTML document tree.
//!
//! This module handles:
//! - Parsing HTML pages with `lol_html`
//! - Querying and mutating the tree (attributes, classes, text, replacement)
//! - Serializing the tree back to HTML

mod parser;
mod types;

pub use parser::{DomError, parse};
pub use types::{Document, ElementData, NodeData, NodeId};

impl Document {
    /// Parse an HTML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the tokenizer rejects the input.
    pub fn parse(html: &str) -> Result<Self, DomError> {
        parse(html)
    }
}
