//! Render placeholders and their write-once source attribute.
//!
//! A placeholder is `<div class="mermaid" data-mermaid-source="...">`. The
//! source attribute is set once, when the placeholder is created, and every
//! later render pass restores the placeholder's content from it.

use crate::dom::{Document, NodeId};

/// Class carried by every placeholder.
pub const PLACEHOLDER_CLASS: &str = "mermaid";
/// Class of the element wrapping a placeholder.
pub const WRAPPER_CLASS: &str = "mermaid-wrapper";
/// Attribute holding the original diagram source.
pub const SOURCE_ATTRIBUTE: &str = "data-mermaid-source";
/// Set to `true` once a renderer has replaced the content.
pub const PROCESSED_ATTRIBUTE: &str = "data-processed";
/// Set to the failure message when a render failed.
pub const ERROR_ATTRIBUTE: &str = "data-render-error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderedState {
    Unrendered,
    Rendered,
    Failed,
}

/// Allocate a detached placeholder showing `source` as its fallback text.
pub fn create(doc: &mut Document, source: &str) -> NodeId {
    let node = doc.create_element("div");
    doc.set_attr(node, "class", PLACEHOLDER_CLASS);
    doc.set_attr(node, SOURCE_ATTRIBUTE, source);
    doc.set_text_content(node, source);
    node
}

/// All attached placeholders, in document order.
pub fn find_all(doc: &Document) -> Vec<NodeId> {
    doc.select(|e| e.has_class(PLACEHOLDER_CLASS) && e.attr(SOURCE_ATTRIBUTE).is_some())
}

pub fn original_source(doc: &Document, node: NodeId) -> Option<&str> {
    doc.attr(node, SOURCE_ATTRIBUTE)
}

pub fn state(doc: &Document, node: NodeId) -> RenderedState {
    if doc.attr(node, ERROR_ATTRIBUTE).is_some() {
        RenderedState::Failed
    } else if doc.attr(node, PROCESSED_ATTRIBUTE) == Some("true") {
        RenderedState::Rendered
    } else {
        RenderedState::Unrendered
    }
}

/// Reset a placeholder to its original source text, unrendered.
pub fn restore(doc: &mut Document, node: NodeId) {
    let source = original_source(doc, node).unwrap_or_default().to_string();
    doc.remove_attr(node, PROCESSED_ATTRIBUTE);
    doc.remove_attr(node, ERROR_ATTRIBUTE);
    doc.set_text_content(node, source);
}

/// Replace a placeholder's content with rendered markup.
pub fn mark_rendered(doc: &mut Document, node: NodeId, svg: impl Into<String>) {
    doc.remove_attr(node, ERROR_ATTRIBUTE);
    doc.set_inner_markup(node, svg);
    doc.set_attr(node, PROCESSED_ATTRIBUTE, "true");
}

/// Record a render failure; the source text stays visible.
pub fn mark_failed(doc: &mut Document, node: NodeId, reason: &str) {
    doc.remove_attr(node, PROCESSED_ATTRIBUTE);
    doc.set_attr(node, ERROR_ATTRIBUTE, reason);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached(doc: &mut Document, source: &str) -> NodeId {
        let node = create(doc, source);
        let root = doc.root();
        doc.append_child(root, node);
        node
    }

    #[test]
    fn test_create_stores_source_as_attribute_and_text() {
        let mut doc = Document::new();
        let node = attached(&mut doc, "flowchart LR\nA-->B");
        assert_eq!(original_source(&doc, node), Some("flowchart LR\nA-->B"));
        assert_eq!(doc.text_content(node), "flowchart LR\nA-->B");
        assert_eq!(state(&doc, node), RenderedState::Unrendered);
        assert_eq!(find_all(&doc), vec![node]);
    }

    #[test]
    fn test_restore_discards_rendered_output() {
        let mut doc = Document::new();
        let node = attached(&mut doc, "graph TD\nA-->B");
        mark_rendered(&mut doc, node, "<svg>drawn</svg>");
        assert_eq!(state(&doc, node), RenderedState::Rendered);
        assert_eq!(doc.text_content(node), "");

        restore(&mut doc, node);
        assert_eq!(state(&doc, node), RenderedState::Unrendered);
        assert_eq!(doc.text_content(node), "graph TD\nA-->B");
        assert!(!doc.to_html().contains("<svg>"));
    }

    #[test]
    fn test_failed_then_restored_is_unrendered() {
        let mut doc = Document::new();
        let node = attached(&mut doc, "pie\n\"a\": 1");
        mark_failed(&mut doc, node, "syntax error");
        assert_eq!(state(&doc, node), RenderedState::Failed);
        assert_eq!(doc.text_content(node), "pie\n\"a\": 1");

        restore(&mut doc, node);
        assert_eq!(state(&doc, node), RenderedState::Unrendered);
    }

    #[test]
    fn test_find_all_ignores_mermaid_class_without_source() {
        let doc = Document::parse("<div class=\"mermaid\">graph TD</div>").unwrap();
        assert!(find_all(&doc).is_empty());
    }
}
