//! Finding diagram source blocks in a document.
//!
//! Blocks are found two ways: by the language class the markdown renderer put
//! on them, and, for renderers that drop that class, by recognizing a diagram
//! keyword on the block's first non-empty line.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::transform::resolve_container;
use crate::dom::{Document, ElementData, NodeId};

/// Language class names that tag a block as a diagram.
const LANGUAGE_CLASSES: &[&str] = &["language-mermaid", "lang-mermaid"];

/// Wrapper class the static-site highlighter puts around code blocks.
pub(crate) const HIGHLIGHTER_WRAPPER_CLASS: &str = "highlighter-rouge";

static DIAGRAM_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^(?:
            (?:graph|flowchart)\s+(?:TB|TD|BT|RL|LR)\b
          | (?:sequenceDiagram|classDiagram-v2|classDiagram|stateDiagram-v2|stateDiagram
              |erDiagram|journey|gantt|pie|gitGraph|mindmap|timeline|quadrantChart
              |requirementDiagram|C4Context|C4Container|C4Component|C4Dynamic|C4Deployment
              |sankey-beta|xychart-beta|block-beta)(?:\s|$)
        )",
    )
    .expect("valid diagram keyword pattern")
});

/// How a source block was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    /// Carries a diagram language class.
    Explicit,
    /// First line starts with a diagram keyword.
    Heuristic,
}

/// A diagram code block found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBlock {
    /// The `code` element holding the source.
    pub code: NodeId,
    /// Trimmed text content of `code`.
    pub raw_text: String,
    pub detection_method: DetectionMethod,
    /// Outermost wrapper to replace with the placeholder.
    pub container: NodeId,
}

/// True when the first non-empty line of `text` starts a diagram.
///
/// `graph`/`flowchart` need a valid direction token; the other diagram types
/// only need their keyword.
pub fn looks_like_diagram(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .is_some_and(|line| DIAGRAM_START.is_match(line))
}

fn class_marks_diagram(element: &ElementData) -> bool {
    let class = element.attr("class").unwrap_or_default();
    element.classes().any(|c| LANGUAGE_CLASSES.contains(&c))
        || LANGUAGE_CLASSES.iter().any(|marker| class.contains(marker))
}

/// True when a `code` element, or the highlighter wrapper around it, carries
/// a diagram language class.
pub fn is_explicitly_tagged(doc: &Document, code: NodeId) -> bool {
    if doc.element(code).is_some_and(class_marks_diagram) {
        return true;
    }
    doc.closest(code, |e| e.has_class(HIGHLIGHTER_WRAPPER_CLASS))
        .and_then(|wrapper| doc.element(wrapper))
        .is_some_and(class_marks_diagram)
}

fn explicit_candidates(doc: &Document) -> Vec<NodeId> {
    doc.select(|e| e.name() == "code")
        .into_iter()
        .filter(|&code| is_explicitly_tagged(doc, code))
        .collect()
}

fn heuristic_candidates(doc: &Document) -> Vec<NodeId> {
    doc.select(|e| e.name() == "code")
        .into_iter()
        .filter(|&code| doc.closest(code, |e| e.name() == "pre").is_some())
        .filter(|&code| !is_explicitly_tagged(doc, code))
        .filter(|&code| looks_like_diagram(&doc.text_content(code)))
        .collect()
}

/// Find every diagram source block to activate.
///
/// Explicit matches come first, then heuristic ones, each in document order;
/// a node is never returned twice. Blocks whose trimmed text is empty, or
/// that have no `pre` to replace, are skipped.
pub fn detect(doc: &Document) -> Vec<SourceBlock> {
    let mut seen = HashSet::new();
    let tagged = explicit_candidates(doc)
        .into_iter()
        .map(|code| (code, DetectionMethod::Explicit));
    let shaped = heuristic_candidates(doc)
        .into_iter()
        .map(|code| (code, DetectionMethod::Heuristic));

    let mut blocks = Vec::new();
    for (code, detection_method) in tagged.chain(shaped) {
        if !seen.insert(code) {
            continue;
        }
        let raw_text = doc.text_content(code).trim().to_string();
        if raw_text.is_empty() {
            tracing::debug!(%code, "skipping empty diagram block");
            continue;
        }
        let Some(container) = resolve_container(doc, code) else {
            tracing::debug!(%code, "skipping diagram block outside <pre>");
            continue;
        };
        blocks.push(SourceBlock {
            code,
            raw_text,
            detection_method,
            container,
        });
    }
    blocks
}
