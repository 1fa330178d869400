//! Replacing source blocks with placeholders.

use super::detect::{HIGHLIGHTER_WRAPPER_CLASS, SourceBlock};
use super::placeholder::{self, WRAPPER_CLASS};
use crate::dom::{Document, NodeId};

/// Inner highlighter wrapper (`<div class="highlight">`, often the `pre` itself).
const HIGHLIGHT_CLASS: &str = "highlight";

/// Why a single block could not be replaced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("block {0} is not inside a <pre>")]
    MissingContainer(NodeId),
    #[error("container {0} was already replaced")]
    Detached(NodeId),
}

/// The outermost wrapper of a code block: the closest `.highlighter-rouge`
/// around its `pre`, else the closest `.highlight`, else the `pre` itself.
pub fn resolve_container(doc: &Document, code: NodeId) -> Option<NodeId> {
    let pre = doc.closest(code, |e| e.name() == "pre")?;
    doc.closest(pre, |e| e.has_class(HIGHLIGHTER_WRAPPER_CLASS))
        .or_else(|| doc.closest(pre, |e| e.has_class(HIGHLIGHT_CLASS)))
        .or(Some(pre))
}

/// Swap `block`'s container for a wrapper holding one new placeholder.
///
/// # Errors
///
/// Returns an error, leaving the document untouched, when the container is no
/// longer attached (an earlier block shared it).
pub fn replace_block(doc: &mut Document, block: &SourceBlock) -> Result<NodeId, TransformError> {
    if !doc.is_attached(block.container) {
        return Err(TransformError::Detached(block.container));
    }
    let wrapper = doc.create_element("div");
    doc.set_attr(wrapper, "class", WRAPPER_CLASS);
    let node = placeholder::create(doc, &block.raw_text);
    doc.append_child(wrapper, node);
    if !doc.replace_with(block.container, wrapper) {
        return Err(TransformError::MissingContainer(block.code));
    }
    Ok(node)
}

/// Replace every block, skipping (and logging) the ones that fail.
pub fn replace_all(doc: &mut Document, blocks: &[SourceBlock]) -> Vec<NodeId> {
    blocks
        .iter()
        .filter_map(|block| match replace_block(doc, block) {
            Ok(node) => {
                tracing::debug!(
                    code = %block.code,
                    placeholder = %node,
                    method = ?block.detection_method,
                    "diagram block replaced"
                );
                Some(node)
            }
            Err(err) => {
                tracing::debug!(error = %err, "diagram block skipped");
                None
            }
        })
        .collect()
}
