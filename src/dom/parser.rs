//! HTML parsing into a [`Document`].
//!
//! `lol_html` is a streaming rewriter rather than a tree builder, so we listen
//! to its start tag, end tag, text, comment and doctype callbacks and assemble
//! the tree ourselves. Optional end tags are implied the way browsers imply
//! them for the common cases (`p`, `li`, `dt`/`dd`, table rows and cells,
//! `option`); anything else left open is closed when an enclosing element ends.

use std::cell::RefCell;
use std::rc::Rc;

use lol_html::html_content::EndTag;
use lol_html::{RewriteStrSettings, doc_comments, doc_text, doctype, element, rewrite_str};

use super::types::{Document, NodeId, is_raw_text_name};

/// Elements that stop the search for an open element to close implicitly.
const SCOPE_BOUNDARIES: &[&str] = &[
    "applet", "body", "button", "caption", "html", "marquee", "object", "table", "td", "template",
    "th",
];

/// Start tags that close an open `p`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "dd",
    "details",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "li",
    "main",
    "menu",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

/// Table structure that shields outer rows and cells from inner tags.
const TABLE_BOUNDARIES: &[&str] = &["html", "table", "template"];

/// Open elements implicitly closed by a start tag, and the elements that
/// shield them from it.
fn implied_closes(name: &str) -> Option<(&'static [&'static str], &'static [&'static str])> {
    match name {
        "li" => Some((&["li"], &["ol", "ul", "menu"])),
        "dt" | "dd" => Some((&["dt", "dd"], &["dl"])),
        "option" => Some((&["option"], &["select", "datalist", "optgroup"])),
        "optgroup" => Some((&["optgroup"], &["select"])),
        _ => None,
    }
}

/// Same as [`implied_closes`] for table parts, where cells are not boundaries.
fn implied_table_closes(name: &str) -> Option<(&'static [&'static str], &'static [&'static str])> {
    match name {
        "tr" => Some((&["tr"], &["thead", "tbody", "tfoot"])),
        "td" | "th" => Some((&["td", "th"], &["tr"])),
        "thead" | "tbody" | "tfoot" => Some((&["thead", "tbody", "tfoot"], &[])),
        _ => None,
    }
}

/// Errors produced while parsing HTML.
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    /// The tokenizer rejected the input.
    #[error("failed to parse HTML: {0}")]
    Parse(String),
}

#[derive(Debug)]
struct TreeBuilder {
    doc: Document,
    /// Open elements, innermost last. The root is never popped.
    open: Vec<NodeId>,
    pending_text: String,
}

impl TreeBuilder {
    fn new() -> Self {
        let doc = Document::new();
        let root = doc.root();
        Self {
            doc,
            open: vec![root],
            pending_text: String::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn in_raw_text(&self) -> bool {
        self.doc
            .element(self.current())
            .is_some_and(|element| is_raw_text_name(element.name()))
    }

    /// Pop back past the innermost open element named in `targets`, unless an
    /// element in `stops` or `boundaries` is open inside it.
    fn close_implied(&mut self, targets: &[&str], stops: &[&str], boundaries: &[&str]) {
        let mut depth = None;
        for (index, &id) in self.open.iter().enumerate().skip(1).rev() {
            let Some(element) = self.doc.element(id) else {
                continue;
            };
            let name = element.name();
            if targets.contains(&name) {
                depth = Some(index);
                break;
            }
            if stops.contains(&name) || boundaries.contains(&name) {
                break;
            }
        }
        if let Some(depth) = depth {
            self.open.truncate(depth);
        }
    }

    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let raw = std::mem::take(&mut self.pending_text);
        let text = if self.in_raw_text() {
            raw
        } else {
            htmlize::unescape(raw.as_str()).into_owned()
        };
        let parent = self.current();
        let node = self.doc.create_text(text);
        self.doc.append_child(parent, node);
    }

    fn open_element(
        &mut self,
        name: &str,
        attrs: Vec<(String, String)>,
        has_end_tag: bool,
    ) -> NodeId {
        self.flush_text();
        if CLOSES_PARAGRAPH.contains(&name) {
            self.close_implied(&["p"], &[], SCOPE_BOUNDARIES);
        }
        if let Some((targets, stops)) = implied_closes(name) {
            self.close_implied(targets, stops, SCOPE_BOUNDARIES);
        }
        if let Some((targets, stops)) = implied_table_closes(name) {
            self.close_implied(targets, stops, TABLE_BOUNDARIES);
        }
        let node = self.doc.create_element(name);
        for (key, value) in attrs {
            self.doc.set_attr(node, &key, value);
        }
        let parent = self.current();
        self.doc.append_child(parent, node);
        if has_end_tag {
            self.open.push(node);
        }
        node
    }

    fn close_element(&mut self, node: NodeId) {
        self.flush_text();
        if let Some(depth) = self.open.iter().rposition(|&open| open == node) {
            self.open.truncate(depth.max(1));
        }
    }

    fn comment(&mut self, text: &str) {
        self.flush_text();
        let parent = self.current();
        let node = self.doc.create_comment(text);
        self.doc.append_child(parent, node);
    }

    fn doctype(&mut self, name: &str) {
        self.flush_text();
        let root = self.doc.root();
        let node = self.doc.create_doctype(name);
        self.doc.append_child(root, node);
    }
}

/// Parse an HTML string into a [`Document`].
///
/// # Errors
///
/// Returns [`DomError::Parse`] if the tokenizer fails on the input.
pub fn parse(html: &str) -> Result<Document, DomError> {
    let builder = Rc::new(RefCell::new(TreeBuilder::new()));

    let on_element = Rc::clone(&builder);
    let on_text = Rc::clone(&builder);
    let on_comment = Rc::clone(&builder);
    let on_doctype = Rc::clone(&builder);

    let settings = RewriteStrSettings {
        element_content_handlers: vec![element!("*", move |el| {
            let name = el.tag_name().to_ascii_lowercase();
            let attrs = el
                .attributes()
                .iter()
                .map(|attr| {
                    (
                        attr.name().to_ascii_lowercase(),
                        htmlize::unescape_attribute(attr.value().as_str()).into_owned(),
                    )
                })
                .collect();
            let handlers = el.end_tag_handlers();
            let node = on_element
                .borrow_mut()
                .open_element(&name, attrs, handlers.is_some());
            if let Some(handlers) = handlers {
                let closer = Rc::clone(&on_element);
                let handler: lol_html::EndTagHandler<'static> =
                    Box::new(move |_end: &mut EndTag<'_>| {
                        closer.borrow_mut().close_element(node);
                        Ok(())
                    });
                handlers.push(handler);
            }
            Ok(())
        })],
        document_content_handlers: vec![
            doc_text!(move |chunk| {
                let mut builder = on_text.borrow_mut();
                builder.pending_text.push_str(chunk.as_str());
                if chunk.last_in_text_node() {
                    builder.flush_text();
                }
                Ok(())
            }),
            doc_comments!(move |comment| {
                on_comment.borrow_mut().comment(&comment.text());
                Ok(())
            }),
            doctype!(move |doctype| {
                let name = doctype.name().unwrap_or_else(|| "html".to_string());
                on_doctype.borrow_mut().doctype(&name);
                Ok(())
            }),
        ],
        ..RewriteStrSettings::new()
    };

    rewrite_str(html, settings).map_err(|err| DomError::Parse(err.to_string()))?;

    let mut builder = builder.borrow_mut();
    builder.flush_text();
    Ok(std::mem::take(&mut builder.doc))
}
