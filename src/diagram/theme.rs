//! The page's light/dark theme signal.

use serde::Serialize;

use crate::dom::Document;

/// Document-element attribute holding the current theme.
pub const THEME_ATTRIBUTE: &str = "data-theme";

/// Diagram theme derived from the page theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Dark,
}

impl Theme {
    /// `dark` selects the dark theme; any other value, or none, the default.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("dark") => Self::Dark,
            _ => Self::Default,
        }
    }

    /// Read the theme signal from the document element.
    pub fn from_document(doc: &Document) -> Self {
        Self::from_attribute(
            doc.document_element()
                .and_then(|html| doc.attr(html, THEME_ATTRIBUTE)),
        )
    }

    /// Write this theme to the document element, as the page's theme toggle
    /// does. Returns `false` when the document has no element to carry it.
    pub fn apply(self, doc: &mut Document) -> bool {
        let Some(html) = doc.document_element() else {
            return false;
        };
        let value = match self {
            Self::Dark => "dark",
            Self::Default => "light",
        };
        doc.set_attr(html, THEME_ATTRIBUTE, value);
        true
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Dark => "dark",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_dark_selects_dark_theme() {
        assert_eq!(Theme::from_attribute(Some("dark")), Theme::Dark);
        assert_eq!(Theme::from_attribute(Some("light")), Theme::Default);
        assert_eq!(Theme::from_attribute(Some("DARK")), Theme::Default);
        assert_eq!(Theme::from_attribute(None), Theme::Default);
    }

    #[test]
    fn test_theme_read_from_document_element() {
        let doc = Document::parse("<html data-theme=\"dark\"><body></body></html>").unwrap();
        assert_eq!(Theme::from_document(&doc), Theme::Dark);
    }

    #[test]
    fn test_apply_then_read_round_trips() {
        let mut doc = Document::parse("<html><body></body></html>").unwrap();
        assert!(Theme::Dark.apply(&mut doc));
        assert_eq!(Theme::from_document(&doc), Theme::Dark);
        assert!(Theme::Default.apply(&mut doc));
        assert_eq!(Theme::from_document(&doc), Theme::Default);
    }

    #[test]
    fn test_apply_without_document_element_fails() {
        let mut doc = Document::new();
        assert!(!Theme::Dark.apply(&mut doc));
    }
}
