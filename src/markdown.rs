//! Markdown pages rendered to HTML.
//!
//! The static-site generator normally turns `.md` pages into HTML before the
//! diagram pass ever sees them. When the input is markdown we do that step
//! with comrak, which tags fenced blocks as `<code class="language-...">`
//! exactly like the generator does.

use std::path::Path;

use comrak::{Options, markdown_to_html};

/// File extensions treated as markdown input.
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdown", "mkd"];

/// Returns true if the file extension is a recognized markdown format.
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn create_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    options
}

/// Render a markdown fragment to HTML.
pub fn to_html(markdown: &str) -> String {
    markdown_to_html(markdown, &create_options())
}

/// Render markdown into a complete HTML page.
pub fn to_page(title: &str, markdown: &str) -> String {
    let body = to_html(markdown);
    let title = htmlize::escape_text(title);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

/// Prepare file content for the diagram pass based on its extension.
///
/// Markdown files are rendered to a full HTML page; everything else is
/// assumed to be HTML already and passes through unchanged.
pub fn prepare_content(file_path: &Path, content: String) -> String {
    if !is_markdown_file(file_path) {
        return content;
    }
    let title = file_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    to_page(&title, &content)
}
