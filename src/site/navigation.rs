//! Sidebar and previous/next navigation data.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

/// Book structure file, relative to the site root.
pub const CONFIG_FILE: &str = "book-config.json";
/// Generated navigation data, relative to the site root.
pub const OUTPUT_FILE: &str = "_data/navigation.yml";

const HEADER: &str = "# AUTO-GENERATED: pagemaid nav\n\
                      # - Sidebar + Previous/Next navigation\n\
                      # - Edit book-config.json and re-run `pagemaid nav`\n\n";

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("{} not found", .0.display())]
    MissingConfig(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid book config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("structure.{0} must be an array")]
    NotArray(&'static str),

    #[error("failed to serialize navigation: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One navigation link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub chapters: Vec<NavEntry>,
    pub appendices: Vec<NavEntry>,
}

/// `A`..`Z` for the first 26 appendices, then the 1-based number.
pub fn appendix_label(index: usize) -> String {
    const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    LETTERS
        .get(index)
        .map_or_else(|| (index + 1).to_string(), |&c| char::from(c).to_string())
}

/// Field value as text; strings as-is, other scalars by their JSON form.
fn field(entry: &Value, key: &str) -> String {
    match entry.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

fn section<'a>(config: &'a Value, name: &'static str) -> Result<&'a [Value], NavigationError> {
    match config.pointer(&format!("/structure/{name}")) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(NavigationError::NotArray(name)),
    }
}

/// Entries with both an id and a title, numbered by their position in the
/// source list (skipped entries still use up a number).
fn entries(items: &[Value], link: impl Fn(usize, &str, &str) -> NavEntry) -> Vec<NavEntry> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let id = field(item, "id");
            let title = field(item, "title");
            if id.is_empty() || title.is_empty() {
                tracing::debug!(index, "skipping navigation entry without id or title");
                return None;
            }
            Some(link(index, &id, &title))
        })
        .collect()
}

/// Build navigation from a parsed book config.
///
/// # Errors
///
/// Returns an error if `structure.chapters` or `structure.appendices` is
/// present but not an array.
pub fn build(config: &Value) -> Result<Navigation, NavigationError> {
    let chapters = section(config, "chapters")?;
    let appendices = section(config, "appendices")?;
    Ok(Navigation {
        chapters: entries(chapters, |index, id, title| NavEntry {
            title: format!("第{}章 {title}", index + 1),
            path: format!("/src/chapters/{id}/"),
        }),
        appendices: entries(appendices, |index, id, title| NavEntry {
            title: format!("付録{} {title}", appendix_label(index)),
            path: format!("/src/appendices/{id}/"),
        }),
    })
}

/// Serialize navigation as YAML under the generated-file header.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn render(nav: &Navigation) -> Result<String, NavigationError> {
    Ok(format!("{HEADER}{}", serde_yaml::to_string(nav)?))
}

/// Read `book-config.json` under `root` and write `_data/navigation.yml`.
///
/// Returns the path written.
///
/// # Errors
///
/// Returns an error if the config is missing or malformed, or the output
/// cannot be written.
pub fn generate(root: &Path) -> Result<PathBuf, NavigationError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Err(NavigationError::MissingConfig(config_path));
    }
    let text = fs::read_to_string(&config_path).map_err(|source| NavigationError::Read {
        path: config_path.clone(),
        source,
    })?;
    let config: Value = serde_json::from_str(&text)?;
    let yaml = render(&build(&config)?)?;

    let out_path = root.join(OUTPUT_FILE);
    let write_err = |source| NavigationError::Write {
        path: out_path.clone(),
        source,
    };
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(&out_path, yaml).map_err(write_err)?;
    tracing::info!(path = %out_path.display(), "navigation written");
    Ok(out_path)
}
