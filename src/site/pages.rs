//! GitHub Pages settings checks.
//!
//! `_config.yml` is not parsed as YAML here. The few scalars that matter are
//! picked out line by line, the same way the site's own tooling reads them,
//! so a config that Jekyll accepts is never rejected for unrelated syntax.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

pub const CONFIG_FILE: &str = "_config.yml";
/// Layout every book page is rendered with.
pub const BOOK_LAYOUT: &str = "_layouts/book.html";
/// Project Pages base path the site is published under.
pub const DEFAULT_EXPECTED_BASEURL: &str = "/categorical-software-design-book";

const PLACEHOLDER_URL: &str = "https://<owner>.github.io";
const PLACEHOLDER_BASEURL: &str = "/<repo>";

/// One problem found in the Pages settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagesIssue {
    MissingConfig(PathBuf),
    /// A required `key:` line is absent or empty.
    MissingKey(&'static str),
    UnexpectedBaseurl { found: String, expected: String },
    MissingLayout(PathBuf),
}

impl fmt::Display for PagesIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingConfig(path) => write!(f, "{} not found", path.display()),
            Self::MissingKey(key) => write!(f, "`{key}:` is not set"),
            Self::UnexpectedBaseurl { found, expected } => {
                write!(f, "baseurl is {found} (expected {expected})")
            }
            Self::MissingLayout(path) => write!(f, "{} not found", path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PagesError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("GitHub Pages settings are incomplete:\n{}", format_issues(.0))]
    Invalid(Vec<PagesIssue>),
}

fn format_issues(issues: &[PagesIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A top-level `key: value` line.
static SCALAR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([\w.-]+):[ \t]*(.+?)[ \t\r]*$").expect("valid scalar line pattern")
});

/// Value of the first top-level `key: value` line, without surrounding
/// quotes. Empty values count as absent.
pub fn pick_scalar(text: &str, key: &str) -> Option<String> {
    let raw = SCALAR_LINE
        .captures_iter(text)
        .find(|caps| &caps[1] == key)?
        .get(2)?
        .as_str();
    let value = strip_quotes(strip_quotes(raw, '"'), '\'').trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn strip_quotes(s: &str, quote: char) -> &str {
    s.strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .unwrap_or(s)
}

/// The Pages URL for a site: `url` followed by `baseurl` with a trailing slash.
pub fn pages_url(url: &str, baseurl: &str) -> String {
    if baseurl.ends_with('/') {
        format!("{url}{baseurl}")
    } else {
        format!("{url}{baseurl}/")
    }
}

/// The Pages-related scalars of `_config.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagesConfig {
    pub url: Option<String>,
    pub baseurl: Option<String>,
    pub repository: Option<String>,
    pub repository_branch: Option<String>,
}

impl PagesConfig {
    pub fn from_text(text: &str) -> Self {
        Self {
            url: pick_scalar(text, "url"),
            baseurl: pick_scalar(text, "baseurl"),
            repository: pick_scalar(text, "repository"),
            repository_branch: pick_scalar(text, "repository_branch"),
        }
    }

    /// Read `_config.yml` under `root`; `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(root: &Path) -> Result<Option<Self>, PagesError> {
        let path = root.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(Self::from_text(&text))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PagesError::Read { path, source }),
        }
    }

    /// Issues in these settings, checking `baseurl` against `expected_baseurl`.
    pub fn issues(&self, expected_baseurl: &str) -> Vec<PagesIssue> {
        let required = [
            ("url", &self.url),
            ("baseurl", &self.baseurl),
            ("repository", &self.repository),
            ("repository_branch", &self.repository_branch),
        ];
        let mut issues: Vec<_> = required
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| PagesIssue::MissingKey(key))
            .collect();
        if let Some(baseurl) = self.baseurl.as_deref().filter(|b| *b != expected_baseurl) {
            issues.push(PagesIssue::UnexpectedBaseurl {
                found: baseurl.to_string(),
                expected: expected_baseurl.to_string(),
            });
        }
        issues
    }

    /// Pages URL, with placeholders for whatever is not configured.
    pub fn expected_pages_url(&self) -> String {
        pages_url(
            self.url.as_deref().unwrap_or(PLACEHOLDER_URL),
            self.baseurl.as_deref().unwrap_or(PLACEHOLDER_BASEURL),
        )
    }
}

/// Check the Pages settings of the site at `root`.
///
/// Returns the Pages URL the site will be published at.
///
/// # Errors
///
/// Returns [`PagesError::Invalid`] listing every issue found, or
/// [`PagesError::Read`] if the config cannot be read.
pub fn validate(root: &Path, expected_baseurl: &str) -> Result<String, PagesError> {
    let Some(config) = PagesConfig::load(root)? else {
        return Err(PagesError::Invalid(vec![PagesIssue::MissingConfig(
            root.join(CONFIG_FILE),
        )]));
    };
    let mut issues = config.issues(expected_baseurl);
    let layout = root.join(BOOK_LAYOUT);
    if !layout.exists() {
        issues.push(PagesIssue::MissingLayout(layout));
    }
    if !issues.is_empty() {
        return Err(PagesError::Invalid(issues));
    }
    Ok(config.expected_pages_url())
}

/// Expected Pages URL of the site at `root`, without checking anything.
///
/// # Errors
///
/// Returns an error only if `_config.yml` exists but cannot be read.
pub fn status(root: &Path) -> Result<String, PagesError> {
    Ok(PagesConfig::load(root)?
        .unwrap_or_default()
        .expected_pages_url())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const GOOD_CONFIG: &str = "title: Book\n\
                               url: \"https://example.github.io\"\n\
                               baseurl: '/categorical-software-design-book'\n\
                               repository: example/categorical-software-design-book\n\
                               repository_branch: main   \n";

    fn site(config: Option<&str>, with_layout: bool) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        if let Some(config) = config {
            fs::write(dir.path().join(CONFIG_FILE), config).unwrap();
        }
        if with_layout {
            fs::create_dir_all(dir.path().join("_layouts")).unwrap();
            fs::write(dir.path().join(BOOK_LAYOUT), "<html></html>").unwrap();
        }
        dir
    }

    #[test]
    fn test_pick_scalar_strips_quotes_and_whitespace() {
        assert_eq!(
            pick_scalar(GOOD_CONFIG, "url").as_deref(),
            Some("https://example.github.io")
        );
        assert_eq!(
            pick_scalar(GOOD_CONFIG, "baseurl").as_deref(),
            Some("/categorical-software-design-book")
        );
        assert_eq!(pick_scalar(GOOD_CONFIG, "repository_branch").as_deref(), Some("main"));
    }

    #[test]
    fn test_pick_scalar_matches_whole_key_at_line_start() {
        let text = "  url: indented\nbaseurl: /x\n";
        assert_eq!(pick_scalar(text, "url"), None);
        assert_eq!(pick_scalar(text, "baseurl").as_deref(), Some("/x"));
        assert_eq!(pick_scalar("url: \"\"\n", "url"), None);
    }

    #[test]
    fn test_pick_scalar_empty_key_does_not_take_next_line() {
        let text = "url:\nbaseurl: /book\nurl: https://late.example\n";
        assert_eq!(pick_scalar(text, "baseurl").as_deref(), Some("/book"));
        assert_eq!(
            pick_scalar(text, "url").as_deref(),
            Some("https://late.example")
        );
        assert_eq!(pick_scalar(text, "repository"), None);
    }

    #[test]
    fn test_pages_url_adds_trailing_slash_once() {
        assert_eq!(pages_url("https://a.github.io", "/b"), "https://a.github.io/b/");
        assert_eq!(pages_url("https://a.github.io", "/b/"), "https://a.github.io/b/");
    }

    #[test]
    fn test_valid_site_reports_pages_url() {
        let dir = site(Some(GOOD_CONFIG), true);
        let url = validate(dir.path(), DEFAULT_EXPECTED_BASEURL).unwrap();
        assert_eq!(url, "https://example.github.io/categorical-software-design-book/");
    }

    #[test]
    fn test_every_issue_is_reported() {
        let dir = site(Some("url: https://example.github.io\nbaseurl: /other\n"), false);
        let Err(PagesError::Invalid(issues)) = validate(dir.path(), DEFAULT_EXPECTED_BASEURL)
        else {
            panic!("expected validation issues");
        };
        assert!(issues.contains(&PagesIssue::MissingKey("repository")));
        assert!(issues.contains(&PagesIssue::MissingKey("repository_branch")));
        assert!(issues.contains(&PagesIssue::UnexpectedBaseurl {
            found: "/other".to_string(),
            expected: DEFAULT_EXPECTED_BASEURL.to_string(),
        }));
        assert!(issues.iter().any(|i| matches!(i, PagesIssue::MissingLayout(_))));
        assert_eq!(issues.len(), 4);
    }

    #[test]
    fn test_expected_baseurl_can_be_overridden() {
        let config = GOOD_CONFIG.replace("/categorical-software-design-book'", "/my-book'");
        let dir = site(Some(&config), true);
        assert!(validate(dir.path(), DEFAULT_EXPECTED_BASEURL).is_err());
        assert_eq!(
            validate(dir.path(), "/my-book").unwrap(),
            "https://example.github.io/my-book/"
        );
    }

    #[test]
    fn test_missing_config_is_an_issue() {
        let dir = site(None, true);
        let err = validate(dir.path(), DEFAULT_EXPECTED_BASEURL).unwrap_err();
        assert!(err.to_string().contains("_config.yml not found"), "{err}");
    }

    #[test]
    fn test_status_uses_placeholders() {
        let dir = site(None, false);
        assert_eq!(status(dir.path()).unwrap(), "https://<owner>.github.io/<repo>/");

        let dir = site(Some("baseurl: /book\n"), false);
        assert_eq!(status(dir.path()).unwrap(), "https://<owner>.github.io/book/");
    }
}
