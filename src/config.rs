//! Persistent default flags.
//!
//! Defaults live in plain files of command-line tokens, one or more per line,
//! with `#` comment lines and shell-style quoting. The global file sits in the
//! platform config directory; a `.pagemaidrc` in the working directory
//! overrides it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::diagram::Theme;

/// How the page theme signal is set before rendering.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    /// Keep whatever the document says.
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// The theme to force onto the document, if any.
    pub const fn forced_theme(self) -> Option<Theme> {
        match self {
            Self::Auto => None,
            Self::Light => Some(Theme::Default),
            Self::Dark => Some(Theme::Dark),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub perf: bool,
    pub theme: Option<ThemeMode>,
    /// Renderer endpoints, in fallback order.
    pub endpoints: Vec<String>,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge `other` over `self`: booleans are OR-ed, options take `other`'s
    /// value when set, and a non-empty endpoint list replaces the current one.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            perf: self.perf || other.perf,
            theme: other.theme.or(self.theme),
            endpoints: if other.endpoints.is_empty() {
                self.endpoints.clone()
            } else {
                other.endpoints.clone()
            },
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("pagemaid").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("pagemaid")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("pagemaid").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("pagemaid")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".pagemaidrc")
}

/// Read flags from `path`; a missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| {
            shlex::split(line)
                .unwrap_or_else(|| line.split_whitespace().map(ToOwned::to_owned).collect())
        })
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// Global defaults overridden by the local file.
///
/// # Errors
///
/// Returns an error if either file exists but cannot be read.
pub fn load_layered(global: &Path, local: &Path) -> Result<ConfigFlags> {
    Ok(load_config_flags(global)?.union(&load_config_flags(local)?))
}

/// Write `flags` to `path` as tokens, one flag per line.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# pagemaid defaults (saved with --save)".to_string()];
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme.as_str()));
    }
    lines.extend(flags.endpoints.iter().map(|endpoint| {
        let quoted = shlex::try_quote(endpoint)
            .map_or_else(|_| endpoint.clone(), |quoted| quoted.into_owned());
        format!("--endpoint {quoted}")
    }));
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// Remove the defaults file at `path`, if any.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the known flags out of `tokens`, ignoring everything else.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };
        let mut value = || {
            inline.map(ToOwned::to_owned).or_else(|| {
                let next = tokens.get(i + 1).cloned();
                if next.is_some() {
                    i += 1;
                }
                next
            })
        };
        match name {
            "--watch" => flags.watch = true,
            "--perf" => flags.perf = true,
            "-o" | "--output" => {
                value();
            }
            "--theme" => {
                if let Some(theme) = value() {
                    flags.theme = parse_theme(&theme);
                }
            }
            "--endpoint" => flags.endpoints.extend(value()),
            "--render-debug-log" => flags.render_debug_log = value().map(PathBuf::from),
            short if short.len() > 1 && short.starts_with('-') && !short.starts_with("--") => {
                // Clustered short flags; `o` takes the rest (or the next token) as its value.
                for c in short.chars().skip(1) {
                    match c {
                        'w' => flags.watch = true,
                        'o' => break,
                        _ => {}
                    }
                }
                if short.ends_with('o') {
                    value();
                }
            }
            _ => {}
        }
        i += 1;
    }
    flags
}

fn parse_theme(s: &str) -> Option<ThemeMode> {
    match s {
        "auto" => Some(ThemeMode::Auto),
        "light" => Some(ThemeMode::Light),
        "dark" => Some(ThemeMode::Dark),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let flags = parse_flag_tokens(&tokens(&[
            "pagemaid",
            "render",
            "--watch",
            "--theme",
            "dark",
            "--endpoint",
            "https://kroki.example",
            "--endpoint=cmd:mmdc -p puppeteer.json",
            "--render-debug-log=render.log",
            "page.html",
        ]));
        assert!(flags.watch);
        assert!(!flags.perf);
        assert_eq!(flags.theme, Some(ThemeMode::Dark));
        assert_eq!(
            flags.endpoints,
            vec!["https://kroki.example", "cmd:mmdc -p puppeteer.json"]
        );
        assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
    }

    #[test]
    fn test_short_watch_flag_is_recognized() {
        let flags = parse_flag_tokens(&tokens(&["pagemaid", "render", "-w", "page.html"]));
        assert!(flags.watch);

        let flags = parse_flag_tokens(&tokens(&["render", "-wo", "out.html", "page.html"]));
        assert!(flags.watch);
    }

    #[test]
    fn test_output_value_is_not_read_as_a_flag() {
        let flags = parse_flag_tokens(&tokens(&["render", "-o", "-w", "page.html"]));
        assert!(!flags.watch);

        let flags = parse_flag_tokens(&tokens(&["render", "-ow.html", "page.html"]));
        assert!(!flags.watch);
    }

    #[test]
    fn test_unknown_theme_is_ignored() {
        let flags = parse_flag_tokens(&tokens(&["--theme", "sepia", "--perf"]));
        assert_eq!(flags.theme, None);
        assert!(flags.perf);
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            watch: true,
            theme: Some(ThemeMode::Light),
            endpoints: vec!["https://a.example".to_string()],
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            perf: true,
            theme: Some(ThemeMode::Dark),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.watch);
        assert!(merged.perf);
        assert_eq!(merged.theme, Some(ThemeMode::Dark));
        assert_eq!(merged.endpoints, vec!["https://a.example"]);
    }

    #[test]
    fn test_endpoint_lists_replace_rather_than_append() {
        let file = ConfigFlags {
            endpoints: vec!["https://a.example".to_string()],
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            endpoints: vec!["cmd:mmdc".to_string()],
            ..ConfigFlags::default()
        };
        assert_eq!(file.union(&cli).endpoints, vec!["cmd:mmdc"]);
    }

    #[test]
    fn test_forced_theme() {
        assert_eq!(ThemeMode::Auto.forced_theme(), None);
        assert_eq!(ThemeMode::Light.forced_theme(), Some(Theme::Default));
        assert_eq!(ThemeMode::Dark.forced_theme(), Some(Theme::Dark));
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(".pagemaidrc");
        let flags = ConfigFlags {
            watch: true,
            perf: true,
            theme: Some(ThemeMode::Dark),
            endpoints: vec![
                "https://kroki.example".to_string(),
                "cmd:npx --yes @mermaid-js/mermaid-cli".to_string(),
            ],
            render_debug_log: Some(PathBuf::from("render.log")),
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(load_config_flags(&path).unwrap(), ConfigFlags::default());
    }

    #[test]
    fn test_local_file_overrides_global_file() {
        let dir = tempdir().unwrap();
        let global = dir.path().join("global");
        let local = dir.path().join("local");
        fs::write(&global, "# defaults\n--theme light --watch\n").unwrap();
        fs::write(&local, "--theme dark\n").unwrap();

        let flags = load_layered(&global, &local).unwrap();
        assert!(flags.watch);
        assert_eq!(flags.theme, Some(ThemeMode::Dark));
    }
}
