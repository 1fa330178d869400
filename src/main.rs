//! pagemaid - diagram activation and Pages helpers for documentation sites.
//!
//! # Usage
//!
//! ```bash
//! pagemaid render chapter.html -o out/chapter.html
//! pagemaid render --watch --theme dark notes.md -o notes.html
//! pagemaid nav
//! pagemaid validate-pages
//! ```

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use pagemaid::app::{ActivationReport, Activator, Page};
use pagemaid::config::{
    ConfigFlags, ThemeMode, clear_config_flags, global_config_path, load_layered,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use pagemaid::dom::Document;
use pagemaid::renderer::{EndpointSpec, RendererLoader, default_endpoint_specs};
use pagemaid::site::{navigation, pages};
use pagemaid::watcher::{DEFAULT_DEBOUNCE, FileWatcher};
use pagemaid::{markdown, perf};

/// Diagram activation and GitHub Pages helpers for documentation sites
#[derive(Parser, Debug)]
#[command(name = "pagemaid", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace diagram code blocks in a page with rendered diagrams
    Render(RenderArgs),
    /// Generate _data/navigation.yml from book-config.json
    Nav {
        /// Site root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Check the GitHub Pages settings in _config.yml
    ValidatePages {
        /// Site root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Base path the site must be published under
        #[arg(long, default_value = pages::DEFAULT_EXPECTED_BASEURL)]
        expected_baseurl: String,
    },
    /// Print the expected GitHub Pages URL
    PagesStatus {
        /// Site root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// HTML or markdown file to render
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Write the page here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Re-render whenever the input changes
    #[arg(short, long)]
    watch: bool,

    /// Theme signal to set on the page before rendering
    #[arg(long, value_enum)]
    theme: Option<ThemeMode>,

    /// Renderer endpoint: an http(s) URL of a Kroki service or cmd:<command>
    #[arg(long, value_name = "SPEC")]
    endpoint: Vec<String>,

    /// Print timing of each stage to stderr
    #[arg(long)]
    perf: bool,

    /// Write loader and render events to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save current render flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

/// Flags from the defaults files merged under the command line.
fn effective_flags(args: &RenderArgs, raw_args: &[String]) -> Result<ConfigFlags> {
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(raw_args);

    if args.clear {
        clear_config_flags(&global_path)?;
    }
    if args.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if args.clear {
        ConfigFlags::default()
    } else {
        load_layered(&global_path, &local_path)?
    };
    Ok(file_flags.union(&cli_flags))
}

fn init_perf(flags: &ConfigFlags) {
    perf::set_enabled(flags.perf);
    let log_path = flags
        .render_debug_log
        .clone()
        .or_else(perf::debug_log_path_from_env);
    if let Err(err) = perf::set_debug_log_path(log_path.as_deref()) {
        let path = log_path
            .as_ref()
            .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string());
        tracing::warn!(
            path = %path,
            error = %err,
            "failed to open render debug log"
        );
    }
}

fn build_loader(flags: &ConfigFlags) -> Result<RendererLoader> {
    let specs = if flags.endpoints.is_empty() {
        default_endpoint_specs()
    } else {
        flags
            .endpoints
            .iter()
            .map(|spec| spec.parse::<EndpointSpec>())
            .collect::<Result<Vec<_>, _>>()?
    };
    Ok(RendererLoader::from_specs(&specs)?)
}

/// Read, activate and write one page.
async fn render_once(
    activator: &Activator,
    file: &Path,
    output: Option<&Path>,
    theme: ThemeMode,
) -> Result<ActivationReport> {
    let _scope = perf::scope("cli.render_once");
    let content =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let html = markdown::prepare_content(file, content);
    let mut document =
        Document::parse(&html).with_context(|| format!("Failed to parse {}", file.display()))?;
    let mut themed = false;
    if let Some(forced) = theme.forced_theme() {
        themed = forced.apply(&mut document);
        if !themed {
            tracing::warn!("page has no root element; theme not applied");
        }
    }

    let mut page = Page::loaded(document);
    let report = activator.on_ready(&mut page).await;
    let rendered = if themed {
        Cow::Owned(page.document.to_html())
    } else {
        report.output(&html, &page.document)
    };
    match output {
        Some(path) => fs::write(path, rendered.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{rendered}"),
    }
    tracing::info!(
        blocks = report.blocks,
        renderer = report.renderer.as_deref().unwrap_or("none"),
        "page rendered"
    );
    Ok(report)
}

async fn run_render(args: RenderArgs, raw_args: &[String]) -> Result<()> {
    let flags = effective_flags(&args, raw_args)?;
    init_perf(&flags);

    if !args.file.exists() {
        anyhow::bail!("File not found: {}", args.file.display());
    }
    let theme = flags.theme.unwrap_or(ThemeMode::Auto);
    let activator = Activator::new(Arc::new(build_loader(&flags)?));
    let output = args.output.as_deref();

    render_once(&activator, &args.file, output, theme).await?;
    if !flags.watch {
        return Ok(());
    }

    let mut watcher = FileWatcher::new(&args.file, DEFAULT_DEBOUNCE)
        .with_context(|| format!("Failed to watch {}", args.file.display()))?;
    if let Some(output) = output {
        watcher = watcher.with_ignored(output);
    }
    eprintln!("Watching {} for changes", watcher.target_path().display());
    while watcher.changed().await {
        if let Err(err) = render_once(&activator, &args.file, output, theme).await {
            tracing::warn!(error = %format!("{err:#}"), "re-render failed");
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();

    match cli.command {
        Command::Render(args) => run_render(args, &raw_args).await,
        Command::Nav { root } => {
            let written = navigation::generate(&root)?;
            println!("Wrote {}", written.strip_prefix(&root).unwrap_or(&written).display());
            Ok(())
        }
        Command::ValidatePages {
            root,
            expected_baseurl,
        } => {
            let url = pages::validate(&root, &expected_baseurl)?;
            println!("GitHub Pages settings look good");
            println!("- Pages URL (expected): {url}");
            println!("- Settings: Settings > Pages > Deploy from a branch > main / (root)");
            Ok(())
        }
        Command::PagesStatus { root } => {
            let url = pages::status(&root)?;
            println!(
                "Pages availability depends on repository settings; no network check is made."
            );
            println!("- Pages URL (expected): {url}");
            println!("- Check Settings > Pages for the source branch and folder.");
            Ok(())
        }
    }
}
