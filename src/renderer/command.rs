//! Mermaid CLI (`mmdc`) as a renderer.
//!
//! The CLI reads diagram source on stdin and writes SVG to stdout. The
//! command line is configurable so a pinned `npx @mermaid-js/mermaid-cli@x.y.z`
//! invocation works the same way as a globally installed `mmdc`.

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::loader::{LoadError, RendererEndpoint};
use super::{ConfigSlot, DiagramRenderer, RenderBatch, RenderCall, RenderConfig, RenderError};

/// Arguments that make the CLI stream stdin to stdout as SVG.
const STREAM_ARGS: &[&str] = &["--input", "-", "--output", "-", "--outputFormat", "svg", "--quiet"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    fn parse(line: &str) -> Result<Self, LoadError> {
        let invalid = |reason: &str| LoadError::InvalidEndpoint {
            spec: format!("cmd:{line}"),
            reason: reason.to_string(),
        };
        let mut words = shlex::split(line).ok_or_else(|| invalid("unbalanced quotes"))?;
        if words.is_empty() {
            return Err(invalid("empty command"));
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        command
    }
}

/// An endpoint that runs the Mermaid CLI.
#[derive(Debug, Clone)]
pub struct CommandEndpoint {
    line: String,
    command: CommandLine,
}

impl CommandEndpoint {
    /// Parse a shell-style command line such as `npx --yes @mermaid-js/mermaid-cli`.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is empty or has unbalanced quotes.
    pub fn from_command_line(line: &str) -> Result<Self, LoadError> {
        Ok(Self {
            line: line.to_string(),
            command: CommandLine::parse(line)?,
        })
    }
}

#[async_trait::async_trait]
impl RendererEndpoint for CommandEndpoint {
    fn location(&self) -> &str {
        &self.line
    }

    async fn load(&self) -> Result<Arc<dyn DiagramRenderer>, LoadError> {
        let unavailable = |reason: String| LoadError::Unavailable {
            location: self.line.clone(),
            reason,
        };
        let output = self
            .command
            .command()
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| unavailable(err.to_string()))?;
        if !output.status.success() {
            return Err(unavailable(format!("--version exited with {}", output.status)));
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(command = %self.line, %version, "mermaid cli available");
        Ok(Arc::new(CommandRenderer {
            command: self.command.clone(),
            version,
            config: ConfigSlot::default(),
        }))
    }
}

/// Renderer that spawns the Mermaid CLI once per diagram.
#[derive(Debug)]
pub struct CommandRenderer {
    command: CommandLine,
    version: String,
    config: ConfigSlot,
}

impl CommandRenderer {
    /// Version string reported by the CLI.
    pub fn version(&self) -> &str {
        &self.version
    }

    async fn render_svg(&self, source: String) -> Result<String, RenderError> {
        let mut child = self
            .command
            .command()
            .args(STREAM_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| RenderError::Transport(err.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(source.as_bytes())
                .await
                .map_err(|err| RenderError::Transport(err.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| RenderError::Transport(err.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .find(|l| !l.trim().is_empty())
                .unwrap_or_default();
            return Err(RenderError::Transport(format!(
                "{} exited with {}: {}",
                self.command.program,
                output.status,
                detail.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DiagramRenderer for CommandRenderer {
    fn name(&self) -> &str {
        "mermaid-cli"
    }

    fn initialize(&self, config: &RenderConfig) -> Result<(), RenderError> {
        self.config.set(*config);
        Ok(())
    }

    fn run<'a>(&'a self, batch: RenderBatch<'a>) -> RenderCall<'a> {
        let config = self.config.get();
        RenderCall::Pending(Box::pin(super::render_each(batch, config, move |source| {
            self.render_svg(source)
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_splits_quoted_words() {
        let line = CommandLine::parse("npx --yes '@mermaid-js/mermaid-cli@10.9.1'").unwrap();
        assert_eq!(line.program, "npx");
        assert_eq!(line.args, vec!["--yes", "@mermaid-js/mermaid-cli@10.9.1"]);
    }

    #[test]
    fn test_command_line_rejects_unbalanced_quotes() {
        assert!(CommandEndpoint::from_command_line("mmdc 'oops").is_err());
        assert!(CommandEndpoint::from_command_line("   ").is_err());
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let endpoint =
            CommandEndpoint::from_command_line("pagemaid-definitely-not-installed-xyz").unwrap();
        let err = endpoint.load().await.err().unwrap();
        assert!(matches!(err, LoadError::Unavailable { .. }), "got {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_output_becomes_placeholder_content() {
        use crate::diagram::placeholder;
        use crate::dom::Document;

        // `sh -c 'cat >/dev/null; echo <svg/>' sh` ignores the stream arguments.
        let endpoint =
            CommandEndpoint::from_command_line("sh -c 'cat >/dev/null; echo \"<svg>cli</svg>\"' sh")
                .unwrap();
        let renderer = CommandRenderer {
            command: endpoint.command.clone(),
            version: String::new(),
            config: ConfigSlot::default(),
        };

        let mut doc = Document::new();
        let root = doc.root();
        let node = placeholder::create(&mut doc, "graph TD\nA-->B");
        doc.append_child(root, node);
        let nodes = [node];

        {
            let call = renderer.run(RenderBatch {
                document: &mut doc,
                nodes: &nodes,
            });
            let RenderCall::Pending(future) = call else {
                panic!("expected an async render");
            };
            future.await.unwrap();
        }

        assert_eq!(placeholder::state(&doc, node), placeholder::RenderedState::Rendered);
        assert!(doc.to_html().contains("<svg>cli</svg>"));
        assert_eq!(placeholder::original_source(&doc, node), Some("graph TD\nA-->B"));
    }
}
