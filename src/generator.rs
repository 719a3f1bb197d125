use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow};
use lsp_types::Url;
use tracing::{debug, info};

use crate::sourcemap::directives::DIRECTIVE;

/// Produces the target rendering of a source document.
///
/// The output must carry `#line` directives for every region that corresponds
/// to source lines.
pub trait TargetGenerator {
    fn generate(&self, uri: &Url, source: &str) -> Result<String>;
}

/// Emits a fixed prelude followed by the source behind a `#line 1` directive.
#[derive(Debug, Clone, Default)]
pub struct PreludeGenerator {
    pub prelude: Vec<String>,
}

impl PreludeGenerator {
    pub fn new(prelude: Vec<String>) -> Self {
        Self { prelude }
    }
}

impl TargetGenerator for PreludeGenerator {
    fn generate(&self, _uri: &Url, source: &str) -> Result<String> {
        let mut target = String::new();
        for line in &self.prelude {
            target.push_str(line);
            target.push('\n');
        }
        target.push_str(DIRECTIVE);
        target.push_str(" 1\n");
        target.push_str(source);
        Ok(target)
    }
}

/// Runs an external program with the source on stdin and takes its stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl TargetGenerator for CommandGenerator {
    fn generate(&self, uri: &Url, source: &str) -> Result<String> {
        info!(program = %self.program, %uri, "Running generator");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(uri.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Spawning generator {}", self.program))?;

        // Feed stdin from its own thread so a chatty generator can't fill the
        // stdout pipe while we are still writing.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Generator stdin was not captured"))?;
        let input = source.to_owned();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let out = child
            .wait_with_output()
            .context("Waiting for generator")?;
        let written = writer
            .join()
            .map_err(|_| anyhow!("Generator stdin writer panicked"))?;

        debug!(status = ?out.status, stdout = out.stdout.len(), stderr = out.stderr.len(), "Generator exited");

        // A generator that exits early also breaks the stdin pipe; its status
        // and stderr say more than the write error.
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(anyhow!(
                "Generator {} failed with {}: {}",
                self.program,
                out.status,
                stderr.trim()
            ));
        }
        written.context("Writing source to generator")?;

        String::from_utf8(out.stdout).context("Generator output is not UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sourcemap::parse_directives;

    fn uri() -> Url {
        Url::parse("file:///tmp/sketch.ino").unwrap()
    }

    #[test]
    fn prelude_generator_maps_source_after_prelude() {
        let generator = PreludeGenerator::new(vec!["#include <Arduino.h>".into(), "void setup();".into()]);
        let target = generator.generate(&uri(), "void setup() {}\n").unwrap();
        assert_eq!(target, "#include <Arduino.h>\nvoid setup();\n#line 1\nvoid setup() {}\n");

        let maps = parse_directives(&target);
        assert_eq!(maps.source_line(3), Some(0));
        assert_eq!(maps.target_line(0), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn command_generator_pipes_source_through() {
        let generator = CommandGenerator::new("sh", vec!["-c".into(), "echo '#line 1'; cat".into()]);
        let target = generator.generate(&uri(), "a\nb").unwrap();
        assert_eq!(target, "#line 1\na\nb");
    }

    #[cfg(unix)]
    #[test]
    fn command_generator_reports_failure() {
        let generator = CommandGenerator::new("sh", vec!["-c".into(), "echo broken >&2; exit 3".into()]);
        let err = generator.generate(&uri(), "a").unwrap_err();
        assert!(err.to_string().contains("broken"), "{err}");
    }

    #[test]
    fn missing_program_is_an_error() {
        let generator = CommandGenerator::new("/nonexistent/generator", vec![]);
        assert!(generator.generate(&uri(), "a").is_err());
    }
}
