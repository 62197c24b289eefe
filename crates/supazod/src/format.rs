//! Output formatting.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Language of the text handed to a formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageMode {
    TypeScript,
}

impl LanguageMode {
    /// Parser name understood by prettier-style formatters.
    pub fn parser_name(self) -> &'static str {
        match self {
            LanguageMode::TypeScript => "typescript",
        }
    }
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to run formatter `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("formatter `{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("formatter `{0}` produced non-UTF-8 output")]
    NotUtf8(String),

    #[error("empty formatter command")]
    EmptyCommand,
}

/// Turns generated text into its final on-disk form.
pub trait Formatter {
    fn format(&self, text: &str, mode: LanguageMode) -> Result<String, FormatError>;
}

/// Whitespace normalization: trailing whitespace removed, runs of blank lines
/// collapsed to one, exactly one trailing newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicFormatter;

impl Formatter for BasicFormatter {
    fn format(&self, text: &str, _mode: LanguageMode) -> Result<String, FormatError> {
        let mut out = String::with_capacity(text.len());
        let mut blank_run = true;
        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                if blank_run {
                    continue;
                }
                blank_run = true;
            } else {
                blank_run = false;
            }
            out.push_str(line);
            out.push('\n');
        }
        while out.ends_with("\n\n") {
            out.pop();
        }
        if out.is_empty() {
            out.push('\n');
        }
        Ok(out)
    }
}

/// Pipes text through an external formatter (prettier, biome, dprint, ...).
///
/// The text is written to the command's stdin and the formatted text read
/// from its stdout. In arguments, `{path}` is replaced by the output path and
/// `{parser}` by the language mode's parser name.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    argv: Vec<String>,
    path: Option<PathBuf>,
}

impl CommandFormatter {
    pub fn new(argv: Vec<String>) -> Result<Self, FormatError> {
        if argv.is_empty() {
            return Err(FormatError::EmptyCommand);
        }
        Ok(Self { argv, path: None })
    }

    /// Path substituted for `{path}`.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    fn expand(&self, arg: &str, mode: LanguageMode) -> String {
        let mut arg = arg.replace("{parser}", mode.parser_name());
        if let Some(path) = &self.path {
            arg = arg.replace("{path}", &path.to_string_lossy());
        }
        arg
    }
}

impl Formatter for CommandFormatter {
    fn format(&self, text: &str, mode: LanguageMode) -> Result<String, FormatError> {
        let args: Vec<String> = self.argv.iter().map(|a| self.expand(a, mode)).collect();
        let command = args.join(" ");
        tracing::debug!(%command, "running formatter");

        let spawn_err = |source| FormatError::Spawn {
            command: command.clone(),
            source,
        };
        let mut child = Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // Feed stdin from a separate thread so a full stdout pipe cannot block us.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = text.to_string();
            std::thread::spawn(move || stdin.write_all(input.as_bytes()))
        });
        let output = child.wait_with_output().map_err(spawn_err)?;
        let written = match writer.map(|w| w.join()) {
            Some(Ok(result)) => result,
            Some(Err(_)) => Err(io::Error::other("stdin writer panicked")),
            None => Ok(()),
        };

        if !output.status.success() {
            return Err(FormatError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written.map_err(spawn_err)?;
        String::from_utf8(output.stdout).map_err(|_| FormatError::NotUtf8(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_formatter() {
        let text = "\n\nimport { z } from \"zod\";   \n\n\n\nexport const A = z.string();\n\n\n";
        let out = BasicFormatter.format(text, LanguageMode::TypeScript).unwrap();
        assert_eq!(out, "import { z } from \"zod\";\n\nexport const A = z.string();\n");
    }

    #[test]
    fn test_basic_formatter_is_idempotent() {
        let text = "a  \n\n\n  b\t\n\n";
        let once = BasicFormatter.format(text, LanguageMode::TypeScript).unwrap();
        let twice = BasicFormatter.format(&once, LanguageMode::TypeScript).unwrap();
        assert_eq!(once, "a\n\n  b\n");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_command() {
        assert!(matches!(
            CommandFormatter::new(Vec::new()),
            Err(FormatError::EmptyCommand)
        ));
    }

    #[test]
    fn test_argument_expansion() {
        let formatter = CommandFormatter::new(vec![
            "prettier".into(),
            "--parser".into(),
            "{parser}".into(),
            "--stdin-filepath".into(),
            "{path}".into(),
        ])
        .unwrap()
        .with_path("src/schemas.ts");
        let args: Vec<String> = formatter
            .argv
            .iter()
            .map(|a| formatter.expand(a, LanguageMode::TypeScript))
            .collect();
        assert_eq!(
            args,
            vec!["prettier", "--parser", "typescript", "--stdin-filepath", "src/schemas.ts"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_command_formatter_pipes_text() {
        let formatter = CommandFormatter::new(vec!["cat".into()]).unwrap();
        let out = formatter.format("export const A = 1;\n", LanguageMode::TypeScript).unwrap();
        assert_eq!(out, "export const A = 1;\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_formatter_failure() {
        let formatter = CommandFormatter::new(vec!["false".into()]).unwrap();
        let err = formatter.format("x", LanguageMode::TypeScript).unwrap_err();
        assert!(matches!(err, FormatError::Failed { .. }), "{}", err);
    }

    #[test]
    fn test_missing_command() {
        let formatter = CommandFormatter::new(vec!["supazod-no-such-formatter".into()]).unwrap();
        let err = formatter.format("x", LanguageMode::TypeScript).unwrap_err();
        assert!(matches!(err, FormatError::Spawn { .. }), "{}", err);
    }
}
