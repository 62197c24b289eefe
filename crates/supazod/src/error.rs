//! Fatal errors and non-fatal diagnostics.

use crate::format::FormatError;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use supazod_typegen::{ConvertError, ParseError};
use thiserror::Error;

/// A failure that aborts the run. Nothing is written when one occurs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("schema `{schema}` not found in `{database}` (available: {})", .available.join(", "))]
    SchemaNotFound {
        schema: String,
        database: String,
        available: Vec<String>,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("failed to write {}: {source}", .path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Pipeline stage a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Preprocess,
    Convert,
    Reorganize,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Convert => "convert",
            Stage::Reorganize => "reorganize",
        }
    }
}

/// A non-fatal problem. Reported, never aborts output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub declaration: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(stage: Stage, declaration: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            declaration: Some(declaration.into()),
            message: message.into(),
        }
    }
}

impl From<ConvertError> for Diagnostic {
    fn from(err: ConvertError) -> Self {
        Self {
            stage: Stage::Convert,
            declaration: err.declaration,
            message: err.message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.stage.as_str())?;
        match &self.declaration {
            Some(name) => write!(f, "{}: {}", name, self.message),
            None => f.write_str(&self.message),
        }
    }
}
