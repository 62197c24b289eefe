//! The generation pipeline.
//!
//! ```text
//! input file ─> preprocess ─> converter ─> reorganize ─> formatter ─> output file
//! ```
//!
//! [`transform`] is the pure text-to-text part; [`generate`] adds reading,
//! formatting and the atomic write.

use crate::error::{Diagnostic, Error};
use crate::format::{Formatter, LanguageMode};
use crate::naming::{DEFAULT_SUFFIXES, Naming};
use crate::output::write_atomic;
use crate::paths::{normalize, types_import_path};
use crate::preprocess::{JsDocTagFilter, NameFilter, PreprocessOptions, preprocess};
use crate::reorganize::{ReorganizeOptions, reorganize};
use serde::Serialize;
use std::path::{Path, PathBuf};
use supazod_typegen::{ConvertOptions, Converter};

/// Options for one run.
pub struct GenerateOptions {
    /// Input type declarations, relative to the working directory.
    pub input: PathBuf,
    /// Generated file, relative to the working directory.
    pub output: PathBuf,
    pub schema: String,
    pub database_type: String,
    pub naming: Naming,
    pub suffixes: Vec<String>,
    pub name_filter: Option<Box<NameFilter>>,
    pub jsdoc_tag_filter: Option<Box<JsDocTagFilter>>,
    pub keep_comments: bool,
    pub skip_parse_jsdoc: bool,
    pub skip_validation: bool,
    pub max_run: usize,
}

impl GenerateOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            schema: "public".to_string(),
            database_type: "Database".to_string(),
            naming: Naming::default(),
            suffixes: DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            name_filter: None,
            jsdoc_tag_filter: None,
            keep_comments: false,
            skip_parse_jsdoc: false,
            skip_validation: false,
            max_run: 10,
        }
    }
}

/// Result of [`transform`].
#[derive(Debug, Clone)]
pub struct Transformed {
    /// Reorganized module, not yet formatted.
    pub text: String,
    /// Declarations handed to the converter.
    pub declarations: usize,
    /// Generated schema blocks, Json excluded.
    pub schemas: usize,
    /// Entity groups that received an aggregate pair.
    pub entities: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome of a successful [`generate`].
#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    /// Absolute path written.
    pub output: PathBuf,
    pub declarations: usize,
    pub schemas: usize,
    pub entities: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Turn type declarations into the grouped validator module.
///
/// `types_import_path` is the module specifier the output uses to import the
/// `Json` type. Non-fatal problems from every stage are collected in
/// [`Transformed::diagnostics`].
pub fn transform(
    source: &str,
    types_import_path: &str,
    options: &GenerateOptions,
    converter: &dyn Converter,
) -> Result<Transformed, Error> {
    let preprocessed = preprocess(
        source,
        &PreprocessOptions {
            schema: &options.schema,
            database_type: &options.database_type,
            naming: &options.naming,
            name_filter: options.name_filter.as_deref(),
            jsdoc_tag_filter: options.jsdoc_tag_filter.as_deref(),
        },
    )?;
    tracing::debug!(
        declarations = preprocessed.declarations.len(),
        "preprocessed declarations"
    );
    let mut diagnostics = preprocessed.diagnostics;

    let naming = &options.naming;
    let schema_name = |name: &str| naming.schema_name(name);
    let converted = converter.convert(
        &preprocessed.source,
        &ConvertOptions {
            schema_name: &schema_name,
            keep_comments: options.keep_comments,
            skip_parse_jsdoc: options.skip_parse_jsdoc,
            skip_validation: options.skip_validation,
            max_run: options.max_run,
            types_import_path: types_import_path.to_string(),
        },
    )?;
    tracing::debug!(converter = converter.name(), errors = converted.errors.len(), "converted");
    for err in converted.errors {
        let diag = Diagnostic::from(err);
        tracing::warn!("{}", diag);
        diagnostics.push(diag);
    }

    let reorganize_options =
        ReorganizeOptions::new(options.naming.clone(), options.suffixes.clone());
    let reorganized = reorganize(&converted.source, &reorganize_options)?;
    let text = reorganized.render(&options.naming, types_import_path);
    diagnostics.extend(reorganized.diagnostics.iter().cloned());

    Ok(Transformed {
        text,
        declarations: preprocessed.declarations.len(),
        schemas: reorganized.blocks.len(),
        entities: reorganized.groups.iter().filter(|g| g.has_pair()).count(),
        diagnostics,
    })
}

/// Read `options.input`, generate, format, and atomically write
/// `options.output`. Relative paths resolve against the working directory.
pub fn generate(
    options: &GenerateOptions,
    converter: &dyn Converter,
    formatter: &dyn Formatter,
) -> Result<GenerateReport, Error> {
    let input = resolve(&options.input).map_err(|source| Error::ReadInput {
        path: options.input.clone(),
        source,
    })?;
    let output = resolve(&options.output).map_err(|source| Error::WriteOutput {
        path: options.output.clone(),
        source,
    })?;

    tracing::info!(input = %input.display(), schema = %options.schema, "reading declarations");
    let source = std::fs::read_to_string(&input).map_err(|source| Error::ReadInput {
        path: input.clone(),
        source,
    })?;

    let import_path = types_import_path(&input, &output);
    let transformed = transform(&source, &import_path, options, converter)?;
    let formatted = formatter.format(&transformed.text, LanguageMode::TypeScript)?;

    write_atomic(&output, &formatted).map_err(|source| Error::WriteOutput {
        path: output.clone(),
        source,
    })?;
    tracing::info!(
        output = %output.display(),
        schemas = transformed.schemas,
        entities = transformed.entities,
        diagnostics = transformed.diagnostics.len(),
        "wrote schemas"
    );

    Ok(GenerateReport {
        output,
        declarations: transformed.declarations,
        schemas: transformed.schemas,
        entities: transformed.entities,
        diagnostics: transformed.diagnostics,
    })
}

fn resolve(path: &Path) -> std::io::Result<PathBuf> {
    Ok(normalize(&std::path::absolute(path)?))
}
