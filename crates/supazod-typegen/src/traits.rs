//! Traits for declaration-to-validator converters.

use crate::input::ParseError;
use convert_case::{Case, Casing};
use std::fmt;

/// Naming strategy mapping a source type name to a validator identifier.
pub type SchemaNameFn<'a> = dyn Fn(&str) -> String + Send + Sync + 'a;

/// Default naming strategy: `<PascalCaseName>Schema`.
pub fn default_schema_name(name: &str) -> String {
    format!("{}Schema", name.to_case(Case::Pascal))
}

/// Options shared by every converter.
pub struct ConvertOptions<'a> {
    /// Maps a type name to the identifier of its generated validator.
    pub schema_name: &'a SchemaNameFn<'a>,
    /// Keep JSDoc comments above generated declarations and properties.
    pub keep_comments: bool,
    /// Do not turn JSDoc tags (`@minimum`, `@format`, ...) into refinements.
    pub skip_parse_jsdoc: bool,
    /// Do not re-check the generated source.
    pub skip_validation: bool,
    /// Maximum dependency-ordering passes.
    pub max_run: usize,
    /// Module specifier used to import the source types from generated code.
    pub types_import_path: String,
}

impl Default for ConvertOptions<'_> {
    fn default() -> Self {
        Self {
            schema_name: &default_schema_name,
            keep_comments: false,
            skip_parse_jsdoc: false,
            skip_validation: false,
            max_run: 10,
            types_import_path: "./types".to_string(),
        }
    }
}

/// A non-fatal problem found while converting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertError {
    /// Declaration the problem belongs to, if it is local to one.
    pub declaration: Option<String>,
    pub message: String,
}

impl ConvertError {
    pub fn new(declaration: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            declaration: Some(declaration.into()),
            message: message.into(),
        }
    }

    pub fn global(message: impl Into<String>) -> Self {
        Self {
            declaration: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.declaration {
            Some(name) => write!(f, "{}: {}", name, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Result of a conversion: generated source plus everything that was skipped.
#[derive(Debug, Clone, Default)]
pub struct ConvertOutput {
    pub source: String,
    pub errors: Vec<ConvertError>,
}

/// A type-declarations to validator-declarations converter.
///
/// # Implementing Custom Converters
///
/// ```ignore
/// use supazod_typegen::{Converter, ConvertOptions, ConvertOutput, ParseError, register_converter};
///
/// struct MyConverter;
///
/// impl Converter for MyConverter {
///     fn name(&self) -> &'static str { "my-converter" }
///     fn convert(&self, source: &str, options: &ConvertOptions) -> Result<ConvertOutput, ParseError> {
///         /* ... */
///     }
/// }
///
/// // Register before first use
/// register_converter(&MyConverter);
/// ```
pub trait Converter: Send + Sync {
    /// Unique converter identifier (e.g., "zod").
    fn name(&self) -> &'static str;

    /// Convert declarations to validators.
    ///
    /// Declarations that cannot be converted are reported in
    /// [`ConvertOutput::errors`]; only a source that cannot be read at all
    /// returns `Err`.
    fn convert(&self, source: &str, options: &ConvertOptions) -> Result<ConvertOutput, ParseError>;
}
