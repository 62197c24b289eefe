//! Configuration for supazod.
//!
//! Loads `supazod.toml` from the working directory, or the file given with
//! `--config`. Command-line flags override file values.
//!
//! Example supazod.toml:
//! ```toml
//! input = "src/lib/database.types.ts"
//! output = "src/lib/schemas.ts"
//! schema = "public"
//!
//! [filter]
//! include = ["^(Users|Posts)"]
//! exclude = ["Internal"]
//! exclude_tags = ["internal"]
//!
//! [naming]
//! suffix = "Schema"
//! entity_suffixes = ["Row", "Insert", "Update"]
//!
//! [convert]
//! keep_comments = true
//! max_run = 10
//!
//! [format]
//! command = ["prettier", "--stdin-filepath", "{path}"]
//! ```

use crate::error::Error;
use crate::format::{BasicFormatter, CommandFormatter, Formatter};
use crate::naming::{DEFAULT_SUFFIXES, Naming};
use crate::pipeline::GenerateOptions;
use crate::preprocess::{JsDocTagFilter, NameFilter};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use supazod_typegen::ir::JsDocTag;
use supazod_typegen::{Converter, converter_names, get_converter};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "supazod.toml";

/// Declaration filters.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Keep only declarations whose name matches one of these patterns.
    pub include: Vec<String>,
    /// Drop declarations whose name matches one of these patterns.
    pub exclude: Vec<String>,
    /// Keep only declarations carrying one of these JSDoc tags.
    pub include_tags: Vec<String>,
    /// Drop declarations carrying one of these JSDoc tags.
    pub exclude_tags: Vec<String>,
}

/// Validator naming.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub prefix: String,
    pub suffix: String,
    /// Suffixes that group declarations into entities.
    pub entity_suffixes: Vec<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        let naming = Naming::default();
        Self {
            prefix: naming.prefix,
            suffix: naming.suffix,
            entity_suffixes: DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Converter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Registered converter name.
    pub converter: String,
    pub keep_comments: bool,
    pub skip_parse_jsdoc: bool,
    pub skip_validation: bool,
    /// Maximum dependency-ordering passes.
    pub max_run: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            converter: "zod".to_string(),
            keep_comments: false,
            skip_parse_jsdoc: false,
            skip_validation: false,
            max_run: 10,
        }
    }
}

/// Output formatting.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FormatConfig {
    /// External formatter argv. Empty uses the built-in formatter.
    pub command: Vec<String>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupazodConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Database schema to generate, e.g. `public`.
    pub schema: String,
    /// Name of the nested database type.
    pub database_type: String,
    pub filter: FilterConfig,
    pub naming: NamingConfig,
    pub convert: ConvertConfig,
    pub format: FormatConfig,
}

impl Default for SupazodConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            schema: "public".to_string(),
            database_type: "Database".to_string(),
            filter: FilterConfig::default(),
            naming: NamingConfig::default(),
            convert: ConvertConfig::default(),
            format: FormatConfig::default(),
        }
    }
}

impl SupazodConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise `supazod.toml` in `root` is used
    /// when present, and defaults when not.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, Error> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let path = root.join(CONFIG_FILE);
                if path.is_file() {
                    Self::load_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load config from a file path.
    pub fn load_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn naming(&self) -> Naming {
        Naming::new(&self.naming.prefix, &self.naming.suffix)
    }

    /// Build run options. `input` and `output` must be set by now.
    pub fn to_options(&self) -> Result<GenerateOptions, Error> {
        let input = self
            .input
            .clone()
            .ok_or_else(|| Error::Config("no input file (set `input` or pass --input)".into()))?;
        let output = self
            .output
            .clone()
            .ok_or_else(|| Error::Config("no output file (set `output` or pass --output)".into()))?;

        let naming = self.naming();
        if naming.marker().is_empty() {
            return Err(Error::Config(
                "naming needs a non-empty prefix or suffix".into(),
            ));
        }
        if self.convert.max_run == 0 {
            return Err(Error::Config("max_run must be at least 1".into()));
        }

        let mut options = GenerateOptions::new(input, output);
        options.schema = self.schema.clone();
        options.database_type = self.database_type.clone();
        options.naming = naming;
        options.suffixes = self.naming.entity_suffixes.clone();
        options.name_filter = self.name_filter()?;
        options.jsdoc_tag_filter = self.jsdoc_tag_filter();
        options.keep_comments = self.convert.keep_comments;
        options.skip_parse_jsdoc = self.convert.skip_parse_jsdoc;
        options.skip_validation = self.convert.skip_validation;
        options.max_run = self.convert.max_run;
        Ok(options)
    }

    /// The configured converter, from the registry.
    pub fn converter(&self) -> Result<&'static dyn Converter, Error> {
        let name = &self.convert.converter;
        get_converter(name).ok_or_else(|| {
            Error::Config(format!(
                "unknown converter `{}` (available: {})",
                name,
                converter_names().join(", ")
            ))
        })
    }

    /// The configured formatter. `output` fills the `{path}` placeholder.
    pub fn formatter(&self, output: &Path) -> Result<Box<dyn Formatter>, Error> {
        if self.format.command.is_empty() {
            return Ok(Box::new(BasicFormatter));
        }
        let formatter = CommandFormatter::new(self.format.command.clone())?.with_path(output);
        Ok(Box::new(formatter))
    }

    fn name_filter(&self) -> Result<Option<Box<NameFilter>>, Error> {
        if self.filter.include.is_empty() && self.filter.exclude.is_empty() {
            return Ok(None);
        }
        let include = compile(&self.filter.include)?;
        let exclude = compile(&self.filter.exclude)?;
        Ok(Some(Box::new(move |name: &str| {
            (include.is_empty() || include.iter().any(|re| re.is_match(name)))
                && !exclude.iter().any(|re| re.is_match(name))
        })))
    }

    fn jsdoc_tag_filter(&self) -> Option<Box<JsDocTagFilter>> {
        if self.filter.include_tags.is_empty() && self.filter.exclude_tags.is_empty() {
            return None;
        }
        let include = self.filter.include_tags.clone();
        let exclude = self.filter.exclude_tags.clone();
        Some(Box::new(move |tags: &[JsDocTag]| {
            (include.is_empty() || tags.iter().any(|t| include.contains(&t.name)))
                && !tags.iter().any(|t| exclude.contains(&t.name))
        }))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, Error> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p)
                .map_err(|e| Error::Config(format!("invalid filter pattern `{}`: {}", p, e)))
        })
        .collect()
}
