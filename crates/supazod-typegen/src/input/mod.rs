//! Input format parsers.
//!
//! Each parser reads declarations and produces an IR [`Schema`](crate::ir::Schema).

mod jsdoc;
pub mod typescript;

pub use jsdoc::parse_jsdoc;
pub use typescript::{parse_typescript_types, typescript_parser};

/// Error that prevents a source file from being read at all.
///
/// Problems local to one declaration are not errors; they are carried in the
/// IR and reported by the converter.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("tree-sitter init: {0}")]
    Init(String),

    #[error("failed to parse TypeScript")]
    Failed,
}
