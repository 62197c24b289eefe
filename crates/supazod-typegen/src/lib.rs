//! TypeScript declarations to runtime validators.
//!
//! `supazod-typegen` reads exported TypeScript type aliases, interfaces and
//! enums, and renders one validator declaration per type.
//!
//! # Architecture
//!
//! ```text
//! Input                 IR              Output
//! ──────────────     ─────────────     ──────────────
//! TypeScript    ───> Schema ──────────> Zod validators
//! (tree-sitter)      (ir.rs)           (output/zod.rs)
//!                                            │
//!                                            └─> validate.rs (re-parse, order check)
//! ```
//!
//! # Example
//!
//! ```
//! use supazod_typegen::{ConvertOptions, get_converter};
//!
//! let zod = get_converter("zod").unwrap();
//! let out = zod
//!     .convert("export type User = { id: string };", &ConvertOptions::default())
//!     .unwrap();
//! assert!(out.source.contains("export const UserSchema = z.object({"));
//! assert!(out.errors.is_empty());
//! ```
//!
//! # Feature Flags
//!
//! - `backend-zod` - Zod schema generation (default)

pub mod input;
pub mod ir;
pub mod output;
pub mod registry;
pub mod traits;
pub mod validate;

// Re-export commonly used items
pub use input::{ParseError, parse_typescript_types};

// Re-export traits
pub use traits::{
    ConvertError, ConvertOptions, ConvertOutput, Converter, SchemaNameFn, default_schema_name,
};

// Re-export registry functions
pub use registry::{converter_names, converters, get_converter, register_converter};

#[cfg(feature = "backend-zod")]
pub use output::{ZodConverter, generate_zod};

pub use validate::validate_zod_source;
