//! Zod schemas from Supabase database types.
//!
//! `supazod` reads the TypeScript declarations produced by
//! `supabase gen types typescript`, converts every table, view, enum and
//! function of one schema to a Zod validator, and groups the validators by
//! entity:
//!
//! ```text
//! export const ChannelsRowSchema = z.object({ ... });
//! export const ChannelsInsertSchema = z.object({ ... });
//! export const ChannelsUpdateSchema = z.object({ ... });
//!
//! export type ChannelsRow = z.infer<typeof ChannelsRowSchema>;
//! ...
//! export type Channels = { Row: ChannelsRow; Insert: ChannelsInsert; Update: ChannelsUpdate };
//! export const ChannelsSchema = { Row: ChannelsRowSchema, ... };
//! ```
//!
//! # Example
//!
//! ```
//! use supazod::{GenerateOptions, get_converter, transform};
//!
//! let types = r#"
//! export type Database = {
//!   public: {
//!     Tables: {
//!       posts: {
//!         Row: { id: number; title: string }
//!         Insert: { id?: number; title: string }
//!       }
//!     }
//!   }
//! }
//! "#;
//!
//! let zod = get_converter("zod").unwrap();
//! let options = GenerateOptions::new("types.ts", "schemas.ts");
//! let out = transform(types, "./types", &options, zod).unwrap();
//! assert!(out.text.contains("export type PostsRow = z.infer<typeof PostsRowSchema>;"));
//! assert!(out.text.contains("export const PostsSchema = {"));
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod naming;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod preprocess;
pub mod reorganize;

pub use config::SupazodConfig;
pub use error::{Diagnostic, Error, Stage};
pub use format::{BasicFormatter, CommandFormatter, FormatError, Formatter, LanguageMode};
pub use naming::Naming;
pub use pipeline::{GenerateOptions, GenerateReport, Transformed, generate, transform};
pub use reorganize::{Reorganized, ReorganizeOptions, reorganize};
pub use supazod_typegen::{Converter, converter_names, get_converter};
