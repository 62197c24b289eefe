//! Output converters.
//!
//! Each converter reads TypeScript declarations into the IR
//! [`Schema`](crate::ir::Schema) and renders validator source. All converters
//! implement the [`Converter`](crate::traits::Converter) trait for uniform
//! access via the registry.

// Zod (TypeScript validator)
#[cfg(feature = "backend-zod")]
pub mod zod;

#[cfg(feature = "backend-zod")]
pub use zod::{ZOD_CONVERTER, ZodConverter, generate_zod};
