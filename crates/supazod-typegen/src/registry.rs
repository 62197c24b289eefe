//! Registry for declaration-to-validator converters.

use crate::traits::Converter;
use std::sync::{OnceLock, RwLock};

/// Global registry of converters.
static CONVERTERS: RwLock<Vec<&'static dyn Converter>> = RwLock::new(Vec::new());
static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Register a custom converter.
///
/// Built-in converters are registered automatically on first use. Lookups
/// return the first converter with a matching name.
pub fn register_converter(converter: &'static dyn Converter) {
    init_builtin();
    CONVERTERS.write().unwrap().push(converter);
}

/// Initialize built-in converters (called automatically on first use).
fn init_builtin() {
    INITIALIZED.get_or_init(|| {
        #[allow(unused_mut, unused_variables)]
        let mut converters = CONVERTERS.write().unwrap();

        #[cfg(feature = "backend-zod")]
        {
            converters.push(&crate::output::zod::ZOD_CONVERTER);
        }
    });
}

/// Get a converter by name.
pub fn get_converter(name: &str) -> Option<&'static dyn Converter> {
    init_builtin();
    CONVERTERS
        .read()
        .unwrap()
        .iter()
        .find(|c| c.name() == name)
        .copied()
}

/// List all registered converters.
pub fn converters() -> Vec<&'static dyn Converter> {
    init_builtin();
    CONVERTERS.read().unwrap().clone()
}

/// List all registered converter names.
pub fn converter_names() -> Vec<&'static str> {
    init_builtin();
    CONVERTERS.read().unwrap().iter().map(|c| c.name()).collect()
}
