//! Process-wide registry, installed once after initialization.

use std::sync::OnceLock;

use log::info;

use crate::registry::ConversionRegistry;
use crate::types::{ErrorKind, MarshalError, Result, TypedValue};

static GLOBAL: OnceLock<ConversionRegistry> = OnceLock::new();

/// Seal `registry` and install it for the rest of the process.
///
/// Fails with `RegistryInstalled` if one is already installed; the new
/// registry is dropped in that case.
pub fn install(mut registry: ConversionRegistry) -> Result<&'static ConversionRegistry> {
    registry.seal();
    GLOBAL
        .set(registry)
        .map_err(|_| MarshalError::new(ErrorKind::RegistryInstalled))?;
    info!("Installed process-wide conversion registry");
    global()
}

/// The installed registry.
pub fn global() -> Result<&'static ConversionRegistry> {
    GLOBAL
        .get()
        .ok_or_else(|| MarshalError::new(ErrorKind::RegistryNotInstalled))
}

pub fn is_installed() -> bool {
    GLOBAL.get().is_some()
}

/// [`ConversionRegistry::project`] on the installed registry.
pub fn project_global<T: 'static>(value: &TypedValue) -> Result<T> {
    global()?.project(value)
}

/// [`ConversionRegistry::lift`] on the installed registry.
pub fn lift_global<T: 'static>(value: T) -> Result<TypedValue> {
    global()?.lift(value)
}
