//! Conversion registry: dispatch between [`TypedValue`] and native types.
//!
//! The registry maps a native type identity (`TypeId`) to a pair of
//! functions, `project` (value → native) and `lift` (native → value). Two
//! tables are consulted in order: custom converters registered by the
//! application, then the built-in converters every registry starts with.
//!
//! # Lifecycle
//!
//! ```text
//! Open ──seal()──▶ Sealed
//!  │                 │
//!  register_*        project / lift from any thread
//! ```
//!
//! Registration needs `&mut self` and projection needs `&self`, so the
//! borrow checker rules out registration racing with use. Projection while
//! still `Open` works but is logged as a warning.

mod builtin;
pub mod global;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::types::{MarshalError, Result, TypedValue};

/// Non-intrusive conversion contract for a native type.
pub trait Convert: Sized + 'static {
    /// Read a native value out of `value`, validating kind and shape.
    fn project(value: &TypedValue) -> Result<Self>;

    /// Build the value the host needs to interpret `self`.
    fn lift(self) -> Result<TypedValue>;
}

type ProjectFn<T> = dyn Fn(&TypedValue) -> Result<T> + Send + Sync;
type LiftFn<T> = dyn Fn(T) -> Result<TypedValue> + Send + Sync;

/// A `project`/`lift` function pair for native type `T`.
pub struct Converter<T> {
    project: Box<ProjectFn<T>>,
    lift: Box<LiftFn<T>>,
}

impl<T: 'static> Converter<T> {
    pub fn new<P, L>(project: P, lift: L) -> Self
    where
        P: Fn(&TypedValue) -> Result<T> + Send + Sync + 'static,
        L: Fn(T) -> Result<TypedValue> + Send + Sync + 'static,
    {
        Self {
            project: Box::new(project),
            lift: Box::new(lift),
        }
    }

    /// Converter backed by the type's [`Convert`] impl.
    pub fn of() -> Self
    where
        T: Convert,
    {
        Self::new(T::project, T::lift)
    }

    pub fn project(&self, value: &TypedValue) -> Result<T> {
        (self.project)(value)
    }

    pub fn lift(&self, native: T) -> Result<TypedValue> {
        (self.lift)(native)
    }
}

impl<T> fmt::Debug for Converter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

/// Registration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Registration allowed; use is discouraged.
    Open,
    /// Registration refused; use from any thread.
    Sealed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Open => write!(f, "open"),
            Phase::Sealed => write!(f, "sealed"),
        }
    }
}

/// What to do when a converter for the same native type is already registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnConflict {
    /// Fail with `DuplicateConverter`, keeping the first registration.
    #[default]
    Reject,
    /// Replace the existing converter.
    Overwrite,
}

impl std::str::FromStr for OnConflict {
    type Err = MarshalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reject" => Ok(OnConflict::Reject),
            "overwrite" => Ok(OnConflict::Overwrite),
            other => Err(MarshalError::config(format!(
                "unknown conflict policy `{}` (expected `reject` or `overwrite`)",
                other
            ))),
        }
    }
}

/// Which table a converter lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Builtin,
    Custom,
}

/// Listing entry returned by [`ConversionRegistry::registered`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConverterInfo {
    pub type_name: String,
    pub origin: Origin,
}

struct Entry {
    type_name: &'static str,
    converter: Box<dyn Any + Send + Sync>,
}

impl Entry {
    fn new<T: 'static>(converter: Converter<T>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            converter: Box::new(converter),
        }
    }

    fn get<T: 'static>(&self) -> Option<&Converter<T>> {
        self.converter.downcast_ref::<Converter<T>>()
    }
}

/// Table of converters keyed by native type identity.
pub struct ConversionRegistry {
    phase: Phase,
    builtins: HashMap<TypeId, Entry>,
    custom: HashMap<TypeId, Entry>,
    warned_open_use: AtomicBool,
}

impl Default for ConversionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRegistry")
            .field("phase", &self.phase)
            .field("builtins", &self.builtins.len())
            .field("custom", &self.custom.len())
            .finish()
    }
}

impl ConversionRegistry {
    /// Open registry holding only the built-in converters.
    pub fn new() -> Self {
        let mut registry = Self {
            phase: Phase::Open,
            builtins: HashMap::new(),
            custom: HashMap::new(),
            warned_open_use: AtomicBool::new(false),
        };
        builtin::install(&mut registry);
        registry
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_sealed(&self) -> bool {
        self.phase == Phase::Sealed
    }

    pub(crate) fn insert_builtin<T: 'static>(&mut self, converter: Converter<T>) {
        self.builtins.insert(TypeId::of::<T>(), Entry::new(converter));
    }

    /// Register a custom converter for `T`.
    ///
    /// Fails with `RegistrySealed` after [`seal`](Self::seal), and with
    /// `DuplicateConverter` if `T` already has a custom converter and
    /// `on_conflict` is [`OnConflict::Reject`].
    pub fn register_converter<T: 'static>(
        &mut self,
        converter: Converter<T>,
        on_conflict: OnConflict,
    ) -> Result<()> {
        let type_name = std::any::type_name::<T>();
        if self.is_sealed() {
            return Err(MarshalError::registry_sealed(type_name));
        }
        let id = TypeId::of::<T>();
        if self.custom.contains_key(&id) {
            match on_conflict {
                OnConflict::Reject => return Err(MarshalError::duplicate_converter(type_name)),
                OnConflict::Overwrite => warn!("Overwriting converter for {}", type_name),
            }
        } else if self.builtins.contains_key(&id) {
            debug!("Custom converter for {} shadows the built-in", type_name);
        }
        self.custom.insert(id, Entry::new(converter));
        debug!("Registered converter for {}", type_name);
        Ok(())
    }

    /// Register `T`'s [`Convert`] impl, rejecting duplicates.
    pub fn register<T: Convert>(&mut self) -> Result<()> {
        self.register_converter(Converter::<T>::of(), OnConflict::Reject)
    }

    /// Move to [`Phase::Sealed`]. Sealing twice is a no-op.
    pub fn seal(&mut self) {
        if self.phase == Phase::Open {
            self.phase = Phase::Sealed;
            info!(
                "Sealed conversion registry ({} custom, {} built-in converters)",
                self.custom.len(),
                self.builtins.len()
            );
        }
    }

    fn lookup<T: 'static>(&self) -> Result<&Converter<T>> {
        if !self.is_sealed() && !self.warned_open_use.swap(true, Ordering::Relaxed) {
            warn!("Conversion registry used before it was sealed");
        }
        let id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();
        if let Some(converter) = self.custom.get(&id).and_then(Entry::get::<T>) {
            return Ok(converter);
        }
        if let Some(converter) = self.builtins.get(&id).and_then(Entry::get::<T>) {
            debug!("Using built-in converter for {}", type_name);
            return Ok(converter);
        }
        Err(MarshalError::no_converter(type_name))
    }

    /// Project `value` into native type `T`.
    pub fn project<T: 'static>(&self, value: &TypedValue) -> Result<T> {
        let converter = self.lookup::<T>()?;
        converter
            .project(value)
            .map_err(|e| e.with_context(format!("projecting {}", short_type_name::<T>())))
    }

    /// Lift native `value` back into a [`TypedValue`].
    pub fn lift<T: 'static>(&self, value: T) -> Result<TypedValue> {
        let converter = self.lookup::<T>()?;
        converter
            .lift(value)
            .map_err(|e| e.with_context(format!("lifting {}", short_type_name::<T>())))
    }

    /// True if a custom or built-in converter exists for `T`.
    pub fn contains<T: 'static>(&self) -> bool {
        let id = TypeId::of::<T>();
        self.custom.contains_key(&id) || self.builtins.contains_key(&id)
    }

    /// Every converter, sorted by type name then origin.
    pub fn registered(&self) -> Vec<ConverterInfo> {
        let builtins = self.builtins.values().map(|e| (e, Origin::Builtin));
        let custom = self.custom.values().map(|e| (e, Origin::Custom));
        let mut infos: Vec<ConverterInfo> = builtins
            .chain(custom)
            .map(|(entry, origin)| ConverterInfo {
                type_name: shorten(entry.type_name),
                origin,
            })
            .collect();
        infos.sort_by(|a, b| a.type_name.cmp(&b.type_name).then(a.origin.cmp(&b.origin)));
        infos
    }
}

/// `type_name` with module paths stripped, e.g. `Vec<f64>`.
pub fn short_type_name<T: ?Sized>() -> String {
    shorten(std::any::type_name::<T>())
}

fn shorten(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            out.push_str(segment.rsplit("::").next().unwrap_or(&segment));
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(segment.rsplit("::").next().unwrap_or(&segment));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Celsius(f64);

    impl Convert for Celsius {
        fn project(value: &TypedValue) -> Result<Self> {
            Ok(Celsius(value.as_f64()?))
        }

        fn lift(self) -> Result<TypedValue> {
            TypedValue::double(self.0).with_attr("class", TypedValue::string("celsius"))
        }
    }

    #[test]
    fn unregistered_type_has_no_converter() {
        let registry = ConversionRegistry::new();
        let err = registry.project::<Celsius>(&TypedValue::double(1.0)).unwrap_err();
        assert!(err.is_no_converter());
    }

    #[test]
    fn builtins_are_available_without_registration() {
        let registry = ConversionRegistry::new();
        assert!(registry.contains::<f64>());
        assert_eq!(registry.project::<f64>(&TypedValue::double(2.5)).unwrap(), 2.5);
    }

    #[test]
    fn sealed_registry_refuses_registration() {
        let mut registry = ConversionRegistry::new();
        registry.register::<Celsius>().unwrap();
        registry.seal();
        registry.seal();
        assert_eq!(registry.phase(), Phase::Sealed);
        let err = registry.register::<Celsius>().unwrap_err();
        assert_eq!(err.error_type(), "registry_sealed");
        let lifted = registry.lift(Celsius(21.0)).unwrap();
        assert!(lifted.inherits("celsius"));
        assert_eq!(registry.project::<Celsius>(&lifted).unwrap(), Celsius(21.0));
    }

    #[test]
    fn overwrite_replaces_and_reject_keeps_first() {
        let mut registry = ConversionRegistry::new();
        registry
            .register_converter(Converter::new(|_| Ok(Celsius(1.0)), Celsius::lift), OnConflict::Reject)
            .unwrap();
        let err = registry
            .register_converter(Converter::new(|_| Ok(Celsius(2.0)), Celsius::lift), OnConflict::Reject)
            .unwrap_err();
        assert!(err.is_duplicate_converter());
        let v = TypedValue::null();
        assert_eq!(registry.project::<Celsius>(&v).unwrap(), Celsius(1.0));

        registry
            .register_converter(Converter::new(|_| Ok(Celsius(3.0)), Celsius::lift), OnConflict::Overwrite)
            .unwrap();
        assert_eq!(registry.project::<Celsius>(&v).unwrap(), Celsius(3.0));
    }

    #[test]
    fn custom_converter_shadows_builtin() {
        let mut registry = ConversionRegistry::new();
        registry
            .register_converter(Converter::<i32>::new(|_| Ok(7), |x| Ok(TypedValue::integer(x))), OnConflict::Reject)
            .unwrap();
        assert_eq!(registry.project::<i32>(&TypedValue::integer(1)).unwrap(), 7);
    }

    #[test]
    fn project_errors_name_the_native_type() {
        let registry = ConversionRegistry::new();
        let err = registry.project::<Vec<i32>>(&TypedValue::string("x")).unwrap_err();
        assert_eq!(err.context(), &["projecting Vec<i32>".to_string()]);
    }

    #[test]
    fn registered_lists_both_origins_sorted() {
        let mut registry = ConversionRegistry::new();
        registry.register::<Celsius>().unwrap();
        let infos = registry.registered();
        assert!(infos.windows(2).all(|w| w[0].type_name <= w[1].type_name));
        assert!(infos
            .iter()
            .any(|i| i.type_name == "Celsius" && i.origin == Origin::Custom));
        assert!(infos
            .iter()
            .any(|i| i.type_name == "Matrix<f64>" && i.origin == Origin::Builtin));
    }

    #[test]
    fn shorten_strips_paths_inside_generics() {
        assert_eq!(shorten("alloc::vec::Vec<core::option::Option<f64>>"), "Vec<Option<f64>>");
        assert_eq!(shorten("alloc::string::String"), "String");
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConversionRegistry>();
    }
}
