//! Marshaling error types.
//!
//! Every failure in this crate is a local, recoverable value. [`ErrorKind`]
//! carries the stable classification, exposed through `error_type()` for host
//! condition classes. [`MarshalError`] is built on `exn` and raises a context
//! frame for each native type, field or attribute being processed when the
//! failure happened.

use std::fmt;

use crate::helpers::coerce::CoerceError;

/// Position that was requested from a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
    /// 0-based element position.
    Position(usize),
    /// Field name in a record.
    Name(String),
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Position(i) => write!(f, "{}", i),
            Index::Name(name) => write!(f, "`{}`", name),
        }
    }
}

/// Error kind enum for marshaling operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    /// The value's kind cannot be read as the requested native shape.
    #[error("type mismatch: expected {expected}, found {found}{}", key_suffix(.key))]
    TypeMismatch {
        expected: String,
        found: String,
        key: Option<String>,
    },
    /// Lengths or `dim` disagree.
    #[error("shape mismatch: {message}{}", key_suffix(.key))]
    ShapeMismatch {
        message: String,
        key: Option<String>,
    },
    /// Element position or field name is not present.
    #[error("index {index} out of range (length {len})")]
    IndexOutOfRange { index: Index, len: usize },
    /// No custom or built-in converter exists for the native type.
    #[error("no converter registered for {type_name}")]
    NoConverter { type_name: &'static str },
    /// A converter for the native type is already registered.
    #[error("converter already registered for {type_name}")]
    DuplicateConverter { type_name: &'static str },
    /// Registration was attempted after the registry was sealed.
    #[error("registry is sealed, cannot register converter for {type_name}")]
    RegistrySealed { type_name: &'static str },
    /// A process-wide registry has already been installed.
    #[error("a process-wide registry is already installed")]
    RegistryInstalled,
    /// No process-wide registry has been installed yet.
    #[error("no process-wide registry installed - call init_global first")]
    RegistryNotInstalled,
    /// In-place mutation of a buffer that another owner still observes.
    #[error("buffer is shared with another owner - clone or make_unique before mutating")]
    Aliased,
    /// NA reached a native target that cannot represent it.
    #[error("unexpected NA in {context}")]
    NaValue { context: String },
    /// A structural attribute required by a converter is absent.
    #[error("missing attribute `{key}` required by {expected}")]
    MissingAttribute { key: String, expected: String },
    /// A record was built with the same field name twice.
    #[error("duplicate field name `{name}`")]
    DuplicateField { name: String },
    /// Syntactically valid but semantically invalid data.
    #[error("invalid value: {message}")]
    InvalidValue { message: String },
    /// Configuration error.
    #[error("config error: {message}")]
    Config { message: String },
    /// TOML parsing error.
    #[error("toml error: {message}")]
    Toml { message: String },
    /// JSON parsing error.
    #[error("json error: {message}")]
    Json { message: String },
    /// I/O error.
    #[error("io error: {message}")]
    Io { message: String },
}

fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(key) => format!(" (key `{}`)", key),
        None => String::new(),
    }
}

impl ErrorKind {
    /// Get the error type as a stable string for host condition classes.
    ///
    /// These strings must not change once published.
    pub fn error_type(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch { .. } => "type_mismatch",
            ErrorKind::ShapeMismatch { .. } => "shape_mismatch",
            ErrorKind::IndexOutOfRange { .. } => "index_out_of_range",
            ErrorKind::NoConverter { .. } => "no_converter",
            ErrorKind::DuplicateConverter { .. } => "duplicate_converter",
            ErrorKind::RegistrySealed { .. } => "registry_sealed",
            ErrorKind::RegistryInstalled => "registry_installed",
            ErrorKind::RegistryNotInstalled => "registry_not_installed",
            ErrorKind::Aliased => "aliased",
            ErrorKind::NaValue { .. } => "na_value",
            ErrorKind::MissingAttribute { .. } => "missing_attribute",
            ErrorKind::DuplicateField { .. } => "duplicate_field",
            ErrorKind::InvalidValue { .. } => "invalid_value",
            ErrorKind::Config { .. } => "config_error",
            ErrorKind::Toml { .. } => "toml_error",
            ErrorKind::Json { .. } => "json_error",
            ErrorKind::Io { .. } => "io_error",
        }
    }
}

/// One layer of a failure: the kind plus the context chain known at that layer.
#[derive(Debug)]
struct Frame {
    kind: ErrorKind,
    context: Vec<String>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Frame {}

/// Main error type for marshaling operations.
///
/// This wraps `exn::Exn` so every context frame is raised over the failure
/// it describes, while the stable [`ErrorKind`] stays readable at the top.
#[derive(Debug)]
pub struct MarshalError(exn::Exn<Frame>);

/// Result alias used throughout the crate.
pub type Result<T, E = MarshalError> = std::result::Result<T, E>;

impl MarshalError {
    /// Create a new error from an error kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self(exn::Exn::new(Frame {
            kind,
            context: Vec::new(),
        }))
    }

    fn frame(&self) -> &Frame {
        self.0.as_error()
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ErrorKind {
        &self.frame().kind
    }

    /// Get the error type as a string.
    pub fn error_type(&self) -> &'static str {
        self.kind().error_type()
    }

    /// Context frames, outermost first.
    pub fn context(&self) -> &[String] {
        &self.frame().context
    }

    /// Raise a context frame over this error.
    ///
    /// Produces: `"context: inner context: message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        let inner = self.frame();
        let mut context = Vec::with_capacity(inner.context.len() + 1);
        context.push(ctx.to_string());
        context.extend(inner.context.iter().cloned());
        let frame = Frame {
            kind: inner.kind.clone(),
            context,
        };
        Self(self.0.raise(frame))
    }

    // Convenience constructors

    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            key: None,
        })
    }

    /// Type mismatch on a specific attribute or field key.
    pub fn type_mismatch_at(
        key: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            key: Some(key.into()),
        })
    }

    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ShapeMismatch {
            message: message.into(),
            key: None,
        })
    }

    pub fn shape_mismatch_at(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ShapeMismatch {
            message: message.into(),
            key: Some(key.into()),
        })
    }

    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::new(ErrorKind::IndexOutOfRange {
            index: Index::Position(index),
            len,
        })
    }

    pub fn missing_name(name: impl Into<String>, len: usize) -> Self {
        Self::new(ErrorKind::IndexOutOfRange {
            index: Index::Name(name.into()),
            len,
        })
    }

    pub fn no_converter(type_name: &'static str) -> Self {
        Self::new(ErrorKind::NoConverter { type_name })
    }

    pub fn duplicate_converter(type_name: &'static str) -> Self {
        Self::new(ErrorKind::DuplicateConverter { type_name })
    }

    pub fn registry_sealed(type_name: &'static str) -> Self {
        Self::new(ErrorKind::RegistrySealed { type_name })
    }

    pub fn aliased() -> Self {
        Self::new(ErrorKind::Aliased)
    }

    pub fn na_value(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::NaValue {
            context: context.into(),
        })
    }

    pub fn missing_attribute(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingAttribute {
            key: key.into(),
            expected: expected.into(),
        })
    }

    pub fn duplicate_field(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateField { name: name.into() })
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidValue {
            message: message.into(),
        })
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config {
            message: message.into(),
        })
    }

    // Kind checks

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self.kind(), ErrorKind::TypeMismatch { .. })
    }

    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self.kind(), ErrorKind::ShapeMismatch { .. })
    }

    pub fn is_index_out_of_range(&self) -> bool {
        matches!(self.kind(), ErrorKind::IndexOutOfRange { .. })
    }

    pub fn is_no_converter(&self) -> bool {
        matches!(self.kind(), ErrorKind::NoConverter { .. })
    }

    pub fn is_duplicate_converter(&self) -> bool {
        matches!(self.kind(), ErrorKind::DuplicateConverter { .. })
    }
}

impl From<ErrorKind> for MarshalError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MarshalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.kind())
    }
}

// Conversion from common error types

impl From<std::io::Error> for MarshalError {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::Io {
            message: e.to_string(),
        })
    }
}

impl From<toml::de::Error> for MarshalError {
    fn from(e: toml::de::Error) -> Self {
        Self::new(ErrorKind::Toml {
            message: e.to_string(),
        })
    }
}

impl From<toml::ser::Error> for MarshalError {
    fn from(e: toml::ser::Error) -> Self {
        Self::new(ErrorKind::Toml {
            message: e.to_string(),
        })
    }
}

impl From<serde_json::Error> for MarshalError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorKind::Json {
            message: e.to_string(),
        })
    }
}

impl From<CoerceError> for MarshalError {
    fn from(e: CoerceError) -> Self {
        Self::invalid_value(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context_chain_and_key() {
        let err = MarshalError::type_mismatch_at("col_ptr", "opaque<integer>", "opaque<double>")
            .with_context("field `col_ptr`")
            .with_context("projecting SparseMatrix");
        assert_eq!(
            err.to_string(),
            "projecting SparseMatrix: field `col_ptr`: type mismatch: expected opaque<integer>, \
             found opaque<double> (key `col_ptr`)"
        );
        assert_eq!(err.context().len(), 2);
    }

    #[test]
    fn raised_frames_keep_the_root_kind() {
        let err = MarshalError::aliased()
            .with_context("element 0")
            .with_context("projecting Vec<f64>");
        assert_eq!(err.kind(), &ErrorKind::Aliased);
        assert_eq!(err.error_type(), "aliased");
        assert_eq!(
            err.context(),
            &["projecting Vec<f64>".to_string(), "element 0".to_string()]
        );
        assert!(format!("{err:?}").contains("element 0"));
    }

    #[test]
    fn error_type_strings_are_stable() {
        assert_eq!(MarshalError::shape_mismatch("x").error_type(), "shape_mismatch");
        assert_eq!(MarshalError::no_converter("u16").error_type(), "no_converter");
        assert_eq!(MarshalError::aliased().error_type(), "aliased");
        assert_eq!(
            MarshalError::missing_name("a", 0).error_type(),
            "index_out_of_range"
        );
    }

    #[test]
    fn index_out_of_range_reports_name() {
        let err = MarshalError::missing_name("values", 2);
        assert_eq!(err.to_string(), "index `values` out of range (length 2)");
        assert!(err.is_index_out_of_range());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MarshalError = io.into();
        assert_eq!(err.error_type(), "io_error");
    }
}
