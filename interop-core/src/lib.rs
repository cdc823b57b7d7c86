//! Interop Core Library
//!
//! Typed value marshaling between native Rust types and a dynamically-typed
//! host runtime. This crate holds the value model and the conversion
//! registry without any host bindings.
//!
//! # Architecture
//!
//! - `types`: the value model (TypedValue, Buffer, Record, AttributeStore, Matrix, errors)
//! - `registry`: built-in and custom converters with an Open/Sealed lifecycle
//! - `domain`: converters for sparse matrices, dates, time series, factors, data frames
//! - `config` / `init`: `interop.toml` and one-shot registry initialization
//! - `helpers`: numeric coercion and shape checks

pub mod config;
pub mod domain;
pub mod helpers;
pub mod init;
pub mod registry;
pub mod types;

// Re-export commonly used types at crate root
pub use types::{
    is_na_integer, is_na_real, AttributeStore, AttributesMut, Buffer, BufferData, ElementType,
    ErrorKind, Index, Kind, MarshalError, Matrix, Payload, Record, Result, TypedValue, CLASS, DIM,
    NAMES, NA_INTEGER, NA_REAL,
};

// Re-export the registry
pub use registry::global::{global, install, is_installed, lift_global, project_global};
pub use registry::{
    short_type_name, ConversionRegistry, Convert, Converter, ConverterInfo, OnConflict, Origin, Phase,
};

// Re-export domain types
pub use domain::{
    DataFrame, Dates, Datetimes, DomainConverter, Factor, Levels, RegularSeries, RowNames,
    SparseMatrix, XtsSeries,
};

pub use config::{Config, CONFIG_FILE_NAME};
pub use init::{init, init_global};
