//! Core value types.

mod attributes;
mod buffer;
mod error;
mod matrix;
pub mod na;
mod record;
mod value;

pub use attributes::{AttributeStore, AttributesMut, CLASS, DIM, NAMES};
pub use buffer::{Buffer, BufferData, ElementType};
pub use error::{ErrorKind, Index, MarshalError, Result};
pub use matrix::Matrix;
pub use na::{is_na_integer, is_na_real, NA_INTEGER, NA_REAL};
pub use record::Record;
pub use value::{Kind, Payload, TypedValue};

pub(crate) use value::string_list;
