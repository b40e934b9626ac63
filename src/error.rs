//! Defines [`LayerError`], representing all errors returned by this crate.

use arrow_schema::ArrowError;
use std::borrow::Cow;
use std::fmt::Debug;
use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LayerError {
    /// The geometry type is unrecognized, not allowed for the layer, mixed, or the input is empty.
    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    /// An array-valued column does not have one value per row of the table.
    #[error("Accessor {field} must have same length as table: expected {expected}, got {actual}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// One or more accessor names are not declared for the layer kind.
    #[error("Unexpected accessor names: {}", .0.join(", "))]
    UnknownField(Vec<String>),

    /// A numeric accessor value falls outside its declared domain.
    #[error("Invalid value for {field}: {reason}")]
    InvalidRange { field: String, reason: String },

    /// Incorrect type was passed to an operation.
    #[error("Incorrect type passed to operation: {0}")]
    IncorrectType(Cow<'static, str>),

    /// Coordinates could not be transformed to longitude/latitude.
    #[error("Reprojection failed: {0}")]
    Reprojection(String),

    /// Whenever pushing to a container fails because it does not support more entries.
    ///
    /// The solution is usually to use a higher-capacity container-backing type.
    #[error("Overflow")]
    Overflow,

    /// General error.
    #[error("General error: {0}")]
    General(String),

    /// [ArrowError]
    #[error(transparent)]
    Arrow(#[from] ArrowError),

    /// [proj::ProjError]
    #[cfg(feature = "proj")]
    #[error(transparent)]
    ProjError(#[from] proj::ProjError),

    /// [serde_json::Error]
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, LayerError>;

impl From<LayerError> for ArrowError {
    fn from(err: LayerError) -> Self {
        match err {
            LayerError::Arrow(err) => err,
            _ => ArrowError::ExternalError(Box::new(err)),
        }
    }
}
