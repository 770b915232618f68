//! Central error handling for b3dm decoding
//!
//! Structural and bounds errors are raised while the envelope and tables are
//! parsed, before the model decoder is ever invoked. Failures reported by the
//! model decoder are wrapped in [`B3dmError::PayloadDecodeFailed`] with the
//! original error kept as the source.

/// Result type alias for b3dm operations
pub type B3dmResult<T> = Result<T, B3dmError>;

/// Boxed error reported by a [`crate::model::ModelDecoder`]
pub type BoxedDecodeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while decoding a b3dm container
#[derive(thiserror::Error, Debug)]
pub enum B3dmError {
    #[error("format mismatch: expected magic \"b3dm\", found {found:?}")]
    FormatMismatch { found: [u8; 4] },

    #[error("length mismatch: header declares {declared} bytes, buffer holds {actual}")]
    LengthMismatch { declared: u64, actual: u64 },

    #[error("truncated buffer: {section} ends at byte {end}, only {available} available")]
    TruncatedBuffer {
        section: &'static str,
        end: u64,
        available: u64,
    },

    #[error("invalid {table}: {reason}")]
    InvalidTable { table: &'static str, reason: String },

    #[error(
        "binding '{key}' out of range: {length} bytes at offset {offset} exceed binary block of {available} bytes"
    )]
    BindingOutOfRange {
        key: String,
        offset: u64,
        length: u64,
        available: u64,
    },

    #[error("unknown component type: {0}")]
    UnknownComponentType(String),

    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("attribute '{name}' has {found} components per vertex, expected {expected}")]
    AttributeArity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("malformed mesh {mesh}: {reason}")]
    MalformedMesh { mesh: usize, reason: String },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("payload decode failed: {0}")]
    PayloadDecodeFailed(#[source] BoxedDecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl B3dmError {
    pub(crate) fn invalid_table<T: ToString>(table: &'static str, reason: T) -> Self {
        B3dmError::InvalidTable {
            table,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn payload<E>(err: E) -> Self
    where
        E: Into<BoxedDecodeError>,
    {
        B3dmError::PayloadDecodeFailed(err.into())
    }

    /// Whether the error was detected while validating the container itself,
    /// as opposed to the payload decoder or the geometry merge.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            B3dmError::FormatMismatch { .. }
                | B3dmError::LengthMismatch { .. }
                | B3dmError::TruncatedBuffer { .. }
                | B3dmError::InvalidTable { .. }
                | B3dmError::BindingOutOfRange { .. }
                | B3dmError::UnknownComponentType(_)
                | B3dmError::Json(_)
        )
    }
}
