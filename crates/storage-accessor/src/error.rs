use alloy_primitives::U256;

/// Boxed error produced by a [`StorageBackend`](crate::StorageBackend).
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by storage accessor operations.
///
/// Every variant except [`AccessorError::Backend`] is detected before the
/// backend is written to, so a failed operation never leaves a partial write.
#[derive(Debug, thiserror::Error)]
pub enum AccessorError {
    #[error("variable `{name}` not found in storage layout; available variables: {}", available.join(", "))]
    VariableNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("variable `{name}` is a {actual}, expected {expected}")]
    WrongAccessorForKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("unsupported type `{0}`")]
    UnsupportedType(String),

    #[error("unsupported mapping key type `{0}`")]
    UnsupportedKeyType(String),

    #[error("index {index} out of bounds for `{name}` of length {bound}")]
    IndexOutOfBounds {
        name: String,
        index: U256,
        bound: usize,
    },

    #[error("strings of {0} bytes do not fit the short string encoding (max 31)")]
    UnsupportedStringLength(usize),

    #[error("expected a value of type `{expected}`, got {found}")]
    TypeMismatch {
        expected: String,
        found: &'static str,
    },

    #[error("value does not fit in `{label}` ({bits} bits)")]
    ValueOutOfRange { label: String, bits: usize },

    #[error("{bytes} bytes at offset {offset} would span the slot boundary")]
    RangeOutOfSlot { offset: usize, bytes: usize },

    #[error("stored string is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("storage backend failure")]
    Backend(#[source] BackendError),
}

impl AccessorError {
    pub(crate) fn backend(err: impl Into<BackendError>) -> Self {
        Self::Backend(err.into())
    }

    /// Whether this error originated in the storage backend rather than in
    /// the layout or the supplied arguments.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

/// Result type alias for storage accessor operations.
pub type Result<T> = std::result::Result<T, AccessorError>;
