use std::path::PathBuf;

/// Errors raised while reading or resolving a storage layout.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("failed to read storage layout `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse storage layout JSON")]
    Json(#[from] serde_json::Error),

    #[error("no contracts found in compiler output")]
    NoContracts,

    #[error("contract `{0}` not found in compiler output")]
    MissingContract(String),

    #[error("`{referenced_by}` references type `{type_id}` which is not declared in `types`")]
    UnknownType {
        referenced_by: String,
        type_id: String,
    },

    #[error("type `{type_id}` with encoding `{encoding}` is missing its `{field}` entry")]
    MalformedType {
        type_id: String,
        encoding: String,
        field: &'static str,
    },

    #[error("variable `{label}` has an invalid slot `{slot}`")]
    InvalidSlot { label: String, slot: String },

    #[error("type `{type_id}` has an invalid numberOfBytes `{value}`")]
    InvalidNumberOfBytes { type_id: String, value: String },

    #[error("variable `{0}` is declared more than once")]
    DuplicateVariable(String),

    #[error("variable `{label}` of {bytes} bytes at offset {offset} does not fit in one slot")]
    PackedOutOfSlot {
        label: String,
        offset: u64,
        bytes: usize,
    },
}

/// Result type alias for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
