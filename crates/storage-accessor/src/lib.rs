//! Typed access to contract state through raw storage words.
//!
//! A [`StorageAccessor`] combines a [`Schema`](storage_layout::Schema), a
//! [`StorageBackend`] and an account address. It resolves a variable name and
//! an optional path of mapping keys and array indices to a slot and byte range,
//! then reads or writes the value there without disturbing other values
//! packed into the same word.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub use error::{AccessorError, BackendError, Result};

pub mod config;
pub use config::{AccessorConfig, ConfigError, OverflowPolicy};

pub mod backend;
pub use backend::{HashMapStorageBackend, StorageBackend, set_storage_at_params, slot_hex};

pub mod codec;
pub use codec::{MappingKey, StorageValue};

pub mod storage;

mod resolver;
pub use resolver::SlotLocation;

mod summary;
pub use summary::{VariableSummary, VariableTable, list_variables};

mod accessor;
pub use accessor::{StorageAccessor, WriteReceipt};
