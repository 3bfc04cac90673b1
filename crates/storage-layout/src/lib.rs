//! Solidity storage layouts.
//!
//! [`StorageLayout`] mirrors the JSON the compiler emits for
//! `storage-layout` output. [`Schema`] is the validated, typed form that the
//! accessor works against: every type reference is resolved and every type
//! label is parsed into a [`TypeKind`] once, up front.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub use error::{LayoutError, Result};

mod raw;
pub use raw::{StorageLayout, StorageVariable, TypeDefinition};

mod schema;
pub use schema::{Encoding, ScalarKind, Schema, TypeDescriptor, TypeId, TypeKind, Variable};
