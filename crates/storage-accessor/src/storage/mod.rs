//! Slot derivation and packed-word editing.

pub mod packing;
pub mod slots;

pub use packing::{extract_packed_value, field_mask, insert_packed_value};
pub use slots::{dynamic_array_base, element_location, mapping_slot};
