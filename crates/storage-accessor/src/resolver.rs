//! Resolution of a variable and a key path to a storage location.

use alloy_primitives::U256;
use storage_layout::{Schema, TypeId, TypeKind, Variable};
use tracing::trace;

use crate::{
    backend::slot_hex,
    codec::{self, StorageValue},
    error::{AccessorError, Result},
    storage::{dynamic_array_base, element_location, mapping_slot},
};

/// Where a value lives: its slot, and the byte range inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLocation {
    pub slot: U256,
    /// Byte offset from the least significant end of the word.
    pub offset: usize,
    /// Declared width of the value in bytes.
    pub bytes: usize,
    /// Type of the value found at this location.
    pub ty: TypeId,
}

impl SlotLocation {
    /// Whether the value owns the whole word, so it can be written without
    /// reading the slot first.
    pub const fn is_full_slot(&self) -> bool {
        self.offset == 0 && self.bytes >= 32
    }
}

pub(crate) fn lookup<'s>(schema: &'s Schema, name: &str) -> Result<&'s Variable> {
    schema
        .variable(name)
        .ok_or_else(|| AccessorError::VariableNotFound {
            name: name.to_string(),
            available: schema.labels().map(str::to_string).collect(),
        })
}

/// Walks `keys` from the declaration of `name`, consuming one key per
/// mapping level and one index per array level.
pub(crate) fn resolve(schema: &Schema, name: &str, keys: &[StorageValue]) -> Result<SlotLocation> {
    let variable = lookup(schema, name)?;

    let mut slot = variable.slot;
    let mut offset = variable.offset;
    let mut ty = variable.ty;

    for key in keys {
        let descriptor = schema.ty(ty);
        match descriptor.kind {
            TypeKind::Mapping { key: key_ty, value } => {
                let encoded = codec::encode_key(schema.ty(key_ty), key)?;
                slot = mapping_slot(encoded, slot);
                offset = 0;
                ty = value;
            }
            TypeKind::StaticArray { element, length } => {
                let index = key.as_index()?;
                if index >= U256::from(length) {
                    return Err(AccessorError::IndexOutOfBounds {
                        name: name.to_string(),
                        index,
                        bound: length,
                    });
                }
                (slot, offset) = element_location(slot, index, schema.ty(element).number_of_bytes);
                ty = element;
            }
            TypeKind::DynamicArray { element } => {
                let index = key.as_index()?;
                let base = dynamic_array_base(slot);
                (slot, offset) = element_location(base, index, schema.ty(element).number_of_bytes);
                ty = element;
            }
            TypeKind::Unsupported => {
                return Err(AccessorError::UnsupportedType(descriptor.label.clone()));
            }
            kind @ (TypeKind::Scalar(_) | TypeKind::ShortString) => {
                return Err(AccessorError::WrongAccessorForKind {
                    name: name.to_string(),
                    expected: "mapping or array",
                    actual: kind.category(),
                });
            }
        }
        trace!(
            variable = name,
            slot = %slot_hex(slot),
            offset,
            ty = %schema.ty(ty).label,
            "resolved key path step"
        );
    }

    Ok(SlotLocation {
        slot,
        offset,
        bytes: schema.ty(ty).number_of_bytes,
        ty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_layout::StorageLayout;

    fn schema() -> Schema {
        let layout = StorageLayout::from_json_str(
            r#"{
                "storage": [
                    { "label": "flags", "offset": 0, "slot": "0", "type": "t_array(t_bool)40_storage" },
                    { "label": "balances", "offset": 0, "slot": "2", "type": "t_mapping(t_address,t_uint128)" },
                    { "label": "count", "offset": 16, "slot": "3", "type": "t_uint128" }
                ],
                "types": {
                    "t_address": { "encoding": "inplace", "label": "address", "numberOfBytes": "20" },
                    "t_bool": { "encoding": "inplace", "label": "bool", "numberOfBytes": "1" },
                    "t_uint128": { "encoding": "inplace", "label": "uint128", "numberOfBytes": "16" },
                    "t_array(t_bool)40_storage": {
                        "encoding": "inplace", "label": "bool[40]", "numberOfBytes": "64", "base": "t_bool"
                    },
                    "t_mapping(t_address,t_uint128)": {
                        "encoding": "mapping", "label": "mapping(address => uint128)", "numberOfBytes": "32",
                        "key": "t_address", "value": "t_uint128"
                    }
                }
            }"#,
        )
        .unwrap();
        Schema::from_layout(&layout).unwrap()
    }

    #[test]
    fn test_plain_packed_scalar() {
        let schema = schema();
        let location = resolve(&schema, "count", &[]).unwrap();

        assert_eq!(location.slot, U256::from(3));
        assert_eq!(location.offset, 16);
        assert_eq!(location.bytes, 16);
        assert!(!location.is_full_slot());
    }

    #[test]
    fn test_static_array_crosses_slot() {
        let schema = schema();

        let location = resolve(&schema, "flags", &[31u8.into()]).unwrap();
        assert_eq!((location.slot, location.offset), (U256::ZERO, 31));

        let location = resolve(&schema, "flags", &[32u8.into()]).unwrap();
        assert_eq!((location.slot, location.offset), (U256::from(1), 0));

        let err = resolve(&schema, "flags", &[40u8.into()]).unwrap_err();
        assert!(matches!(
            err,
            AccessorError::IndexOutOfBounds { bound: 40, .. }
        ));
    }

    #[test]
    fn test_mapping_value_is_packed_at_zero() {
        let schema = schema();
        let owner = alloy_primitives::Address::repeat_byte(0x11);

        let location = resolve(&schema, "balances", &[owner.into()]).unwrap();
        assert_eq!(
            location.slot,
            mapping_slot(owner.into_word(), U256::from(2))
        );
        assert_eq!((location.offset, location.bytes), (0, 16));
    }

    #[test]
    fn test_extra_key_on_scalar() {
        let schema = schema();
        assert!(matches!(
            resolve(&schema, "count", &[1u8.into()]),
            Err(AccessorError::WrongAccessorForKind { actual: "scalar", .. })
        ));
    }

    #[test]
    fn test_unknown_variable_lists_available() {
        let schema = schema();
        let err = resolve(&schema, "missing", &[]).unwrap_err();
        let AccessorError::VariableNotFound { available, .. } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(available, &["flags", "balances", "count"]);
        assert!(err.to_string().contains("flags, balances, count"));
    }
}
