//! Reads and writes of declared variables through a [`StorageBackend`].

use alloy_primitives::{Address, B256, U256};
use storage_layout::{Schema, TypeId, TypeKind};
use tracing::{debug, instrument, warn};

use crate::{
    backend::{StorageBackend, slot_hex},
    codec::{self, StorageValue},
    config::AccessorConfig,
    error::{AccessorError, Result},
    resolver::{self, SlotLocation},
    storage::{extract_packed_value, insert_packed_value},
    summary::{self, VariableSummary},
};

/// What a mutating call wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReceipt {
    pub slot: U256,
    pub offset: usize,
    pub bytes: usize,
    /// Whether the write went through a read-modify-write of a shared word.
    pub packed: bool,
    /// Whether the value was cut down to its declared width.
    pub truncated: bool,
}

/// Typed reads and writes of named state variables of one account.
///
/// The accessor borrows the schema and owns (or mutably borrows, see the
/// `&mut B` backend impl) the backend. It keeps no other state: every read
/// hits the backend.
#[derive(Debug)]
pub struct StorageAccessor<'a, B> {
    schema: &'a Schema,
    backend: B,
    account: Address,
    config: AccessorConfig,
}

impl<'a, B: StorageBackend> StorageAccessor<'a, B> {
    pub fn new(schema: &'a Schema, backend: B, account: Address) -> Self {
        Self {
            schema,
            backend,
            account,
            config: AccessorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AccessorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn config(&self) -> &AccessorConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Resolves `name` and `keys` to a location without touching the backend.
    pub fn locate(&self, name: &str, keys: &[StorageValue]) -> Result<SlotLocation> {
        resolver::resolve(self.schema, name, keys)
    }

    /// Writes `value` to the variable `name`, following `keys` through
    /// mappings and arrays.
    ///
    /// A full-word value takes exactly one backend write. A packed value takes
    /// one read and one write, and leaves neighbouring fields untouched.
    #[instrument(skip_all, fields(account = %self.account, variable = %name), err)]
    pub fn set_variable(
        &mut self,
        name: &str,
        value: impl Into<StorageValue>,
        keys: &[StorageValue],
    ) -> Result<WriteReceipt> {
        let location = self.locate(name, keys)?;
        self.write_value(name, location, &value.into())
    }

    /// Reads the variable `name`, following `keys` through mappings and arrays.
    pub fn get_variable(&mut self, name: &str, keys: &[StorageValue]) -> Result<StorageValue> {
        let location = self.locate(name, keys)?;
        self.read_value(name, location)
    }

    /// Overwrites the stored length of the dynamic array `name`.
    ///
    /// Elements are left as they are.
    #[instrument(skip_all, fields(account = %self.account, variable = %name, %length), err)]
    pub fn set_array_length(&mut self, name: &str, length: U256) -> Result<WriteReceipt> {
        let variable = resolver::lookup(self.schema, name)?;
        let slot = variable.slot;
        self.expect_dynamic_array(name, variable.ty)?;

        self.store(slot, length.into())?;
        debug!(slot = %slot_hex(slot), "wrote array length");

        Ok(WriteReceipt {
            slot,
            offset: 0,
            bytes: 32,
            packed: false,
            truncated: false,
        })
    }

    /// Reads the stored length of the dynamic array `name`.
    pub fn get_array_length(&mut self, name: &str) -> Result<U256> {
        let variable = resolver::lookup(self.schema, name)?;
        let slot = variable.slot;
        self.expect_dynamic_array(name, variable.ty)?;

        Ok(U256::from_be_bytes(self.load(slot)?.0))
    }

    /// Writes element `index` of the static or dynamic array `name`.
    ///
    /// Indices into dynamic arrays are not checked against the stored length.
    pub fn set_array_element(
        &mut self,
        name: &str,
        index: U256,
        value: impl Into<StorageValue>,
    ) -> Result<WriteReceipt> {
        self.expect_array(name)?;
        self.set_variable(name, value, &[StorageValue::Uint(index)])
    }

    /// Reads element `index` of the static or dynamic array `name`.
    pub fn get_array_element(&mut self, name: &str, index: U256) -> Result<StorageValue> {
        self.expect_array(name)?;
        self.get_variable(name, &[StorageValue::Uint(index)])
    }

    /// Lists every declared variable in declaration order.
    pub fn list_variables(&self) -> Vec<VariableSummary> {
        summary::list_variables(self.schema)
    }

    fn write_value(
        &mut self,
        name: &str,
        location: SlotLocation,
        value: &StorageValue,
    ) -> Result<WriteReceipt> {
        let schema = self.schema;
        let descriptor = schema.ty(location.ty);
        let SlotLocation {
            slot,
            offset,
            bytes,
            ..
        } = location;

        let kind = match descriptor.kind {
            TypeKind::Scalar(kind) => kind,
            TypeKind::ShortString => {
                let StorageValue::String(text) = value else {
                    return Err(AccessorError::TypeMismatch {
                        expected: descriptor.label.clone(),
                        found: value.kind_name(),
                    });
                };
                self.store(slot, codec::encode_short_string(text)?)?;
                debug!(account = %self.account, slot = %slot_hex(slot), offset, bytes, "wrote short string");
                return Ok(WriteReceipt {
                    slot,
                    offset,
                    bytes,
                    packed: false,
                    truncated: false,
                });
            }
            other => return Err(not_a_value(name, &descriptor.label, other)),
        };

        let field = codec::encode_field(kind, &descriptor.label, value, self.config.overflow)?;
        if field.truncated {
            warn!(
                variable = name,
                ty = %descriptor.label,
                "value wider than its declared type was truncated"
            );
        }

        let packed = !location.is_full_slot();
        let word = if packed {
            let current = U256::from_be_bytes(self.load(slot)?.0);
            insert_packed_value(current, field.value, offset, bytes)?
        } else {
            field.value
        };
        self.store(slot, word.into())?;
        debug!(account = %self.account, slot = %slot_hex(slot), offset, bytes, packed, "wrote storage value");

        Ok(WriteReceipt {
            slot,
            offset,
            bytes,
            packed,
            truncated: field.truncated,
        })
    }

    fn read_value(&mut self, name: &str, location: SlotLocation) -> Result<StorageValue> {
        let schema = self.schema;
        let descriptor = schema.ty(location.ty);
        match descriptor.kind {
            TypeKind::Scalar(kind) => {
                let word = U256::from_be_bytes(self.load(location.slot)?.0);
                let field = extract_packed_value(word, location.offset, location.bytes)?;
                Ok(codec::decode_field(kind, field))
            }
            TypeKind::ShortString => {
                let word = self.load(location.slot)?;
                Ok(StorageValue::String(codec::decode_short_string(word)?))
            }
            other => Err(not_a_value(name, &descriptor.label, other)),
        }
    }

    fn expect_array(&self, name: &str) -> Result<()> {
        let variable = resolver::lookup(self.schema, name)?;
        let descriptor = self.schema.ty(variable.ty);
        match descriptor.kind {
            TypeKind::StaticArray { .. } | TypeKind::DynamicArray { .. } => Ok(()),
            other => Err(AccessorError::WrongAccessorForKind {
                name: name.to_string(),
                expected: "array",
                actual: other.category(),
            }),
        }
    }

    fn expect_dynamic_array(&self, name: &str, ty: TypeId) -> Result<()> {
        match self.schema.ty(ty).kind {
            TypeKind::DynamicArray { .. } => Ok(()),
            other => Err(AccessorError::WrongAccessorForKind {
                name: name.to_string(),
                expected: "dynamic array",
                actual: other.category(),
            }),
        }
    }

    fn load(&mut self, slot: U256) -> Result<B256> {
        self.backend
            .get_word(self.account, slot)
            .map_err(AccessorError::backend)
    }

    fn store(&mut self, slot: U256, word: B256) -> Result<()> {
        self.backend
            .set_word(self.account, slot, word)
            .map_err(AccessorError::backend)
    }
}

fn not_a_value(name: &str, label: &str, kind: TypeKind) -> AccessorError {
    match kind {
        TypeKind::Unsupported => AccessorError::UnsupportedType(label.to_string()),
        other => AccessorError::WrongAccessorForKind {
            name: name.to_string(),
            expected: "value type or string",
            actual: other.category(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HashMapStorageBackend, OverflowPolicy};
    use alloy_primitives::address;
    use storage_layout::StorageLayout;

    const ACCOUNT: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

    fn schema() -> Schema {
        let layout = StorageLayout::from_json_str(
            r#"{
                "storage": [
                    { "label": "small", "offset": 0, "slot": "0", "type": "t_uint8" },
                    { "label": "delta", "offset": 1, "slot": "0", "type": "t_int16" },
                    { "label": "total", "offset": 0, "slot": "1", "type": "t_uint256" },
                    { "label": "name", "offset": 0, "slot": "2", "type": "t_string_storage" }
                ],
                "types": {
                    "t_uint8": { "encoding": "inplace", "label": "uint8", "numberOfBytes": "1" },
                    "t_int16": { "encoding": "inplace", "label": "int16", "numberOfBytes": "2" },
                    "t_uint256": { "encoding": "inplace", "label": "uint256", "numberOfBytes": "32" },
                    "t_string_storage": { "encoding": "bytes", "label": "string", "numberOfBytes": "32" }
                }
            }"#,
        )
        .unwrap();
        Schema::from_layout(&layout).unwrap()
    }

    #[test]
    fn test_full_slot_receipt() {
        let schema = schema();
        let mut accessor = StorageAccessor::new(&schema, HashMapStorageBackend::new(), ACCOUNT);

        let receipt = accessor.set_variable("total", U256::MAX, &[]).unwrap();
        assert_eq!(
            receipt,
            WriteReceipt {
                slot: U256::from(1),
                offset: 0,
                bytes: 32,
                packed: false,
                truncated: false,
            }
        );
        assert_eq!(
            accessor.get_variable("total", &[]).unwrap(),
            StorageValue::Uint(U256::MAX)
        );
    }

    #[test]
    fn test_packed_neighbours() {
        let schema = schema();
        let mut accessor = StorageAccessor::new(&schema, HashMapStorageBackend::new(), ACCOUNT);

        accessor.set_variable("small", 0xabu8, &[]).unwrap();
        let receipt = accessor.set_variable("delta", -2i16, &[]).unwrap();
        assert!(receipt.packed);

        assert_eq!(
            accessor.backend().word(ACCOUNT, U256::ZERO),
            B256::from(U256::from(0xfffeab))
        );
        assert_eq!(
            accessor.get_variable("small", &[]).unwrap(),
            StorageValue::from(0xabu8)
        );
        assert_eq!(
            accessor.get_variable("delta", &[]).unwrap(),
            StorageValue::from(-2i16)
        );
    }

    #[test]
    fn test_truncate_policy_reports() {
        let schema = schema();
        let mut accessor = StorageAccessor::new(&schema, HashMapStorageBackend::new(), ACCOUNT)
            .with_config(AccessorConfig::default().with_overflow(OverflowPolicy::Truncate));

        let receipt = accessor.set_variable("small", 0x1234u16, &[]).unwrap();
        assert!(receipt.truncated);
        assert_eq!(
            accessor.get_variable("small", &[]).unwrap(),
            StorageValue::from(0x34u8)
        );
    }

    #[test]
    fn test_string_type_mismatch() {
        let schema = schema();
        let mut accessor = StorageAccessor::new(&schema, HashMapStorageBackend::new(), ACCOUNT);

        assert!(matches!(
            accessor.set_variable("name", 5u8, &[]),
            Err(AccessorError::TypeMismatch { found: "uint", .. })
        ));
        assert!(matches!(
            accessor.set_variable("total", "five", &[]),
            Err(AccessorError::TypeMismatch { found: "string", .. })
        ));
        assert!(accessor.backend().is_empty());
    }

    #[test]
    fn test_array_accessors_reject_scalars() {
        let schema = schema();
        let mut accessor = StorageAccessor::new(&schema, HashMapStorageBackend::new(), ACCOUNT);

        assert!(matches!(
            accessor.set_array_length("total", U256::from(1)),
            Err(AccessorError::WrongAccessorForKind { expected: "dynamic array", .. })
        ));
        assert!(matches!(
            accessor.get_array_element("total", U256::ZERO),
            Err(AccessorError::WrongAccessorForKind { expected: "array", .. })
        ));
    }
}
