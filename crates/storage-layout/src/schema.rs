//! Typed view over a [`StorageLayout`].
//!
//! Every type label is parsed exactly once, when the schema is built, into a
//! [`TypeKind`]. Slot arithmetic and value encoding dispatch on that tag and
//! never look at label strings again.

use std::{collections::HashMap, fmt};

use alloy_primitives::U256;
use indexmap::IndexMap;
use tracing::debug;

use crate::{
    error::{LayoutError, Result},
    raw::{StorageLayout, TypeDefinition},
};

/// Index of a [`TypeDescriptor`] inside its [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

/// Storage encoding reported by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Inplace,
    Mapping,
    DynamicArray,
    Bytes,
}

impl Encoding {
    fn parse(type_id: &str, encoding: &str) -> Result<Self> {
        match encoding {
            "inplace" => Ok(Self::Inplace),
            "mapping" => Ok(Self::Mapping),
            "dynamic_array" => Ok(Self::DynamicArray),
            "bytes" => Ok(Self::Bytes),
            _ => Err(LayoutError::MalformedType {
                type_id: type_id.to_string(),
                encoding: encoding.to_string(),
                field: "encoding",
            }),
        }
    }
}

/// Category of a single-word value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// `uintN`, and enums (which the compiler stores as the smallest fitting uint).
    Uint { bits: usize },
    /// `intN`, two's complement.
    Int { bits: usize },
    /// `address`, `address payable` and contract types.
    Address,
    Bool,
    /// `bytesN` with `1 <= N <= 32`.
    FixedBytes { size: usize },
}

impl ScalarKind {
    /// Parses an elementary type label. Returns `None` for anything else.
    pub fn parse(label: &str, number_of_bytes: usize) -> Option<Self> {
        match label {
            "bool" => return Some(Self::Bool),
            "address" | "address payable" => return Some(Self::Address),
            _ => {}
        }
        if label.starts_with("contract ") {
            return Some(Self::Address);
        }
        if label.starts_with("enum ") {
            return Some(Self::Uint {
                bits: number_of_bytes * 8,
            });
        }
        if let Some(bits) = label.strip_prefix("uint") {
            return parse_int_bits(bits).map(|bits| Self::Uint { bits });
        }
        if let Some(bits) = label.strip_prefix("int") {
            return parse_int_bits(bits).map(|bits| Self::Int { bits });
        }
        if let Some(size) = label.strip_prefix("bytes") {
            return size
                .parse::<usize>()
                .ok()
                .filter(|size| (1..=32).contains(size))
                .map(|size| Self::FixedBytes { size });
        }
        None
    }
}

fn parse_int_bits(bits: &str) -> Option<usize> {
    if bits.is_empty() {
        return Some(256);
    }
    bits.parse::<usize>()
        .ok()
        .filter(|bits| *bits > 0 && *bits <= 256 && bits % 8 == 0)
}

/// Resolved shape of a storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A value that fits in one word, possibly packed with neighbours.
    Scalar(ScalarKind),
    /// `string` stored with the short (< 32 bytes) in-place encoding.
    ShortString,
    /// `T[N]`, elements stored from the variable's own slot.
    StaticArray { element: TypeId, length: usize },
    /// `T[]`, length at the variable's slot, elements at `keccak256(slot)`.
    DynamicArray { element: TypeId },
    /// `mapping(K => V)`, entries at `keccak256(key . slot)`.
    Mapping { key: TypeId, value: TypeId },
    /// Structs, `bytes`, function types and anything else the accessor does not handle.
    Unsupported,
}

impl TypeKind {
    /// Short human readable category, used in diagnostics.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::ShortString => "string",
            Self::StaticArray { .. } => "static array",
            Self::DynamicArray { .. } => "dynamic array",
            Self::Mapping { .. } => "mapping",
            Self::Unsupported => "unsupported type",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category())
    }
}

/// A type descriptor with its references already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Compiler identifier, e.g. `t_array(t_uint24)7_storage`.
    pub id: String,
    /// Human-readable label, e.g. `uint24[7]`.
    pub label: String,
    pub encoding: Encoding,
    pub number_of_bytes: usize,
    pub kind: TypeKind,
}

/// A state variable declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub label: String,
    pub contract: String,
    pub ty: TypeId,
    pub slot: U256,
    pub offset: usize,
}

/// Immutable lookup structure over a contract's storage layout.
#[derive(Debug, Clone)]
pub struct Schema {
    variables: IndexMap<String, Variable>,
    types: Vec<TypeDescriptor>,
}

impl Schema {
    /// Validates `layout` and resolves every type it declares.
    pub fn from_layout(layout: &StorageLayout) -> Result<Self> {
        let ids: HashMap<&str, TypeId> = layout
            .types
            .keys()
            .enumerate()
            .map(|(index, id)| (id.as_str(), TypeId(index)))
            .collect();

        let lookup = |referenced_by: &str, type_id: &str| -> Result<TypeId> {
            ids.get(type_id)
                .copied()
                .ok_or_else(|| LayoutError::UnknownType {
                    referenced_by: referenced_by.to_string(),
                    type_id: type_id.to_string(),
                })
        };

        let mut types = Vec::with_capacity(layout.types.len());
        for (id, definition) in &layout.types {
            types.push(resolve_type(id, definition, &lookup)?);
        }

        let mut variables = IndexMap::with_capacity(layout.storage.len());
        for raw in &layout.storage {
            let ty = lookup(&raw.label, &raw.ty)?;
            let slot = U256::from_str_radix(&raw.slot, 10).map_err(|_| LayoutError::InvalidSlot {
                label: raw.label.clone(),
                slot: raw.slot.clone(),
            })?;

            let descriptor = &types[ty.0];
            let room = 32 - descriptor.number_of_bytes.min(32);
            let offset = usize::try_from(raw.offset)
                .ok()
                .filter(|offset| *offset <= room)
                .ok_or_else(|| LayoutError::PackedOutOfSlot {
                    label: raw.label.clone(),
                    offset: raw.offset,
                    bytes: descriptor.number_of_bytes,
                })?;

            let variable = Variable {
                label: raw.label.clone(),
                contract: raw.contract.clone(),
                ty,
                slot,
                offset,
            };
            if variables.insert(raw.label.clone(), variable).is_some() {
                return Err(LayoutError::DuplicateVariable(raw.label.clone()));
            }
        }

        debug!(
            variables = variables.len(),
            types = types.len(),
            "resolved storage layout"
        );

        Ok(Self { variables, types })
    }

    /// Looks a variable up by its label.
    pub fn variable(&self, label: &str) -> Option<&Variable> {
        self.variables.get(label)
    }

    /// Iterates variables in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Labels of all declared variables, in declaration order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Returns the descriptor for `id`.
    ///
    /// `id` must come from this schema, either from one of its variables or
    /// from a descriptor it returned. An id taken from another schema may
    /// resolve to an unrelated descriptor or panic.
    pub fn ty(&self, id: TypeId) -> &TypeDescriptor {
        &self.types[id.0]
    }

    /// Looks a descriptor up by its compiler identifier.
    pub fn type_by_id(&self, id: &str) -> Option<&TypeDescriptor> {
        self.types.iter().find(|ty| ty.id == id)
    }
}

impl TryFrom<&StorageLayout> for Schema {
    type Error = LayoutError;

    fn try_from(layout: &StorageLayout) -> Result<Self> {
        Self::from_layout(layout)
    }
}

fn resolve_type(
    id: &str,
    definition: &TypeDefinition,
    lookup: &impl Fn(&str, &str) -> Result<TypeId>,
) -> Result<TypeDescriptor> {
    let encoding = Encoding::parse(id, &definition.encoding)?;
    let number_of_bytes = definition
        .number_of_bytes
        .parse::<usize>()
        .ok()
        .filter(|bytes| *bytes > 0)
        .ok_or_else(|| LayoutError::InvalidNumberOfBytes {
            type_id: id.to_string(),
            value: definition.number_of_bytes.clone(),
        })?;

    let required = |field: &'static str, value: &Option<String>| -> Result<TypeId> {
        let type_id = value.as_deref().ok_or_else(|| LayoutError::MalformedType {
            type_id: id.to_string(),
            encoding: definition.encoding.clone(),
            field,
        })?;
        lookup(id, type_id)
    };

    let label = definition.label.as_str();
    let kind = match encoding {
        Encoding::Mapping => TypeKind::Mapping {
            key: required("key", &definition.key)?,
            value: required("value", &definition.value)?,
        },
        Encoding::DynamicArray => TypeKind::DynamicArray {
            element: required("base", &definition.base)?,
        },
        Encoding::Bytes if label == "string" => TypeKind::ShortString,
        Encoding::Bytes => TypeKind::Unsupported,
        Encoding::Inplace => match static_array_length(label) {
            Some(length) => TypeKind::StaticArray {
                element: required("base", &definition.base)?,
                length,
            },
            None => ScalarKind::parse(label, number_of_bytes)
                .filter(|_| number_of_bytes <= 32)
                .map_or(TypeKind::Unsupported, TypeKind::Scalar),
        },
    };

    Ok(TypeDescriptor {
        id: id.to_string(),
        label: definition.label.clone(),
        encoding,
        number_of_bytes,
        kind,
    })
}

/// Extracts `N` from the outermost dimension of a `T[N]` label.
fn static_array_length(label: &str) -> Option<usize> {
    let inner = label.strip_suffix(']')?;
    let (_, length) = inner.rsplit_once('[')?;
    length.parse().ok()
}
