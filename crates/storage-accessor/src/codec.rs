//! Conversion between semantic values and their storage words.
//!
//! Value types are handled as right-aligned fields ([`U256`]) so the packing
//! editor can place them at any offset. Short strings always own a full word.

use alloy_primitives::{Address, B256, FixedBytes, I256, U256};
use storage_layout::{ScalarKind, TypeDescriptor, TypeKind};

use crate::{
    config::OverflowPolicy,
    error::{AccessorError, Result},
    storage::{field_mask, slots::left_pad_to_32},
};

/// A decoded storage value, or one about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageValue {
    Uint(U256),
    Int(I256),
    Address(Address),
    Bool(bool),
    /// `bytesN`, left-aligned the way Solidity lays it out.
    FixedBytes(B256),
    String(String),
}

impl StorageValue {
    /// Left-aligns `bytes` into a [`StorageValue::FixedBytes`].
    ///
    /// Returns `None` if `bytes` is longer than a word.
    pub fn fixed_bytes(bytes: &[u8]) -> Option<Self> {
        (bytes.len() <= 32).then(|| {
            let mut word = B256::ZERO;
            word[..bytes.len()].copy_from_slice(bytes);
            Self::FixedBytes(word)
        })
    }

    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Uint(_) => "uint",
            Self::Int(_) => "int",
            Self::Address(_) => "address",
            Self::Bool(_) => "bool",
            Self::FixedBytes(_) => "fixed bytes",
            Self::String(_) => "string",
        }
    }

    /// Interprets the value as an array index.
    pub(crate) fn as_index(&self) -> Result<U256> {
        match self {
            Self::Uint(value) => Ok(*value),
            Self::Int(value) if !value.is_negative() => Ok(value.into_raw()),
            other => Err(AccessorError::TypeMismatch {
                expected: "array index".to_string(),
                found: other.kind_name(),
            }),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($uint:ty),+; $($int:ty),+) => {
        $(
            impl From<$uint> for StorageValue {
                fn from(value: $uint) -> Self {
                    Self::Uint(U256::from(value))
                }
            }
        )+
        $(
            impl From<$int> for StorageValue {
                fn from(value: $int) -> Self {
                    Self::Int(signed_from_i128(value.into()))
                }
            }
        )+
    };
}

impl_from_primitive!(u8, u16, u32, u64, u128; i8, i16, i32, i64, i128);

/// Two's complement widening of `value` to 256 bits.
fn signed_from_i128(value: i128) -> I256 {
    if value < 0 {
        I256::from_raw(!U256::from(!value as u128))
    } else {
        I256::from_raw(U256::from(value as u128))
    }
}

impl From<U256> for StorageValue {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<I256> for StorageValue {
    fn from(value: I256) -> Self {
        Self::Int(value)
    }
}

impl From<Address> for StorageValue {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<bool> for StorageValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_fixed_bytes {
    ($($n:literal),+) => {
        $(
            impl From<FixedBytes<$n>> for StorageValue {
                fn from(value: FixedBytes<$n>) -> Self {
                    let mut word = B256::ZERO;
                    word[..$n].copy_from_slice(value.as_slice());
                    Self::FixedBytes(word)
                }
            }
        )+
    };
}

// `bytes1` through `bytes32`; wider values have no storage form.
impl_from_fixed_bytes!(
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26,
    27, 28, 29, 30, 31, 32
);

impl From<String> for StorageValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for StorageValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// The right-aligned field for a value, and whether it had to be cut to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedField {
    pub value: U256,
    pub truncated: bool,
}

/// Encodes `value` as a right-aligned field of type `kind`.
///
/// Values wider than the declared type fail with
/// [`AccessorError::ValueOutOfRange`] under [`OverflowPolicy::Reject`] and
/// are masked to the declared width under [`OverflowPolicy::Truncate`].
pub fn encode_field(
    kind: ScalarKind,
    label: &str,
    value: &StorageValue,
    policy: OverflowPolicy,
) -> Result<EncodedField> {
    let mismatch = || AccessorError::TypeMismatch {
        expected: label.to_string(),
        found: value.kind_name(),
    };

    let (bits, raw, fits) = match (kind, value) {
        (ScalarKind::Uint { bits }, StorageValue::Uint(v)) => (bits, *v, fits_unsigned(*v, bits)),
        (ScalarKind::Uint { bits }, StorageValue::Int(v)) if !v.is_negative() => {
            let v = v.into_raw();
            (bits, v, fits_unsigned(v, bits))
        }
        (ScalarKind::Int { bits }, StorageValue::Int(v)) => {
            let v = v.into_raw();
            (bits, v, sign_extend(v & field_mask(bits / 8), bits) == v)
        }
        (ScalarKind::Int { bits }, StorageValue::Uint(v)) => {
            (bits, *v, fits_signed_positive(*v, bits))
        }
        (ScalarKind::Address, StorageValue::Address(a)) => {
            (160, U256::from_be_bytes(a.into_word().0), true)
        }
        (ScalarKind::Bool, StorageValue::Bool(b)) => (8, U256::from(*b as u8), true),
        (ScalarKind::FixedBytes { size }, StorageValue::FixedBytes(b)) => (
            size * 8,
            U256::from_be_slice(&b[..size]),
            b[size..].iter().all(|byte| *byte == 0),
        ),
        _ => return Err(mismatch()),
    };

    if fits {
        return Ok(EncodedField {
            value: raw & field_mask(bits / 8),
            truncated: false,
        });
    }

    match policy {
        OverflowPolicy::Reject => Err(AccessorError::ValueOutOfRange {
            label: label.to_string(),
            bits,
        }),
        OverflowPolicy::Truncate => Ok(EncodedField {
            value: raw & field_mask(bits / 8),
            truncated: true,
        }),
    }
}

/// Decodes a right-aligned field of type `kind`.
pub fn decode_field(kind: ScalarKind, field: U256) -> StorageValue {
    match kind {
        ScalarKind::Uint { .. } => StorageValue::Uint(field),
        ScalarKind::Int { bits } => StorageValue::Int(I256::from_raw(sign_extend(field, bits))),
        ScalarKind::Address => StorageValue::Address(Address::from_word(field.into())),
        ScalarKind::Bool => StorageValue::Bool(!field.is_zero()),
        ScalarKind::FixedBytes { size } => StorageValue::FixedBytes(left_align(field, size)),
    }
}

/// Moves the low `size` bytes of `field` to the front of a word.
fn left_align(field: U256, size: usize) -> B256 {
    let be = field.to_be_bytes::<32>();
    let mut word = B256::ZERO;
    word[..size].copy_from_slice(&be[32 - size..]);
    word
}

fn fits_unsigned(value: U256, bits: usize) -> bool {
    bits >= 256 || value >> bits == U256::ZERO
}

fn fits_signed_positive(value: U256, bits: usize) -> bool {
    value >> (bits - 1) == U256::ZERO
}

/// Sign-extends the low `bits` of `value` to a full word.
fn sign_extend(value: U256, bits: usize) -> U256 {
    if bits >= 256 || !value.bit(bits - 1) {
        value
    } else {
        value | !field_mask(bits / 8)
    }
}

/// Encodes a string of fewer than 32 bytes in the short in-place form: data
/// left-aligned, `len * 2` in the last byte.
pub fn encode_short_string(value: &str) -> Result<B256> {
    let bytes = value.as_bytes();
    if bytes.len() >= 32 {
        return Err(AccessorError::UnsupportedStringLength(bytes.len()));
    }

    let mut word = B256::ZERO;
    word[..bytes.len()].copy_from_slice(bytes);
    word[31] = (bytes.len() * 2) as u8;
    Ok(word)
}

/// Decodes a short in-place string.
///
/// An odd last byte marks the long form, whose data lives elsewhere; its
/// length is reported through [`AccessorError::UnsupportedStringLength`].
pub fn decode_short_string(word: B256) -> Result<String> {
    let marker = word[31];
    if marker & 1 == 1 {
        let len = (U256::from_be_bytes(word.0) - U256::from(1)) / U256::from(2);
        return Err(AccessorError::UnsupportedStringLength(len.saturating_to()));
    }

    let len = (marker / 2) as usize;
    if len > 31 {
        return Err(AccessorError::UnsupportedStringLength(len));
    }
    Ok(String::from_utf8(word[..len].to_vec())?)
}

/// A mapping key in the form it is hashed with the base slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingKey {
    /// Value-type keys, padded to a word.
    Word(B256),
    /// `string` keys, hashed unpadded.
    Raw(Vec<u8>),
}

impl AsRef<[u8]> for MappingKey {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::Word(word) => word.as_slice(),
            Self::Raw(bytes) => bytes,
        }
    }
}

/// Encodes `key` for a mapping declared with key type `key_ty`.
///
/// Integers are hashed as full 256-bit words (two's complement for signed
/// keys), addresses left-padded, `bytesN` right-padded and strings raw.
/// Keys never truncate: a key wider than its type is rejected.
pub fn encode_key(key_ty: &TypeDescriptor, key: &StorageValue) -> Result<MappingKey> {
    match key_ty.kind {
        TypeKind::Scalar(ScalarKind::Address) => match key {
            StorageValue::Address(address) => Ok(MappingKey::Word(B256::from(left_pad_to_32(
                address.as_slice(),
            )))),
            other => Err(AccessorError::TypeMismatch {
                expected: key_ty.label.clone(),
                found: other.kind_name(),
            }),
        },
        TypeKind::Scalar(ScalarKind::FixedBytes { size }) => {
            let field = encode_field(
                ScalarKind::FixedBytes { size },
                &key_ty.label,
                key,
                OverflowPolicy::Reject,
            )?;
            Ok(MappingKey::Word(left_align(field.value, size)))
        }
        TypeKind::Scalar(kind @ ScalarKind::Int { bits }) => {
            let field = encode_field(kind, &key_ty.label, key, OverflowPolicy::Reject)?;
            Ok(MappingKey::Word(sign_extend(field.value, bits).into()))
        }
        TypeKind::Scalar(kind) => {
            let field = encode_field(kind, &key_ty.label, key, OverflowPolicy::Reject)?;
            Ok(MappingKey::Word(field.value.into()))
        }
        TypeKind::ShortString => match key {
            StorageValue::String(value) => Ok(MappingKey::Raw(value.as_bytes().to_vec())),
            other => Err(AccessorError::TypeMismatch {
                expected: key_ty.label.clone(),
                found: other.kind_name(),
            }),
        },
        _ => Err(AccessorError::UnsupportedKeyType(key_ty.label.clone())),
    }
}
