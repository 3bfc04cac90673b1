//! The word-level storage seam.
//!
//! The accessor never caches: every read goes to the backend and every write
//! is expected to be visible to the next read.

use std::{collections::HashMap, convert::Infallible};

use alloy_primitives::{Address, B256, U256};

/// Raw word-addressable account storage.
pub trait StorageBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the word stored at `slot` of `account`. Unset slots read as zero.
    fn get_word(&mut self, account: Address, slot: U256) -> Result<B256, Self::Error>;

    /// Overwrites the word stored at `slot` of `account`.
    fn set_word(&mut self, account: Address, slot: U256, word: B256) -> Result<(), Self::Error>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for &mut B {
    type Error = B::Error;

    fn get_word(&mut self, account: Address, slot: U256) -> Result<B256, Self::Error> {
        (**self).get_word(account, slot)
    }

    fn set_word(&mut self, account: Address, slot: U256, word: B256) -> Result<(), Self::Error> {
        (**self).set_word(account, slot, word)
    }
}

/// In-memory backend keyed by `(account, slot)`.
#[derive(Debug, Clone, Default)]
pub struct HashMapStorageBackend {
    words: HashMap<(Address, U256), B256>,
}

impl HashMapStorageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored word without going through the trait.
    pub fn word(&self, account: Address, slot: U256) -> B256 {
        self.words
            .get(&(account, slot))
            .copied()
            .unwrap_or_default()
    }

    /// Number of slots that were ever written.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl StorageBackend for HashMapStorageBackend {
    type Error = Infallible;

    fn get_word(&mut self, account: Address, slot: U256) -> Result<B256, Self::Error> {
        Ok(self.word(account, slot))
    }

    fn set_word(&mut self, account: Address, slot: U256, word: B256) -> Result<(), Self::Error> {
        self.words.insert((account, slot), word);
        Ok(())
    }
}

/// Formats `slot` as minimal big-endian hex: no leading zeros, `0x0` for zero.
///
/// Node test RPCs such as `hardhat_setStorageAt` reject zero-padded slot keys.
pub fn slot_hex(slot: U256) -> String {
    let encoded = const_hex::encode(slot.to_be_bytes::<32>());
    match encoded.trim_start_matches('0') {
        "" => "0x0".to_string(),
        digits => format!("0x{digits}"),
    }
}

/// Builds the `[account, slot, word]` parameter array of a `*_setStorageAt`
/// JSON-RPC request.
pub fn set_storage_at_params(account: Address, slot: U256, word: B256) -> serde_json::Value {
    serde_json::json!([
        account.to_string(),
        slot_hex(slot),
        const_hex::encode_prefixed(word)
    ])
}
