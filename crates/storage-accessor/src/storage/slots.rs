use alloy_primitives::{U256, keccak256};

/// Left-pads `data` to a full word.
pub(crate) fn left_pad_to_32(data: &[u8]) -> [u8; 32] {
    let mut buf = [0u8; 32];
    buf[32 - data.len()..].copy_from_slice(data);
    buf
}

/// Compute storage slot for a mapping entry.
///
/// `key` must already be in its hashed form: a full word for value-type keys,
/// the raw bytes for `string` keys.
#[inline]
pub fn mapping_slot<K: AsRef<[u8]>>(key: K, mapping_slot: U256) -> U256 {
    let key = key.as_ref();
    let mut buf = Vec::with_capacity(key.len() + 32);
    buf.extend_from_slice(key);
    buf.extend_from_slice(&mapping_slot.to_be_bytes::<32>());
    U256::from_be_bytes(keccak256(buf).0)
}

/// Compute the slot of element 0 of a dynamic array declared at `slot`.
#[inline]
pub fn dynamic_array_base(slot: U256) -> U256 {
    U256::from_be_bytes(keccak256(slot.to_be_bytes::<32>()).0)
}

/// Compute `(slot, byte offset)` of element `index` of an array whose
/// elements are `elem_bytes` wide and start at `base`.
///
/// Elements narrower than a word pack `32 / elem_bytes` to a slot and never
/// straddle a boundary. Wider elements take `ceil(elem_bytes / 32)` slots each.
/// Slot arithmetic wraps modulo 2^256, as storage addressing does.
#[inline]
pub fn element_location(base: U256, index: U256, elem_bytes: usize) -> (U256, usize) {
    if elem_bytes >= 32 {
        let stride = U256::from(elem_bytes.div_ceil(32));
        return (base.wrapping_add(index.wrapping_mul(stride)), 0);
    }

    let per_slot = U256::from(32 / elem_bytes);
    let slot = base.wrapping_add(index / per_slot);
    // less than 32 by construction
    let position = (index % per_slot).to::<usize>();
    (slot, position * elem_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, address};

    #[test]
    fn test_mapping_slot_deterministic() {
        let key: B256 = U256::from(123).into();
        let slot1 = mapping_slot(key, U256::ZERO);
        let slot2 = mapping_slot(key, U256::ZERO);

        assert_eq!(slot1, slot2);
    }

    #[test]
    fn test_different_keys_different_slots() {
        let key1: B256 = U256::from(123).into();
        let key2: B256 = U256::from(456).into();

        assert_ne!(mapping_slot(key1, U256::ZERO), mapping_slot(key2, U256::ZERO));
    }

    #[test]
    fn test_same_key_different_base_slots() {
        let key: B256 = U256::from(1).into();

        assert_ne!(
            mapping_slot(key, U256::from(5)),
            mapping_slot(key, U256::from(6))
        );
    }

    #[test]
    fn test_mapping_slot_encoding() {
        let key = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        let base_slot = U256::from(5);

        let mut buf = [0u8; 64];
        buf[12..32].copy_from_slice(key.as_ref());
        buf[32..].copy_from_slice(&base_slot.to_be_bytes::<32>());

        let expected = U256::from_be_bytes(keccak256(buf).0);
        let computed = mapping_slot(left_pad_to_32(key.as_slice()), base_slot);

        assert_eq!(computed, expected);
    }

    #[test]
    fn test_mapping_slot_raw_string_key() {
        let mut buf = b"alice".to_vec();
        buf.extend_from_slice(&U256::from(23).to_be_bytes::<32>());

        assert_eq!(
            mapping_slot("alice", U256::from(23)),
            U256::from_be_bytes(keccak256(buf).0)
        );
    }

    #[test]
    fn test_nested_mapping_order_matters() {
        let alice = left_pad_to_32(address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").as_slice());
        let bob = left_pad_to_32(address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").as_slice());
        let base = U256::from(7);

        let alice_bob = mapping_slot(bob, mapping_slot(alice, base));
        let bob_alice = mapping_slot(alice, mapping_slot(bob, base));

        assert_ne!(alice_bob, bob_alice);
    }

    #[test]
    fn test_left_padding_correctness() {
        let addr = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        let bytes: &[u8] = addr.as_ref();
        let padded = left_pad_to_32(bytes);

        assert_eq!(&padded[..12], &[0u8; 12]);
        assert_eq!(&padded[12..], bytes);
    }

    #[test]
    fn test_dynamic_array_base() {
        let expected = U256::from_be_bytes(keccak256(U256::from(10).to_be_bytes::<32>()).0);
        assert_eq!(dynamic_array_base(U256::from(10)), expected);
    }

    #[test]
    fn test_element_location_packed() {
        let base = U256::from(14);

        // uint24: 10 per slot, 2 bytes left over
        assert_eq!(element_location(base, U256::ZERO, 3), (base, 0));
        assert_eq!(element_location(base, U256::from(6), 3), (base, 18));
        assert_eq!(element_location(base, U256::from(9), 3), (base, 27));
        assert_eq!(element_location(base, U256::from(10), 3), (base + U256::from(1), 0));

        // uint8: 32 per slot
        assert_eq!(element_location(base, U256::from(31), 1), (base, 31));
        assert_eq!(element_location(base, U256::from(32), 1), (base + U256::from(1), 0));

        // address: one per slot
        assert_eq!(element_location(base, U256::from(3), 20), (base + U256::from(3), 0));
    }

    #[test]
    fn test_element_location_multi_slot() {
        let base = U256::from(18);

        assert_eq!(element_location(base, U256::from(1), 32), (base + U256::from(1), 0));
        assert_eq!(element_location(base, U256::from(1), 64), (base + U256::from(2), 0));
        assert_eq!(element_location(base, U256::from(2), 33), (base + U256::from(4), 0));
    }

    #[test]
    fn test_element_location_wraps() {
        let base = U256::MAX;
        assert_eq!(element_location(base, U256::from(1), 32), (U256::ZERO, 0));
    }
}
