//! Small big-endian helpers shared by the frame decoder and encoder.
//!
//! The extended payload-length fields defined by RFC 6455 §5.2 are plain
//! big-endian integers; factoring the conversions out here keeps
//! `decoder.rs` and `write.rs` free of repeated `from_be_bytes`/`to_be_bytes`
//! boilerplate.

/// Reads a big-endian `u16` from the first two bytes of `buf`.
///
/// Panics if `buf` has fewer than 2 bytes; callers are expected to have
/// already checked the buffer has enough bytes buffered.
pub fn read_u16_be(buf: &[u8]) -> u16 {
    u16::from_be_bytes([buf[0], buf[1]])
}

/// Reads a big-endian `u64` from the first eight bytes of `buf`.
pub fn read_u64_be(buf: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[..8]);
    u64::from_be_bytes(bytes)
}

/// Encodes `len` as the two-byte extended payload length used when the
/// 7-bit length field is 126.
pub fn write_u16_be(len: u16) -> [u8; 2] {
    len.to_be_bytes()
}

/// Encodes `len` as the eight-byte extended payload length used when the
/// 7-bit length field is 127.
pub fn write_u64_be(len: u64) -> [u8; 8] {
    len.to_be_bytes()
}

/// XORs `payload` in place against the repeating 4-byte masking key, per
/// RFC 6455 §5.3. Used both to mask outgoing client frames and to unmask
/// incoming server frames (the operation is its own inverse).
pub fn apply_mask(payload: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn be_round_trips() {
        assert_eq!(read_u16_be(&write_u16_be(4000)), 4000);
        assert_eq!(read_u64_be(&write_u64_be(70_000)), 70_000);
    }

    #[test]
    fn mask_is_its_own_inverse() {
        let mask = [0x12, 0x34, 0x56, 0x78];
        let original = vec![1u8, 2, 3, 4, 5, 6, 7];
        let mut payload = original.clone();
        apply_mask(&mut payload, mask);
        assert_ne!(payload, original);
        apply_mask(&mut payload, mask);
        assert_eq!(payload, original);
    }
}
