//! Byte encoding bridging token IDs and the automaton.
//!
//! The automaton matches over bytes, so both patterns and the query stream
//! encode each token as its u32 ID in little-endian followed by the u32
//! separator ID. Every token therefore occupies a fixed 8-byte slot, which
//! makes byte offsets convertible back to token indices by division. The
//! trailing separator keeps a pattern from ending mid-token: `[12]` can
//! never match inside the encoding of `[1234]`.

/// Bytes per token slot: 4 for the token ID, 4 for the separator.
pub const TOKEN_STRIDE: usize = 8;

/// Encode a token-ID sequence into automaton bytes. Used for both pattern
/// construction at build time and the haystack at match time.
pub fn encode_ids(ids: &[u32], separator_id: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(ids.len() * TOKEN_STRIDE);
    for &id in ids {
        bytes.extend_from_slice(&id.to_le_bytes());
        bytes.extend_from_slice(&separator_id.to_le_bytes());
    }
    bytes
}

/// Token index of the slot containing a match's starting byte.
#[inline]
pub fn token_start(byte_offset: usize) -> usize {
    byte_offset / TOKEN_STRIDE
}

/// Token index one past the slot containing a match's final byte.
#[inline]
pub fn token_end(byte_offset: usize) -> usize {
    (byte_offset + TOKEN_STRIDE - 1) / TOKEN_STRIDE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let bytes = encode_ids(&[1, 2], 4294967294);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &4294967294u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2u32.to_le_bytes());
    }

    #[test]
    fn test_offset_conversion() {
        // A two-token pattern matched at the start of the stream spans
        // bytes [0, 16) which is tokens [0, 2).
        assert_eq!(token_start(0), 0);
        assert_eq!(token_end(16), 2);

        // The same pattern one slot later: bytes [8, 24) -> tokens [1, 3).
        assert_eq!(token_start(8), 1);
        assert_eq!(token_end(24), 3);
    }

    #[test]
    fn test_empty() {
        assert!(encode_ids(&[], 4294967294).is_empty());
    }
}
