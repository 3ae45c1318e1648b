//! Bitstream helpers.
//!
//! Payload bytes travel least-significant-bit first. The demapper side of
//! the chain deals in signed soft bits, so the hard-decision helper applies
//! the positive-means-zero polarity.

/// Expand bytes to bits, LSB first within each byte.
pub fn bytes_to_bits_lsb(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).map(move |bit| (byte >> bit) & 1))
        .collect()
}

/// Pack bits back to bytes, LSB first. A trailing partial byte is dropped.
pub fn bits_to_bytes_lsb(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | ((bit & 1) << i))
        })
        .collect()
}

/// Hard decisions from soft bits: negative means logic 1.
pub fn hard_bits(soft: &[i8]) -> Vec<u8> {
    soft.iter().map(|&s| (s < 0) as u8).collect()
}

/// Widen hard bits into the soft-bit domain for the interleaver.
pub fn bits_to_i8(bits: &[u8]) -> Vec<i8> {
    bits.iter().map(|&b| (b & 1) as i8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_bit_round_trip() {
        let bytes = b"M110A".to_vec();
        let bits = bytes_to_bits_lsb(&bytes);
        assert_eq!(bits.len(), bytes.len() * 8);
        assert_eq!(bits_to_bytes_lsb(&bits), bytes);
    }

    #[test]
    fn lsb_comes_first() {
        assert_eq!(bytes_to_bits_lsb(&[0x01]), vec![1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(bytes_to_bits_lsb(&[0x80]), vec![0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn partial_byte_is_dropped() {
        let bits = vec![1u8; 11];
        assert_eq!(bits_to_bytes_lsb(&bits), vec![0xFF]);
    }

    #[test]
    fn hard_decision_polarity() {
        assert_eq!(hard_bits(&[64, -64, 0, -1]), vec![0, 1, 0, 1]);
    }
}
