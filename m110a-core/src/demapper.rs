//! Constellation tables and the soft demapper.
//!
//! The 8-PSK grid is the only physical constellation; QPSK and BPSK modes
//! ride on subsets of it so the scrambler's modulo-8 addition always lands
//! on a grid point. Soft bits are signed 8-bit values where positive means
//! logic 0, negative means logic 1 and the magnitude carries confidence.
//! That polarity must survive unchanged through the repetition combiner and
//! deinterleaver into the Viterbi branch metric.

use num_complex::Complex32;
use std::f32::consts::{FRAC_1_SQRT_2, PI};

use crate::mode::Mapping;
use crate::tracker::DataSymbol;

const PSK8_I: [f32; 8] = [
    1.0,
    FRAC_1_SQRT_2,
    0.0,
    -FRAC_1_SQRT_2,
    -1.0,
    -FRAC_1_SQRT_2,
    0.0,
    FRAC_1_SQRT_2,
];
const PSK8_Q: [f32; 8] = [
    0.0,
    FRAC_1_SQRT_2,
    1.0,
    FRAC_1_SQRT_2,
    0.0,
    -FRAC_1_SQRT_2,
    -1.0,
    -FRAC_1_SQRT_2,
];

/// Constellation point for position `p` (multiples of 45 degrees).
pub fn psk8(p: u8) -> Complex32 {
    Complex32::new(PSK8_I[p as usize & 7], PSK8_Q[p as usize & 7])
}

/// Nearest 8-PSK position by angle quantization.
pub fn nearest_psk8(z: Complex32) -> u8 {
    let pos = (z.arg() * 4.0 / PI).round() as i32;
    (pos.rem_euclid(8)) as u8
}

/// Gray map, tribit label to constellation position.
pub const GRAY_ENCODE: [u8; 8] = [0, 1, 3, 2, 7, 6, 4, 5];

/// Inverse Gray map, constellation position to tribit label.
pub const GRAY_DECODE: [u8; 8] = [0, 1, 3, 2, 6, 7, 5, 4];

/// Dibit to constellation position for the 1200 bit/s modes. The odd
/// positions keep energy on both axes so I and Q each carry one bit.
pub const QPSK_MAP: [u8; 4] = [1, 7, 3, 5];

/// Bit to constellation position for the binary modes.
pub const BPSK_MAP: [u8; 2] = [0, 4];

/// Demapper confidence scale applied to the gain-normalized magnitude.
pub const SOFT_SCALE: f32 = 40.0;

pub(crate) fn clamp_soft(value: f32) -> i8 {
    if value > 127.0 {
        127
    } else if value < -127.0 {
        -127
    } else {
        value as i8
    }
}

/// Demap one descrambled-on-the-fly data symbol into soft bits, appended to
/// `out` MSB-first within the symbol label.
///
/// `gain` is the channel amplitude estimate from the probe tracker; the
/// confidence is `|z| / gain * SOFT_SCALE` clamped to the soft-bit range.
pub fn demap_into(symbol: &DataSymbol, mapping: Mapping, gain: f32, out: &mut Vec<i8>) {
    // Undo the symbol scrambling by rotating back through the tribit
    let z = symbol.symbol * psk8(symbol.scramble).conj();
    let g = if gain > f32::EPSILON { gain } else { 1.0 };

    match mapping {
        Mapping::Psk8 => {
            let tribit = GRAY_DECODE[nearest_psk8(z) as usize];
            let confidence = clamp_soft(z.norm() / g * SOFT_SCALE);
            for mask in [4u8, 2, 1] {
                out.push(if tribit & mask != 0 {
                    -confidence
                } else {
                    confidence
                });
            }
        }
        Mapping::Qpsk => {
            out.push(clamp_soft(z.re / g * SOFT_SCALE));
            out.push(clamp_soft(z.im / g * SOFT_SCALE));
        }
        Mapping::Bpsk => {
            out.push(clamp_soft(z.re / g * SOFT_SCALE));
        }
        Mapping::Walsh => unreachable!("Walsh symbols are demodulated by the walsh module"),
    }
}

/// Sum groups of `factor` soft bits that carry the same coded bit, rescaled
/// by `1/sqrt(factor)` so repeated-noise confidence adds coherently without
/// saturating. Sign is preserved; a zero-sum group stays an erasure.
pub fn combine_repetition(soft: &[i8], factor: usize) -> Vec<i8> {
    if factor <= 1 {
        return soft.to_vec();
    }
    let scale = 1.0 / (factor as f32).sqrt();
    soft.chunks_exact(factor)
        .map(|group| {
            let sum: i32 = group.iter().map(|&s| s as i32).sum();
            clamp_soft(sum as f32 * scale)
        })
        .collect()
}
