//! Static catalogue of the serial tone operating modes.
//!
//! Every mode runs at 2400 Bd; the user rate changes through the
//! constellation, the repetition factor and, at 75 bit/s, the Walsh
//! orthogonal coding. The transmitter advertises the mode through the
//! (D1, D2) indicator pair embedded in the preamble, and the receiver
//! resolves the pair through the same table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol-to-bits mapping family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mapping {
    /// 32-symbol orthogonal sequences, two bits per sequence
    Walsh,
    /// One bit per symbol on positions {0, 4}
    Bpsk,
    /// Two bits per symbol on positions {1, 3, 5, 7}
    Qpsk,
    /// Three Gray-coded bits per symbol
    Psk8,
}

impl Mapping {
    /// Payload bits carried by one channel symbol. Not defined for the
    /// Walsh family, which works in 32-symbol blocks.
    pub fn bits_per_symbol(self) -> usize {
        match self {
            Mapping::Bpsk => 1,
            Mapping::Qpsk => 2,
            Mapping::Psk8 => 3,
            Mapping::Walsh => unreachable!("Walsh modes carry bits per block, not per symbol"),
        }
    }
}

/// Helical interleaver shape. `(row_inc, col_inc) == (0, 0)` denotes a
/// passthrough interleaver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterleaverParams {
    pub rows: usize,
    pub cols: usize,
    pub row_inc: usize,
    pub col_inc: usize,
}

impl InterleaverParams {
    pub const fn new(rows: usize, cols: usize, row_inc: usize, col_inc: usize) -> Self {
        Self { rows, cols, row_inc, col_inc }
    }

    pub fn block_size(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_passthrough(&self) -> bool {
        self.row_inc == 0 && self.col_inc == 0
    }
}

/// Mode identifier. `S` suffixes are the short (0.6 s class) interleave
/// variants with a 1440-symbol preamble, `L` the long variants with 11520.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeId {
    M75S,
    M75L,
    M150S,
    M150L,
    M300S,
    M300L,
    M600S,
    M600L,
    M1200S,
    M1200L,
    M2400S,
    M2400L,
    M4800S,
}

/// Full parameter record for one mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Mode {
    pub id: ModeId,
    /// User bit rate
    pub bit_rate: u32,
    pub mapping: Mapping,
    /// Adjacent transmissions of each coded bit
    pub repetition: usize,
    /// Unknown (data) symbols per mini-frame; 0 for Walsh modes
    pub unknown_len: usize,
    /// Known (probe) symbols per mini-frame; 0 for Walsh modes
    pub known_len: usize,
    pub interleaver: InterleaverParams,
    /// Preamble length in symbols
    pub preamble_symbols: usize,
    /// Whether the rate-1/2 convolutional code is applied
    pub coded: bool,
    /// Walsh modes: every n-th block uses the exception sequence set
    pub mes_interval: usize,
    pub d1: u8,
    pub d2: u8,
}

const PREAMBLE_SHORT: usize = 1440;
const PREAMBLE_LONG: usize = 11520;

static MODES: [Mode; 13] = [
    Mode {
        id: ModeId::M75S,
        bit_rate: 75,
        mapping: Mapping::Walsh,
        repetition: 1,
        unknown_len: 0,
        known_len: 0,
        interleaver: InterleaverParams::new(10, 9, 7, 2),
        preamble_symbols: PREAMBLE_SHORT,
        coded: true,
        mes_interval: 45,
        d1: 0,
        d2: 0,
    },
    Mode {
        id: ModeId::M75L,
        bit_rate: 75,
        mapping: Mapping::Walsh,
        repetition: 1,
        unknown_len: 0,
        known_len: 0,
        interleaver: InterleaverParams::new(20, 36, 7, 7),
        preamble_symbols: PREAMBLE_LONG,
        coded: true,
        mes_interval: 360,
        d1: 0,
        d2: 0,
    },
    Mode {
        id: ModeId::M150S,
        bit_rate: 150,
        mapping: Mapping::Bpsk,
        repetition: 4,
        unknown_len: 20,
        known_len: 20,
        interleaver: InterleaverParams::new(40, 18, 9, 11),
        preamble_symbols: PREAMBLE_SHORT,
        coded: true,
        mes_interval: 0,
        d1: 7,
        d2: 4,
    },
    Mode {
        id: ModeId::M150L,
        bit_rate: 150,
        mapping: Mapping::Bpsk,
        repetition: 4,
        unknown_len: 20,
        known_len: 20,
        interleaver: InterleaverParams::new(40, 144, 9, 11),
        preamble_symbols: PREAMBLE_LONG,
        coded: true,
        mes_interval: 0,
        d1: 5,
        d2: 4,
    },
    Mode {
        id: ModeId::M300S,
        bit_rate: 300,
        mapping: Mapping::Bpsk,
        repetition: 2,
        unknown_len: 20,
        known_len: 20,
        interleaver: InterleaverParams::new(40, 18, 9, 11),
        preamble_symbols: PREAMBLE_SHORT,
        coded: true,
        mes_interval: 0,
        d1: 6,
        d2: 7,
    },
    Mode {
        id: ModeId::M300L,
        bit_rate: 300,
        mapping: Mapping::Bpsk,
        repetition: 2,
        unknown_len: 20,
        known_len: 20,
        interleaver: InterleaverParams::new(40, 144, 9, 11),
        preamble_symbols: PREAMBLE_LONG,
        coded: true,
        mes_interval: 0,
        d1: 4,
        d2: 7,
    },
    Mode {
        id: ModeId::M600S,
        bit_rate: 600,
        mapping: Mapping::Bpsk,
        repetition: 1,
        unknown_len: 20,
        known_len: 20,
        interleaver: InterleaverParams::new(40, 36, 9, 19),
        preamble_symbols: PREAMBLE_SHORT,
        coded: true,
        mes_interval: 0,
        d1: 6,
        d2: 6,
    },
    Mode {
        id: ModeId::M600L,
        bit_rate: 600,
        mapping: Mapping::Bpsk,
        repetition: 1,
        unknown_len: 20,
        known_len: 20,
        interleaver: InterleaverParams::new(40, 288, 9, 19),
        preamble_symbols: PREAMBLE_LONG,
        coded: true,
        mes_interval: 0,
        d1: 4,
        d2: 6,
    },
    Mode {
        id: ModeId::M1200S,
        bit_rate: 1200,
        mapping: Mapping::Qpsk,
        repetition: 1,
        unknown_len: 20,
        known_len: 20,
        interleaver: InterleaverParams::new(40, 36, 9, 19),
        preamble_symbols: PREAMBLE_SHORT,
        coded: true,
        mes_interval: 0,
        d1: 6,
        d2: 5,
    },
    Mode {
        id: ModeId::M1200L,
        bit_rate: 1200,
        mapping: Mapping::Qpsk,
        repetition: 1,
        unknown_len: 20,
        known_len: 20,
        interleaver: InterleaverParams::new(40, 288, 9, 19),
        preamble_symbols: PREAMBLE_LONG,
        coded: true,
        mes_interval: 0,
        d1: 4,
        d2: 5,
    },
    Mode {
        id: ModeId::M2400S,
        bit_rate: 2400,
        mapping: Mapping::Psk8,
        repetition: 1,
        unknown_len: 32,
        known_len: 16,
        interleaver: InterleaverParams::new(40, 72, 9, 55),
        preamble_symbols: PREAMBLE_SHORT,
        coded: true,
        mes_interval: 0,
        d1: 6,
        d2: 4,
    },
    Mode {
        id: ModeId::M2400L,
        bit_rate: 2400,
        mapping: Mapping::Psk8,
        repetition: 1,
        unknown_len: 32,
        known_len: 16,
        interleaver: InterleaverParams::new(40, 576, 9, 55),
        preamble_symbols: PREAMBLE_LONG,
        coded: true,
        mes_interval: 0,
        d1: 4,
        d2: 4,
    },
    Mode {
        id: ModeId::M4800S,
        bit_rate: 4800,
        mapping: Mapping::Psk8,
        repetition: 1,
        unknown_len: 32,
        known_len: 16,
        interleaver: InterleaverParams::new(40, 72, 0, 0),
        preamble_symbols: PREAMBLE_SHORT,
        coded: false,
        mes_interval: 0,
        d1: 7,
        d2: 6,
    },
];

impl ModeId {
    /// All catalogued modes in rate order.
    pub fn all() -> impl Iterator<Item = ModeId> {
        MODES.iter().map(|m| m.id)
    }

    /// Full parameter record for this mode.
    pub fn params(self) -> &'static Mode {
        &MODES[self as usize]
    }

    /// Resolve the preamble indicator pair. Unrecognized pairs have no
    /// mode; (0, 0) resolves to the short 75 bit/s mode, matching the
    /// single 75 bit/s entry of the reference lookup.
    pub fn from_d1_d2(d1: u8, d2: u8) -> Option<ModeId> {
        MODES
            .iter()
            .find(|m| m.d1 == d1 && m.d2 == d2)
            .map(|m| m.id)
    }

    /// Parse a rate name such as `2400S` or `M2400S`.
    pub fn from_rate_name(name: &str) -> Option<ModeId> {
        let name = name.trim();
        let name = name.strip_prefix('M').unwrap_or(name);
        MODES
            .iter()
            .find(|m| m.id.rate_name() == name)
            .map(|m| m.id)
    }

    /// Rate name without the `M` prefix, as used on the control channel.
    pub fn rate_name(self) -> &'static str {
        match self {
            ModeId::M75S => "75S",
            ModeId::M75L => "75L",
            ModeId::M150S => "150S",
            ModeId::M150L => "150L",
            ModeId::M300S => "300S",
            ModeId::M300L => "300L",
            ModeId::M600S => "600S",
            ModeId::M600L => "600L",
            ModeId::M1200S => "1200S",
            ModeId::M1200L => "1200L",
            ModeId::M2400S => "2400S",
            ModeId::M2400L => "2400L",
            ModeId::M4800S => "4800S",
        }
    }

    pub fn is_walsh(self) -> bool {
        matches!(self.params().mapping, Mapping::Walsh)
    }

    pub fn is_long_interleave(self) -> bool {
        self.params().preamble_symbols == PREAMBLE_LONG
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.rate_name())
    }
}

impl Mode {
    /// Channel symbols of one mini-frame.
    pub fn frame_len(&self) -> usize {
        self.unknown_len + self.known_len
    }

    /// Channel data symbols produced by one interleaver block.
    pub fn data_symbols_per_block(&self) -> usize {
        match self.mapping {
            Mapping::Walsh => self.interleaver.block_size() / 2 * 32,
            _ => self.interleaver.block_size() * self.repetition / self.mapping.bits_per_symbol(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_order_matches_discriminants() {
        for (i, mode) in MODES.iter().enumerate() {
            assert_eq!(mode.id as usize, i, "{} out of order", mode.id);
        }
    }

    #[test]
    fn d1_d2_lookup_round_trips() {
        // M75L shares (0,0) with M75S and is selectable only explicitly
        for id in ModeId::all().filter(|&id| id != ModeId::M75L) {
            let m = id.params();
            assert_eq!(ModeId::from_d1_d2(m.d1, m.d2), Some(id));
        }
        assert_eq!(ModeId::from_d1_d2(1, 1), None);
    }

    #[test]
    fn rate_names_round_trip() {
        for id in ModeId::all() {
            assert_eq!(ModeId::from_rate_name(id.rate_name()), Some(id));
            assert_eq!(ModeId::from_rate_name(&id.to_string()), Some(id));
        }
        assert_eq!(ModeId::from_rate_name("9999"), None);
    }

    #[test]
    fn row_increments_are_coprime_with_rows() {
        fn gcd(a: usize, b: usize) -> usize {
            if b == 0 { a } else { gcd(b, a % b) }
        }
        for id in ModeId::all() {
            let il = id.params().interleaver;
            if !il.is_passthrough() {
                assert_eq!(gcd(il.row_inc, il.rows), 1, "{}", id);
            }
        }
    }

    #[test]
    fn blocks_fill_whole_mini_frames() {
        for id in ModeId::all() {
            let m = id.params();
            match m.mapping {
                Mapping::Walsh => {
                    assert_eq!(m.interleaver.block_size() % 2, 0, "{}", id);
                }
                _ => {
                    let per_block = m.data_symbols_per_block();
                    assert_eq!(per_block % m.unknown_len, 0, "{}", id);
                }
            }
        }
    }

    #[test]
    fn unknown_symbol_rate_carries_the_bit_rate() {
        // Coded modes: user rate x 2 coded bits x repetition must equal the
        // unknown-symbol bit capacity of the 2400 Bd frame.
        for id in ModeId::all().filter(|id| !id.is_walsh()) {
            let m = id.params();
            let unknown_rate = 2400.0 * m.unknown_len as f64 / m.frame_len() as f64;
            let channel_bits = unknown_rate * m.mapping.bits_per_symbol() as f64;
            let needed = m.bit_rate as f64 * if m.coded { 2.0 } else { 1.0 } * m.repetition as f64;
            assert_eq!(channel_bits, needed, "{}", id);
        }
    }
}
