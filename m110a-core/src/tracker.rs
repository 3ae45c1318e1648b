//! Known-symbol channel tracking and data symbol extraction.
//!
//! After the preamble the transmitter alternates U unknown data symbols
//! with K known probe symbols. A probe is the data scrambler tribit sent
//! with zero data, so after descrambling every probe collapses onto
//! constellation point 0. The tracker exploits that to refit a small phase
//! correction per mini-frame and to estimate the channel amplitude used to
//! normalize soft decisions.
//!
//! The scrambler advances over probes as well as data even though probes
//! never leave this module; skipping them would shear the descrambling of
//! every later frame.

use num_complex::Complex32;

use crate::demapper::psk8;
use crate::mode::Mode;
use crate::scrambler::DataScrambler;

/// One extracted data symbol together with the scrambler tribit that was
/// applied to it on the air.
#[derive(Debug, Clone, Copy)]
pub struct DataSymbol {
    pub symbol: Complex32,
    pub scramble: u8,
}

/// Walks the data region mini-frame by mini-frame.
#[derive(Debug, Clone)]
pub struct ChannelTracker {
    scrambler: DataScrambler,
    unknown_len: usize,
    known_len: usize,
    gain: f32,
}

impl ChannelTracker {
    pub fn new(mode: &Mode) -> Self {
        Self {
            scrambler: DataScrambler::new(),
            unknown_len: mode.unknown_len,
            known_len: mode.known_len,
            gain: 1.0,
        }
    }

    /// Channel amplitude estimate from the most recent probes.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Consume whole mini-frames from `symbols` (already counter-rotated by
    /// the static preamble phase) and return the data symbols, each refined
    /// by its own frame's probe phase. A trailing partial frame is dropped.
    pub fn extract(&mut self, symbols: &[Complex32]) -> Vec<DataSymbol> {
        let frame_len = self.unknown_len + self.known_len;
        if frame_len == 0 {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(symbols.len() / frame_len * self.unknown_len);

        let mut idx = 0;
        while idx + frame_len <= symbols.len() {
            let data_scramble: Vec<u8> = (0..self.unknown_len)
                .map(|_| self.scrambler.next_tribit())
                .collect();

            // Probes descramble to point 0; their mean argument is the
            // residual phase of this frame and their mean magnitude the
            // channel gain.
            let mut probe_sum = Complex32::new(0.0, 0.0);
            for i in 0..self.known_len {
                let tribit = self.scrambler.next_tribit();
                let z = symbols[idx + self.unknown_len + i];
                probe_sum += z * psk8(tribit).conj();
            }

            let correction = if self.known_len > 0 && probe_sum.norm() > f32::EPSILON {
                self.gain = probe_sum.norm() / self.known_len as f32;
                Complex32::from_polar(1.0, -probe_sum.arg())
            } else {
                Complex32::new(1.0, 0.0)
            };

            for (i, &scramble) in data_scramble.iter().enumerate() {
                out.push(DataSymbol {
                    symbol: symbols[idx + i] * correction,
                    scramble,
                });
            }
            idx += frame_len;
        }
        out
    }
}
