//! Mode identification from the D1/D2 indicator bursts.
//!
//! The two bursts sit at fixed symbol offsets inside the first preamble
//! frame. Each candidate value expands to a scrambled 32-symbol segment
//! exactly as the transmitter built it, and the candidate with the largest
//! normalized correlation wins. The resulting pair indexes the mode
//! catalogue; pairs outside the catalogue leave the mode unresolved.

use num_complex::Complex32;

use crate::demapper::psk8;
use crate::mode::ModeId;
use crate::preamble::{segment_symbol, SyncResult, D1_OFFSET, D2_OFFSET};

/// Outcome of the indicator-burst correlation.
#[derive(Debug, Clone)]
pub struct ModeDetection {
    pub d1: u8,
    pub d2: u8,
    pub d1_corr: f32,
    pub d2_corr: f32,
    pub mode: Option<ModeId>,
}

/// Correlate both indicator bursts against all eight candidates each.
pub fn detect(filtered: &[Complex32], sync: &SyncResult, sps: usize) -> ModeDetection {
    let rot = Complex32::from_polar(1.0, sync.phase);

    let (d1, d1_corr) = best_candidate(filtered, sync.start_sample, D1_OFFSET, sps, rot);
    let (d2, d2_corr) = best_candidate(filtered, sync.start_sample, D2_OFFSET, sps, rot);

    ModeDetection {
        d1,
        d2,
        d1_corr,
        d2_corr,
        mode: ModeId::from_d1_d2(d1, d2),
    }
}

fn best_candidate(
    filtered: &[Complex32],
    start_sample: usize,
    symbol_offset: usize,
    sps: usize,
    rot: Complex32,
) -> (u8, f32) {
    let burst_start = start_sample + symbol_offset * sps;
    let mut best = 0u8;
    let mut best_corr = 0.0f32;

    for d in 0..8u8 {
        let mut corr = Complex32::new(0.0, 0.0);
        let mut power = 0.0f32;
        for i in 0..32 {
            let idx = burst_start + i * sps;
            if idx >= filtered.len() {
                break;
            }
            let expected = segment_symbol(d, symbol_offset, i);
            corr += filtered[idx] * rot * psk8(expected).conj();
            power += filtered[idx].norm_sqr();
        }
        let c = corr.norm() / (power * 32.0 + 1e-4).sqrt();
        if c > best_corr {
            best_corr = c;
            best = d;
        }
    }
    (best, best_corr)
}
