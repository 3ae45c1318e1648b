//! Preamble pattern generation and synchronization.
//!
//! Every transmission opens with 480-symbol preamble frames built from
//! 32-symbol segments. Each segment spreads one tribit value over the
//! 8-entry orthogonal pattern table and adds the fixed 32-tribit preamble
//! scramble modulo 8. The first nine segments of a frame carry a fixed
//! selector sequence, which gives the receiver a deterministic 288-symbol
//! pattern to correlate against; segments nine and ten carry the D1/D2 mode
//! indicators, the next three a frame countdown, and the last a zero fill.

use num_complex::Complex32;

use crate::demapper::{nearest_psk8, psk8};
use crate::scrambler::PREAMBLE_SCRAMBLE;

/// Orthogonal symbol patterns, one row per tribit value. Row `d`, column
/// `i` is `4 * parity(d & i)`, so rows are mutually orthogonal after
/// mapping to the constellation.
pub const PSYMBOL: [[u8; 8]; 8] = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [0, 4, 0, 4, 0, 4, 0, 4],
    [0, 0, 4, 4, 0, 0, 4, 4],
    [0, 4, 4, 0, 0, 4, 4, 0],
    [0, 0, 0, 0, 4, 4, 4, 4],
    [0, 4, 0, 4, 4, 0, 4, 0],
    [0, 0, 4, 4, 4, 4, 0, 0],
    [0, 4, 4, 0, 4, 0, 0, 4],
];

/// Selector values for the nine common segments of every preamble frame.
pub const P_C_SEQ: [u8; 9] = [0, 1, 3, 0, 1, 3, 1, 2, 0];

/// Symbols in one preamble frame (15 segments of 32).
pub const PREAMBLE_FRAME_SYMBOLS: usize = 480;

/// Length of the common correlation pattern in symbols.
pub const COMMON_PATTERN_LEN: usize = 288;

/// Symbol index of the D1 indicator burst relative to preamble start.
pub const D1_OFFSET: usize = 288;

/// Symbol index of the D2 indicator burst.
pub const D2_OFFSET: usize = 320;

/// Correlation threshold above which the preamble is declared found.
pub const DETECT_THRESHOLD: f32 = 0.70;

/// Correlation threshold that stops the search at the first strong peak.
const EARLY_STOP_THRESHOLD: f32 = 0.90;

/// One scrambled 32-symbol segment for selector value `d`, starting at
/// preamble symbol offset `offset`.
pub fn segment_symbol(d: u8, offset: usize, i: usize) -> u8 {
    (PSYMBOL[d as usize][i % 8] + PREAMBLE_SCRAMBLE[(offset + i) % 32]) % 8
}

/// The deterministic 288-symbol common pattern every frame opens with.
pub fn common_pattern() -> [u8; COMMON_PATTERN_LEN] {
    let mut pattern = [0u8; COMMON_PATTERN_LEN];
    let mut idx = 0;
    for &d in P_C_SEQ.iter() {
        for i in 0..32 {
            pattern[idx] = (PSYMBOL[d as usize][i % 8] + PREAMBLE_SCRAMBLE[idx % 32]) % 8;
            idx += 1;
        }
    }
    pattern
}

/// Result of the preamble search.
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// Whether the best correlation cleared [`DETECT_THRESHOLD`]
    pub found: bool,
    /// Sample index of the first preamble symbol
    pub start_sample: usize,
    /// Static residual phase to rotate every subsequent symbol by
    pub phase: f32,
    /// Best normalized correlation observed
    pub correlation: f32,
    /// Hard-decision symbol accuracy over the common pattern, percent.
    /// Diagnostic only; nothing downstream consumes it.
    pub accuracy: f32,
}

/// Correlation search over a matched-filtered baseband stream.
#[derive(Debug, Clone)]
pub struct PreambleSearcher {
    pattern: [u8; COMMON_PATTERN_LEN],
    sps: usize,
    max_search_symbols: usize,
}

impl PreambleSearcher {
    pub fn new(sps: usize, max_search_symbols: usize) -> Self {
        Self {
            pattern: common_pattern(),
            sps,
            max_search_symbols,
        }
    }

    pub fn pattern(&self) -> &[u8; COMMON_PATTERN_LEN] {
        &self.pattern
    }

    fn correlate_at(&self, filtered: &[Complex32], start: usize, len: usize) -> (Complex32, f32) {
        let mut corr = Complex32::new(0.0, 0.0);
        let mut power = 0.0f32;
        for i in 0..len {
            let idx = start + i * self.sps;
            if idx >= filtered.len() {
                break;
            }
            corr += filtered[idx] * psk8(self.pattern[i]).conj();
            power += filtered[idx].norm_sqr();
        }
        (corr, power)
    }

    /// Frequency-search figure of merit: correlate each half of the common
    /// pattern separately and require the two correlation phases to agree.
    /// A residual carrier offset rotates the second half against the first
    /// and collapses the metric even when each half still correlates.
    pub fn quick_metric(&self, filtered: &[Complex32]) -> f32 {
        const HALF_LEN: usize = COMMON_PATTERN_LEN / 2;
        let span = 2 * HALF_LEN * self.sps;
        if filtered.len() < span {
            return 0.0;
        }
        let max_search = (filtered.len() - span).min(200 * self.sps);

        let mut best = 0.0f32;
        let mut start = 0;
        while start <= max_search {
            let (c1, p1) = self.half_correlation(filtered, start, 0, HALF_LEN);
            let (c2, p2) = self.half_correlation(filtered, start, HALF_LEN, HALF_LEN);

            let mag1 = c1.norm() / (p1 + 1e-10).sqrt();
            let mag2 = c2.norm() / (p2 + 1e-10).sqrt();
            let phase_factor = (c2.arg() - c1.arg()).cos().max(0.0);
            let metric = 0.5 * (mag1 + mag2) * phase_factor;
            if metric > best {
                best = metric;
            }
            start += self.sps;
        }
        best
    }

    fn half_correlation(
        &self,
        filtered: &[Complex32],
        start: usize,
        first_symbol: usize,
        len: usize,
    ) -> (Complex32, f32) {
        let mut corr = Complex32::new(0.0, 0.0);
        let mut power = 0.0f32;
        for i in 0..len {
            let sym = first_symbol + i;
            let idx = start + sym * self.sps;
            if idx >= filtered.len() {
                break;
            }
            corr += filtered[idx] * psk8(self.pattern[sym]).conj();
            power += filtered[idx].norm_sqr();
        }
        (corr, power)
    }

    /// Sample-level timing search for the common pattern.
    ///
    /// Walks candidate start samples, tracking the best normalized
    /// correlation. The first peak above 0.90 wins after a two-symbol local
    /// refinement; this keeps later noise peaks from stealing the lock.
    pub fn search(&self, filtered: &[Complex32]) -> SyncResult {
        let mut result = SyncResult {
            found: false,
            start_sample: 0,
            phase: 0.0,
            correlation: 0.0,
            accuracy: 0.0,
        };

        let span = COMMON_PATTERN_LEN * self.sps;
        if filtered.len() < span {
            return result;
        }
        let max_search = (filtered.len() - span).min(self.max_search_symbols * self.sps);

        let mut start = 0;
        while start < max_search {
            let c = self.normalized_at(filtered, start, &mut result);
            if c > EARLY_STOP_THRESHOLD {
                let local_end = (start + 2 * self.sps).min(max_search);
                for s2 in start + 1..local_end {
                    self.normalized_at(filtered, s2, &mut result);
                }
                break;
            }
            start += 1;
        }

        result.found = result.correlation > DETECT_THRESHOLD;
        if result.found {
            result.accuracy = self.hard_accuracy(filtered, &result);
        }
        result
    }

    /// Correlate at one start sample and fold the outcome into `best` if it
    /// improves on it. Returns the correlation at this position.
    fn normalized_at(&self, filtered: &[Complex32], start: usize, best: &mut SyncResult) -> f32 {
        let (corr, power) = self.correlate_at(filtered, start, COMMON_PATTERN_LEN);
        let c = corr.norm() / (power * COMMON_PATTERN_LEN as f32 + 1e-4).sqrt();
        if c > best.correlation {
            best.correlation = c;
            best.start_sample = start;
            best.phase = -corr.arg();
        }
        c
    }

    fn hard_accuracy(&self, filtered: &[Complex32], sync: &SyncResult) -> f32 {
        let rot = Complex32::from_polar(1.0, sync.phase);
        let mut matches = 0usize;
        let mut total = 0usize;
        for (i, &expected) in self.pattern.iter().enumerate() {
            let idx = sync.start_sample + i * self.sps;
            if idx >= filtered.len() {
                break;
            }
            total += 1;
            if nearest_psk8(filtered[idx] * rot) == expected {
                matches += 1;
            }
        }
        if total == 0 {
            0.0
        } else {
            100.0 * matches as f32 / total as f32
        }
    }
}
