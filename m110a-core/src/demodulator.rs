//! Receive side: waveform samples to payload bytes.
//!
//! The stages run strictly in order on the calling task. The carrier
//! offset grid re-downconverts and refilters the whole buffer per
//! candidate and keeps the offset whose two-half preamble metric wins.
//! Synchronization and mode detection then pin the symbol clock, and the
//! mode dispatches to either the linear chain (tracker, demapper,
//! repetition combiner, deinterleaver, Viterbi) or the Walsh chain.
//!
//! Nothing in here raises on bad air: an unsynchronizable or unclassifiable
//! signal comes back as its own [`DecodeOutcome`] variant.

use num_complex::Complex32;

use crate::config::ModemConfig;
use crate::demapper::{combine_repetition, demap_into};
use crate::dsp::{rrc_taps, Fir, Nco};
use crate::errors::Result;
use crate::interleaver::StreamingDeinterleaver;
use crate::mode::{Mode, ModeId};
use crate::mode_detect;
use crate::preamble::{PreambleSearcher, SyncResult, COMMON_PATTERN_LEN};
use crate::tracker::ChannelTracker;
use crate::utils;
use crate::viterbi::ViterbiDecoder;
use crate::walsh::{WalshDemodulator, WALSH_BLOCK_SPAN, WALSH_INPUT_SPAN};

/// Everything the synchronizer and mode detector learned about the signal.
#[derive(Debug, Clone)]
pub struct SyncInfo {
    /// Sample index of the first preamble symbol
    pub start_sample: usize,
    /// Static residual phase applied to all subsequent symbols
    pub phase: f32,
    /// Carrier offset selected by the frequency search, Hz
    pub freq_offset_hz: f32,
    /// Preamble correlation at the lock point
    pub correlation: f32,
    /// Hard-decision accuracy over the common pattern, percent
    pub accuracy: f32,
    pub d1: u8,
    pub d2: u8,
    pub d1_corr: f32,
    pub d2_corr: f32,
}

/// Result of one decode attempt.
#[derive(Debug, Clone)]
pub enum DecodeOutcome {
    /// Preamble found, mode resolved, payload recovered
    Decoded {
        mode: ModeId,
        bytes: Vec<u8>,
        sync: SyncInfo,
        /// The final block was zero-padded; its output is less trustworthy
        truncated: bool,
    },
    /// Preamble found but the (D1, D2) pair is not in the catalogue
    UnknownMode { sync: SyncInfo },
    /// No preamble correlation above threshold anywhere in the search range
    NoPreamble { best_correlation: f32 },
}

impl DecodeOutcome {
    pub fn is_decoded(&self) -> bool {
        matches!(self, DecodeOutcome::Decoded { .. })
    }

    /// Recovered payload, empty unless decoding succeeded.
    pub fn bytes(&self) -> &[u8] {
        match self {
            DecodeOutcome::Decoded { bytes, .. } => bytes,
            _ => &[],
        }
    }
}

/// Full receive pipeline for one configuration.
#[derive(Debug, Clone)]
pub struct Demodulator {
    config: ModemConfig,
    sps: usize,
    fir: Fir,
    searcher: PreambleSearcher,
}

impl Demodulator {
    pub fn new(config: &ModemConfig) -> Result<Self> {
        config.validate()?;
        let sps = config.samples_per_symbol();
        let taps = rrc_taps(config.rrc_alpha as f64, config.rrc_span, sps);
        Ok(Self {
            config: config.clone(),
            sps,
            fir: Fir::new(taps),
            searcher: PreambleSearcher::new(sps, config.max_search_symbols),
        })
    }

    /// Decode a buffer of audio samples end to end.
    pub fn demodulate(&self, samples: &[f32]) -> DecodeOutcome {
        if samples.len() < COMMON_PATTERN_LEN * self.sps {
            return DecodeOutcome::NoPreamble {
                best_correlation: 0.0,
            };
        }

        let (freq_offset_hz, filtered) = self.acquire_frequency(samples);

        let sync = self.searcher.search(&filtered);
        if !sync.found {
            return DecodeOutcome::NoPreamble {
                best_correlation: sync.correlation,
            };
        }

        let detection = mode_detect::detect(&filtered, &sync, self.sps);
        let info = SyncInfo {
            start_sample: sync.start_sample,
            phase: sync.phase,
            freq_offset_hz,
            correlation: sync.correlation,
            accuracy: sync.accuracy,
            d1: detection.d1,
            d2: detection.d2,
            d1_corr: detection.d1_corr,
            d2_corr: detection.d2_corr,
        };

        let Some(mode_id) = detection.mode else {
            return DecodeOutcome::UnknownMode { sync: info };
        };
        let mode = mode_id.params();
        let data_start = sync.start_sample + mode.preamble_symbols * self.sps;

        let (bytes, truncated) = if mode_id.is_walsh() {
            self.decode_walsh(&filtered, data_start, &sync, mode)
        } else {
            self.decode_linear(&filtered, data_start, &sync, mode)
        };

        DecodeOutcome::Decoded {
            mode: mode_id,
            bytes,
            sync: info,
            truncated,
        }
    }

    /// Re-downconvert per candidate offset and keep the one whose preamble
    /// halves correlate in phase.
    fn acquire_frequency(&self, samples: &[f32]) -> (f32, Vec<Complex32>) {
        if self.config.freq_search_range <= 0.0 || self.config.freq_search_step <= 0.0 {
            return (0.0, self.down_filter(samples, 0.0));
        }

        let steps = (self.config.freq_search_range / self.config.freq_search_step).round() as i32;
        let mut best_offset = 0.0f32;
        let mut best_metric = f32::NEG_INFINITY;
        let mut best_filtered = Vec::new();

        for k in -steps..=steps {
            let offset = k as f32 * self.config.freq_search_step;
            let filtered = self.down_filter(samples, offset);
            let metric = self.searcher.quick_metric(&filtered);
            if metric > best_metric {
                best_metric = metric;
                best_offset = offset;
                best_filtered = filtered;
            }
        }
        (best_offset, best_filtered)
    }

    fn down_filter(&self, samples: &[f32], freq_offset_hz: f32) -> Vec<Complex32> {
        let mut nco = Nco::new(
            self.config.carrier_freq + freq_offset_hz,
            self.config.sample_rate,
        );
        let baseband = nco.mix_down(samples);
        self.fir.filter_complex(&baseband)
    }

    fn decode_linear(
        &self,
        filtered: &[Complex32],
        data_start: usize,
        sync: &SyncResult,
        mode: &Mode,
    ) -> (Vec<u8>, bool) {
        let rot = Complex32::from_polar(1.0, sync.phase);
        let mut symbols = Vec::new();
        let mut idx = data_start;
        while idx < filtered.len() {
            symbols.push(filtered[idx] * rot);
            idx += self.sps;
        }

        let mut tracker = ChannelTracker::new(mode);
        let data_symbols = tracker.extract(&symbols);
        let gain = tracker.gain();

        let mut soft = Vec::with_capacity(data_symbols.len() * 3);
        for symbol in &data_symbols {
            demap_into(symbol, mode.mapping, gain, &mut soft);
        }

        let combined = combine_repetition(&soft, mode.repetition);

        let mut deinterleaver = StreamingDeinterleaver::new(mode.interleaver);
        let mut stream = deinterleaver.process(&combined);
        let truncated = deinterleaver.pending() > 0;
        stream.extend(deinterleaver.flush());

        let bits = if mode.coded {
            let mut viterbi = ViterbiDecoder::new();
            viterbi.decode_block(&stream, true)
        } else {
            utils::hard_bits(&stream)
        };

        (utils::bits_to_bytes_lsb(&bits), truncated)
    }

    fn decode_walsh(
        &self,
        filtered: &[Complex32],
        data_start: usize,
        sync: &SyncResult,
        mode: &Mode,
    ) -> (Vec<u8>, bool) {
        let rot = Complex32::from_polar(1.0, sync.phase);
        let half = self.sps / 2;

        // Half-symbol-spaced stream for the sliding correlation
        let mut stream = Vec::new();
        let mut idx = data_start;
        while idx < filtered.len() {
            stream.push(filtered[idx] * rot);
            idx += half;
        }
        let real_len = stream.len();
        stream.extend(std::iter::repeat(Complex32::new(0.0, 0.0)).take(WALSH_INPUT_SPAN));

        let mut walsh = WalshDemodulator::new(mode.mes_interval);
        let mut soft = Vec::new();
        let mut block = 0usize;
        while (block + 1) * WALSH_BLOCK_SPAN <= real_len {
            let decision = walsh.demodulate_block(&stream[block * WALSH_BLOCK_SPAN..]);
            WalshDemodulator::gray_decode(decision.index, decision.soft, &mut soft);
            block += 1;
        }

        let mut deinterleaver = StreamingDeinterleaver::new(mode.interleaver);
        let mut bits_stream = deinterleaver.process(&soft);
        let truncated = deinterleaver.pending() > 0;
        bits_stream.extend(deinterleaver.flush());

        let mut viterbi = ViterbiDecoder::new();
        let bits = viterbi.decode_block(&bits_stream, true);

        (utils::bits_to_bytes_lsb(&bits), truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> ModemConfig {
        ModemConfig {
            freq_search_range: 0.0,
            ..ModemConfig::default()
        }
    }

    #[test]
    fn short_input_reports_no_preamble() {
        let demod = Demodulator::new(&quiet_config()).unwrap();
        let outcome = demod.demodulate(&vec![0.0f32; 1000]);
        assert!(matches!(
            outcome,
            DecodeOutcome::NoPreamble { best_correlation } if best_correlation == 0.0
        ));
    }

    #[test]
    fn silence_reports_no_preamble() {
        let demod = Demodulator::new(&quiet_config()).unwrap();
        let outcome = demod.demodulate(&vec![0.0f32; 120_000]);
        assert!(!outcome.is_decoded());
        assert!(outcome.bytes().is_empty());
    }

    #[test]
    fn pseudo_noise_reports_no_preamble() {
        let mut state = 0xDEAD_BEEFu32;
        let samples: Vec<f32> = (0..120_000)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                ((state >> 16) as f32 / 32_768.0 - 1.0) * 0.3
            })
            .collect();
        let demod = Demodulator::new(&quiet_config()).unwrap();
        let outcome = demod.demodulate(&samples);
        assert!(matches!(outcome, DecodeOutcome::NoPreamble { .. }));
    }
}
