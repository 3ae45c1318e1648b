//! Configuration types for the modem core.

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, Result};

/// Front-end parameters shared by the modulator and demodulator.
///
/// The defaults match the MS-DMT reference waveform: 48 kHz audio, an
/// 1800 Hz single tone, 2400 Bd in every mode, and a root-raised-cosine
/// pulse with 0.35 roll-off spanning six symbols.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModemConfig {
    /// Audio sample rate in Hz
    pub sample_rate: f32,
    /// Carrier tone frequency in Hz
    pub carrier_freq: f32,
    /// Symbol rate in baud (2400 for all standard modes)
    pub baud_rate: f32,
    /// RRC roll-off factor
    pub rrc_alpha: f32,
    /// RRC filter span in symbols (the filter has `rrc_span * sps + 1` taps)
    pub rrc_span: usize,
    /// How far into the signal the preamble search looks, in symbols
    pub max_search_symbols: usize,
    /// Carrier offset search range in Hz (0 disables the frequency search)
    pub freq_search_range: f32,
    /// Carrier offset search step in Hz
    pub freq_search_step: f32,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            carrier_freq: 1_800.0,
            baud_rate: 2_400.0,
            rrc_alpha: 0.35,
            rrc_span: 6,
            max_search_symbols: 500,
            freq_search_range: 10.0,
            freq_search_step: 1.0,
        }
    }
}

impl ModemConfig {
    /// Integer samples per symbol. Only meaningful after [`validate`](Self::validate).
    pub fn samples_per_symbol(&self) -> usize {
        (self.sample_rate / self.baud_rate) as usize
    }

    /// Check the invariants the pipeline depends on.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate { rate: self.sample_rate }.into());
        }
        if !(self.baud_rate > 0.0) {
            return Err(ConfigError::InvalidBaudRate { rate: self.baud_rate }.into());
        }
        let ratio = self.sample_rate / self.baud_rate;
        if (ratio - ratio.round()).abs() > 1e-6 {
            return Err(ConfigError::FractionalSymbolLength {
                sample_rate: self.sample_rate,
                baud_rate: self.baud_rate,
            }
            .into());
        }
        let sps = ratio.round() as usize;
        if sps % 2 != 0 {
            return Err(ConfigError::OddSamplesPerSymbol { sps }.into());
        }
        let min_required = 2.0 * (self.carrier_freq + self.baud_rate);
        if self.sample_rate < min_required {
            return Err(ConfigError::NyquistViolation {
                carrier_hz: self.carrier_freq,
                min_required_hz: min_required,
            }
            .into());
        }
        Ok(())
    }
}
