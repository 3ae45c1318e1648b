//! MIL-STD-188-110A serial tone modem core.
//!
//! This crate implements the signal-processing chain of an MS-DMT
//! compatible HF modem: synthesis of the 1800 Hz single-tone waveform from
//! payload bytes, and recovery of payload bytes from 16-bit PCM audio via
//! preamble synchronization, mode detection, known-symbol channel
//! tracking, soft demapping, helical deinterleaving and Viterbi decoding,
//! with the Walsh orthogonal path standing in for the linear chain at
//! 75 bit/s.
//!
//! The modules follow the pipeline order: [`dsp`] and [`scrambler`] at the
//! bottom, [`preamble`]/[`mode_detect`]/[`tracker`]/[`demapper`] in the
//! middle, [`interleaver`]/[`viterbi`]/[`walsh`] above them, and the
//! [`modulator`]/[`demodulator`] pair on top. Network servers, file
//! drivers and command parsing live outside this crate.

pub mod config;
pub mod demapper;
pub mod demodulator;
pub mod dsp;
pub mod errors;
pub mod interleaver;
pub mod mode;
pub mod mode_detect;
pub mod modulator;
pub mod pcm;
pub mod preamble;
pub mod scrambler;
pub mod tracker;
pub mod utils;
pub mod viterbi;
pub mod walsh;

pub use config::ModemConfig;
pub use demodulator::{DecodeOutcome, Demodulator, SyncInfo};
pub use errors::{ModemError, Result};
pub use mode::{Mapping, Mode, ModeId};
pub use modulator::Modulator;

/// Encode a payload to 16-bit PCM at the configured rates.
pub fn encode_to_pcm(mode: ModeId, payload: &[u8], config: &ModemConfig) -> Result<Vec<i16>> {
    Modulator::new(mode, config)?.modulate_to_pcm(payload)
}

/// Decode 16-bit PCM back to payload bytes.
pub fn decode_pcm(samples: &[i16], config: &ModemConfig) -> Result<DecodeOutcome> {
    let demodulator = Demodulator::new(config)?;
    Ok(demodulator.demodulate(&pcm::to_f32(samples)))
}
