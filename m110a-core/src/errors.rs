//! Modem error types with granular categories.
//!
//! Only genuine faults surface here. A signal that fails to synchronize or
//! carries an unrecognized mode identifier is not an error; those cases are
//! reported through [`crate::demodulator::DecodeOutcome`] so callers can
//! distinguish "bad configuration" from "bad air".

use thiserror::Error;

/// Top-level error type for all modem operations
#[derive(Debug, Error)]
pub enum ModemError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("PCM I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors, raised before any signal is touched
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid sample rate: {rate} Hz (must be > 0)")]
    InvalidSampleRate { rate: f32 },

    #[error("Invalid baud rate: {rate} Bd (must be > 0)")]
    InvalidBaudRate { rate: f32 },

    #[error("Sample rate {sample_rate} Hz is not an integer multiple of {baud_rate} Bd")]
    FractionalSymbolLength { sample_rate: f32, baud_rate: f32 },

    #[error("Samples per symbol must be even for the half-symbol Walsh search, got {sps}")]
    OddSamplesPerSymbol { sps: usize },

    #[error("Nyquist violation: carrier {carrier_hz} Hz requires sample rate > {min_required_hz} Hz")]
    NyquistViolation { carrier_hz: f32, min_required_hz: f32 },
}

/// Result type alias for modem operations
pub type Result<T> = std::result::Result<T, ModemError>;
