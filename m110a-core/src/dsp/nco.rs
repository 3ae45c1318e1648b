//! Numerically controlled oscillator for carrier mixing.

use num_complex::Complex32;
use std::f64::consts::TAU;

/// Phase-accumulator oscillator.
///
/// The accumulator runs in f64 so a multi-second buffer does not collect
/// visible phase error; the mixed output stays in f32 like the rest of the
/// baseband path. The accumulator resets to zero at the start of every
/// operation, which is what lets TX and RX agree on a single static
/// residual phase.
#[derive(Debug, Clone)]
pub struct Nco {
    phase: f64,
    phase_inc: f64,
}

impl Nco {
    pub fn new(freq_hz: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: TAU * freq_hz as f64 / sample_rate as f64,
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn step(&mut self) -> f64 {
        let phase = self.phase;
        self.phase += self.phase_inc;
        if self.phase > TAU {
            self.phase -= TAU;
        } else if self.phase < 0.0 {
            self.phase += TAU;
        }
        phase
    }

    /// Downconvert real samples to complex baseband by multiplying with
    /// `exp(-j*phase)`.
    pub fn mix_down(&mut self, samples: &[f32]) -> Vec<Complex32> {
        samples
            .iter()
            .map(|&s| {
                let phase = self.step();
                Complex32::new(s * phase.cos() as f32, -s * phase.sin() as f32)
            })
            .collect()
    }

    /// Upconvert complex baseband to a real carrier: `Re(z * exp(j*phase))`.
    pub fn mix_up(&mut self, baseband: &[Complex32]) -> Vec<f32> {
        baseband
            .iter()
            .map(|&z| {
                let phase = self.step();
                z.re * phase.cos() as f32 - z.im * phase.sin() as f32
            })
            .collect()
    }
}
