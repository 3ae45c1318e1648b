//! Centered FIR filter evaluation.

use num_complex::Complex32;

/// A finite impulse response filter evaluated with the kernel centered on
/// each output sample, so the output has the same length as the input and
/// no group delay.
#[derive(Debug, Clone)]
pub struct Fir {
    taps: Vec<f32>,
}

impl Fir {
    pub fn new(taps: Vec<f32>) -> Self {
        Self { taps }
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn taps(&self) -> &[f32] {
        &self.taps
    }

    /// Filter a complex baseband stream. Samples past either edge are
    /// treated as zero.
    pub fn filter_complex(&self, input: &[Complex32]) -> Vec<Complex32> {
        let half = self.taps.len() as isize / 2;
        let n = input.len() as isize;
        let mut output = Vec::with_capacity(input.len());

        for i in 0..n {
            let mut acc = Complex32::new(0.0, 0.0);
            for (j, &tap) in self.taps.iter().enumerate() {
                let idx = i - half + j as isize;
                if idx >= 0 && idx < n {
                    acc += input[idx as usize] * tap;
                }
            }
            output.push(acc);
        }
        output
    }
}
