//! Root-raised-cosine tap generation.

use std::f64::consts::PI;

/// Generate RRC filter taps.
///
/// `alpha` is the roll-off factor, `span_symbols` the total filter span in
/// symbol periods and `sps` the samples per symbol, giving
/// `span_symbols * sps + 1` taps with the peak at the center.
///
/// The two singular points of the closed-form response are replaced by their
/// limits: `t = 0` and `|t| = 1/(4*alpha)`. Taps are normalized so their sum
/// is one, which keeps the filter's DC gain at unity on both sides of the
/// matched pair.
pub fn rrc_taps(alpha: f64, span_symbols: usize, sps: usize) -> Vec<f32> {
    let len = span_symbols * sps + 1;
    let center = (len / 2) as f64;
    let mut taps = vec![0.0f64; len];

    for (i, tap) in taps.iter_mut().enumerate() {
        // Time in symbol periods, symmetric around the center tap
        let t = (i as f64 - center) / sps as f64;

        *tap = if t.abs() < 1e-10 {
            1.0 - alpha + 4.0 * alpha / PI
        } else if (t.abs() - 1.0 / (4.0 * alpha)).abs() < 1e-10 {
            let x = PI / (4.0 * alpha);
            (alpha / std::f64::consts::SQRT_2)
                * ((1.0 + 2.0 / PI) * x.sin() + (1.0 - 2.0 / PI) * x.cos())
        } else {
            let numerator =
                (PI * t * (1.0 - alpha)).sin() + 4.0 * alpha * t * (PI * t * (1.0 + alpha)).cos();
            let denominator = PI * t * (1.0 - (4.0 * alpha * t).powi(2));
            numerator / denominator
        };
    }

    let sum: f64 = taps.iter().sum();
    taps.iter().map(|&t| (t / sum) as f32).collect()
}
