//! 16-bit PCM conversion and raw file I/O.
//!
//! Capture files are 16-bit signed little-endian mono at the configured
//! sample rate. A leading 44-byte RIFF/WAV header is skipped when present
//! so WAV captures decode the same as raw ones.

use std::fs;
use std::path::Path;

use crate::errors::Result;

const WAV_HEADER_LEN: usize = 44;

/// Convert PCM integers to the internal float range.
pub fn to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32_768.0).collect()
}

/// Quantize floats to PCM, clamping anything outside [-1, 1].
pub fn quantize(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32_767.0).round() as i16)
        .collect()
}

/// Read a raw (or 44-byte-headered WAV) PCM file.
pub fn read_pcm(path: &Path) -> Result<Vec<f32>> {
    let bytes = fs::read(path)?;
    let payload = if bytes.len() > WAV_HEADER_LEN && bytes.starts_with(b"RIFF") {
        &bytes[WAV_HEADER_LEN..]
    } else {
        &bytes[..]
    };
    Ok(payload
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32_768.0)
        .collect())
}

/// Write samples as raw 16-bit little-endian PCM.
pub fn write_pcm(path: &Path, samples: &[f32]) -> Result<()> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for value in quantize(samples) {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_round_trip_is_tight() {
        let original = vec![0.0f32, 0.25, -0.25, 0.999, -0.999];
        let recovered = to_f32(&quantize(&original));
        for (a, b) in original.iter().zip(&recovered) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }

    #[test]
    fn quantize_clamps_out_of_range() {
        let q = quantize(&[2.0, -2.0]);
        assert_eq!(q, vec![32_767, -32_767]);
    }

    #[test]
    fn file_round_trip_and_wav_header_skip() {
        let dir = std::env::temp_dir();
        let raw_path = dir.join("m110a_pcm_test_raw.pcm");
        let wav_path = dir.join("m110a_pcm_test_hdr.wav");

        let samples: Vec<f32> = (0..100).map(|i| (i as f32 / 100.0).sin() * 0.5).collect();
        write_pcm(&raw_path, &samples).unwrap();
        let read_back = read_pcm(&raw_path).unwrap();
        assert_eq!(read_back.len(), samples.len());

        // Prepend a fake RIFF header; the payload must parse identically
        let mut with_header = b"RIFF".to_vec();
        with_header.extend(std::iter::repeat(0u8).take(WAV_HEADER_LEN - 4));
        with_header.extend(fs::read(&raw_path).unwrap());
        fs::write(&wav_path, &with_header).unwrap();

        let from_wav = read_pcm(&wav_path).unwrap();
        assert_eq!(from_wav, read_back);

        let _ = fs::remove_file(&raw_path);
        let _ = fs::remove_file(&wav_path);
    }
}
