//! Transmit side: payload bytes to a single-tone waveform.
//!
//! The chain mirrors the receiver stage by stage. Payload bytes unpack
//! LSB-first, run through the convolutional encoder with a K-1 zero flush,
//! pad to whole interleaver blocks, interleave, repeat each interleaved bit
//! for the low-rate modes, group into symbol labels MSB-first, Gray-map
//! onto the constellation, add the data scrambler tribit modulo 8 and
//! interleave known probe symbols every U data symbols. Walsh modes swap
//! the symbol mapping for 32-symbol orthogonal sequences. The symbol
//! stream is pulse-shaped with the shared RRC taps, upconverted through
//! the NCO and leveled to a fixed peak.

use num_complex::Complex32;

use crate::config::ModemConfig;
use crate::demapper::{psk8, BPSK_MAP, GRAY_ENCODE, QPSK_MAP};
use crate::dsp::{rrc_taps, Fir, Nco};
use crate::errors::Result;
use crate::interleaver::StreamingInterleaver;
use crate::mode::{Mapping, Mode, ModeId};
use crate::pcm;
use crate::preamble::{segment_symbol, P_C_SEQ, PREAMBLE_FRAME_SYMBOLS};
use crate::scrambler::DataScrambler;
use crate::utils;
use crate::viterbi::ConvEncoder;
use crate::walsh::{walsh_symbol, TX_GRAY, WALSH_BLOCK_SYMBOLS};

/// Output level as a fraction of PCM full scale.
const TX_PEAK: f32 = 0.35;

/// Waveform synthesizer for one operating mode.
#[derive(Debug, Clone)]
pub struct Modulator {
    mode: &'static Mode,
    config: ModemConfig,
    fir: Fir,
    sps: usize,
}

impl Modulator {
    pub fn new(mode: ModeId, config: &ModemConfig) -> Result<Self> {
        config.validate()?;
        let sps = config.samples_per_symbol();
        let taps = rrc_taps(config.rrc_alpha as f64, config.rrc_span, sps);
        Ok(Self {
            mode: mode.params(),
            config: config.clone(),
            fir: Fir::new(taps),
            sps,
        })
    }

    pub fn mode(&self) -> ModeId {
        self.mode.id
    }

    /// Synthesize the waveform for `payload` as float samples.
    pub fn modulate(&self, payload: &[u8]) -> Result<Vec<f32>> {
        let symbols = self.build_symbols(payload);
        Ok(self.pulse_shape_and_mix(&symbols))
    }

    /// Synthesize directly to 16-bit PCM.
    pub fn modulate_to_pcm(&self, payload: &[u8]) -> Result<Vec<i16>> {
        Ok(pcm::quantize(&self.modulate(payload)?))
    }

    /// The full channel-symbol sequence (preamble plus data region) before
    /// pulse shaping. Exposed for tests and analysis.
    pub fn build_symbols(&self, payload: &[u8]) -> Vec<u8> {
        let mut symbols = Vec::new();
        self.push_preamble(&mut symbols);
        match self.mode.mapping {
            Mapping::Walsh => self.push_walsh_data(payload, &mut symbols),
            _ => self.push_linear_data(payload, &mut symbols),
        }
        symbols
    }

    /// Preamble frames: nine fixed selector segments, D1, D2, a three-digit
    /// base-8 frames-remaining count and a zero segment.
    fn push_preamble(&self, out: &mut Vec<u8>) {
        let frames = self.mode.preamble_symbols / PREAMBLE_FRAME_SYMBOLS;
        for frame in 0..frames {
            let remaining = frames - 1 - frame;
            let countdown = [
                ((remaining >> 6) & 7) as u8,
                ((remaining >> 3) & 7) as u8,
                (remaining & 7) as u8,
            ];

            let mut segments = [0u8; 15];
            segments[..9].copy_from_slice(&P_C_SEQ);
            segments[9] = self.mode.d1;
            segments[10] = self.mode.d2;
            segments[11..14].copy_from_slice(&countdown);

            for (seg, &d) in segments.iter().enumerate() {
                for i in 0..32 {
                    out.push(segment_symbol(d, seg * 32, i));
                }
            }
        }
    }

    /// FEC-encode and interleave the payload into the on-air bit order.
    fn wire_bits(&self, payload: &[u8]) -> Vec<i8> {
        let bits = utils::bytes_to_bits_lsb(payload);
        let coded = if self.mode.coded {
            let mut encoder = ConvEncoder::new();
            encoder.encode(&bits, true)
        } else {
            bits
        };

        let mut interleaver = StreamingInterleaver::new(self.mode.interleaver);
        let mut stream = interleaver.process(&utils::bits_to_i8(&coded));
        stream.extend(interleaver.flush());
        stream
    }

    fn push_linear_data(&self, payload: &[u8], out: &mut Vec<u8>) {
        let stream = self.wire_bits(payload);
        let bits_per_symbol = self.mode.mapping.bits_per_symbol();

        let mut channel_bits = Vec::with_capacity(stream.len() * self.mode.repetition);
        for &bit in &stream {
            for _ in 0..self.mode.repetition {
                channel_bits.push(bit as u8);
            }
        }
        debug_assert_eq!(channel_bits.len() % bits_per_symbol, 0);

        let mut scrambler = DataScrambler::new();
        let mut unknown_in_frame = 0;
        for label_bits in channel_bits.chunks_exact(bits_per_symbol) {
            let label = label_bits
                .iter()
                .fold(0usize, |acc, &b| (acc << 1) | b as usize);
            let point = match self.mode.mapping {
                Mapping::Psk8 => GRAY_ENCODE[label],
                Mapping::Qpsk => QPSK_MAP[label],
                Mapping::Bpsk => BPSK_MAP[label],
                Mapping::Walsh => unreachable!(),
            };
            out.push((point + scrambler.next_tribit()) % 8);

            unknown_in_frame += 1;
            if unknown_in_frame == self.mode.unknown_len {
                // Probe symbols are the scrambler output alone
                for _ in 0..self.mode.known_len {
                    out.push(scrambler.next_tribit());
                }
                unknown_in_frame = 0;
            }
        }
        debug_assert_eq!(unknown_in_frame, 0, "data must end on a frame boundary");
    }

    fn push_walsh_data(&self, payload: &[u8], out: &mut Vec<u8>) {
        let stream = self.wire_bits(payload);
        let mut scrambler = DataScrambler::new();
        let mut block_count = 0usize;

        for pair in stream.chunks_exact(2) {
            let dibit = ((pair[0] as usize) << 1) | pair[1] as usize;
            let index = TX_GRAY[dibit] as usize;

            block_count += 1;
            let is_mes = block_count == self.mode.mes_interval;
            if is_mes {
                block_count = 0;
            }

            for i in 0..WALSH_BLOCK_SYMBOLS {
                out.push((walsh_symbol(is_mes, index, i) + scrambler.next_tribit()) % 8);
            }
        }
    }

    fn pulse_shape_and_mix(&self, symbols: &[u8]) -> Vec<f32> {
        let lead = self.fir.len();
        let tail = self.fir.len();
        let total = lead + symbols.len() * self.sps + tail;

        // Impulse train scaled by the symbol length so the shaped eye comes
        // out near unit amplitude
        let mut impulses = vec![Complex32::new(0.0, 0.0); total];
        let gain = self.sps as f32;
        for (k, &s) in symbols.iter().enumerate() {
            impulses[lead + k * self.sps] = psk8(s) * gain;
        }

        let shaped = self.fir.filter_complex(&impulses);

        let mut nco = Nco::new(self.config.carrier_freq, self.config.sample_rate);
        let mut audio = nco.mix_up(&shaped);

        let peak = audio.iter().fold(0.0f32, |max, &v| max.max(v.abs()));
        if peak > f32::EPSILON {
            let scale = TX_PEAK / peak;
            for sample in audio.iter_mut() {
                *sample *= scale;
            }
        }
        audio
    }
}
