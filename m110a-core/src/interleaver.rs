//! Helical block interleaver and its streaming wrappers.
//!
//! The transmit interleaver loads a block by walking rows with stride
//! `row_inc` and fetches it by walking rows singly while striding columns
//! by `col_inc`. The receive side runs the two recurrences in the opposite
//! roles: its load uses the transmit fetch walk and its fetch the transmit
//! load walk. Swapping them still yields a bijection, so a matched TX/RX
//! pair round-trips either way, but only the correct assignment lines up
//! with a real transmitter.
//!
//! `(row_inc, col_inc) == (0, 0)` short-circuits both phases to a copy.

use ndarray::Array2;

use crate::mode::InterleaverParams;

/// Fixed-size helical block interleaver.
#[derive(Debug, Clone)]
pub struct Interleaver {
    params: InterleaverParams,
    matrix: Array2<i8>,
}

impl Interleaver {
    pub fn new(params: InterleaverParams) -> Self {
        Self {
            params,
            matrix: Array2::zeros((params.rows, params.cols)),
        }
    }

    pub fn params(&self) -> &InterleaverParams {
        &self.params
    }

    pub fn block_size(&self) -> usize {
        self.params.block_size()
    }

    pub fn is_passthrough(&self) -> bool {
        self.params.is_passthrough()
    }

    /// Transmit-side permutation of one block.
    pub fn interleave(&mut self, input: &[i8]) -> Vec<i8> {
        assert_eq!(input.len(), self.block_size(), "interleaver block size");
        if self.is_passthrough() {
            return input.to_vec();
        }
        let (rows, cols) = (self.params.rows, self.params.cols);

        self.matrix.fill(0);
        let (mut row, mut col) = (0usize, 0usize);
        for &value in input {
            self.matrix[[row, col]] = value;
            row = (row + self.params.row_inc) % rows;
            if row == 0 {
                col = (col + 1) % cols;
            }
        }

        let mut output = Vec::with_capacity(self.block_size());
        let (mut row, mut col, mut col_last) = (0usize, 0usize, 0usize);
        for _ in 0..self.block_size() {
            output.push(self.matrix[[row, col]]);
            row = (row + 1) % rows;
            col = (col + self.params.col_inc) % cols;
            if row == 0 {
                col = (col_last + 1) % cols;
                col_last = col;
            }
        }
        output
    }

    /// Receive-side inverse permutation of one block.
    pub fn deinterleave(&mut self, input: &[i8]) -> Vec<i8> {
        assert_eq!(input.len(), self.block_size(), "deinterleaver block size");
        if self.is_passthrough() {
            return input.to_vec();
        }
        let (rows, cols) = (self.params.rows, self.params.cols);

        self.matrix.fill(0);
        let (mut row, mut col, mut col_last) = (0usize, 0usize, 0usize);
        for &value in input {
            self.matrix[[row, col]] = value;
            row = (row + 1) % rows;
            col = (col + self.params.col_inc) % cols;
            if row == 0 {
                col = (col_last + 1) % cols;
                col_last = col;
            }
        }

        let mut output = Vec::with_capacity(self.block_size());
        let (mut row, mut col) = (0usize, 0usize);
        for _ in 0..self.block_size() {
            output.push(self.matrix[[row, col]]);
            row = (row + self.params.row_inc) % rows;
            if row == 0 {
                col = (col + 1) % cols;
            }
        }
        output
    }
}

/// Buffers a bit stream into whole blocks for the transmit interleaver.
#[derive(Debug, Clone)]
pub struct StreamingInterleaver {
    inner: Interleaver,
    buffer: Vec<i8>,
    blocks: usize,
}

impl StreamingInterleaver {
    pub fn new(params: InterleaverParams) -> Self {
        Self {
            inner: Interleaver::new(params),
            buffer: Vec::new(),
            blocks: 0,
        }
    }

    pub fn block_size(&self) -> usize {
        self.inner.block_size()
    }

    /// Append input and interleave every complete block.
    pub fn process(&mut self, input: &[i8]) -> Vec<i8> {
        self.buffer.extend_from_slice(input);
        let block = self.inner.block_size();
        let mut output = Vec::new();
        while self.buffer.len() >= block {
            let chunk: Vec<i8> = self.buffer.drain(..block).collect();
            output.extend(self.inner.interleave(&chunk));
            self.blocks += 1;
        }
        output
    }

    /// Pad any pending bits with zeros to a whole block and interleave it.
    pub fn flush(&mut self) -> Vec<i8> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        self.buffer.resize(self.inner.block_size(), 0);
        let chunk = std::mem::take(&mut self.buffer);
        self.blocks += 1;
        self.inner.interleave(&chunk)
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn block_count(&self) -> usize {
        self.blocks
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.blocks = 0;
    }
}

/// Buffers received soft bits into whole blocks for the deinterleaver.
#[derive(Debug, Clone)]
pub struct StreamingDeinterleaver {
    inner: Interleaver,
    buffer: Vec<i8>,
    blocks: usize,
}

impl StreamingDeinterleaver {
    pub fn new(params: InterleaverParams) -> Self {
        Self {
            inner: Interleaver::new(params),
            buffer: Vec::new(),
            blocks: 0,
        }
    }

    pub fn block_size(&self) -> usize {
        self.inner.block_size()
    }

    pub fn process(&mut self, input: &[i8]) -> Vec<i8> {
        self.buffer.extend_from_slice(input);
        let block = self.inner.block_size();
        let mut output = Vec::new();
        while self.buffer.len() >= block {
            let chunk: Vec<i8> = self.buffer.drain(..block).collect();
            output.extend(self.inner.deinterleave(&chunk));
            self.blocks += 1;
        }
        output
    }

    /// Zero-pad a trailing partial block and deinterleave it. The caller
    /// should treat output produced this way as degraded.
    pub fn flush(&mut self) -> Vec<i8> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        self.buffer.resize(self.inner.block_size(), 0);
        let chunk = std::mem::take(&mut self.buffer);
        self.blocks += 1;
        self.inner.deinterleave(&chunk)
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn block_count(&self) -> usize {
        self.blocks
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.blocks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ModeId;

    fn ramp(n: usize) -> Vec<i8> {
        (0..n).map(|i| (i % 255) as i8).collect()
    }

    #[test]
    fn interleave_then_deinterleave_is_identity_for_every_mode() {
        for id in ModeId::all() {
            let params = id.params().interleaver;
            let mut il = Interleaver::new(params);
            let input = ramp(params.block_size());
            let wire = il.interleave(&input);
            let output = il.deinterleave(&wire);
            assert_eq!(output, input, "{}", id);
        }
    }

    #[test]
    fn interleave_actually_permutes() {
        let params = ModeId::M2400S.params().interleaver;
        let mut il = Interleaver::new(params);
        let input = ramp(params.block_size());
        assert_ne!(il.interleave(&input), input);
    }

    #[test]
    fn passthrough_copies() {
        let params = ModeId::M4800S.params().interleaver;
        assert!(params.is_passthrough());
        let mut il = Interleaver::new(params);
        let input = ramp(params.block_size());
        assert_eq!(il.interleave(&input), input);
        assert_eq!(il.deinterleave(&input), input);
    }

    #[test]
    fn streaming_emits_only_whole_blocks() {
        let params = ModeId::M600S.params().interleaver;
        let block = params.block_size();
        let mut si = StreamingInterleaver::new(params);

        let input = ramp(block + block / 2);
        let first = si.process(&input);
        assert_eq!(first.len(), block);
        assert_eq!(si.pending(), block / 2);

        let flushed = si.flush();
        assert_eq!(flushed.len(), block);
        assert_eq!(si.pending(), 0);
        assert_eq!(si.block_count(), 2);
    }

    #[test]
    fn streaming_round_trip_with_padded_tail() {
        let params = ModeId::M1200S.params().interleaver;
        let block = params.block_size();
        let payload = ramp(2 * block + 100);

        let mut si = StreamingInterleaver::new(params);
        let mut wire = si.process(&payload);
        wire.extend(si.flush());

        let mut sd = StreamingDeinterleaver::new(params);
        let recovered = sd.process(&wire);
        assert_eq!(recovered.len(), 3 * block);
        assert_eq!(&recovered[..payload.len()], &payload[..]);
        assert!(recovered[payload.len()..].iter().all(|&b| b == 0));
    }
}
