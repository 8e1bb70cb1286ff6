//! Fixed-size frame reads over an audio conduit.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::block::{AudioFrameBlock, SAMPLE_BYTES};

/// Accumulates bytes from an audio conduit until one step's worth of frames
/// has arrived.
///
/// The partially filled buffer lives in the accumulator rather than in the
/// future reading it, so [`next_block`](Self::next_block) is cancellation
/// safe: dropping it mid-read loses nothing.
#[derive(Debug)]
pub struct FrameAccumulator<R> {
    reader: R,
    channels: usize,
    buf: Vec<u8>,
    filled: usize,
    finished: bool,
}

impl<R: AsyncRead + Unpin> FrameAccumulator<R> {
    /// Blocks of `frames` frames of `channels` interleaved `f32` samples.
    pub fn new(reader: R, channels: usize, frames: usize) -> Self {
        let channels = channels.max(1);
        Self {
            reader,
            channels,
            buf: vec![0; frames.max(1) * channels * SAMPLE_BYTES],
            filled: 0,
            finished: false,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Bytes in one full block.
    pub fn target_len(&self) -> usize {
        self.buf.len()
    }

    /// Bytes accumulated towards the next block.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Whether the conduit has reported end-of-data.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read until one block is complete.
    ///
    /// When the conduit ends mid-block the partial block is returned
    /// zero-padded to full size; `None` is returned once no bytes are left.
    pub async fn next_block(&mut self) -> std::io::Result<Option<AudioFrameBlock>> {
        while !self.finished && self.filled < self.buf.len() {
            let n = self.reader.read(&mut self.buf[self.filled..]).await?;
            if n == 0 {
                self.finished = true;
            }
            self.filled += n;
        }

        if self.filled == 0 {
            return Ok(None);
        }

        self.buf[self.filled..].fill(0);
        let block = AudioFrameBlock::from_le_bytes(self.channels, &self.buf);
        self.filled = 0;
        Ok(Some(block))
    }

    /// Read everything left on the conduit, including any partial block.
    pub async fn drain(&mut self) -> std::io::Result<AudioFrameBlock> {
        let mut bytes = self.buf[..self.filled].to_vec();
        self.filled = 0;
        if !self.finished {
            self.reader.read_to_end(&mut bytes).await?;
            self.finished = true;
        }
        Ok(AudioFrameBlock::from_le_bytes(self.channels, &bytes))
    }
}
