//! Values produced by the reader.

use std::sync::Arc;
use std::time::Duration;

use bytes::Buf;

use crate::cue::Cue;

/// Size of one little-endian `f32` sample on an audio conduit.
pub const SAMPLE_BYTES: usize = 4;

/// A fixed-shape buffer of interleaved samples: one row per frame, one column
/// per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrameBlock {
    channels: usize,
    samples: Vec<f32>,
}

impl AudioFrameBlock {
    /// Decode interleaved little-endian `f32` samples.
    ///
    /// A trailing partial sample or frame is zero-padded.
    pub fn from_le_bytes(channels: usize, mut bytes: &[u8]) -> Self {
        let channels = channels.max(1);
        let count = bytes.len().div_ceil(SAMPLE_BYTES).div_ceil(channels) * channels;
        let mut samples = Vec::with_capacity(count);
        while bytes.remaining() >= SAMPLE_BYTES {
            samples.push(bytes.get_f32_le());
        }
        if bytes.has_remaining() {
            let mut last = [0u8; SAMPLE_BYTES];
            last[..bytes.len()].copy_from_slice(bytes);
            samples.push(f32::from_le_bytes(last));
        }
        samples.resize(count, 0.0);
        Self { channels, samples }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of sample frames (rows).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// All samples, frame-major.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// One frame: a sample per channel.
    pub fn frame(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.channels)?;
        self.samples.get(start..start + self.channels)
    }

    /// The samples of channel `c`, in frame order.
    pub fn channel(&self, c: usize) -> impl Iterator<Item = f32> + '_ {
        let samples = if c < self.channels { &self.samples[c..] } else { &[][..] };
        samples.iter().step_by(self.channels).copied()
    }
}

/// The content of one stream's position in a [`Block`].
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Audio(AudioFrameBlock),
    Cue(Arc<Cue>),
}

impl Slot {
    pub fn as_audio(&self) -> Option<&AudioFrameBlock> {
        match self {
            Slot::Audio(a) => Some(a),
            Slot::Cue(_) => None,
        }
    }

    pub fn as_cue(&self) -> Option<&Cue> {
        match self {
            Slot::Cue(c) => Some(c),
            Slot::Audio(_) => None,
        }
    }
}

/// One aligned step: a slot per selected stream, in selection order.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    position: Option<Duration>,
    slots: Vec<Option<Slot>>,
}

impl Block {
    pub fn new(position: Option<Duration>, slots: Vec<Option<Slot>>) -> Self {
        Self { position, slots }
    }

    /// Virtual time at the start of the step; `None` without audio.
    pub fn position(&self) -> Option<Duration> {
        self.position
    }

    pub fn slots(&self) -> &[Option<Slot>] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<Option<Slot>> {
        self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot of the `n`th selected stream.
    pub fn get(&self, n: usize) -> Option<&Slot> {
        self.slots.get(n).and_then(Option::as_ref)
    }

    pub fn audio(&self, n: usize) -> Option<&AudioFrameBlock> {
        self.get(n).and_then(Slot::as_audio)
    }

    pub fn cue(&self, n: usize) -> Option<&Cue> {
        self.get(n).and_then(Slot::as_cue)
    }

    /// Whether every slot is `None`.
    pub fn is_vacant(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}
