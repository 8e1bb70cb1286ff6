//! One-shot whole-file read.
//!
//! Instead of stepping, [`InterleavedReader::read_all`] drains every conduit
//! concurrently and returns the concatenated audio of each audio stream and
//! the cues of each subtitle stream, plus a per-tick cue lookup at the
//! unified rate.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::StreamExt;

use crate::block::AudioFrameBlock;
use crate::clock::duration_to_ticks;
use crate::cue::Cue;
use crate::reader::{InterleavedReader, Lane};

/// The complete content of one session.
#[derive(Debug, Clone)]
pub struct WholeFile {
    rate: Option<u32>,
    streams: Vec<WholeStream>,
}

/// The complete content of one selected stream.
#[derive(Debug, Clone)]
pub enum WholeStream {
    Audio {
        index: u32,
        /// Interleaved samples at the unified rate, frame-major.
        samples: AudioFrameBlock,
    },
    Subtitle {
        index: u32,
        cues: Vec<Arc<Cue>>,
        /// Per-tick lookup; only available when audio fixes a rate.
        timeline: Option<CueTimeline>,
    },
}

impl WholeFile {
    /// Unified sample rate; `None` without audio.
    pub fn rate(&self) -> Option<u32> {
        self.rate
    }

    /// Streams in selection order.
    pub fn streams(&self) -> &[WholeStream] {
        &self.streams
    }

    pub fn into_streams(self) -> Vec<WholeStream> {
        self.streams
    }

    /// Audio of the `n`th selected stream.
    pub fn audio(&self, n: usize) -> Option<&AudioFrameBlock> {
        match self.streams.get(n)? {
            WholeStream::Audio { samples, .. } => Some(samples),
            WholeStream::Subtitle { .. } => None,
        }
    }

    /// Cues of the `n`th selected stream.
    pub fn cues(&self, n: usize) -> Option<&[Arc<Cue>]> {
        match self.streams.get(n)? {
            WholeStream::Subtitle { cues, .. } => Some(cues),
            WholeStream::Audio { .. } => None,
        }
    }

    /// Per-tick lookup of the `n`th selected stream.
    pub fn timeline(&self, n: usize) -> Option<&CueTimeline> {
        match self.streams.get(n)? {
            WholeStream::Subtitle { timeline, .. } => timeline.as_ref(),
            WholeStream::Audio { .. } => None,
        }
    }
}

/// Which cue, if any, is shown at each sample tick.
///
/// Cues are laid down in parse order; a later cue overwrites the ticks of
/// any earlier one it overlaps.
#[derive(Debug, Clone)]
pub struct CueTimeline {
    len: u64,
    /// Disjoint `[start, end)` tick spans keyed by start.
    spans: BTreeMap<u64, (u64, Arc<Cue>)>,
}

impl CueTimeline {
    /// Lay `cues` out over `len` ticks at `rate` Hz.
    ///
    /// Each cue covers ticks `[begin * rate, end * rate)`, clipped to `len`.
    pub fn build<'a>(cues: impl IntoIterator<Item = &'a Arc<Cue>>, rate: u32, len: u64) -> Self {
        let mut timeline = Self {
            len,
            spans: BTreeMap::new(),
        };
        for cue in cues {
            let start = duration_to_ticks(cue.begin(), rate);
            let end = duration_to_ticks(cue.end(), rate).min(len);
            if start < end {
                timeline.assign(start, end, cue);
            }
        }
        timeline
    }

    fn assign(&mut self, start: u64, end: u64, cue: &Arc<Cue>) {
        let overlapping: Vec<u64> = self
            .spans
            .range(..end)
            .rev()
            .take_while(|(_, (span_end, _))| *span_end > start)
            .map(|(&s, _)| s)
            .collect();

        for s in overlapping {
            if let Some((e, old)) = self.spans.remove(&s) {
                if s < start {
                    self.spans.insert(s, (start, Arc::clone(&old)));
                }
                if e > end {
                    self.spans.insert(end, (e, old));
                }
            }
        }
        self.spans.insert(start, (end, Arc::clone(cue)));
    }

    /// Number of ticks covered.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The cue shown at `tick`.
    pub fn at(&self, tick: u64) -> Option<&Arc<Cue>> {
        let (_, (end, cue)) = self.spans.range(..=tick).next_back()?;
        (tick < *end).then_some(cue)
    }

    /// Non-empty spans in tick order: `(start, end, cue)`.
    pub fn spans(&self) -> impl Iterator<Item = (u64, u64, &Arc<Cue>)> + '_ {
        self.spans.iter().map(|(&s, (e, cue))| (s, *e, cue))
    }
}

impl InterleavedReader {
    /// Drain every remaining byte of every conduit.
    ///
    /// Conduits are read concurrently: the transcoder interleaves its
    /// outputs and would stall if any one of them went unread.
    ///
    /// # Errors
    ///
    /// A pump failure or a corrupt subtitle header.
    pub async fn read_all(mut self, duration_cap: Option<Duration>) -> fi_core::Result<WholeFile> {
        self.check_pump()?;
        let rate = self.rate();

        let drained = join_all(self.lanes.iter_mut().map(drain_lane)).await;
        let drained = drained.into_iter().collect::<fi_core::Result<Vec<_>>>()?;

        self.check_pump()?;

        let len = rate.map(|rate| match duration_cap {
            Some(cap) => duration_to_ticks(cap, rate),
            None => drained
                .iter()
                .filter_map(|d| match d {
                    WholeStream::Audio { samples, .. } => Some(samples.frames() as u64),
                    WholeStream::Subtitle { .. } => None,
                })
                .max()
                .unwrap_or(0),
        });

        let streams = drained
            .into_iter()
            .map(|stream| match (stream, rate.zip(len)) {
                (WholeStream::Subtitle { index, cues, .. }, Some((rate, len))) => {
                    let timeline = CueTimeline::build(&cues, rate, len);
                    WholeStream::Subtitle {
                        index,
                        cues,
                        timeline: Some(timeline),
                    }
                }
                (stream, _) => stream,
            })
            .collect();

        tracing::info!(rate = ?rate, ticks = ?len, "whole session read");
        Ok(WholeFile { rate, streams })
    }
}

async fn drain_lane(lane: &mut Lane) -> fi_core::Result<WholeStream> {
    match lane {
        Lane::Audio(audio) => {
            let samples = if audio.open {
                match audio.frames.drain().await {
                    Ok(samples) => samples,
                    Err(e) => {
                        tracing::warn!(stream = audio.index, "audio conduit failed, closing: {e}");
                        AudioFrameBlock::from_le_bytes(audio.frames.channels(), &[])
                    }
                }
            } else {
                AudioFrameBlock::from_le_bytes(audio.frames.channels(), &[])
            };
            audio.open = false;
            Ok(WholeStream::Audio {
                index: audio.index,
                samples,
            })
        }
        Lane::Subtitle(sub) => {
            let mut cues: Vec<Arc<Cue>> = sub.held.take().into_iter().collect();
            while sub.open {
                match sub.framed.next().await {
                    Some(Ok(cue)) => cues.push(Arc::new(cue)),
                    Some(Err(e)) if e.is_fatal_for_subtitle_lane() => return Err(e),
                    Some(Err(e)) => {
                        tracing::warn!(stream = sub.index, "subtitle conduit failed, closing: {e}");
                        sub.open = false;
                    }
                    None => sub.open = false,
                }
            }
            tracing::debug!(stream = sub.index, cues = cues.len(), "subtitle conduit drained");
            Ok(WholeStream::Subtitle {
                index: sub.index,
                cues,
                timeline: None,
            })
        }
    }
}
