//! Session planning from the selected streams.
//!
//! A [`StreamPlan`] fixes everything the transcoder and the reader must agree
//! on before any process is spawned: the role of every selected stream, the
//! unified sample rate, and the duration cap.

use std::time::Duration;

use serde::Serialize;

use crate::descriptor::StreamDescriptor;
use crate::error::{Error, Result};
use crate::media::{CodecKind, SubtitleDialect};

/// How a selected stream is delivered by the transcoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum StreamRole {
    /// Raw interleaved little-endian `f32` samples at the unified rate.
    Audio { channels: u32 },
    /// Caption text in the given dialect.
    Subtitle { dialect: SubtitleDialect },
}

/// A selected stream together with its delivery role.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStream {
    pub descriptor: StreamDescriptor,
    pub role: StreamRole,
}

/// The validated layout of one reader session.
#[derive(Debug, Clone, Serialize)]
pub struct StreamPlan {
    streams: Vec<PlannedStream>,
    unified_rate: Option<u32>,
    duration_cap: Option<Duration>,
}

impl StreamPlan {
    /// Plan a session from streams that passed selection.
    ///
    /// # Errors
    ///
    /// - [`Error::NoStreamsSelected`] if `selected` is empty.
    /// - [`Error::UnsupportedStream`] if any stream is not audio or subtitle.
    /// - [`Error::Probe`] if an audio stream lacks a usable sample rate or
    ///   channel count.
    pub fn new(selected: Vec<StreamDescriptor>) -> Result<Self> {
        if selected.is_empty() {
            return Err(Error::NoStreamsSelected);
        }

        let mut streams = Vec::with_capacity(selected.len());
        for descriptor in selected {
            let role = match descriptor.kind {
                CodecKind::Audio => {
                    match descriptor.sample_rate {
                        Some(rate) if rate > 0 => {}
                        _ => {
                            return Err(Error::probe(format!(
                                "audio stream {} has no sample rate",
                                descriptor.index
                            )))
                        }
                    }
                    let channels = match descriptor.channels {
                        Some(c) if c >= 1 => c,
                        _ => {
                            return Err(Error::probe(format!(
                                "audio stream {} has no channel count",
                                descriptor.index
                            )))
                        }
                    };
                    StreamRole::Audio { channels }
                }
                CodecKind::Subtitle => StreamRole::Subtitle {
                    dialect: descriptor.subtitle_dialect(),
                },
                other => return Err(Error::unsupported_stream(descriptor.index, other)),
            };
            streams.push(PlannedStream { descriptor, role });
        }

        let audio: Vec<&StreamDescriptor> = streams
            .iter()
            .filter(|s| matches!(s.role, StreamRole::Audio { .. }))
            .map(|s| &s.descriptor)
            .collect();

        // Lower-rate streams are upsampled by the transcoder.
        let unified_rate = audio.iter().filter_map(|d| d.sample_rate).max();

        // The shortest audio stream bounds the session so the transcoder never
        // blocks writing to a conduit nobody reads any more.
        let duration_cap = audio.iter().filter_map(|d| d.duration()).min();

        Ok(Self {
            streams,
            unified_rate,
            duration_cap,
        })
    }

    /// Planned streams in selection order.
    pub fn streams(&self) -> &[PlannedStream] {
        &self.streams
    }

    /// Number of selected streams.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Maximum sample rate among the selected audio streams.
    pub fn unified_rate(&self) -> Option<u32> {
        self.unified_rate
    }

    /// Minimum known duration among the selected audio streams.
    pub fn duration_cap(&self) -> Option<Duration> {
        self.duration_cap
    }

    pub fn audio_count(&self) -> usize {
        self.streams
            .iter()
            .filter(|s| matches!(s.role, StreamRole::Audio { .. }))
            .count()
    }

    pub fn subtitle_count(&self) -> usize {
        self.streams.len() - self.audio_count()
    }

    pub fn has_audio(&self) -> bool {
        self.unified_rate.is_some()
    }

    /// Whether both audio and subtitle streams are selected.
    pub fn needs_muxing(&self) -> bool {
        self.audio_count() > 0 && self.subtitle_count() > 0
    }

    /// Number of frames one step of `step` length spans at the unified rate.
    ///
    /// Rounds up and never returns less than one frame. `None` without audio.
    pub fn frames_per_step(&self, step: Duration) -> Option<usize> {
        self.unified_rate.map(|rate| frames_for(step, rate))
    }
}

/// Frames covering `span` at `rate`, rounded up, at least one.
pub fn frames_for(span: Duration, rate: u32) -> usize {
    let nanos = span.as_nanos() * u128::from(rate);
    let frames = nanos.div_ceil(1_000_000_000);
    usize::try_from(frames).unwrap_or(usize::MAX).max(1)
}
