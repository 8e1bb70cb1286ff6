//! Stream descriptors produced by probing a source.
//!
//! A [`StreamDescriptor`] is created from probe output, handed to the
//! selection predicate, and read by every later stage of the session.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::media::{CodecKind, SubtitleDialect};

/// Tag carrying the total stream duration as `H:MM:SS(.fraction)`.
pub const DURATION_TAG: &str = "DURATION";

/// Metadata for a single probed substream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Ordinal of the stream within the probed source.
    pub index: u32,
    /// What kind of data the stream carries.
    pub kind: CodecKind,
    /// Codec short name (e.g. "aac", "subrip"), if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec_name: Option<String>,
    /// Sample rate in Hz (audio only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    /// Number of interleaved channels (audio only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
    /// Stream-level duration reported by the prober, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_duration: Option<Duration>,
    /// Free-form container tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl StreamDescriptor {
    /// Create a descriptor with only an index and a kind set.
    pub fn new(index: u32, kind: CodecKind) -> Self {
        Self {
            index,
            kind,
            codec_name: None,
            sample_rate: None,
            channels: None,
            reported_duration: None,
            tags: BTreeMap::new(),
        }
    }

    /// Builder-style helper for audio descriptors.
    pub fn audio(index: u32, sample_rate: u32, channels: u32) -> Self {
        Self {
            sample_rate: Some(sample_rate),
            channels: Some(channels),
            ..Self::new(index, CodecKind::Audio)
        }
    }

    /// Builder-style helper for subtitle descriptors.
    pub fn subtitle(index: u32, codec_name: &str) -> Self {
        Self {
            codec_name: Some(codec_name.to_string()),
            ..Self::new(index, CodecKind::Subtitle)
        }
    }

    /// Attach a tag, returning the updated descriptor.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn is_audio(&self) -> bool {
        self.kind == CodecKind::Audio
    }

    pub fn is_subtitle(&self) -> bool {
        self.kind == CodecKind::Subtitle
    }

    /// Look up a tag by key, ignoring ASCII case.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Total duration of the stream.
    ///
    /// Prefers the `DURATION` tag (Matroska writes one per stream, sometimes
    /// with a language suffix such as `DURATION-eng`) and falls back to the
    /// prober's stream-level duration.
    pub fn duration(&self) -> Option<Duration> {
        let tagged = self.tag(DURATION_TAG).or_else(|| {
            self.tags
                .iter()
                .find(|(k, _)| {
                    k.get(..DURATION_TAG.len())
                        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(DURATION_TAG))
                        && k.as_bytes().get(DURATION_TAG.len()) == Some(&b'-')
                })
                .map(|(_, v)| v.as_str())
        });

        tagged
            .and_then(parse_duration_tag)
            .or(self.reported_duration)
    }

    /// Dialect the transcoder should produce for this subtitle stream.
    pub fn subtitle_dialect(&self) -> SubtitleDialect {
        SubtitleDialect::for_codec(self.codec_name.as_deref())
    }
}

/// Parse a `H:MM:SS(.fraction)` duration tag.
///
/// Fewer fields are accepted too (`MM:SS.f`, `SS.f`), counted from the
/// right.
pub fn parse_duration_tag(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let fields: Vec<&str> = value.split(':').collect();
    if fields.len() > 3 {
        return None;
    }

    let mut secs = 0.0f64;
    for field in &fields {
        let v: f64 = field.trim().parse().ok()?;
        if !v.is_finite() || v < 0.0 {
            return None;
        }
        secs = secs * 60.0 + v;
    }

    Duration::try_from_secs_f64(secs).ok()
}

/// Apply a selection predicate to probed streams, preserving probe order.
///
/// # Errors
///
/// Returns [`Error::NoStreamsSelected`] when the predicate rejects every
/// stream.
pub fn select_streams<F>(
    streams: Vec<StreamDescriptor>,
    mut predicate: F,
) -> Result<Vec<StreamDescriptor>>
where
    F: FnMut(&StreamDescriptor) -> bool,
{
    let selected: Vec<StreamDescriptor> = streams.into_iter().filter(|s| predicate(s)).collect();

    if selected.is_empty() {
        return Err(Error::NoStreamsSelected);
    }

    tracing::debug!(
        selected = ?selected.iter().map(|s| s.index).collect::<Vec<_>>(),
        "streams selected"
    );

    Ok(selected)
}
