//! Media-domain enums for stream kinds and caption dialects.
//!
//! All enums serialize in lowercase and implement `Display` manually for
//! consistent string representation.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// CodecKind
// ---------------------------------------------------------------------------

/// The kind of a probed stream, as reported by the prober's `codec_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    Audio,
    Subtitle,
    Video,
    Data,
    Attachment,
    #[serde(other)]
    Unknown,
}

impl CodecKind {
    /// Map a raw `codec_type` string to a kind.
    pub fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "audio" => Self::Audio,
            "subtitle" => Self::Subtitle,
            "video" => Self::Video,
            "data" => Self::Data,
            "attachment" => Self::Attachment,
            _ => Self::Unknown,
        }
    }

    /// Whether the reader can produce data for streams of this kind.
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Audio | Self::Subtitle)
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Subtitle => write!(f, "subtitle"),
            Self::Video => write!(f, "video"),
            Self::Data => write!(f, "data"),
            Self::Attachment => write!(f, "attachment"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// SubtitleDialect
// ---------------------------------------------------------------------------

/// Textual caption dialect carried on a subtitle conduit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleDialect {
    #[serde(rename = "webvtt")]
    WebVtt,
    #[serde(rename = "subrip")]
    SubRip,
}

impl SubtitleDialect {
    /// Pick the dialect the transcoder should emit for a source codec.
    ///
    /// SubRip sources stay SubRip; every other text codec is converted to
    /// WebVTT.
    pub fn for_codec(codec_name: Option<&str>) -> Self {
        match codec_name {
            Some("subrip") | Some("srt") => Self::SubRip,
            _ => Self::WebVtt,
        }
    }

    /// The ffmpeg muxer name producing this dialect.
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::WebVtt => "webvtt",
            Self::SubRip => "srt",
        }
    }

    /// The signature the first line of the conduit must contain, if any.
    pub fn signature(&self) -> Option<&'static str> {
        match self {
            Self::WebVtt => Some("WEBVTT"),
            Self::SubRip => None,
        }
    }

    /// Decimal separator between seconds and milliseconds.
    pub fn millis_separator(&self) -> char {
        match self {
            Self::WebVtt => '.',
            Self::SubRip => ',',
        }
    }
}

impl fmt::Display for SubtitleDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebVtt => write!(f, "WebVTT"),
            Self::SubRip => write!(f, "SubRip"),
        }
    }
}
