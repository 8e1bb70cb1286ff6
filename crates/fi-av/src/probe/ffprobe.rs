//! FFprobe-based [`Prober`] implementation.
//!
//! Pipes the head block into `ffprobe -loglevel error -show_streams
//! -print_format json -` and maps each JSON stream record into a
//! [`StreamDescriptor`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use fi_core::{CodecKind, StreamDescriptor};

use super::Prober;
use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Default probe timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self {
            ffprobe_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a prober from a discovered registry.
    pub fn from_registry(registry: &ToolRegistry) -> fi_core::Result<Self> {
        Ok(Self::new(registry.ffprobe()?.to_path_buf()))
    }

    /// Set the maximum time ffprobe may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, head: &[u8]) -> fi_core::Result<Vec<StreamDescriptor>> {
        let output = ToolCommand::new(self.ffprobe_path.clone())
            .args([
                "-loglevel",
                "error",
                "-show_streams",
                "-print_format",
                "json",
                "-",
            ])
            .timeout(self.timeout)
            .stdin(head.to_vec())
            .execute()
            .await
            .map_err(|e| fi_core::Error::probe(e.to_string()))?;

        let json = String::from_utf8_lossy(&output.stdout);
        let streams = parse_probe_output(&json)?;
        tracing::info!(
            streams = streams.len(),
            head_bytes = head.len(),
            "probed source"
        );
        Ok(streams)
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<NumberOrString>,
    channels: Option<u32>,
    duration: Option<NumberOrString>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// ffprobe reports numeric fields such as `sample_rate` as strings; be
/// lenient and accept either.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse ffprobe's `-show_streams -print_format json` output.
///
/// A leading UTF-8 byte-order mark is ignored.
///
/// # Errors
///
/// Returns [`fi_core::Error::Probe`] if the text is not valid ffprobe JSON.
pub fn parse_probe_output(json: &str) -> fi_core::Result<Vec<StreamDescriptor>> {
    let json = json.strip_prefix('\u{feff}').unwrap_or(json);
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| fi_core::Error::probe(format!("ffprobe JSON parse error: {e}")))?;

    Ok(output.streams.into_iter().map(into_descriptor).collect())
}

fn into_descriptor(stream: FfprobeStream) -> StreamDescriptor {
    let kind = CodecKind::from_codec_type(stream.codec_type.as_deref().unwrap_or(""));

    let sample_rate = stream
        .sample_rate
        .as_ref()
        .and_then(NumberOrString::as_f64)
        .filter(|r| r.is_finite() && *r > 0.0 && *r <= f64::from(u32::MAX))
        .map(|r| r as u32);

    let reported_duration = stream
        .duration
        .as_ref()
        .and_then(NumberOrString::as_f64)
        .and_then(|d| Duration::try_from_secs_f64(d).ok());

    StreamDescriptor {
        index: stream.index,
        kind,
        codec_name: stream.codec_name,
        sample_rate,
        channels: stream.channels,
        reported_duration,
        tags: stream.tags,
    }
}
