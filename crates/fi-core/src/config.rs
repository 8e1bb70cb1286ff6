//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! sub-configs for tool discovery, probing, transcoding, and reading. Every
//! section defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub probe: ProbeConfig,
    pub transcode: TranscodeConfig,
    pub reader: ReaderConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// String-based so the caller can read the file however it sees fit.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration strictly: a missing or unparsable file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        config.check()?;
        Ok(config)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.reader.subtitle_wait_ms > 1000 {
            warnings.push(format!(
                "reader.subtitle_wait_ms is {}; waits of a second or more stall the audio cadence",
                self.reader.subtitle_wait_ms
            ));
        }

        if self.probe.block_size < 4096 {
            warnings.push(format!(
                "probe.block_size is {} bytes; the prober may not find all streams",
                self.probe.block_size
            ));
        }

        for (name, path) in [
            ("ffmpeg_path", &self.tools.ffmpeg_path),
            ("ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "tools.{name} {} does not exist; falling back to PATH",
                        p.display()
                    ));
                }
            }
        }

        warnings
    }

    /// Reject configurations the reader cannot run with.
    pub fn check(&self) -> Result<()> {
        if self.reader.step_ms == 0 {
            return Err(Error::Validation("reader.step_ms must be positive".into()));
        }
        if self.reader.pump_chunk_size == 0 {
            return Err(Error::Validation(
                "reader.pump_chunk_size must be positive".into(),
            ));
        }
        if self.probe.block_size == 0 {
            return Err(Error::Validation("probe.block_size must be positive".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Overrides for external tool locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// How the source is probed before transcoding starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Number of leading source bytes handed to the prober.
    pub block_size: usize,
    /// Maximum time the prober may take.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            block_size: 8192 * 64,
            timeout_secs: 10,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Extra knobs passed through to the transcoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Output options applied to every transcoder output, before its format.
    pub extra_output_args: Vec<String>,
    /// Size of the transcoder's muxing queue, in packets.
    pub max_muxing_queue_size: u32,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            extra_output_args: Vec::new(),
            max_muxing_queue_size: 800_000,
        }
    }
}

/// Whether subtitle cues follow the audio clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CuePolicy {
    /// Hold each cue across the audio time window it covers. Only possible
    /// when audio is selected; sessions without audio pass cues through.
    #[default]
    Clocked,
    /// Emit cues as soon as they are parsed.
    PassThrough,
}

/// Interleaved reader tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Length of one step in milliseconds.
    pub step_ms: u64,
    /// Upper bound on how long a subtitle conduit may be waited on per step.
    pub subtitle_wait_ms: u64,
    /// Chunk size the pump copies source bytes in.
    pub pump_chunk_size: usize,
    /// How long to wait for the transcoder to open each output conduit.
    pub connect_timeout_secs: u64,
    pub cue_policy: CuePolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            step_ms: 1000,
            subtitle_wait_ms: 100,
            pump_chunk_size: 8192 * 64,
            connect_timeout_secs: 10,
            cue_policy: CuePolicy::Clocked,
        }
    }
}

impl ReaderConfig {
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    pub fn subtitle_wait(&self) -> Duration {
        Duration::from_millis(self.subtitle_wait_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
