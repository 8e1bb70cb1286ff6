//! # fi-av
//!
//! External tool plumbing for ffinput sessions.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with stdin and
//!   timeout support for one-shot external processes.
//! - **Probing** ([`Prober`], [`FfprobeProber`]) -- turn the head of a source
//!   into [`fi_core::StreamDescriptor`]s.
//! - **Transcoding** ([`TranscoderCommand`], [`Transcoder`]) -- build the
//!   demultiplexing ffmpeg command line and spawn it with one TCP conduit per
//!   selected stream.

pub mod command;
pub mod probe;
pub mod tools;
pub mod transcode;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use probe::{FfprobeProber, Prober};
pub use tools::{ToolInfo, ToolRegistry};
pub use transcode::{ConduitListener, Transcoder, TranscoderCommand};
