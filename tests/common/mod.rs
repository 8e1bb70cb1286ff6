//! Shared helpers for integration tests.
//!
//! Provides fake probers for session construction tests and, when ffmpeg is
//! installed, a small generated media fixture with two audio streams and one
//! SubRip subtitle stream.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ffinput::{Prober, StreamDescriptor};

/// A prober that returns fixed descriptors and records how many head bytes
/// it was given.
#[derive(Debug, Default)]
pub struct FakeProber {
    streams: Vec<StreamDescriptor>,
    head_len: Mutex<Option<usize>>,
}

impl FakeProber {
    pub fn new(streams: Vec<StreamDescriptor>) -> Arc<Self> {
        Arc::new(Self {
            streams,
            head_len: Mutex::new(None),
        })
    }

    pub fn head_len(&self) -> Option<usize> {
        *self.head_len.lock().unwrap()
    }
}

#[async_trait]
impl Prober for FakeProber {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn probe(&self, head: &[u8]) -> fi_core::Result<Vec<StreamDescriptor>> {
        *self.head_len.lock().unwrap() = Some(head.len());
        Ok(self.streams.clone())
    }
}

/// A prober that always fails.
#[derive(Debug)]
pub struct FailingProber;

#[async_trait]
impl Prober for FailingProber {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn probe(&self, _head: &[u8]) -> fi_core::Result<Vec<StreamDescriptor>> {
        Err(fi_core::Error::probe("no streams found in head block"))
    }
}

/// A source file holding `len` arbitrary bytes.
pub fn source_file(len: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&vec![0x5a; len]).unwrap();
    file.flush().unwrap();
    file
}

/// Whether both ffmpeg and ffprobe are on `PATH`.
pub fn tools_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}

/// Text of the fixture's subtitle stream.
pub const FIXTURE_CUE: &str = "Hello";

/// Generate a three second Matroska file in `dir`.
///
/// Streams: 0 is 16 kHz mono audio, 1 is 48 kHz mono audio, 2 is a SubRip
/// subtitle showing [`FIXTURE_CUE`] from 0 to 2.5 s. Returns `None` when
/// ffmpeg is unavailable or fails.
pub fn media_fixture(dir: &Path) -> Option<PathBuf> {
    if !tools_available() {
        eprintln!("Skipping: ffmpeg/ffprobe not found on PATH");
        return None;
    }

    let subs = dir.join("subs.srt");
    std::fs::write(
        &subs,
        format!("1\n00:00:00,000 --> 00:00:02,500\n{FIXTURE_CUE}\n\n"),
    )
    .ok()?;

    let media = dir.join("fixture.mkv");
    let status = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error"])
        .args(["-f", "lavfi", "-i", "sine=frequency=440:sample_rate=16000:duration=3"])
        .args(["-f", "lavfi", "-i", "sine=frequency=880:sample_rate=48000:duration=3"])
        .arg("-i")
        .arg(&subs)
        .args(["-map", "0:a", "-map", "1:a", "-map", "2:s"])
        .args(["-c:a", "pcm_s16le", "-c:s", "srt"])
        .arg(&media)
        .status()
        .ok()?;

    if !status.success() {
        eprintln!("Skipping: ffmpeg could not generate the fixture");
        return None;
    }
    Some(media)
}
