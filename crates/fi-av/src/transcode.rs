//! The demultiplexing ffmpeg process.
//!
//! One ffmpeg invocation reads the raw source from its stdin and writes every
//! selected stream to its own output. Each output is a TCP connection back to
//! a listener bound here on the loopback interface, so every stream gets a
//! conduit the reader owns exclusively:
//!
//! ```text
//! source ──stdin──▶ ffmpeg ──tcp──▶ conduit 0 (f32le)
//!                          ──tcp──▶ conduit 1 (webvtt)
//!                          ──tcp──▶ ...
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, ChildStdin, Command};

use fi_core::config::TranscodeConfig;
use fi_core::{StreamPlan, StreamRole};

const TOOL: &str = "ffmpeg";

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Builds the ffmpeg argument list for a [`StreamPlan`].
#[derive(Debug, Clone, Copy)]
pub struct TranscoderCommand<'a> {
    plan: &'a StreamPlan,
    config: &'a TranscodeConfig,
}

impl<'a> TranscoderCommand<'a> {
    pub fn new(plan: &'a StreamPlan, config: &'a TranscodeConfig) -> Self {
        Self { plan, config }
    }

    /// Arguments for one output per planned stream, the `n`th stream writing
    /// to `tcp://127.0.0.1:<ports[n]>`.
    ///
    /// # Errors
    ///
    /// Returns [`fi_core::Error::Internal`] if `ports` does not have one entry
    /// per planned stream.
    pub fn args(&self, ports: &[u16]) -> fi_core::Result<Vec<String>> {
        if ports.len() != self.plan.len() {
            return Err(fi_core::Error::Internal(format!(
                "{} conduit ports for {} planned streams",
                ports.len(),
                self.plan.len()
            )));
        }

        let mut args: Vec<String> = ["-loglevel", "quiet", "-nostdin"]
            .into_iter()
            .map(String::from)
            .collect();

        if let Some(cap) = self.plan.duration_cap() {
            args.push("-t".into());
            args.push(format!("{:.3}", cap.as_secs_f64()));
        }

        args.extend(["-i".into(), "pipe:0".into()]);
        args.extend([
            "-max_muxing_queue_size".into(),
            self.config.max_muxing_queue_size.to_string(),
            "-max_interleave_delta".into(),
            "0".into(),
        ]);

        for (stream, port) in self.plan.streams().iter().zip(ports) {
            args.push("-map".into());
            args.push(format!("0:{}", stream.descriptor.index));
            args.extend(self.config.extra_output_args.iter().cloned());

            match stream.role {
                StreamRole::Audio { .. } => {
                    if let Some(rate) = self.plan.unified_rate() {
                        args.push("-ar".into());
                        args.push(rate.to_string());
                    }
                    args.extend(["-f".into(), "f32le".into()]);
                }
                StreamRole::Subtitle { dialect } => {
                    args.extend(["-f".into(), dialect.muxer().into()]);
                }
            }

            args.push(format!("tcp://{}:{port}", Ipv4Addr::LOCALHOST));
        }

        Ok(args)
    }
}

// ---------------------------------------------------------------------------
// Conduit listeners
// ---------------------------------------------------------------------------

/// One loopback listener per planned stream, in plan order.
#[derive(Debug)]
pub struct ConduitListener {
    listeners: Vec<TcpListener>,
}

impl ConduitListener {
    /// Bind `count` listeners on ephemeral loopback ports.
    pub async fn bind(count: usize) -> fi_core::Result<Self> {
        let mut listeners = Vec::with_capacity(count);
        for _ in 0..count {
            let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
            let listener = TcpListener::bind(addr).await.map_err(|e| {
                fi_core::Error::Internal(format!("failed to bind conduit listener: {e}"))
            })?;
            listeners.push(listener);
        }
        Ok(Self { listeners })
    }

    /// Ports the transcoder must connect to, in plan order.
    pub fn ports(&self) -> fi_core::Result<Vec<u16>> {
        self.listeners
            .iter()
            .map(|l| -> fi_core::Result<u16> { Ok(l.local_addr()?.port()) })
            .collect()
    }

    /// Accept exactly one connection on every listener.
    ///
    /// Each accept may take at most `timeout`. The listeners are dropped once
    /// every conduit is open.
    pub async fn accept_all(self, timeout: Duration) -> fi_core::Result<Vec<TcpStream>> {
        let mut conduits = Vec::with_capacity(self.listeners.len());
        for (n, listener) in self.listeners.into_iter().enumerate() {
            let (stream, peer) = tokio::time::timeout(timeout, listener.accept())
                .await
                .map_err(|_| {
                    fi_core::Error::tool(
                        TOOL,
                        format!("conduit {n} not opened within {timeout:?}"),
                    )
                })??;
            tracing::debug!(conduit = n, %peer, "conduit connected");
            conduits.push(stream);
        }
        Ok(conduits)
    }
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

/// A running transcoder that has not yet opened its output conduits.
#[derive(Debug)]
pub struct Transcoder {
    child: Child,
    listener: Option<ConduitListener>,
}

impl Transcoder {
    /// Bind the conduit listeners and start ffmpeg for `plan`.
    ///
    /// Returns the process together with its stdin, which the caller feeds
    /// with the raw source. The process is killed if the [`Transcoder`] is
    /// dropped.
    pub async fn spawn(
        ffmpeg: &Path,
        plan: &StreamPlan,
        config: &TranscodeConfig,
    ) -> fi_core::Result<(Self, ChildStdin)> {
        let listener = ConduitListener::bind(plan.len()).await?;
        let args = TranscoderCommand::new(plan, config).args(&listener.ports()?)?;

        tracing::debug!(args = ?args, "spawning transcoder");

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| fi_core::Error::tool(TOOL, format!("failed to spawn: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| fi_core::Error::tool(TOOL, "missing stdin pipe"))?;

        tracing::info!(pid = child.id(), outputs = plan.len(), "transcoder started");

        Ok((
            Self {
                child,
                listener: Some(listener),
            },
            stdin,
        ))
    }

    /// Wait until the transcoder has opened every output conduit.
    ///
    /// Must run while the transcoder's stdin is being fed: ffmpeg only opens
    /// its outputs after it has read the source headers.
    ///
    /// # Errors
    ///
    /// Returns [`fi_core::Error::Tool`] if the process exits first, if any
    /// conduit is not opened within `timeout`, or if called twice.
    pub async fn connect(&mut self, timeout: Duration) -> fi_core::Result<Vec<TcpStream>> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| fi_core::Error::tool(TOOL, "conduits already connected"))?;

        tokio::select! {
            conduits = listener.accept_all(timeout) => conduits,
            status = self.child.wait() => {
                let status = status?;
                Err(fi_core::Error::tool(
                    TOOL,
                    format!("exited with status {status} before opening its outputs"),
                ))
            }
        }
    }

    /// OS process id, while the process is running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> fi_core::Result<ExitStatus> {
        Ok(self.child.wait().await?)
    }

    /// Kill the process and reap it.
    pub async fn kill(&mut self) -> fi_core::Result<()> {
        Ok(self.child.kill().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fi_core::StreamDescriptor;
    use std::path::PathBuf;

    fn av_plan() -> StreamPlan {
        StreamPlan::new(vec![
            StreamDescriptor::audio(1, 16_000, 1).with_tag("DURATION", "00:00:12.500"),
            StreamDescriptor::subtitle(3, "subrip"),
            StreamDescriptor::audio(2, 48_000, 2),
        ])
        .unwrap()
    }

    #[test]
    fn args_for_audio_and_subtitles() {
        let plan = av_plan();
        let config = TranscodeConfig::default();
        let args = TranscoderCommand::new(&plan, &config)
            .args(&[4000, 4001, 4002])
            .unwrap();
        let line = args.join(" ");
        assert_eq!(
            line,
            "-loglevel quiet -nostdin -t 12.500 -i pipe:0 \
             -max_muxing_queue_size 800000 -max_interleave_delta 0 \
             -map 0:1 -ar 48000 -f f32le tcp://127.0.0.1:4000 \
             -map 0:3 -f srt tcp://127.0.0.1:4001 \
             -map 0:2 -ar 48000 -f f32le tcp://127.0.0.1:4002"
        );
    }

    #[test]
    fn subtitles_only_are_uncapped_webvtt() {
        let plan = StreamPlan::new(vec![StreamDescriptor::subtitle(0, "ass")]).unwrap();
        let config = TranscodeConfig::default();
        let args = TranscoderCommand::new(&plan, &config).args(&[5000]).unwrap();
        assert!(!args.contains(&"-t".to_string()));
        assert!(!args.contains(&"-ar".to_string()));
        assert_eq!(
            &args[args.len() - 5..],
            &["-map", "0:0", "-f", "webvtt", "tcp://127.0.0.1:5000"]
        );
    }

    #[test]
    fn extra_args_precede_each_format() {
        let plan = StreamPlan::new(vec![StreamDescriptor::audio(1, 44_100, 2)]).unwrap();
        let config = TranscodeConfig {
            extra_output_args: vec!["-ac".into(), "1".into()],
            ..TranscodeConfig::default()
        };
        let args = TranscoderCommand::new(&plan, &config).args(&[6000]).unwrap();
        let map = args.iter().position(|a| a == "-map").unwrap();
        assert_eq!(&args[map..map + 4], &["-map", "0:1", "-ac", "1"]);
        assert_eq!(args.last().map(String::as_str), Some("tcp://127.0.0.1:6000"));
    }

    #[test]
    fn port_count_must_match_plan() {
        let plan = av_plan();
        let config = TranscodeConfig::default();
        let err = TranscoderCommand::new(&plan, &config)
            .args(&[1])
            .unwrap_err();
        assert_eq!(err.kind(), fi_core::ErrorKind::Internal);
    }

    #[tokio::test]
    async fn listeners_accept_in_plan_order() {
        let listener = ConduitListener::bind(2).await.unwrap();
        let ports = listener.ports().unwrap();
        assert_eq!(ports.len(), 2);
        assert_ne!(ports[0], ports[1]);

        let accept = tokio::spawn(listener.accept_all(Duration::from_secs(5)));
        let _a = TcpStream::connect((Ipv4Addr::LOCALHOST, ports[1])).await.unwrap();
        let _b = TcpStream::connect((Ipv4Addr::LOCALHOST, ports[0])).await.unwrap();

        let conduits = accept.await.unwrap().unwrap();
        assert_eq!(conduits.len(), 2);
        assert_eq!(conduits[0].local_addr().unwrap().port(), ports[0]);
        assert_eq!(conduits[1].local_addr().unwrap().port(), ports[1]);
    }

    #[tokio::test]
    async fn accept_times_out() {
        let listener = ConduitListener::bind(1).await.unwrap();
        let err = listener
            .accept_all(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), fi_core::ErrorKind::Tool);
    }

    #[tokio::test]
    async fn spawn_missing_binary_is_a_tool_error() {
        let plan = av_plan();
        let err = Transcoder::spawn(
            &PathBuf::from("nonexistent_ffmpeg_xyz"),
            &plan,
            &TranscodeConfig::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), fi_core::ErrorKind::Tool);
    }

    #[tokio::test]
    async fn early_exit_is_reported_on_connect() {
        // `false` ignores its arguments and exits without opening anything.
        let plan = av_plan();
        let Ok((mut transcoder, _stdin)) =
            Transcoder::spawn(Path::new("false"), &plan, &TranscodeConfig::default()).await
        else {
            return;
        };
        let err = transcoder.connect(Duration::from_secs(5)).await.unwrap_err();
        assert!(err.to_string().contains("exited"), "unexpected error: {err}");
    }
}
