//! Reader sessions over a single source.
//!
//! A [`Session`] ties the pieces together: it reads the head of the source,
//! probes it, plans the selected streams, starts the transcoder, pumps the
//! source into it in the background and hands the transcoder's output
//! conduits to an [`InterleavedReader`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fi_av::{FfprobeProber, Prober, ToolRegistry, Transcoder};
use fi_core::config::Config;
use fi_core::{select_streams, StreamDescriptor, StreamPlan};
use fi_sync::{Block, Conduit, ConduitPump, InterleavedReader, WholeFile};
use futures::Stream;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Name that selects standard input as the source.
pub const STDIN_SOURCE: &str = "-";

/// Where a session reads its media bytes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    Path(PathBuf),
}

impl Source {
    /// Interpret a command-line source name; `-` is standard input.
    pub fn parse(name: &str) -> Self {
        if name == STDIN_SOURCE {
            Self::Stdin
        } else {
            Self::Path(PathBuf::from(name))
        }
    }

    async fn open(&self) -> fi_core::Result<Box<dyn AsyncRead + Send + Unpin>> {
        Ok(match self {
            Self::Stdin => Box::new(tokio::io::stdin()),
            Self::Path(path) => Box::new(tokio::fs::File::open(path).await?),
        })
    }
}

impl From<&str> for Source {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "<stdin>"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Configures how sessions are opened.
///
/// By default ffprobe and ffmpeg are looked up through [`ToolRegistry`];
/// either can be replaced.
#[derive(Clone, Default)]
pub struct SessionBuilder {
    config: Config,
    prober: Option<Arc<dyn Prober>>,
    ffmpeg: Option<PathBuf>,
}

impl SessionBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            prober: None,
            ffmpeg: None,
        }
    }

    /// Use `prober` instead of ffprobe.
    pub fn prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Use the ffmpeg executable at `path`.
    pub fn ffmpeg(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg = Some(path.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Probe `source` without starting a session.
    pub async fn probe(&self, source: impl Into<Source>) -> fi_core::Result<Vec<StreamDescriptor>> {
        let source = source.into();
        self.config.check()?;
        let registry = ToolRegistry::discover(&self.config.tools);
        let mut input = source.open().await?;
        let (_, descriptors) = self.probe_head(&registry, &source, &mut input).await?;
        Ok(descriptors)
    }

    /// Open a session over `source`, reading the streams `predicate` accepts.
    ///
    /// Selection and planning happen before any process is started, so
    /// [`fi_core::Error::NoStreamsSelected`] and
    /// [`fi_core::Error::UnsupportedStream`] leave nothing behind.
    pub async fn open<F>(self, source: impl Into<Source>, predicate: F) -> fi_core::Result<Session>
    where
        F: FnMut(&StreamDescriptor) -> bool,
    {
        let source = source.into();
        self.config.check()?;
        let registry = ToolRegistry::discover(&self.config.tools);
        let mut input = source.open().await?;
        let (head, descriptors) = self.probe_head(&registry, &source, &mut input).await?;

        let plan = StreamPlan::new(select_streams(descriptors, predicate)?)?;
        tracing::info!(
            source = %source,
            streams = plan.len(),
            audio = plan.audio_count(),
            subtitles = plan.subtitle_count(),
            rate = ?plan.unified_rate(),
            cap = ?plan.duration_cap(),
            "session planned"
        );

        let ffmpeg = match &self.ffmpeg {
            Some(path) => path.clone(),
            None => registry.ffmpeg()?.to_path_buf(),
        };
        let (mut transcoder, stdin) =
            Transcoder::spawn(&ffmpeg, &plan, &self.config.transcode).await?;

        // The transcoder only opens its outputs once it has seen the source
        // headers, so the pump has to run before connecting.
        let pump = ConduitPump::new(head, input, stdin, self.config.reader.pump_chunk_size).spawn();
        let conduits = transcoder
            .connect(self.config.reader.connect_timeout())
            .await?
            .into_iter()
            .map(|conduit| Box::new(conduit) as Conduit)
            .collect();

        let reader = InterleavedReader::new(&plan, conduits, &self.config.reader)?.with_pump(pump);

        Ok(Session {
            source,
            plan,
            reader,
            transcoder,
            reap_timeout: self.config.reader.connect_timeout(),
            reaped: false,
        })
    }

    async fn probe_head(
        &self,
        registry: &ToolRegistry,
        source: &Source,
        input: &mut (dyn AsyncRead + Send + Unpin),
    ) -> fi_core::Result<(Vec<u8>, Vec<StreamDescriptor>)> {
        let prober: Arc<dyn Prober> = match &self.prober {
            Some(prober) => Arc::clone(prober),
            None => Arc::new(
                FfprobeProber::from_registry(registry)?.with_timeout(self.config.probe.timeout()),
            ),
        };

        let mut head = Vec::with_capacity(self.config.probe.block_size);
        input
            .take(self.config.probe.block_size as u64)
            .read_to_end(&mut head)
            .await?;
        tracing::debug!(source = %source, bytes = head.len(), "read probe block");

        let descriptors = prober.probe(&head).await?;
        tracing::info!(
            source = %source,
            prober = prober.name(),
            streams = descriptors.len(),
            "source probed"
        );

        Ok((head, descriptors))
    }
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("config", &self.config)
            .field("prober", &self.prober.as_ref().map(|p| p.name()))
            .field("ffmpeg", &self.ffmpeg)
            .finish()
    }
}

/// A running read of one source.
///
/// Dropping the session closes every conduit, stops the pump and kills the
/// transcoder.
#[derive(Debug)]
pub struct Session {
    source: Source,
    plan: StreamPlan,
    reader: InterleavedReader,
    transcoder: Transcoder,
    reap_timeout: Duration,
    reaped: bool,
}

impl Session {
    /// Open a session with the default tools.
    pub async fn open<F>(
        source: impl Into<Source>,
        config: Config,
        predicate: F,
    ) -> fi_core::Result<Self>
    where
        F: FnMut(&StreamDescriptor) -> bool,
    {
        SessionBuilder::new(config).open(source, predicate).await
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Selected streams, unified rate and duration cap.
    pub fn plan(&self) -> &StreamPlan {
        &self.plan
    }

    pub fn reader(&self) -> &InterleavedReader {
        &self.reader
    }

    /// Process id of the transcoder while it runs.
    pub fn transcoder_id(&self) -> Option<u32> {
        self.transcoder.id()
    }

    /// The next time-aligned block, or `None` once the session is drained.
    pub async fn next_block(&mut self) -> fi_core::Result<Option<Block>> {
        match self.reader.next_block().await {
            Ok(Some(block)) => Ok(Some(block)),
            Ok(None) => {
                self.reap().await;
                Ok(None)
            }
            Err(e) => {
                self.terminate().await;
                Err(e)
            }
        }
    }

    /// Turn the session into a stream of blocks.
    pub fn into_stream(self) -> impl Stream<Item = fi_core::Result<Block>> + Send {
        futures::stream::unfold(self, |mut session| async move {
            match session.next_block().await {
                Ok(Some(block)) => Some((Ok(block), session)),
                Ok(None) => None,
                Err(e) => Some((Err(e), session)),
            }
        })
    }

    /// Drain the whole session at once.
    ///
    /// Audio is cut at the plan's duration cap when one is known.
    pub async fn read_all(self) -> fi_core::Result<WholeFile> {
        let Session {
            source,
            plan,
            reader,
            mut transcoder,
            reap_timeout,
            ..
        } = self;

        let result = reader.read_all(plan.duration_cap()).await;
        match &result {
            Ok(_) => reap(&mut transcoder, reap_timeout).await,
            Err(e) => {
                tracing::error!(source = %source, "whole-file read failed: {e}");
                kill(&mut transcoder).await;
            }
        }
        result
    }

    /// Stop reading early, killing the transcoder.
    pub async fn close(mut self) {
        self.terminate().await;
    }

    async fn reap(&mut self) {
        if !self.reaped {
            self.reaped = true;
            reap(&mut self.transcoder, self.reap_timeout).await;
            tracing::info!(source = %self.source, steps = self.reader.steps(), "session drained");
        }
    }

    async fn terminate(&mut self) {
        if !self.reaped {
            self.reaped = true;
            kill(&mut self.transcoder).await;
        }
    }
}

/// Wait for a transcoder that has finished its outputs, killing it if it
/// lingers.
async fn reap(transcoder: &mut Transcoder, timeout: Duration) {
    match tokio::time::timeout(timeout, transcoder.wait()).await {
        Ok(Ok(status)) if status.success() => {
            tracing::debug!("transcoder exited cleanly");
        }
        Ok(Ok(status)) => {
            tracing::warn!("transcoder exited with {status}");
        }
        Ok(Err(e)) => {
            tracing::warn!("failed to wait for transcoder: {e}");
        }
        Err(_) => {
            tracing::warn!("transcoder still running after its outputs closed; killing it");
            kill(transcoder).await;
        }
    }
}

async fn kill(transcoder: &mut Transcoder) {
    if let Err(e) = transcoder.kill().await {
        tracing::debug!("failed to kill transcoder: {e}");
    }
}
