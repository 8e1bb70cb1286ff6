//! The interleaved reader: one aligned [`Block`] per step across every
//! selected conduit.
//!
//! Each step reads one fixed-size frame block from every open audio conduit
//! and polls every open subtitle conduit for at most the configured wait, all
//! concurrently. Audio reads may block: the transcoder's duration cap bounds
//! how much audio it produces. Subtitle polls must not, or a quiet caption
//! track would stall the audio cadence.
//!
//! Cue timing follows the session's [`CuePolicy`]:
//!
//! - **Clocked**: a cue is held until the virtual clock passes its end and is
//!   emitted on every step whose end lies at or after its begin. Cues that
//!   ended before a step starts are skipped.
//! - **Pass-through**: cues are emitted in the step they are parsed in.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use fi_core::config::{CuePolicy, ReaderConfig};
use fi_core::{StreamPlan, StreamRole};

use crate::accumulator::FrameAccumulator;
use crate::block::{Block, Slot};
use crate::clock::SyncClock;
use crate::codec::CueCodec;
use crate::cue::Cue;
use crate::pump::PumpHandle;

/// A byte conduit carrying one selected stream.
pub type Conduit = Box<dyn AsyncRead + Send + Unpin>;

/// Lifecycle of an [`InterleavedReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Conduits are open; no step has been taken.
    Initialized,
    /// Producing blocks.
    Active,
    /// Terminated; every further step yields nothing.
    Drained,
}

pub(crate) struct AudioLane {
    pub(crate) index: u32,
    pub(crate) frames: FrameAccumulator<Conduit>,
    pub(crate) open: bool,
}

pub(crate) struct SubtitleLane {
    pub(crate) index: u32,
    pub(crate) framed: FramedRead<Conduit, CueCodec>,
    pub(crate) held: Option<Arc<Cue>>,
    pub(crate) open: bool,
}

pub(crate) enum Lane {
    Audio(AudioLane),
    Subtitle(SubtitleLane),
}

impl Lane {
    fn is_open(&self) -> bool {
        match self {
            Lane::Audio(a) => a.open,
            Lane::Subtitle(s) => s.open,
        }
    }

    fn is_audio(&self) -> bool {
        matches!(self, Lane::Audio(_))
    }
}

/// Time window of one step, in virtual time.
#[derive(Debug, Clone, Copy)]
struct StepWindow {
    start: Duration,
    end: Duration,
}

impl AudioLane {
    async fn step(&mut self) -> Option<Slot> {
        if !self.open {
            return None;
        }
        match self.frames.next_block().await {
            Ok(Some(block)) => Some(Slot::Audio(block)),
            Ok(None) => {
                tracing::debug!(stream = self.index, "audio conduit finished");
                self.open = false;
                None
            }
            Err(e) => {
                tracing::warn!(stream = self.index, "audio conduit failed, closing: {e}");
                self.open = false;
                None
            }
        }
    }
}

impl SubtitleLane {
    /// Wait at most `wait` for the next cue.
    ///
    /// Only a corrupt header is an error; everything else that stops the
    /// conduit closes the lane.
    async fn poll_cue(&mut self, wait: Duration) -> fi_core::Result<Option<Arc<Cue>>> {
        if !self.open {
            return Ok(None);
        }
        match tokio::time::timeout(wait, self.framed.next()).await {
            Err(_elapsed) => Ok(None),
            Ok(Some(Ok(cue))) => {
                tracing::trace!(stream = self.index, %cue, "cue parsed");
                Ok(Some(Arc::new(cue)))
            }
            Ok(Some(Err(e))) if e.is_fatal_for_subtitle_lane() => {
                self.open = false;
                Err(e)
            }
            Ok(Some(Err(e))) => {
                tracing::warn!(stream = self.index, "subtitle conduit failed, closing: {e}");
                self.open = false;
                Ok(None)
            }
            Ok(None) => {
                tracing::debug!(stream = self.index, "subtitle conduit finished");
                self.open = false;
                Ok(None)
            }
        }
    }

    /// Hold the first cue still live at `window.start`, discarding any that
    /// ended earlier, then emit it if it has begun by `window.end`.
    ///
    /// Every poll shares one `wait` budget.
    async fn step_clocked(
        &mut self,
        window: StepWindow,
        wait: Duration,
    ) -> fi_core::Result<Option<Slot>> {
        if self
            .held
            .as_ref()
            .is_some_and(|cue| SyncClock::has_expired(cue, window.start))
        {
            self.held = None;
        }

        let deadline = tokio::time::Instant::now() + wait;
        while self.held.is_none() {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match self.poll_cue(remaining).await? {
                Some(cue) if SyncClock::has_expired(&cue, window.start) => {
                    tracing::trace!(stream = self.index, %cue, "cue expired before its step");
                }
                Some(cue) => self.held = Some(cue),
                None => break,
            }
        }

        Ok(self
            .held
            .as_ref()
            .filter(|cue| cue.begin() <= window.end)
            .map(|cue| Slot::Cue(Arc::clone(cue))))
    }

    async fn step_pass_through(&mut self, wait: Duration) -> fi_core::Result<Option<Slot>> {
        Ok(self.poll_cue(wait).await?.map(Slot::Cue))
    }
}

/// Presents the conduits of one session as a sequence of aligned blocks.
pub struct InterleavedReader {
    pub(crate) lanes: Vec<Lane>,
    clock: Option<SyncClock>,
    policy: CuePolicy,
    muxing: bool,
    subtitle_wait: Duration,
    pub(crate) pump: Option<PumpHandle>,
    state: ReaderState,
    steps: u64,
}

impl InterleavedReader {
    /// Wrap one conduit per planned stream, in plan order.
    ///
    /// # Errors
    ///
    /// Returns [`fi_core::Error::Internal`] if the number of conduits does not
    /// match the plan.
    pub fn new(
        plan: &StreamPlan,
        conduits: Vec<Conduit>,
        config: &ReaderConfig,
    ) -> fi_core::Result<Self> {
        if conduits.len() != plan.len() {
            return Err(fi_core::Error::Internal(format!(
                "{} conduits for {} planned streams",
                conduits.len(),
                plan.len()
            )));
        }

        let frames = plan.frames_per_step(config.step());
        let lanes = plan
            .streams()
            .iter()
            .zip(conduits)
            .map(|(stream, conduit)| {
                let index = stream.descriptor.index;
                match stream.role {
                    StreamRole::Audio { channels } => Lane::Audio(AudioLane {
                        index,
                        frames: FrameAccumulator::new(
                            conduit,
                            channels as usize,
                            frames.unwrap_or(1),
                        ),
                        open: true,
                    }),
                    StreamRole::Subtitle { dialect } => Lane::Subtitle(SubtitleLane {
                        index,
                        framed: FramedRead::new(conduit, CueCodec::new(index, dialect)),
                        held: None,
                        open: true,
                    }),
                }
            })
            .collect();

        let clock = plan
            .unified_rate()
            .zip(frames)
            .map(|(rate, frames)| SyncClock::new(rate, frames));

        let policy = match (config.cue_policy, plan.has_audio()) {
            (CuePolicy::Clocked, true) => CuePolicy::Clocked,
            _ => CuePolicy::PassThrough,
        };
        if plan.subtitle_count() > 0 {
            tracing::info!(
                policy = ?policy,
                configured = ?config.cue_policy,
                "subtitle cue policy"
            );
        }

        Ok(Self {
            lanes,
            clock,
            policy,
            muxing: plan.needs_muxing(),
            subtitle_wait: config.subtitle_wait(),
            pump: None,
            state: ReaderState::Initialized,
            steps: 0,
        })
    }

    /// Attach the session's source pump; its failures surface on the next
    /// step.
    pub fn with_pump(mut self, pump: PumpHandle) -> Self {
        self.pump = Some(pump);
        self
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// The cue policy in effect.
    pub fn policy(&self) -> CuePolicy {
        self.policy
    }

    /// Unified sample rate; `None` without audio.
    pub fn rate(&self) -> Option<u32> {
        self.clock.as_ref().map(SyncClock::rate)
    }

    /// Current virtual time; `None` without audio.
    pub fn position(&self) -> Option<Duration> {
        self.clock.as_ref().map(SyncClock::now)
    }

    /// Number of blocks produced so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Produce the next aligned block, or `None` once the session is drained.
    ///
    /// # Errors
    ///
    /// A pump failure or a corrupt subtitle header ends the session with an
    /// error; later calls return `Ok(None)`.
    pub async fn next_block(&mut self) -> fi_core::Result<Option<Block>> {
        match self.state {
            ReaderState::Drained => return Ok(None),
            ReaderState::Initialized => {
                tracing::debug!(lanes = self.lanes.len(), "reader active");
                self.state = ReaderState::Active;
            }
            ReaderState::Active => {}
        }

        if let Err(e) = self.check_pump() {
            self.state = ReaderState::Drained;
            return Err(e);
        }

        let window = self
            .clock
            .as_ref()
            .map(|clock| StepWindow {
                start: clock.now(),
                end: clock.peek_next(),
            });
        let wait = self.subtitle_wait;
        let policy = self.policy;

        let results = join_all(self.lanes.iter_mut().map(|lane| async move {
            match lane {
                Lane::Audio(audio) => Ok(audio.step().await),
                Lane::Subtitle(sub) => match (policy, window) {
                    (CuePolicy::Clocked, Some(window)) => sub.step_clocked(window, wait).await,
                    _ => sub.step_pass_through(wait).await,
                },
            }
        }))
        .await;

        let slots = match results.into_iter().collect::<fi_core::Result<Vec<_>>>() {
            Ok(slots) => slots,
            Err(e) => {
                self.state = ReaderState::Drained;
                return Err(e);
            }
        };

        if let Some(clock) = self.clock.as_mut() {
            clock.advance();
        }

        let all_vacant = slots.iter().all(Option::is_none);
        let all_closed = self.lanes.iter().all(|l| !l.is_open());
        let audio_lost = self.muxing && self.lanes.iter().any(|l| l.is_audio() && !l.is_open());

        if (all_vacant && all_closed) || audio_lost {
            tracing::info!(steps = self.steps, position = ?self.position(), "reader drained");
            self.state = ReaderState::Drained;
            return Ok(None);
        }

        tracing::trace!(
            step = self.steps,
            position = ?window.map(|w| w.start),
            filled = slots.iter().filter(|s| s.is_some()).count(),
            "block assembled"
        );
        self.steps += 1;

        Ok(Some(Block::new(window.map(|w| w.start), slots)))
    }

    /// The remaining blocks as a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = fi_core::Result<Block>> + Send {
        futures::stream::unfold(self, |mut reader| async move {
            match reader.next_block().await {
                Ok(Some(block)) => Some((Ok(block), reader)),
                Ok(None) => None,
                Err(e) => Some((Err(e), reader)),
            }
        })
    }

    pub(crate) fn check_pump(&mut self) -> fi_core::Result<()> {
        match self.pump.as_mut() {
            Some(pump) => pump.check(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for InterleavedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterleavedReader")
            .field("lanes", &self.lanes.len())
            .field("policy", &self.policy)
            .field("state", &self.state)
            .field("position", &self.position())
            .field("steps", &self.steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::ConduitPump;
    use assert_matches::assert_matches;
    use fi_core::StreamDescriptor;
    use tokio::io::AsyncWriteExt;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn le_frames(frames: usize, channels: usize) -> Vec<u8> {
        (0..frames * channels)
            .flat_map(|i| (i as f32).to_le_bytes())
            .collect()
    }

    fn config(step_ms: u64) -> ReaderConfig {
        ReaderConfig {
            step_ms,
            subtitle_wait_ms: 50,
            ..ReaderConfig::default()
        }
    }

    fn conduit(bytes: Vec<u8>) -> Conduit {
        Box::new(std::io::Cursor::new(bytes))
    }

    async fn collect(mut reader: InterleavedReader) -> Vec<Block> {
        let mut blocks = Vec::new();
        while let Some(block) = reader.next_block().await.unwrap() {
            blocks.push(block);
        }
        blocks
    }

    #[tokio::test]
    async fn audio_and_cue_scenario() {
        // 4 s of mono audio at 10 Hz and one cue over [0, 2.5).
        let plan = StreamPlan::new(vec![
            StreamDescriptor::audio(1, 10, 1),
            StreamDescriptor::subtitle(2, "webvtt"),
        ])
        .unwrap();
        let vtt = "WEBVTT\n\n00:00.000 --> 00:02.500\nHello\n\n";
        let reader = InterleavedReader::new(
            &plan,
            vec![conduit(le_frames(40, 1)), conduit(vtt.into())],
            &config(1000),
        )
        .unwrap();
        assert_eq!(reader.policy(), CuePolicy::Clocked);

        let blocks = collect(reader).await;
        assert_eq!(blocks.len(), 4);
        for (n, block) in blocks.iter().enumerate() {
            assert_eq!(block.position(), Some(ms(1000 * n as u64)));
            assert_eq!(block.audio(0).map(|a| a.frames()), Some(10));
        }
        let labels: Vec<Option<&str>> = blocks.iter().map(|b| b.cue(1).map(Cue::label)).collect();
        assert_eq!(labels, vec![Some("Hello"), Some("Hello"), Some("Hello"), None]);
    }

    #[tokio::test]
    async fn cue_is_held_until_it_begins() {
        let plan = StreamPlan::new(vec![
            StreamDescriptor::audio(1, 10, 1),
            StreamDescriptor::subtitle(2, "subrip"),
        ])
        .unwrap();
        let srt = "1\n00:00:02,200 --> 00:00:02,200\nlate\n\n";
        let reader = InterleavedReader::new(
            &plan,
            vec![conduit(le_frames(50, 1)), conduit(srt.into())],
            &config(1000),
        )
        .unwrap();

        let blocks = collect(reader).await;
        let labels: Vec<Option<&str>> = blocks.iter().map(|b| b.cue(1).map(Cue::label)).collect();
        // Zero-length cue at 2.2 s is shown over [2.2, 3.2).
        assert_eq!(labels, vec![None, None, Some("late"), Some("late"), None]);
    }

    #[tokio::test]
    async fn dense_cues_never_lag_their_step() {
        // Ten 200 ms cues over the first two seconds, read in 1 s steps.
        let plan = StreamPlan::new(vec![
            StreamDescriptor::audio(1, 10, 1),
            StreamDescriptor::subtitle(2, "webvtt"),
        ])
        .unwrap();
        let mut vtt = String::from("WEBVTT\n\n");
        for n in 0..10u64 {
            vtt.push_str(&format!(
                "00:0{}.{:03} --> 00:0{}.{:03}\nc{n}\n\n",
                n * 200 / 1000,
                n * 200 % 1000,
                (n + 1) * 200 / 1000,
                (n + 1) * 200 % 1000,
            ));
        }
        let reader = InterleavedReader::new(
            &plan,
            vec![conduit(le_frames(40, 1)), conduit(vtt.into())],
            &config(1000),
        )
        .unwrap();

        let blocks = collect(reader).await;
        assert_eq!(blocks.len(), 4);
        let labels: Vec<Option<&str>> = blocks.iter().map(|b| b.cue(1).map(Cue::label)).collect();
        assert_eq!(labels, vec![Some("c0"), Some("c5"), None, None]);

        for block in &blocks {
            let start = block.position().unwrap();
            if let Some(cue) = block.cue(1) {
                assert!(cue.begin() < start + ms(1000), "{cue} shown at {start:?}");
                assert!(!SyncClock::has_expired(cue, start), "{cue} shown at {start:?}");
            }
        }
    }

    #[tokio::test]
    async fn two_rates_share_one_block_shape() {
        // 16 kHz mono and 48 kHz stereo, both delivered at the unified 48 kHz.
        let plan = StreamPlan::new(vec![
            StreamDescriptor::audio(1, 16_000, 1),
            StreamDescriptor::audio(2, 48_000, 2),
        ])
        .unwrap();
        let frames = 240_000 + 120_000;
        let reader = InterleavedReader::new(
            &plan,
            vec![conduit(le_frames(frames, 1)), conduit(le_frames(frames, 2))],
            &config(5000),
        )
        .unwrap();
        assert_eq!(reader.rate(), Some(48_000));

        let blocks = collect(reader).await;
        assert_eq!(blocks.len(), 2);
        for (n, block) in blocks.iter().enumerate() {
            assert_eq!(block.position(), Some(ms(5000 * n as u64)));
            let mono = block.audio(0).unwrap();
            let stereo = block.audio(1).unwrap();
            assert_eq!((mono.frames(), mono.channels()), (240_000, 1));
            assert_eq!((stereo.frames(), stereo.channels()), (240_000, 2));
        }
        let tail = blocks[1].audio(1).unwrap();
        assert_eq!(tail.frame(119_999).map(<[f32]>::len), Some(2));
        assert_eq!(tail.frame(120_000), Some(&[0.0, 0.0][..]));
    }

    #[tokio::test]
    async fn audio_only_block_counts() {
        let plan = StreamPlan::new(vec![
            StreamDescriptor::audio(1, 10, 2),
            StreamDescriptor::audio(2, 10, 1),
        ])
        .unwrap();
        // 2.5 s: two full blocks and a padded one.
        let reader = InterleavedReader::new(
            &plan,
            vec![conduit(le_frames(25, 2)), conduit(le_frames(25, 1))],
            &config(1000),
        )
        .unwrap();

        let blocks = collect(reader).await;
        assert_eq!(blocks.len(), 3);
        let last = blocks[2].audio(0).unwrap();
        assert_eq!(last.frames(), 10);
        assert_eq!(last.frame(4), Some(&[48.0, 49.0][..]));
        assert_eq!(last.frame(5), Some(&[0.0, 0.0][..]));
    }

    #[tokio::test]
    async fn shorter_audio_lane_goes_vacant() {
        let plan = StreamPlan::new(vec![
            StreamDescriptor::audio(1, 10, 1),
            StreamDescriptor::audio(2, 10, 1),
        ])
        .unwrap();
        let reader = InterleavedReader::new(
            &plan,
            vec![conduit(le_frames(10, 1)), conduit(le_frames(30, 1))],
            &config(1000),
        )
        .unwrap();

        let blocks = collect(reader).await;
        assert_eq!(blocks.len(), 3);
        assert!(blocks[1].audio(0).is_none());
        assert!(blocks[2].audio(1).is_some());
    }

    #[tokio::test]
    async fn muxing_stops_when_audio_ends() {
        let plan = StreamPlan::new(vec![
            StreamDescriptor::audio(1, 10, 1),
            StreamDescriptor::subtitle(2, "webvtt"),
        ])
        .unwrap();
        let vtt = "WEBVTT\n\n00:05.000 --> 00:09.000\nnever shown\n\n";
        let reader = InterleavedReader::new(
            &plan,
            vec![conduit(le_frames(20, 1)), conduit(vtt.into())],
            &config(1000),
        )
        .unwrap();

        let blocks = collect(reader).await;
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.cue(1).is_none()));
    }

    #[tokio::test]
    async fn subtitles_only_pass_through() {
        let plan = StreamPlan::new(vec![StreamDescriptor::subtitle(0, "webvtt")]).unwrap();
        let vtt = "WEBVTT\n\n00:10.000 --> 00:11.000\none\n\n00:20.000 --> 00:21.000\ntwo\n\n";
        let reader =
            InterleavedReader::new(&plan, vec![conduit(vtt.into())], &config(1000)).unwrap();
        assert_eq!(reader.policy(), CuePolicy::PassThrough);
        assert_eq!(reader.position(), None);

        let blocks = collect(reader).await;
        let labels: Vec<&str> = blocks.iter().filter_map(|b| b.cue(0)).map(Cue::label).collect();
        assert_eq!(labels, vec!["one", "two"]);
        assert!(blocks.iter().all(|b| b.position().is_none()));
    }

    #[tokio::test]
    async fn pass_through_with_audio_when_configured() {
        let plan = StreamPlan::new(vec![
            StreamDescriptor::audio(1, 10, 1),
            StreamDescriptor::subtitle(2, "webvtt"),
        ])
        .unwrap();
        let vtt = "WEBVTT\n\n00:03.000 --> 00:04.000\nearly\n\n";
        let mut cfg = config(1000);
        cfg.cue_policy = CuePolicy::PassThrough;
        let reader = InterleavedReader::new(
            &plan,
            vec![conduit(le_frames(40, 1)), conduit(vtt.into())],
            &cfg,
        )
        .unwrap();
        assert_eq!(reader.policy(), CuePolicy::PassThrough);

        let blocks = collect(reader).await;
        assert_eq!(blocks[0].cue(1).map(Cue::label), Some("early"));
        assert!(blocks[1..].iter().all(|b| b.cue(1).is_none()));
    }

    #[tokio::test]
    async fn slow_subtitles_do_not_stall_audio() {
        let plan = StreamPlan::new(vec![
            StreamDescriptor::audio(1, 10, 1),
            StreamDescriptor::subtitle(2, "webvtt"),
        ])
        .unwrap();
        let (sub_tx, sub_rx) = tokio::io::duplex(1024);
        let mut reader = InterleavedReader::new(
            &plan,
            vec![conduit(le_frames(30, 1)), Box::new(sub_rx)],
            &config(1000),
        )
        .unwrap();

        // Nothing on the subtitle conduit yet: audio still flows.
        let first = reader.next_block().await.unwrap().unwrap();
        assert!(first.audio(0).is_some());
        assert!(first.cue(1).is_none());

        let mut sub_tx = sub_tx;
        sub_tx
            .write_all(b"WEBVTT\n\n00:01.000 --> 00:01.500\nlate\n\n")
            .await
            .unwrap();
        drop(sub_tx);

        let second = reader.next_block().await.unwrap().unwrap();
        assert_eq!(second.cue(1).map(Cue::label), Some("late"));
    }

    #[tokio::test]
    async fn malformed_header_is_fatal_and_idempotent() {
        let plan = StreamPlan::new(vec![
            StreamDescriptor::audio(1, 10, 1),
            StreamDescriptor::subtitle(2, "webvtt"),
        ])
        .unwrap();
        let mut reader = InterleavedReader::new(
            &plan,
            vec![conduit(le_frames(30, 1)), conduit(b"garbage\n\n".to_vec())],
            &config(1000),
        )
        .unwrap();

        let err = reader.next_block().await.unwrap_err();
        assert_matches!(err, fi_core::Error::MalformedSubtitleFormat { index: 2, .. });
        assert_eq!(reader.state(), ReaderState::Drained);
        assert!(reader.next_block().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn drained_reader_stays_drained() {
        let plan = StreamPlan::new(vec![StreamDescriptor::audio(1, 10, 1)]).unwrap();
        let mut reader =
            InterleavedReader::new(&plan, vec![conduit(le_frames(10, 1))], &config(1000)).unwrap();
        assert_eq!(reader.state(), ReaderState::Initialized);
        assert!(reader.next_block().await.unwrap().is_some());
        assert_eq!(reader.state(), ReaderState::Active);
        assert!(reader.next_block().await.unwrap().is_none());
        assert!(reader.next_block().await.unwrap().is_none());
        assert_eq!(reader.state(), ReaderState::Drained);
        assert_eq!(reader.steps(), 1);
    }

    #[tokio::test]
    async fn pump_failure_surfaces_on_next_step() {
        let plan = StreamPlan::new(vec![StreamDescriptor::audio(1, 10, 1)]).unwrap();
        let source = tokio_test::io::Builder::new()
            .read_error(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
            .build();
        let pump = ConduitPump::new(bytes::Bytes::new(), source, tokio::io::sink(), 16).spawn();
        let mut reader =
            InterleavedReader::new(&plan, vec![conduit(le_frames(100, 1))], &config(1000))
                .unwrap()
                .with_pump(pump);

        let mut outcome = Ok(());
        for _ in 0..10 {
            match reader.next_block().await {
                Ok(Some(_)) => tokio::task::yield_now().await,
                Ok(None) => break,
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        assert_matches!(outcome, Err(fi_core::Error::Io { .. }));
    }

    #[tokio::test]
    async fn stream_adapter_yields_every_block() {
        let plan = StreamPlan::new(vec![StreamDescriptor::audio(1, 10, 1)]).unwrap();
        let reader =
            InterleavedReader::new(&plan, vec![conduit(le_frames(25, 1))], &config(500)).unwrap();
        let blocks: Vec<_> = reader.into_stream().collect().await;
        assert_eq!(blocks.len(), 5);
        assert!(blocks.iter().all(Result::is_ok));
    }

    #[test]
    fn conduit_count_must_match_plan() {
        let plan = StreamPlan::new(vec![StreamDescriptor::audio(1, 10, 1)]).unwrap();
        let err = InterleavedReader::new(&plan, vec![], &config(1000)).unwrap_err();
        assert_eq!(err.kind(), fi_core::ErrorKind::Internal);
    }
}
