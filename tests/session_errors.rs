//! Session construction failures.
//!
//! Every case here fails before the transcoder would be started, so a fake
//! prober and a nonexistent ffmpeg path are enough.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{source_file, FailingProber, FakeProber};
use ffinput::{BlockingSession, CodecKind, Config, Error, ErrorKind, SessionBuilder, StreamDescriptor};

const NO_FFMPEG: &str = "/nonexistent/bin/ffmpeg";

fn av_streams() -> Vec<StreamDescriptor> {
    vec![
        StreamDescriptor::new(0, CodecKind::Video),
        StreamDescriptor::audio(1, 48_000, 2),
        StreamDescriptor::subtitle(2, "subrip"),
    ]
}

fn builder(prober: Arc<dyn ffinput::Prober>) -> SessionBuilder {
    SessionBuilder::new(Config::default())
        .prober(prober)
        .ffmpeg(NO_FFMPEG)
}

#[tokio::test]
async fn empty_selection_fails_before_spawning() {
    let source = source_file(128);
    let err = builder(FakeProber::new(av_streams()))
        .open(source.path().to_path_buf(), |_| false)
        .await
        .unwrap_err();
    assert_matches!(err, Error::NoStreamsSelected);
}

#[tokio::test]
async fn selected_video_is_rejected() {
    let source = source_file(128);
    let err = builder(FakeProber::new(av_streams()))
        .open(source.path().to_path_buf(), |s| s.index <= 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedStream);
    assert!(err.to_string().contains("stream 0: video"));
}

#[tokio::test]
async fn prober_sees_only_the_head_block() {
    let source = source_file(1000);
    let prober = FakeProber::new(av_streams());
    let mut config = Config::default();
    config.probe.block_size = 64;

    let err = SessionBuilder::new(config)
        .prober(prober.clone())
        .ffmpeg(NO_FFMPEG)
        .open(source.path().to_path_buf(), |_| false)
        .await
        .unwrap_err();
    assert_matches!(err, Error::NoStreamsSelected);
    assert_eq!(prober.head_len(), Some(64));
}

#[tokio::test]
async fn short_source_is_probed_whole() {
    let source = source_file(10);
    let prober = FakeProber::new(av_streams());
    let streams = SessionBuilder::new(Config::default())
        .prober(prober.clone())
        .probe(source.path().to_path_buf())
        .await
        .unwrap();
    assert_eq!(streams, av_streams());
    assert_eq!(prober.head_len(), Some(10));
}

#[tokio::test]
async fn probe_failure_is_fatal() {
    let source = source_file(128);
    let err = builder(Arc::new(FailingProber))
        .open(source.path().to_path_buf(), |_| true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Probe);
}

#[tokio::test]
async fn audio_without_sample_rate_is_a_probe_error() {
    let source = source_file(128);
    let mut audio = StreamDescriptor::new(1, CodecKind::Audio);
    audio.channels = Some(2);
    let err = builder(FakeProber::new(vec![audio]))
        .open(source.path().to_path_buf(), |_| true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Probe);
}

#[tokio::test]
async fn missing_ffmpeg_is_a_tool_error() {
    let source = source_file(128);
    let err = builder(FakeProber::new(av_streams()))
        .open(source.path().to_path_buf(), |s| s.kind.is_readable())
        .await
        .unwrap_err();
    assert_matches!(err, Error::Tool { ref tool, .. } if tool == "ffmpeg");
}

#[tokio::test]
async fn transcoder_exiting_early_is_a_tool_error() {
    let Ok(false_bin) = which::which("false") else {
        eprintln!("Skipping: no `false` binary");
        return;
    };
    let source = source_file(128);
    let err = SessionBuilder::new(Config::default())
        .prober(FakeProber::new(av_streams()))
        .ffmpeg(false_bin)
        .open(source.path().to_path_buf(), |s| s.kind.is_readable())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Tool);
    assert!(err.to_string().contains("before opening its outputs"));
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let source = source_file(128);
    let mut config = Config::default();
    config.reader.step_ms = 0;
    let err = SessionBuilder::new(config)
        .prober(FakeProber::new(av_streams()))
        .open(source.path().to_path_buf(), |_| true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn missing_source_is_an_io_error() {
    let err = builder(FakeProber::new(av_streams()))
        .open("/nonexistent/movie.mkv", |_| true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn blocking_session_reports_the_same_errors() {
    let source = source_file(128);
    let err = BlockingSession::with_builder(
        builder(FakeProber::new(av_streams())),
        source.path().to_path_buf(),
        |_| false,
    )
    .unwrap_err();
    assert_matches!(err, Error::NoStreamsSelected);
}
