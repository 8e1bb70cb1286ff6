//! End-to-end sessions against real ffmpeg/ffprobe.
//!
//! Each test generates a small Matroska fixture and is skipped when the tools
//! are not installed.

mod common;

use std::time::Duration;

use common::{media_fixture, FIXTURE_CUE};
use ffinput::{BlockingSession, Block, Config, CuePolicy, Session, StreamPlan};
use futures::StreamExt;
use tempfile::tempdir;

fn assert_fixture_plan(plan: &StreamPlan) {
    assert_eq!(plan.len(), 3);
    assert_eq!(plan.audio_count(), 2);
    assert_eq!(plan.subtitle_count(), 1);
    assert_eq!(plan.unified_rate(), Some(48_000));
}

async fn collect(session: &mut Session) -> Vec<Block> {
    let mut blocks = Vec::new();
    while let Some(block) = session.next_block().await.unwrap() {
        blocks.push(block);
    }
    blocks
}

#[tokio::test]
async fn steps_through_audio_and_cues() {
    let dir = tempdir().unwrap();
    let Some(media) = media_fixture(dir.path()) else {
        return;
    };

    let mut session = Session::open(media, Config::default(), |s| s.kind.is_readable())
        .await
        .unwrap();
    assert_fixture_plan(session.plan());

    let blocks = collect(&mut session).await;
    // Three seconds of audio; resampling may spill a few frames into a
    // fourth, padded block.
    assert!((3..=4).contains(&blocks.len()), "{} blocks", blocks.len());

    let first = &blocks[0];
    assert_eq!(first.position(), Some(Duration::ZERO));
    for lane in 0..2 {
        let audio = first.audio(lane).unwrap();
        assert_eq!(audio.frames(), 48_000);
        assert_eq!(audio.channels(), 1);
    }
    for (n, block) in blocks.iter().enumerate().skip(1) {
        assert_eq!(block.position(), Some(Duration::from_secs(n as u64)));
    }

    let cue_steps: Vec<Duration> = blocks
        .iter()
        .filter(|b| b.cue(2).is_some_and(|c| c.label() == FIXTURE_CUE))
        .filter_map(Block::position)
        .collect();
    assert!(!cue_steps.is_empty());
    assert!(cue_steps.iter().all(|&t| t < Duration::from_millis(2500)));

    // Drained stays drained.
    assert!(session.next_block().await.unwrap().is_none());
}

#[tokio::test]
async fn subtitles_alone_pass_through() {
    let dir = tempdir().unwrap();
    let Some(media) = media_fixture(dir.path()) else {
        return;
    };

    let session = Session::open(media, Config::default(), |s| s.index == 2)
        .await
        .unwrap();
    assert_eq!(session.reader().policy(), CuePolicy::PassThrough);

    let blocks: Vec<Block> = session
        .into_stream()
        .map(|block| block.unwrap())
        .collect()
        .await;
    let labels: Vec<&str> = blocks
        .iter()
        .filter_map(|b| b.cue(0))
        .map(|c| c.label())
        .collect();
    assert_eq!(labels, vec![FIXTURE_CUE]);
    assert!(blocks.iter().all(|b| b.position().is_none()));
}

#[tokio::test]
async fn whole_file_read() {
    let dir = tempdir().unwrap();
    let Some(media) = media_fixture(dir.path()) else {
        return;
    };

    let session = Session::open(media, Config::default(), |s| s.kind.is_readable())
        .await
        .unwrap();
    let whole = session.read_all().await.unwrap();

    assert_eq!(whole.rate(), Some(48_000));
    for lane in 0..2 {
        let frames = whole.audio(lane).unwrap().frames();
        assert!((143_000..=145_000).contains(&frames), "{frames} frames");
    }

    let cues = whole.cues(2).unwrap();
    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].label(), FIXTURE_CUE);

    let timeline = whole.timeline(2).unwrap();
    assert_eq!(timeline.at(0).map(|c| c.label()), Some(FIXTURE_CUE));
    assert!(timeline.at(48_000 * 2).is_some());
    assert!(timeline.at(48_000 * 2 + 24_000).is_none());
}

#[test]
fn blocking_iteration() {
    let dir = tempdir().unwrap();
    let Some(media) = media_fixture(dir.path()) else {
        return;
    };

    let mut config = Config::default();
    config.reader.step_ms = 500;
    let session = BlockingSession::open(media, config, |s| s.index == 1).unwrap();
    assert_eq!(session.plan().unified_rate(), Some(48_000));

    let blocks: Vec<Block> = session.map(|block| block.unwrap()).collect();
    // The generator may round its last frame up past three seconds.
    assert!((6..=7).contains(&blocks.len()), "{} blocks", blocks.len());
    assert!(blocks.iter().all(|b| b.audio(0).unwrap().frames() == 24_000));
}
