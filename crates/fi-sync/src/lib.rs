//! # fi-sync
//!
//! The interleaved multi-conduit synchronization reader.
//!
//! A session's transcoder writes every selected stream to its own conduit,
//! each at its own pace. This crate turns those conduits back into a single
//! sequence of time-aligned [`Block`]s:
//!
//! - [`ConduitPump`] feeds the source into the transcoder in the background.
//! - [`FrameAccumulator`] assembles fixed-size [`AudioFrameBlock`]s from
//!   partial reads.
//! - [`CueCodec`] frames [`Cue`] records off a WebVTT or SubRip conduit.
//! - [`SyncClock`] keeps virtual time in sample ticks.
//! - [`InterleavedReader`] drives all of them one step at a time, or drains
//!   everything at once with [`InterleavedReader::read_all`].

pub mod accumulator;
pub mod block;
pub mod clock;
pub mod codec;
pub mod cue;
pub mod pump;
pub mod read_all;
pub mod reader;

pub use accumulator::FrameAccumulator;
pub use block::{AudioFrameBlock, Block, Slot};
pub use clock::SyncClock;
pub use codec::CueCodec;
pub use cue::Cue;
pub use pump::{ConduitPump, PumpHandle};
pub use read_all::{CueTimeline, WholeFile, WholeStream};
pub use reader::{Conduit, InterleavedReader, ReaderState};
