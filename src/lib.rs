//! ffinput - time-aligned reading of audio and subtitle streams
//!
//! A media source is probed, the selected audio and subtitle streams are
//! transcoded by ffmpeg into one conduit each, and the conduits are read back
//! in lockstep as a sequence of [`Block`]s: one block per time step, one slot
//! per selected stream.
//!
//! ```no_run
//! # async fn run() -> ffinput::Result<()> {
//! use ffinput::{Config, Session};
//!
//! let mut session = Session::open("movie.mkv", Config::default(), |s| s.kind.is_readable()).await?;
//! while let Some(block) = session.next_block().await? {
//!     println!("{:?} {}", block.position(), block.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod session;

pub use blocking::BlockingSession;
pub use session::{Session, SessionBuilder, Source};

pub use fi_av::{FfprobeProber, Prober, ToolRegistry};
pub use fi_core::config::{Config, CuePolicy};
pub use fi_core::{
    CodecKind, Error, ErrorKind, Result, StreamDescriptor, StreamPlan, SubtitleDialect,
};
pub use fi_sync::{AudioFrameBlock, Block, Cue, CueTimeline, Slot, WholeFile, WholeStream};
