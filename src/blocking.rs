//! Synchronous access to a [`Session`].

use fi_core::config::Config;
use fi_core::{StreamDescriptor, StreamPlan};
use fi_sync::{Block, WholeFile};
use tokio::runtime::Runtime;

use crate::session::{Session, SessionBuilder, Source};

/// A session driven by its own runtime, iterated block by block.
///
/// The source pump keeps running on the runtime's worker between calls to
/// [`Iterator::next`].
#[derive(Debug)]
pub struct BlockingSession {
    // Dropped before the runtime so the transcoder is killed while its
    // driver is still alive.
    session: Session,
    runtime: Runtime,
}

impl BlockingSession {
    /// Open a session with the default tools.
    pub fn open<F>(source: impl Into<Source>, config: Config, predicate: F) -> fi_core::Result<Self>
    where
        F: FnMut(&StreamDescriptor) -> bool,
    {
        Self::with_builder(SessionBuilder::new(config), source, predicate)
    }

    pub fn with_builder<F>(
        builder: SessionBuilder,
        source: impl Into<Source>,
        predicate: F,
    ) -> fi_core::Result<Self>
    where
        F: FnMut(&StreamDescriptor) -> bool,
    {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        let session = runtime.block_on(builder.open(source, predicate))?;
        Ok(Self { session, runtime })
    }

    pub fn plan(&self) -> &StreamPlan {
        self.session.plan()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drain the rest of the session at once.
    pub fn read_all(self) -> fi_core::Result<WholeFile> {
        let Self { session, runtime } = self;
        runtime.block_on(session.read_all())
    }

    /// Stop early and kill the transcoder.
    pub fn close(self) {
        let Self { session, runtime } = self;
        runtime.block_on(session.close());
    }
}

impl Iterator for BlockingSession {
    type Item = fi_core::Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.session.next_block()).transpose()
    }
}
