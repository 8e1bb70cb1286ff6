//! Background copy of the source into the transcoder.

use std::io::ErrorKind;

use bytes::Bytes;
use futures::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

/// Copies already-buffered head bytes, then the rest of a source, into the
/// transcoder's input conduit, and closes the conduit at end of source.
#[derive(Debug)]
pub struct ConduitPump<S, W> {
    head: Bytes,
    source: S,
    sink: W,
    chunk_size: usize,
}

impl<S, W> ConduitPump<S, W>
where
    S: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(head: impl Into<Bytes>, source: S, sink: W, chunk_size: usize) -> Self {
        Self {
            head: head.into(),
            source,
            sink,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Run the pump on its own task.
    pub fn spawn(self) -> PumpHandle {
        PumpHandle {
            task: Some(tokio::spawn(self.run())),
        }
    }

    /// Copy until the source is exhausted and return the number of bytes
    /// delivered.
    ///
    /// A sink that stops accepting input (`BrokenPipe`) ends the pump
    /// normally: the transcoder has read all it needs. Every other I/O error
    /// is returned.
    pub async fn run(mut self) -> fi_core::Result<u64> {
        let mut written = 0u64;

        if !self.head.is_empty() {
            match self.sink.write_all(&self.head).await {
                Ok(()) => written += self.head.len() as u64,
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    tracing::debug!(written, "transcoder closed its input");
                    return Ok(written);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut chunk = vec![0u8; self.chunk_size];
        loop {
            let n = self.source.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            match self.sink.write_all(&chunk[..n]).await {
                Ok(()) => written += n as u64,
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    tracing::debug!(written, "transcoder closed its input");
                    return Ok(written);
                }
                Err(e) => return Err(e.into()),
            }
        }

        match self.sink.shutdown().await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(written, "source exhausted, transcoder input closed");
        Ok(written)
    }
}

/// Completion signal of a spawned [`ConduitPump`].
///
/// Dropping the handle aborts the pump.
#[derive(Debug)]
pub struct PumpHandle {
    task: Option<JoinHandle<fi_core::Result<u64>>>,
}

impl PumpHandle {
    /// Report a pump failure without waiting.
    ///
    /// Returns `Ok(())` while the pump is still running or after it finished
    /// cleanly. A failure is reported once.
    pub fn check(&mut self) -> fi_core::Result<()> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let Some(joined) = task.now_or_never() else {
            return Ok(());
        };
        self.task = None;
        settle(joined).map(|_| ())
    }

    /// Whether the pump has stopped, cleanly or not.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the pump to stop.
    pub async fn join(mut self) -> fi_core::Result<u64> {
        match self.task.take() {
            Some(task) => settle(task.await),
            None => Ok(0),
        }
    }
}

impl Drop for PumpHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn settle(
    joined: Result<fi_core::Result<u64>, tokio::task::JoinError>,
) -> fi_core::Result<u64> {
    match joined {
        Ok(Ok(written)) => Ok(written),
        Ok(Err(e)) => {
            tracing::error!("source pump failed: {e}");
            Err(e)
        }
        Err(e) => Err(fi_core::Error::Internal(format!("source pump task failed: {e}"))),
    }
}
