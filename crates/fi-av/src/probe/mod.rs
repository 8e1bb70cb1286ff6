//! Stream metadata probing.
//!
//! A [`Prober`] turns the first block of a source into the list of
//! [`StreamDescriptor`]s the rest of the session is planned from.

mod ffprobe;

pub use ffprobe::{parse_probe_output, FfprobeProber};

use async_trait::async_trait;
use fi_core::StreamDescriptor;

/// Reads stream metadata from the head of a source.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait]
pub trait Prober: Send + Sync {
    /// A short name identifying this prober (e.g. "ffprobe").
    fn name(&self) -> &'static str;

    /// Describe every stream found in `head`, in source order.
    ///
    /// Any failure (tool missing, timeout, unreadable output) is reported as
    /// [`fi_core::Error::Probe`].
    async fn probe(&self, head: &[u8]) -> fi_core::Result<Vec<StreamDescriptor>>;
}
