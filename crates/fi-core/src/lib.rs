//! fi-core: shared types, errors, and configuration.
//!
//! This crate is the foundational dependency for the other fi-* crates,
//! providing the unified error taxonomy, the application configuration,
//! media-domain enums, and the strongly-typed [`StreamDescriptor`] registry
//! that every reader session is planned from.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod media;
pub mod plan;

// Re-export the most commonly used items at the crate root.
pub use descriptor::{select_streams, StreamDescriptor};
pub use error::{Error, ErrorKind, Result};
pub use media::*;
pub use plan::{frames_for, PlannedStream, StreamPlan, StreamRole};
