//! Sluice Core - Container format detection and packet demultiplexing
//!
//! This crate turns raw file bytes into a uniform sequence of packets plus
//! per-stream metadata: a format registry identifies which container a byte
//! source holds, and the winning container yields packets on demand.

pub mod config;
pub mod container;
pub mod demuxer;
pub mod error;
pub mod format;
pub mod media;
pub mod registry;
pub mod source;
pub mod tracing_setup;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

use std::path::Path;

// Re-export main types for convenient access
pub use config::SluiceConfig;
pub use container::{Container, ContainerFormat, Probe, probe_header};
pub use demuxer::{Demuxer, DemuxerState, Packets};
pub use error::{DemuxError, DemuxResult, HeaderError};
pub use media::{
    CodecId, Packet, Rational, ReadOutcome, StreamKind, StreamMetadata, StreamParameters,
};
pub use registry::{FormatRegistry, Resolution};
pub use source::{MediaFile, ProbeGuard};

/// Opens the file at `path` with the built-in formats and default configuration.
///
/// # Errors
///
/// - `DemuxError::Io` - File cannot be opened or read
/// - `DemuxError::UnrecognizedFile` - No built-in format recognized the file
pub fn open_path(path: impl AsRef<Path>) -> DemuxResult<Demuxer> {
    FormatRegistry::default().open_path(path)
}
