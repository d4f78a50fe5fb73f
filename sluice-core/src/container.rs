//! Container abstraction and the construction-by-probing protocol.
//!
//! Every supported file format provides two pieces:
//!
//! - a [`ContainerFormat`] descriptor that knows how to recognize the format
//!   and build a container from a byte source;
//! - a [`Container`] implementation that owns the source once recognized and
//!   yields packets from it.
//!
//! The dispatch surface of an open container is deliberately small, limited
//! to [`Container::read_packet`] and [`Container::available_streams`], so any
//! format can stand in for any other behind `Box<dyn Container>`.

use std::fmt;

use tracing::{debug, warn};

use crate::error::{DemuxError, DemuxResult, HeaderError};
use crate::media::{ReadOutcome, StreamMetadata};
use crate::source::MediaFile;

/// An open, recognized container file.
///
/// Implementations read the source strictly forward: each call to
/// [`read_packet`](Container::read_packet) continues from where the previous
/// one stopped.
pub trait Container: Send {
    /// Returns the short name of the format, matching [`ContainerFormat::name`].
    fn format_name(&self) -> &'static str;

    /// Reads the next packet.
    ///
    /// # Errors
    ///
    /// - `DemuxError::CorruptStream` - Structurally invalid or truncated data
    /// - `DemuxError::Io` - Underlying byte source failed
    fn read_packet(&mut self) -> DemuxResult<ReadOutcome>;

    /// Returns the streams present in the container.
    ///
    /// Stable across calls; the built-in formats declare every stream in
    /// their headers and never discover new ones while reading.
    fn available_streams(&self) -> &[StreamMetadata];

    /// Returns the current read position in the byte source.
    fn position(&self) -> u64;

    /// Closes the container and hands the byte source back.
    fn into_source(self: Box<Self>) -> MediaFile;
}

/// Outcome of attempting to construct a container from a byte source.
pub enum Probe {
    /// The format matched; the container now owns the source.
    Recognized(Box<dyn Container>),
    /// The format did not match; the source is returned at its original position.
    NotRecognized(MediaFile),
}

impl Probe {
    /// Checks whether the probe recognized the source.
    pub fn is_recognized(&self) -> bool {
        matches!(self, Probe::Recognized(_))
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Recognized(container) => f
                .debug_tuple("Recognized")
                .field(&container.format_name())
                .finish(),
            Probe::NotRecognized(file) => f.debug_tuple("NotRecognized").field(file).finish(),
        }
    }
}

/// Descriptor and factory for one container format.
///
/// Registered with a [`FormatRegistry`](crate::registry::FormatRegistry);
/// implement it to plug a new format into resolution.
pub trait ContainerFormat: Send + Sync {
    /// Short, unique format name (e.g. `"avi"`).
    fn name(&self) -> &'static str;

    /// File extensions conventionally used for this format, lowercase.
    fn extensions(&self) -> &'static [&'static str];

    /// MIME type for this format.
    fn mime_type(&self) -> &'static str;

    /// Attempts to construct a container from `file`.
    ///
    /// Must either return [`Probe::Recognized`] with the source positioned
    /// for sequential reads, or [`Probe::NotRecognized`] with the source
    /// restored to the position it had on entry.
    ///
    /// # Errors
    ///
    /// - `DemuxError::Io` - Underlying byte source failed while probing
    fn open(&self, file: MediaFile) -> DemuxResult<Probe>;
}

/// Runs a header parser inside a probe on `file`.
///
/// Commits the probe and returns the parsed header when `parse` succeeds.
/// Rolls back and returns `None` when `parse` rejects the bytes, including a
/// header cut short by end of file.
///
/// # Errors
///
/// - `DemuxError::Io` - Byte source failed while parsing or rolling back
pub fn probe_header<H>(
    file: &mut MediaFile,
    format: &'static str,
    parse: impl FnOnce(&mut MediaFile) -> Result<H, HeaderError>,
) -> DemuxResult<Option<H>> {
    let mut probe = file.begin_probe();

    match parse(&mut *probe) {
        Ok(header) => {
            debug!(
                format,
                header_bytes = probe.consumed(),
                "Format recognized byte source"
            );
            probe.commit();
            Ok(Some(header))
        }
        Err(HeaderError::Rejected(reason)) => {
            debug!(format, %reason, "Format rejected byte source");
            probe.rollback()?;
            Ok(None)
        }
        Err(HeaderError::Io(e)) => {
            if let Err(rollback_error) = probe.rollback() {
                warn!(format, "Rollback after I/O failure also failed: {rollback_error}");
            }
            Err(DemuxError::Io(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_probe_header_commits_on_success() {
        let mut file = MediaFile::from_bytes(&b"MAGIrest"[..]);
        let header = probe_header(&mut file, "test", |f| {
            let magic = f.read_fourcc()?;
            if &magic != b"MAGI" {
                return Err(HeaderError::rejected("bad magic"));
            }
            Ok(magic)
        })
        .unwrap();

        assert_eq!(header, Some(*b"MAGI"));
        assert_eq!(file.position(), 4);
        assert!(!file.is_probing());
    }

    #[test]
    fn test_probe_header_rolls_back_on_rejection() {
        let mut file = MediaFile::from_bytes(&b"NOPEnope"[..]);
        let header: Option<()> = probe_header(&mut file, "test", |f| {
            f.read_bytes(6)?;
            Err(HeaderError::rejected("not ours"))
        })
        .unwrap();

        assert!(header.is_none());
        assert_eq!(file.position(), 0);
    }

    #[test]
    fn test_probe_header_treats_truncation_as_rejection() {
        let mut file = MediaFile::from_bytes(&b"AB"[..]);
        let header = probe_header(&mut file, "test", |f| Ok(f.read_u32_le()?)).unwrap();

        assert!(header.is_none());
        assert_eq!(file.position(), 0);
    }

    #[test]
    fn test_probe_header_propagates_io_errors() {
        let mut file = MediaFile::from_bytes(&b"ABCDEFGH"[..]);
        let result: DemuxResult<Option<()>> = probe_header(&mut file, "test", |f| {
            f.skip(3)?;
            Err(HeaderError::Io(io::Error::other("device unplugged")))
        });

        assert!(matches!(result, Err(DemuxError::Io(_))));
        assert_eq!(file.position(), 0);
    }
}
