//! Error types for container probing and demultiplexing.

use thiserror::Error;

/// Errors surfaced by containers, the demuxer handle, and format resolution.
///
/// A format rejecting a byte source is not an error: it is reported as
/// [`Probe::NotRecognized`](crate::container::Probe::NotRecognized) and handled
/// by the registry, which only surfaces [`DemuxError::UnrecognizedFile`] once
/// every candidate has declined.
#[derive(Debug, Error)]
pub enum DemuxError {
    /// No registered container format recognized the byte source.
    #[error("Unrecognized file format (tried: {})", .tried.join(", "))]
    UnrecognizedFile {
        /// Names of the formats that were attempted, in resolution order.
        tried: Vec<&'static str>,
    },

    /// A recognized container hit structurally invalid or truncated data.
    ///
    /// Terminal for the container instance that produced it.
    #[error("Corrupt stream at byte {position}: {reason}")]
    CorruptStream {
        /// Byte offset in the source where the problem was detected.
        position: u64,
        /// Description of what was wrong.
        reason: String,
    },

    /// A read was attempted on a container that already failed.
    #[error("Container already failed, no further reads are possible")]
    ContainerFailed,

    /// The underlying byte source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DemuxError {
    /// Creates a corrupt stream error at the given source position.
    pub fn corrupt(position: u64, reason: impl Into<String>) -> Self {
        DemuxError::CorruptStream {
            position,
            reason: reason.into(),
        }
    }

    /// Classifies a read failure inside an already recognized container.
    ///
    /// Running out of bytes in the middle of a structure means the file is
    /// truncated, which is a stream problem rather than an I/O problem.
    pub fn from_read(error: std::io::Error, position: u64) -> Self {
        if error.kind() == std::io::ErrorKind::UnexpectedEof {
            DemuxError::corrupt(position, "unexpected end of file inside a structure")
        } else {
            DemuxError::Io(error)
        }
    }

    /// Checks whether this error leaves the container unusable.
    ///
    /// Every error raised by a read leaves the cursor in an indeterminate
    /// position, so only resolution failures are non-fatal.
    pub fn is_fatal(&self) -> bool {
        !self.is_unrecognized()
    }

    /// Checks whether this error means no format matched the source.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, DemuxError::UnrecognizedFile { .. })
    }
}

/// Result type for demultiplexing operations.
pub type DemuxResult<T> = Result<T, DemuxError>;

/// Failure while parsing a format header during a probe.
///
/// `Rejected` rolls the probe back and lets the next candidate try; `Io`
/// propagates to the caller of resolution.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The bytes are not this format.
    #[error("{0}")]
    Rejected(String),

    /// The byte source failed while probing.
    #[error(transparent)]
    Io(std::io::Error),
}

impl HeaderError {
    /// Creates a rejection with the given reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        HeaderError::Rejected(reason.into())
    }
}

impl From<std::io::Error> for HeaderError {
    fn from(error: std::io::Error) -> Self {
        // A header cut short cannot be recognized.
        if error.kind() == std::io::ErrorKind::UnexpectedEof {
            HeaderError::Rejected("header truncated".to_string())
        } else {
            HeaderError::Io(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_from_read_classifies_truncation_as_corruption() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "short");
        let error = DemuxError::from_read(eof, 42);
        assert!(matches!(
            error,
            DemuxError::CorruptStream { position: 42, .. }
        ));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            DemuxError::from_read(denied, 0),
            DemuxError::Io(_)
        ));
    }

    #[test]
    fn test_error_classification() {
        let unrecognized = DemuxError::UnrecognizedFile {
            tried: vec!["wav", "avi"],
        };
        assert!(unrecognized.is_unrecognized());
        assert!(!unrecognized.is_fatal());
        assert_eq!(
            unrecognized.to_string(),
            "Unrecognized file format (tried: wav, avi)"
        );

        assert!(DemuxError::corrupt(0, "bad").is_fatal());
        assert!(DemuxError::ContainerFailed.is_fatal());
    }

    #[test]
    fn test_header_error_from_io() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "short");
        assert!(matches!(HeaderError::from(eof), HeaderError::Rejected(_)));

        let other = io::Error::other("disk on fire");
        assert!(matches!(HeaderError::from(other), HeaderError::Io(_)));
    }
}
