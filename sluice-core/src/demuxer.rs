//! Demuxer handle enforcing the container lifecycle.
//!
//! Format implementations only have to produce packets; this wrapper owns
//! the lifecycle rules shared by all of them: end of stream is sticky, any
//! error is terminal, and packets must reference a declared stream.

use tracing::{debug, warn};

use crate::container::Container;
use crate::error::{DemuxError, DemuxResult};
use crate::media::{Packet, ReadOutcome, StreamMetadata};
use crate::source::MediaFile;

/// Lifecycle state of a [`Demuxer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxerState {
    /// Recognized and readable.
    Open,
    /// All packets have been read.
    EndOfStream,
    /// A read failed; the container is presumed corrupt or truncated.
    Failed,
}

/// Open handle on a recognized container.
pub struct Demuxer {
    container: Box<dyn Container>,
    state: DemuxerState,
    packets_read: u64,
}

impl Demuxer {
    /// Wraps a freshly recognized container.
    pub fn new(container: Box<dyn Container>) -> Self {
        Self {
            container,
            state: DemuxerState::Open,
            packets_read: 0,
        }
    }

    /// Returns the name of the recognized format.
    pub fn format_name(&self) -> &'static str {
        self.container.format_name()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> DemuxerState {
        self.state
    }

    /// Returns how many packets have been handed out so far.
    pub fn packets_read(&self) -> u64 {
        self.packets_read
    }

    /// Returns the current read position in the byte source.
    pub fn position(&self) -> u64 {
        self.container.position()
    }

    /// Returns the streams present in the container.
    pub fn available_streams(&self) -> &[StreamMetadata] {
        self.container.available_streams()
    }

    /// Looks up a stream by index.
    pub fn stream(&self, index: u32) -> Option<&StreamMetadata> {
        self.available_streams()
            .iter()
            .find(|stream| stream.index == index)
    }

    /// Reads the next packet.
    ///
    /// Once end of stream is reached every further call returns
    /// `ReadOutcome::EndOfStream`. Once a read fails every further call
    /// returns `DemuxError::ContainerFailed` without touching the source.
    ///
    /// # Errors
    ///
    /// - `DemuxError::CorruptStream` - Invalid data, including packets for undeclared streams
    /// - `DemuxError::Io` - Underlying byte source failed
    /// - `DemuxError::ContainerFailed` - A previous read already failed
    pub fn read_packet(&mut self) -> DemuxResult<ReadOutcome> {
        match self.state {
            DemuxerState::Failed => return Err(DemuxError::ContainerFailed),
            DemuxerState::EndOfStream => return Ok(ReadOutcome::EndOfStream),
            DemuxerState::Open => {}
        }

        let outcome = match self.container.read_packet() {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    format = self.format_name(),
                    packets_read = self.packets_read,
                    "Container failed: {e}"
                );
                self.state = DemuxerState::Failed;
                return Err(e);
            }
        };

        match outcome {
            ReadOutcome::Packet(packet) => {
                if self.stream(packet.stream_index).is_none() {
                    self.state = DemuxerState::Failed;
                    return Err(DemuxError::corrupt(
                        packet.position,
                        format!("packet references undeclared stream {}", packet.stream_index),
                    ));
                }
                self.packets_read += 1;
                Ok(ReadOutcome::Packet(packet))
            }
            ReadOutcome::EndOfStream => {
                debug!(
                    format = self.format_name(),
                    packets_read = self.packets_read,
                    "Reached end of stream"
                );
                self.state = DemuxerState::EndOfStream;
                Ok(ReadOutcome::EndOfStream)
            }
        }
    }

    /// Returns an iterator over the remaining packets.
    ///
    /// The iterator ends at end of stream and after yielding the first error.
    pub fn packets(&mut self) -> Packets<'_> {
        Packets { demuxer: self }
    }

    /// Closes the demuxer and hands the byte source back.
    pub fn into_source(self) -> MediaFile {
        self.container.into_source()
    }
}

impl std::fmt::Debug for Demuxer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Demuxer")
            .field("format", &self.format_name())
            .field("state", &self.state)
            .field("packets_read", &self.packets_read)
            .finish()
    }
}

/// Iterator returned by [`Demuxer::packets`].
pub struct Packets<'a> {
    demuxer: &'a mut Demuxer,
}

impl Iterator for Packets<'_> {
    type Item = DemuxResult<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.demuxer.state() != DemuxerState::Open {
            return None;
        }
        match self.demuxer.read_packet() {
            Ok(ReadOutcome::Packet(packet)) => Some(Ok(packet)),
            Ok(ReadOutcome::EndOfStream) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
