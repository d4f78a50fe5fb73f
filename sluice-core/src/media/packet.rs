//! Demultiplexed packets and read outcomes.

use bytes::Bytes;

/// One unit of encoded data belonging to a single stream.
///
/// Once returned by a container the packet is owned by the caller; the
/// container keeps no reference to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Index of the owning stream
    pub stream_index: u32,
    /// Encoded payload, opaque to the container
    pub data: Bytes,
    /// Presentation timestamp in the stream's time base
    pub pts: Option<i64>,
    /// Decode timestamp in the stream's time base
    pub dts: Option<i64>,
    /// Duration in the stream's time base
    pub duration: Option<i64>,
    /// Whether a decoder can start from this packet
    pub keyframe: bool,
    /// Byte offset of the payload in the source
    pub position: u64,
}

impl Packet {
    /// Creates a packet with no timing information.
    pub fn new(stream_index: u32, data: Bytes, position: u64) -> Self {
        Self {
            stream_index,
            data,
            pts: None,
            dts: None,
            duration: None,
            keyframe: false,
            position,
        }
    }

    /// Sets presentation and decode timestamps to the same value.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.pts = Some(timestamp);
        self.dts = Some(timestamp);
        self
    }

    /// Sets the duration.
    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Marks the packet as a keyframe.
    pub fn with_keyframe(mut self, keyframe: bool) -> Self {
        self.keyframe = keyframe;
        self
    }

    /// Returns the payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns the best available ordering timestamp.
    pub fn timestamp(&self) -> Option<i64> {
        self.pts.or(self.dts)
    }
}

/// Result of a single `read_packet` call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A packet was produced.
    Packet(Packet),
    /// The container has no more packets.
    EndOfStream,
}

impl ReadOutcome {
    /// Returns the packet, if any.
    pub fn into_packet(self) -> Option<Packet> {
        match self {
            ReadOutcome::Packet(packet) => Some(packet),
            ReadOutcome::EndOfStream => None,
        }
    }

    /// Checks whether this outcome signals end of stream.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, ReadOutcome::EndOfStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_builders() {
        let packet = Packet::new(2, Bytes::from_static(b"abc"), 100)
            .with_timestamp(7)
            .with_duration(1)
            .with_keyframe(true);

        assert_eq!(packet.stream_index, 2);
        assert_eq!(packet.size(), 3);
        assert_eq!(packet.pts, Some(7));
        assert_eq!(packet.dts, Some(7));
        assert_eq!(packet.timestamp(), Some(7));
        assert!(packet.keyframe);
    }

    #[test]
    fn test_timestamp_falls_back_to_dts() {
        let mut packet = Packet::new(0, Bytes::new(), 0);
        assert_eq!(packet.timestamp(), None);
        packet.dts = Some(3);
        assert_eq!(packet.timestamp(), Some(3));
    }

    #[test]
    fn test_read_outcome() {
        let outcome = ReadOutcome::Packet(Packet::new(0, Bytes::new(), 0));
        assert!(!outcome.is_end_of_stream());
        assert!(outcome.into_packet().is_some());
        assert!(ReadOutcome::EndOfStream.is_end_of_stream());
        assert!(ReadOutcome::EndOfStream.into_packet().is_none());
    }
}
