//! Packet and stream data model shared by every container format.

pub mod packet;
pub mod stream;

pub use packet::{Packet, ReadOutcome};
pub use stream::{
    AudioParameters, CodecId, CodecTag, OtherParameters, Rational, StreamKind, StreamMetadata,
    StreamParameters, SubtitleParameters, VideoParameters, fourcc_to_string,
};
