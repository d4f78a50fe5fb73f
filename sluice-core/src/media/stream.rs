//! Stream descriptions exposed by containers.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Serialize, Serializer};

/// Rational number used for time bases and frame rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rational {
    /// Numerator
    pub num: u32,
    /// Denominator
    pub den: u32,
}

impl Rational {
    /// Creates a new rational number.
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Returns the value as a float, or `None` for a zero denominator.
    pub fn to_f64(self) -> Option<f64> {
        if self.den == 0 {
            None
        } else {
            Some(self.num as f64 / self.den as f64)
        }
    }

    /// Returns the reciprocal, e.g. a frame rate from a frame duration.
    pub fn invert(self) -> Self {
        Self::new(self.den, self.num)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Broad category of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Audio samples
    Audio,
    /// Video frames
    Video,
    /// Subtitles or other timed text
    Subtitle,
    /// Anything else (MIDI, data tracks, ...)
    Other,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Audio => write!(f, "audio"),
            StreamKind::Video => write!(f, "video"),
            StreamKind::Subtitle => write!(f, "subtitle"),
            StreamKind::Other => write!(f, "other"),
        }
    }
}

/// Codec carried by a stream.
///
/// Containers map their native identifiers onto the known variants and keep
/// the raw identifier in [`CodecId::Unknown`] otherwise, so decoders can still
/// make their own decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    PcmU8,
    PcmS16Le,
    PcmS24Le,
    PcmS32Le,
    PcmF32Le,
    PcmF64Le,
    PcmAlaw,
    PcmMulaw,
    Mp3,
    Aac,
    Ac3,
    H264,
    Mpeg4Part2,
    Mjpeg,
    DivxSubtitle,
    /// Identifier the container does not map to a known codec.
    Unknown(CodecTag),
}

/// Raw codec identifier as stored by a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecTag {
    /// Four character code (AVI `fccHandler`, BITMAPINFOHEADER compression)
    FourCc([u8; 4]),
    /// WAVEFORMATEX `wFormatTag`
    WaveFormat(u16),
}

impl CodecId {
    /// Checks whether this codec is uncompressed PCM.
    pub fn is_pcm(self) -> bool {
        matches!(
            self,
            CodecId::PcmU8
                | CodecId::PcmS16Le
                | CodecId::PcmS24Le
                | CodecId::PcmS32Le
                | CodecId::PcmF32Le
                | CodecId::PcmF64Le
                | CodecId::PcmAlaw
                | CodecId::PcmMulaw
        )
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CodecId::PcmU8 => "pcm_u8",
            CodecId::PcmS16Le => "pcm_s16le",
            CodecId::PcmS24Le => "pcm_s24le",
            CodecId::PcmS32Le => "pcm_s32le",
            CodecId::PcmF32Le => "pcm_f32le",
            CodecId::PcmF64Le => "pcm_f64le",
            CodecId::PcmAlaw => "pcm_alaw",
            CodecId::PcmMulaw => "pcm_mulaw",
            CodecId::Mp3 => "mp3",
            CodecId::Aac => "aac",
            CodecId::Ac3 => "ac3",
            CodecId::H264 => "h264",
            CodecId::Mpeg4Part2 => "mpeg4",
            CodecId::Mjpeg => "mjpeg",
            CodecId::DivxSubtitle => "xsub",
            CodecId::Unknown(tag) => return write!(f, "unknown({tag})"),
        };
        f.write_str(name)
    }
}

impl fmt::Display for CodecTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecTag::FourCc(code) => write!(f, "{}", fourcc_to_string(*code)),
            CodecTag::WaveFormat(tag) => write!(f, "0x{tag:04x}"),
        }
    }
}

impl Serialize for CodecId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Renders a FourCC for display, replacing non-printable bytes with `.`.
pub fn fourcc_to_string(code: [u8; 4]) -> String {
    code.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

/// Parameters of an audio stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioParameters {
    pub codec: CodecId,
    /// Sample rate in Hz
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: Option<u16>,
    /// Bytes per sample frame across all channels
    pub block_align: Option<u16>,
    /// Bits per second, if declared
    pub bit_rate: Option<u64>,
}

/// Parameters of a video stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoParameters {
    pub codec: CodecId,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<Rational>,
    pub bits_per_pixel: Option<u16>,
}

/// Parameters of a subtitle stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleParameters {
    pub codec: CodecId,
}

/// Parameters of a stream the data model has no dedicated shape for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtherParameters {
    pub codec: CodecId,
    /// Free-form, format-specific properties
    pub properties: BTreeMap<String, String>,
}

/// Kind-tagged, format-specific description of a stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StreamParameters {
    Audio(AudioParameters),
    Video(VideoParameters),
    Subtitle(SubtitleParameters),
    Other(OtherParameters),
}

impl StreamParameters {
    /// Returns the stream kind this payload describes.
    pub fn kind(&self) -> StreamKind {
        match self {
            StreamParameters::Audio(_) => StreamKind::Audio,
            StreamParameters::Video(_) => StreamKind::Video,
            StreamParameters::Subtitle(_) => StreamKind::Subtitle,
            StreamParameters::Other(_) => StreamKind::Other,
        }
    }

    /// Returns the codec regardless of stream kind.
    pub fn codec(&self) -> CodecId {
        match self {
            StreamParameters::Audio(p) => p.codec,
            StreamParameters::Video(p) => p.codec,
            StreamParameters::Subtitle(p) => p.codec,
            StreamParameters::Other(p) => p.codec,
        }
    }
}

/// Description of one logical stream inside a container.
///
/// Owned by the container that produced it. Indices are unique within that
/// container and do not change while it is open.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamMetadata {
    /// Index referenced by [`Packet::stream_index`](crate::media::Packet::stream_index)
    pub index: u32,
    /// Unit of packet timestamps for this stream
    pub time_base: Option<Rational>,
    /// Stream length in time base units, when the header declares it
    pub duration: Option<u64>,
    /// Human-readable stream name
    pub name: Option<String>,
    /// Codec private data needed to configure a decoder
    #[serde(skip)]
    pub extradata: Bytes,
    pub params: StreamParameters,
}

impl StreamMetadata {
    /// Creates metadata with no optional fields set.
    pub fn new(index: u32, params: StreamParameters) -> Self {
        Self {
            index,
            time_base: None,
            duration: None,
            name: None,
            extradata: Bytes::new(),
            params,
        }
    }

    /// Sets the time base.
    pub fn with_time_base(mut self, time_base: Rational) -> Self {
        self.time_base = Some(time_base);
        self
    }

    /// Sets the declared duration.
    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the stream name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the codec private data.
    pub fn with_extradata(mut self, extradata: Bytes) -> Self {
        self.extradata = extradata;
        self
    }

    /// Returns the stream kind.
    pub fn kind(&self) -> StreamKind {
        self.params.kind()
    }

    /// Returns the stream codec.
    pub fn codec(&self) -> CodecId {
        self.params.codec()
    }

    /// Returns the declared duration in seconds, if both duration and time
    /// base are known.
    pub fn duration_seconds(&self) -> Option<f64> {
        let duration = self.duration?;
        let time_base = self.time_base?;
        if time_base.den == 0 {
            return None;
        }
        Some(duration as f64 * time_base.num as f64 / time_base.den as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio_stream() -> StreamMetadata {
        StreamMetadata::new(
            0,
            StreamParameters::Audio(AudioParameters {
                codec: CodecId::PcmS16Le,
                sample_rate: 44_100,
                channels: 2,
                bits_per_sample: Some(16),
                block_align: Some(4),
                bit_rate: None,
            }),
        )
        .with_time_base(Rational::new(1, 44_100))
        .with_duration(88_200)
    }

    #[test]
    fn test_kind_and_codec_follow_parameters() {
        let stream = audio_stream();
        assert_eq!(stream.kind(), StreamKind::Audio);
        assert_eq!(stream.codec(), CodecId::PcmS16Le);
        assert!(stream.codec().is_pcm());
    }

    #[test]
    fn test_duration_seconds() {
        let stream = audio_stream();
        assert_eq!(stream.duration_seconds(), Some(2.0));

        let untimed = StreamMetadata::new(
            1,
            StreamParameters::Subtitle(SubtitleParameters {
                codec: CodecId::DivxSubtitle,
            }),
        );
        assert_eq!(untimed.duration_seconds(), None);
    }

    #[test]
    fn test_codec_display() {
        assert_eq!(CodecId::H264.to_string(), "h264");
        assert_eq!(
            CodecId::Unknown(CodecTag::FourCc(*b"HFYU")).to_string(),
            "unknown(HFYU)"
        );
        assert_eq!(
            CodecId::Unknown(CodecTag::WaveFormat(0x0161)).to_string(),
            "unknown(0x0161)"
        );
    }

    #[test]
    fn test_fourcc_to_string_masks_binary() {
        assert_eq!(fourcc_to_string(*b"vids"), "vids");
        assert_eq!(fourcc_to_string([0, b'a', 0xFF, b' ']), ".a. ");
    }

    #[test]
    fn test_rational() {
        let frame_duration = Rational::new(1, 25);
        assert_eq!(frame_duration.invert(), Rational::new(25, 1));
        assert_eq!(frame_duration.to_f64(), Some(0.04));
        assert_eq!(Rational::new(1, 0).to_f64(), None);
        assert_eq!(frame_duration.to_string(), "1/25");
    }

    #[test]
    fn test_serializes_kind_tagged_parameters() {
        let json = serde_json::to_value(audio_stream().with_name("Main")).unwrap();

        assert_eq!(json["index"], 0);
        assert_eq!(json["name"], "Main");
        assert_eq!(json["params"]["kind"], "audio");
        assert_eq!(json["params"]["codec"], "pcm_s16le");
        assert_eq!(json["params"]["sample_rate"], 44_100);
        assert!(json.get("extradata").is_none());
    }
}
