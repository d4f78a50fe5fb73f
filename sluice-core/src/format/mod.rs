//! Built-in container formats.
//!
//! Resolution order of the default registry is WAV, AVI, ADTS: the two RIFF
//! formats are identified by an exact form type and cannot both match, while
//! ADTS only has a 12-bit sync word and goes last.

pub mod adts;
pub mod avi;
pub mod wav;

use std::io;

use bytes::Bytes;
pub use adts::AdtsFormat;
pub use avi::AviFormat;
pub use wav::WavFormat;

use crate::media::{AudioParameters, CodecId, CodecTag};
use crate::source::MediaFile;

/// Header of a RIFF chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChunkHeader {
    pub id: [u8; 4],
    pub size: u32,
    /// Source offset of the first payload byte
    pub data_start: u64,
}

impl ChunkHeader {
    /// Reads a chunk header at the current position.
    pub fn read(file: &mut MediaFile) -> io::Result<Self> {
        let id = file.read_fourcc()?;
        let size = file.read_u32_le()?;
        Ok(Self {
            id,
            size,
            data_start: file.position(),
        })
    }

    /// Payload size including the pad byte RIFF adds after odd-sized chunks.
    pub fn padded_size(&self) -> u64 {
        u64::from(self.size) + u64::from(self.size & 1)
    }
}

/// Iterates the chunks of an in-memory RIFF list payload.
///
/// Stops at the first chunk whose declared size overruns the buffer.
pub(crate) struct SliceChunks<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceChunks<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for SliceChunks<'a> {
    type Item = ([u8; 4], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let id: [u8; 4] = self.data.get(self.pos..self.pos + 4)?.try_into().ok()?;
        let size = le_u32(self.data, self.pos + 4)? as usize;
        let start = self.pos + 8;
        let payload = self.data.get(start..start.checked_add(size)?)?;

        self.pos = start + size + (size & 1);
        Some((id, payload))
    }
}

pub(crate) fn le_u16(data: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(data.get(at..at + 2)?.try_into().ok()?))
}

pub(crate) fn le_u32(data: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(data.get(at..at + 4)?.try_into().ok()?))
}

pub(crate) fn fourcc_at(data: &[u8], at: usize) -> Option<[u8; 4]> {
    data.get(at..at + 4)?.try_into().ok()
}

const WAVE_FORMAT_PCM: u16 = 0x0001;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
const WAVE_FORMAT_ALAW: u16 = 0x0006;
const WAVE_FORMAT_MULAW: u16 = 0x0007;
const WAVE_FORMAT_MPEGLAYER3: u16 = 0x0055;
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Parsed `WAVEFORMATEX`, shared by WAV `fmt ` and AVI audio `strf` chunks.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WaveFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Bytes after `cbSize`, used as codec extradata
    pub extra: Bytes,
}

impl WaveFormat {
    /// Parses a `WAVEFORMAT`/`WAVEFORMATEX`/`WAVEFORMATEXTENSIBLE` payload.
    ///
    /// For the extensible form the sub-format GUID's leading tag replaces
    /// `format_tag`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut format = Self {
            format_tag: le_u16(data, 0)?,
            channels: le_u16(data, 2)?,
            sample_rate: le_u32(data, 4)?,
            avg_bytes_per_sec: le_u32(data, 8)?,
            block_align: le_u16(data, 12)?,
            // Plain WAVEFORMAT (14 bytes) has no bits per sample
            bits_per_sample: le_u16(data, 14).unwrap_or(0),
            extra: Bytes::new(),
        };

        if let Some(cb_size) = le_u16(data, 16) {
            let end = (18 + cb_size as usize).min(data.len());
            format.extra = Bytes::copy_from_slice(&data[18..end]);
        }

        if format.format_tag == WAVE_FORMAT_EXTENSIBLE {
            // validBits(2) channelMask(4) then the SubFormat GUID
            if let Some(sub_format) = le_u16(&format.extra, 6) {
                format.format_tag = sub_format;
            }
        }

        Some(format)
    }

    /// Maps the format tag and sample size to a codec.
    pub fn codec(&self) -> CodecId {
        match (self.format_tag, self.bits_per_sample) {
            (WAVE_FORMAT_PCM, 8) => CodecId::PcmU8,
            (WAVE_FORMAT_PCM, 16) => CodecId::PcmS16Le,
            (WAVE_FORMAT_PCM, 24) => CodecId::PcmS24Le,
            (WAVE_FORMAT_PCM, 32) => CodecId::PcmS32Le,
            (WAVE_FORMAT_IEEE_FLOAT, 32) => CodecId::PcmF32Le,
            (WAVE_FORMAT_IEEE_FLOAT, 64) => CodecId::PcmF64Le,
            (WAVE_FORMAT_ALAW, _) => CodecId::PcmAlaw,
            (WAVE_FORMAT_MULAW, _) => CodecId::PcmMulaw,
            (WAVE_FORMAT_MPEGLAYER3, _) => CodecId::Mp3,
            (0x00FF | 0x1610 | 0x706D, _) => CodecId::Aac,
            (0x2000, _) => CodecId::Ac3,
            (tag, _) => CodecId::Unknown(CodecTag::WaveFormat(tag)),
        }
    }

    pub fn audio_parameters(&self) -> AudioParameters {
        AudioParameters {
            codec: self.codec(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: (self.bits_per_sample > 0).then_some(self.bits_per_sample),
            block_align: (self.block_align > 0).then_some(self.block_align),
            bit_rate: (self.avg_bytes_per_sec > 0).then(|| u64::from(self.avg_bytes_per_sec) * 8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waveformatex(tag: u16, channels: u16, rate: u32, bits: u16, extra: &[u8]) -> Vec<u8> {
        let block_align = channels * bits / 8;
        let mut data = Vec::new();
        data.extend_from_slice(&tag.to_le_bytes());
        data.extend_from_slice(&channels.to_le_bytes());
        data.extend_from_slice(&rate.to_le_bytes());
        data.extend_from_slice(&(rate * u32::from(block_align)).to_le_bytes());
        data.extend_from_slice(&block_align.to_le_bytes());
        data.extend_from_slice(&bits.to_le_bytes());
        data.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        data.extend_from_slice(extra);
        data
    }

    #[test]
    fn test_parse_pcm_format() {
        let format = WaveFormat::parse(&waveformatex(1, 2, 48_000, 24, &[])).unwrap();
        assert_eq!(format.codec(), CodecId::PcmS24Le);
        assert_eq!(format.block_align, 6);

        let params = format.audio_parameters();
        assert_eq!(params.sample_rate, 48_000);
        assert_eq!(params.channels, 2);
        assert_eq!(params.bit_rate, Some(48_000 * 6 * 8));
    }

    #[test]
    fn test_parse_extensible_uses_sub_format() {
        let mut extra = Vec::new();
        extra.extend_from_slice(&32u16.to_le_bytes()); // valid bits
        extra.extend_from_slice(&3u32.to_le_bytes()); // channel mask
        extra.extend_from_slice(&WAVE_FORMAT_IEEE_FLOAT.to_le_bytes());
        extra.extend_from_slice(&[0u8; 14]); // rest of the GUID

        let format = WaveFormat::parse(&waveformatex(0xFFFE, 2, 44_100, 32, &extra)).unwrap();
        assert_eq!(format.format_tag, WAVE_FORMAT_IEEE_FLOAT);
        assert_eq!(format.codec(), CodecId::PcmF32Le);
    }

    #[test]
    fn test_unknown_tag_is_preserved() {
        let format = WaveFormat::parse(&waveformatex(0x0161, 2, 44_100, 16, &[])).unwrap();
        assert_eq!(
            format.codec(),
            CodecId::Unknown(CodecTag::WaveFormat(0x0161))
        );
    }

    #[test]
    fn test_parse_rejects_short_payload() {
        assert!(WaveFormat::parse(&[1, 0, 2, 0]).is_none());
    }

    #[test]
    fn test_slice_chunks_pads_odd_sizes() {
        let mut data = Vec::new();
        data.extend_from_slice(b"odd ");
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[1, 2, 3, 0]); // payload + pad
        data.extend_from_slice(b"next");
        data.extend_from_slice(&1u32.to_le_bytes());
        data.push(9);

        let chunks: Vec<_> = SliceChunks::new(&data).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], (*b"odd ", &[1u8, 2, 3][..]));
        assert_eq!(chunks[1], (*b"next", &[9u8][..]));
    }

    #[test]
    fn test_slice_chunks_stops_on_overrun() {
        let mut data = Vec::new();
        data.extend_from_slice(b"big ");
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 10]);

        assert_eq!(SliceChunks::new(&data).count(), 0);
    }
}
