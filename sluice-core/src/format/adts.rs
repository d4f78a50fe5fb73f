//! ADTS (raw AAC) support.
//!
//! A headerless stream of AAC frames, each carrying its own 7 or 9 byte
//! header. Recognition relies on the 12-bit sync word, so a candidate frame
//! is only accepted when its length lands on another sync word or on the
//! exact end of the file.

use bytes::Bytes;
use tracing::{debug, trace};

use crate::config::SluiceConfig;
use crate::container::{Container, ContainerFormat, Probe, probe_header};
use crate::error::{DemuxError, DemuxResult, HeaderError};
use crate::media::{
    AudioParameters, CodecId, Packet, Rational, ReadOutcome, StreamMetadata, StreamParameters,
};
use crate::source::MediaFile;

const FORMAT_NAME: &str = "adts";

const HEADER_LEN: usize = 7;
const CRC_LEN: usize = 2;
const SAMPLES_PER_BLOCK: u32 = 1024;
const ID3V1_TAG_LEN: u64 = 128;

const SAMPLE_RATES: [u32; 13] = [
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025,
    8_000, 7_350,
];

/// Descriptor for raw AAC streams in ADTS framing.
#[derive(Debug, Clone)]
pub struct AdtsFormat {
    config: SluiceConfig,
}

impl AdtsFormat {
    pub fn new(config: &SluiceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Default for AdtsFormat {
    fn default() -> Self {
        Self::new(&SluiceConfig::default())
    }
}

impl ContainerFormat for AdtsFormat {
    fn name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["aac", "adts"]
    }

    fn mime_type(&self) -> &'static str {
        "audio/aac"
    }

    fn open(&self, mut file: MediaFile) -> DemuxResult<Probe> {
        let id3_skip_limit = self.config.probe.id3_skip_limit;
        let Some(header) = probe_header(&mut file, FORMAT_NAME, |f| {
            parse_header(f, id3_skip_limit)
        })?
        else {
            return Ok(Probe::NotRecognized(file));
        };

        Ok(Probe::Recognized(Box::new(AdtsContainer::new(file, header))))
    }
}

/// Fixed and variable fields of one ADTS frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    /// Audio object type minus one (0 = Main, 1 = LC, 2 = SSR, 3 = LTP)
    pub profile: u8,
    pub sampling_index: u8,
    pub channel_config: u8,
    pub protection_absent: bool,
    /// Total frame size including the header
    pub frame_length: u16,
    /// Raw data blocks in the frame minus one
    pub raw_blocks: u8,
}

impl FrameHeader {
    /// Decodes a header, returning `None` if the bytes are not a valid one.
    pub fn parse(raw: &[u8; HEADER_LEN]) -> Option<Self> {
        if raw[0] != 0xFF || raw[1] & 0xF0 != 0xF0 {
            return None;
        }
        // Layer is always zero for AAC
        if raw[1] & 0x06 != 0 {
            return None;
        }

        let header = Self {
            profile: raw[2] >> 6,
            sampling_index: (raw[2] >> 2) & 0x0F,
            channel_config: ((raw[2] & 0x01) << 2) | (raw[3] >> 6),
            protection_absent: raw[1] & 0x01 == 1,
            frame_length: (u16::from(raw[3] & 0x03) << 11)
                | (u16::from(raw[4]) << 3)
                | (u16::from(raw[5]) >> 5),
            raw_blocks: raw[6] & 0x03,
        };

        if usize::from(header.sampling_index) >= SAMPLE_RATES.len() {
            return None;
        }
        if usize::from(header.frame_length) < header.header_len() {
            return None;
        }
        Some(header)
    }

    pub fn header_len(&self) -> usize {
        if self.protection_absent {
            HEADER_LEN
        } else {
            HEADER_LEN + CRC_LEN
        }
    }

    pub fn sample_rate(&self) -> u32 {
        SAMPLE_RATES[usize::from(self.sampling_index)]
    }

    pub fn samples(&self) -> u32 {
        SAMPLES_PER_BLOCK * (u32::from(self.raw_blocks) + 1)
    }

    /// Checks that `next` continues the same stream.
    fn continues(&self, next: &FrameHeader) -> bool {
        self.profile == next.profile
            && self.sampling_index == next.sampling_index
            && self.channel_config == next.channel_config
    }

    /// Channel count for the channel configuration; 0 means set in-band.
    fn channels(&self) -> u16 {
        match self.channel_config {
            7 => 8,
            n => u16::from(n),
        }
    }

    /// Builds the two-byte AudioSpecificConfig a decoder needs.
    fn audio_specific_config(&self) -> Bytes {
        let object_type = u16::from(self.profile) + 1;
        let config = (object_type << 11)
            | (u16::from(self.sampling_index) << 7)
            | (u16::from(self.channel_config) << 3);
        Bytes::copy_from_slice(&config.to_be_bytes())
    }
}

/// Skips an ID3v2 tag at the current position, if there is one.
fn skip_id3v2(file: &mut MediaFile, limit: u32) -> Result<(), HeaderError> {
    let magic = file.peek(3)?;
    if magic.as_ref() != b"ID3" {
        return Ok(());
    }

    let _id3 = file.read_bytes(3)?;
    let _version = file.read_u16_be()?;
    let flags = file.read_u8()?;
    let raw_size = file.read_u32_be()?;
    if raw_size & 0x8080_8080 != 0 {
        return Err(HeaderError::rejected("ID3v2 size is not syncsafe"));
    }

    let size = ((raw_size & 0x7F00_0000) >> 3)
        | ((raw_size & 0x007F_0000) >> 2)
        | ((raw_size & 0x0000_7F00) >> 1)
        | (raw_size & 0x0000_007F);
    let footer = if flags & 0x10 != 0 { 10 } else { 0 };
    let tag_len = size + footer;
    if tag_len > limit {
        return Err(HeaderError::rejected(format!(
            "ID3v2 tag of {tag_len} bytes exceeds skip limit"
        )));
    }

    trace!(tag_len, "Skipping ID3v2 tag");
    file.skip(u64::from(tag_len))?;
    Ok(())
}

fn read_frame_header(file: &mut MediaFile) -> Result<FrameHeader, HeaderError> {
    let mut raw = [0u8; HEADER_LEN];
    raw.copy_from_slice(&file.read_bytes(HEADER_LEN)?);
    FrameHeader::parse(&raw).ok_or_else(|| HeaderError::rejected("no ADTS sync word"))
}

/// Validates the first frame and leaves the source positioned on it.
fn parse_header(file: &mut MediaFile, id3_skip_limit: u32) -> Result<FrameHeader, HeaderError> {
    skip_id3v2(file, id3_skip_limit)?;

    let mut lookahead = file.begin_probe();
    let first = read_frame_header(&mut lookahead)?;
    lookahead.skip(u64::from(first.frame_length) - HEADER_LEN as u64)?;

    let id3v1_trailer = lookahead.remaining() == Some(ID3V1_TAG_LEN)
        && lookahead.peek(3)?.as_ref() == b"TAG";
    if lookahead.remaining() != Some(0) && !id3v1_trailer {
        let next = read_frame_header(&mut lookahead)?;
        if !first.continues(&next) {
            return Err(HeaderError::rejected(
                "second ADTS frame does not continue the first",
            ));
        }
    }
    lookahead.rollback()?;

    Ok(first)
}

/// Open ADTS stream.
pub struct AdtsContainer {
    file: MediaFile,
    streams: Vec<StreamMetadata>,
    samples_read: u64,
}

impl AdtsContainer {
    fn new(file: MediaFile, first: FrameHeader) -> Self {
        let params = AudioParameters {
            codec: CodecId::Aac,
            sample_rate: first.sample_rate(),
            channels: first.channels(),
            bits_per_sample: None,
            block_align: None,
            bit_rate: None,
        };
        let stream = StreamMetadata::new(0, StreamParameters::Audio(params))
            .with_time_base(Rational::new(1, first.sample_rate()))
            .with_extradata(first.audio_specific_config());

        debug!(
            profile = first.profile,
            sample_rate = first.sample_rate(),
            channels = first.channels(),
            start = file.position(),
            "Opened ADTS stream"
        );

        Self {
            file,
            streams: vec![stream],
            samples_read: 0,
        }
    }
}

impl Container for AdtsContainer {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn read_packet(&mut self) -> DemuxResult<ReadOutcome> {
        let position = self.file.position();

        let mut raw = [0u8; HEADER_LEN];
        match self.file.fill(&mut raw)? {
            0 => return Ok(ReadOutcome::EndOfStream),
            HEADER_LEN => {}
            n => {
                return Err(DemuxError::corrupt(
                    position,
                    format!("stream ends {n} bytes into a frame header"),
                ));
            }
        }

        // Trailing ID3v1 tag
        if &raw[..3] == b"TAG"
            && self.file.remaining() == Some(ID3V1_TAG_LEN - HEADER_LEN as u64)
        {
            self.file.skip(ID3V1_TAG_LEN - HEADER_LEN as u64)?;
            return Ok(ReadOutcome::EndOfStream);
        }

        let header = FrameHeader::parse(&raw)
            .ok_or_else(|| DemuxError::corrupt(position, "lost ADTS frame sync"))?;

        if !header.protection_absent {
            self.file
                .skip(CRC_LEN as u64)
                .map_err(|e| DemuxError::from_read(e, position))?;
        }
        let payload_len = usize::from(header.frame_length) - header.header_len();
        let data = self
            .file
            .read_bytes(payload_len)
            .map_err(|e| DemuxError::from_read(e, position))?;

        let samples = header.samples();
        let pts = self.samples_read as i64;
        self.samples_read += u64::from(samples);

        Ok(ReadOutcome::Packet(
            Packet::new(0, data, position + header.header_len() as u64)
                .with_timestamp(pts)
                .with_duration(i64::from(samples))
                .with_keyframe(true),
        ))
    }

    fn available_streams(&self) -> &[StreamMetadata] {
        &self.streams
    }

    fn position(&self) -> u64 {
        self.file.position()
    }

    fn into_source(self: Box<Self>) -> MediaFile {
        self.file
    }
}
