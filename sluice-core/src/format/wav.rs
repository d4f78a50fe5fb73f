//! WAV (RIFF/WAVE) support.
//!
//! A single audio stream. Packets are runs of whole sample blocks cut from
//! the `data` chunk; timestamps count sample frames.

use bytes::Bytes;
use tracing::{debug, trace, warn};

use super::{ChunkHeader, WaveFormat};
use crate::config::SluiceConfig;
use crate::container::{Container, ContainerFormat, Probe, probe_header};
use crate::error::{DemuxError, DemuxResult, HeaderError};
use crate::media::{Packet, Rational, ReadOutcome, StreamMetadata, StreamParameters};
use crate::source::MediaFile;

const FORMAT_NAME: &str = "wav";

/// Descriptor for WAV files.
#[derive(Debug, Clone)]
pub struct WavFormat {
    config: SluiceConfig,
}

impl WavFormat {
    pub fn new(config: &SluiceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Default for WavFormat {
    fn default() -> Self {
        Self::new(&SluiceConfig::default())
    }
}

impl ContainerFormat for WavFormat {
    fn name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["wav", "wave"]
    }

    fn mime_type(&self) -> &'static str {
        "audio/wav"
    }

    fn open(&self, mut file: MediaFile) -> DemuxResult<Probe> {
        let max_header_bytes = self.config.probe.max_header_bytes;
        let Some(header) = probe_header(&mut file, FORMAT_NAME, |f| {
            parse_header(f, max_header_bytes)
        })?
        else {
            return Ok(Probe::NotRecognized(file));
        };

        Ok(Probe::Recognized(Box::new(WavContainer::new(
            file,
            header,
            self.config.demux.pcm_packet_frames,
        ))))
    }
}

#[derive(Debug)]
struct WavHeader {
    format: WaveFormat,
    data_start: u64,
    /// `None` when the writer left the size open (streamed recordings)
    data_size: Option<u64>,
}

fn parse_header(file: &mut MediaFile, max_header_bytes: u32) -> Result<WavHeader, HeaderError> {
    if &file.read_fourcc()? != b"RIFF" {
        return Err(HeaderError::rejected("missing RIFF signature"));
    }
    let _riff_size = file.read_u32_le()?;
    if &file.read_fourcc()? != b"WAVE" {
        return Err(HeaderError::rejected("RIFF form type is not WAVE"));
    }

    let mut format = None;
    loop {
        let chunk = ChunkHeader::read(file)?;
        match &chunk.id {
            b"fmt " => {
                if chunk.size > max_header_bytes {
                    return Err(HeaderError::rejected(format!(
                        "fmt chunk of {} bytes exceeds header limit",
                        chunk.size
                    )));
                }
                let payload = file.read_bytes(chunk.size as usize)?;
                file.skip(chunk.padded_size() - u64::from(chunk.size))?;

                let parsed = WaveFormat::parse(&payload)
                    .ok_or_else(|| HeaderError::rejected("fmt chunk too short"))?;
                format = Some(parsed);
            }
            b"data" => {
                let format =
                    format.ok_or_else(|| HeaderError::rejected("data chunk before fmt chunk"))?;
                validate_format(&format)?;

                let data_size = match chunk.size {
                    0 | u32::MAX => None,
                    size => Some(u64::from(size)),
                };
                return Ok(WavHeader {
                    format,
                    data_start: chunk.data_start,
                    data_size,
                });
            }
            other => {
                trace!(chunk = %String::from_utf8_lossy(other), size = chunk.size, "Skipping WAV chunk");
                file.skip(chunk.padded_size())?;
            }
        }
    }
}

fn validate_format(format: &WaveFormat) -> Result<(), HeaderError> {
    if format.channels == 0 {
        return Err(HeaderError::rejected("fmt declares zero channels"));
    }
    if format.sample_rate == 0 {
        return Err(HeaderError::rejected("fmt declares zero sample rate"));
    }
    if format.block_align == 0 {
        return Err(HeaderError::rejected("fmt declares zero block alignment"));
    }
    Ok(())
}

/// Open WAV file.
pub struct WavContainer {
    file: MediaFile,
    streams: Vec<StreamMetadata>,
    block_align: u64,
    packet_bytes: u64,
    data_end: Option<u64>,
    frames_read: u64,
}

impl WavContainer {
    fn new(file: MediaFile, header: WavHeader, pcm_packet_frames: u32) -> Self {
        let format = header.format;
        let block_align = u64::from(format.block_align);

        let data_size = header.data_size.or_else(|| {
            // Open-ended data chunk: estimate from the file size when known
            file.size().map(|size| size.saturating_sub(header.data_start))
        });
        if let (Some(declared), Some(remaining)) = (header.data_size, file.remaining()) {
            if declared > remaining {
                warn!(
                    declared,
                    remaining, "WAV data chunk is larger than the rest of the file"
                );
            }
        }

        let mut stream = StreamMetadata::new(
            0,
            StreamParameters::Audio(format.audio_parameters()),
        )
        .with_time_base(Rational::new(1, format.sample_rate))
        .with_extradata(format.extra.clone());
        if let Some(size) = data_size {
            stream = stream.with_duration(size / block_align);
        }

        debug!(
            codec = %format.codec(),
            sample_rate = format.sample_rate,
            channels = format.channels,
            data_size = ?header.data_size,
            "Opened WAV container"
        );

        Self {
            file,
            streams: vec![stream],
            block_align,
            packet_bytes: block_align * u64::from(pcm_packet_frames.max(1)),
            data_end: header.data_size.map(|size| header.data_start + size),
            frames_read: 0,
        }
    }

    fn read_open_ended(&mut self, position: u64) -> DemuxResult<Option<Bytes>> {
        let mut buf = vec![0u8; self.packet_bytes as usize];
        let read = self.file.fill(&mut buf)?;
        if read == 0 {
            return Ok(None);
        }
        if read as u64 % self.block_align != 0 {
            trace!(position, read, "Trailing partial block in open-ended WAV data");
        }
        buf.truncate(read);
        Ok(Some(buf.into()))
    }
}

impl Container for WavContainer {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn read_packet(&mut self) -> DemuxResult<ReadOutcome> {
        let position = self.file.position();

        let data = match self.data_end {
            Some(end) => {
                let len = self.packet_bytes.min(end.saturating_sub(position));
                if len == 0 {
                    return Ok(ReadOutcome::EndOfStream);
                }
                self.file
                    .read_bytes(len as usize)
                    .map_err(|e| DemuxError::from_read(e, position))?
            }
            None => match self.read_open_ended(position)? {
                Some(data) => data,
                None => return Ok(ReadOutcome::EndOfStream),
            },
        };

        let frames = data.len() as u64 / self.block_align;
        let pts = self.frames_read as i64;
        self.frames_read += frames;

        Ok(ReadOutcome::Packet(
            Packet::new(0, data, position)
                .with_timestamp(pts)
                .with_duration(frames as i64)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{CodecId, StreamKind};
    use crate::test_fixtures::{WavFixture, truncate};

    fn open(bytes: Vec<u8>) -> Box<dyn Container> {
        match WavFormat::new(&SluiceConfig::for_testing())
            .open(MediaFile::from_bytes(bytes))
            .unwrap()
        {
            Probe::Recognized(container) => container,
            Probe::NotRecognized(_) => panic!("expected WAV to be recognized"),
        }
    }

    #[test]
    fn test_stream_metadata() {
        let container = open(WavFixture::new(44_100, 2, 16, 1000).build());
        let streams = container.available_streams();

        assert_eq!(streams.len(), 1);
        let stream = &streams[0];
        assert_eq!(stream.kind(), StreamKind::Audio);
        assert_eq!(stream.codec(), CodecId::PcmS16Le);
        assert_eq!(stream.time_base, Some(Rational::new(1, 44_100)));
        assert_eq!(stream.duration, Some(1000));
    }

    #[test]
    fn test_packets_cover_data_chunk() {
        let mut container = open(WavFixture::new(8_000, 1, 16, 600).build());

        let mut timestamps = Vec::new();
        let mut total = 0;
        while let ReadOutcome::Packet(packet) = container.read_packet().unwrap() {
            assert_eq!(packet.stream_index, 0);
            assert!(packet.keyframe);
            timestamps.push(packet.pts.unwrap());
            total += packet.size();
        }

        // 256 frames per packet in the testing config
        assert_eq!(timestamps, vec![0, 256, 512]);
        assert_eq!(total, 600 * 2);
        assert!(container.read_packet().unwrap().is_end_of_stream());
    }

    #[test]
    fn test_skips_unknown_chunks_before_data() {
        let bytes = WavFixture::new(8_000, 1, 8, 10).with_info_chunk().build();
        let mut container = open(bytes);

        let packet = container.read_packet().unwrap().into_packet().unwrap();
        assert_eq!(packet.size(), 10);
    }

    #[test]
    fn test_open_ended_data_reads_to_eof() {
        let bytes = WavFixture::new(8_000, 2, 16, 300).open_ended().build();
        let mut container = open(bytes);
        assert_eq!(container.available_streams()[0].duration, Some(300));

        let mut total = 0;
        while let ReadOutcome::Packet(packet) = container.read_packet().unwrap() {
            total += packet.size();
        }
        assert_eq!(total, 300 * 4);
    }

    #[test]
    fn test_truncated_data_is_corrupt() {
        let bytes = WavFixture::new(8_000, 1, 16, 1000).build();
        let len = bytes.len();
        let mut container = open(truncate(bytes, len - 100));

        let error = loop {
            match container.read_packet() {
                Ok(ReadOutcome::Packet(_)) => continue,
                Ok(ReadOutcome::EndOfStream) => panic!("truncation went unnoticed"),
                Err(e) => break e,
            }
        };
        assert!(matches!(error, DemuxError::CorruptStream { .. }));
    }

    #[test]
    fn test_rejects_other_riff_forms() {
        let mut bytes = WavFixture::new(8_000, 1, 16, 10).build();
        bytes[8..12].copy_from_slice(b"AVI ");

        let probe = WavFormat::default()
            .open(MediaFile::from_bytes(bytes))
            .unwrap();
        match probe {
            Probe::NotRecognized(file) => assert_eq!(file.position(), 0),
            Probe::Recognized(_) => panic!("AVI form type must not open as WAV"),
        }
    }

    #[test]
    fn test_rejects_header_without_data_chunk() {
        let bytes = WavFixture::new(8_000, 1, 16, 10).build();
        // Cut inside the data chunk header
        let probe = WavFormat::default()
            .open(MediaFile::from_bytes(truncate(bytes, 40)))
            .unwrap();
        assert!(!probe.is_recognized());
    }

    #[test]
    fn test_rejects_zero_channels() {
        let mut bytes = WavFixture::new(8_000, 1, 16, 10).build();
        bytes[22..24].copy_from_slice(&0u16.to_le_bytes());

        let probe = WavFormat::default()
            .open(MediaFile::from_bytes(bytes))
            .unwrap();
        assert!(!probe.is_recognized());
    }
}
