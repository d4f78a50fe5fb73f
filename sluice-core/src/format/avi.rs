//! AVI (RIFF/AVI) support.
//!
//! Streams are declared up front in the `hdrl` list; packets are the `##xx`
//! chunks of the `movi` list in file order, where `##` is the stream number.

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use super::{ChunkHeader, SliceChunks, WaveFormat, fourcc_at, le_u16, le_u32};
use crate::config::SluiceConfig;
use crate::container::{Container, ContainerFormat, Probe, probe_header};
use crate::error::{DemuxError, DemuxResult, HeaderError};
use crate::media::{
    CodecId, CodecTag, OtherParameters, Packet, Rational, ReadOutcome, StreamKind,
    StreamMetadata, StreamParameters, SubtitleParameters, VideoParameters, fourcc_to_string,
};
use crate::source::MediaFile;

const FORMAT_NAME: &str = "avi";

const AVIF_HASINDEX: u32 = 0x10;

/// Descriptor for AVI files.
#[derive(Debug, Clone)]
pub struct AviFormat {
    config: SluiceConfig,
}

impl AviFormat {
    pub fn new(config: &SluiceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Default for AviFormat {
    fn default() -> Self {
        Self::new(&SluiceConfig::default())
    }
}

impl ContainerFormat for AviFormat {
    fn name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["avi", "divx"]
    }

    fn mime_type(&self) -> &'static str {
        "video/x-msvideo"
    }

    fn open(&self, mut file: MediaFile) -> DemuxResult<Probe> {
        let max_header_bytes = self.config.probe.max_header_bytes;
        let Some(header) = probe_header(&mut file, FORMAT_NAME, |f| {
            parse_header(f, max_header_bytes)
        })?
        else {
            return Ok(Probe::NotRecognized(file));
        };

        Ok(Probe::Recognized(Box::new(AviContainer::new(
            file,
            header,
            self.config.demux.max_packet_size,
        ))))
    }
}

/// `avih` main header fields used for diagnostics.
#[derive(Debug, Clone)]
struct MainHeader {
    micro_sec_per_frame: u32,
    flags: u32,
    total_frames: u32,
    streams: u32,
    width: u32,
    height: u32,
}

impl MainHeader {
    fn parse(data: &[u8]) -> Option<Self> {
        Some(Self {
            micro_sec_per_frame: le_u32(data, 0)?,
            flags: le_u32(data, 12)?,
            total_frames: le_u32(data, 16)?,
            streams: le_u32(data, 24)?,
            width: le_u32(data, 32)?,
            height: le_u32(data, 36)?,
        })
    }
}

/// `strh` stream header.
#[derive(Debug, Clone)]
struct StreamHeader {
    fcc_type: [u8; 4],
    handler: [u8; 4],
    scale: u32,
    rate: u32,
    start: u32,
    length: u32,
    sample_size: u32,
}

impl StreamHeader {
    fn parse(data: &[u8]) -> Option<Self> {
        Some(Self {
            fcc_type: fourcc_at(data, 0)?,
            handler: fourcc_at(data, 4)?,
            scale: le_u32(data, 20)?,
            rate: le_u32(data, 24)?,
            start: le_u32(data, 28)?,
            length: le_u32(data, 32)?,
            sample_size: le_u32(data, 44)?,
        })
    }

    fn time_base(&self) -> Option<Rational> {
        (self.scale > 0 && self.rate > 0).then(|| Rational::new(self.scale, self.rate))
    }
}

/// Per-stream read state.
#[derive(Debug, Clone)]
struct StreamCursor {
    kind: StreamKind,
    /// Bytes per timestamp unit for constant-size audio, else one unit per chunk
    bytes_per_unit: Option<u32>,
    /// Every frame of the codec is a keyframe
    intra_only: bool,
    timed: bool,
    next_timestamp: i64,
    chunks: u64,
}

impl StreamCursor {
    /// Advances past a chunk of `size` bytes, returning its timestamp and duration.
    fn advance(&mut self, size: u32) -> (i64, i64) {
        let units = match self.bytes_per_unit {
            Some(unit) => i64::from(size / unit),
            None => 1,
        };
        let timestamp = self.next_timestamp;
        self.next_timestamp += units;
        self.chunks += 1;
        (timestamp, units)
    }

    fn is_keyframe(&self, twocc: [u8; 2]) -> bool {
        match self.kind {
            // Without an index the first frame is the only one known to be a keyframe
            StreamKind::Video => self.intra_only || &twocc == b"db" || self.chunks == 0,
            _ => true,
        }
    }
}

#[derive(Debug)]
struct AviHeader {
    main: MainHeader,
    streams: Vec<StreamMetadata>,
    cursors: Vec<StreamCursor>,
    /// End of the `movi` list, `None` when the writer left its size open
    movi_end: Option<u64>,
}

fn parse_header(file: &mut MediaFile, max_header_bytes: u32) -> Result<AviHeader, HeaderError> {
    if &file.read_fourcc()? != b"RIFF" {
        return Err(HeaderError::rejected("missing RIFF signature"));
    }
    let _riff_size = file.read_u32_le()?;
    if &file.read_fourcc()? != b"AVI " {
        return Err(HeaderError::rejected("RIFF form type is not AVI"));
    }

    let mut hdrl = None;
    loop {
        let chunk = ChunkHeader::read(file)?;
        if &chunk.id != b"LIST" {
            trace!(chunk = %fourcc_to_string(chunk.id), size = chunk.size, "Skipping AVI chunk");
            file.skip(chunk.padded_size())?;
            continue;
        }
        let list_type = file.read_fourcc()?;
        // Only movi may leave its size open, as streaming writers do
        if chunk.size < 4 && !(chunk.size == 0 && &list_type == b"movi") {
            return Err(HeaderError::rejected("LIST chunk too small for its type"));
        }
        match &list_type {
            b"hdrl" => {
                if chunk.size > max_header_bytes {
                    return Err(HeaderError::rejected(format!(
                        "hdrl list of {} bytes exceeds header limit",
                        chunk.size
                    )));
                }
                let payload = file.read_bytes(chunk.size as usize - 4)?;
                file.skip(chunk.padded_size() - u64::from(chunk.size))?;
                hdrl = Some(parse_hdrl(&payload)?);
            }
            b"movi" => {
                let (main, streams, cursors) =
                    hdrl.ok_or_else(|| HeaderError::rejected("movi list before hdrl"))?;
                let movi_end = match chunk.size {
                    0 => None,
                    size => Some(chunk.data_start + u64::from(size)),
                };
                return Ok(AviHeader {
                    main,
                    streams,
                    cursors,
                    movi_end,
                });
            }
            other => {
                trace!(list = %fourcc_to_string(*other), "Skipping AVI list");
                file.skip(chunk.padded_size() - 4)?;
            }
        }
    }
}

type ParsedHdrl = (MainHeader, Vec<StreamMetadata>, Vec<StreamCursor>);

fn parse_hdrl(data: &[u8]) -> Result<ParsedHdrl, HeaderError> {
    let mut main = None;
    let mut streams = Vec::new();
    let mut cursors = Vec::new();

    for (id, payload) in SliceChunks::new(data) {
        match &id {
            b"avih" => main = MainHeader::parse(payload),
            b"LIST" if payload.starts_with(b"strl") => {
                let (stream, cursor) = parse_strl(streams.len() as u32, &payload[4..])?;
                streams.push(stream);
                cursors.push(cursor);
            }
            _ => {}
        }
    }

    let main = main.ok_or_else(|| HeaderError::rejected("hdrl has no avih main header"))?;
    if streams.is_empty() {
        return Err(HeaderError::rejected("hdrl declares no streams"));
    }
    if main.streams as usize != streams.len() {
        warn!(
            declared = main.streams,
            found = streams.len(),
            "AVI main header stream count disagrees with stream lists"
        );
    }

    Ok((main, streams, cursors))
}

fn parse_strl(index: u32, data: &[u8]) -> Result<(StreamMetadata, StreamCursor), HeaderError> {
    let mut strh = None;
    let mut strf = None;
    let mut strn = None;

    for (id, payload) in SliceChunks::new(data) {
        match &id {
            b"strh" => strh = StreamHeader::parse(payload),
            b"strf" => strf = Some(payload),
            b"strn" => strn = parse_name(payload),
            _ => {}
        }
    }

    let header =
        strh.ok_or_else(|| HeaderError::rejected(format!("stream {index} has no valid strh")))?;
    let missing_strf = || HeaderError::rejected(format!("stream {index} has no strf"));

    let mut bytes_per_unit = None;
    let (params, extradata) = match &header.fcc_type {
        b"vids" => video_parameters(&header, strf.ok_or_else(missing_strf)?)
            .ok_or_else(|| HeaderError::rejected(format!("stream {index} strf too short")))?,
        b"auds" => {
            let format = strf
                .and_then(WaveFormat::parse)
                .ok_or_else(missing_strf)?;
            if header.sample_size > 0 {
                let unit = if format.block_align > 0 {
                    u32::from(format.block_align)
                } else {
                    header.sample_size
                };
                bytes_per_unit = Some(unit);
            }
            let extra = format.extra.clone();
            (StreamParameters::Audio(format.audio_parameters()), extra)
        }
        b"txts" => (
            StreamParameters::Subtitle(SubtitleParameters {
                codec: subtitle_codec(header.handler),
            }),
            Bytes::new(),
        ),
        other => {
            let mut properties = BTreeMap::new();
            properties.insert("fcc_type".to_string(), fourcc_to_string(*other));
            properties.insert("handler".to_string(), fourcc_to_string(header.handler));
            (
                StreamParameters::Other(OtherParameters {
                    codec: CodecId::Unknown(CodecTag::FourCc(header.handler)),
                    properties,
                }),
                Bytes::new(),
            )
        }
    };

    let cursor = StreamCursor {
        kind: params.kind(),
        bytes_per_unit,
        intra_only: params.codec() == CodecId::Mjpeg,
        timed: header.time_base().is_some(),
        next_timestamp: i64::from(header.start),
        chunks: 0,
    };

    let mut stream = StreamMetadata::new(index, params).with_extradata(extradata);
    if let Some(time_base) = header.time_base() {
        stream = stream.with_time_base(time_base);
    }
    if header.length > 0 {
        stream = stream.with_duration(u64::from(header.length));
    }
    if let Some(name) = strn {
        stream = stream.with_name(name);
    }

    Ok((stream, cursor))
}

/// Parses a `BITMAPINFOHEADER` from a video `strf` chunk.
fn video_parameters(header: &StreamHeader, strf: &[u8]) -> Option<(StreamParameters, Bytes)> {
    let header_size = le_u32(strf, 0)? as usize;
    let width = le_u32(strf, 4)? as i32;
    let height = le_u32(strf, 8)? as i32;
    let bit_count = le_u16(strf, 14)?;
    let compression = fourcc_at(strf, 16)?;

    // Uncompressed RGB leaves compression zero; the handler names the codec then
    let tag = if compression == [0; 4] {
        header.handler
    } else {
        compression
    };

    let extradata_start = header_size.clamp(40, strf.len().max(40));
    let extradata = strf
        .get(extradata_start..)
        .map(Bytes::copy_from_slice)
        .unwrap_or_default();

    let params = VideoParameters {
        codec: video_codec(tag),
        width: width.unsigned_abs(),
        // Negative height marks a top-down bitmap
        height: height.unsigned_abs(),
        frame_rate: header.time_base().map(Rational::invert),
        bits_per_pixel: (bit_count > 0).then_some(bit_count),
    };
    Some((StreamParameters::Video(params), extradata))
}

fn video_codec(tag: [u8; 4]) -> CodecId {
    match &tag.map(|b| b.to_ascii_uppercase()) {
        b"H264" | b"X264" | b"AVC1" | b"DAVC" => CodecId::H264,
        b"XVID" | b"DIVX" | b"DX50" | b"FMP4" | b"MP4V" => CodecId::Mpeg4Part2,
        b"MJPG" | b"JPEG" => CodecId::Mjpeg,
        _ => CodecId::Unknown(CodecTag::FourCc(tag)),
    }
}

fn subtitle_codec(handler: [u8; 4]) -> CodecId {
    match &handler.map(|b| b.to_ascii_uppercase()) {
        b"DXSB" | b"DXSA" => CodecId::DivxSubtitle,
        _ => CodecId::Unknown(CodecTag::FourCc(handler)),
    }
}

fn parse_name(payload: &[u8]) -> Option<String> {
    let end = payload
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(payload.len());
    let name = String::from_utf8_lossy(&payload[..end]).trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// Parses the stream number of a `##xx` chunk id.
fn stream_number(id: [u8; 4]) -> Option<usize> {
    if id[0].is_ascii_digit() && id[1].is_ascii_digit() {
        Some(usize::from(id[0] - b'0') * 10 + usize::from(id[1] - b'0'))
    } else {
        None
    }
}

/// Open AVI file.
pub struct AviContainer {
    file: MediaFile,
    streams: Vec<StreamMetadata>,
    cursors: Vec<StreamCursor>,
    movi_end: Option<u64>,
    max_packet_size: u32,
}

impl AviContainer {
    fn new(file: MediaFile, header: AviHeader, max_packet_size: u32) -> Self {
        let main = &header.main;
        debug!(
            streams = header.streams.len(),
            total_frames = main.total_frames,
            width = main.width,
            height = main.height,
            micro_sec_per_frame = main.micro_sec_per_frame,
            has_index = main.flags & AVIF_HASINDEX != 0,
            movi_end = ?header.movi_end,
            "Opened AVI container"
        );

        Self {
            file,
            streams: header.streams,
            cursors: header.cursors,
            movi_end: header.movi_end,
            max_packet_size,
        }
    }

    fn check_bounds(&self, position: u64, data_end: u64) -> DemuxResult<()> {
        match self.movi_end {
            Some(end) if data_end > end => Err(DemuxError::corrupt(
                position,
                format!("chunk ends at {data_end}, past the movi list end at {end}"),
            )),
            _ => Ok(()),
        }
    }

    fn skip_chunk(&mut self, position: u64, size: u64) -> DemuxResult<()> {
        self.file
            .skip(size)
            .map_err(|e| DemuxError::from_read(e, position))
    }
}

impl Container for AviContainer {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn read_packet(&mut self) -> DemuxResult<ReadOutcome> {
        loop {
            let position = self.file.position();
            if self.movi_end.is_some_and(|end| position >= end) {
                return Ok(ReadOutcome::EndOfStream);
            }

            let id = match self.file.try_read_fourcc() {
                Ok(Some(id)) => id,
                Ok(None) if self.movi_end.is_none() => return Ok(ReadOutcome::EndOfStream),
                Ok(None) => {
                    return Err(DemuxError::corrupt(
                        position,
                        "file ends before the declared end of the movi list",
                    ));
                }
                Err(e) => return Err(DemuxError::from_read(e, position)),
            };
            let size = self
                .file
                .read_u32_le()
                .map_err(|e| DemuxError::from_read(e, position))?;
            let data_start = position + 8;
            self.check_bounds(position, data_start + u64::from(size))?;

            if &id == b"LIST" {
                if size < 4 {
                    return Err(DemuxError::corrupt(position, "LIST chunk too small for its type"));
                }
                let list_type = self
                    .file
                    .read_fourcc()
                    .map_err(|e| DemuxError::from_read(e, position))?;
                if &list_type != b"rec " {
                    trace!(position, list = %fourcc_to_string(list_type), "Skipping list in movi");
                    self.skip_chunk(position, u64::from(size) - 4 + u64::from(size & 1))?;
                }
                // Children of a rec list are ordinary chunks
                continue;
            }

            let Some(number) = stream_number(id) else {
                trace!(position, chunk = %fourcc_to_string(id), size, "Skipping non-stream chunk in movi");
                self.skip_chunk(position, u64::from(size) + u64::from(size & 1))?;
                continue;
            };

            if number >= self.cursors.len() {
                return Err(DemuxError::corrupt(
                    position,
                    format!(
                        "chunk {} references undeclared stream {number}",
                        fourcc_to_string(id)
                    ),
                ));
            }
            if size > self.max_packet_size {
                return Err(DemuxError::corrupt(
                    position,
                    format!("chunk of {size} bytes exceeds packet size limit"),
                ));
            }

            if self.file.remaining().is_some_and(|left| u64::from(size) > left) {
                return Err(DemuxError::corrupt(
                    position,
                    format!("chunk of {size} bytes runs past the end of the file"),
                ));
            }

            let data = self
                .file
                .read_bytes(size as usize)
                .map_err(|e| DemuxError::from_read(e, data_start))?;
            // Writers commonly drop the pad byte of a final odd-sized chunk
            if size & 1 == 1 && self.file.remaining() != Some(0) {
                self.skip_chunk(position, 1)?;
            }

            let cursor = &mut self.cursors[number];
            let keyframe = cursor.is_keyframe([id[2], id[3]]);
            let (timestamp, duration) = cursor.advance(size);
            if data.is_empty() {
                // Zero-length chunk: a dropped frame, only the clock moves
                continue;
            }

            let mut packet = Packet::new(number as u32, data, data_start).with_keyframe(keyframe);
            if cursor.timed {
                packet = packet.with_timestamp(timestamp).with_duration(duration);
            }
            return Ok(ReadOutcome::Packet(packet));
        }
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
    use crate::test_fixtures::{AviFixture, FixtureStream, three_stream_avi, truncate};

    fn open(bytes: Vec<u8>) -> Box<dyn Container> {
        match AviFormat::new(&SluiceConfig::for_testing())
            .open(MediaFile::from_bytes(bytes))
            .unwrap()
        {
            Probe::Recognized(container) => container,
            Probe::NotRecognized(_) => panic!("expected AVI to be recognized"),
        }
    }

    fn drain(container: &mut dyn Container) -> DemuxResult<Vec<Packet>> {
        let mut packets = Vec::new();
        while let ReadOutcome::Packet(packet) = container.read_packet()? {
            packets.push(packet);
        }
        Ok(packets)
    }

    #[test]
    fn test_stream_declarations() {
        let container = open(three_stream_avi());
        let streams = container.available_streams();

        assert_eq!(streams.len(), 3);
        assert_eq!(streams[0].kind(), StreamKind::Audio);
        assert_eq!(streams[0].codec(), CodecId::PcmS16Le);
        assert_eq!(streams[1].kind(), StreamKind::Video);
        assert_eq!(streams[1].codec(), CodecId::Mjpeg);
        assert_eq!(streams[1].time_base, Some(Rational::new(1, 25)));
        assert_eq!(streams[2].kind(), StreamKind::Subtitle);
        assert_eq!(streams[2].codec(), CodecId::DivxSubtitle);
        assert_eq!(streams[2].name.as_deref(), Some("English"));

        match &streams[1].params {
            StreamParameters::Video(video) => {
                assert_eq!((video.width, video.height), (64, 48));
                assert_eq!(video.frame_rate, Some(Rational::new(25, 1)));
            }
            other => panic!("unexpected parameters {other:?}"),
        }
    }

    #[test]
    fn test_audio_timestamps_count_blocks() {
        let bytes = AviFixture::new()
            .stream(FixtureStream::Audio {
                sample_rate: 8_000,
                channels: 2,
                bits: 16,
            })
            .chunk(0, vec![0u8; 400])
            .chunk(0, vec![0u8; 40])
            .build();
        let mut container = open(bytes);
        let packets = drain(container.as_mut()).unwrap();

        let timestamps: Vec<_> = packets.iter().map(|p| p.pts.unwrap()).collect();
        // 4 bytes per sample frame
        assert_eq!(timestamps, vec![0, 100]);
        assert_eq!(packets[1].duration, Some(10));
    }

    #[test]
    fn test_rec_lists_and_junk_are_transparent() {
        let bytes = AviFixture::new()
            .stream(FixtureStream::Video {
                fourcc: *b"XVID",
                width: 16,
                height: 16,
                fps: 30,
            })
            .chunk(0, b"frame-0".to_vec())
            .junk(13)
            .rec(vec![(0, b"frame-1".to_vec()), (0, b"frame-2".to_vec())])
            .with_index()
            .build();
        let mut container = open(bytes);
        let packets = drain(container.as_mut()).unwrap();

        let payloads: Vec<_> = packets.iter().map(|p| p.data.as_ref()).collect();
        assert_eq!(payloads, vec![&b"frame-0"[..], b"frame-1", b"frame-2"]);
        assert_eq!(packets[2].pts, Some(2));
        assert!(packets[0].keyframe);
        assert!(!packets[1].keyframe);
    }

    #[test]
    fn test_zero_length_chunk_advances_clock_only() {
        let bytes = AviFixture::new()
            .stream(FixtureStream::Video {
                fourcc: *b"H264",
                width: 16,
                height: 16,
                fps: 25,
            })
            .chunk(0, b"a".to_vec())
            .chunk(0, Vec::new())
            .chunk(0, b"b".to_vec())
            .build();
        let mut container = open(bytes);
        let packets = drain(container.as_mut()).unwrap();

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].pts, Some(2));
    }

    #[test]
    fn test_undeclared_stream_is_corrupt() {
        let bytes = AviFixture::new()
            .stream(FixtureStream::Subtitle { handler: *b"DXSB" })
            .chunk(0, b"ok".to_vec())
            .raw_chunk(*b"07sb", b"stray".to_vec())
            .build();
        let mut container = open(bytes);

        assert!(container.read_packet().unwrap().into_packet().is_some());
        assert!(matches!(
            container.read_packet(),
            Err(DemuxError::CorruptStream { .. })
        ));
    }

    #[test]
    fn test_oversized_chunk_is_corrupt() {
        let bytes = AviFixture::new()
            .stream(FixtureStream::Data { fcc_type: *b"mids" })
            .chunk(0, vec![0u8; 2 * 1024 * 1024])
            .build();
        let mut container = open(bytes);

        let error = container.read_packet().unwrap_err();
        assert!(matches!(error, DemuxError::CorruptStream { .. }));
        assert!(error.to_string().contains("packet size limit"));
    }

    #[test]
    fn test_unknown_movi_size_reads_to_eof() {
        let bytes = AviFixture::new()
            .stream(FixtureStream::Subtitle { handler: *b"DXSB" })
            .chunk(0, b"one".to_vec())
            .chunk(0, b"two".to_vec())
            .unknown_movi_size()
            .build();
        let mut container = open(bytes);

        assert_eq!(drain(container.as_mut()).unwrap().len(), 2);
    }

    #[test]
    fn test_chunk_past_end_of_open_movi_is_corrupt() {
        let bytes = AviFixture::new()
            .stream(FixtureStream::Subtitle { handler: *b"DXSB" })
            .chunk(0, b"one".to_vec())
            .chunk(0, vec![0u8; 100])
            .unknown_movi_size()
            .build();
        let len = bytes.len();
        let mut container = open(truncate(bytes, len - 50));

        assert!(container.read_packet().unwrap().into_packet().is_some());
        let position = container.position();
        let error = container.read_packet().unwrap_err();
        assert!(error.to_string().contains("runs past the end of the file"));
        // Rejected from the chunk header alone
        assert_eq!(container.position(), position + 8);
    }

    #[test]
    fn test_eof_before_movi_end_is_corrupt() {
        let bytes = three_stream_avi();
        let len = bytes.len();
        let mut container = open(truncate(bytes, len - 3));

        assert!(matches!(
            drain(container.as_mut()),
            Err(DemuxError::CorruptStream { .. })
        ));
    }

    #[test]
    fn test_other_stream_kinds_keep_their_type() {
        let bytes = AviFixture::new()
            .stream(FixtureStream::Data { fcc_type: *b"mids" })
            .build();
        let container = open(bytes);

        match &container.available_streams()[0].params {
            StreamParameters::Other(other) => {
                assert_eq!(other.properties["fcc_type"], "mids");
            }
            params => panic!("unexpected parameters {params:?}"),
        }
    }

    #[test]
    fn test_rejects_wave_files() {
        let mut bytes = three_stream_avi();
        bytes[8..12].copy_from_slice(b"WAVE");

        let probe = AviFormat::default()
            .open(MediaFile::from_bytes(bytes))
            .unwrap();
        assert!(!probe.is_recognized());
    }

    #[test]
    fn test_video_codec_mapping_ignores_case() {
        assert_eq!(video_codec(*b"xvid"), CodecId::Mpeg4Part2);
        assert_eq!(video_codec(*b"avc1"), CodecId::H264);
        assert_eq!(
            video_codec(*b"cvid"),
            CodecId::Unknown(CodecTag::FourCc(*b"cvid"))
        );
    }

    #[test]
    fn test_stream_number_parsing() {
        assert_eq!(stream_number(*b"00dc"), Some(0));
        assert_eq!(stream_number(*b"12wb"), Some(12));
        assert_eq!(stream_number(*b"ix00"), None);
    }
}
