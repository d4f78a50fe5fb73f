//! Test fixtures for container testing.
//!
//! Builders for small but structurally complete WAV, AVI and ADTS files, so
//! format code can be exercised without binary assets in the repository.

use std::io::Write;

/// Stream and pts of every packet in [`three_stream_avi`], in file order.
pub const THREE_STREAM_PACKETS: [(u32, i64); 8] = [
    (1, 0),
    (0, 0),
    (2, 0),
    (1, 1),
    (0, 160),
    (1, 2),
    (0, 320),
    (2, 1),
];

/// Deterministic filler bytes.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// Cuts `bytes` down to `len` bytes.
pub fn truncate(mut bytes: Vec<u8>, len: usize) -> Vec<u8> {
    bytes.truncate(len);
    bytes
}

/// Writes `bytes` to a temporary file whose name ends in `suffix`.
///
/// # Panics
///
/// Panics if the temporary file cannot be created or written.
/// This is acceptable in test fixtures where failures indicate environment issues.
pub fn write_temp_file(bytes: &[u8], suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::with_suffix(suffix).unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn riff_chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    out.extend_from_slice(id);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn riff_list(list_type: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = list_type.to_vec();
    for child in children {
        payload.extend_from_slice(child);
    }
    riff_chunk(b"LIST", &payload)
}

fn index_entry(index: &mut Vec<u8>, id: &[u8; 4], offset: usize, len: usize) {
    const AVIIF_KEYFRAME: u32 = 0x10;
    index.extend_from_slice(id);
    index.extend_from_slice(&AVIIF_KEYFRAME.to_le_bytes());
    index.extend_from_slice(&(offset as u32).to_le_bytes());
    index.extend_from_slice(&(len as u32).to_le_bytes());
}

fn riff_file(form_type: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(body.len() as u32 + 4).to_le_bytes());
    out.extend_from_slice(form_type);
    out.extend_from_slice(body);
    out
}

fn waveformatex(sample_rate: u32, channels: u16, bits: u16, with_cb_size: bool) -> Vec<u8> {
    let block_align = channels * bits / 8;
    let mut out = Vec::with_capacity(18);
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    if with_cb_size {
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

/// Builder for PCM WAV files.
#[derive(Debug, Clone)]
pub struct WavFixture {
    sample_rate: u32,
    channels: u16,
    bits: u16,
    frames: u32,
    info_chunk: bool,
    open_ended: bool,
}

impl WavFixture {
    pub fn new(sample_rate: u32, channels: u16, bits: u16, frames: u32) -> Self {
        Self {
            sample_rate,
            channels,
            bits,
            frames,
            info_chunk: false,
            open_ended: false,
        }
    }

    /// Adds a `LIST INFO` chunk between `fmt ` and `data`.
    pub fn with_info_chunk(mut self) -> Self {
        self.info_chunk = true;
        self
    }

    /// Marks the data size as unknown, as streaming writers do.
    pub fn open_ended(mut self) -> Self {
        self.open_ended = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let block_align = usize::from(self.channels * self.bits / 8);
        let samples = pattern(self.frames as usize * block_align, 7);

        let mut body = riff_chunk(b"fmt ", &waveformatex(
            self.sample_rate,
            self.channels,
            self.bits,
            false,
        ));
        if self.info_chunk {
            body.extend(riff_list(b"INFO", &[riff_chunk(b"INAM", b"sluice test tone\0")]));
        }
        let mut data = riff_chunk(b"data", &samples);
        if self.open_ended {
            data[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        }
        body.extend(data);

        riff_file(b"WAVE", &body)
    }
}

/// Stream declared in an [`AviFixture`].
#[derive(Debug, Clone)]
pub enum FixtureStream {
    /// PCM audio
    Audio {
        sample_rate: u32,
        channels: u16,
        bits: u16,
    },
    Video {
        fourcc: [u8; 4],
        width: u32,
        height: u32,
        fps: u32,
    },
    Subtitle {
        handler: [u8; 4],
    },
    /// Any other stream type, e.g. `mids`
    Data {
        fcc_type: [u8; 4],
    },
}

impl FixtureStream {
    fn twocc(&self) -> &'static [u8; 2] {
        match self {
            FixtureStream::Audio { .. } => b"wb",
            FixtureStream::Video { .. } => b"dc",
            FixtureStream::Subtitle { .. } => b"sb",
            FixtureStream::Data { .. } => b"dt",
        }
    }

    fn strh(&self, chunks: u32) -> Vec<u8> {
        let (fcc_type, handler, scale, rate, sample_size) = match self {
            FixtureStream::Audio {
                sample_rate,
                channels,
                bits,
            } => {
                let block_align = u32::from(channels * bits / 8);
                (*b"auds", [0; 4], block_align, sample_rate * block_align, block_align)
            }
            FixtureStream::Video { fourcc, fps, .. } => (*b"vids", *fourcc, 1, *fps, 0),
            FixtureStream::Subtitle { handler } => (*b"txts", *handler, 1, 1000, 0),
            FixtureStream::Data { fcc_type } => (*fcc_type, [0; 4], 1, 1, 0),
        };

        let mut out = Vec::with_capacity(56);
        out.extend_from_slice(&fcc_type);
        out.extend_from_slice(&handler);
        out.extend_from_slice(&0u32.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // priority
        out.extend_from_slice(&0u16.to_le_bytes()); // language
        out.extend_from_slice(&0u32.to_le_bytes()); // initial frames
        out.extend_from_slice(&scale.to_le_bytes());
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // start
        out.extend_from_slice(&chunks.to_le_bytes()); // length
        out.extend_from_slice(&0u32.to_le_bytes()); // suggested buffer size
        out.extend_from_slice(&u32::MAX.to_le_bytes()); // quality
        out.extend_from_slice(&sample_size.to_le_bytes());
        out.extend_from_slice(&[0u8; 8]); // rcFrame
        out
    }

    fn strf(&self) -> Option<Vec<u8>> {
        match self {
            FixtureStream::Audio {
                sample_rate,
                channels,
                bits,
            } => Some(waveformatex(*sample_rate, *channels, *bits, true)),
            FixtureStream::Video {
                fourcc,
                width,
                height,
                ..
            } => {
                let mut out = Vec::with_capacity(40);
                out.extend_from_slice(&40u32.to_le_bytes());
                out.extend_from_slice(&width.to_le_bytes());
                out.extend_from_slice(&height.to_le_bytes());
                out.extend_from_slice(&1u16.to_le_bytes()); // planes
                out.extend_from_slice(&24u16.to_le_bytes()); // bit count
                out.extend_from_slice(fourcc);
                out.extend_from_slice(&(width * height * 3).to_le_bytes());
                out.extend_from_slice(&[0u8; 16]); // resolution and palette
                Some(out)
            }
            FixtureStream::Subtitle { .. } | FixtureStream::Data { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
enum MoviEntry {
    Chunk([u8; 4], Vec<u8>),
    Rec(Vec<([u8; 4], Vec<u8>)>),
    Junk(usize),
}

/// Builder for AVI files.
#[derive(Debug, Clone, Default)]
pub struct AviFixture {
    streams: Vec<(FixtureStream, Option<String>)>,
    entries: Vec<MoviEntry>,
    unknown_movi_size: bool,
    index: bool,
}

impl AviFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the next stream; stream numbers follow declaration order.
    pub fn stream(mut self, stream: FixtureStream) -> Self {
        self.streams.push((stream, None));
        self
    }

    /// Names the most recently declared stream.
    pub fn named(mut self, name: &str) -> Self {
        if let Some((_, slot)) = self.streams.last_mut() {
            *slot = Some(name.to_string());
        }
        self
    }

    /// Appends a data chunk for `stream` to the `movi` list.
    pub fn chunk(mut self, stream: u8, data: Vec<u8>) -> Self {
        let id = self.chunk_id(stream);
        self.entries.push(MoviEntry::Chunk(id, data));
        self
    }

    /// Appends a `LIST rec ` grouping the given chunks.
    pub fn rec(mut self, chunks: Vec<(u8, Vec<u8>)>) -> Self {
        let chunks = chunks
            .into_iter()
            .map(|(stream, data)| (self.chunk_id(stream), data))
            .collect();
        self.entries.push(MoviEntry::Rec(chunks));
        self
    }

    /// Appends a `JUNK` chunk of `len` bytes to the `movi` list.
    pub fn junk(mut self, len: usize) -> Self {
        self.entries.push(MoviEntry::Junk(len));
        self
    }

    /// Appends a chunk with an arbitrary id to the `movi` list.
    pub fn raw_chunk(mut self, id: [u8; 4], data: Vec<u8>) -> Self {
        self.entries.push(MoviEntry::Chunk(id, data));
        self
    }

    /// Writes zero as the `movi` list size.
    pub fn unknown_movi_size(mut self) -> Self {
        self.unknown_movi_size = true;
        self
    }

    /// Appends an `idx1` index after the `movi` list.
    pub fn with_index(mut self) -> Self {
        self.index = true;
        self
    }

    fn chunk_id(&self, stream: u8) -> [u8; 4] {
        let twocc = self
            .streams
            .get(usize::from(stream))
            .map_or(b"xx", |(declared, _)| declared.twocc());
        let digits = format!("{:02}", stream % 100);
        let digits = digits.as_bytes();
        [digits[0], digits[1], twocc[0], twocc[1]]
    }

    fn chunk_counts(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.streams.len()];
        let mut count = |id: &[u8; 4]| {
            let number = usize::from(id[0].wrapping_sub(b'0')) * 10
                + usize::from(id[1].wrapping_sub(b'0'));
            if let Some(slot) = counts.get_mut(number) {
                *slot += 1;
            }
        };
        for entry in &self.entries {
            match entry {
                MoviEntry::Chunk(id, _) => count(id),
                MoviEntry::Rec(chunks) => chunks.iter().for_each(|(id, _)| count(id)),
                MoviEntry::Junk(_) => {}
            }
        }
        counts
    }

    fn avih(&self) -> Vec<u8> {
        let video = self.streams.iter().find_map(|(stream, _)| match stream {
            FixtureStream::Video {
                width, height, fps, ..
            } => Some((*width, *height, *fps)),
            _ => None,
        });
        let (width, height, fps) = video.unwrap_or((0, 0, 0));
        let total_frames = self
            .streams
            .iter()
            .position(|(stream, _)| matches!(stream, FixtureStream::Video { .. }))
            .map_or(0, |index| self.chunk_counts()[index]);

        let mut out = Vec::with_capacity(56);
        let micro_sec_per_frame = if fps > 0 { 1_000_000 / fps } else { 0 };
        out.extend_from_slice(&micro_sec_per_frame.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // max bytes per second
        out.extend_from_slice(&0u32.to_le_bytes()); // padding granularity
        let flags: u32 = if self.index { 0x10 } else { 0 };
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&total_frames.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // initial frames
        out.extend_from_slice(&(self.streams.len() as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // suggested buffer size
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&[0u8; 16]); // reserved
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let counts = self.chunk_counts();

        let mut hdrl = vec![riff_chunk(b"avih", &self.avih())];
        for ((stream, name), chunks) in self.streams.iter().zip(counts) {
            let mut strl = vec![riff_chunk(b"strh", &stream.strh(chunks))];
            if let Some(strf) = stream.strf() {
                strl.push(riff_chunk(b"strf", &strf));
            }
            if let Some(name) = name {
                let mut strn = name.as_bytes().to_vec();
                strn.push(0);
                strl.push(riff_chunk(b"strn", &strn));
            }
            hdrl.push(riff_list(b"strl", &strl));
        }

        // idx1 offsets are relative to the movi list type
        let mut movi = b"movi".to_vec();
        let mut index = Vec::new();
        for entry in &self.entries {
            match entry {
                MoviEntry::Chunk(id, data) => {
                    index_entry(&mut index, id, movi.len(), data.len());
                    movi.extend(riff_chunk(id, data));
                }
                MoviEntry::Rec(chunks) => {
                    let rec_start = movi.len() + 8;
                    let mut rec = b"rec ".to_vec();
                    for (id, data) in chunks {
                        index_entry(&mut index, id, rec_start + rec.len(), data.len());
                        rec.extend(riff_chunk(id, data));
                    }
                    movi.extend(riff_chunk(b"LIST", &rec));
                }
                MoviEntry::Junk(len) => movi.extend(riff_chunk(b"JUNK", &vec![0u8; *len])),
            }
        }

        let mut movi = riff_chunk(b"LIST", &movi);
        if self.unknown_movi_size {
            movi[4..8].copy_from_slice(&0u32.to_le_bytes());
        }

        let mut body = riff_list(b"hdrl", &hdrl);
        body.extend(riff_chunk(b"JUNK", &[0u8; 12]));
        body.extend(movi);
        if self.index {
            body.extend(riff_chunk(b"idx1", &index));
        }

        riff_file(b"AVI ", &body)
    }
}

/// Three interleaved streams: PCM audio 0, MJPEG video 1, DivX subtitles 2.
///
/// Packet order is listed in [`THREE_STREAM_PACKETS`].
pub fn three_stream_avi() -> Vec<u8> {
    AviFixture::new()
        .stream(FixtureStream::Audio {
            sample_rate: 8_000,
            channels: 1,
            bits: 16,
        })
        .named("Commentary")
        .stream(FixtureStream::Video {
            fourcc: *b"MJPG",
            width: 64,
            height: 48,
            fps: 25,
        })
        .stream(FixtureStream::Subtitle { handler: *b"DXSB" })
        .named("English")
        .chunk(1, pattern(300, 1))
        .chunk(0, pattern(320, 2))
        .chunk(2, b"[00:00.000] Hello".to_vec())
        .chunk(1, pattern(301, 3))
        .chunk(0, pattern(320, 4))
        .rec(vec![(1, pattern(302, 5)), (0, pattern(320, 6))])
        .chunk(2, b"[00:00.080] Bye!".to_vec())
        .build()
}

/// Encodes an ADTS frame header without CRC fields.
pub fn adts_header(
    profile: u8,
    sampling_index: u8,
    channel_config: u8,
    frame_length: u16,
    protection_absent: bool,
) -> [u8; 7] {
    const FULLNESS_VBR: u16 = 0x7FF;
    [
        0xFF,
        0xF0 | u8::from(protection_absent),
        (profile << 6) | (sampling_index << 2) | (channel_config >> 2),
        ((channel_config & 0x03) << 6) | ((frame_length >> 11) as u8 & 0x03),
        (frame_length >> 3) as u8,
        (((frame_length & 0x07) as u8) << 5) | ((FULLNESS_VBR >> 6) as u8 & 0x1F),
        ((FULLNESS_VBR & 0x3F) as u8) << 2,
    ]
}

/// Builder for AAC LC streams in ADTS framing.
#[derive(Debug, Clone)]
pub struct AdtsFixture {
    sampling_index: u8,
    channel_config: u8,
    frames: usize,
    payload_len: usize,
    id3_len: Option<u32>,
    crc: bool,
}

impl AdtsFixture {
    pub fn new(sampling_index: u8, channel_config: u8, frames: usize) -> Self {
        Self {
            sampling_index,
            channel_config,
            frames,
            payload_len: 16,
            id3_len: None,
            crc: false,
        }
    }

    pub fn payload_len(mut self, len: usize) -> Self {
        self.payload_len = len;
        self
    }

    /// Prepends an ID3v2 tag with a body of `len` bytes.
    pub fn with_id3(mut self, len: u32) -> Self {
        self.id3_len = Some(len);
        self
    }

    /// Adds a CRC word to every frame.
    pub fn with_crc(mut self) -> Self {
        self.crc = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();

        if let Some(len) = self.id3_len {
            out.extend_from_slice(b"ID3");
            out.extend_from_slice(&[4, 0, 0]); // version 2.4, no flags
            out.extend_from_slice(&[
                ((len >> 21) & 0x7F) as u8,
                ((len >> 14) & 0x7F) as u8,
                ((len >> 7) & 0x7F) as u8,
                (len & 0x7F) as u8,
            ]);
            out.resize(out.len() + len as usize, 0);
        }

        let header_len = if self.crc { 9 } else { 7 };
        let frame_length = (header_len + self.payload_len) as u16;
        for frame in 0..self.frames {
            out.extend_from_slice(&adts_header(
                1,
                self.sampling_index,
                self.channel_config,
                frame_length,
                !self.crc,
            ));
            if self.crc {
                out.extend_from_slice(&[0xAB, 0xCD]);
            }
            out.extend(pattern(self.payload_len, frame as u8));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_riff_sizes_are_consistent() {
        let bytes = three_stream_avi();
        let riff_size = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(riff_size as usize, bytes.len() - 8);

        let wav = WavFixture::new(8_000, 2, 16, 10).build();
        let riff_size = u32::from_le_bytes(wav[4..8].try_into().unwrap());
        assert_eq!(riff_size as usize, wav.len() - 8);
    }

    #[test]
    fn test_adts_fixture_frame_layout() {
        let bytes = AdtsFixture::new(4, 2, 3).payload_len(10).with_id3(5).build();
        assert_eq!(bytes.len(), 10 + 5 + 3 * 17);
        assert_eq!(&bytes[15..17], &[0xFF, 0xF1]);
    }

    #[test]
    fn test_write_temp_file() {
        let file = write_temp_file(b"abc", ".bin");
        assert_eq!(std::fs::read(file.path()).unwrap(), b"abc");
        assert!(file.path().to_string_lossy().ends_with(".bin"));
    }
}
