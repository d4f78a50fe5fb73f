//! Stream declarations and timestamp ordering for every built-in format

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use sluice_core::test_fixtures::{
    AdtsFixture, AviFixture, FixtureStream, WavFixture, pattern, three_stream_avi,
};
use sluice_core::{Demuxer, FormatRegistry, MediaFile, SluiceConfig};

fn resolve(bytes: Vec<u8>) -> Demuxer {
    FormatRegistry::with_defaults(&SluiceConfig::for_testing())
        .resolve(MediaFile::from_bytes(bytes))
        .unwrap()
}

/// Drains `demuxer`, checking that every packet belongs to a declared stream
/// and that timestamps never go backwards within a stream.
fn assert_monotonic_timestamps(demuxer: &mut Demuxer) -> usize {
    let declared: HashSet<u32> = demuxer
        .available_streams()
        .iter()
        .map(|stream| stream.index)
        .collect();
    let mut last_pts: HashMap<u32, i64> = HashMap::new();
    let mut count = 0;

    for packet in demuxer.packets() {
        let packet = packet.unwrap();
        assert!(declared.contains(&packet.stream_index));
        if let Some(pts) = packet.pts {
            if let Some(previous) = last_pts.insert(packet.stream_index, pts) {
                assert!(
                    pts >= previous,
                    "stream {} went from pts {previous} to {pts}",
                    packet.stream_index
                );
            }
        }
        count += 1;
    }
    count
}

fn fixtures() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("wav", WavFixture::new(8_000, 2, 16, 1000).with_info_chunk().build()),
        ("avi", three_stream_avi()),
        ("adts", AdtsFixture::new(4, 2, 6).with_crc().build()),
    ]
}

#[test]
fn test_available_streams_is_stable_and_unique() {
    for (format, bytes) in fixtures() {
        let mut demuxer = resolve(bytes);
        assert_eq!(demuxer.format_name(), format);

        let first = demuxer.available_streams().to_vec();
        let second = demuxer.available_streams().to_vec();
        assert_eq!(first, second, "{format} streams changed between calls");

        let indices: HashSet<u32> = first.iter().map(|stream| stream.index).collect();
        assert_eq!(indices.len(), first.len(), "{format} repeats a stream index");

        // Reading does not change the declaration either
        demuxer.read_packet().unwrap();
        assert_eq!(demuxer.available_streams(), &first[..]);
    }
}

#[test]
fn test_timestamps_never_decrease() {
    for (format, bytes) in fixtures() {
        let mut demuxer = resolve(bytes);
        let count = assert_monotonic_timestamps(&mut demuxer);
        assert!(count > 1, "{format} produced {count} packets");
    }
}

fn avi_with_chunks(chunks: &[(u8, usize)]) -> Vec<u8> {
    let mut fixture = AviFixture::new()
        .stream(FixtureStream::Audio {
            sample_rate: 8_000,
            channels: 1,
            bits: 16,
        })
        .stream(FixtureStream::Video {
            fourcc: *b"XVID",
            width: 32,
            height: 32,
            fps: 30,
        })
        .stream(FixtureStream::Subtitle { handler: *b"DXSB" });

    for (seed, &(stream, len)) in chunks.iter().enumerate() {
        fixture = fixture.chunk(stream, pattern(len, seed as u8));
    }
    fixture.build()
}

proptest! {
    /// Any interleaving of chunks yields non-decreasing timestamps per stream.
    #[test]
    fn avi_interleavings_keep_timestamps_ordered(
        chunks in proptest::collection::vec((0u8..3, 0usize..64), 0..40),
    ) {
        let expected = chunks.iter().filter(|(_, len)| *len > 0).count();
        let mut demuxer = resolve(avi_with_chunks(&chunks));

        let first = demuxer.available_streams().to_vec();
        prop_assert_eq!(demuxer.available_streams(), &first[..]);
        prop_assert_eq!(assert_monotonic_timestamps(&mut demuxer), expected);
    }
}
