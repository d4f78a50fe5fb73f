//! Truncated and damaged files
//!
//! A file cut short after its header is still recognized; the damage only
//! surfaces while reading packets, and once it does the demuxer stays failed.

use sluice_core::test_fixtures::{AdtsFixture, AviFixture, FixtureStream, WavFixture};
use sluice_core::test_fixtures::{pattern, three_stream_avi, truncate};
use sluice_core::{DemuxError, Demuxer, DemuxerState, FormatRegistry, MediaFile, SluiceConfig};

fn resolve(bytes: Vec<u8>) -> Demuxer {
    FormatRegistry::with_defaults(&SluiceConfig::for_testing())
        .resolve(MediaFile::from_bytes(bytes))
        .unwrap()
}

/// Reads until the first error, returning the packet count and the error.
fn read_until_failure(demuxer: &mut Demuxer) -> (usize, DemuxError) {
    let mut count = 0;
    for result in demuxer.packets() {
        match result {
            Ok(_) => count += 1,
            Err(e) => return (count, e),
        }
    }
    panic!("{} reached end of stream after {count} packets", demuxer.format_name());
}

fn assert_stays_failed(demuxer: &mut Demuxer) {
    assert_eq!(demuxer.state(), DemuxerState::Failed);
    for _ in 0..2 {
        assert!(matches!(
            demuxer.read_packet(),
            Err(DemuxError::ContainerFailed)
        ));
    }
    assert_eq!(demuxer.packets().count(), 0);
}

#[test]
fn test_truncated_wav() {
    // 44 byte header, then 2000 bytes of samples read 512 at a time
    let bytes = truncate(WavFixture::new(8_000, 1, 16, 1000).build(), 1000);
    let mut demuxer = resolve(bytes);
    assert_eq!(demuxer.format_name(), "wav");

    let (packets, error) = read_until_failure(&mut demuxer);
    assert_eq!(packets, 1);
    assert!(matches!(error, DemuxError::CorruptStream { .. }), "{error}");
    assert_stays_failed(&mut demuxer);
}

#[test]
fn test_truncated_avi() {
    let full = three_stream_avi();
    let bytes = truncate(full.clone(), full.len() - 10);
    let mut demuxer = resolve(bytes);
    assert_eq!(demuxer.format_name(), "avi");

    let (packets, error) = read_until_failure(&mut demuxer);
    assert_eq!(packets, 7);
    assert!(matches!(error, DemuxError::CorruptStream { .. }), "{error}");
    assert_stays_failed(&mut demuxer);
}

#[test]
fn test_truncated_adts() {
    // Three 23 byte frames; the cut lands in the third payload
    let bytes = truncate(AdtsFixture::new(4, 2, 3).build(), 60);
    let mut demuxer = resolve(bytes);
    assert_eq!(demuxer.format_name(), "adts");

    let (packets, error) = read_until_failure(&mut demuxer);
    assert_eq!(packets, 2);
    assert!(matches!(error, DemuxError::CorruptStream { .. }), "{error}");
    assert_stays_failed(&mut demuxer);
}

#[test]
fn test_avi_chunk_for_undeclared_stream() {
    let bytes = AviFixture::new()
        .stream(FixtureStream::Audio {
            sample_rate: 8_000,
            channels: 1,
            bits: 8,
        })
        .chunk(0, pattern(64, 1))
        .chunk(3, pattern(64, 2))
        .build();
    let mut demuxer = resolve(bytes);

    let (packets, error) = read_until_failure(&mut demuxer);
    assert_eq!(packets, 1);
    assert!(matches!(error, DemuxError::CorruptStream { .. }), "{error}");
    assert_stays_failed(&mut demuxer);
}

#[test]
fn test_corrupt_position_points_into_file() {
    let full = three_stream_avi();
    let len = full.len() as u64;
    let mut demuxer = resolve(truncate(full, len as usize - 10));

    let (_, error) = read_until_failure(&mut demuxer);
    match error {
        DemuxError::CorruptStream { position, .. } => assert!(position < len),
        other => panic!("expected corrupt stream, got {other}"),
    }
}

#[test]
fn test_complete_files_reach_end_of_stream() {
    let fixtures = [
        WavFixture::new(8_000, 1, 16, 1000).build(),
        three_stream_avi(),
        AdtsFixture::new(4, 2, 3).build(),
    ];

    for bytes in fixtures {
        let mut demuxer = resolve(bytes);
        for result in demuxer.packets() {
            result.unwrap();
        }
        assert_eq!(demuxer.state(), DemuxerState::EndOfStream);
    }
}
