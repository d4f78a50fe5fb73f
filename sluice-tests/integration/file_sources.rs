//! Resolution from files on disk and generic readers

use std::io::Cursor;

use sluice_core::test_fixtures::{AdtsFixture, WavFixture, three_stream_avi, write_temp_file};
use sluice_core::{DemuxError, FormatRegistry, MediaFile, SluiceConfig};

#[test]
fn test_open_path_resolves_each_format() {
    let cases = [
        (WavFixture::new(22_050, 2, 16, 300).build(), ".wav", "wav"),
        (three_stream_avi(), ".avi", "avi"),
        (AdtsFixture::new(4, 2, 5).build(), ".aac", "adts"),
    ];

    for (bytes, suffix, expected) in cases {
        let file = write_temp_file(&bytes, suffix);
        let mut demuxer = sluice_core::open_path(file.path()).unwrap();

        assert_eq!(demuxer.format_name(), expected);
        assert!(demuxer.packets().all(|result| result.is_ok()));
    }
}

#[test]
fn test_misleading_extension_does_not_change_the_winner() {
    let file = write_temp_file(&three_stream_avi(), ".wav");
    let demuxer = sluice_core::open_path(file.path()).unwrap();
    assert_eq!(demuxer.format_name(), "avi");
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let error = sluice_core::open_path(dir.path().join("missing.avi")).unwrap_err();
    assert!(matches!(error, DemuxError::Io(_)), "{error}");
}

#[test]
fn test_file_contents_match_in_memory_results() {
    let bytes = WavFixture::new(8_000, 1, 16, 1000).build();
    let registry = FormatRegistry::with_defaults(&SluiceConfig::for_testing());

    let file = write_temp_file(&bytes, ".wav");
    let mut from_disk = registry.open_path(file.path()).unwrap();
    let mut from_memory = registry.resolve(MediaFile::from_bytes(bytes)).unwrap();

    let disk: Vec<_> = from_disk.packets().collect::<Result<_, _>>().unwrap();
    let memory: Vec<_> = from_memory.packets().collect::<Result<_, _>>().unwrap();
    assert_eq!(disk, memory);
    assert_eq!(disk.len(), 4);
}

#[test]
fn test_reader_source_with_start_offset() {
    let mut bytes = vec![0u8; 100];
    bytes.extend(AdtsFixture::new(3, 1, 4).build());

    let mut file = MediaFile::from_reader(Cursor::new(bytes)).unwrap();
    file.skip(100).unwrap();

    let mut demuxer = FormatRegistry::default().resolve(file).unwrap();
    let first = demuxer.read_packet().unwrap().into_packet().unwrap();
    assert_eq!(first.position, 107);
}

#[test]
fn test_demuxer_returns_source_after_close() {
    let bytes = three_stream_avi();
    let len = bytes.len() as u64;
    let mut demuxer = FormatRegistry::default()
        .resolve(MediaFile::from_bytes(bytes))
        .unwrap();
    while !demuxer.read_packet().unwrap().is_end_of_stream() {}

    let file = demuxer.into_source();
    assert_eq!(file.size(), Some(len));
    assert!(!file.is_probing());
}
