//! Format resolution across the built-in registry
//!
//! Covers which format wins for each fixture, what happens to byte sources
//! nobody recognizes, and that declining formats leave no trace on the source.

use proptest::prelude::*;
use sluice_core::test_fixtures::{AdtsFixture, WavFixture, pattern, three_stream_avi};
use sluice_core::{
    CodecId, DemuxError, FormatRegistry, MediaFile, Resolution, SluiceConfig, StreamKind,
};

fn registry() -> FormatRegistry {
    FormatRegistry::with_defaults(&SluiceConfig::for_testing())
}

#[test]
fn test_wav_resolves_with_pcm_stream() {
    let demuxer = registry()
        .resolve(MediaFile::from_bytes(WavFixture::new(44_100, 2, 16, 1000).build()))
        .unwrap();

    assert_eq!(demuxer.format_name(), "wav");
    let streams = demuxer.available_streams();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].kind(), StreamKind::Audio);
    assert_eq!(streams[0].codec(), CodecId::PcmS16Le);
}

#[test]
fn test_avi_resolves_with_declared_streams() {
    let demuxer = registry()
        .resolve(MediaFile::from_bytes(three_stream_avi()))
        .unwrap();

    assert_eq!(demuxer.format_name(), "avi");
    let kinds: Vec<_> = demuxer
        .available_streams()
        .iter()
        .map(|stream| stream.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![StreamKind::Audio, StreamKind::Video, StreamKind::Subtitle]
    );
}

#[test]
fn test_adts_behind_id3_tag_resolves() {
    let bytes = AdtsFixture::new(3, 2, 4).with_id3(300).build();
    let demuxer = registry().resolve(MediaFile::from_bytes(bytes)).unwrap();

    assert_eq!(demuxer.format_name(), "adts");
    assert_eq!(demuxer.available_streams()[0].codec(), CodecId::Aac);
}

#[test]
fn test_garbage_is_unrecognized() {
    let error = registry()
        .resolve(MediaFile::from_bytes(pattern(4096, 9)))
        .unwrap_err();

    assert!(error.is_unrecognized());
    assert!(error.to_string().contains("wav, avi, adts"));
}

#[test]
fn test_empty_source_is_unrecognized() {
    let error = registry()
        .resolve(MediaFile::from_bytes(Vec::new()))
        .unwrap_err();
    assert!(matches!(error, DemuxError::UnrecognizedFile { .. }));
}

#[test]
fn test_riff_with_unknown_form_is_unrecognized() {
    let mut bytes = WavFixture::new(8_000, 1, 8, 16).build();
    bytes[8..12].copy_from_slice(b"CDXA");

    match registry().try_resolve(MediaFile::from_bytes(bytes)).unwrap() {
        Resolution::Unrecognized(file) => assert_eq!(file.position(), 0),
        Resolution::Recognized(demuxer) => {
            panic!("{} claimed a RIFF CDXA file", demuxer.format_name())
        }
    }
}

#[test]
fn test_unrecognized_source_can_be_retried() {
    let mut registry = FormatRegistry::empty();
    let file = match registry
        .try_resolve(MediaFile::from_bytes(three_stream_avi()))
        .unwrap()
    {
        Resolution::Unrecognized(file) => file,
        Resolution::Recognized(_) => panic!("empty registry recognized a file"),
    };

    registry.register(Box::new(sluice_core::format::AviFormat::default()));
    let demuxer = registry.resolve(file).unwrap();
    assert_eq!(demuxer.format_name(), "avi");
}

fn riff_prefixed() -> impl Strategy<Value = Vec<u8>> {
    (
        prop_oneof![Just(*b"WAVE"), Just(*b"AVI ")],
        proptest::collection::vec(any::<u8>(), 0..256),
    )
        .prop_map(|(form, tail)| {
            let mut bytes = b"RIFF".to_vec();
            bytes.extend_from_slice(&(tail.len() as u32 + 4).to_le_bytes());
            bytes.extend_from_slice(&form);
            bytes.extend(tail);
            bytes
        })
}

proptest! {
    /// Sources nobody recognizes come back exactly where they started.
    #[test]
    fn unrecognized_sources_keep_their_position(
        bytes in proptest::collection::vec(any::<u8>(), 0..512),
        offset in 0usize..16,
    ) {
        let mut file = MediaFile::from_bytes(bytes.clone());
        let start = offset.min(bytes.len()) as u64;
        file.skip(start).unwrap();

        if let Resolution::Unrecognized(file) = registry().try_resolve(file).unwrap() {
            prop_assert_eq!(file.position(), start);
            prop_assert!(!file.is_probing());
        }
    }

    /// Whatever a format accepts, reading it terminates without panicking.
    #[test]
    fn damaged_riff_files_never_panic(bytes in riff_prefixed()) {
        if let Ok(mut demuxer) = registry().resolve(MediaFile::from_bytes(bytes)) {
            let read = demuxer.packets().take(1024).count();
            prop_assert!(read < 1024);
        }
    }
}
