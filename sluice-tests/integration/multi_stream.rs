//! Interleaved multi-stream demultiplexing
//!
//! Reads every packet of the three-stream AVI fixture and checks stream
//! attribution, timestamps, payloads and the end of stream contract.

use bytes::Bytes;
use sluice_core::test_fixtures::{THREE_STREAM_PACKETS, pattern, three_stream_avi};
use sluice_core::{
    CodecId, DemuxerState, FormatRegistry, MediaFile, ReadOutcome, SluiceConfig, StreamKind,
    StreamParameters,
};

fn open_three_stream() -> sluice_core::Demuxer {
    FormatRegistry::with_defaults(&SluiceConfig::for_testing())
        .resolve(MediaFile::from_bytes(three_stream_avi()))
        .unwrap()
}

#[test]
fn test_packets_follow_file_order() {
    let mut demuxer = open_three_stream();

    let packets: Vec<_> = demuxer.packets().collect::<Result<_, _>>().unwrap();
    let order: Vec<(u32, i64)> = packets
        .iter()
        .map(|packet| (packet.stream_index, packet.pts.unwrap()))
        .collect();

    assert_eq!(order, THREE_STREAM_PACKETS.to_vec());
    assert_eq!(demuxer.packets_read(), THREE_STREAM_PACKETS.len() as u64);
    assert_eq!(demuxer.state(), DemuxerState::EndOfStream);
}

#[test]
fn test_packet_payloads_are_intact() {
    let mut demuxer = open_three_stream();
    let packets: Vec<_> = demuxer.packets().collect::<Result<_, _>>().unwrap();

    assert_eq!(packets[0].data, Bytes::from(pattern(300, 1)));
    assert_eq!(packets[1].data, Bytes::from(pattern(320, 2)));
    assert_eq!(packets[2].data, Bytes::from_static(b"[00:00.000] Hello"));
    assert_eq!(packets[7].data, Bytes::from_static(b"[00:00.080] Bye!"));

    // Packets from inside a LIST rec are not distinguishable from plain ones
    assert_eq!(packets[5].data, Bytes::from(pattern(302, 5)));
    assert_eq!(packets[6].data, Bytes::from(pattern(320, 6)));
}

#[test]
fn test_every_packet_references_a_declared_stream() {
    let mut demuxer = open_three_stream();
    let declared: Vec<u32> = demuxer
        .available_streams()
        .iter()
        .map(|stream| stream.index)
        .collect();

    for packet in demuxer.packets() {
        let packet = packet.unwrap();
        assert!(declared.contains(&packet.stream_index));
    }
}

#[test]
fn test_stream_metadata() {
    let demuxer = open_three_stream();

    let audio = demuxer.stream(0).unwrap();
    assert_eq!(audio.kind(), StreamKind::Audio);
    assert_eq!(audio.name.as_deref(), Some("Commentary"));
    assert_eq!(audio.time_base.and_then(|tb| tb.to_f64()), Some(1.0 / 8_000.0));

    let video = demuxer.stream(1).unwrap();
    match &video.params {
        StreamParameters::Video(params) => {
            assert_eq!(params.codec, CodecId::Mjpeg);
            assert_eq!((params.width, params.height), (64, 48));
        }
        other => panic!("stream 1 should be video, got {other:?}"),
    }
    assert_eq!(video.time_base.and_then(|tb| tb.to_f64()), Some(1.0 / 25.0));

    let subtitle = demuxer.stream(2).unwrap();
    assert_eq!(subtitle.codec(), CodecId::DivxSubtitle);
    assert_eq!(subtitle.name.as_deref(), Some("English"));
}

#[test]
fn test_mjpeg_frames_are_keyframes() {
    let mut demuxer = open_three_stream();
    let video_keyframes: Vec<bool> = demuxer
        .packets()
        .map(Result::unwrap)
        .filter(|packet| packet.stream_index == 1)
        .map(|packet| packet.keyframe)
        .collect();

    assert_eq!(video_keyframes, vec![true, true, true]);
}

#[test]
fn test_end_of_stream_is_sticky() {
    let mut demuxer = open_three_stream();
    for _ in 0..THREE_STREAM_PACKETS.len() {
        assert!(matches!(demuxer.read_packet(), Ok(ReadOutcome::Packet(_))));
    }

    for _ in 0..3 {
        assert!(demuxer.read_packet().unwrap().is_end_of_stream());
    }
    assert_eq!(demuxer.packets().count(), 0);
    assert_eq!(demuxer.state(), DemuxerState::EndOfStream);
}

#[test]
fn test_stream_metadata_serializes() {
    let demuxer = open_three_stream();
    let json = serde_json::to_value(demuxer.available_streams()).unwrap();

    assert_eq!(json[0]["params"]["kind"], "audio");
    assert_eq!(json[0]["params"]["codec"], "pcm_s16le");
    assert_eq!(json[1]["params"]["codec"], "mjpeg");
    assert_eq!(json[2]["name"], "English");
}
