//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use serde::Serialize;
use sluice_core::{
    Demuxer, FormatRegistry, SluiceConfig, StreamMetadata, StreamParameters,
};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Identify the container format and list its streams
    Probe {
        /// Media file to inspect
        file: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List packets in file order
    Packets {
        /// Media file to read
        file: PathBuf,
        /// Stop after this many packets
        #[arg(short, long)]
        limit: Option<usize>,
        /// Only show packets of this stream
        #[arg(short, long)]
        stream: Option<u32>,
    },
    /// List the built-in container formats in resolution order
    Formats,
}

/// Handle the CLI command
///
/// # Errors
/// Returns the open or read failure of the command that fails
pub fn handle_command(command: Commands) -> anyhow::Result<()> {
    let registry = FormatRegistry::with_defaults(&SluiceConfig::from_env());

    match command {
        Commands::Probe { file, json } => probe_file(&registry, &file, json),
        Commands::Packets {
            file,
            limit,
            stream,
        } => list_packets(&registry, &file, limit, stream),
        Commands::Formats => {
            list_formats(&registry);
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct ProbeReport<'a> {
    file: &'a Path,
    format: &'static str,
    size: Option<u64>,
    streams: &'a [StreamMetadata],
}

fn open(registry: &FormatRegistry, path: &Path) -> anyhow::Result<Demuxer> {
    registry
        .open_path(path)
        .with_context(|| format!("cannot open {}", path.display()))
}

/// Print the format and streams of a file
///
/// # Errors
/// - `DemuxError::UnrecognizedFile` - No built-in format recognized the file
/// - `DemuxError::Io` - File could not be read
pub fn probe_file(registry: &FormatRegistry, path: &Path, json: bool) -> anyhow::Result<()> {
    let demuxer = open(registry, path)?;
    let size = std::fs::metadata(path).ok().map(|meta| meta.len());

    if json {
        let report = ProbeReport {
            file: path,
            format: demuxer.format_name(),
            size,
            streams: demuxer.available_streams(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File: {}", path.display());
    println!("Format: {}", demuxer.format_name());
    if let Some(size) = size {
        println!("Size: {size} bytes");
    }
    println!("Streams: {}", demuxer.available_streams().len());
    for stream in demuxer.available_streams() {
        println!("  {}", describe_stream(stream));
    }

    Ok(())
}

fn describe_stream(stream: &StreamMetadata) -> String {
    let mut line = format!("#{} {} {}", stream.index, stream.kind(), stream.codec());

    match &stream.params {
        StreamParameters::Audio(audio) => {
            line.push_str(&format!(", {} Hz, {} ch", audio.sample_rate, audio.channels));
            if let Some(bits) = audio.bits_per_sample {
                line.push_str(&format!(", {bits} bit"));
            }
        }
        StreamParameters::Video(video) => {
            line.push_str(&format!(", {}x{}", video.width, video.height));
            if let Some(rate) = video.frame_rate.and_then(|rate| rate.to_f64()) {
                line.push_str(&format!(", {rate:.3} fps"));
            }
        }
        StreamParameters::Subtitle(_) => {}
        StreamParameters::Other(other) => {
            for (key, value) in &other.properties {
                line.push_str(&format!(", {key}={value}"));
            }
        }
    }

    if let Some(seconds) = stream.duration_seconds() {
        line.push_str(&format!(", {seconds:.2}s"));
    }
    if let Some(name) = &stream.name {
        line.push_str(&format!(" \"{name}\""));
    }
    line
}

/// Print one line per packet until end of stream or `limit`
///
/// # Errors
/// - `DemuxError::UnrecognizedFile` - No built-in format recognized the file
/// - `DemuxError::CorruptStream` - File is damaged or truncated
/// - `DemuxError::Io` - File could not be read
pub fn list_packets(
    registry: &FormatRegistry,
    path: &Path,
    limit: Option<usize>,
    stream: Option<u32>,
) -> anyhow::Result<()> {
    let mut demuxer = open(registry, path)?;
    if let Some(index) = stream {
        anyhow::ensure!(
            demuxer.stream(index).is_some(),
            "{} has no stream {index}",
            path.display()
        );
    }

    println!("{:>6} {:>10} {:>8} {:>12}  key", "stream", "pts", "size", "position");

    let mut shown = 0;
    for packet in demuxer.packets() {
        if limit.is_some_and(|limit| shown >= limit) {
            break;
        }
        let packet = packet.with_context(|| format!("failed after {shown} packets"))?;
        if stream.is_some_and(|index| index != packet.stream_index) {
            continue;
        }

        let pts = packet
            .pts
            .map_or_else(|| "-".to_string(), |pts| pts.to_string());
        println!(
            "{:>6} {:>10} {:>8} {:>12}  {}",
            packet.stream_index,
            pts,
            packet.size(),
            packet.position,
            if packet.keyframe { "K" } else { "" }
        );
        shown += 1;
    }

    tracing::debug!(
        shown,
        packets_read = demuxer.packets_read(),
        "Finished listing packets"
    );
    Ok(())
}

/// Print the registered formats in resolution order
pub fn list_formats(registry: &FormatRegistry) {
    println!("{:<6} {:<18} extensions", "name", "mime type");
    for format in registry.formats() {
        println!(
            "{:<6} {:<18} {}",
            format.name(),
            format.mime_type(),
            format.extensions().join(", ")
        );
    }
}
