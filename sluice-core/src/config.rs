//! Centralized configuration for Sluice.
//!
//! All tunable limits used while probing and demultiplexing are defined here
//! to avoid hard-coded values scattered throughout the format modules.

/// Central configuration for all Sluice components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct SluiceConfig {
    pub probe: ProbeConfig,
    pub demux: DemuxConfig,
}

/// Format recognition configuration.
///
/// Bounds how much work a candidate format may do on a byte source before
/// deciding whether it recognizes it.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Largest header structure a probe will read (AVI `hdrl`, WAV `fmt `)
    pub max_header_bytes: u32,
    /// Largest leading ID3v2 tag skipped when probing raw audio streams
    pub id3_skip_limit: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: 1024 * 1024, // 1 MiB
            id3_skip_limit: 4 * 1024 * 1024, // 4 MiB, cover art included
        }
    }
}

/// Packet extraction configuration.
#[derive(Debug, Clone)]
pub struct DemuxConfig {
    /// Chunk or frame sizes above this are treated as corruption
    pub max_packet_size: u32,
    /// Sample frames per packet for uncompressed PCM streams
    pub pcm_packet_frames: u32,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            max_packet_size: 64 * 1024 * 1024, // 64 MiB
            pcm_packet_frames: 4096,
        }
    }
}

impl SluiceConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("SLUICE_MAX_HEADER_BYTES") {
            if let Ok(bytes) = value.parse::<u32>() {
                config.probe.max_header_bytes = bytes;
            }
        }

        if let Ok(value) = std::env::var("SLUICE_ID3_SKIP_LIMIT") {
            if let Ok(bytes) = value.parse::<u32>() {
                config.probe.id3_skip_limit = bytes;
            }
        }

        if let Ok(value) = std::env::var("SLUICE_MAX_PACKET_SIZE") {
            if let Ok(bytes) = value.parse::<u32>() {
                config.demux.max_packet_size = bytes;
            }
        }

        if let Ok(value) = std::env::var("SLUICE_PCM_PACKET_FRAMES") {
            if let Ok(frames) = value.parse::<u32>() {
                if frames > 0 {
                    config.demux.pcm_packet_frames = frames;
                }
            }
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Small PCM packets so synthetic fixtures produce several packets, and
    /// tight limits so oversized structures are caught quickly.
    pub fn for_testing() -> Self {
        Self {
            probe: ProbeConfig {
                max_header_bytes: 64 * 1024,
                id3_skip_limit: 64 * 1024,
            },
            demux: DemuxConfig {
                max_packet_size: 1024 * 1024,
                pcm_packet_frames: 256,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = SluiceConfig::default();

        assert_eq!(config.probe.max_header_bytes, 1024 * 1024);
        assert_eq!(config.probe.id3_skip_limit, 4 * 1024 * 1024);
        assert_eq!(config.demux.max_packet_size, 64 * 1024 * 1024);
        assert_eq!(config.demux.pcm_packet_frames, 4096);
    }

    #[test]
    fn test_testing_preset() {
        let config = SluiceConfig::for_testing();
        assert_eq!(config.demux.pcm_packet_frames, 256);
        assert!(config.demux.max_packet_size < DemuxConfig::default().max_packet_size);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("SLUICE_MAX_HEADER_BYTES", "2048");
            std::env::set_var("SLUICE_MAX_PACKET_SIZE", "4096");
            std::env::set_var("SLUICE_PCM_PACKET_FRAMES", "0");
            std::env::set_var("SLUICE_ID3_SKIP_LIMIT", "not-a-number");
        }

        let config = SluiceConfig::from_env();

        assert_eq!(config.probe.max_header_bytes, 2048);
        assert_eq!(config.demux.max_packet_size, 4096);
        // Zero frames per packet would never make progress
        assert_eq!(config.demux.pcm_packet_frames, 4096);
        assert_eq!(config.probe.id3_skip_limit, 4 * 1024 * 1024);

        // Cleanup
        unsafe {
            std::env::remove_var("SLUICE_MAX_HEADER_BYTES");
            std::env::remove_var("SLUICE_MAX_PACKET_SIZE");
            std::env::remove_var("SLUICE_PCM_PACKET_FRAMES");
            std::env::remove_var("SLUICE_ID3_SKIP_LIMIT");
        }
    }
}
