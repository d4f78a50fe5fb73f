//! Format registry and resolution.
//!
//! Resolution hands the byte source to each candidate format in turn. A
//! candidate that does not recognize the source hands it back unchanged and
//! the next one is tried; the first candidate that recognizes it wins.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::SluiceConfig;
use crate::container::{ContainerFormat, Probe};
use crate::demuxer::Demuxer;
use crate::error::{DemuxError, DemuxResult};
use crate::format::{AdtsFormat, AviFormat, WavFormat};
use crate::source::MediaFile;

/// Outcome of resolving a byte source against the registry.
#[derive(Debug)]
pub enum Resolution {
    /// A format recognized the source.
    Recognized(Demuxer),
    /// No format recognized the source; it is returned at its original position.
    Unrecognized(MediaFile),
}

/// Ordered set of container formats.
///
/// Order matters: when several formats could claim a source, the one
/// registered first wins.
pub struct FormatRegistry {
    formats: Vec<Box<dyn ContainerFormat>>,
}

impl FormatRegistry {
    /// Creates a registry with no formats.
    pub fn empty() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Creates a registry with the built-in formats: WAV, AVI, then ADTS.
    pub fn with_defaults(config: &SluiceConfig) -> Self {
        let formats: Vec<Box<dyn ContainerFormat>> = vec![
            Box::new(WavFormat::new(config)),
            Box::new(AviFormat::new(config)),
            Box::new(AdtsFormat::new(config)),
        ];
        Self::with_formats(formats)
    }

    /// Creates a registry trying `formats` in the given order.
    pub fn with_formats(formats: Vec<Box<dyn ContainerFormat>>) -> Self {
        let mut registry = Self::empty();
        for format in formats {
            registry.register(format);
        }
        registry
    }

    /// Adds a format at the end of the resolution order.
    ///
    /// A format with the same name as a registered one replaces it in place.
    pub fn register(&mut self, format: Box<dyn ContainerFormat>) -> &mut Self {
        match self.formats.iter().position(|f| f.name() == format.name()) {
            Some(existing) => {
                debug!(format = format.name(), "Replacing registered format");
                self.formats[existing] = format;
            }
            None => self.formats.push(format),
        }
        self
    }

    /// Returns the registered formats in resolution order.
    pub fn formats(&self) -> impl Iterator<Item = &dyn ContainerFormat> {
        self.formats.iter().map(|format| format.as_ref())
    }

    /// Returns the registered format names in resolution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.formats().map(|format| format.name()).collect()
    }

    /// Looks up a format by name.
    pub fn find(&self, name: &str) -> Option<&dyn ContainerFormat> {
        self.formats().find(|format| format.name() == name)
    }

    /// Returns the number of registered formats.
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Checks whether no formats are registered.
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Returns the order in which formats are tried for a file with `extension`.
    ///
    /// Formats claiming the extension move to the front; relative order is
    /// otherwise kept, so resolution stays deterministic for a given name.
    pub fn candidates(&self, extension: Option<&str>) -> Vec<&dyn ContainerFormat> {
        let claims = |format: &&dyn ContainerFormat| {
            extension.is_some_and(|ext| format.extensions().contains(&ext))
        };

        let (mut hinted, rest): (Vec<_>, Vec<_>) = self.formats().partition(claims);
        hinted.extend(rest);
        hinted
    }

    /// Tries each candidate format on `file` until one recognizes it.
    ///
    /// # Errors
    ///
    /// - `DemuxError::Io` - Byte source failed while a candidate was probing
    pub fn try_resolve(&self, mut file: MediaFile) -> DemuxResult<Resolution> {
        let start = file.position();
        let extension = file.extension();

        for format in self.candidates(extension.as_deref()) {
            match format.open(file)? {
                Probe::Recognized(container) => {
                    info!(
                        format = format.name(),
                        streams = container.available_streams().len(),
                        "Recognized container"
                    );
                    return Ok(Resolution::Recognized(Demuxer::new(container)));
                }
                Probe::NotRecognized(returned) => {
                    file = returned;
                    if file.position() != start {
                        warn!(
                            format = format.name(),
                            position = file.position(),
                            start,
                            "Format returned the source at the wrong position"
                        );
                        file.rewind_to(start)?;
                    }
                }
            }
        }

        debug!(name = ?file.name(), "No format recognized the source");
        Ok(Resolution::Unrecognized(file))
    }

    /// Resolves `file` to a demuxer.
    ///
    /// # Errors
    ///
    /// - `DemuxError::UnrecognizedFile` - No registered format recognized the source
    /// - `DemuxError::Io` - Byte source failed while probing
    pub fn resolve(&self, file: MediaFile) -> DemuxResult<Demuxer> {
        let tried: Vec<&'static str> = self
            .candidates(file.extension().as_deref())
            .iter()
            .map(|format| format.name())
            .collect();

        match self.try_resolve(file)? {
            Resolution::Recognized(demuxer) => Ok(demuxer),
            Resolution::Unrecognized(_) => Err(DemuxError::UnrecognizedFile { tried }),
        }
    }

    /// Opens the file at `path` and resolves it.
    ///
    /// # Errors
    ///
    /// - `DemuxError::Io` - File cannot be opened or read
    /// - `DemuxError::UnrecognizedFile` - No registered format recognized the file
    pub fn open_path(&self, path: impl AsRef<Path>) -> DemuxResult<Demuxer> {
        let file = MediaFile::open(path)?;
        self.resolve(file)
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults(&SluiceConfig::default())
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::test_fixtures::{AdtsFixture, WavFixture, three_stream_avi};

    /// Format that reads a few bytes, then declines.
    struct Declining {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl ContainerFormat for Declining {
        fn name(&self) -> &'static str {
            self.name
        }

        fn extensions(&self) -> &'static [&'static str] {
            &["dec"]
        }

        fn mime_type(&self) -> &'static str {
            "application/octet-stream"
        }

        fn open(&self, mut file: MediaFile) -> DemuxResult<Probe> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut probe = file.begin_probe();
            probe.skip(4)?;
            probe.rollback()?;
            Ok(Probe::NotRecognized(file))
        }
    }

    /// Format that forgets to restore the position.
    struct Sloppy;

    impl ContainerFormat for Sloppy {
        fn name(&self) -> &'static str {
            "sloppy"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &[]
        }

        fn mime_type(&self) -> &'static str {
            "application/octet-stream"
        }

        fn open(&self, mut file: MediaFile) -> DemuxResult<Probe> {
            let _ = file.read_u8();
            Ok(Probe::NotRecognized(file))
        }
    }

    #[test]
    fn test_default_order() {
        let registry = FormatRegistry::default();
        assert_eq!(registry.names(), vec!["wav", "avi", "adts"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.find("avi").is_some());
        assert!(registry.find("mkv").is_none());
    }

    #[test]
    fn test_resolves_each_builtin_format() {
        let registry = FormatRegistry::with_defaults(&SluiceConfig::for_testing());

        let cases = [
            (WavFixture::new(8_000, 1, 16, 100).build(), "wav"),
            (three_stream_avi(), "avi"),
            (AdtsFixture::new(4, 2, 3).build(), "adts"),
        ];
        for (bytes, expected) in cases {
            let demuxer = registry.resolve(MediaFile::from_bytes(bytes)).unwrap();
            assert_eq!(demuxer.format_name(), expected);
        }
    }

    #[test]
    fn test_unrecognized_lists_tried_formats() {
        let registry = FormatRegistry::default();
        let error = registry
            .resolve(MediaFile::from_bytes(&b"definitely not media"[..]))
            .unwrap_err();

        match error {
            DemuxError::UnrecognizedFile { tried } => {
                assert_eq!(tried, vec!["wav", "avi", "adts"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_try_resolve_returns_source_untouched() {
        let registry = FormatRegistry::default();
        let mut file = MediaFile::from_bytes((0u8..64).collect::<Vec<_>>());
        file.skip(5).unwrap();

        match registry.try_resolve(file).unwrap() {
            Resolution::Unrecognized(file) => {
                assert_eq!(file.position(), 5);
                assert!(!file.is_probing());
            }
            Resolution::Recognized(_) => panic!("garbage must not be recognized"),
        }
    }

    #[test]
    fn test_first_registered_format_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = FormatRegistry::empty();
        registry
            .register(Box::new(Declining {
                name: "declining",
                calls: Arc::clone(&calls),
            }))
            .register(Box::new(AdtsFormat::default()))
            .register(Box::new(WavFormat::default()));

        let demuxer = registry
            .resolve(MediaFile::from_bytes(WavFixture::new(8_000, 1, 16, 10).build()))
            .unwrap();
        assert_eq!(demuxer.format_name(), "wav");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_extension_hint_reorders_candidates() {
        let registry = FormatRegistry::default();

        let names = |ext| -> Vec<_> {
            registry
                .candidates(ext)
                .iter()
                .map(|format| format.name())
                .collect()
        };
        assert_eq!(names(Some("aac")), vec!["adts", "wav", "avi"]);
        assert_eq!(names(Some("avi")), vec!["avi", "wav", "adts"]);
        assert_eq!(names(Some("mkv")), vec!["wav", "avi", "adts"]);
        assert_eq!(names(None), vec!["wav", "avi", "adts"]);
    }

    #[test]
    fn test_misnamed_file_still_resolves() {
        let registry = FormatRegistry::default();
        let file = MediaFile::from_bytes(three_stream_avi()).with_name("movie.aac");

        let demuxer = registry.resolve(file).unwrap();
        assert_eq!(demuxer.format_name(), "avi");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = FormatRegistry::default();
        registry.register(Box::new(AviFormat::new(&SluiceConfig::for_testing())));
        assert_eq!(registry.names(), vec!["wav", "avi", "adts"]);
    }

    #[test]
    fn test_misbehaving_format_is_rewound() {
        let formats: Vec<Box<dyn ContainerFormat>> =
            vec![Box::new(Sloppy), Box::new(WavFormat::default())];
        let registry = FormatRegistry::with_formats(formats);

        let demuxer = registry
            .resolve(MediaFile::from_bytes(WavFixture::new(8_000, 1, 16, 10).build()))
            .unwrap();
        assert_eq!(demuxer.format_name(), "wav");
    }

    #[test]
    fn test_empty_registry_recognizes_nothing() {
        let registry = FormatRegistry::empty();
        assert!(registry.is_empty());

        let error = registry
            .resolve(MediaFile::from_bytes(three_stream_avi()))
            .unwrap_err();
        assert!(error.is_unrecognized());
    }
}
