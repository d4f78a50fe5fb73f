//! Seekable byte source with reversible probing.
//!
//! Containers are constructed from a [`MediaFile`] that is in probe mode: the
//! candidate format may read forward freely, then either commits (keeping the
//! new position for sequential reads) or rolls back to exactly where the probe
//! began. Probe mode is an explicit checkpoint held by a [`ProbeGuard`], so
//! rollback correctness does not depend on any implicit flag on the source.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::ops::{Deref, DerefMut};
use std::path::Path;

use bytes::Bytes;
use tracing::{error, trace};

/// Anything a [`MediaFile`] can read from.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Byte source owned by exactly one container (or resolution attempt) at a time.
///
/// Tracks its own read position so containers never need to query the
/// underlying reader, and knows its total size when the reader can report it.
pub struct MediaFile {
    inner: Box<dyn ReadSeek>,
    position: u64,
    size: Option<u64>,
    name: Option<String>,
    probe_depth: usize,
}

impl MediaFile {
    /// Opens a file on disk, buffered.
    ///
    /// # Errors
    ///
    /// - `io::Error` - File cannot be opened or its metadata read
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            inner: Box::new(BufReader::new(file)),
            position: 0,
            size: Some(size),
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            probe_depth: 0,
        })
    }

    /// Wraps an arbitrary seekable reader, starting at its current position.
    ///
    /// # Errors
    ///
    /// - `io::Error` - Reader cannot report its position or size
    pub fn from_reader<R: Read + Seek + Send + 'static>(mut reader: R) -> io::Result<Self> {
        let position = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(position))?;

        Ok(Self {
            inner: Box::new(reader),
            position,
            size: Some(end),
            name: None,
            probe_depth: 0,
        })
    }

    /// Wraps an in-memory buffer.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let size = data.len() as u64;

        Self {
            inner: Box::new(Cursor::new(data)),
            position: 0,
            size: Some(size),
            name: None,
            probe_depth: 0,
        }
    }

    /// Attaches a file name, used for extension hints during resolution.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the file name, if known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the lowercase file extension, if the name has one.
    pub fn extension(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        Path::new(name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    /// Returns the current read position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the total size in bytes, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Returns the number of bytes left after the current position, if known.
    pub fn remaining(&self) -> Option<u64> {
        self.size.map(|size| size.saturating_sub(self.position))
    }

    /// Returns how many probe guards are currently open on this source.
    pub fn probe_depth(&self) -> usize {
        self.probe_depth
    }

    /// Checks whether the source is in probe mode.
    pub fn is_probing(&self) -> bool {
        self.probe_depth > 0
    }

    /// Enters probe mode, checkpointing the current position.
    ///
    /// The returned guard gives access to the source. Call
    /// [`ProbeGuard::commit`] to keep the position reached, or
    /// [`ProbeGuard::rollback`] to return to the checkpoint. Dropping the guard
    /// without either rolls back.
    pub fn begin_probe(&mut self) -> ProbeGuard<'_> {
        self.probe_depth += 1;
        let checkpoint = self.position;
        trace!(checkpoint, depth = self.probe_depth, "Entered probe mode");

        ProbeGuard {
            file: self,
            checkpoint,
            finished: false,
        }
    }

    /// Reads until `buf` is full or the source is exhausted.
    ///
    /// Returns the number of bytes read; a short count means end of file.
    ///
    /// # Errors
    ///
    /// - `io::Error` - Underlying read failed
    pub fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// Reads exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// - `io::ErrorKind::UnexpectedEof` - Fewer than `len` bytes remain
    /// - `io::Error` - Underlying read failed
    pub fn read_bytes(&mut self, len: usize) -> io::Result<Bytes> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Reads up to `len` bytes without consuming them.
    ///
    /// Returns fewer bytes when the source ends first.
    ///
    /// # Errors
    ///
    /// - `io::Error` - Underlying read or seek failed
    pub fn peek(&mut self, len: usize) -> io::Result<Bytes> {
        let start = self.position;
        let mut buf = vec![0u8; len];
        let read = self.fill(&mut buf);
        self.seek_to(start)?;
        buf.truncate(read?);
        Ok(Bytes::from(buf))
    }

    /// Advances the position by `count` bytes without reading them.
    ///
    /// # Errors
    ///
    /// - `io::ErrorKind::UnexpectedEof` - Skip would pass the end of a source of known size
    /// - `io::Error` - Underlying seek failed
    pub fn skip(&mut self, count: u64) -> io::Result<()> {
        let target = self.position.checked_add(count).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "skip overflows position")
        })?;

        if let Some(size) = self.size {
            if target > size {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("skip to {target} passes end of source at {size}"),
                ));
            }
        }

        // Relative seeks keep a BufReader's buffer when the target is inside it
        match i64::try_from(count) {
            Ok(offset) => {
                self.inner.seek_relative(offset)?;
                self.position = target;
                Ok(())
            }
            Err(_) => self.seek_to(target),
        }
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// - `io::Error` - Read failed or source exhausted
    pub fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads a little-endian `u16`.
    ///
    /// # Errors
    ///
    /// - `io::Error` - Read failed or source exhausted
    pub fn read_u16_le(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// - `io::Error` - Read failed or source exhausted
    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads a big-endian `u16`.
    ///
    /// # Errors
    ///
    /// - `io::Error` - Read failed or source exhausted
    pub fn read_u16_be(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Reads a big-endian `u32`.
    ///
    /// # Errors
    ///
    /// - `io::Error` - Read failed or source exhausted
    pub fn read_u32_be(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Reads a four character code.
    ///
    /// # Errors
    ///
    /// - `io::Error` - Read failed or source exhausted
    pub fn read_fourcc(&mut self) -> io::Result<[u8; 4]> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads a four character code, returning `None` at a clean end of file.
    ///
    /// # Errors
    ///
    /// - `io::ErrorKind::UnexpectedEof` - Source ends partway through the code
    /// - `io::Error` - Underlying read failed
    pub fn try_read_fourcc(&mut self) -> io::Result<Option<[u8; 4]>> {
        let mut buf = [0u8; 4];
        match self.fill(&mut buf)? {
            0 => Ok(None),
            4 => Ok(Some(buf)),
            n => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("source ended after {n} bytes of a four character code"),
            )),
        }
    }

    /// Releases the underlying reader.
    pub fn into_inner(self) -> Box<dyn ReadSeek> {
        self.inner
    }

    /// Moves back to a position recorded earlier, outside any probe.
    pub(crate) fn rewind_to(&mut self, position: u64) -> io::Result<()> {
        self.seek_to(position)
    }

    fn seek_to(&mut self, position: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }
}

impl Read for MediaFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("size", &self.size)
            .field("probe_depth", &self.probe_depth)
            .finish_non_exhaustive()
    }
}

/// Open probe on a [`MediaFile`].
///
/// Dereferences to the source so format code reads through it directly.
/// Guards nest: a probe inside a probe restores its own checkpoint only.
pub struct ProbeGuard<'a> {
    file: &'a mut MediaFile,
    checkpoint: u64,
    finished: bool,
}

impl ProbeGuard<'_> {
    /// Returns the position at which the probe began.
    pub fn checkpoint(&self) -> u64 {
        self.checkpoint
    }

    /// Returns how far the probe has read past its checkpoint.
    pub fn consumed(&self) -> u64 {
        self.file.position.saturating_sub(self.checkpoint)
    }

    /// Leaves probe mode, keeping the current position.
    pub fn commit(mut self) {
        self.finish();
        trace!(
            checkpoint = self.checkpoint,
            position = self.file.position,
            "Committed probe"
        );
    }

    /// Leaves probe mode, restoring the checkpointed position.
    ///
    /// # Errors
    ///
    /// - `io::Error` - Seeking back to the checkpoint failed
    pub fn rollback(mut self) -> io::Result<()> {
        self.finish();
        trace!(
            checkpoint = self.checkpoint,
            position = self.file.position,
            "Rolling back probe"
        );
        self.file.seek_to(self.checkpoint)
    }

    fn finish(&mut self) {
        self.finished = true;
        self.file.probe_depth -= 1;
    }
}

impl Deref for ProbeGuard<'_> {
    type Target = MediaFile;

    fn deref(&self) -> &MediaFile {
        self.file
    }
}

impl DerefMut for ProbeGuard<'_> {
    fn deref_mut(&mut self) -> &mut MediaFile {
        self.file
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finish();
        if let Err(e) = self.file.seek_to(self.checkpoint) {
            error!(
                checkpoint = self.checkpoint,
                "Failed to restore source after abandoned probe: {e}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::NamedTempFile;

    use super::*;

    fn sample_file() -> MediaFile {
        MediaFile::from_bytes((0u8..32).collect::<Vec<_>>())
    }

    #[test]
    fn test_commit_keeps_position() {
        let mut file = sample_file();
        {
            let mut probe = file.begin_probe();
            assert!(probe.is_probing());
            probe.skip(10).unwrap();
            assert_eq!(probe.consumed(), 10);
            probe.commit();
        }
        assert_eq!(file.position(), 10);
        assert!(!file.is_probing());
        assert_eq!(file.read_u8().unwrap(), 10);
    }

    #[test]
    fn test_rollback_restores_position() {
        let mut file = sample_file();
        file.skip(4).unwrap();

        let mut probe = file.begin_probe();
        assert_eq!(probe.checkpoint(), 4);
        probe.read_bytes(12).unwrap();
        probe.rollback().unwrap();

        assert_eq!(file.position(), 4);
        assert_eq!(file.probe_depth(), 0);
        assert_eq!(file.read_u8().unwrap(), 4);
    }

    #[test]
    fn test_drop_without_commit_rolls_back() {
        let mut file = sample_file();
        {
            let mut probe = file.begin_probe();
            probe.read_u32_le().unwrap();
        }
        assert_eq!(file.position(), 0);
        assert!(!file.is_probing());
    }

    #[test]
    fn test_nested_probes_restore_their_own_checkpoint() {
        let mut file = sample_file();
        let mut outer = file.begin_probe();
        outer.skip(2).unwrap();
        {
            let mut inner = outer.begin_probe();
            assert_eq!(inner.probe_depth(), 2);
            inner.skip(8).unwrap();
            inner.rollback().unwrap();
        }
        assert_eq!(outer.position(), 2);
        assert_eq!(outer.probe_depth(), 1);
        outer.rollback().unwrap();
        assert_eq!(file.position(), 0);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut file = sample_file();
        file.skip(30).unwrap();

        let peeked = file.peek(8).unwrap();
        assert_eq!(peeked.as_ref(), &[30, 31]);
        assert_eq!(file.position(), 30);
    }

    #[test]
    fn test_skip_past_end_is_unexpected_eof() {
        let mut file = sample_file();
        let error = file.skip(33).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(file.position(), 0);
    }

    #[test]
    fn test_try_read_fourcc_distinguishes_clean_eof() {
        let mut file = MediaFile::from_bytes(&b"abcdef"[..]);
        assert_eq!(file.try_read_fourcc().unwrap(), Some(*b"abcd"));

        let error = file.try_read_fourcc().unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);

        let mut empty = MediaFile::from_bytes(Vec::new());
        assert_eq!(empty.try_read_fourcc().unwrap(), None);
    }

    #[test]
    fn test_mixed_endian_readers() {
        let mut file = MediaFile::from_bytes(vec![0x12u8, 0x34, 0x12, 0x34, 0, 0, 0, 1]);
        assert_eq!(file.read_u16_be().unwrap(), 0x1234);
        assert_eq!(file.read_u16_le().unwrap(), 0x3412);
        assert_eq!(file.read_u32_be().unwrap(), 1);
    }

    #[test]
    fn test_read_past_end_is_unexpected_eof() {
        let mut file = MediaFile::from_bytes(vec![1u8, 2]);
        let error = file.read_u32_le().unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_open_file_on_disk() {
        let mut temp = NamedTempFile::with_suffix(".wav").unwrap();
        std::io::Write::write_all(&mut temp, b"RIFF0000").unwrap();

        let mut file = MediaFile::open(temp.path()).unwrap();
        assert_eq!(file.size(), Some(8));
        assert_eq!(file.extension().as_deref(), Some("wav"));
        assert_eq!(&file.read_fourcc().unwrap(), b"RIFF");
        assert_eq!(file.remaining(), Some(4));
    }

    #[test]
    fn test_from_reader_starts_at_current_position() {
        let mut cursor = Cursor::new(vec![9u8; 16]);
        cursor.seek(SeekFrom::Start(6)).unwrap();

        let file = MediaFile::from_reader(cursor).unwrap();
        assert_eq!(file.position(), 6);
        assert_eq!(file.size(), Some(16));
        assert_eq!(file.remaining(), Some(10));
    }

    /// Reader that counts absolute seeks.
    struct SeekCounter {
        inner: Cursor<Vec<u8>>,
        absolute_seeks: Arc<AtomicUsize>,
    }

    impl Read for SeekCounter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for SeekCounter {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            if matches!(pos, SeekFrom::Start(_)) {
                self.absolute_seeks.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_skip_seeks_relative() {
        let absolute_seeks = Arc::new(AtomicUsize::new(0));
        let mut file = MediaFile::from_reader(SeekCounter {
            inner: Cursor::new((0u8..32).collect()),
            absolute_seeks: Arc::clone(&absolute_seeks),
        })
        .unwrap();
        let after_open = absolute_seeks.load(Ordering::SeqCst);

        file.skip(3).unwrap();
        file.skip(1).unwrap();
        assert_eq!(file.position(), 4);
        assert_eq!(file.read_u8().unwrap(), 4);
        assert_eq!(absolute_seeks.load(Ordering::SeqCst), after_open);

        // Rollback still returns to the exact checkpoint
        let mut probe = file.begin_probe();
        probe.skip(2).unwrap();
        probe.rollback().unwrap();
        assert_eq!(absolute_seeks.load(Ordering::SeqCst), after_open + 1);
        assert_eq!(file.read_u8().unwrap(), 5);
    }
}
