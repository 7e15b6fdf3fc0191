//! The virtual file handle
//!
//! A `VirtualFile` is either backed by a stdio stream on persistent storage or
//! by a read-only slice owned by the caller. Both are driven through the same
//! calls; the backing decides what each call means:
//!
//! * reads on memory are clipped to the buffer and never fail,
//! * writes and formatted I/O on memory are rejected with a logged error,
//! * memory seeks outside `[0, len]` fail and leave the cursor unchanged,
//! * persistent seeks, positions and EOF are whatever stdio reports.

use crate::config::FileConfig;
use crate::infrastructure::lwlock::storage_use;
use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::interface::{FileBacking, SeekMode};
use crate::vfs::memory::MemoryCursor;
use crate::vfs::scan::{self, ScanValue};
use crate::vfs::stdio::StdioStream;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Which storage a `VirtualFile` delegates to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingKind {
    Persistent,
    Memory,
}

#[derive(Debug)]
enum Backing<'a> {
    Persistent(StdioStream),
    Memory(MemoryCursor<'a>),
}

/// A file served either from persistent storage or from borrowed memory
#[derive(Debug)]
pub struct VirtualFile<'a> {
    backing: Backing<'a>,
    warn_on_zero_read: bool,
}

impl VirtualFile<'static> {
    /// Open `path` with a stdio mode string (`r`, `w`, `a`, `r+`, `w+`, `a+`,
    /// each optionally with `b`)
    pub fn open(path: impl AsRef<Path>, mode: &str) -> VfsResult<Self> {
        Self::open_with_config(path, mode, &FileConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, mode: &str, config: &FileConfig) -> VfsResult<Self> {
        let stream = StdioStream::open(path.as_ref(), mode, config.flush_on_write)?;
        Ok(VirtualFile {
            backing: Backing::Persistent(stream),
            warn_on_zero_read: config.warn_on_zero_read,
        })
    }
}

impl<'a> VirtualFile<'a> {
    /// Wrap a caller-owned buffer. The buffer is only ever read.
    pub fn open_from_memory(data: &'a [u8]) -> Self {
        Self::open_from_memory_with_config(data, &FileConfig::default())
    }

    pub fn open_from_memory_with_config(data: &'a [u8], config: &FileConfig) -> Self {
        VirtualFile {
            backing: Backing::Memory(MemoryCursor::new(data)),
            warn_on_zero_read: config.warn_on_zero_read,
        }
    }

    pub fn kind(&self) -> BackingKind {
        match self.backing {
            Backing::Persistent(_) => BackingKind::Persistent,
            Backing::Memory(_) => BackingKind::Memory,
        }
    }

    pub fn is_memory(&self) -> bool {
        self.kind() == BackingKind::Memory
    }

    fn inner(&self) -> &dyn FileBacking {
        match &self.backing {
            Backing::Persistent(stream) => stream,
            Backing::Memory(cursor) => cursor,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FileBacking {
        match &mut self.backing {
            Backing::Persistent(stream) => stream,
            Backing::Memory(cursor) => cursor,
        }
    }

    /// Release the file. For persistent backing the stream is flushed and
    /// closed; the memory backing leaves the wrapped buffer untouched.
    pub fn close(self) -> VfsResult<()> {
        match self.backing {
            Backing::Persistent(stream) => {
                log::debug!("closing persistent file");
                stream.close()
            }
            Backing::Memory(_) => Ok(()),
        }
    }

    /// Read up to `dest.len()` bytes. A short or zero count means the end was
    /// reached (or a stream error occurred); check `is_eof` to tell them apart.
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        if cfg!(debug_assertions) && self.warn_on_zero_read && dest.is_empty() {
            log::warn!("file read size = 0");
        }
        self.inner_mut().read(dest)
    }

    /// Write `src`, returning the number of bytes accepted. Always 0 for
    /// memory backing.
    pub fn write(&mut self, src: &[u8]) -> usize {
        self.inner_mut().write(src)
    }

    /// Move the position. On failure the position of a memory backing is
    /// unchanged.
    pub fn seek(&mut self, offset: i64, mode: SeekMode) -> bool {
        self.inner_mut().seek(offset, mode)
    }

    /// Current position, `u64::MAX` if the stream cannot report one
    pub fn tell(&self) -> u64 {
        self.inner().tell()
    }

    /// On persistent backing this only becomes true after a read has hit the
    /// end of the stream.
    pub fn is_eof(&self) -> bool {
        self.inner().is_eof()
    }

    pub fn flush(&mut self) {
        self.inner_mut().flush()
    }

    /// Render `args` into the stream and flush. Returns the number of bytes
    /// written, -1 if formatting failed, 0 on memory backing.
    pub fn formatted_write(&mut self, args: fmt::Arguments<'_>) -> i64 {
        let stream = match &mut self.backing {
            Backing::Persistent(stream) => stream,
            Backing::Memory(_) => {
                log::error!("formatted write is not supported on memory backing");
                return 0;
            }
        };

        let mut rendered = String::new();
        if fmt::write(&mut rendered, args).is_err() {
            log::error!("formatted write: formatting failed");
            return -1;
        }
        stream.write_durable(rendered.as_bytes()) as i64
    }

    /// Parse fields from the stream per `format` (scanf directives), appending
    /// them to `out`. Returns the number of fields assigned, -1 if input ended
    /// before the first conversion, 0 on memory backing.
    pub fn formatted_read(&mut self, format: &str, out: &mut Vec<ScanValue>) -> i64 {
        match &mut self.backing {
            Backing::Persistent(stream) => {
                let _guard = storage_use();
                scan::scan(stream, format, out)
            }
            Backing::Memory(_) => {
                log::error!("formatted read is not supported on memory backing");
                0
            }
        }
    }

    fn reject_on_memory(&self, op: &'static str) -> VfsResult<()> {
        if self.is_memory() {
            return Err(VfsError::Unsupported(op));
        }
        Ok(())
    }
}

/// `fprint!(file, "{} {}", a, b)` renders into a `VirtualFile` via
/// `formatted_write`
#[macro_export]
macro_rules! fprint {
    ($file:expr, $($arg:tt)*) => {
        $file.formatted_write(format_args!($($arg)*))
    };
}

impl Read for VirtualFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let inner = self.inner_mut();
        let count = inner.read(buf);
        if count < buf.len() {
            if let Some(err) = inner.stream_error() {
                return Err(err.into());
            }
        }
        Ok(count)
    }
}

impl Write for VirtualFile<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.reject_on_memory("write")?;
        let inner = self.inner_mut();
        let written = inner.write(buf);
        if written < buf.len() {
            if let Some(err) = inner.stream_error() {
                return Err(err.into());
            }
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.inner_mut().try_flush()?)
    }
}

impl Seek for VirtualFile<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, mode) = SeekMode::split(pos)?;
        Ok(self.inner_mut().try_seek(offset, mode)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_open_honours_config() {
        let data = [1u8, 2, 3];
        assert!(VirtualFile::open_from_memory(&data).warn_on_zero_read);

        let config = FileConfig {
            warn_on_zero_read: false,
            ..FileConfig::default()
        };
        let mut file = VirtualFile::open_from_memory_with_config(&data, &config);
        assert!(!file.warn_on_zero_read);
        assert_eq!(file.read(&mut []), 0);
        assert_eq!(file.tell(), 0);
    }
}
