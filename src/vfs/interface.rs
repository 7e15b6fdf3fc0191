//! VFS interface definitions

use crate::vfs::error::{VfsError, VfsResult};
use std::io::SeekFrom;

/// Reference point for a seek offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// Relative to the current position
    Current,
    /// Relative to the start of the file
    Start,
    /// Relative to the end of the file
    End,
}

impl SeekMode {
    /// The stdio `whence` value for this mode
    pub fn whence(self) -> libc::c_int {
        match self {
            SeekMode::Current => libc::SEEK_CUR,
            SeekMode::Start => libc::SEEK_SET,
            SeekMode::End => libc::SEEK_END,
        }
    }

    /// Split a `std::io::SeekFrom` into an offset and a mode
    pub fn split(pos: SeekFrom) -> VfsResult<(i64, SeekMode)> {
        match pos {
            SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset).map_err(|_| {
                    VfsError::InvalidArgument(format!("seek offset {} exceeds i64::MAX", offset))
                })?;
                Ok((offset, SeekMode::Start))
            }
            SeekFrom::Current(offset) => Ok((offset, SeekMode::Current)),
            SeekFrom::End(offset) => Ok((offset, SeekMode::End)),
        }
    }
}

/// Operations every backing of a `VirtualFile` provides.
///
/// None of these panic or return errors for short transfers; the outcome is
/// carried by the return value and the caller is expected to check it.
pub trait FileBacking {
    /// Read up to `buf.len()` bytes, returning how many were copied
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write `buf`, returning how many bytes were accepted
    fn write(&mut self, buf: &[u8]) -> usize;

    /// Move the position, returning the new absolute position
    fn try_seek(&mut self, offset: i64, mode: SeekMode) -> VfsResult<u64>;

    /// Move the position, reporting only success
    fn seek(&mut self, offset: i64, mode: SeekMode) -> bool {
        self.try_seek(offset, mode).is_ok()
    }

    /// Current position
    fn tell(&self) -> u64;

    /// End-of-file state
    fn is_eof(&self) -> bool;

    /// Push buffered output down to storage
    fn try_flush(&mut self) -> VfsResult<()>;

    /// Push buffered output down to storage, logging failures
    fn flush(&mut self) {
        if let Err(err) = self.try_flush() {
            log::error!("flush failed: {}", err);
        }
    }

    /// Error recorded by the underlying stream, if it is in an error state
    fn stream_error(&self) -> Option<VfsError> {
        None
    }
}

/// Byte-at-a-time input with one byte of push-back, as consumed by the scanner
pub trait ByteSource {
    /// Next input byte, `None` at end of input
    fn next_byte(&mut self) -> Option<u8>;

    /// Return the last byte read to the input
    fn unread(&mut self, byte: u8);
}
