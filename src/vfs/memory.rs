//! Read-only backing over a caller-owned byte slice

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::interface::{FileBacking, SeekMode};

/// Cursor over a borrowed buffer.
///
/// Invariant: `pos <= data.len()` after every operation. The buffer is never
/// written to; writes are rejected without touching either the data or the
/// cursor.
#[derive(Debug, Clone)]
pub struct MemoryCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MemoryCursor<'a> {
    /// Wrap `data` with the cursor at offset 0
    pub fn new(data: &'a [u8]) -> Self {
        MemoryCursor { data, pos: 0 }
    }

    /// Total length of the wrapped buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes between the cursor and the end of the buffer
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn target(&self, offset: i64, mode: SeekMode) -> Option<i64> {
        let base = match mode {
            SeekMode::Current => i64::try_from(self.pos).ok()?,
            SeekMode::Start => 0,
            SeekMode::End => i64::try_from(self.data.len()).ok()?,
        };
        base.checked_add(offset)
    }
}

impl FileBacking for MemoryCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let count = self.remaining().min(buf.len());
        buf[..count].copy_from_slice(&self.data[self.pos..self.pos + count]);
        self.pos += count;
        count
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        log::error!(
            "rejected write of {} bytes: memory backing is read-only",
            buf.len()
        );
        0
    }

    fn try_seek(&mut self, offset: i64, mode: SeekMode) -> VfsResult<u64> {
        let length = self.data.len() as u64;
        match self.target(offset, mode) {
            Some(target) if target >= 0 && target as u64 <= length => {
                self.pos = target as usize;
                Ok(target as u64)
            }
            Some(target) => Err(VfsError::OutOfRange { target, length }),
            None => Err(VfsError::OutOfRange {
                target: if offset < 0 { i64::MIN } else { i64::MAX },
                length,
            }),
        }
    }

    fn tell(&self) -> u64 {
        self.pos as u64
    }

    fn is_eof(&self) -> bool {
        self.pos == self.data.len()
    }

    fn try_flush(&mut self) -> VfsResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cursor_clamps_read() {
        let data = [1u8, 2, 3, 4];
        let mut cursor = MemoryCursor::new(&data);
        let mut buf = [0u8; 3];

        assert_eq!(cursor.read(&mut buf), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(cursor.remaining(), 1);

        assert_eq!(cursor.read(&mut buf), 1);
        assert_eq!(buf[0], 4);
        assert_eq!(cursor.read(&mut buf), 0);
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_memory_cursor_seek_bounds() {
        let data = [0u8; 10];
        let mut cursor = MemoryCursor::new(&data);

        assert_eq!(cursor.try_seek(10, SeekMode::Start).unwrap(), 10);
        assert!(cursor.is_eof());
        assert_eq!(cursor.try_seek(-4, SeekMode::Current).unwrap(), 6);
        assert_eq!(cursor.try_seek(-10, SeekMode::End).unwrap(), 0);

        assert!(matches!(
            cursor.try_seek(-1, SeekMode::Start),
            Err(VfsError::OutOfRange { target: -1, length: 10 })
        ));
        assert!(matches!(
            cursor.try_seek(1, SeekMode::End),
            Err(VfsError::OutOfRange { target: 11, length: 10 })
        ));
        assert_eq!(cursor.tell(), 0);
    }

    #[test]
    fn test_memory_cursor_seek_overflow() {
        let data = [0u8; 4];
        let mut cursor = MemoryCursor::new(&data);
        cursor.try_seek(2, SeekMode::Start).unwrap();

        assert!(!cursor.seek(i64::MAX, SeekMode::Current));
        assert!(!cursor.seek(i64::MIN, SeekMode::End));
        assert_eq!(cursor.tell(), 2);
    }

    #[test]
    fn test_empty_memory_cursor() {
        let mut cursor = MemoryCursor::new(&[]);
        assert!(cursor.is_empty());
        assert!(cursor.is_eof());
        assert!(cursor.seek(0, SeekMode::End));
        assert!(!cursor.seek(1, SeekMode::Start));
    }
}
