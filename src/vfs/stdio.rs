//! Persistent backing built on C stdio streams

use crate::infrastructure::lwlock::storage_use;
use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::interface::{ByteSource, FileBacking, SeekMode};
use libc::{self, c_int, c_void, off_t};
use std::ffi::CString;
use std::fmt;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;

fn last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn path_error(errno: i32, path: &Path, op: &str) -> VfsError {
    let path = path.display().to_string();
    match errno {
        libc::ENOENT | libc::ENOTDIR => VfsError::NotFound(path),
        libc::EACCES | libc::EPERM | libc::EROFS => VfsError::PermissionDenied(path),
        _ => VfsError::SystemError(errno, format!("{} failed for path '{}'", op, path)),
    }
}

fn c_path(path: &Path) -> VfsResult<CString> {
    Ok(CString::new(path.as_os_str().as_bytes())?)
}

/// Primary access of an open mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Append,
}

/// A validated stdio mode string (`r`, `w+`, `ab`, `r+b`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub access: Access,
    pub update: bool,
    pub binary: bool,
}

impl OpenMode {
    /// Parse a mode string, rejecting anything outside the conventional set
    pub fn parse(mode: &str) -> VfsResult<Self> {
        let invalid = || VfsError::InvalidMode(mode.to_string());
        let mut chars = mode.chars();
        let access = match chars.next() {
            Some('r') => Access::Read,
            Some('w') => Access::Write,
            Some('a') => Access::Append,
            _ => return Err(invalid()),
        };

        let mut update = false;
        let mut binary = false;
        for c in chars {
            match c {
                '+' if !update => update = true,
                'b' if !binary => binary = true,
                _ => return Err(invalid()),
            }
        }

        Ok(OpenMode { access, update, binary })
    }

    pub fn readable(&self) -> bool {
        self.access == Access::Read || self.update
    }

    pub fn writable(&self) -> bool {
        self.access != Access::Read || self.update
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let access = match self.access {
            Access::Read => "r",
            Access::Write => "w",
            Access::Append => "a",
        };
        write!(
            f,
            "{}{}{}",
            access,
            if self.update { "+" } else { "" },
            if self.binary { "b" } else { "" }
        )
    }
}

/// Exclusively owned stdio stream
pub struct StdioStream {
    fp: *mut libc::FILE,
    mode: OpenMode,
    flush_on_write: bool,
    errno: i32,
}

// SAFETY: the stream is owned by exactly one `StdioStream` and every access
// goes through the process-wide storage guard. `StdioStream` is not `Sync`.
unsafe impl Send for StdioStream {}

impl StdioStream {
    /// Open `path` with the stdio `mode` string
    pub fn open(path: &Path, mode: &str, flush_on_write: bool) -> VfsResult<Self> {
        let mode = OpenMode::parse(mode)?;
        let c_path = c_path(path)?;
        let c_mode = CString::new(mode.to_string())?;

        let _guard = storage_use();
        let fp = unsafe { libc::fopen(c_path.as_ptr(), c_mode.as_ptr()) };
        if fp.is_null() {
            let errno = last_errno();
            log::debug!("fopen({}, {}) failed: errno {}", path.display(), mode, errno);
            return Err(path_error(errno, path, "open"));
        }

        log::debug!("opened {} with mode {}", path.display(), mode);
        Ok(StdioStream {
            fp,
            mode,
            flush_on_write,
            errno: 0,
        })
    }

    /// Whether the stream's error indicator is set
    pub fn has_error(&self) -> bool {
        let _guard = storage_use();
        unsafe { libc::ferror(self.fp) != 0 }
    }

    /// Write `buf` and force it out regardless of the flush policy
    pub fn write_durable(&mut self, buf: &[u8]) -> usize {
        let _guard = storage_use();
        let written = self.write_raw(buf);
        if let Err(err) = self.flush_raw() {
            log::error!("{}", err);
        }
        written
    }

    /// Flush and release the stream, reporting any stdio failure
    pub fn close(mut self) -> VfsResult<()> {
        self.release()
    }

    fn release(&mut self) -> VfsResult<()> {
        if self.fp.is_null() {
            return Ok(());
        }
        let _guard = storage_use();
        let result = unsafe { libc::fclose(self.fp) };
        self.fp = ptr::null_mut();
        if result != 0 {
            let errno = last_errno();
            return Err(VfsError::SystemError(errno, "fclose failed".to_string()));
        }
        Ok(())
    }

    fn write_raw(&mut self, buf: &[u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        if !self.mode.writable() {
            log::error!("write on stream opened with mode {}", self.mode);
        }
        let written = unsafe { libc::fwrite(buf.as_ptr() as *const c_void, 1, buf.len(), self.fp) };
        if written < buf.len() {
            self.errno = last_errno();
            log::error!("short write: {} of {} bytes (errno {})", written, buf.len(), self.errno);
        }
        written
    }

    fn flush_raw(&mut self) -> VfsResult<()> {
        if unsafe { libc::fflush(self.fp) } != 0 {
            self.errno = last_errno();
            return Err(VfsError::SystemError(self.errno, "fflush failed".to_string()));
        }
        Ok(())
    }
}

impl FileBacking for StdioStream {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        if !self.mode.readable() {
            log::error!("read on stream opened with mode {}", self.mode);
        }
        let _guard = storage_use();
        let count = unsafe { libc::fread(buf.as_mut_ptr() as *mut c_void, 1, buf.len(), self.fp) };
        if count < buf.len() && unsafe { libc::ferror(self.fp) } != 0 {
            self.errno = last_errno();
            log::error!("read error after {} bytes (errno {})", count, self.errno);
        }
        count
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        let _guard = storage_use();
        let written = self.write_raw(buf);
        if self.flush_on_write {
            if let Err(err) = self.flush_raw() {
                log::error!("{}", err);
            }
        }
        written
    }

    fn try_seek(&mut self, offset: i64, mode: SeekMode) -> VfsResult<u64> {
        let _guard = storage_use();
        if unsafe { libc::fseeko(self.fp, offset as off_t, mode.whence()) } != 0 {
            let errno = last_errno();
            return Err(VfsError::SystemError(errno, format!("fseek({}, {:?}) failed", offset, mode)));
        }
        let pos = unsafe { libc::ftello(self.fp) };
        if pos < 0 {
            return Err(VfsError::SystemError(last_errno(), "ftell failed".to_string()));
        }
        Ok(pos as u64)
    }

    fn seek(&mut self, offset: i64, mode: SeekMode) -> bool {
        let _guard = storage_use();
        unsafe { libc::fseeko(self.fp, offset as off_t, mode.whence()) == 0 }
    }

    fn tell(&self) -> u64 {
        let _guard = storage_use();
        let pos = unsafe { libc::ftello(self.fp) };
        if pos < 0 {
            log::error!("ftell failed: errno {}", last_errno());
            return u64::MAX;
        }
        pos as u64
    }

    fn is_eof(&self) -> bool {
        let _guard = storage_use();
        unsafe { libc::feof(self.fp) != 0 }
    }

    fn try_flush(&mut self) -> VfsResult<()> {
        let _guard = storage_use();
        self.flush_raw()
    }

    fn stream_error(&self) -> Option<VfsError> {
        if !self.has_error() {
            return None;
        }
        // errno 0 means stdio flagged the stream without a recorded cause
        let errno = if self.errno != 0 { self.errno } else { libc::EIO };
        Some(VfsError::IoError(io::Error::from_raw_os_error(errno)))
    }
}

impl ByteSource for StdioStream {
    fn next_byte(&mut self) -> Option<u8> {
        let _guard = storage_use();
        let c = unsafe { libc::fgetc(self.fp) };
        if c == libc::EOF { None } else { Some(c as u8) }
    }

    fn unread(&mut self, byte: u8) {
        let _guard = storage_use();
        unsafe {
            libc::ungetc(byte as c_int, self.fp);
        }
    }
}

impl Drop for StdioStream {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::error!("closing stream: {}", err);
        }
    }
}

impl fmt::Debug for StdioStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdioStream")
            .field("mode", &self.mode)
            .field("flush_on_write", &self.flush_on_write)
            .finish()
    }
}

/// Size in bytes of the file at `path`, without opening it
pub fn try_get_size(path: impl AsRef<Path>) -> VfsResult<u64> {
    let path = path.as_ref();
    let c_path = c_path(path)?;
    let mut stat: libc::stat = unsafe { std::mem::zeroed() };

    let _guard = storage_use();
    if unsafe { libc::stat(c_path.as_ptr(), &mut stat) } < 0 {
        return Err(path_error(last_errno(), path, "stat"));
    }
    if stat.st_mode & libc::S_IFMT != libc::S_IFREG {
        return Err(VfsError::InvalidArgument(format!(
            "not a regular file: {}",
            path.display()
        )));
    }
    Ok(stat.st_size as u64)
}

/// Size in bytes of the file at `path`, or -1 if it cannot be examined
pub fn get_size(path: impl AsRef<Path>) -> i64 {
    match try_get_size(path) {
        Ok(size) => size as i64,
        Err(err) => {
            log::debug!("get_size: {}", err);
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_mode_accepts_conventional_set() {
        for mode in ["r", "w", "a", "r+", "w+", "a+", "rb", "wb", "ab", "r+b", "rb+", "w+b", "ab+"] {
            assert!(OpenMode::parse(mode).is_ok(), "mode {:?}", mode);
        }
    }

    #[test]
    fn test_open_mode_rejects_unknown() {
        for mode in ["", "x", "rw", "r++", "rbb", "wx", "+r", "rt", " r"] {
            assert!(
                matches!(OpenMode::parse(mode), Err(VfsError::InvalidMode(_))),
                "mode {:?}",
                mode
            );
        }
    }

    #[test]
    fn test_open_mode_canonical_form() {
        assert_eq!(OpenMode::parse("rb+").unwrap().to_string(), "r+b");
        assert_eq!(OpenMode::parse("a").unwrap().to_string(), "a");

        let mode = OpenMode::parse("r").unwrap();
        assert!(mode.readable() && !mode.writable());
        let mode = OpenMode::parse("w+").unwrap();
        assert!(mode.readable() && mode.writable());
        let mode = OpenMode::parse("ab").unwrap();
        assert!(!mode.readable() && mode.writable() && mode.binary);
    }

    #[test]
    fn test_get_size_missing() {
        assert_eq!(get_size("missing.file"), -1);
        assert!(matches!(try_get_size("missing.file"), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_get_size_rejects_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(get_size(dir.path()), -1);
        assert!(matches!(try_get_size(dir.path()), Err(VfsError::InvalidArgument(_))));
    }

    #[test]
    fn test_get_size_interior_nul() {
        assert!(matches!(try_get_size("bad\0path"), Err(VfsError::InvalidArgument(_))));
    }
}
