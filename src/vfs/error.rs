//! VFS error definitions

use std::error::Error;
use std::fmt;
use std::io;

/// VFS error types
#[derive(Debug)]
pub enum VfsError {
    /// Permission denied while opening a path
    PermissionDenied(String),
    /// File or directory not found
    NotFound(String),
    /// Mode string outside the accepted `r`/`w`/`a` family
    InvalidMode(String),
    /// Invalid argument error
    InvalidArgument(String),
    /// Seek target outside `[0, length]` of a memory backing
    OutOfRange { target: i64, length: u64 },
    /// Operation the backing does not implement (writes on memory)
    Unsupported(&'static str),
    /// I/O error
    IoError(io::Error),
    /// System call error with error code
    SystemError(i32, String),
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::PermissionDenied(path) => write!(f, "Permission denied: {}", path),
            VfsError::NotFound(path) => write!(f, "File or directory not found: {}", path),
            VfsError::InvalidMode(mode) => write!(f, "Invalid open mode: {:?}", mode),
            VfsError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            VfsError::OutOfRange { target, length } => {
                write!(f, "Position {} out of range [0, {}]", target, length)
            }
            VfsError::Unsupported(op) => write!(f, "Unsupported on memory backing: {}", op),
            VfsError::IoError(err) => write!(f, "I/O error: {}", err),
            VfsError::SystemError(errno, msg) => {
                write!(f, "System error (errno {}): {}", errno, msg)
            }
        }
    }
}

impl Error for VfsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            VfsError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for VfsError {
    fn from(err: io::Error) -> Self {
        VfsError::IoError(err)
    }
}

impl From<std::ffi::NulError> for VfsError {
    fn from(err: std::ffi::NulError) -> Self {
        VfsError::InvalidArgument(err.to_string())
    }
}

impl From<VfsError> for io::Error {
    fn from(err: VfsError) -> Self {
        if let VfsError::SystemError(errno, _) = err {
            return io::Error::from_raw_os_error(errno);
        }
        let kind = match &err {
            VfsError::IoError(inner) => inner.kind(),
            VfsError::PermissionDenied(_) => io::ErrorKind::PermissionDenied,
            VfsError::NotFound(_) => io::ErrorKind::NotFound,
            VfsError::InvalidMode(_) | VfsError::InvalidArgument(_) | VfsError::OutOfRange { .. } => {
                io::ErrorKind::InvalidInput
            }
            VfsError::Unsupported(_) => io::ErrorKind::Unsupported,
            VfsError::SystemError(errno, _) => io::Error::from_raw_os_error(*errno).kind(),
        };
        io::Error::new(kind, err)
    }
}

/// Result type for VFS operations
pub type VfsResult<T> = Result<T, VfsError>;
