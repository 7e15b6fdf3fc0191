//! VFS (Virtual File System) module
//!
//! This module provides `VirtualFile`, one handle type over two backings: a
//! stdio stream on persistent storage and a read-only, caller-owned memory
//! region.

// Re-export error types and result type
pub mod error;
pub use error::{VfsError, VfsResult};

// Re-export interface traits
pub mod interface;
pub use interface::{ByteSource, FileBacking, SeekMode};

// Backings
pub mod memory;
pub mod stdio;
pub use memory::MemoryCursor;
pub use stdio::{get_size, try_get_size, OpenMode, StdioStream};

pub mod scan;
pub use scan::ScanValue;

pub mod file;
pub use file::{BackingKind, VirtualFile};

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
