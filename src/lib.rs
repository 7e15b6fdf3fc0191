//! vfile: one file handle over persistent storage or borrowed memory

pub mod config;
pub mod infrastructure;
pub mod vfs;

// Re-export vfs items for easier access
pub use config::FileConfig;
pub use vfs::{get_size, SeekMode, VfsError, VfsResult, VirtualFile};
