//! The upcall-shaped surface the kernel adaptor drives. Both engine
//! variants implement it; the adaptor converts `FsError` to negative errno
//! codes via `FsError::errno`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::structs::FileStat;
use crate::Result;

/// File-handle type: identical to the root slot index in both variants.
pub type Handle = usize;

pub trait FsOperations {
    /// Metadata of `/` or of a stored file.
    fn getattr(&self, path: &str) -> Result<FileStat>;

    /// Creates an empty file.
    fn mknod(&mut self, path: &str, mode: u32) -> Result<()>;

    /// Removes a file and releases its data.
    fn unlink(&mut self, path: &str) -> Result<()>;

    /// Moves a file to a new path. The new path must be unused.
    fn rename(&mut self, path: &str, newpath: &str) -> Result<()>;

    fn chmod(&mut self, path: &str, mode: u32) -> Result<()>;

    fn chown(&mut self, path: &str, uid: u32, gid: u32) -> Result<()>;

    /// Opens a file, returning its handle. A file can be open once.
    fn open(&mut self, path: &str) -> Result<Handle>;

    /// Reads into `buf` at `offset`; returns bytes copied (0 past the end).
    fn read(&mut self, path: &str, fh: Handle, buf: &mut [u8], offset: i64) -> Result<usize>;

    /// Writes `buf` at `offset`; returns bytes written.
    fn write(&mut self, path: &str, fh: Handle, buf: &[u8], offset: i64) -> Result<usize>;

    /// Closes an open handle.
    fn release(&mut self, path: &str, fh: Handle) -> Result<()>;

    /// Resizes a file located by path.
    fn truncate(&mut self, path: &str, new_size: i64) -> Result<()>;

    /// Resizes a file through an open handle.
    fn ftruncate(&mut self, path: &str, fh: Handle, new_size: i64) -> Result<()>;

    /// Lists `.`, `..` and every file name (no leading `/`). Only `/` has
    /// contents.
    fn readdir(&self, path: &str) -> Result<Vec<String>>;
}

/// Wall time as seconds since the epoch.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
