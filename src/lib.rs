//! Kaon is a tiny single-directory file system that persists its whole image
//! into one host container file. Files are flat byte sequences chained
//! through a FAT-style next-block table; only the root directory exists.
//!
//! Kaon's linear image layout (block-aligned, in order):
//! - Superblock (1 block)
//! - Free-block map (128 blocks, one byte per data block, 1 = free)
//! - Chain table (512 blocks, one i32 next-pointer per data block)
//! - Root directory (64 blocks, one entry per block)
//! - Data region (65536 blocks)
//!
//! Kaon's layers (from bottom to top):
//! 1. Block device: 512-byte block I/O by absolute index.     | User implemented (`ContainerFile` provided)
//! 2. Region codecs: superblock, free map, chain table, root. | Fs implemented
//! 3. Allocator: chain growth/shrinkage over map + table.     | Fs implemented
//! 4. File: byte-granular reads and writes across a chain.    | Fs implemented
//! 5. Engine façade: the upcall surface the adaptor drives.   | Fs implemented (`OnDiskFs`, `MemFs`)
//!
//! The engine is single-threaded and cooperative: the adaptor serialises
//! upcalls, nothing suspends mid-operation, and every error comes back as a
//! tagged variant convertible to a negative errno.

mod allocator;
mod bitmap;
mod block_dev;
mod config;
mod container;
mod directory;
mod error;
mod fat;
mod file;
mod fs;
mod memfs;
mod ops;
mod path;
mod structs;
mod superblock;

pub use block_dev::BlockDevice;
pub use config::*;
pub use container::ContainerFile;
pub use error::FsError;
pub use error::Result;
pub use fs::OnDiskFs;
pub use memfs::MemFs;
pub use ops::{FsOperations, Handle};
pub use structs::{DiskEntry, FileStat, SuperBlock, S_IFDIR, S_IFREG};
pub use superblock::{read_superblock, write_superblock};
