use crate::config::*;

pub const S_IFDIR: u32 = 0o040000;
pub const S_IFREG: u32 = 0o100000;

/// Image header, one block, zero-padded.
///
/// Region starts are recorded redundantly with the compile-time layout; the
/// codec rejects an image whose recorded starts disagree.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SuperBlock {
    /// Blocks occupied by the metadata regions (equals the data start).
    pub info_blocks: u64,
    /// Data-region payload capacity in bytes.
    pub data_bytes: u64,
    pub superblock_start: u64,
    pub dmap_start: u64,
    pub fat_start: u64,
    pub root_start: u64,
    pub data_start: u64,
    /// Live count of free data blocks. Mirrors the number of 1-bytes in the
    /// free map at all times.
    pub free_blocks: u64,
}

impl SuperBlock {
    pub fn new() -> Self {
        SuperBlock {
            info_blocks: DATA_START as u64,
            data_bytes: (NUM_DATA_BLOCKS * BLOCK_SIZE) as u64,
            superblock_start: SUPERBLOCK_START as u64,
            dmap_start: DMAP_START as u64,
            fat_start: FAT_START as u64,
            root_start: ROOT_START as u64,
            data_start: DATA_START as u64,
            free_blocks: NUM_DATA_BLOCKS as u64,
        }
    }

    /// True when the recorded layout matches this build's layout.
    pub fn layout_matches(&self) -> bool {
        self.info_blocks == DATA_START as u64
            && self.data_bytes == (NUM_DATA_BLOCKS * BLOCK_SIZE) as u64
            && self.superblock_start == SUPERBLOCK_START as u64
            && self.dmap_start == DMAP_START as u64
            && self.fat_start == FAT_START as u64
            && self.root_start == ROOT_START as u64
            && self.data_start == DATA_START as u64
    }
}

impl Default for SuperBlock {
    fn default() -> Self {
        Self::new()
    }
}

/// One root-directory slot, serialised one-per-block.
///
/// A slot is empty iff `path[0] != b'/'`. The path is stored NUL-terminated
/// with the leading `/` included.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct DiskEntry {
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    /// First data block of the chain, or `NULL_BLOCK` for an empty file.
    pub chain_head: i32,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    pub path: [u8; PATH_CAP],
}

impl DiskEntry {
    pub const EMPTY: Self = DiskEntry {
        size: 0,
        atime: 0,
        mtime: 0,
        ctime: 0,
        chain_head: NULL_BLOCK,
        uid: 0,
        gid: 0,
        mode: 0,
        path: [0; PATH_CAP],
    };

    pub fn is_empty(&self) -> bool {
        self.path[0] != b'/'
    }

    /// Stored path up to the NUL terminator.
    pub fn path_bytes(&self) -> &[u8] {
        let end = self.path.iter().position(|&b| b == 0).unwrap_or(PATH_CAP);
        &self.path[..end]
    }

    /// Caller must have validated length and content (see `path::validate`).
    pub fn set_path(&mut self, path: &str) {
        self.path = [0; PATH_CAP];
        self.path[..path.len()].copy_from_slice(path.as_bytes());
    }

    pub fn clear(&mut self) {
        *self = DiskEntry::EMPTY;
    }

    /// Chain length implied by the byte size.
    pub fn blocks(&self) -> usize {
        (self.size as usize).div_ceil(BLOCK_SIZE)
    }
}

impl core::fmt::Debug for DiskEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DiskEntry")
            .field("path", &String::from_utf8_lossy(self.path_bytes()))
            .field("size", &self.size)
            .field("chain_head", &self.chain_head)
            .field("mode", &format_args!("{:o}", self.mode))
            .field("uid", &self.uid)
            .field("gid", &self.gid)
            .finish()
    }
}

/// Metadata record returned by `getattr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}
