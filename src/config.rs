//! Data-model constants and the five-region image layout.
//!
//! Everything here is a compile-time constant so that a mis-sized image can
//! never silently round-trip: the region starts are derived from the sizes,
//! and the superblock codec refuses images whose recorded starts disagree.

pub const BLOCK_SIZE: usize = 512;

/// Longest accepted path, including the leading `/`.
pub const NAME_LENGTH: usize = 255;
/// On-disk path buffer, NUL-terminated.
pub const PATH_CAP: usize = 256;

pub const NUM_DIR_ENTRIES: usize = 64;
pub const NUM_OPEN_FILES: usize = 64;
pub const NUM_DATA_BLOCKS: usize = 65_536;

/// Directory-entry sentinel: the file owns no chain.
pub const NULL_BLOCK: i32 = -124;
/// Chain-table sentinel: last block of a chain.
pub const CHAIN_END: i32 = -1;

pub const SUPERBLOCK_BLOCKS: usize = 1;
/// One byte per data block.
pub const DMAP_BLOCKS: usize = NUM_DATA_BLOCKS / BLOCK_SIZE;
/// One i32 next-pointer per data block.
pub const FAT_BLOCKS: usize = NUM_DATA_BLOCKS * 4 / BLOCK_SIZE;
/// One directory entry per block.
pub const ROOT_BLOCKS: usize = NUM_DIR_ENTRIES;

pub const SUPERBLOCK_START: usize = 0;
pub const DMAP_START: usize = SUPERBLOCK_START + SUPERBLOCK_BLOCKS;
pub const FAT_START: usize = DMAP_START + DMAP_BLOCKS;
pub const ROOT_START: usize = FAT_START + FAT_BLOCKS;
pub const DATA_START: usize = ROOT_START + ROOT_BLOCKS;

/// Size of the whole container image, in blocks.
pub const TOTAL_BLOCKS: usize = DATA_START + NUM_DATA_BLOCKS;

pub const FAT_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / core::mem::size_of::<i32>();

/// Absolute block index of data block `i` (0-based within the data region).
#[inline]
pub const fn data_block(i: usize) -> usize {
    DATA_START + i
}
