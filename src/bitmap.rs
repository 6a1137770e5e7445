//! Free-block map of the data region: one byte per data block, 1 = free,
//! 0 = occupied, persisted as a 128-block span.

use crate::config::*;
use crate::error::FsError;
use crate::superblock::write_superblock;
use crate::{BlockDevice, Result, SuperBlock};

pub struct Dmap {
    bytes: Box<[u8]>,
    /// Lower bound on the smallest free index. No free byte exists below it,
    /// so a first-fit scan may resume here instead of at zero.
    hint: usize,
}

impl Dmap {
    pub fn new_all_free() -> Self {
        Dmap {
            bytes: vec![1u8; NUM_DATA_BLOCKS].into_boxed_slice(),
            hint: 0,
        }
    }

    pub fn load<D: BlockDevice>(device: &D) -> Result<Self> {
        let mut bytes = vec![0u8; NUM_DATA_BLOCKS].into_boxed_slice();
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        for i in 0..DMAP_BLOCKS {
            device.read_block(DMAP_START + i, buf.as_mut())?;
            bytes[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE].copy_from_slice(buf.as_ref());
        }
        if bytes.iter().any(|&b| b > 1) {
            return Err(FsError::CorruptImage);
        }
        Ok(Dmap { bytes, hint: 0 })
    }

    pub fn store<D: BlockDevice>(&self, device: &D) -> Result<()> {
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        for i in 0..DMAP_BLOCKS {
            buf.copy_from_slice(&self.bytes[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE]);
            device.write_block(DMAP_START + i, buf.as_ref())?;
        }
        Ok(())
    }

    /// Rewrites only the map block containing byte `index`.
    fn flush_containing_block<D: BlockDevice>(&self, device: &D, index: usize) -> Result<()> {
        let block = index / BLOCK_SIZE;
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        buf.copy_from_slice(&self.bytes[block * BLOCK_SIZE..(block + 1) * BLOCK_SIZE]);
        device.write_block(DMAP_START + block, buf.as_ref())
    }

    /// First-fit allocation: returns the lowest free index after marking it
    /// occupied, decrementing the superblock counter and persisting the
    /// touched map block plus the superblock.
    pub fn find_free<D: BlockDevice>(&mut self, device: &D, sb: &mut SuperBlock) -> Result<i32> {
        if sb.free_blocks == 0 {
            return Err(FsError::NoSpace);
        }
        for i in self.hint..NUM_DATA_BLOCKS {
            if self.bytes[i] == 1 {
                self.bytes[i] = 0;
                self.hint = i + 1;
                sb.free_blocks -= 1;
                self.flush_containing_block(device, i)?;
                write_superblock(device, sb)?;
                return Ok(i as i32);
            }
        }
        log::warn!("free counter is {} but the map has no free byte", sb.free_blocks);
        Err(FsError::NoSpace)
    }

    /// Marks `index` free again and bumps the counter. Persistence is left to
    /// the caller's region write-back.
    pub fn release(&mut self, sb: &mut SuperBlock, index: i32) -> Result<()> {
        let i = check_index(index)?;
        if self.bytes[i] == 1 {
            return Err(FsError::CorruptImage);
        }
        self.bytes[i] = 1;
        self.hint = self.hint.min(i);
        sb.free_blocks += 1;
        Ok(())
    }

    pub fn is_free(&self, index: i32) -> bool {
        check_index(index).map(|i| self.bytes[i] == 1).unwrap_or(false)
    }

    pub fn count_free(&self) -> u64 {
        self.bytes.iter().filter(|&&b| b == 1).count() as u64
    }
}

pub(crate) fn check_index(index: i32) -> Result<usize> {
    if index < 0 || index as usize >= NUM_DATA_BLOCKS {
        return Err(FsError::CorruptImage);
    }
    Ok(index as usize)
}
