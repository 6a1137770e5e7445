//! Chain table: one signed 32-bit "next" index per data block, persisted as
//! a 512-block span. `FAT[i]` is the successor of data block `i`, or
//! `CHAIN_END` when `i` closes its chain. Free blocks keep `CHAIN_END` too,
//! so a freshly allocated tail needs no stamping.

use crate::bitmap::{check_index, Dmap};
use crate::config::*;
use crate::error::FsError;
use crate::{BlockDevice, Result, SuperBlock};

pub struct Fat {
    next: Box<[i32]>,
}

impl Fat {
    pub fn new_all_end() -> Self {
        Fat {
            next: vec![CHAIN_END; NUM_DATA_BLOCKS].into_boxed_slice(),
        }
    }

    pub fn load<D: BlockDevice>(device: &D) -> Result<Self> {
        let mut next = vec![CHAIN_END; NUM_DATA_BLOCKS].into_boxed_slice();
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        let raw = unsafe {
            core::slice::from_raw_parts_mut(next.as_mut_ptr() as *mut u8, NUM_DATA_BLOCKS * 4)
        };
        for i in 0..FAT_BLOCKS {
            device.read_block(FAT_START + i, buf.as_mut())?;
            raw[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE].copy_from_slice(buf.as_ref());
        }
        Ok(Fat { next })
    }

    pub fn store<D: BlockDevice>(&self, device: &D) -> Result<()> {
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        let raw = unsafe {
            core::slice::from_raw_parts(self.next.as_ptr() as *const u8, NUM_DATA_BLOCKS * 4)
        };
        for i in 0..FAT_BLOCKS {
            buf.copy_from_slice(&raw[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE]);
            device.write_block(FAT_START + i, buf.as_ref())?;
        }
        Ok(())
    }

    /// Successor of data block `i`, `CHAIN_END` when `i` is the last block.
    pub fn next(&self, i: i32) -> Result<i32> {
        Ok(self.next[check_index(i)?])
    }

    pub fn link(&mut self, i: i32, j: i32) -> Result<()> {
        check_index(j)?;
        self.next[check_index(i)?] = j;
        Ok(())
    }

    pub fn set_end(&mut self, i: i32) -> Result<()> {
        self.next[check_index(i)?] = CHAIN_END;
        Ok(())
    }

    /// Walks `hops` links from `head` and returns the block reached.
    /// A chain that runs out early is a corrupt image.
    pub fn walk(&self, head: i32, hops: usize) -> Result<i32> {
        let mut cur = head;
        check_index(cur)?;
        for _ in 0..hops {
            cur = self.next(cur)?;
            if cur == CHAIN_END {
                log::error!("chain ended prematurely while seeking hop {hops} from {head}");
                return Err(FsError::CorruptImage);
            }
        }
        Ok(cur)
    }

    /// Last block of the chain starting at `head`.
    pub fn tail_of(&self, head: i32) -> Result<i32> {
        let mut cur = head;
        check_index(cur)?;
        for _ in 0..NUM_DATA_BLOCKS {
            let next = self.next(cur)?;
            if next == CHAIN_END {
                return Ok(cur);
            }
            cur = next;
        }
        // More hops than data blocks exist: the chain loops.
        Err(FsError::CorruptImage)
    }

    /// Number of blocks in the chain starting at `head`.
    pub fn chain_len(&self, head: i32) -> Result<usize> {
        if head == NULL_BLOCK {
            return Ok(0);
        }
        let mut cur = head;
        check_index(cur)?;
        for len in 1..=NUM_DATA_BLOCKS {
            let next = self.next(cur)?;
            if next == CHAIN_END {
                return Ok(len);
            }
            cur = next;
        }
        Err(FsError::CorruptImage)
    }

    /// Releases the whole chain starting at `first`: every visited block gets
    /// its link reset to `CHAIN_END` and its map byte freed, with the counter
    /// bumped per block. Persistence is left to the caller's region
    /// write-back.
    pub fn unlink_from(
        &mut self,
        sb: &mut SuperBlock,
        dmap: &mut Dmap,
        first: i32,
    ) -> Result<()> {
        let mut cur = first;
        for _ in 0..NUM_DATA_BLOCKS {
            let i = check_index(cur)?;
            let next = self.next[i];
            self.next[i] = CHAIN_END;
            dmap.release(sb, cur)?;
            if next == CHAIN_END {
                return Ok(());
            }
            cur = next;
        }
        Err(FsError::CorruptImage)
    }
}
