//! Byte-granular transfer across a block chain.
//!
//! Both directions share the same pre-walk: a byte offset becomes a hop
//! count along the chain plus a first-byte offset inside the block reached,
//! and the loop then touches `ceil((len + off0) / BLOCK_SIZE)` blocks with
//! partial handling at either edge.

use crate::allocator::allocate_chain;
use crate::bitmap::Dmap;
use crate::config::*;
use crate::fat::Fat;
use crate::structs::DiskEntry;
use crate::{BlockDevice, Result, SuperBlock};

/// Reads up to `buf.len()` bytes starting at `offset`. Reads past the end
/// clamp; a read starting at or beyond the end returns 0.
pub fn read_at<D: BlockDevice>(
    device: &D,
    fat: &Fat,
    entry: &DiskEntry,
    offset: usize,
    buf: &mut [u8],
) -> Result<usize> {
    let size = entry.size as usize;
    if offset >= size || buf.is_empty() {
        return Ok(0);
    }
    let len = buf.len().min(size - offset);

    let mut off0 = offset % BLOCK_SIZE;
    let mut cur = fat.walk(entry.chain_head, offset / BLOCK_SIZE)?;
    let mut scratch = Box::new([0u8; BLOCK_SIZE]);
    let mut copied = 0;

    while copied < len {
        device.read_block(data_block(cur as usize), scratch.as_mut())?;
        let take = (len - copied).min(BLOCK_SIZE - off0);
        buf[copied..copied + take].copy_from_slice(&scratch[off0..off0 + take]);
        copied += take;
        off0 = 0;
        if copied < len {
            cur = fat.next(cur)?;
        }
    }

    Ok(len)
}

/// Writes `buf` at `offset`, growing the chain as needed. Returns the number
/// of bytes written (always `buf.len()` on success).
pub fn write_at<D: BlockDevice>(
    device: &D,
    sb: &mut SuperBlock,
    dmap: &mut Dmap,
    fat: &mut Fat,
    entry: &mut DiskEntry,
    offset: usize,
    buf: &[u8],
) -> Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    let len = buf.len();
    let old_size = entry.size as usize;

    let needed = (offset + len).div_ceil(BLOCK_SIZE);
    let have = old_size.div_ceil(BLOCK_SIZE);
    if needed > have {
        allocate_chain(device, sb, dmap, fat, entry, needed - have)?;
    }

    let mut off0 = offset % BLOCK_SIZE;
    let mut cur = fat.walk(entry.chain_head, offset / BLOCK_SIZE)?;
    let mut scratch = Box::new([0u8; BLOCK_SIZE]);
    let mut written = 0;

    while written < len {
        let abs = data_block(cur as usize);
        let remaining = len - written;

        if off0 > 0 {
            // Partial first block: read, splice, write back.
            device.read_block(abs, scratch.as_mut())?;
            let take = remaining.min(BLOCK_SIZE - off0);
            scratch[off0..off0 + take].copy_from_slice(&buf[written..written + take]);
            device.write_block(abs, scratch.as_ref())?;
            written += take;
            off0 = 0;
        } else if remaining < BLOCK_SIZE {
            // Partial last block. Preserve the tail bytes only when the
            // write lands inside the old extent.
            if offset + len < old_size {
                device.read_block(abs, scratch.as_mut())?;
            } else {
                scratch.fill(0);
            }
            scratch[..remaining].copy_from_slice(&buf[written..]);
            device.write_block(abs, scratch.as_ref())?;
            written += remaining;
        } else {
            // Full interior block.
            scratch.copy_from_slice(&buf[written..written + BLOCK_SIZE]);
            device.write_block(abs, scratch.as_ref())?;
            written += BLOCK_SIZE;
        }

        if written < len {
            cur = fat.next(cur)?;
        }
    }

    entry.size = entry.size.max((offset + len) as u64);
    Ok(len)
}
