//! Chain growth and shrinkage, keeping the map, the chain table and the
//! directory entry mutually consistent.

use crate::bitmap::Dmap;
use crate::config::*;
use crate::fat::Fat;
use crate::structs::DiskEntry;
use crate::{BlockDevice, FsError, Result, SuperBlock};

/// Appends `n` blocks to the chain of `entry`.
///
/// Fails with `NoSpace` before touching anything when the region cannot cover
/// the request. An empty file gets its head from the free map first.
pub fn allocate_chain<D: BlockDevice>(
    device: &D,
    sb: &mut SuperBlock,
    dmap: &mut Dmap,
    fat: &mut Fat,
    entry: &mut DiskEntry,
    mut n: usize,
) -> Result<()> {
    if n as u64 > sb.free_blocks {
        return Err(FsError::NoSpace);
    }
    if n == 0 {
        return Ok(());
    }

    if entry.chain_head == NULL_BLOCK {
        entry.chain_head = dmap.find_free(device, sb)?;
        n -= 1;
    }

    let mut tail = fat.tail_of(entry.chain_head)?;
    for _ in 0..n {
        let fresh = dmap.find_free(device, sb)?;
        fat.link(tail, fresh)?;
        tail = fresh;
    }
    // A fresh tail already carries CHAIN_END in the table.
    Ok(())
}

/// Cuts the chain of `entry` down to `new_blocks` blocks, releasing the rest.
/// `new_blocks == 0` clears the head.
pub fn shrink_chain(
    sb: &mut SuperBlock,
    dmap: &mut Dmap,
    fat: &mut Fat,
    entry: &mut DiskEntry,
    new_blocks: usize,
) -> Result<()> {
    if entry.chain_head == NULL_BLOCK {
        return Ok(());
    }
    if new_blocks == 0 {
        let head = entry.chain_head;
        entry.chain_head = NULL_BLOCK;
        return fat.unlink_from(sb, dmap, head);
    }

    let new_tail = fat.walk(entry.chain_head, new_blocks - 1)?;
    let excess = fat.next(new_tail)?;
    fat.set_end(new_tail)?;
    if excess != CHAIN_END {
        fat.unlink_from(sb, dmap, excess)?;
    }
    Ok(())
}

/// Releases the whole chain of a slot being reclaimed.
pub fn free_chain(
    sb: &mut SuperBlock,
    dmap: &mut Dmap,
    fat: &mut Fat,
    first: i32,
) -> Result<()> {
    fat.unlink_from(sb, dmap, first)
}
