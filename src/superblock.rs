use crate::config::*;
use crate::error::FsError;
use crate::{BlockDevice, Result, SuperBlock};

pub fn read_superblock<D: BlockDevice>(device: &D) -> Result<SuperBlock> {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    device.read_block(SUPERBLOCK_START, buf.as_mut())?;
    let superblock: SuperBlock =
        unsafe { core::ptr::read_unaligned(buf.as_ptr() as *const SuperBlock) };

    if !superblock.layout_matches() {
        log::error!("superblock layout mismatch, refusing image");
        return Err(FsError::CorruptImage);
    }
    if superblock.free_blocks > NUM_DATA_BLOCKS as u64 {
        return Err(FsError::CorruptImage);
    }

    Ok(superblock)
}

pub fn write_superblock<D: BlockDevice>(device: &D, superblock: &SuperBlock) -> Result<()> {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    unsafe {
        core::ptr::write_unaligned(buf.as_mut_ptr() as *mut SuperBlock, *superblock);
    }
    device.write_block(SUPERBLOCK_START, buf.as_ref())?;
    Ok(())
}
