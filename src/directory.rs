//! Root directory table: 64 fixed slots, one `DiskEntry` serialised per
//! block. The slot index doubles as the open-file handle.

use crate::config::*;
use crate::structs::DiskEntry;
use crate::{BlockDevice, Result};

pub struct Root {
    entries: Box<[DiskEntry]>,
}

impl Root {
    pub fn new_empty() -> Self {
        Root {
            entries: vec![DiskEntry::EMPTY; NUM_DIR_ENTRIES].into_boxed_slice(),
        }
    }

    pub fn load<D: BlockDevice>(device: &D) -> Result<Self> {
        let mut entries = vec![DiskEntry::EMPTY; NUM_DIR_ENTRIES].into_boxed_slice();
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        for (i, entry) in entries.iter_mut().enumerate() {
            device.read_block(ROOT_START + i, buf.as_mut())?;
            *entry = unsafe { core::ptr::read_unaligned(buf.as_ptr() as *const DiskEntry) };
        }
        Ok(Root { entries })
    }

    pub fn store<D: BlockDevice>(&self, device: &D) -> Result<()> {
        for slot in 0..NUM_DIR_ENTRIES {
            self.flush_slot(device, slot)?;
        }
        Ok(())
    }

    /// Rewrites only the block holding `slot`.
    pub fn flush_slot<D: BlockDevice>(&self, device: &D, slot: usize) -> Result<()> {
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        unsafe {
            core::ptr::write_unaligned(buf.as_mut_ptr() as *mut DiskEntry, self.entries[slot]);
        }
        device.write_block(ROOT_START + slot, buf.as_ref())
    }

    /// Linear scan of the non-empty slots for an exact path match.
    pub fn find(&self, path: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| !e.is_empty() && e.path_bytes() == path.as_bytes())
    }

    /// First-fit empty slot.
    pub fn find_empty(&self) -> Option<usize> {
        self.entries.iter().position(|e| e.is_empty())
    }

    pub fn count_files(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_empty()).count()
    }

    pub fn entry(&self, slot: usize) -> &DiskEntry {
        &self.entries[slot]
    }

    pub fn entry_mut(&mut self, slot: usize) -> &mut DiskEntry {
        &mut self.entries[slot]
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (usize, &DiskEntry)> {
        self.entries.iter().enumerate().filter(|(_, e)| !e.is_empty())
    }
}
