//! Common utilities for tests
#![allow(unused)]

use std::sync::{Arc, Mutex};

use kaon::*;

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
}

/// Memory-backed block device covering the whole image.
#[derive(Debug, Clone)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
    num_blocks: usize,
}

impl RamDisk {
    pub fn new(num_blocks: usize) -> Self {
        RamDisk {
            inner: Arc::new(Mutex::new(vec![0u8; num_blocks * BLOCK_SIZE])),
            num_blocks,
        }
    }

    /// A disk sized for one full container image.
    pub fn image() -> Self {
        Self::new(TOTAL_BLOCKS)
    }
}

impl BlockDevice for RamDisk {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        if block_id >= self.num_blocks {
            return Err(FsError::IoError);
        }
        let start = block_id * BLOCK_SIZE;
        let data = self.inner.lock().unwrap();
        buf.copy_from_slice(&data[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        if block_id >= self.num_blocks {
            return Err(FsError::IoError);
        }
        let start = block_id * BLOCK_SIZE;
        let mut data = self.inner.lock().unwrap();
        data[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

pub const TEST_UID: u32 = 1000;
pub const TEST_GID: u32 = 1000;

/// Freshly formatted engine plus the disk handle for remount tests.
pub fn fresh_fs() -> (OnDiskFs<RamDisk>, RamDisk) {
    let disk = RamDisk::image();
    let fs = OnDiskFs::format(disk.clone(), TEST_UID, TEST_GID).unwrap();
    (fs, disk)
}

/// A buffer of `len` bytes cycling through a recognisable pattern.
pub fn patterned(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// Counter, map, chains and session state must agree after every operation.
pub fn assert_consistent<D: BlockDevice>(fs: &OnDiskFs<D>) {
    fs.check_consistency().expect("image invariants violated");
}
