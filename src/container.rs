//! Host-file implementation of the block I/O port. The whole image lives in
//! one container file of `TOTAL_BLOCKS` blocks.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::config::*;
use crate::error::FsError;
use crate::{BlockDevice, Result};

pub struct ContainerFile {
    inner: Mutex<File>,
}

impl ContainerFile {
    /// Opens an existing container. A missing file is `NotFound`, which the
    /// engine takes as the signal to create and format a fresh image.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => FsError::NotFound,
                _ => FsError::IoError,
            })?;
        Ok(ContainerFile {
            inner: Mutex::new(file),
        })
    }

    /// Creates a zero-filled container sized for the full image.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|_| FsError::IoError)?;
        file.set_len((TOTAL_BLOCKS * BLOCK_SIZE) as u64)
            .map_err(|_| FsError::IoError)?;
        Ok(ContainerFile {
            inner: Mutex::new(file),
        })
    }
}

impl BlockDevice for ContainerFile {
    fn num_blocks(&self) -> usize {
        TOTAL_BLOCKS
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        if block_id >= TOTAL_BLOCKS {
            return Err(FsError::IoError);
        }
        let mut file = self.inner.lock().map_err(|_| FsError::IoError)?;
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .map_err(|_| FsError::IoError)?;
        file.read_exact(buf).map_err(|_| FsError::IoError)
    }

    fn write_block(&self, block_id: usize, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        if block_id >= TOTAL_BLOCKS {
            return Err(FsError::IoError);
        }
        let mut file = self.inner.lock().map_err(|_| FsError::IoError)?;
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .map_err(|_| FsError::IoError)?;
        file.write_all(buf).map_err(|_| FsError::IoError)
    }

    fn flush(&self) -> Result<()> {
        let file = self.inner.lock().map_err(|_| FsError::IoError)?;
        file.sync_all().map_err(|_| FsError::IoError)
    }
}
