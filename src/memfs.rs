//! Heap-backed variant of the upcall surface: the same slot table, handle
//! rules and error codes as the on-disk engine, with plain `Vec<u8>` payloads
//! and no persistence. Useful as the behavioural reference for the façade
//! semantics and for adaptor testing without a container file.

use crate::config::*;
use crate::ops::{unix_now, FsOperations, Handle};
use crate::path;
use crate::structs::{FileStat, S_IFDIR};
use crate::{FsError, Result};

#[derive(Debug, Clone)]
struct MemFile {
    path: String,
    data: Vec<u8>,
    uid: u32,
    gid: u32,
    mode: u32,
    atime: i64,
    mtime: i64,
    ctime: i64,
}

pub struct MemFs {
    slots: Vec<Option<MemFile>>,
    open_files: [bool; NUM_DIR_ENTRIES],
    open_count: usize,
    file_count: usize,
    uid: u32,
    gid: u32,
}

impl MemFs {
    pub fn new(uid: u32, gid: u32) -> Self {
        MemFs {
            slots: vec![None; NUM_DIR_ENTRIES],
            open_files: [false; NUM_DIR_ENTRIES],
            open_count: 0,
            file_count: 0,
            uid,
            gid,
        }
    }

    fn slot_of(&self, p: &str) -> Result<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|f| f.path == p))
            .ok_or(FsError::NotFound)
    }

    fn checked_slot(&self, p: &str, fh: Handle) -> Result<usize> {
        if fh >= NUM_DIR_ENTRIES {
            return Err(FsError::BadHandle);
        }
        match &self.slots[fh] {
            Some(f) if f.path == p => Ok(fh),
            _ => Err(FsError::BadHandle),
        }
    }
}

impl FsOperations for MemFs {
    fn getattr(&self, p: &str) -> Result<FileStat> {
        if p == "/" {
            let now = unix_now();
            return Ok(FileStat {
                mode: S_IFDIR | 0o755,
                nlink: 2,
                uid: self.uid,
                gid: self.gid,
                size: 0,
                atime: now,
                mtime: now,
                ctime: now,
            });
        }
        let f = self.slots[self.slot_of(p)?].as_ref().ok_or(FsError::NotFound)?;
        Ok(FileStat {
            mode: f.mode,
            nlink: 1,
            uid: f.uid,
            gid: f.gid,
            size: f.data.len() as u64,
            atime: f.atime,
            mtime: f.mtime,
            ctime: f.ctime,
        })
    }

    fn mknod(&mut self, p: &str, mode: u32) -> Result<()> {
        if self.file_count >= NUM_DIR_ENTRIES {
            return Err(FsError::NoSpace);
        }
        path::validate(p)?;
        if self.slot_of(p).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(FsError::NoSpace)?;

        let now = unix_now();
        self.slots[slot] = Some(MemFile {
            path: p.to_string(),
            data: Vec::new(),
            uid: self.uid,
            gid: self.gid,
            mode,
            atime: now,
            mtime: now,
            ctime: now,
        });
        self.file_count += 1;
        Ok(())
    }

    fn unlink(&mut self, p: &str) -> Result<()> {
        let slot = self.slot_of(p)?;
        if self.open_files[slot] {
            return Err(FsError::Busy);
        }
        self.slots[slot] = None;
        self.file_count -= 1;
        Ok(())
    }

    fn rename(&mut self, p: &str, newpath: &str) -> Result<()> {
        path::validate(newpath)?;
        if self.slot_of(newpath).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        let slot = self.slot_of(p)?;

        let now = unix_now();
        let f = self.slots[slot].as_mut().ok_or(FsError::NotFound)?;
        f.path = newpath.to_string();
        f.atime = now;
        f.ctime = now;
        Ok(())
    }

    fn chmod(&mut self, p: &str, mode: u32) -> Result<()> {
        let slot = self.slot_of(p)?;
        let now = unix_now();
        let f = self.slots[slot].as_mut().ok_or(FsError::NotFound)?;
        f.mode = mode;
        f.atime = now;
        f.ctime = now;
        Ok(())
    }

    fn chown(&mut self, p: &str, uid: u32, gid: u32) -> Result<()> {
        let slot = self.slot_of(p)?;
        let now = unix_now();
        let f = self.slots[slot].as_mut().ok_or(FsError::NotFound)?;
        f.uid = uid;
        f.gid = gid;
        f.atime = now;
        f.ctime = now;
        Ok(())
    }

    fn open(&mut self, p: &str) -> Result<Handle> {
        if self.open_count >= NUM_OPEN_FILES {
            return Err(FsError::TooManyOpen);
        }
        let slot = self.slot_of(p)?;
        if self.open_files[slot] {
            return Err(FsError::AlreadyOpen);
        }
        self.open_files[slot] = true;
        self.open_count += 1;

        let now = unix_now();
        if let Some(f) = self.slots[slot].as_mut() {
            f.atime = now;
            f.ctime = now;
        }
        Ok(slot)
    }

    fn read(&mut self, p: &str, fh: Handle, buf: &mut [u8], offset: i64) -> Result<usize> {
        if offset < 0 {
            return Err(FsError::InvalidArgument);
        }
        let slot = self.checked_slot(p, fh)?;
        if !self.open_files[slot] {
            return Err(FsError::NotOpen);
        }
        let offset = offset as usize;

        let f = self.slots[slot].as_mut().ok_or(FsError::BadHandle)?;
        if offset >= f.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(f.data.len() - offset);
        buf[..n].copy_from_slice(&f.data[offset..offset + n]);
        f.atime = unix_now();
        Ok(n)
    }

    fn write(&mut self, p: &str, fh: Handle, buf: &[u8], offset: i64) -> Result<usize> {
        if offset < 0 {
            return Err(FsError::InvalidArgument);
        }
        let slot = self.checked_slot(p, fh)?;
        if !self.open_files[slot] {
            return Err(FsError::NotOpen);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let offset = offset as usize;

        let f = self.slots[slot].as_mut().ok_or(FsError::BadHandle)?;
        if offset + buf.len() > f.data.len() {
            f.data.resize(offset + buf.len(), 0);
        }
        f.data[offset..offset + buf.len()].copy_from_slice(buf);

        let now = unix_now();
        f.atime = now;
        f.mtime = now;
        f.ctime = now;
        Ok(buf.len())
    }

    fn release(&mut self, p: &str, fh: Handle) -> Result<()> {
        let slot = self.checked_slot(p, fh)?;
        if !self.open_files[slot] {
            return Err(FsError::BadHandle);
        }
        self.open_files[slot] = false;
        self.open_count -= 1;
        Ok(())
    }

    fn truncate(&mut self, p: &str, new_size: i64) -> Result<()> {
        if new_size < 0 {
            return Err(FsError::InvalidArgument);
        }
        let slot = self.slot_of(p)?;

        let now = unix_now();
        let f = self.slots[slot].as_mut().ok_or(FsError::NotFound)?;
        if new_size as usize != f.data.len() {
            f.data.resize(new_size as usize, 0);
            f.mtime = now;
        }
        f.atime = now;
        f.ctime = now;
        Ok(())
    }

    fn ftruncate(&mut self, p: &str, fh: Handle, new_size: i64) -> Result<()> {
        if new_size < 0 {
            return Err(FsError::InvalidArgument);
        }
        let slot = self.checked_slot(p, fh)?;
        if !self.open_files[slot] {
            return Err(FsError::NotOpen);
        }
        let f = self.slots[slot].as_ref().ok_or(FsError::BadHandle)?;
        let path = f.path.clone();
        self.truncate(&path, new_size)
    }

    fn readdir(&self, p: &str) -> Result<Vec<String>> {
        let mut names = vec![".".to_string(), "..".to_string()];
        if p == "/" {
            for f in self.slots.iter().flatten() {
                names.push(path::display_name(&f.path).to_string());
            }
        }
        Ok(names)
    }
}
