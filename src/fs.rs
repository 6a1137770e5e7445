//! The on-disk engine: a mount context owning the device, the four mirrored
//! regions and the per-mount session state, exposing the upcall surface.
//!
//! Regions are loaded once at mount. Every mutating operation writes the
//! affected regions back before returning, chain-affecting ones in
//! FAT, bitmap, superblock, root order: a crash between the bitmap and the
//! superblock then leaves the free counter no smaller than reality.

use std::path::Path;

use crate::allocator;
use crate::bitmap::Dmap;
use crate::config::*;
use crate::container::ContainerFile;
use crate::directory::Root;
use crate::fat::Fat;
use crate::file;
use crate::ops::{unix_now, FsOperations, Handle};
use crate::path;
use crate::structs::{DiskEntry, FileStat, S_IFDIR};
use crate::superblock::{read_superblock, write_superblock};
use crate::{BlockDevice, FsError, Result, SuperBlock};

pub struct OnDiskFs<D: BlockDevice> {
    device: D,
    superblock: SuperBlock,
    dmap: Dmap,
    fat: Fat,
    root: Root,
    open_files: [bool; NUM_DIR_ENTRIES],
    open_count: usize,
    file_count: usize,
    uid: u32,
    gid: u32,
}

impl<D: BlockDevice> OnDiskFs<D> {
    /// Initialises a zeroed container: superblock, all-free map, all-end
    /// chain table, all-empty root.
    pub fn format(device: D, uid: u32, gid: u32) -> Result<Self> {
        let superblock = SuperBlock::new();
        let dmap = Dmap::new_all_free();
        let fat = Fat::new_all_end();
        let root = Root::new_empty();

        write_superblock(&device, &superblock)?;
        dmap.store(&device)?;
        fat.store(&device)?;
        root.store(&device)?;
        device.flush()?;
        log::debug!("formatted fresh image, {} data blocks", NUM_DATA_BLOCKS);

        Ok(OnDiskFs {
            device,
            superblock,
            dmap,
            fat,
            root,
            open_files: [false; NUM_DIR_ENTRIES],
            open_count: 0,
            file_count: 0,
            uid,
            gid,
        })
    }

    /// Reads an existing image back and rebuilds the session helpers.
    pub fn mount(device: D, uid: u32, gid: u32) -> Result<Self> {
        let superblock = read_superblock(&device)?;
        let dmap = Dmap::load(&device)?;
        let fat = Fat::load(&device)?;
        let root = Root::load(&device)?;
        let file_count = root.count_files();
        log::debug!(
            "mounted image: {} files, {} free blocks",
            file_count,
            superblock.free_blocks
        );

        Ok(OnDiskFs {
            device,
            superblock,
            dmap,
            fat,
            root,
            open_files: [false; NUM_DIR_ENTRIES],
            open_count: 0,
            file_count,
            uid,
            gid,
        })
    }

    /// Flushes the device ahead of unmount.
    pub fn destroy(&mut self) -> Result<()> {
        self.device.flush()
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    /// Blocks currently chained to `path`.
    pub fn chain_len(&self, p: &str) -> Result<usize> {
        let slot = self.slot_of(p)?;
        self.fat.chain_len(self.root.entry(slot).chain_head)
    }

    pub fn dump(&self) -> String {
        format!(
            "files={} open={} free_blocks={}/{}",
            self.file_count, self.open_count, self.superblock.free_blocks, NUM_DATA_BLOCKS
        )
    }

    /// Verifies the mutual consistency of counter, map, chains and session
    /// state. Intended for tests and post-mortem checks.
    pub fn check_consistency(&self) -> Result<()> {
        if self.superblock.free_blocks != self.dmap.count_free() {
            return Err(FsError::CorruptImage);
        }
        if self.file_count != self.root.count_files() {
            return Err(FsError::CorruptImage);
        }
        if self.open_count != self.open_files.iter().filter(|&&b| b).count() {
            return Err(FsError::CorruptImage);
        }
        for (slot, open) in self.open_files.iter().enumerate() {
            if *open && self.root.entry(slot).is_empty() {
                return Err(FsError::CorruptImage);
            }
        }
        let mut paths: Vec<&[u8]> = self.root.iter_live().map(|(_, e)| e.path_bytes()).collect();
        paths.sort_unstable();
        if paths.windows(2).any(|w| w[0] == w[1]) {
            return Err(FsError::CorruptImage);
        }

        let mut seen = vec![false; NUM_DATA_BLOCKS];
        for (_, entry) in self.root.iter_live() {
            if entry.size == 0 {
                if entry.chain_head != NULL_BLOCK {
                    return Err(FsError::CorruptImage);
                }
                continue;
            }
            if entry.chain_head == NULL_BLOCK {
                return Err(FsError::CorruptImage);
            }
            let expect = entry.blocks();
            let mut cur = entry.chain_head;
            for hop in 0..expect {
                if cur < 0 || cur as usize >= NUM_DATA_BLOCKS {
                    return Err(FsError::CorruptImage);
                }
                if seen[cur as usize] || self.dmap.is_free(cur) {
                    return Err(FsError::CorruptImage);
                }
                seen[cur as usize] = true;
                let next = self.fat.next(cur)?;
                if hop + 1 == expect {
                    if next != CHAIN_END {
                        return Err(FsError::CorruptImage);
                    }
                } else {
                    if next == CHAIN_END {
                        return Err(FsError::CorruptImage);
                    }
                    cur = next;
                }
            }
        }
        Ok(())
    }

    fn slot_of(&self, p: &str) -> Result<usize> {
        self.root.find(p).ok_or(FsError::NotFound)
    }

    /// Handle checks shared by read, write, release and ftruncate: in range,
    /// backed by a live slot, and consistent with the path argument.
    fn checked_slot(&self, p: &str, fh: Handle) -> Result<usize> {
        if fh >= NUM_DIR_ENTRIES {
            return Err(FsError::BadHandle);
        }
        let entry = self.root.entry(fh);
        if entry.is_empty() || entry.path_bytes() != p.as_bytes() {
            return Err(FsError::BadHandle);
        }
        Ok(fh)
    }

    /// Chain-affecting write-back, in crash-ordering: FAT first, root last.
    fn persist_meta(&mut self) -> Result<()> {
        self.fat.store(&self.device)?;
        self.dmap.store(&self.device)?;
        write_superblock(&self.device, &self.superblock)?;
        self.root.store(&self.device)?;
        Ok(())
    }

    fn do_truncate(&mut self, slot: usize, new_size: usize) -> Result<()> {
        let old_blocks = self.root.entry(slot).blocks();
        let new_blocks = new_size.div_ceil(BLOCK_SIZE);
        let now = unix_now();

        if new_blocks > old_blocks {
            allocator::allocate_chain(
                &self.device,
                &mut self.superblock,
                &mut self.dmap,
                &mut self.fat,
                self.root.entry_mut(slot),
                new_blocks - old_blocks,
            )?;
        } else if new_blocks < old_blocks {
            allocator::shrink_chain(
                &mut self.superblock,
                &mut self.dmap,
                &mut self.fat,
                self.root.entry_mut(slot),
                new_blocks,
            )?;
        }

        let entry = self.root.entry_mut(slot);
        if new_blocks != old_blocks {
            entry.mtime = now;
        }
        entry.size = new_size as u64;
        entry.atime = now;
        entry.ctime = now;
        self.persist_meta()
    }
}

impl OnDiskFs<ContainerFile> {
    /// The mount upcall: opens the container at `container_path`, creating
    /// and formatting a fresh image when none exists yet.
    pub fn init<P: AsRef<Path>>(container_path: P, uid: u32, gid: u32) -> Result<Self> {
        match ContainerFile::open(&container_path) {
            Ok(device) => Self::mount(device, uid, gid),
            Err(FsError::NotFound) => {
                log::debug!("container missing, creating a fresh image");
                let device = ContainerFile::create(&container_path)?;
                Self::format(device, uid, gid)
            }
            Err(e) => Err(e),
        }
    }
}

impl<D: BlockDevice> FsOperations for OnDiskFs<D> {
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
        let entry = self.root.entry(self.slot_of(p)?);
        Ok(FileStat {
            mode: entry.mode,
            nlink: 1,
            uid: entry.uid,
            gid: entry.gid,
            size: entry.size,
            atime: entry.atime,
            mtime: entry.mtime,
            ctime: entry.ctime,
        })
    }

    fn mknod(&mut self, p: &str, mode: u32) -> Result<()> {
        if self.file_count >= NUM_DIR_ENTRIES {
            return Err(FsError::NoSpace);
        }
        path::validate(p)?;
        if self.root.find(p).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let slot = self.root.find_empty().ok_or(FsError::NoSpace)?;

        let now = unix_now();
        let entry = self.root.entry_mut(slot);
        *entry = DiskEntry::EMPTY;
        entry.set_path(p);
        entry.uid = self.uid;
        entry.gid = self.gid;
        entry.mode = mode;
        entry.atime = now;
        entry.mtime = now;
        entry.ctime = now;
        self.file_count += 1;

        self.root.flush_slot(&self.device, slot)
    }

    fn unlink(&mut self, p: &str) -> Result<()> {
        let slot = self.slot_of(p)?;
        if self.open_files[slot] {
            return Err(FsError::Busy);
        }

        let head = self.root.entry(slot).chain_head;
        self.root.entry_mut(slot).clear();
        self.file_count -= 1;

        if head != NULL_BLOCK {
            allocator::free_chain(&mut self.superblock, &mut self.dmap, &mut self.fat, head)?;
            self.persist_meta()
        } else {
            self.root.flush_slot(&self.device, slot)
        }
    }

    fn rename(&mut self, p: &str, newpath: &str) -> Result<()> {
        path::validate(newpath)?;
        if self.root.find(newpath).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let slot = self.slot_of(p)?;

        let now = unix_now();
        let entry = self.root.entry_mut(slot);
        entry.set_path(newpath);
        entry.atime = now;
        entry.ctime = now;
        self.root.flush_slot(&self.device, slot)
    }

    fn chmod(&mut self, p: &str, mode: u32) -> Result<()> {
        let slot = self.slot_of(p)?;
        let now = unix_now();
        let entry = self.root.entry_mut(slot);
        entry.mode = mode;
        entry.atime = now;
        entry.ctime = now;
        self.root.flush_slot(&self.device, slot)
    }

    fn chown(&mut self, p: &str, uid: u32, gid: u32) -> Result<()> {
        let slot = self.slot_of(p)?;
        let now = unix_now();
        let entry = self.root.entry_mut(slot);
        entry.uid = uid;
        entry.gid = gid;
        entry.atime = now;
        entry.ctime = now;
        self.root.flush_slot(&self.device, slot)
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
        let entry = self.root.entry_mut(slot);
        entry.atime = now;
        entry.ctime = now;
        self.root.flush_slot(&self.device, slot)?;
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

        let n = file::read_at(
            &self.device,
            &self.fat,
            self.root.entry(slot),
            offset as usize,
            buf,
        )?;
        self.root.entry_mut(slot).atime = unix_now();
        self.root.flush_slot(&self.device, slot)?;
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

        let n = file::write_at(
            &self.device,
            &mut self.superblock,
            &mut self.dmap,
            &mut self.fat,
            self.root.entry_mut(slot),
            offset as usize,
            buf,
        )?;

        let now = unix_now();
        let entry = self.root.entry_mut(slot);
        entry.atime = now;
        entry.mtime = now;
        entry.ctime = now;
        self.persist_meta()?;
        Ok(n)
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
        self.do_truncate(slot, new_size as usize)
    }

    fn ftruncate(&mut self, p: &str, fh: Handle, new_size: i64) -> Result<()> {
        if new_size < 0 {
            return Err(FsError::InvalidArgument);
        }
        let slot = self.checked_slot(p, fh)?;
        if !self.open_files[slot] {
            return Err(FsError::NotOpen);
        }
        self.do_truncate(slot, new_size as usize)
    }

    fn readdir(&self, p: &str) -> Result<Vec<String>> {
        let mut names = vec![".".to_string(), "..".to_string()];
        if p == "/" {
            for (_, entry) in self.root.iter_live() {
                let stored = String::from_utf8_lossy(entry.path_bytes()).into_owned();
                names.push(path::display_name(&stored).to_string());
            }
        }
        Ok(names)
    }
}
