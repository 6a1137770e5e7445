#![allow(unused)]

mod common;

use common::{assert_consistent, fresh_fs, patterned, RamDisk, TEST_GID, TEST_UID};
use kaon::*;

#[test]
fn empty_image_lists_only_dots() {
    let (fs, _disk) = fresh_fs();
    assert_eq!(fs.readdir("/").unwrap(), vec![".", ".."]);
    assert_eq!(fs.superblock().free_blocks, NUM_DATA_BLOCKS as u64);
    assert_consistent(&fs);
}

#[test]
fn small_file_roundtrip() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/a", 0o644).unwrap();
    let h = fs.open("/a").unwrap();

    assert_eq!(fs.write("/a", h, b"hello", 0).unwrap(), 5);
    let mut buf = [0u8; 5];
    assert_eq!(fs.read("/a", h, &mut buf, 0).unwrap(), 5);
    assert_eq!(&buf, b"hello");

    let stat = fs.getattr("/a").unwrap();
    assert_eq!(stat.size, 5);
    assert_eq!(stat.mode, 0o644);
    assert_eq!(stat.uid, TEST_UID);
    assert_eq!(stat.gid, TEST_GID);
    assert_eq!(stat.nlink, 1);
    assert_eq!(fs.chain_len("/a").unwrap(), 1);

    fs.release("/a", h).unwrap();
    assert_consistent(&fs);
}

#[test]
fn cross_block_write_spans_two_blocks() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/b", 0o644).unwrap();
    let h = fs.open("/b").unwrap();

    let data = patterned(600, 7);
    assert_eq!(fs.write("/b", h, &data, 0).unwrap(), 600);
    log!("after 600-byte write: {}", fs.dump());
    assert_eq!(fs.getattr("/b").unwrap().size, 600);
    assert_eq!(fs.chain_len("/b").unwrap(), 2);

    let mut back = vec![0u8; 600];
    assert_eq!(fs.read("/b", h, &mut back, 0).unwrap(), 600);
    assert_eq!(back, data);
    assert_consistent(&fs);
}

#[test]
fn sparse_extension_grows_chain() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/b", 0o644).unwrap();
    let h = fs.open("/b").unwrap();
    fs.write("/b", h, &patterned(600, 7), 0).unwrap();

    assert_eq!(fs.write("/b", h, b"Z", 1025).unwrap(), 1);
    assert_eq!(fs.getattr("/b").unwrap().size, 1026);
    assert_eq!(fs.chain_len("/b").unwrap(), 3);

    let mut one = [0u8; 1];
    assert_eq!(fs.read("/b", h, &mut one, 1025).unwrap(), 1);
    assert_eq!(&one, b"Z");
    assert_consistent(&fs);
}

#[test]
fn overwrite_inside_block_preserves_neighbours() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/f", 0o600).unwrap();
    let h = fs.open("/f").unwrap();

    let data = patterned(1200, 3);
    fs.write("/f", h, &data, 0).unwrap();
    // Splice ten bytes into the middle of the second block.
    fs.write("/f", h, b"XXXXXXXXXX", 600).unwrap();

    let mut back = vec![0u8; 1200];
    fs.read("/f", h, &mut back, 0).unwrap();
    assert_eq!(&back[..600], &data[..600]);
    assert_eq!(&back[600..610], b"XXXXXXXXXX");
    assert_eq!(&back[610..], &data[610..]);
    assert_eq!(fs.getattr("/f").unwrap().size, 1200);
    assert_consistent(&fs);
}

#[test]
fn read_past_end_clamps() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/f", 0o644).unwrap();
    let h = fs.open("/f").unwrap();
    fs.write("/f", h, b"abcdef", 0).unwrap();

    // Reading at the end returns 0, not an error.
    let mut buf = [0u8; 8];
    assert_eq!(fs.read("/f", h, &mut buf, 6).unwrap(), 0);
    assert_eq!(fs.read("/f", h, &mut buf, 100).unwrap(), 0);
    // Reading across the end clamps.
    assert_eq!(fs.read("/f", h, &mut buf, 4).unwrap(), 2);
    assert_eq!(&buf[..2], b"ef");
}

#[test]
fn invalid_arguments_are_rejected() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/f", 0o644).unwrap();
    let h = fs.open("/f").unwrap();
    let mut buf = [0u8; 4];

    assert_eq!(fs.read("/f", h, &mut buf, -1).unwrap_err(), FsError::InvalidArgument);
    assert_eq!(fs.write("/f", h, b"x", -1).unwrap_err(), FsError::InvalidArgument);
    assert_eq!(fs.truncate("/f", -1).unwrap_err(), FsError::InvalidArgument);
    assert_eq!(fs.mknod("bad", 0o644).unwrap_err(), FsError::InvalidArgument);

    let long = format!("/{}", "x".repeat(NAME_LENGTH));
    assert_eq!(fs.mknod(&long, 0o644).unwrap_err(), FsError::InvalidArgument);
    assert_eq!(fs.rename("/f", &long).unwrap_err(), FsError::InvalidArgument);
}

#[test]
fn handle_rules() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/a", 0o644).unwrap();
    fs.mknod("/b", 0o644).unwrap();
    let h = fs.open("/a").unwrap();
    let mut buf = [0u8; 1];

    // Double open of the same file.
    assert_eq!(fs.open("/a").unwrap_err(), FsError::AlreadyOpen);
    // Handle and path must agree.
    assert_eq!(fs.read("/b", h, &mut buf, 0).unwrap_err(), FsError::BadHandle);
    assert_eq!(fs.read("/a", 99, &mut buf, 0).unwrap_err(), FsError::BadHandle);
    // Reads and writes need an open handle.
    let hb = fs.open("/b").unwrap();
    fs.release("/b", hb).unwrap();
    assert_eq!(fs.read("/b", hb, &mut buf, 0).unwrap_err(), FsError::NotOpen);
    assert_eq!(fs.write("/b", hb, b"x", 0).unwrap_err(), FsError::NotOpen);
    // Double release.
    fs.release("/a", h).unwrap();
    assert_eq!(fs.release("/a", h).unwrap_err(), FsError::BadHandle);
    assert_consistent(&fs);
}

#[test]
fn unlink_of_open_file_is_busy() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/a", 0o644).unwrap();
    let h = fs.open("/a").unwrap();
    assert_eq!(fs.unlink("/a").unwrap_err(), FsError::Busy);
    fs.release("/a", h).unwrap();
    fs.unlink("/a").unwrap();
    assert_eq!(fs.getattr("/a").unwrap_err(), FsError::NotFound);
    assert_consistent(&fs);
}

#[test]
fn unlink_releases_chain() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/a", 0o644).unwrap();
    let h = fs.open("/a").unwrap();
    fs.write("/a", h, &patterned(BLOCK_SIZE * 5, 1), 0).unwrap();
    assert_eq!(fs.superblock().free_blocks, (NUM_DATA_BLOCKS - 5) as u64);
    fs.release("/a", h).unwrap();

    fs.unlink("/a").unwrap();
    assert_eq!(fs.superblock().free_blocks, NUM_DATA_BLOCKS as u64);
    assert_consistent(&fs);
}

#[test]
fn mknod_rejects_duplicates() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/a", 0o644).unwrap();
    assert_eq!(fs.mknod("/a", 0o600).unwrap_err(), FsError::AlreadyExists);
}

#[test]
fn rename_moves_and_blocks_collisions() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/a", 0o644).unwrap();
    fs.mknod("/b", 0o644).unwrap();

    assert_eq!(fs.rename("/a", "/b").unwrap_err(), FsError::AlreadyExists);
    assert_eq!(fs.rename("/missing", "/c").unwrap_err(), FsError::NotFound);

    fs.rename("/a", "/c").unwrap();
    assert_eq!(fs.getattr("/a").unwrap_err(), FsError::NotFound);
    assert!(fs.getattr("/c").is_ok());
    let names = fs.readdir("/").unwrap();
    assert!(names.contains(&"c".to_string()));
    assert!(!names.contains(&"a".to_string()));
    assert_consistent(&fs);
}

#[test]
fn chmod_is_idempotent_and_chown_sticks() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/a", 0o644).unwrap();

    fs.chmod("/a", 0o600).unwrap();
    fs.chmod("/a", 0o600).unwrap();
    assert_eq!(fs.getattr("/a").unwrap().mode, 0o600);

    fs.chown("/a", 42, 43).unwrap();
    let stat = fs.getattr("/a").unwrap();
    assert_eq!((stat.uid, stat.gid), (42, 43));

    assert_eq!(fs.chmod("/missing", 0o600).unwrap_err(), FsError::NotFound);
    assert_eq!(fs.chown("/missing", 1, 1).unwrap_err(), FsError::NotFound);
}

#[test]
fn getattr_root_is_a_directory() {
    let (fs, _disk) = fresh_fs();
    let stat = fs.getattr("/").unwrap();
    assert_eq!(stat.mode, S_IFDIR | 0o755);
    assert_eq!(stat.nlink, 2);
}

#[test]
fn truncate_down_then_up() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/t", 0o644).unwrap();
    let h = fs.open("/t").unwrap();
    fs.write("/t", h, &patterned(2048, 9), 0).unwrap();
    assert_eq!(fs.chain_len("/t").unwrap(), 4);

    fs.truncate("/t", 1000).unwrap();
    assert_eq!(fs.getattr("/t").unwrap().size, 1000);
    assert_eq!(fs.chain_len("/t").unwrap(), 2);
    assert_consistent(&fs);

    fs.truncate("/t", 0).unwrap();
    assert_eq!(fs.getattr("/t").unwrap().size, 0);
    assert_eq!(fs.chain_len("/t").unwrap(), 0);
    assert_eq!(fs.superblock().free_blocks, NUM_DATA_BLOCKS as u64);
    assert_consistent(&fs);

    fs.truncate("/t", 600).unwrap();
    assert_eq!(fs.getattr("/t").unwrap().size, 600);
    assert_eq!(fs.chain_len("/t").unwrap(), 2);
    assert_consistent(&fs);

    // The shortened file still reads back its surviving prefix.
    fs.truncate("/t", 0).unwrap();
    fs.write("/t", h, &patterned(1536, 5), 0).unwrap();
    fs.truncate("/t", 512).unwrap();
    let mut back = vec![0u8; 512];
    assert_eq!(fs.read("/t", h, &mut back, 0).unwrap(), 512);
    assert_eq!(back, &patterned(1536, 5)[..512]);
    fs.release("/t", h).unwrap();
    assert_consistent(&fs);
}

#[test]
fn ftruncate_requires_open_handle() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/t", 0o644).unwrap();
    let h = fs.open("/t").unwrap();
    fs.ftruncate("/t", h, 700).unwrap();
    assert_eq!(fs.getattr("/t").unwrap().size, 700);
    fs.release("/t", h).unwrap();
    assert_eq!(fs.ftruncate("/t", h, 10).unwrap_err(), FsError::NotOpen);
    // The path-only variant keeps working on a closed file.
    fs.truncate("/t", 10).unwrap();
    assert_eq!(fs.getattr("/t").unwrap().size, 10);
    assert_consistent(&fs);
}

#[test]
fn truncate_of_missing_file() {
    let (mut fs, _disk) = fresh_fs();
    assert_eq!(fs.truncate("/nope", 10).unwrap_err(), FsError::NotFound);
}

#[test]
fn write_then_read_at_odd_offsets() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/p", 0o644).unwrap();
    let h = fs.open("/p").unwrap();

    for (len, offset) in [(1usize, 0i64), (511, 1), (512, 511), (1025, 513), (37, 4000)] {
        let data = patterned(len, offset as u8);
        assert_eq!(fs.write("/p", h, &data, offset).unwrap(), len);
        let mut back = vec![0u8; len];
        assert_eq!(fs.read("/p", h, &mut back, offset).unwrap(), len);
        assert_eq!(back, data, "mismatch for len={len} offset={offset}");
        assert_consistent(&fs);
    }
}

#[test]
fn readdir_lists_all_live_files() {
    let (mut fs, _disk) = fresh_fs();
    fs.mknod("/x", 0o644).unwrap();
    fs.mknod("/y", 0o644).unwrap();
    fs.mknod("/z", 0o644).unwrap();
    fs.unlink("/y").unwrap();

    let names = fs.readdir("/").unwrap();
    assert_eq!(names[..2], [".".to_string(), "..".to_string()]);
    assert!(names.contains(&"x".to_string()));
    assert!(names.contains(&"z".to_string()));
    assert!(!names.contains(&"y".to_string()));
}
