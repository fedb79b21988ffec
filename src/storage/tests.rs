use super::error::Error;
use super::*;

type SmallStorage = MemoryStorage<3, 16>;

#[test]
fn test_write_then_read() {
    let mut storage = SmallStorage::new();
    storage.write("/a", b"hello").unwrap();

    assert!(storage.exists("/a"));
    assert_eq!(storage.size("/a"), Ok(5));

    let mut buf = [0u8; 16];
    let n = storage.read("/a", &mut buf).unwrap();
    assert_eq!(&buf[..n], b"hello");
}

#[test]
fn test_write_truncates() {
    let mut storage = SmallStorage::new();
    storage.write("/a", b"long contents").unwrap();
    storage.write("/a", b"x").unwrap();
    assert_eq!(storage.size("/a"), Ok(1));
    assert_eq!(storage.len(), 1);
}

#[test]
fn test_missing_file() {
    let mut storage = SmallStorage::new();
    let mut buf = [0u8; 4];
    assert!(!storage.exists("/nope"));
    assert_eq!(storage.size("/nope"), Err(Error::NotFound));
    assert_eq!(storage.read("/nope", &mut buf), Err(Error::NotFound));
    assert_eq!(storage.remove("/nope"), Err(Error::NotFound));
    assert_eq!(storage.rename("/nope", "/b"), Err(Error::NotFound));
}

#[test]
fn test_capacity_limits() {
    let mut storage = SmallStorage::new();
    assert_eq!(storage.write("/big", &[0u8; 17]), Err(Error::OutOfSpace));

    storage.write("/1", b"").unwrap();
    storage.write("/2", b"").unwrap();
    storage.write("/3", b"").unwrap();
    assert_eq!(storage.write("/4", b""), Err(Error::OutOfSpace));

    let long_name = "n".repeat(MAX_NAME_LEN + 1);
    storage.remove("/3").unwrap();
    assert_eq!(storage.write(&long_name, b""), Err(Error::NameTooLong));
}

#[test]
fn test_read_into_short_buffer() {
    let mut storage = SmallStorage::new();
    storage.write("/a", b"0123456789").unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(storage.read("/a", &mut buf), Err(Error::BufferTooSmall));
}

#[test]
fn test_rename_replaces_destination() {
    let mut storage = SmallStorage::new();
    storage.write("/cfg.tmp", b"new").unwrap();
    storage.write("/cfg", b"old").unwrap();

    storage.rename("/cfg.tmp", "/cfg").unwrap();

    assert!(!storage.exists("/cfg.tmp"));
    assert_eq!(storage.len(), 1);
    let mut buf = [0u8; 16];
    let n = storage.read("/cfg", &mut buf).unwrap();
    assert_eq!(&buf[..n], b"new");
}

#[cfg(feature = "std")]
#[test]
fn test_dir_storage_round_trip() {
    let root = std::env::temp_dir().join(std::format!("iotlink-storage-{}", std::process::id()));
    let mut storage = DirStorage::new(&root).unwrap();

    storage.write("/cfg.tmp", b"{}").unwrap();
    storage.rename("/cfg.tmp", "/cfg").unwrap();
    assert!(storage.exists("/cfg"));
    assert!(!storage.exists("/cfg.tmp"));
    assert_eq!(storage.size("/cfg"), Ok(2));

    let mut buf = [0u8; 1];
    assert_eq!(storage.read("/cfg", &mut buf), Err(Error::BufferTooSmall));

    storage.remove("/cfg").unwrap();
    assert_eq!(storage.remove("/cfg"), Err(Error::NotFound));
    let _ = std::fs::remove_dir_all(&root);
}
