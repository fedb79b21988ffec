use super::FileStorage;
use super::error::Error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// [`FileStorage`] over files in a host directory.
///
/// Names map onto paths below the root with any leading `/` stripped, so
/// `/netConfig.json` lives at `<root>/netConfig.json`.
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    /// Store files under `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|_| Error::WriteError)?;
        Ok(Self { root })
    }

    /// The directory files are stored in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_start_matches('/'))
    }
}

fn map_read(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::NotFound => Error::NotFound,
        _ => Error::ReadError,
    }
}

fn map_write(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::NotFound => Error::NotFound,
        _ => Error::WriteError,
    }
}

impl FileStorage for DirStorage {
    type Error = Error;

    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn size(&self, name: &str) -> Result<usize, Self::Error> {
        let meta = std::fs::metadata(self.path(name)).map_err(map_read)?;
        Ok(meta.len() as usize)
    }

    fn read(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let data = std::fs::read(self.path(name)).map_err(map_read)?;
        if data.len() > buf.len() {
            return Err(Error::BufferTooSmall);
        }
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        std::fs::write(self.path(name), bytes).map_err(map_write)
    }

    fn remove(&mut self, name: &str) -> Result<(), Self::Error> {
        std::fs::remove_file(self.path(name)).map_err(map_write)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), Self::Error> {
        std::fs::rename(self.path(from), self.path(to)).map_err(map_write)
    }
}
