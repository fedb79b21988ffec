use super::FileStorage;
use super::error::Error;
use heapless::{String, Vec};

/// Longest file name a [`MemoryStorage`] accepts.
pub const MAX_NAME_LEN: usize = 32;

#[derive(Debug, Clone)]
struct File<const SIZE: usize> {
    name: String<MAX_NAME_LEN>,
    data: Vec<u8, SIZE>,
}

/// RAM-backed [`FileStorage`] with `FILES` slots of up to `SIZE` bytes each.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage<const FILES: usize, const SIZE: usize> {
    files: Vec<File<SIZE>, FILES>,
}

impl<const FILES: usize, const SIZE: usize> MemoryStorage<FILES, SIZE> {
    /// An empty store.
    pub const fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// `true` when no files are stored.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.name.as_str() == name)
    }
}

impl<const FILES: usize, const SIZE: usize> FileStorage for MemoryStorage<FILES, SIZE> {
    type Error = Error;

    fn exists(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn size(&self, name: &str) -> Result<usize, Self::Error> {
        let index = self.position(name).ok_or(Error::NotFound)?;
        Ok(self.files[index].data.len())
    }

    fn read(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let index = self.position(name).ok_or(Error::NotFound)?;
        let data = &self.files[index].data;
        if data.len() > buf.len() {
            return Err(Error::BufferTooSmall);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        let data = Vec::from_slice(bytes).map_err(|_| Error::OutOfSpace)?;
        if let Some(index) = self.position(name) {
            self.files[index].data = data;
            return Ok(());
        }
        let name = String::try_from(name).map_err(|_| Error::NameTooLong)?;
        self.files
            .push(File { name, data })
            .map_err(|_| Error::OutOfSpace)
    }

    fn remove(&mut self, name: &str) -> Result<(), Self::Error> {
        let index = self.position(name).ok_or(Error::NotFound)?;
        self.files.swap_remove(index);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), Self::Error> {
        let index = self.position(from).ok_or(Error::NotFound)?;
        if from == to {
            return Ok(());
        }
        let new_name = String::try_from(to).map_err(|_| Error::NameTooLong)?;
        self.files[index].name = new_name;
        // Drop the file previously known as `to`, if any.
        if let Some(old) = self
            .files
            .iter()
            .enumerate()
            .position(|(i, f)| i != index && f.name.as_str() == to)
        {
            self.files.swap_remove(old);
        }
        Ok(())
    }
}
