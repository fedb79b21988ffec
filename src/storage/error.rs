//! Common error types for storage operations

/// A common error type for file storage operations.
///
/// This enum defines the errors a flat-namespace file store can report. It is
/// designed to be simple and portable for `no_std` environments.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// No file with the requested name exists.
    NotFound,
    /// The file name exceeds the backend's name limit.
    NameTooLong,
    /// The backend has no room for the file or its contents.
    OutOfSpace,
    /// The destination buffer is smaller than the file.
    BufferTooSmall,
    /// An error occurred during a read operation.
    ReadError,
    /// An error occurred during a write operation.
    WriteError,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotFound => defmt::write!(f, "NotFound"),
            Error::NameTooLong => defmt::write!(f, "NameTooLong"),
            Error::OutOfSpace => defmt::write!(f, "OutOfSpace"),
            Error::BufferTooSmall => defmt::write!(f, "BufferTooSmall"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::WriteError => defmt::write!(f, "WriteError"),
        }
    }
}
