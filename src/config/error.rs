//! Error types for configuration persistence

use super::Validation;

/// Errors raised by [`ConfigStore`](super::ConfigStore).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The stored document failed validation. A default document has been
    /// written in its place.
    Invalid(Validation),
    /// The storage backend rejected a read, write, remove or rename.
    Storage,
    /// The document does not encode into [`MAX_DOCUMENT_SIZE`](super::MAX_DOCUMENT_SIZE) bytes.
    Encode,
    /// The document already holds [`MAX_KEYS`](super::MAX_KEYS) keys.
    DocumentFull,
    /// A key exceeds [`MAX_KEY_LEN`](super::MAX_KEY_LEN) bytes.
    KeyTooLong,
    /// A value exceeds [`MAX_VALUE_LEN`](super::MAX_VALUE_LEN) bytes.
    ValueTooLong,
    /// The file name leaves no room for the temporary suffix.
    FileNameTooLong,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Invalid(verdict) => defmt::write!(f, "Invalid({})", verdict),
            Error::Storage => defmt::write!(f, "Storage"),
            Error::Encode => defmt::write!(f, "Encode"),
            Error::DocumentFull => defmt::write!(f, "DocumentFull"),
            Error::KeyTooLong => defmt::write!(f, "KeyTooLong"),
            Error::ValueTooLong => defmt::write!(f, "ValueTooLong"),
            Error::FileNameTooLong => defmt::write!(f, "FileNameTooLong"),
        }
    }
}
