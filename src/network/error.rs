//! Error types for connection management

/// Errors reported by [`ConnectionManager`](super::ConnectionManager) operations.
///
/// Collaborator errors are collapsed into [`Error::SessionError`]; the
/// manager's own bookkeeping decides what happens next.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The broker session is not up.
    NotConnected,
    /// The broker session rejected the request.
    SessionError,
    /// A payload could not be encoded.
    EncodeError,
    /// The wireless link rejected a mode change.
    LinkError,
    /// A name or credential does not fit its fixed-capacity field.
    FieldTooLong,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotConnected => defmt::write!(f, "NotConnected"),
            Error::SessionError => defmt::write!(f, "SessionError"),
            Error::EncodeError => defmt::write!(f, "EncodeError"),
            Error::LinkError => defmt::write!(f, "LinkError"),
            Error::FieldTooLong => defmt::write!(f, "FieldTooLong"),
        }
    }
}
