use std::fmt::{Display, Formatter};

/// The caller-visible class of a recoverable error.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// The operation is not valid in the current state, e.g. a second dequeue
    /// without an intervening queue or cancel.
    InvalidState,
    /// The buffer pool is empty.
    NoBuffer,
    /// The window behind a proxy has been destroyed.
    StaleReference,
    /// The display is not initialized or has been torn down.
    NotReady,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidState => "invalid state",
            Self::NoBuffer => "no buffer",
            Self::StaleReference => "stale reference",
            Self::NotReady => "not ready",
        };
        f.write_str(s)
    }
}
