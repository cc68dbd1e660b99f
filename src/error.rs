use std::fmt::{Display, Formatter};
use std::io;
use thiserror::Error;

/// A tracer error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A tracer error.
///
/// An unanswered hop is not an error; the prober reports it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unexpected protocol: {0}")]
    UnexpectedProtocol(u8),
    #[error("Truncated datagram: {0} bytes")]
    Truncated(usize),
    #[error("Permission error. Try with sudo.")]
    PermissionDenied,
    #[error("Keyboard interrupt")]
    Interrupted,
    #[error("Could not resolve destination: {0}")]
    Unresolved(String),
    #[error("Failed to {op}: {source}")]
    Io {
        op: IoOperation,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Wrap a socket error, lifting privilege failures into [`Error::PermissionDenied`].
    pub fn io(source: io::Error, op: IoOperation) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io { op, source },
        }
    }

    /// Process exit status for a run that ended with this error.
    ///
    /// Privilege, interrupt and protocol stops are clean exits; resolution and I/O failures are
    /// not.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::PermissionDenied
            | Self::Interrupted
            | Self::UnexpectedProtocol(_)
            | Self::Truncated(_) => 0,
            Self::Unresolved(_) | Self::Io { .. } => 1,
        }
    }

    /// The single line shown to the user; an interrupt starts on a fresh line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Interrupted => format!("\n{self}"),
            _ => self.to_string(),
        }
    }
}

/// Socket operation that failed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IoOperation {
    NewSocket,
    SetTtl,
    Bind,
    SetReadTimeout,
    SendTo,
    RecvFrom,
}

impl Display for IoOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewSocket => write!(f, "create raw socket"),
            Self::SetTtl => write!(f, "set TTL"),
            Self::Bind => write!(f, "bind receive socket"),
            Self::SetReadTimeout => write!(f, "set read timeout"),
            Self::SendTo => write!(f, "send probe"),
            Self::RecvFrom => write!(f, "receive response"),
        }
    }
}
