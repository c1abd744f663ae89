//! Error types for hdfury.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Connection-level, protocol-level, and
//! caller-validation failures are all captured here.

/// The error type for all hdfury operations.
///
/// The variants fall into four families that drive the client's recovery
/// policy: connection errors and timeouts are retried once after a forced
/// disconnect, protocol errors disconnect and propagate, and validation
/// errors are raised before the socket is touched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Establishing the TCP connection failed (refused, unreachable, or
    /// the dial did not complete within the connect timeout).
    #[error("connection error: {0}")]
    Connection(String),

    /// An established connection was reset, aborted, or closed by the peer.
    #[error("connection lost")]
    ConnectionLost,

    /// Timed out waiting for a reply line from the device.
    ///
    /// The device drops idle sockets without a close handshake, so a stale
    /// socket usually shows up as a timeout rather than a reset.
    #[error("timeout waiting for response")]
    Timeout,

    /// The device replied with something that is not a valid reply line.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An invalid argument was passed to a command builder.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested operation is not offered by this device model.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// No connection to the device has been established.
    #[error("not connected")]
    NotConnected,

    /// The session was stopped before a queued command could complete.
    #[error("session stopped")]
    SessionStopped,

    /// A device configuration could not be read or written.
    #[error("configuration error: {0}")]
    Config(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for read timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }

    /// True for failures of the link itself: dial failures, resets, broken
    /// pipes, missing sockets, and raw I/O errors.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::ConnectionLost | Error::NotConnected | Error::Io(_)
        )
    }

    /// True if the client should tear down the socket and try the command
    /// once more.
    pub fn is_retryable(&self) -> bool {
        self.is_timeout() || self.is_connection()
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_connection() {
        let e = Error::Connection("refused: 10.0.0.5:2222".into());
        assert_eq!(e.to_string(), "connection error: refused: 10.0.0.5:2222");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("factory reset mode 4".into());
        assert_eq!(e.to_string(), "invalid parameter: factory reset mode 4");
    }

    #[test]
    fn error_display_unsupported() {
        let e = Error::Unsupported("LED brightness".into());
        assert_eq!(e.to_string(), "unsupported operation: LED brightness");
    }

    #[test]
    fn error_display_session_stopped() {
        assert_eq!(Error::SessionStopped.to_string(), "session stopped");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn retry_classification() {
        assert!(Error::Timeout.is_retryable());
        assert!(Error::ConnectionLost.is_retryable());
        assert!(Error::Connection("x".into()).is_retryable());
        assert!(Error::NotConnected.is_retryable());
        assert!(!Error::Timeout.is_connection());

        assert!(!Error::Protocol("garbage".into()).is_retryable());
        assert!(!Error::InvalidParameter("x".into()).is_retryable());
        assert!(!Error::Unsupported("x".into()).is_retryable());
        assert!(!Error::SessionStopped.is_retryable());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
