//! Mailbox access error types.

use thiserror::Error;

/// Errors that can occur while talking to the mailbox server or reading its messages.
#[derive(Error, Debug)]
pub enum MailError {
    /// Failed to reach the IMAP server (DNS, TCP).
    #[error("IMAP connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS/SSL error during connection.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// The server rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Failed to resolve the mailbox secret.
    #[error("Credentials not found: {0}")]
    CredentialsNotFound(String),

    /// Unexpected or rejected server response.
    #[error("IMAP protocol error: {0}")]
    ProtocolError(String),

    /// Folder not found.
    #[error("IMAP folder '{0}' not found")]
    FolderNotFound(String),

    /// Failed to parse a fetched message.
    #[error("Failed to parse email: {0}")]
    ParseError(String),

    /// Operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The session was used after it was closed.
    #[error("Not connected")]
    NotConnected,
}

impl MailError {
    /// Returns true for failures that make the whole session unusable.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            MailError::ConnectionFailed(_)
                | MailError::TlsError(_)
                | MailError::Timeout(_)
                | MailError::NotConnected
        )
    }
}

/// Errors for a single MIME part; they never abort the rest of the message.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The part's payload could not be decoded to text or bytes.
    #[error("Failed to decode part: {0}")]
    Decode(String),

    /// The decoded attachment could not be written to disk.
    #[error("Failed to store attachment '{filename}': {source}")]
    Storage {
        filename: String,
        #[source]
        source: crate::error::StorageError,
    },
}

impl From<async_native_tls::Error> for MailError {
    fn from(err: async_native_tls::Error) -> Self {
        MailError::TlsError(err.to_string())
    }
}

/// Result type for mailbox operations.
pub type Result<T> = std::result::Result<T, MailError>;
