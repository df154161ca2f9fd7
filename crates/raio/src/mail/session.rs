//! Mailbox session abstraction used by the poll loop.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::config::ImapConfig;
use crate::secrets::resolve_secret;

use super::error::{MailError, Result};

/// Connection details for one mailbox, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct MailboxCredentials {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub secret: SecretString,
}

impl MailboxCredentials {
    /// Builds credentials from the `[imap]` section, resolving the password source.
    pub fn from_config(config: &ImapConfig) -> Result<Self> {
        if config.password.is_some() {
            log::warn!(
                "Using a plain-text password from the config file. \
                 Consider password_file or password_env_var instead."
            );
        }

        let secret = resolve_secret(
            config.password.as_deref(),
            config.password_file.as_deref(),
            config.password_env_var.as_deref(),
        )
        .map_err(|e| MailError::CredentialsNotFound(e.to_string()))?;

        Ok(Self {
            server: config.server.clone(),
            port: config.port,
            user: config.email.clone(),
            secret,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

/// A fetched message as returned by the server.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub uid: u32,
    pub bytes: Vec<u8>,
}

/// State of the selected folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages in the folder.
    pub exists: u32,
    pub uid_validity: Option<u32>,
}

/// Opens authenticated sessions against one mailbox.
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    type Session: MailboxSession;

    /// Connects and authenticates.
    async fn open(&self) -> Result<Self::Session>;
}

/// One authenticated connection to the mailbox.
#[async_trait]
pub trait MailboxSession: Send {
    /// Selects the folder used by the following calls.
    async fn select_mailbox(&mut self, name: &str) -> Result<MailboxStatus>;

    /// Lists the UIDs of every message matching the search criteria, in server order.
    async fn list_all_message_ids(&mut self) -> Result<Vec<u32>>;

    /// Fetches the full message for one UID.
    async fn fetch_raw_message(&mut self, uid: u32) -> Result<RawMessage>;

    /// Releases the connection.
    async fn close(&mut self) -> Result<()>;
}
