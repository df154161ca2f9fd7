//! Mailbox access and message parsing.
//!
//! This module connects to the polled IMAP mailbox, lists and fetches messages,
//! and splits each fetched message into its text body and attachments.

pub mod client;
pub mod error;
pub mod parser;
pub mod session;
pub mod tracker;

pub use client::{ImapConnector, ImapSession};
pub use error::{ExtractError, MailError};
pub use parser::{Attachment, Extraction, MessageExtractor, ParsedMessage, PartFailure};
pub use session::{MailboxConnector, MailboxCredentials, MailboxSession, MailboxStatus, RawMessage};
pub use tracker::UidTracker;
