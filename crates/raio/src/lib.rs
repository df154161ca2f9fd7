pub mod config;
pub mod dispatch;
pub mod error;
pub mod mail;
pub mod poll;
pub mod secrets;
pub mod storage;
pub mod telemetry;

pub use config::{load_config, load_or_setup, Config, PollMode};
pub use dispatch::{CommandPresenter, Dispatcher, Presenter, PresenterError};
pub use error::{ConfigError, RaioError, Result, StorageError};
pub use mail::{
    Attachment, ImapConnector, MailError, MailboxConnector, MailboxCredentials, MailboxSession,
    MessageExtractor, ParsedMessage,
};
pub use poll::{CycleReport, Poller, Shutdown};
pub use secrets::{resolve_secret, SecretError};
