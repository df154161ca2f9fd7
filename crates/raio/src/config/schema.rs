use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub imap: ImapConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub attachments: AttachmentsConfig,
    #[serde(default)]
    pub presenter: PresenterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapConfig {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub email: String,
    /// Plain-text password. Prefer `password_file` or `password_env_var`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env_var: Option<String>,
    #[serde(default = "default_true")]
    pub tls: bool,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    #[serde(default = "default_search")]
    pub search: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl ImapConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn default_port() -> u16 {
    993
}

fn default_true() -> bool {
    true
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

fn default_search() -> String {
    "ALL".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_command_timeout() -> u64 {
    60
}

/// Which messages a poll cycle hands to the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollMode {
    /// Every cycle reprocesses every message returned by the search.
    #[default]
    Replay,
    /// Only messages with a UID above the highest one processed during this run.
    NewOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub mode: PollMode,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_interval() -> u64 {
    30
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            mode: PollMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentsConfig {
    #[serde(default = "default_attachments_dir")]
    pub directory: PathBuf,
}

fn default_attachments_dir() -> PathBuf {
    PathBuf::from("attachments")
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            directory: default_attachments_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenterConfig {
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments passed to `program`; `{path}` and `{seconds}` are substituted.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_display_secs")]
    pub display_secs: u64,
}

impl PresenterConfig {
    pub fn display_duration(&self) -> Duration {
        Duration::from_secs(self.display_secs)
    }
}

fn default_program() -> String {
    "sudo".to_string()
}

fn default_args() -> Vec<String> {
    ["fbi", "-T", "1", "-a", "-t", "{seconds}", "{path}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_display_secs() -> u64 {
    1
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            display_secs: default_display_secs(),
        }
    }
}
