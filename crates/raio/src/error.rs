use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaioError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mail(#[from] crate::mail::MailError),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Failed to install shutdown handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Failed to start async runtime: {source}")]
    Runtime {
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config TOML: {0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("Failed to serialize config TOML: {0}")]
    SerializeToml(#[from] toml::ser::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Config file '{0}' not found and no terminal is available for setup")]
    NotInteractive(PathBuf),

    #[error("Failed to read setup answer: {0}")]
    Prompt(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read existing file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RaioError>;
