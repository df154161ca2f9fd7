pub mod loader;
pub mod schema;
pub mod setup;

pub use loader::{load_config, load_config_from_str, load_or_setup, save_config};
pub use schema::{
    AttachmentsConfig, Config, ImapConfig, PollConfig, PollMode, PresenterConfig,
};
