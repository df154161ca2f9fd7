//! External capability that shows an image on the display.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use thiserror::Error;

use crate::config::PresenterConfig;

/// Errors from presenting an image.
#[derive(Error, Debug)]
pub enum PresenterError {
    /// The presenter command could not be started.
    #[error("Failed to start presenter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The presenter command ran but reported failure.
    #[error("Presenter '{program}' failed for '{path}' with exit code {code:?}")]
    NonZeroExit {
        program: String,
        path: PathBuf,
        code: Option<i32>,
    },
}

/// Shows one image for the given duration and returns when done.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn present(&self, path: &Path, duration: Duration) -> Result<(), PresenterError>;
}

/// Runs a configured command, e.g. `sudo fbi -T 1 -a -t {seconds} {path}`.
pub struct CommandPresenter {
    program: String,
    args: Vec<String>,
}

impl CommandPresenter {
    pub fn new(config: &PresenterConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    /// Substitutes `{path}` and `{seconds}` in every argument.
    fn build_args(&self, path: &Path, duration: Duration) -> Vec<String> {
        let path = path.to_string_lossy();
        let seconds = duration.as_secs().max(1).to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{path}", &path).replace("{seconds}", &seconds))
            .collect()
    }
}

#[async_trait]
impl Presenter for CommandPresenter {
    async fn present(&self, path: &Path, duration: Duration) -> Result<(), PresenterError> {
        let args = self.build_args(path, duration);
        debug!("Running presenter: {} {}", self.program, args.join(" "));

        let status = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| PresenterError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !status.success() {
            return Err(PresenterError::NonZeroExit {
                program: self.program.clone(),
                path: path.to_path_buf(),
                code: status.code(),
            });
        }

        Ok(())
    }
}
