//! Shared stubs for the poll loop integration tests.
//!
//! - `StubConnector` / `StubSession`: an in-memory mailbox with scripted failures
//! - `RecordingPresenter`: records every image it is asked to show
//! - message builders for plain and image-carrying emails

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use raio::config::load_config_from_str;
use raio::mail::error::Result;
use raio::mail::{MailboxConnector, MailboxSession, MailboxStatus, RawMessage};
use raio::{Config, MailError, Presenter, PresenterError, Shutdown};

/// PNG signature bytes; routing only looks at the file extension.
pub const PNG_BASE64: &str = "iVBORw0KGgo=";

pub fn test_config(attachments_dir: &Path, mode: &str) -> Config {
    let mut config = load_config_from_str(&format!(
        r#"
        [imap]
        server = "imap.test"
        email = "frame@test"
        password = "pw"

        [poll]
        interval_secs = 30
        mode = "{}"

        [presenter]
        program = "unused"
        display_secs = 1
        "#,
        mode
    ))
    .expect("valid test config");
    config.attachments.directory = attachments_dir.to_path_buf();
    config
}

pub fn plain_message(subject: &str, body: &str) -> Vec<u8> {
    format!(
        "From: sender@test\r\n\
         Subject: {}\r\n\
         Content-Type: text/plain\r\n\r\n\
         {}\r\n",
        subject, body
    )
    .into_bytes()
}

pub fn message_with_image(body: &str, filename: &str) -> Vec<u8> {
    format!(
        "From: Alice <alice@test>\r\n\
         Subject: Picture\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"B0UND\"\r\n\r\n\
         --B0UND\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\r\n\
         {}\r\n\
         --B0UND\r\n\
         Content-Type: image/png\r\n\
         Content-Disposition: attachment; filename=\"{}\"\r\n\
         Content-Transfer-Encoding: base64\r\n\r\n\
         {}\r\n\
         --B0UND--\r\n",
        body, filename, PNG_BASE64
    )
    .into_bytes()
}

/// Failure a scripted fetch should produce.
#[derive(Debug, Clone, Copy)]
pub enum FetchFailure {
    /// Message vanished between search and fetch.
    Stale,
    /// The connection stopped answering.
    Timeout,
}

#[derive(Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub fetches: AtomicUsize,
}

pub struct StubConnector {
    messages: Vec<(u32, Vec<u8>)>,
    fetch_failures: HashMap<u32, FetchFailure>,
    open_failures: Mutex<VecDeque<MailError>>,
    missing_folder: bool,
    shutdown_on_open: Option<(usize, Shutdown)>,
    pub counters: Arc<Counters>,
}

impl StubConnector {
    pub fn new(messages: Vec<(u32, Vec<u8>)>) -> Self {
        Self {
            messages,
            fetch_failures: HashMap::new(),
            open_failures: Mutex::new(VecDeque::new()),
            missing_folder: false,
            shutdown_on_open: None,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn failing_fetch(mut self, uid: u32, failure: FetchFailure) -> Self {
        self.fetch_failures.insert(uid, failure);
        self
    }

    /// The next `open` calls fail with these errors, in order.
    pub fn failing_open(self, error: MailError) -> Self {
        self.open_failures.lock().unwrap().push_back(error);
        self
    }

    pub fn missing_folder(mut self) -> Self {
        self.missing_folder = true;
        self
    }

    /// Triggers `shutdown` when `open` is called for the `nth` time (1-based).
    pub fn shutdown_on_open(mut self, nth: usize, shutdown: Shutdown) -> Self {
        self.shutdown_on_open = Some((nth, shutdown));
        self
    }

    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailboxConnector for StubConnector {
    type Session = StubSession;

    async fn open(&self) -> Result<StubSession> {
        let opened = self.counters.opens.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((nth, shutdown)) = &self.shutdown_on_open {
            if *nth == opened {
                shutdown.trigger();
            }
        }

        if let Some(error) = self.open_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        Ok(StubSession {
            messages: self.messages.clone(),
            fetch_failures: self.fetch_failures.clone(),
            missing_folder: self.missing_folder,
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct StubSession {
    messages: Vec<(u32, Vec<u8>)>,
    fetch_failures: HashMap<u32, FetchFailure>,
    missing_folder: bool,
    counters: Arc<Counters>,
}

#[async_trait]
impl MailboxSession for StubSession {
    async fn select_mailbox(&mut self, name: &str) -> Result<MailboxStatus> {
        if self.missing_folder {
            return Err(MailError::FolderNotFound(name.to_string()));
        }
        Ok(MailboxStatus {
            exists: self.messages.len() as u32,
            uid_validity: Some(1),
        })
    }

    async fn list_all_message_ids(&mut self) -> Result<Vec<u32>> {
        Ok(self.messages.iter().map(|(uid, _)| *uid).collect())
    }

    async fn fetch_raw_message(&mut self, uid: u32) -> Result<RawMessage> {
        self.counters.fetches.fetch_add(1, Ordering::SeqCst);
        match self.fetch_failures.get(&uid) {
            Some(FetchFailure::Stale) => {
                return Err(MailError::ProtocolError(format!(
                    "Message with UID {} not found",
                    uid
                )))
            }
            Some(FetchFailure::Timeout) => {
                return Err(MailError::Timeout("UID FETCH after 60s".to_string()))
            }
            None => {}
        }

        self.messages
            .iter()
            .find(|(id, _)| *id == uid)
            .map(|(id, bytes)| RawMessage {
                uid: *id,
                bytes: bytes.clone(),
            })
            .ok_or_else(|| MailError::ProtocolError(format!("Message with UID {} not found", uid)))
    }

    async fn close(&mut self) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Presenter stub that records every call.
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    calls: Arc<Mutex<Vec<(PathBuf, Duration)>>>,
}

impl RecordingPresenter {
    pub fn calls(&self) -> Vec<(PathBuf, Duration)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn present(&self, path: &Path, duration: Duration) -> std::result::Result<(), PresenterError> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), duration));
        Ok(())
    }
}
