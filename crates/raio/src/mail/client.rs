//! IMAP client for the polled mailbox.

use std::fmt::Debug;
use std::future::Future;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_imap::Session;
use async_native_tls::TlsConnector;
use async_trait::async_trait;
use futures_util::io::{AsyncRead, AsyncWrite};
use futures_util::StreamExt;
use log::{debug, info, warn};
use secrecy::ExposeSecret;

use crate::config::ImapConfig;

use super::error::{MailError, Result};
use super::session::{MailboxConnector, MailboxCredentials, MailboxSession, MailboxStatus, RawMessage};

/// Byte stream an IMAP session can run over, either cleartext TCP or TLS.
trait ImapStream: AsyncRead + AsyncWrite + Unpin + Send + Debug {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + Debug> ImapStream for T {}

type BoxedStream = Box<dyn ImapStream>;

/// Opens IMAP sessions for one set of credentials.
pub struct ImapConnector {
    credentials: MailboxCredentials,
    use_tls: bool,
    accept_invalid_certs: bool,
    search: String,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl ImapConnector {
    /// Creates a connector from the `[imap]` section and resolved credentials.
    pub fn new(config: &ImapConfig, credentials: MailboxCredentials) -> Self {
        Self {
            credentials,
            use_tls: config.tls,
            accept_invalid_certs: config.accept_invalid_certs,
            search: config.search.clone(),
            connect_timeout: config.connect_timeout(),
            command_timeout: config.command_timeout(),
        }
    }

    async fn connect_stream(&self) -> Result<BoxedStream> {
        let addr = self.credentials.address();
        let connect_timeout = self.connect_timeout;

        info!("Connecting to IMAP server at {}", addr);

        let std_stream =
            connect_blocking(connect_timeout, move || connect_tcp(&addr, connect_timeout)).await?;
        std_stream
            .set_nonblocking(true)
            .map_err(|e| MailError::ConnectionFailed(e.to_string()))?;
        let tcp_stream = async_io::Async::new(std_stream)
            .map_err(|e| MailError::ConnectionFailed(e.to_string()))?;

        if !self.use_tls {
            warn!(
                "TLS disabled for {}; credentials are sent in cleartext",
                self.credentials.server
            );
            return Ok(Box::new(tcp_stream));
        }

        if self.accept_invalid_certs {
            warn!("Certificate verification disabled for {}", self.credentials.server);
        }

        let tls = TlsConnector::new()
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .danger_accept_invalid_hostnames(self.accept_invalid_certs);
        let tls_stream = with_timeout(connect_timeout, "TLS handshake", async {
            tls.connect(&self.credentials.server, tcp_stream)
                .await
                .map_err(MailError::from)
        })
        .await?;

        Ok(Box::new(tls_stream))
    }
}

#[async_trait]
impl MailboxConnector for ImapConnector {
    type Session = ImapSession;

    async fn open(&self) -> Result<ImapSession> {
        let stream = self.connect_stream().await?;
        let client = async_imap::Client::new(stream);

        let session = with_timeout(self.connect_timeout, "LOGIN", async {
            client
                .login(&self.credentials.user, self.credentials.secret.expose_secret())
                .await
                .map_err(|(e, _)| MailError::AuthenticationFailed(e.to_string()))
        })
        .await?;

        info!("Authenticated to IMAP server as {}", self.credentials.user);

        Ok(ImapSession {
            session: Some(session),
            search: self.search.clone(),
            command_timeout: self.command_timeout,
            selected: None,
        })
    }
}

/// An authenticated IMAP session.
pub struct ImapSession {
    session: Option<Session<BoxedStream>>,
    search: String,
    command_timeout: Duration,
    selected: Option<String>,
}

impl ImapSession {
    fn session(&mut self) -> Result<&mut Session<BoxedStream>> {
        self.session.as_mut().ok_or(MailError::NotConnected)
    }

    /// Checks if the session is still open.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

#[async_trait]
impl MailboxSession for ImapSession {
    async fn select_mailbox(&mut self, name: &str) -> Result<MailboxStatus> {
        let limit = self.command_timeout;
        let session = self.session()?;

        info!("Selecting folder: {}", name);

        let mailbox = with_timeout(limit, "SELECT", async {
            session.select(name).await.map_err(|e| match e {
                async_imap::error::Error::No(_) => MailError::FolderNotFound(name.to_string()),
                other => MailError::ProtocolError(other.to_string()),
            })
        })
        .await?;

        debug!(
            "Folder '{}' selected: {} messages, UIDVALIDITY={:?}",
            name, mailbox.exists, mailbox.uid_validity
        );

        self.selected = Some(name.to_string());
        Ok(MailboxStatus {
            exists: mailbox.exists,
            uid_validity: mailbox.uid_validity,
        })
    }

    async fn list_all_message_ids(&mut self) -> Result<Vec<u32>> {
        let limit = self.command_timeout;
        let query = self.search.clone();
        let session = self.session()?;

        debug!("Searching with query: {}", query);

        let uids = with_timeout(limit, "UID SEARCH", async {
            session
                .uid_search(&query)
                .await
                .map_err(|e| MailError::ProtocolError(e.to_string()))
        })
        .await?;

        // The server answers with a set; ascending UID order is arrival order.
        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();

        debug!("Found {} messages matching search", uid_list.len());
        Ok(uid_list)
    }

    async fn fetch_raw_message(&mut self, uid: u32) -> Result<RawMessage> {
        let limit = self.command_timeout;
        let session = self.session()?;

        debug!("Fetching email with UID {}", uid);

        with_timeout(limit, "UID FETCH", async {
            // BODY.PEEK[] leaves the \Seen flag untouched.
            let mut messages = session
                .uid_fetch(uid.to_string(), "(UID BODY.PEEK[])")
                .await
                .map_err(|e| MailError::ProtocolError(e.to_string()))?;

            let mut raw = None;
            while let Some(message_result) = messages.next().await {
                let message = message_result.map_err(|e| MailError::ProtocolError(e.to_string()))?;
                if raw.is_some() {
                    continue;
                }
                if let Some(body) = message.body() {
                    raw = Some(RawMessage {
                        uid: message.uid.unwrap_or(uid),
                        bytes: body.to_vec(),
                    });
                }
            }

            raw.ok_or_else(|| {
                MailError::ProtocolError(format!("Message with UID {} not found", uid))
            })
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        let limit = self.command_timeout;
        let was_selected = self.selected.take().is_some();

        if let Some(mut session) = self.session.take() {
            info!("Disconnecting from IMAP server");

            if was_selected {
                let closed = with_timeout(limit, "CLOSE", async {
                    session
                        .close()
                        .await
                        .map_err(|e| MailError::ProtocolError(e.to_string()))
                })
                .await;
                if let Err(e) = closed {
                    warn!("Failed to close folder: {}", e);
                }
            }

            with_timeout(limit, "LOGOUT", async {
                session
                    .logout()
                    .await
                    .map_err(|e| MailError::ProtocolError(e.to_string()))
            })
            .await?;
        }
        Ok(())
    }
}

impl Drop for ImapSession {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("ImapSession dropped without explicit close - connection will be reset");
        }
    }
}

/// Resolves `addr` and connects to the first address that accepts.
fn connect_tcp(addr: &str, limit: Duration) -> Result<TcpStream> {
    let candidates = addr
        .to_socket_addrs()
        .map_err(|e| MailError::ConnectionFailed(format!("failed to resolve {}: {}", addr, e)))?;

    let mut last_error = None;
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, limit) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Connection to {} failed: {}", candidate, e);
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            MailError::Timeout(format!("connect to {} after {}s", addr, limit.as_secs()))
        }
        Some(e) => MailError::ConnectionFailed(format!("{}: {}", addr, e)),
        None => MailError::ConnectionFailed(format!("no addresses found for {}", addr)),
    })
}

/// Runs a blocking resolve-and-connect off the runtime, bounded by `limit`
/// so a stalled DNS lookup cannot hold up the cycle.
async fn connect_blocking<F>(limit: Duration, connect: F) -> Result<TcpStream>
where
    F: FnOnce() -> Result<TcpStream> + Send + 'static,
{
    with_timeout(limit, "connect", async move {
        tokio::task::spawn_blocking(connect)
            .await
            .map_err(|e| MailError::ConnectionFailed(e.to_string()))?
    })
    .await
}

async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(MailError::Timeout(format!(
            "{} after {}s",
            operation,
            limit.as_secs()
        ))),
    }
}
