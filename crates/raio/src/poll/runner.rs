//! Poll cycle orchestration: open → select → list → fetch/extract/dispatch → close.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tracing::{info_span, Instrument};

use crate::config::{Config, PollMode};
use crate::dispatch::{Dispatcher, Presenter};
use crate::mail::error::Result;
use crate::mail::{MailboxConnector, MailboxSession, MessageExtractor, UidTracker};
use crate::storage::AttachmentStore;

/// The two states of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Idle,
}

/// Summary of one completed poll cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// UIDs returned by the search.
    pub listed: usize,
    /// Messages fetched, extracted and dispatched.
    pub processed: usize,
    /// UIDs left out because they were already processed (new-only mode).
    pub skipped: usize,
    /// Messages that failed to fetch or parse.
    pub failed: usize,
    /// Attachments stored across all processed messages.
    pub attachments: usize,
}

impl CycleReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            listed: 0,
            processed: 0,
            skipped: 0,
            failed: 0,
            attachments: 0,
        }
    }
}

/// Polls one mailbox and feeds every message to the extractor and dispatcher.
pub struct Poller<C, P> {
    connector: C,
    extractor: MessageExtractor,
    dispatcher: Dispatcher<P>,
    mailbox: String,
    interval: Duration,
    tracker: Option<UidTracker>,
    state: PollState,
}

impl<C, P> Poller<C, P>
where
    C: MailboxConnector,
    P: Presenter,
{
    pub fn new(config: &Config, connector: C, presenter: P) -> Self {
        let tracker = match config.poll.mode {
            PollMode::Replay => None,
            PollMode::NewOnly => Some(UidTracker::new()),
        };

        Self {
            connector,
            extractor: MessageExtractor::new(AttachmentStore::new(&config.attachments.directory)),
            dispatcher: Dispatcher::new(presenter, config.presenter.display_duration()),
            mailbox: config.imap.mailbox.clone(),
            interval: config.poll.interval(),
            tracker,
            state: PollState::Idle,
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn dispatcher(&self) -> &Dispatcher<P> {
        &self.dispatcher
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Runs cycles until `shutdown` fires. Shutdown is only honoured while idle,
    /// so a cycle in progress always finishes and closes its session.
    pub async fn run(&mut self, mut shutdown: crate::poll::ShutdownSignal) {
        info!(
            "Polling '{}' every {}s",
            self.mailbox,
            self.interval.as_secs()
        );

        while !shutdown.is_triggered() {
            // A failed cycle is logged and retried after the next interval.
            match self.run_cycle().await {
                Ok(report) => info!(
                    "Cycle complete: {} listed, {} processed, {} skipped, {} failed, {} attachments",
                    report.listed,
                    report.processed,
                    report.skipped,
                    report.failed,
                    report.attachments
                ),
                Err(e) => error!("Poll cycle failed: {}", e),
            }

            debug!("Idle for {}s", self.interval.as_secs());
            if shutdown.sleep(self.interval).await {
                break;
            }
        }

        info!("Poll loop stopped");
    }

    /// Runs a single poll cycle.
    ///
    /// Errors are cycle-level failures (open, select, search, or a broken
    /// connection). Failures of single messages only show up in the report.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.state = PollState::Polling;
        let result = self.cycle().instrument(info_span!("poll_cycle")).await;
        self.state = PollState::Idle;
        result
    }

    async fn cycle(&mut self) -> Result<CycleReport> {
        info!("Checking mailbox '{}'", self.mailbox);
        let mut report = CycleReport::new();

        let mut session = self.connector.open().await?;
        let result = self.process_session(&mut session, &mut report).await;

        // Closing is attempted whatever happened above.
        if let Err(e) = session.close().await {
            warn!("Failed to close mailbox session: {}", e);
        }

        result.map(|()| report)
    }

    async fn process_session(
        &mut self,
        session: &mut C::Session,
        report: &mut CycleReport,
    ) -> Result<()> {
        let status = session.select_mailbox(&self.mailbox).await?;
        let mut uids = session.list_all_message_ids().await?;
        report.listed = uids.len();

        if let Some(tracker) = self.tracker.as_mut() {
            tracker.observe_uid_validity(status.uid_validity);
            uids = tracker.filter_unprocessed(uids);
            report.skipped = report.listed - uids.len();
        }

        info!(
            "{} messages in '{}', {} to process",
            status.exists,
            self.mailbox,
            uids.len()
        );

        for uid in uids {
            let processed = self
                .process_message(session, uid)
                .instrument(info_span!("message", uid))
                .await;

            match processed {
                Ok(attachments) => {
                    report.processed += 1;
                    report.attachments += attachments;
                    if let Some(tracker) = self.tracker.as_mut() {
                        tracker.mark_processed(uid);
                    }
                }
                Err(e) if e.is_session_fatal() => {
                    report.failed += 1;
                    error!("Connection lost while processing UID {}: {}", uid, e);
                    return Err(e);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to process email UID {}: {}", uid, e);
                }
            }
        }

        Ok(())
    }

    /// Fetches, extracts and dispatches one message. Returns its attachment count.
    async fn process_message(&self, session: &mut C::Session, uid: u32) -> Result<usize> {
        info!("Processing email with UID: {}", uid);

        let raw = session.fetch_raw_message(uid).await?;
        let extraction = self.extractor.extract(&raw.bytes, raw.uid)?;

        for failure in &extraction.failures {
            warn!(
                "Skipped part {} of UID {}: {}",
                failure.part_index, raw.uid, failure.error
            );
        }

        let message = extraction.message;
        info!("From: {}", message.sender);
        info!("Subject: {}", message.subject);
        info!("Body: {}", message.body);

        let dispatch = self.dispatcher.dispatch_all(&message.attachments).await;
        debug!(
            "UID {}: {} presented, {} logged, {} handler failures",
            raw.uid,
            dispatch.presented,
            dispatch.logged,
            dispatch.failures.len()
        );

        Ok(message.attachments.len())
    }
}
