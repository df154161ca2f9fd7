use std::time::Duration;

use log::{error, info};

use crate::mail::Attachment;

use super::presenter::{Presenter, PresenterError};

/// Handler an attachment is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Shown on the display.
    Present,
    /// Only logged.
    LogOnly,
}

impl Route {
    /// Routes on the extension-sniffed mime type; an unknown type is log-only.
    pub fn for_attachment(attachment: &Attachment) -> Self {
        match attachment.mime_type.as_deref() {
            Some(mime) if mime.starts_with("image/") => Route::Present,
            _ => Route::LogOnly,
        }
    }
}

/// Outcome of dispatching all attachments of one message.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub presented: usize,
    pub logged: usize,
    /// Stored file name and error of every attachment whose handler failed.
    pub failures: Vec<(String, PresenterError)>,
}

pub struct Dispatcher<P> {
    presenter: P,
    display: Duration,
}

impl<P: Presenter> Dispatcher<P> {
    pub fn new(presenter: P, display: Duration) -> Self {
        Self { presenter, display }
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Hands one attachment to its handler.
    ///
    /// Images block for the display duration after the presenter returns, even
    /// when it failed, so images never flash faster than that on the display.
    pub async fn dispatch(&self, attachment: &Attachment) -> Result<Route, PresenterError> {
        let route = Route::for_attachment(attachment);
        match route {
            Route::Present => {
                info!("Got image {}", attachment.filename);
                let outcome = self
                    .presenter
                    .present(&attachment.stored_path, self.display)
                    .await;
                tokio::time::sleep(self.display).await;
                outcome?;
            }
            Route::LogOnly => {
                info!(
                    "Got attachment {} of type {}",
                    attachment.filename,
                    attachment.mime_type.as_deref().unwrap_or("unknown")
                );
            }
        }
        Ok(route)
    }

    /// Dispatches attachments in order; a failed handler does not stop the rest.
    pub async fn dispatch_all(&self, attachments: &[Attachment]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for attachment in attachments {
            match self.dispatch(attachment).await {
                Ok(Route::Present) => report.presented += 1,
                Ok(Route::LogOnly) => report.logged += 1,
                Err(e) => {
                    error!("Failed to present {}: {}", attachment.filename, e);
                    report.failures.push((attachment.filename.clone(), e));
                }
            }
        }

        report
    }
}
