//! Operator-triggered shutdown, observed only between poll cycles.

use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::watch;

/// Triggers shutdown. Cheap to clone into signal handlers.
#[derive(Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

/// Observes shutdown from the poll loop.
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn channel() -> (Shutdown, ShutdownSignal) {
        let (sender, receiver) = watch::channel(false);
        (
            Shutdown {
                sender: Arc::new(sender),
            },
            ShutdownSignal { receiver },
        )
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Triggers shutdown on Ctrl-C / SIGINT.
    pub fn install_ctrlc(&self) -> Result<(), ctrlc::Error> {
        let shutdown = self.clone();
        ctrlc::set_handler(move || {
            info!("Interrupt received, stopping after the current cycle");
            shutdown.trigger();
        })
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Sleeps for `duration` or until shutdown is triggered.
    /// Returns true when the sleep was cut short by shutdown.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }

        let triggered = async {
            if self.receiver.wait_for(|triggered| *triggered).await.is_err() {
                // Every trigger handle is gone; only the timer can end the wait.
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = triggered => true,
        }
    }
}
