//! shutdown signalling shared by every long-running loop
//!
//! one ShutdownTrigger, many cloned ShutdownSignals. loops check
//! `is_running()` each iteration and sleep through `sleep()`, which wakes
//! immediately when shutdown is triggered.

use std::time::Duration;
use tokio::sync::watch;

pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownTrigger {
    /// request shutdown; safe to call more than once
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal { rx: self.tx.subscribe() }
    }
}

impl ShutdownSignal {
    pub fn is_running(&self) -> bool {
        !*self.rx.borrow()
    }

    /// resolves once shutdown has been requested
    pub async fn wait(&mut self) {
        // a dropped trigger counts as shutdown too
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }

    /// sleep for `duration`; returns false if shutdown interrupted the sleep
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        let slept = tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.wait() => false,
        };
        slept && self.is_running()
    }
}
