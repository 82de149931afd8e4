//! Proactive background token renewal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::credential::manager::CredentialManager;

/// Periodically refreshes a credential so foreground calls rarely wait.
pub struct RenewalTask {
    manager: Arc<CredentialManager>,
    interval: Duration,
}

impl RenewalTask {
    pub fn new(manager: Arc<CredentialManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    /// Run until `shutdown` fires. The first refresh happens immediately.
    ///
    /// Refresh failures are logged and the loop keeps going.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Token renewal loop starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.manager.refresh().await {
                        tracing::warn!(
                            error = %e,
                            next_attempt_in = ?self.interval,
                            "Scheduled token renewal failed"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Token renewal loop received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl CredentialManager {
    /// Spawn the renewal loop for this credential on the current runtime.
    pub fn spawn_renewal(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let task = RenewalTask::new(self.clone(), interval);
        tokio::spawn(task.run(shutdown))
    }
}
