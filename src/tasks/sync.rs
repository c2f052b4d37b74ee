use std::sync::Arc;

use anyhow::Result;
use tokio::{sync::Notify, task::JoinHandle};

use crate::{
    config::SyncMode,
    gateway::RemoteSink,
    infrastructure::shutdown::ShutdownListener,
    tasks::{
        connectivity::{ConnectivityMonitor, DrainCallback},
        queue::OfflineQueue,
    },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries taken into this pass.
    pub drained: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Entries still queued after the pass.
    pub remaining: usize,
}

/// Replays the offline queue against the backend whenever it is triggered.
pub struct SyncWorker {
    queue: Arc<OfflineQueue>,
    sink: Arc<dyn RemoteSink>,
    connectivity: Arc<ConnectivityMonitor>,
    mode: SyncMode,
    trigger: Arc<Notify>,
}

impl SyncWorker {
    pub fn new(
        queue: Arc<OfflineQueue>,
        sink: Arc<dyn RemoteSink>,
        connectivity: Arc<ConnectivityMonitor>,
        mode: SyncMode,
    ) -> Self {
        Self {
            queue,
            sink,
            connectivity,
            mode,
            trigger: Arc::new(Notify::new()),
        }
    }

    /// Callback for [`ConnectivityMonitor::register_drain`]. Triggers are
    /// coalesced while a pass is running.
    pub fn drain_callback(&self) -> DrainCallback {
        let trigger = self.trigger.clone();
        Arc::new(move || trigger.notify_one())
    }

    pub fn request_sync(&self) {
        self.trigger.notify_one();
    }

    pub fn spawn(self: Arc<Self>, mut shutdown: ShutdownListener) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if shutdown.is_triggered() {
                    break;
                }
                tokio::select! {
                    _ = self.trigger.notified() => {}
                    _ = shutdown.notified() => break,
                }
                if let Err(err) = self.run_pass().await {
                    tracing::error!(target: "sync", error = %err, "sync pass failed");
                }
            }
            tracing::info!(target: "sync", "sync worker stopped");
        })
    }

    /// Delivers what is queued right now. Entries enqueued during the pass
    /// wait for the next one.
    pub async fn run_pass(&self) -> Result<SyncReport> {
        if self.queue.is_empty() {
            return Ok(SyncReport::default());
        }
        let report = match self.mode {
            SyncMode::Confirmed => self.confirmed_pass().await?,
            SyncMode::Optimistic => self.optimistic_pass().await?,
        };
        tracing::info!(
            target: "sync",
            drained = report.drained,
            delivered = report.delivered,
            failed = report.failed,
            remaining = report.remaining,
            "sync pass finished"
        );
        Ok(report)
    }

    async fn confirmed_pass(&self) -> Result<SyncReport> {
        let batch = self.queue.pending();
        let mut report = SyncReport {
            drained: batch.len(),
            ..Default::default()
        };

        for entry in &batch {
            if !self.connectivity.is_online() {
                tracing::info!(target: "sync", "went offline mid-pass; stopping");
                break;
            }
            match self.sink.deliver(entry.kind(), entry.payload()).await {
                Ok(_) => {
                    self.queue.remove(entry.local_id()).await?;
                    report.delivered += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        target: "sync",
                        local_id = entry.local_id(),
                        error = %err,
                        "delivery failed; keeping entry queued"
                    );
                    report.failed += 1;
                    break;
                }
            }
        }

        report.remaining = self.queue.len();
        Ok(report)
    }

    async fn optimistic_pass(&self) -> Result<SyncReport> {
        let batch = self.queue.drain().await?;
        let mut report = SyncReport {
            drained: batch.len(),
            ..Default::default()
        };

        for entry in &batch {
            match self.sink.deliver(entry.kind(), entry.payload()).await {
                Ok(_) => report.delivered += 1,
                Err(err) => {
                    tracing::error!(
                        target: "sync",
                        local_id = entry.local_id(),
                        error = %err,
                        "delivery failed after drain; entry dropped"
                    );
                    report.failed += 1;
                }
            }
        }

        report.remaining = self.queue.len();
        Ok(report)
    }
}
