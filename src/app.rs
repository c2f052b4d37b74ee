use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tokio::{task::JoinHandle, time::timeout};

use crate::{
    ai::ClassifierClient,
    cli::Command,
    config::AppConfig,
    db::{self, slot::SlotStore},
    domain::{EmergencyRequest, SubmissionKind, SubmissionOutcome},
    gateway::{HttpSink, RemoteSink, SubmissionGateway},
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    tasks::{
        connectivity::{ConnectivityMonitor, ConnectivityProbe, ConnectivityState},
        queue::OfflineQueue,
        sync::SyncWorker,
    },
};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ReliefApp {
    paths: ResolvedPaths,
    store: SlotStore,
    queue: Arc<OfflineQueue>,
    connectivity: Arc<ConnectivityMonitor>,
    probe: ConnectivityProbe,
    gateway: SubmissionGateway,
    classifier: ClassifierClient,
    sync_worker: Arc<SyncWorker>,
    shutdown: Shutdown,
}

impl ReliefApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
        check_connectivity: bool,
    ) -> Result<Self> {
        let pool = db::init_pool(&paths.db_path).await?;
        let store = SlotStore::new(pool);
        let queue = Arc::new(OfflineQueue::new(store.clone()));
        queue.restore().await?;

        let http = Client::builder()
            .user_agent(format!("reliefline/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let classifier = ClassifierClient::new(http.clone(), &config.backend);
        let probe = ConnectivityProbe::new(
            http.clone(),
            config
                .backend
                .base_url
                .join("health")
                .context("invalid health endpoint")?,
            config.connectivity.probe_interval,
            config.connectivity.probe_timeout,
        );
        let initial = if check_connectivity {
            probe.initial_state().await
        } else {
            ConnectivityState::Offline
        };
        let connectivity = Arc::new(ConnectivityMonitor::new(initial));
        tracing::info!(
            target: "app",
            backend = %config.backend.base_url,
            state = ?connectivity.state(),
            pending = queue.len(),
            "reliefline initialized"
        );

        let sink: Arc<dyn RemoteSink> = Arc::new(HttpSink::new(
            http,
            config.backend.base_url.clone(),
            config.backend.request_timeout,
        ));
        let sync_worker = Arc::new(SyncWorker::new(
            queue.clone(),
            sink.clone(),
            connectivity.clone(),
            config.sync.mode,
        ));
        connectivity.register_drain(sync_worker.drain_callback());
        let gateway = SubmissionGateway::new(connectivity.clone(), queue.clone(), sink);

        Ok(Self {
            paths,
            store,
            queue,
            connectivity,
            probe,
            gateway,
            classifier,
            sync_worker,
            shutdown,
        })
    }

    pub async fn execute(self, command: Command) -> Result<()> {
        match command {
            Command::Run => return self.run().await,
            Command::Submit { kind, payload } => self.submit(kind.into(), &payload).await?,
            Command::Classify {
                text,
                location,
                contact,
            } => {
                let request = EmergencyRequest {
                    location,
                    contact_info: contact,
                    ..EmergencyRequest::new(text)
                };
                let verdict = self.classifier.classify(&request).await?;
                if verdict.is_heuristic() {
                    tracing::warn!(target: "app", "backend offline; verdict comes from keyword rules");
                }
                print_json(&verdict)?;
            }
            Command::Batch { file } => {
                let texts = read_batch_file(&file)?;
                let body = self.classifier.classify_batch(&texts).await?;
                print_json(&body)?;
            }
            Command::Health => {
                let report = self.classifier.health().await;
                print_json(&report)?;
                if !report.is_healthy() {
                    tracing::warn!(target: "app", "backend reported unhealthy");
                }
            }
            Command::Queue { clear: true } => {
                let dropped = self.queue.clear().await?;
                println!("discarded {dropped} pending item(s)");
            }
            Command::Queue { clear: false } => {
                let snapshot = self.queue.snapshot();
                println!(
                    "{} pending: {} help request(s), {} field report(s), {} communication(s)",
                    snapshot.pending,
                    snapshot.help_requests,
                    snapshot.field_reports,
                    snapshot.communications
                );
                for entry in self.queue.pending() {
                    println!(
                        "#{} {} queued {} {}",
                        entry.local_id(),
                        entry.kind(),
                        entry.enqueued_at().to_rfc3339(),
                        serde_json::to_string(entry.payload())?
                    );
                }
            }
            Command::Sync => {
                let report = self.sync_worker.run_pass().await?;
                println!(
                    "synced {} of {} pending item(s); {} remaining",
                    report.delivered, report.drained, report.remaining
                );
            }
        }
        self.store.close().await;
        Ok(())
    }

    async fn submit(&self, kind: SubmissionKind, raw: &str) -> Result<()> {
        let payload: Value = serde_json::from_str(raw).context("payload is not valid JSON")?;
        match self.gateway.submit(payload, kind).await? {
            SubmissionOutcome::Delivered(body) => {
                println!("delivered");
                print_json(&body)?;
            }
            SubmissionOutcome::Queued { local_id } => {
                println!("saved offline as #{local_id}; it will sync when the backend is reachable");
            }
            SubmissionOutcome::Rejected { reason } => {
                anyhow::bail!("submission rejected: {reason}");
            }
        }
        Ok(())
    }

    async fn run(self) -> Result<()> {
        let ReliefApp {
            paths,
            store,
            queue,
            connectivity,
            probe,
            gateway: _,
            classifier: _,
            sync_worker,
            shutdown,
        } = self;

        tracing::info!(target: "app", data = %paths.data_dir.display(), "relay started");

        let sync_handle = sync_worker.clone().spawn(shutdown.subscribe());
        let probe_handle = probe.spawn(connectivity.clone(), shutdown.subscribe());

        if connectivity.is_online() && !queue.is_empty() {
            sync_worker.request_sync();
        }

        shutdown.subscribe().notified().await;

        join_within("sync", sync_handle).await;
        join_within("connectivity", probe_handle).await;

        if timeout(SHUTDOWN_TIMEOUT, store.close()).await.is_err() {
            tracing::warn!(
                target: "app",
                "queue storage did not close within {:?}",
                SHUTDOWN_TIMEOUT
            );
        }
        tracing::info!(target: "app", pending = queue.len(), "relay stopped");
        Ok(())
    }
}

async fn join_within(name: &'static str, mut handle: JoinHandle<()>) {
    match timeout(SHUTDOWN_TIMEOUT, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) if err.is_panic() => {
            tracing::error!(target: "app", task = name, "task panicked during shutdown");
        }
        Ok(Err(_)) => {}
        Err(_) => {
            tracing::warn!(
                target: "app",
                task = name,
                "task did not stop within {:?}; aborting",
                SHUTDOWN_TIMEOUT
            );
            handle.abort();
        }
    }
}

fn read_batch_file(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} must contain a JSON array of strings", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_file_must_be_string_array() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"["fire near market", "road blocked"]"#).unwrap();
        assert_eq!(read_batch_file(&good).unwrap().len(), 2);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"texts": []}"#).unwrap();
        assert!(read_batch_file(&bad).is_err());
    }
}
