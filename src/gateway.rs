use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::{
    domain::{SubmissionKind, SubmissionOutcome},
    tasks::{connectivity::ConnectivityMonitor, queue::OfflineQueue},
};

/// Where submissions are delivered when the network is up.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    async fn deliver(&self, kind: SubmissionKind, payload: &Value) -> Result<Value>;
}

/// Posts submissions to `{base_url}/submissions/{kind}`.
pub struct HttpSink {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpSink {
    pub fn new(http: Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            timeout,
        }
    }
}

#[async_trait]
impl RemoteSink for HttpSink {
    async fn deliver(&self, kind: SubmissionKind, payload: &Value) -> Result<Value> {
        let url = self
            .base_url
            .join(&format!("submissions/{}", kind.as_str()))
            .context("invalid submission endpoint")?;
        let response = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

pub struct SubmissionGateway {
    connectivity: Arc<ConnectivityMonitor>,
    queue: Arc<OfflineQueue>,
    sink: Arc<dyn RemoteSink>,
}

impl SubmissionGateway {
    pub fn new(
        connectivity: Arc<ConnectivityMonitor>,
        queue: Arc<OfflineQueue>,
        sink: Arc<dyn RemoteSink>,
    ) -> Self {
        Self {
            connectivity,
            queue,
            sink,
        }
    }

    /// Delivers `payload`, or parks it in the offline queue when the network is
    /// down or the backend refuses it. Only local storage failures are errors.
    pub async fn submit(&self, payload: Value, kind: SubmissionKind) -> Result<SubmissionOutcome> {
        if !payload.is_object() {
            tracing::warn!(target: "gateway", kind = %kind, "rejected non-object payload");
            return Ok(SubmissionOutcome::Rejected {
                reason: "payload must be a JSON object".to_string(),
            });
        }

        if !self.connectivity.is_online() {
            tracing::info!(target: "gateway", kind = %kind, "offline; saving submission for later");
            return self.park(payload, kind).await;
        }

        match self.sink.deliver(kind, &payload).await {
            Ok(body) => {
                tracing::info!(target: "gateway", kind = %kind, "submission delivered");
                Ok(SubmissionOutcome::Delivered(body))
            }
            Err(err) => {
                tracing::warn!(
                    target: "gateway",
                    kind = %kind,
                    error = %err,
                    "delivery failed; saving submission for later"
                );
                self.park(payload, kind).await
            }
        }
    }

    async fn park(&self, payload: Value, kind: SubmissionKind) -> Result<SubmissionOutcome> {
        let entry = self.queue.enqueue(payload, kind).await?;
        Ok(SubmissionOutcome::Queued {
            local_id: entry.local_id(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// In-memory sink that records deliveries and can fail on demand.
    #[derive(Default)]
    pub struct RecordingSink {
        pub delivered: Mutex<Vec<(SubmissionKind, Value)>>,
        pub calls: AtomicUsize,
        pub fail_from_call: Mutex<Option<usize>>,
    }

    impl RecordingSink {
        pub fn failing() -> Self {
            let sink = Self::default();
            *sink.fail_from_call.lock() = Some(0);
            sink
        }

        pub fn failing_from(call: usize) -> Self {
            let sink = Self::default();
            *sink.fail_from_call.lock() = Some(call);
            sink
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteSink for RecordingSink {
        async fn deliver(&self, kind: SubmissionKind, payload: &Value) -> Result<Value> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(from) = *self.fail_from_call.lock() {
                if call >= from {
                    anyhow::bail!("backend unavailable");
                }
            }
            self.delivered.lock().push((kind, payload.clone()));
            Ok(serde_json::json!({ "status": "accepted" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::{testing::RecordingSink, *};
    use crate::{
        config::parse_base_url,
        db::{init_pool, slot::SlotStore},
        tasks::connectivity::ConnectivityState,
    };

    async fn open_queue(path: &Path) -> Arc<OfflineQueue> {
        let pool = init_pool(path).await.unwrap();
        Arc::new(OfflineQueue::new(SlotStore::new(pool)))
    }

    fn gateway(
        state: ConnectivityState,
        queue: Arc<OfflineQueue>,
        sink: Arc<dyn RemoteSink>,
    ) -> SubmissionGateway {
        SubmissionGateway::new(Arc::new(ConnectivityMonitor::new(state)), queue, sink)
    }

    #[tokio::test]
    async fn offline_submission_is_queued_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let queue = open_queue(&dir.path().join("gw.db")).await;
        let sink = Arc::new(RecordingSink::default());
        let gateway = gateway(ConnectivityState::Offline, queue.clone(), sink.clone());

        let before = queue.len();
        let outcome = gateway
            .submit(json!({ "need": "water" }), SubmissionKind::HelpRequest)
            .await
            .unwrap();

        assert!(outcome.is_queued());
        assert_eq!(queue.len(), before + 1);
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test]
    async fn online_submission_is_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let queue = open_queue(&dir.path().join("gw.db")).await;
        let sink = Arc::new(RecordingSink::default());
        let gateway = gateway(ConnectivityState::Online, queue.clone(), sink.clone());

        let outcome = gateway
            .submit(json!({ "status": "road cleared" }), SubmissionKind::FieldReport)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SubmissionOutcome::Delivered(json!({ "status": "accepted" }))
        );
        assert!(queue.is_empty());
        assert_eq!(sink.delivered.lock().len(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_is_queued_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let queue = open_queue(&dir.path().join("gw.db")).await;
        let sink = Arc::new(RecordingSink::failing());
        let gateway = gateway(ConnectivityState::Online, queue.clone(), sink.clone());

        let outcome = gateway
            .submit(json!({ "message": "on our way" }), SubmissionKind::Communication)
            .await
            .unwrap();

        assert!(outcome.is_queued());
        assert_eq!(sink.calls(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn non_object_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let queue = open_queue(&dir.path().join("gw.db")).await;
        let sink = Arc::new(RecordingSink::default());
        let gateway = gateway(ConnectivityState::Offline, queue.clone(), sink.clone());

        let outcome = gateway
            .submit(json!("just a string"), SubmissionKind::HelpRequest)
            .await
            .unwrap();

        assert!(matches!(outcome, SubmissionOutcome::Rejected { .. }));
        assert!(queue.is_empty());
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test]
    async fn http_sink_queues_on_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions/help_request"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let queue = open_queue(&dir.path().join("gw.db")).await;
        let sink = Arc::new(HttpSink::new(
            Client::new(),
            parse_base_url(&server.uri()).unwrap(),
            Duration::from_secs(2),
        ));
        let gateway = gateway(ConnectivityState::Online, queue.clone(), sink);

        let outcome = gateway
            .submit(json!({ "need": "insulin" }), SubmissionKind::HelpRequest)
            .await
            .unwrap();
        assert!(outcome.is_queued());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn http_sink_returns_backend_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions/field_report"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "rep-9" })))
            .mount(&server)
            .await;

        let sink = HttpSink::new(
            Client::new(),
            parse_base_url(&server.uri()).unwrap(),
            Duration::from_secs(2),
        );
        let body = sink
            .deliver(SubmissionKind::FieldReport, &json!({ "note": "bridge out" }))
            .await
            .unwrap();
        assert_eq!(body, json!({ "id": "rep-9" }));
    }
}
