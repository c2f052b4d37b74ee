use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use reqwest::Client;
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use url::Url;

use crate::infrastructure::shutdown::ShutdownListener;

/// Invoked once per Offline -> Online transition.
pub type DrainCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    pub fn from_online(online: bool) -> Self {
        if online {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, ConnectivityState::Online)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CameOnline,
    WentOffline,
}

/// Online/offline state shared by the gateway and the sync worker.
pub struct ConnectivityMonitor {
    state: watch::Sender<ConnectivityState>,
    on_online: Mutex<Option<DrainCallback>>,
}

impl ConnectivityMonitor {
    pub fn new(initial: ConnectivityState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            on_online: Mutex::new(None),
        }
    }

    pub fn register_drain(&self, callback: DrainCallback) {
        *self.on_online.lock() = Some(callback);
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.state().is_online()
    }

    /// Records a network notification. Repeating the current state is a no-op.
    pub fn report(&self, online: bool) -> Option<Transition> {
        let next = ConnectivityState::from_online(online);
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if !changed {
            return None;
        }

        match next {
            ConnectivityState::Online => {
                tracing::info!(target: "connectivity", "network is back online");
                let callback = self.on_online.lock().clone();
                if let Some(callback) = callback {
                    callback();
                }
                Some(Transition::CameOnline)
            }
            ConnectivityState::Offline => {
                tracing::warn!(target: "connectivity", "network went offline");
                Some(Transition::WentOffline)
            }
        }
    }
}

/// Polls the backend and feeds the result into a [`ConnectivityMonitor`].
///
/// Any HTTP response counts as online; only transport failures and timeouts
/// count as offline.
pub struct ConnectivityProbe {
    http: Client,
    target: Url,
    interval: Duration,
    timeout: Duration,
}

impl ConnectivityProbe {
    pub fn new(http: Client, target: Url, interval: Duration, timeout: Duration) -> Self {
        Self {
            http,
            target,
            interval,
            timeout,
        }
    }

    pub async fn check(&self) -> bool {
        match self
            .http
            .get(self.target.clone())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(target: "connectivity", error = %err, "probe failed");
                false
            }
        }
    }

    pub async fn initial_state(&self) -> ConnectivityState {
        ConnectivityState::from_online(self.check().await)
    }

    pub fn spawn(
        self,
        monitor: Arc<ConnectivityMonitor>,
        mut shutdown: ShutdownListener,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if shutdown.is_triggered() {
                    break;
                }
                tokio::select! {
                    _ = sleep(self.interval) => {}
                    _ = shutdown.notified() => break,
                }
                let online = tokio::select! {
                    online = self.check() => online,
                    _ = shutdown.notified() => break,
                };
                monitor.report(online);
            }
            tracing::info!(target: "connectivity", "connectivity probe stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn counting_monitor(initial: ConnectivityState) -> (ConnectivityMonitor, Arc<AtomicUsize>) {
        let monitor = ConnectivityMonitor::new(initial);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        monitor.register_drain(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (monitor, fired)
    }

    #[test]
    fn drain_fires_once_per_online_transition() {
        let (monitor, fired) = counting_monitor(ConnectivityState::Offline);

        assert_eq!(monitor.report(true), Some(Transition::CameOnline));
        assert_eq!(monitor.report(true), None);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert_eq!(monitor.report(false), Some(Transition::WentOffline));
        assert_eq!(monitor.report(false), None);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert_eq!(monitor.report(true), Some(Transition::CameOnline));
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn going_offline_never_drains() {
        let (monitor, fired) = counting_monitor(ConnectivityState::Online);
        assert_eq!(monitor.report(true), None);
        assert_eq!(monitor.report(false), Some(Transition::WentOffline));
        assert!(!monitor.is_online());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn probe_treats_error_status_as_online() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let target = Url::parse(&format!("{}/health", server.uri())).unwrap();
        let probe = ConnectivityProbe::new(
            Client::new(),
            target,
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert_eq!(probe.initial_state().await, ConnectivityState::Online);
    }

    #[tokio::test]
    async fn probe_reports_offline_when_unreachable() {
        let target = Url::parse("http://127.0.0.1:9/health").unwrap();
        let probe = ConnectivityProbe::new(
            Client::new(),
            target,
            Duration::from_secs(1),
            Duration::from_millis(500),
        );
        assert!(!probe.check().await);
    }
}
