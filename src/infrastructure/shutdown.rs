use tokio::sync::watch;

/// Process-wide stop signal shared by the probe, the sync worker and `run`.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        let already = *self.sender.borrow();
        if !already {
            tracing::info!(target: "app", "shutdown requested");
        }
        self.sender.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    pub async fn notified(&mut self) {
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }
}

pub fn install_signal_handlers(shutdown: Shutdown) {
    let ctrlc = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrlc.trigger();
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let term = shutdown;
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                term.trigger();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn late_listener_sees_earlier_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut listener = shutdown.subscribe();
        assert!(listener.is_triggered());
        tokio::time::timeout(Duration::from_secs(1), listener.notified())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn waiting_listener_wakes_on_trigger() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.subscribe();
        let waiter = tokio::spawn(async move { listener.notified().await });
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
