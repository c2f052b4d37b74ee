use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    db::slot::SlotStore,
    domain::{PendingSubmission, QueueSnapshot, SubmissionKind},
};

/// Storage slot holding the serialized queue array.
pub const QUEUE_SLOT: &str = "pendingSync";

#[derive(Debug, Default)]
struct QueueState {
    items: Vec<PendingSubmission>,
    last_id: i64,
}

/// Submissions waiting for the backend, mirrored into a durable slot.
///
/// The in-memory list is the source of truth for this process; the slot is
/// rewritten with the full list after every mutation.
pub struct OfflineQueue {
    store: SlotStore,
    state: Mutex<QueueState>,
    persist_gate: tokio::sync::Mutex<()>,
}

impl OfflineQueue {
    pub fn new(store: SlotStore) -> Self {
        Self {
            store,
            state: Mutex::new(QueueState::default()),
            persist_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Loads whatever a previous run left in the slot. Returns the number of
    /// restored entries.
    pub async fn restore(&self) -> Result<usize> {
        let _gate = self.persist_gate.lock().await;
        let Some(raw) = self.store.get(QUEUE_SLOT).await? else {
            return Ok(0);
        };
        let items: Vec<PendingSubmission> =
            serde_json::from_str(&raw).context("pending queue slot is not a valid queue")?;

        let mut state = self.state.lock();
        state.last_id = items
            .iter()
            .map(PendingSubmission::local_id)
            .max()
            .unwrap_or(0)
            .max(state.last_id);
        state.items = items;
        let restored = state.items.len();
        drop(state);

        tracing::info!(target: "queue", restored, "pending submissions restored");
        Ok(restored)
    }

    pub async fn enqueue(&self, payload: Value, kind: SubmissionKind) -> Result<PendingSubmission> {
        let _gate = self.persist_gate.lock().await;
        let (entry, snapshot) = {
            let mut state = self.state.lock();
            let now = Utc::now();
            let local_id = now.timestamp_millis().max(state.last_id + 1);
            state.last_id = local_id;
            let entry = PendingSubmission::new(local_id, kind, payload, now);
            state.items.push(entry.clone());
            (entry, state.items.clone())
        };

        self.persist(&snapshot).await?;
        tracing::info!(
            target: "queue",
            local_id = entry.local_id(),
            kind = %kind,
            pending = snapshot.len(),
            "submission queued for later delivery"
        );
        Ok(entry)
    }

    /// Takes every pending entry and clears both memory and the slot.
    ///
    /// Entries are gone from durable storage once this returns, whether or not
    /// the caller manages to deliver them.
    pub async fn drain(&self) -> Result<Vec<PendingSubmission>> {
        let _gate = self.persist_gate.lock().await;
        self.store.remove(QUEUE_SLOT).await?;
        let drained = std::mem::take(&mut self.state.lock().items);
        tracing::info!(target: "queue", count = drained.len(), "pending queue drained");
        Ok(drained)
    }

    /// Discards every pending entry without delivering it. Returns how many
    /// were dropped.
    pub async fn clear(&self) -> Result<usize> {
        let _gate = self.persist_gate.lock().await;
        self.store.remove(QUEUE_SLOT).await?;
        let dropped = std::mem::take(&mut self.state.lock().items).len();
        tracing::warn!(target: "queue", dropped, "pending queue cleared");
        Ok(dropped)
    }

    /// Drops one entry after it was delivered. Returns false if it was no
    /// longer queued.
    pub async fn remove(&self, local_id: i64) -> Result<bool> {
        let _gate = self.persist_gate.lock().await;
        let snapshot = {
            let mut state = self.state.lock();
            let before = state.items.len();
            state.items.retain(|item| item.local_id() != local_id);
            if state.items.len() == before {
                return Ok(false);
            }
            state.items.clone()
        };
        self.persist(&snapshot).await?;
        Ok(true)
    }

    pub fn pending(&self) -> Vec<PendingSubmission> {
        self.state.lock().items.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock();
        let mut snapshot = QueueSnapshot {
            pending: state.items.len(),
            ..Default::default()
        };
        for item in &state.items {
            match item.kind() {
                SubmissionKind::HelpRequest => snapshot.help_requests += 1,
                SubmissionKind::FieldReport => snapshot.field_reports += 1,
                SubmissionKind::Communication => snapshot.communications += 1,
            }
        }
        snapshot
    }

    async fn persist(&self, items: &[PendingSubmission]) -> Result<()> {
        if items.is_empty() {
            self.store.remove(QUEUE_SLOT).await?;
            return Ok(());
        }
        let raw = serde_json::to_string(items)?;
        self.store
            .set(QUEUE_SLOT, &raw)
            .await
            .context("failed to persist pending queue")
    }
}
