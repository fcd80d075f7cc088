//! The pending-operation model and store: a durable queue of local
//! mutations with coalescing, retry backoff, and an ordered application
//! lifecycle.

use crate::config::BackoffConfig;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// What a pending operation does to the remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

/// Where an operation sits in its retry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    Pending,
    InProgress,
    Failed,
    Completed,
}

/// A durable record of one local mutation awaiting application to a
/// remote CalDAV collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    pub id: String,
    pub calendar_url: String,
    pub event_uid: String,
    pub kind: OperationKind,
    /// Serialized `.ics` event body for `CREATE`/`UPDATE`; `None` for `DELETE`.
    pub payload: Option<String>,
    pub status: OperationStatus,
    pub created_at: i64,
    pub retry_count: u32,
    pub next_retry_at: i64,
    pub error_message: Option<String>,
    pub should_retry: bool,
    /// When `mark_in_progress` most recently claimed this operation, so a
    /// reconciler can detect a stuck lease. The timestamp `mark_in_progress`
    /// receives is recorded here rather than discarded.
    pub in_progress_since: Option<i64>,
    /// How many times a remote conflict (e.g. CalDAV 412) has bounced this
    /// operation back for a refresh-then-retry. Capped at one: a second
    /// consecutive conflict surfaces instead of rescheduling again.
    pub conflict_retry_count: u32,
}

impl PendingOperation {
    pub fn new(
        id: impl Into<String>,
        calendar_url: impl Into<String>,
        event_uid: impl Into<String>,
        kind: OperationKind,
        payload: Option<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            calendar_url: calendar_url.into(),
            event_uid: event_uid.into(),
            kind,
            payload,
            status: OperationStatus::Pending,
            created_at,
            retry_count: 0,
            next_retry_at: created_at,
            error_message: None,
            should_retry: true,
            in_progress_since: None,
            conflict_retry_count: 0,
        }
    }

    pub fn is_ready(&self, now: i64) -> bool {
        match self.status {
            OperationStatus::Pending => self.next_retry_at <= now,
            OperationStatus::Failed => self.should_retry && self.next_retry_at <= now,
            _ => false,
        }
    }

    /// Whether this operation is non-terminal and therefore blocks a second
    /// non-terminal operation for the same `event_uid`.
    pub fn is_non_terminal(&self) -> bool {
        matches!(self.status, OperationStatus::Pending | OperationStatus::InProgress)
    }
}

/// Compute the next retry backoff. This corrects a bug where clamping
/// only the integer conversion lets
/// `initial * multiplier^retry_count` overflow before the clamp ever
/// applies. Here the floating-point product itself is clamped to
/// `[initial, max]` before it is added to `failed_at`.
pub fn compute_backoff(config: &BackoffConfig, new_retry_count: u32) -> u64 {
    let product = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(new_retry_count as i32);
    let clamped = product.clamp(config.initial_backoff_ms as f64, config.max_backoff_ms as f64);
    clamped as u64
}

/// The persistence capability consumed by the sync reconciler. All
/// operations may suspend while persistence completes.
#[async_trait]
pub trait OperationStore: Send + Sync {
    async fn get_ready(&self, now: i64) -> Result<Vec<PendingOperation>, StoreError>;
    async fn get_for_calendar(&self, calendar_url: &str) -> Result<Vec<PendingOperation>, StoreError>;
    async fn get_by_event_uid(&self, event_uid: &str) -> Result<Option<PendingOperation>, StoreError>;
    async fn enqueue(&self, op: PendingOperation) -> Result<String, StoreError>;
    async fn update(&self, op: PendingOperation) -> Result<(), StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    async fn mark_in_progress(&self, id: &str, now: i64) -> Result<(), StoreError>;
    async fn mark_failed(&self, id: &str, err: &str, now: i64, backoff: &BackoffConfig) -> Result<(), StoreError>;
    /// Record a remote conflict. Returns `true` if this is the operation's
    /// first conflict and a retry was scheduled with backoff, or `false` if
    /// it already spent its one conflict retry and the caller should
    /// surface the failure instead.
    async fn mark_conflict(&self, id: &str, now: i64, backoff: &BackoffConfig) -> Result<bool, StoreError>;
    async fn count(&self) -> Result<usize, StoreError>;
}

/// Reference in-memory [`OperationStore`] for tests. Backed by a
/// `std::sync::Mutex`-guarded map: the plainest lock that satisfies
/// `Send + Sync` for small in-memory state.
#[derive(Default)]
pub struct InMemoryOperationStore {
    ops: Mutex<HashMap<String, PendingOperation>>,
}

impl InMemoryOperationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OperationStore for InMemoryOperationStore {
    async fn get_ready(&self, now: i64) -> Result<Vec<PendingOperation>, StoreError> {
        let guard = self.ops.lock().map_err(|_| StoreError::Unavailable("poisoned lock".into()))?;
        let mut ready: Vec<PendingOperation> = guard.values().filter(|op| op.is_ready(now)).cloned().collect();
        ready.sort_by_key(|op| op.created_at);
        Ok(ready)
    }

    async fn get_for_calendar(&self, calendar_url: &str) -> Result<Vec<PendingOperation>, StoreError> {
        let guard = self.ops.lock().map_err(|_| StoreError::Unavailable("poisoned lock".into()))?;
        let mut ops: Vec<PendingOperation> = guard
            .values()
            .filter(|op| op.calendar_url == calendar_url)
            .cloned()
            .collect();
        ops.sort_by_key(|op| op.created_at);
        Ok(ops)
    }

    async fn get_by_event_uid(&self, event_uid: &str) -> Result<Option<PendingOperation>, StoreError> {
        let guard = self.ops.lock().map_err(|_| StoreError::Unavailable("poisoned lock".into()))?;
        // Multiple records can legitimately coexist for one event_uid while
        // one is IN_PROGRESS and a fresh one is PENDING (see
        // `enqueue_coalesced`'s in-flight branch). `HashMap` iteration order
        // is not deterministic, so pick deliberately: prefer the
        // non-IN_PROGRESS record, tie-broken by creation order then id.
        let mut matches: Vec<&PendingOperation> =
            guard.values().filter(|op| op.event_uid == event_uid).collect();
        matches.sort_by_key(|op| {
            (
                op.status == OperationStatus::InProgress,
                op.created_at,
                op.id.clone(),
            )
        });
        Ok(matches.into_iter().next().cloned())
    }

    async fn enqueue(&self, op: PendingOperation) -> Result<String, StoreError> {
        let id = op.id.clone();
        let mut guard = self.ops.lock().map_err(|_| StoreError::Unavailable("poisoned lock".into()))?;
        guard.insert(id.clone(), op);
        Ok(id)
    }

    async fn update(&self, op: PendingOperation) -> Result<(), StoreError> {
        let mut guard = self.ops.lock().map_err(|_| StoreError::Unavailable("poisoned lock".into()))?;
        if !guard.contains_key(&op.id) {
            return Err(StoreError::NotFound(op.id));
        }
        guard.insert(op.id.clone(), op);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut guard = self.ops.lock().map_err(|_| StoreError::Unavailable("poisoned lock".into()))?;
        guard.remove(id);
        Ok(())
    }

    async fn mark_in_progress(&self, id: &str, now: i64) -> Result<(), StoreError> {
        let mut guard = self.ops.lock().map_err(|_| StoreError::Unavailable("poisoned lock".into()))?;
        let op = guard.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        op.status = OperationStatus::InProgress;
        op.in_progress_since = Some(now);
        Ok(())
    }

    async fn mark_failed(&self, id: &str, err: &str, now: i64, backoff: &BackoffConfig) -> Result<(), StoreError> {
        let mut guard = self.ops.lock().map_err(|_| StoreError::Unavailable("poisoned lock".into()))?;
        let op = guard.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        op.retry_count += 1;
        let delay = compute_backoff(backoff, op.retry_count);
        op.next_retry_at = now + delay as i64;
        op.error_message = Some(err.to_string());
        op.status = OperationStatus::Failed;
        op.in_progress_since = None;
        Ok(())
    }

    async fn mark_conflict(&self, id: &str, now: i64, backoff: &BackoffConfig) -> Result<bool, StoreError> {
        let mut guard = self.ops.lock().map_err(|_| StoreError::Unavailable("poisoned lock".into()))?;
        let op = guard.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if op.conflict_retry_count >= 1 {
            return Ok(false);
        }
        op.conflict_retry_count += 1;
        op.retry_count += 1;
        let delay = compute_backoff(backoff, op.retry_count);
        op.next_retry_at = now + delay as i64;
        op.error_message = Some("conflict: precondition failed".to_string());
        op.status = OperationStatus::Failed;
        op.in_progress_since = None;
        Ok(true)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let guard = self.ops.lock().map_err(|_| StoreError::Unavailable("poisoned lock".into()))?;
        Ok(guard.len())
    }
}

/// Coalesce `incoming` against any existing non-terminal operation for the
/// same `event_uid` and enqueue the result. Returns the id of the
/// operation that now represents the mutation.
pub async fn enqueue_coalesced(
    store: &dyn OperationStore,
    calendar_url: &str,
    event_uid: &str,
    kind: OperationKind,
    payload: Option<String>,
    now: i64,
) -> Result<String, StoreError> {
    let existing = store.get_by_event_uid(event_uid).await?;

    match existing {
        None => {
            let op = PendingOperation::new(
                Uuid::new_v4().to_string(),
                calendar_url,
                event_uid,
                kind,
                payload,
                now,
            );
            store.enqueue(op).await
        }
        Some(existing) if existing.status == OperationStatus::InProgress => {
            // In flight: never mutate it, enqueue a fresh record that will
            // be picked up on a later tick, preserving per-UID FIFO.
            let op = PendingOperation::new(
                Uuid::new_v4().to_string(),
                calendar_url,
                event_uid,
                kind,
                payload,
                now,
            );
            store.enqueue(op).await
        }
        Some(mut existing) => match (existing.kind, kind) {
            (OperationKind::Delete, _) => Err(StoreError::Unavailable(
                "cannot coalesce onto a pending DELETE".to_string(),
            )),
            (OperationKind::Create, OperationKind::Update) => {
                existing.payload = payload;
                let id = existing.id.clone();
                store.update(existing).await?;
                Ok(id)
            }
            (OperationKind::Create, OperationKind::Delete) => {
                let id = existing.id.clone();
                store.delete(&id).await?;
                Ok(id)
            }
            (OperationKind::Update, OperationKind::Update) => {
                existing.payload = payload;
                let id = existing.id.clone();
                store.update(existing).await?;
                Ok(id)
            }
            (OperationKind::Update, OperationKind::Delete) => {
                existing.kind = OperationKind::Delete;
                existing.payload = None;
                let id = existing.id.clone();
                store.update(existing).await?;
                Ok(id)
            }
            (OperationKind::Create, OperationKind::Create)
            | (OperationKind::Update, OperationKind::Create)
            | (OperationKind::Delete, _) => {
                let op = PendingOperation::new(
                    Uuid::new_v4().to_string(),
                    calendar_url,
                    event_uid,
                    kind,
                    payload,
                    now,
                );
                store.enqueue(op).await
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_clamps_the_product_before_conversion() {
        let config = BackoffConfig {
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            backoff_multiplier: 2.0,
        };
        // Scenario 6: retryCount=3 -> 1000*2^3=8000, ts=3000 -> 11000.
        assert_eq!(compute_backoff(&config, 3), 8_000);
        // A huge retry count must clamp to max, never overflow or wrap.
        assert_eq!(compute_backoff(&config, 200), 60_000);
    }

    #[tokio::test]
    async fn scenario_six_failure_sequence() {
        let store = InMemoryOperationStore::new();
        let backoff = BackoffConfig {
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            backoff_multiplier: 2.0,
        };
        let id = store
            .enqueue(PendingOperation::new("op-1", "cal", "uid-1", OperationKind::Create, None, 0))
            .await
            .unwrap();
        store.mark_failed(&id, "timeout", 0, &backoff).await.unwrap();
        store.mark_failed(&id, "timeout", 1000, &backoff).await.unwrap();
        store.mark_failed(&id, "timeout", 3000, &backoff).await.unwrap();

        let ready = store.get_ready(0).await.unwrap();
        assert!(ready.is_empty());
        let all = store.get_for_calendar("cal").await.unwrap();
        assert_eq!(all[0].retry_count, 3);
        assert_eq!(all[0].next_retry_at, 11_000);
    }

    #[tokio::test]
    async fn scenario_five_create_then_update_coalesces() {
        let store = InMemoryOperationStore::new();
        enqueue_coalesced(&store, "cal", "a", OperationKind::Create, Some("P1".into()), 0)
            .await
            .unwrap();
        enqueue_coalesced(&store, "cal", "a", OperationKind::Update, Some("P2".into()), 1)
            .await
            .unwrap();

        let ops = store.get_for_calendar("cal").await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OperationKind::Create);
        assert_eq!(ops[0].payload.as_deref(), Some("P2"));
    }

    #[tokio::test]
    async fn create_then_delete_cancels_out() {
        let store = InMemoryOperationStore::new();
        enqueue_coalesced(&store, "cal", "a", OperationKind::Create, Some("P1".into()), 0)
            .await
            .unwrap();
        enqueue_coalesced(&store, "cal", "a", OperationKind::Delete, None, 1)
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_then_delete_replaces_with_delete() {
        let store = InMemoryOperationStore::new();
        let id = store
            .enqueue(PendingOperation::new("op-1", "cal", "a", OperationKind::Update, Some("P1".into()), 0))
            .await
            .unwrap();
        enqueue_coalesced(&store, "cal", "a", OperationKind::Delete, None, 1).await.unwrap();
        let op = store.get_by_event_uid("a").await.unwrap().unwrap();
        assert_eq!(op.id, id);
        assert_eq!(op.kind, OperationKind::Delete);
    }

    #[tokio::test]
    async fn delete_rejects_further_coalescing() {
        let store = InMemoryOperationStore::new();
        enqueue_coalesced(&store, "cal", "a", OperationKind::Delete, None, 0).await.unwrap();
        let result = enqueue_coalesced(&store, "cal", "a", OperationKind::Create, None, 1).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn in_progress_existing_enqueues_a_new_record() {
        let store = InMemoryOperationStore::new();
        let id = store
            .enqueue(PendingOperation::new("op-1", "cal", "a", OperationKind::Update, Some("P1".into()), 0))
            .await
            .unwrap();
        store.mark_in_progress(&id, 0).await.unwrap();
        enqueue_coalesced(&store, "cal", "a", OperationKind::Update, Some("P2".into()), 1)
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
