//! The sync reconciler: drives the operation store against a remote
//! CalDAV adapter, applying state transitions under per-event-UID ordering
//! and enforcing single-flight ticks.

use crate::config::CalSyncConfig;
use crate::error::{AdapterError, StoreError};
use crate::store::{OperationKind, OperationStatus, OperationStore, PendingOperation};
use crate::time::Clock;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// One version marker a successful remote write returns (e.g. an ETag),
/// opaque to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventVersion(pub String);

/// A remotely fetched event: its uid, version, and raw `.ics` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    pub event_uid: String,
    pub etag: String,
    pub ics_body: String,
}

/// The remote CalDAV capability consumed by the reconciler. HTTP/TLS
/// transport, XML parsing, and discovery live outside this crate; an
/// implementor wraps whatever transport the host provides.
#[async_trait]
pub trait RemoteAdapter: Send + Sync {
    async fn put(
        &self,
        calendar_url: &str,
        event_uid: &str,
        ics_body: &str,
    ) -> Result<EventVersion, AdapterError>;
    async fn delete(
        &self,
        calendar_url: &str,
        event_uid: &str,
        etag: Option<&str>,
    ) -> Result<(), AdapterError>;
    async fn get(&self, calendar_url: &str) -> Result<Vec<RemoteEvent>, AdapterError>;
}

/// Outcome of one reconciliation tick, surfaced to the caller for logging
/// or UI purposes.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub completed: Vec<String>,
    pub retried: Vec<String>,
    /// Operations that failed permanently and will not be retried,
    /// paired with the error that was surfaced.
    pub permanently_failed: Vec<(String, String)>,
}

/// Cooperative cancellation, honoured between operations, never mid-flight:
/// an in-flight remote call always completes.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a tick of the store against a remote adapter. Single-flight per
/// process: [`Reconciler::tick`] short-circuits if a tick is already
/// running.
pub struct Reconciler<S: OperationStore, A: RemoteAdapter, C: Clock> {
    store: Arc<S>,
    adapter: Arc<A>,
    clock: Arc<C>,
    config: CalSyncConfig,
    running: Arc<tokio::sync::Mutex<()>>,
}

impl<S: OperationStore, A: RemoteAdapter, C: Clock> Reconciler<S, A, C> {
    pub fn new(store: Arc<S>, adapter: Arc<A>, clock: Arc<C>, config: CalSyncConfig) -> Self {
        Self {
            store,
            adapter,
            clock,
            config,
            running: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Run one tick: pull ready ops, dispatch each in `createdAt` order,
    /// apply the resulting state transition. Returns `None` if another
    /// tick was already in flight (single-flight).
    pub async fn tick(&self, cancel: &CancellationToken) -> Option<Result<TickReport, StoreError>> {
        let guard = self.running.try_lock().ok()?;
        let result = self.tick_inner(cancel).await;
        drop(guard);
        Some(result)
    }

    async fn tick_inner(&self, cancel: &CancellationToken) -> Result<TickReport, StoreError> {
        let now = self.clock.now_ms();
        let ops = self.store.get_ready(now).await?;
        let mut report = TickReport::default();

        for op in ops {
            if cancel.is_cancelled() {
                debug!("reconciler tick cancelled before op {}", op.id);
                break;
            }

            self.store.mark_in_progress(&op.id, self.clock.now_ms()).await?;
            match self.dispatch(&op).await {
                Ok(()) => {
                    self.store.delete(&op.id).await?;
                    report.completed.push(op.id.clone());
                }
                Err(err) if err.is_retriable() => {
                    warn!("op {} failed retriably: {err}", op.id);
                    self.store
                        .mark_failed(&op.id, &err.to_string(), self.clock.now_ms(), &self.config.backoff)
                        .await?;
                    report.retried.push(op.id.clone());
                }
                Err(AdapterError::Conflict) => {
                    // Refresh-then-retry once; the actual refresh is the
                    // caller's pull-path responsibility, so here we simply
                    // requeue with backoff like any retriable error. A
                    // second consecutive conflict on the same op means the
                    // one retry didn't resolve it, so it surfaces instead.
                    let retried = self
                        .store
                        .mark_conflict(&op.id, self.clock.now_ms(), &self.config.backoff)
                        .await?;
                    if retried {
                        warn!("op {} hit a conflict, scheduling one retry", op.id);
                        report.retried.push(op.id.clone());
                    } else {
                        let msg = "conflict: precondition failed after a refresh-and-retry";
                        warn!("op {} hit a second conflict, surfacing: {msg}", op.id);
                        let mut updated = op.clone();
                        updated.should_retry = false;
                        updated.status = OperationStatus::Failed;
                        updated.error_message = Some(msg.to_string());
                        self.store.update(updated).await?;
                        report.permanently_failed.push((op.id.clone(), msg.to_string()));
                    }
                }
                Err(err) => {
                    warn!("op {} failed permanently: {err}", op.id);
                    let mut updated = op.clone();
                    updated.should_retry = false;
                    updated.status = OperationStatus::Failed;
                    updated.error_message = Some(err.to_string());
                    self.store.update(updated).await?;
                    report.permanently_failed.push((op.id.clone(), err.to_string()));
                }
            }
        }

        Ok(report)
    }

    async fn dispatch(&self, op: &PendingOperation) -> Result<(), AdapterError> {
        match op.kind {
            OperationKind::Create | OperationKind::Update => {
                let payload = op.payload.as_deref().unwrap_or_default();
                self.adapter.put(&op.calendar_url, &op.event_uid, payload).await?;
            }
            OperationKind::Delete => {
                self.adapter.delete(&op.calendar_url, &op.event_uid, None).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{enqueue_coalesced, InMemoryOperationStore};
    use crate::time::FixedClock;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockAdapter {
        fail_next: Mutex<Option<AdapterError>>,
        puts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RemoteAdapter for MockAdapter {
        async fn put(&self, _calendar_url: &str, event_uid: &str, _ics_body: &str) -> Result<EventVersion, AdapterError> {
            if let Some(err) = self.fail_next.lock().unwrap().take() {
                return Err(err);
            }
            self.puts.lock().unwrap().push(event_uid.to_string());
            Ok(EventVersion("etag-1".to_string()))
        }

        async fn delete(&self, _calendar_url: &str, _event_uid: &str, _etag: Option<&str>) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn get(&self, _calendar_url: &str) -> Result<Vec<RemoteEvent>, AdapterError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn successful_op_is_completed_and_removed() {
        let store = Arc::new(InMemoryOperationStore::new());
        let adapter = Arc::new(MockAdapter::default());
        let clock = Arc::new(FixedClock::new(0));
        enqueue_coalesced(&*store, "cal", "a", OperationKind::Create, Some("ICS".into()), 0)
            .await
            .unwrap();

        let reconciler = Reconciler::new(store.clone(), adapter.clone(), clock, CalSyncConfig::default());
        let report = reconciler.tick(&CancellationToken::new()).await.unwrap().unwrap();

        assert_eq!(report.completed.len(), 1);
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(adapter.puts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn retriable_failure_schedules_backoff() {
        let store = Arc::new(InMemoryOperationStore::new());
        let adapter = Arc::new(MockAdapter::default());
        *adapter.fail_next.lock().unwrap() = Some(AdapterError::Network("timeout".into()));
        let clock = Arc::new(FixedClock::new(0));
        enqueue_coalesced(&*store, "cal", "a", OperationKind::Create, Some("ICS".into()), 0)
            .await
            .unwrap();

        let reconciler = Reconciler::new(store.clone(), adapter, clock, CalSyncConfig::default());
        let report = reconciler.tick(&CancellationToken::new()).await.unwrap().unwrap();

        assert_eq!(report.retried.len(), 1);
        let ops = store.get_for_calendar("cal").await.unwrap();
        assert_eq!(ops[0].status, OperationStatus::Failed);
        assert_eq!(ops[0].retry_count, 1);
    }

    #[tokio::test]
    async fn permanent_failure_disables_retry() {
        let store = Arc::new(InMemoryOperationStore::new());
        let adapter = Arc::new(MockAdapter::default());
        *adapter.fail_next.lock().unwrap() = Some(AdapterError::ServerRejection("400".into()));
        let clock = Arc::new(FixedClock::new(0));
        enqueue_coalesced(&*store, "cal", "a", OperationKind::Create, Some("ICS".into()), 0)
            .await
            .unwrap();

        let reconciler = Reconciler::new(store.clone(), adapter, clock, CalSyncConfig::default());
        let report = reconciler.tick(&CancellationToken::new()).await.unwrap().unwrap();

        assert_eq!(report.permanently_failed.len(), 1);
        let ops = store.get_for_calendar("cal").await.unwrap();
        assert!(!ops[0].should_retry);
    }

    #[tokio::test]
    async fn conflict_retries_once_then_surfaces() {
        let store = Arc::new(InMemoryOperationStore::new());
        let adapter = Arc::new(MockAdapter::default());
        let clock = Arc::new(FixedClock::new(0));
        enqueue_coalesced(&*store, "cal", "a", OperationKind::Create, Some("ICS".into()), 0)
            .await
            .unwrap();

        let reconciler = Reconciler::new(store.clone(), adapter.clone(), clock, CalSyncConfig::default());

        *adapter.fail_next.lock().unwrap() = Some(AdapterError::Conflict);
        let report = reconciler.tick(&CancellationToken::new()).await.unwrap().unwrap();
        assert_eq!(report.retried.len(), 1);
        assert!(report.permanently_failed.is_empty());

        let ops = store.get_for_calendar("cal").await.unwrap();
        let op = &ops[0];
        assert_eq!(op.conflict_retry_count, 1);
        let fast_forward = Arc::new(FixedClock::new(op.next_retry_at));
        let reconciler = Reconciler::new(store.clone(), adapter.clone(), fast_forward, CalSyncConfig::default());

        *adapter.fail_next.lock().unwrap() = Some(AdapterError::Conflict);
        let report = reconciler.tick(&CancellationToken::new()).await.unwrap().unwrap();
        assert!(report.retried.is_empty());
        assert_eq!(report.permanently_failed.len(), 1);

        let ops = store.get_for_calendar("cal").await.unwrap();
        assert!(!ops[0].should_retry);
    }

    #[tokio::test]
    async fn empty_store_produces_empty_report() {
        let store = Arc::new(InMemoryOperationStore::new());
        let adapter = Arc::new(MockAdapter::default());
        let clock = Arc::new(FixedClock::new(0));
        let reconciler = Reconciler::new(store, adapter, clock, CalSyncConfig::default());
        let report = reconciler.tick(&CancellationToken::new()).await.unwrap().unwrap();
        assert!(report.completed.is_empty());
    }
}
