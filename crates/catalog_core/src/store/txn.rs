//! Snapshot store and transactions.
//!
//! # Responsibility
//! - Own the currently published snapshot and hand out read/write
//!   transactions against it.
//! - Serialize writers and publish their working copy atomically.
//!
//! # Invariants
//! - Read transactions only ever get shared access to a published snapshot.
//! - A write transaction mutates a private working copy; the published
//!   pointer changes only in [`WriteTxn::commit`], by one `ArcSwap::store`.
//! - `commit` and `abort` consume the transaction, so a finished
//!   transaction cannot be used again. Dropping an open write transaction
//!   aborts it.
//!
//! # See also
//! - `store::table` for the copy-on-write tables a snapshot is made of.

use arc_swap::ArcSwap;
use log::debug;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Per-store monotonically increasing transaction number.
pub type TxnId = u64;

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    OpenRead,
    OpenWrite,
    Committed,
    Aborted,
}

impl TxnState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenRead => "open_read",
            Self::OpenWrite => "open_write",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }
}

impl Display for TxnState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-local store publishing immutable snapshots of `S`.
///
/// `S` is the set of tables (for example a struct of [`super::Table`]s);
/// cloning it must only clone shared handles.
pub struct MemStore<S> {
    current: ArcSwap<S>,
    writer: Mutex<()>,
    next_txn_id: AtomicU64,
}

impl<S: Clone> MemStore<S> {
    /// Creates a store whose first published snapshot is `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            writer: Mutex::new(()),
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Returns the currently published snapshot.
    pub fn snapshot(&self) -> Arc<S> {
        self.current.load_full()
    }

    /// Opens a read transaction pinned to the current snapshot.
    pub fn read(&self) -> ReadTxn<S> {
        ReadTxn {
            id: self.allocate_id(),
            snapshot: self.current.load_full(),
        }
    }

    /// Opens a write transaction, waiting for any other writer to finish.
    ///
    /// The working copy is taken after the writer lock is held, so it
    /// always starts from the latest committed snapshot.
    pub fn write(&self) -> WriteTxn<'_, S> {
        // Why: a writer only mutates its private working copy, so a panic
        // while the lock was held cannot leave the published snapshot torn.
        let guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let working = S::clone(&self.current.load());
        WriteTxn {
            id: self.allocate_id(),
            store: self,
            working,
            started_at: Instant::now(),
            _guard: guard,
        }
    }

    /// Runs `f` in a read transaction.
    pub fn view<R, E>(&self, f: impl FnOnce(&ReadTxn<S>) -> Result<R, E>) -> Result<R, E> {
        let txn = self.read();
        f(&txn)
    }

    /// Runs `f` in a write transaction; commits on `Ok`, aborts on `Err`.
    pub fn update<R, E>(
        &self,
        f: impl FnOnce(&mut WriteTxn<'_, S>) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut txn = self.write();
        match f(&mut txn) {
            Ok(value) => {
                txn.commit();
                Ok(value)
            }
            Err(err) => {
                txn.abort();
                Err(err)
            }
        }
    }

    fn allocate_id(&self) -> TxnId {
        self.next_txn_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Read-only view of one published snapshot.
pub struct ReadTxn<S> {
    id: TxnId,
    snapshot: Arc<S>,
}

impl<S> ReadTxn<S> {
    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn state(&self) -> TxnState {
        TxnState::OpenRead
    }

    pub fn data(&self) -> &S {
        &self.snapshot
    }
}

/// Exclusive write transaction over a private working copy.
pub struct WriteTxn<'store, S: Clone> {
    id: TxnId,
    store: &'store MemStore<S>,
    working: S,
    started_at: Instant,
    _guard: MutexGuard<'store, ()>,
}

impl<S: Clone> WriteTxn<'_, S> {
    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn state(&self) -> TxnState {
        TxnState::OpenWrite
    }

    /// Working copy, including this transaction's own uncommitted writes.
    pub fn data(&self) -> &S {
        &self.working
    }

    pub fn data_mut(&mut self) -> &mut S {
        &mut self.working
    }

    /// Publishes the working copy as the store's current snapshot.
    pub fn commit(self) -> TxnState {
        let Self {
            id,
            store,
            working,
            started_at,
            _guard,
        } = self;
        store.current.store(Arc::new(working));
        drop(_guard);
        log_finish(id, TxnState::Committed, started_at);
        TxnState::Committed
    }

    /// Discards the working copy.
    pub fn abort(self) -> TxnState {
        let id = self.id;
        let started_at = self.started_at;
        drop(self);
        log_finish(id, TxnState::Aborted, started_at);
        TxnState::Aborted
    }
}

fn log_finish(id: TxnId, state: TxnState, started_at: Instant) {
    let event = match state {
        TxnState::Committed => "txn_commit",
        _ => "txn_abort",
    };
    debug!(
        "event={event} module=store status=ok txn_id={id} state={state} duration_us={}",
        started_at.elapsed().as_micros()
    );
}

#[cfg(test)]
mod tests {
    use super::{MemStore, TxnState};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        value: u32,
    }

    #[test]
    fn commit_publishes_and_abort_discards() {
        let store = MemStore::new(Counter::default());

        let mut txn = store.write();
        txn.data_mut().value = 1;
        assert_eq!(txn.commit(), TxnState::Committed);
        assert_eq!(store.snapshot().value, 1);

        let mut txn = store.write();
        txn.data_mut().value = 2;
        assert_eq!(txn.abort(), TxnState::Aborted);
        assert_eq!(store.snapshot().value, 1);
    }

    #[test]
    fn dropped_write_transaction_is_aborted() {
        let store = MemStore::new(Counter::default());
        {
            let mut txn = store.write();
            txn.data_mut().value = 9;
        }
        assert_eq!(store.snapshot().value, 0);
        // The writer lock was released by the drop.
        store.write().commit();
    }

    #[test]
    fn reader_keeps_its_snapshot_across_commits() {
        let store = MemStore::new(Counter::default());
        let reader = store.read();

        let mut txn = store.write();
        txn.data_mut().value = 5;
        assert_eq!(reader.data().value, 0);
        txn.commit();

        assert_eq!(reader.data().value, 0);
        assert_eq!(store.read().data().value, 5);
    }

    #[test]
    fn update_commits_on_ok_and_aborts_on_err() {
        let store = MemStore::new(Counter::default());

        let out: Result<u32, String> = store.update(|txn| {
            txn.data_mut().value = 3;
            Ok(txn.data().value)
        });
        assert_eq!(out, Ok(3));

        let out: Result<(), String> = store.update(|txn| {
            txn.data_mut().value = 4;
            Err("nope".to_string())
        });
        assert!(out.is_err());
        assert_eq!(store.snapshot().value, 3);
    }

    #[test]
    fn view_passes_errors_through() {
        let store = MemStore::new(Counter { value: 7 });
        let seen: Result<u32, String> = store.view(|txn| Ok(txn.data().value));
        assert_eq!(seen, Ok(7));
        let failed: Result<u32, String> = store.view(|_| Err("missing".to_string()));
        assert_eq!(failed, Err("missing".to_string()));
    }

    #[test]
    fn transaction_ids_increase() {
        let store = MemStore::new(Counter::default());
        let first = store.read();
        let second = store.write();
        assert!(second.id() > first.id());
        assert_eq!(first.state(), TxnState::OpenRead);
        assert_eq!(second.state(), TxnState::OpenWrite);
        assert!(!second.state().is_terminal());
        assert!(second.commit().is_terminal());
    }
}
