//! In-memory [`TableStore`] used by the pipeline tests.
//!
//! Records every insert call and session open/close so tests can assert the
//! pipeline's delivery and lifecycle properties. Failures can be injected to
//! exercise the retry and drop paths.

use crate::{
    error::StoreError,
    store::{CreateOutcome, StoreSession, TableStore},
};
use async_trait::async_trait;
use model::{
    records::UserRecord,
    table::{TableRef, TableSchema},
};
use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

#[derive(Default)]
struct Inner {
    tables: Mutex<HashSet<String>>,
    inserts: Mutex<Vec<Vec<UserRecord>>>,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    failures_remaining: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Fail the next `n` insert calls (across all sessions) with a transient
    /// error. Pass `usize::MAX` to fail every call.
    pub fn fail_next_inserts(&self, n: usize) {
        self.inner.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Every insert call in arrival order, one `Vec` per call.
    pub fn insert_calls(&self) -> Vec<Vec<UserRecord>> {
        self.inner
            .inserts
            .lock()
            .expect("memory store lock poisoned")
            .clone()
    }

    /// All stored rows, flattened in insert-call order.
    pub fn rows(&self) -> Vec<UserRecord> {
        self.insert_calls().into_iter().flatten().collect()
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.inner.sessions_closed.load(Ordering::SeqCst)
    }

    pub fn created_tables(&self) -> Vec<String> {
        let tables = self.inner.tables.lock().expect("memory store lock poisoned");
        tables.iter().cloned().collect()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn create_table(
        &self,
        table: &TableRef,
        _schema: &TableSchema,
    ) -> Result<CreateOutcome, StoreError> {
        let mut tables = self.inner.tables.lock().expect("memory store lock poisoned");
        if tables.insert(table.to_string()) {
            Ok(CreateOutcome::Created)
        } else {
            Ok(CreateOutcome::AlreadyExists)
        }
    }

    async fn open_session(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            inner: self.inner.clone(),
        }))
    }
}

struct MemorySession {
    inner: Arc<Inner>,
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn insert_rows(&self, _table: &TableRef, rows: &[UserRecord]) -> Result<(), StoreError> {
        let injected = self
            .inner
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if injected {
            return Err(StoreError::Api {
                status: 503,
                message: "injected failure".to_string(),
            });
        }

        self.inner
            .inserts
            .lock()
            .expect("memory store lock poisoned")
            .push(rows.to_vec());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
