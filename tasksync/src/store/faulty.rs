//! Failure-injecting store wrapper for testing.
//!
//! [`FaultyStore`] delegates to any [`TaskStore`] but fails a configurable
//! number of upcoming commits with [`StoreError::Unavailable`]. A failed
//! commit leaves the staged changes in place, exactly like a real backend
//! failure, so compensation paths can be exercised end to end.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tasksync_proto::task::{Task, TaskId};

use super::{StoreError, TaskStore};

/// Handle used to arm commit failures on a [`FaultyStore`] after it has been
/// moved into its owner.
#[derive(Debug, Clone, Default)]
pub struct FaultHandle {
    failures: Arc<AtomicUsize>,
    commits: Arc<AtomicUsize>,
}

impl FaultHandle {
    /// Makes the next `n` commits fail.
    pub fn fail_next_commits(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Returns the number of successful commits so far.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

/// Store wrapper that can be told to fail commits.
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    handle: FaultHandle,
}

impl<S: TaskStore> FaultyStore<S> {
    /// Wraps `inner`, returning the store and a handle to control it.
    pub fn new(inner: S) -> (Self, FaultHandle) {
        let handle = FaultHandle::default();
        (
            Self {
                inner,
                handle: handle.clone(),
            },
            handle,
        )
    }

    /// Returns the wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: TaskStore> TaskStore for FaultyStore<S> {
    fn fetch(&self, ids: &HashSet<TaskId>) -> Result<Vec<Task>, StoreError> {
        self.inner.fetch(ids)
    }

    fn fetch_all(&self) -> Result<Vec<Task>, StoreError> {
        self.inner.fetch_all()
    }

    fn insert(&mut self, task: Task) {
        self.inner.insert(task);
    }

    fn delete(&mut self, id: &TaskId) {
        self.inner.delete(id);
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let armed = self
            .handle
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }
        self.inner.commit()?;
        self.handle.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn has_changes(&self) -> bool {
        self.inner.has_changes()
    }
}
