//! Identity-keyed merge of remote task representations into the local store.
//!
//! Remote data is authoritative for the fields it carries, but absence from
//! the remote collection never deletes a local task. Representations that
//! do not form a valid task are skipped and counted, never fatal.

use std::collections::{HashMap, HashSet};

use tasksync_proto::task::{Task, TaskId, TaskRepresentation};

use crate::store::{StoreError, TaskStore};

/// Counts of what a reconciliation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Local tasks created from remote representations.
    pub created: usize,
    /// Existing local tasks overwritten from remote representations.
    pub updated: usize,
    /// Malformed representations that were ignored.
    pub skipped: usize,
}

/// Validates representations and keys them by identifier.
///
/// Later entries win over earlier ones with the same identifier. Returns the
/// keyed tasks and the number of malformed representations dropped.
pub fn index_valid<'a, I>(representations: I) -> (HashMap<TaskId, Task>, usize)
where
    I: IntoIterator<Item = &'a TaskRepresentation>,
{
    let mut skipped = 0;
    let mut by_id = HashMap::new();
    for rep in representations {
        match Task::try_from(rep) {
            Ok(task) => {
                by_id.insert(*task.id(), task);
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(identifier = %rep.identifier, error = %e, "skipping malformed remote task");
            }
        }
    }
    (by_id, skipped)
}

/// Merges `representations` into `store` and commits the result as one unit.
///
/// Matching local tasks get their mutable fields overwritten; unmatched
/// valid representations become new tasks. Local tasks are only read
/// through a single bounded fetch of the incoming identifiers.
///
/// The store is expected to carry no staged changes of its own. If the
/// commit fails the store is reset, so nothing from this call persists.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be read or the commit fails.
pub fn reconcile<'a, S, I>(store: &mut S, representations: I) -> Result<ReconcileReport, StoreError>
where
    S: TaskStore + ?Sized,
    I: IntoIterator<Item = &'a TaskRepresentation>,
{
    let (mut incoming, skipped) = index_valid(representations);
    let mut report = ReconcileReport {
        skipped,
        ..ReconcileReport::default()
    };
    if incoming.is_empty() {
        return Ok(report);
    }

    let ids: HashSet<TaskId> = incoming.keys().copied().collect();
    for mut local in store.fetch(&ids)? {
        if let Some(remote) = incoming.remove(local.id()) {
            local.overwrite_from(&remote);
            store.insert(local);
            report.updated += 1;
        }
    }

    for task in incoming.into_values() {
        store.insert(task);
        report.created += 1;
    }

    if let Err(e) = store.commit() {
        tracing::error!(error = %e, "failed to commit reconciled tasks");
        store.reset();
        return Err(e);
    }

    tracing::info!(
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        "reconciled remote tasks"
    );
    Ok(report)
}
