//! Read and write transactions
//!
//! Read transactions hold an immutable snapshot of the namespace tree and
//! never block. Write transactions hold the store's writer lock for their
//! whole lifetime and mutate a copy-on-write view of the tree that is only
//! published on [`WriteTx::commit`].

use crate::error::Result;
use crate::store::namespace::Namespace;
use crate::store::Store;
use parking_lot::MutexGuard;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read-only snapshot of the store
pub struct ReadTx {
    root: Arc<Namespace>,
    commit_id: u64,
}

impl ReadTx {
    pub(crate) fn new(root: Arc<Namespace>, commit_id: u64) -> Self {
        ReadTx { root, commit_id }
    }

    /// Root of the namespace tree (holds only top-level namespaces)
    pub fn root(&self) -> &Namespace {
        &self.root
    }

    /// Top-level namespace named `name`
    pub fn namespace(&self, name: &[u8]) -> Option<&Namespace> {
        self.root.namespace(name)
    }

    /// Commit this snapshot was taken at
    pub fn commit_id(&self) -> u64 {
        self.commit_id
    }
}

/// Exclusive read-write transaction
///
/// Dropping a transaction without committing discards its changes.
pub struct WriteTx<'s> {
    store: &'s Store,
    /// Committed root at begin; used to detect an untouched transaction
    base: Arc<Namespace>,
    root: Arc<Namespace>,
    base_commit_id: u64,
    finished: bool,
    _writer: MutexGuard<'s, ()>,
}

impl<'s> WriteTx<'s> {
    pub(crate) fn new(
        store: &'s Store,
        writer: MutexGuard<'s, ()>,
        base: Arc<Namespace>,
        base_commit_id: u64,
    ) -> Self {
        WriteTx {
            store,
            root: Arc::clone(&base),
            base,
            base_commit_id,
            finished: false,
            _writer: writer,
        }
    }

    pub fn root(&self) -> &Namespace {
        &self.root
    }

    /// Mutable root; copies it on first use
    pub fn root_mut(&mut self) -> &mut Namespace {
        Arc::make_mut(&mut self.root)
    }

    /// Top-level namespace named `name`
    pub fn namespace(&self, name: &[u8]) -> Option<&Namespace> {
        self.root.namespace(name)
    }

    /// Mutable top-level namespace named `name`, if it exists
    pub fn namespace_mut(&mut self, name: &[u8]) -> Option<&mut Namespace> {
        if self.root.namespace(name).is_none() {
            return None;
        }
        self.root_mut().namespace_mut(name)
    }

    /// Open the top-level namespace named `name`, creating it if necessary
    pub fn create_namespace_if_missing(&mut self, name: &[u8]) -> Result<&mut Namespace> {
        self.root_mut().create_namespace_if_missing(name)
    }

    /// Drop a top-level namespace and everything below it
    pub fn delete_namespace(&mut self, name: &[u8]) -> Result<()> {
        self.root_mut().delete_namespace(name)
    }

    /// Commit id this transaction will publish
    pub fn commit_id(&self) -> u64 {
        self.base_commit_id + 1
    }

    /// Publish the changes made in this transaction
    ///
    /// A transaction that never touched the tree commits without writing.
    ///
    /// # Errors
    ///
    /// Returns an I/O or encoding error if the new image cannot be persisted;
    /// the committed state is left unchanged in that case.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;

        if Arc::ptr_eq(&self.root, &self.base) {
            debug!("Write transaction made no changes, skipping commit");
            return Ok(());
        }

        let commit_id = self.commit_id();
        self.store.publish(Arc::clone(&self.root), commit_id)
    }

    /// Discard the changes made in this transaction
    pub fn rollback(mut self) {
        self.finished = true;
        debug!("Rolled back write transaction on commit {}", self.base_commit_id);
    }
}

impl Drop for WriteTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Write transaction dropped without commit or rollback, discarding changes");
        }
    }
}
