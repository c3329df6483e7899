//! Embedded single-file store
//!
//! The store keeps the whole namespace tree in memory behind an `Arc` and
//! persists a checksummed image of it on every commit.
//!
//! - Read transactions capture the committed root (snapshot isolation) and
//!   never block writers or each other.
//! - Write transactions are serialized by a writer lock; they copy only the
//!   namespaces they modify and swap the committed root on commit.
//!
//! Every commit serializes the whole tree and, with `sync_on_commit`, fsyncs
//! it, so the cost of a single write grows with the total size of the store.
//! Batch related writes with [`Store::update`] or `KeyBox::put_many`.
//!
//! The store does not lock its file against other processes; open a given
//! file from one process at a time.

pub mod config;
pub mod file;
pub mod namespace;
pub mod tx;

pub use config::{StoreBuilder, StoreConfig};
pub use file::StoreFile;
pub use namespace::{Cursor, Namespace};
pub use tx::{ReadTx, WriteTx};

use crate::error::{NestboxError, Result};
use parking_lot::{Mutex, RwLock};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

struct Committed {
    root: Arc<Namespace>,
    commit_id: u64,
}

/// Store statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Last published commit (0 for a fresh store)
    pub commit_id: u64,
    /// Namespaces at every depth
    pub namespaces: usize,
    /// Values across all namespaces
    pub keys: usize,
    /// Backing file, `None` for in-memory stores
    pub path: Option<PathBuf>,
}

/// Transactional, ordered key-value store with nested namespaces
///
/// # Examples
///
/// ```rust
/// use nestbox::Store;
///
/// # fn main() -> nestbox::Result<()> {
/// let store = Store::in_memory();
///
/// store.update(|tx| {
///     let users = tx.create_namespace_if_missing(b"users")?;
///     users.put(b"alice", b"admin")
/// })?;
///
/// let role = store.view(|tx| {
///     Ok(tx
///         .namespace(b"users")
///         .and_then(|ns| ns.get(b"alice"))
///         .map(|v| v.to_vec()))
/// })?;
/// assert_eq!(role.as_deref(), Some(&b"admin"[..]));
/// # Ok(())
/// # }
/// ```
pub struct Store {
    committed: RwLock<Committed>,
    /// Held by the single active write transaction
    writer: Mutex<()>,
    file: Option<StoreFile>,
    config: StoreConfig,
}

impl Store {
    /// Open (or create) a store file with default options
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Open (or create) a store file
    ///
    /// # Errors
    ///
    /// Returns `Io(NotFound)` when the file is missing and creation is
    /// disabled, and `InvalidMagic`, `UnsupportedVersion`,
    /// `ChecksumMismatch`, `Corrupted` or `Encoding` when the file does not
    /// hold a valid image.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = StoreFile::new(path, config.sync_on_commit);

        let (root, commit_id) = if file.exists() {
            info!("Opening store at {:?}", path);
            file.read_image()?
        } else if config.create_if_missing && !config.read_only {
            info!("Creating store at {:?}", path);
            let root = Namespace::new();
            file.write_image(&root, 0)?;
            (root, 0)
        } else {
            return Err(NestboxError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("store file not found: {}", path.display()),
            )));
        };

        debug!("Loaded store image at commit {}", commit_id);

        Ok(Store {
            committed: RwLock::new(Committed {
                root: Arc::new(root),
                commit_id,
            }),
            writer: Mutex::new(()),
            file: Some(file),
            config,
        })
    }

    /// Create a store that lives only in memory
    pub fn in_memory() -> Self {
        Self::in_memory_with_config(StoreConfig::default())
    }

    /// Create an in-memory store with explicit options
    pub fn in_memory_with_config(config: StoreConfig) -> Self {
        Store {
            committed: RwLock::new(Committed {
                root: Arc::new(Namespace::new()),
                commit_id: 0,
            }),
            writer: Mutex::new(()),
            file: None,
            config,
        }
    }

    /// Begin a read transaction on the latest committed state
    pub fn begin_read(&self) -> ReadTx {
        let committed = self.committed.read();
        ReadTx::new(Arc::clone(&committed.root), committed.commit_id)
    }

    /// Begin a write transaction
    ///
    /// Blocks until any other write transaction has finished.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` if the store was opened read-only.
    pub fn begin_write(&self) -> Result<WriteTx<'_>> {
        if self.config.read_only {
            return Err(NestboxError::ReadOnly);
        }

        let writer = self.writer.lock();
        let (root, commit_id) = {
            let committed = self.committed.read();
            (Arc::clone(&committed.root), committed.commit_id)
        };

        Ok(WriteTx::new(self, writer, root, commit_id))
    }

    /// Run `f` inside a read transaction
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTx) -> Result<T>,
    {
        let tx = self.begin_read();
        f(&tx)
    }

    /// Run `f` inside a write transaction
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTx<'_>) -> Result<T>,
    {
        let mut tx = self.begin_write()?;
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Names of the top-level namespaces, in ascending order
    pub fn namespaces(&self) -> Vec<Vec<u8>> {
        self.begin_read()
            .root()
            .namespace_names()
            .map(<[u8]>::to_vec)
            .collect()
    }

    /// Commit id, namespace and key totals of the latest committed state
    pub fn stats(&self) -> StoreStats {
        let tx = self.begin_read();
        let (namespaces, keys) = tx.root().totals();

        StoreStats {
            commit_id: tx.commit_id(),
            namespaces,
            keys,
            path: self.path().map(Path::to_path_buf),
        }
    }

    /// Backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(StoreFile::path)
    }

    /// Options the store was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Persist and publish a new root; called with the writer lock held
    fn publish(&self, root: Arc<Namespace>, commit_id: u64) -> Result<()> {
        if let Some(file) = &self.file {
            let written = file.write_image(&root, commit_id)?;
            debug!("Commit {} wrote {} bytes", commit_id, written);
        }

        *self.committed.write() = Committed { root, commit_id };
        Ok(())
    }
}
