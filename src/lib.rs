//! # nestbox - nested, transactional key-value boxes
//!
//! `nestbox` layers a hierarchy of named namespaces ("boxes") over an
//! embedded, ordered, transactional key-value store, with a pluggable
//! [`Codec`] for storing structured values instead of raw bytes.
//!
//! - **Boxes** ([`KeyBox`]) name a namespace by its chain of ancestors and
//!   can be nested arbitrarily deep
//! - **One transaction per operation**: reads run on a snapshot, writes are
//!   serialized and create missing namespaces on the way
//! - **Transaction-scoped access** through [`KeyBox::view`] and
//!   [`KeyBox::update`] for atomic multi-step work
//! - **Codecs**: [`JsonCodec`] and [`BincodeCodec`], both able to decode a
//!   whole box as one collection
//! - **Single-file store** with a checksummed image replaced atomically on
//!   every commit
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nestbox::{BoxFactory, JsonCodec, Result, Store};
//! use std::collections::HashMap;
//!
//! # fn main() -> Result<()> {
//! let store = Store::open("app.nbox")?;
//! let boxes = BoxFactory::new(&store, JsonCodec::new());
//!
//! let accounts = boxes.open("accounts");
//! let id = accounts.next_sequence()?;
//!
//! let mut account = HashMap::new();
//! account.insert("owner", "ada");
//! accounts.put_encoded(id.to_be_bytes(), &account)?;
//!
//! let all: Vec<HashMap<String, String>> = accounts.get_all_decoded()?;
//! assert_eq!(all.len(), 1);
//!
//! // Child boxes live inside their parent and never see its keys
//! let archived = accounts.nested("archived");
//! assert!(archived.get(id.to_be_bytes()).is_none());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  KeyBox / BoxFactory                        │
//! │   - path resolution (root → leaf)           │
//! │   - one transaction per call                │
//! │   - BoxView / BoxTx for scoped access       │
//! ├─────────────────────────────────────────────┤
//! │  Codec (JsonCodec, BincodeCodec)            │
//! ├─────────────────────────────────────────────┤
//! │  Store                                      │
//! │   - ReadTx: Arc snapshot of the tree        │
//! │   - WriteTx: single writer, copy-on-write   │
//! │   - StoreFile: header + CRC32 + image       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Each commit rewrites the full image, so write cost scales with the size
//! of the whole store rather than the size of the change.

pub mod codec;
pub mod error;
pub mod keybox;
pub mod store;
pub mod validation;

pub use codec::{BincodeCodec, Codec, JsonCodec};
pub use error::{NestboxError, Result};
pub use keybox::{BoxFactory, BoxTx, BoxView, KeyBox};
pub use store::{
    Cursor, Namespace, ReadTx, Store, StoreBuilder, StoreConfig, StoreStats, WriteTx,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
