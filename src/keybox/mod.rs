//! Boxes: named, nestable handles into the store
//!
//! A [`KeyBox`] names a namespace by its chain of ancestors. It holds no
//! transaction; every operation opens one, resolves the chain from the root
//! inward inside it, does its work and returns.
//!
//! ```rust
//! use nestbox::{KeyBox, Store};
//!
//! # fn main() -> nestbox::Result<()> {
//! let store = Store::in_memory();
//!
//! let users = KeyBox::new(&store, "users");
//! users.put("k1", "vvv1")?;
//!
//! let sessions = users.nested("sessions");
//! sessions.put("k2", "v2")?;
//!
//! assert_eq!(sessions.get("k1"), None);
//! assert_eq!(users.get("k1"), Some(b"vvv1".to_vec()));
//! # Ok(())
//! # }
//! ```

mod scoped;

pub use scoped::{BoxTx, BoxView};

use crate::codec::{Codec, JsonCodec};
use crate::error::{NestboxError, Result};
use crate::store::{Namespace, Store, WriteTx};
use crate::validation::display_path;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

/// One link of a box's ancestor chain
#[derive(Debug, Clone)]
struct Segment<'a> {
    name: Vec<u8>,
    parent: Option<&'a Segment<'a>>,
}

/// Handle to a (possibly nested) namespace plus an optional value codec
///
/// Children borrow their parent, so a child never outlives it. Reads never
/// create namespaces and treat a missing namespace as empty; writes create
/// every missing namespace on the path.
#[derive(Clone)]
pub struct KeyBox<'a, C = JsonCodec> {
    store: &'a Store,
    segment: Segment<'a>,
    codec: Option<C>,
}

impl<'a> KeyBox<'a> {
    /// Root box without a codec
    pub fn new(store: &'a Store, name: impl AsRef<[u8]>) -> Self {
        KeyBox {
            store,
            segment: Segment {
                name: name.as_ref().to_vec(),
                parent: None,
            },
            codec: None,
        }
    }
}

impl<'a, C> KeyBox<'a, C> {
    /// Name of this box within its parent
    pub fn name(&self) -> &[u8] {
        &self.segment.name
    }

    /// Codec used by the encoded/decoded operations, if any
    pub fn codec(&self) -> Option<&C> {
        self.codec.as_ref()
    }

    /// Store this box reads from and writes to
    pub fn store(&self) -> &'a Store {
        self.store
    }

    /// Names from the root ancestor down to this box
    pub fn path(&self) -> Vec<&[u8]> {
        let mut names = Vec::new();
        let mut segment = Some(&self.segment);
        while let Some(s) = segment {
            names.push(s.name.as_slice());
            segment = s.parent;
        }
        names.reverse();
        names
    }

    /// Path rendered as `root/child/leaf` for diagnostics
    pub fn path_string(&self) -> String {
        display_path(self.path())
    }
}

impl<'a, C: Codec> KeyBox<'a, C> {
    /// Root box using `codec` for the encoded/decoded operations
    pub fn with_codec(store: &'a Store, name: impl AsRef<[u8]>, codec: C) -> Self {
        KeyBox {
            store,
            segment: Segment {
                name: name.as_ref().to_vec(),
                parent: None,
            },
            codec: Some(codec),
        }
    }

    /// Child box named `name`, sharing this box's store and codec
    pub fn nested<'b>(&'b self, name: impl AsRef<[u8]>) -> KeyBox<'b, C> {
        KeyBox {
            store: self.store,
            segment: Segment {
                name: name.as_ref().to_vec(),
                parent: Some(&self.segment),
            },
            codec: self.codec.clone(),
        }
    }

    /// Child box named `name` with its own codec
    pub fn nested_with_codec<'b, D: Codec>(
        &'b self,
        name: impl AsRef<[u8]>,
        codec: D,
    ) -> KeyBox<'b, D> {
        KeyBox {
            store: self.store,
            segment: Segment {
                name: name.as_ref().to_vec(),
                parent: Some(&self.segment),
            },
            codec: Some(codec),
        }
    }

    /// Resolve this box inside a transaction without creating anything
    ///
    /// # Errors
    ///
    /// Returns `NamespaceNotFound` naming the first missing prefix of the path.
    pub fn resolve<'t>(&self, root: &'t Namespace) -> Result<&'t Namespace> {
        let path = self.path();
        let mut ns = root;
        for (depth, name) in path.iter().enumerate() {
            ns = ns.namespace(name).ok_or_else(|| {
                NestboxError::NamespaceNotFound(display_path(path[..=depth].iter().copied()))
            })?;
        }
        Ok(ns)
    }

    /// Resolve this box inside a write transaction, creating every missing
    /// namespace on the path
    pub fn resolve_mut<'t>(&self, tx: &'t mut WriteTx<'_>) -> Result<&'t mut Namespace> {
        let mut ns = tx.root_mut();
        for name in self.path() {
            ns = ns.create_namespace_if_missing(name)?;
        }
        Ok(ns)
    }

    /// Run `f` against this box inside one read transaction
    ///
    /// Unlike the single-shot reads, a missing namespace is an error here.
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&BoxView<'_, C>) -> Result<T>,
    {
        self.store.view(|tx| {
            let ns = self.resolve(tx.root())?;
            f(&BoxView::new(ns, self.codec.as_ref()))
        })
    }

    /// Run `f` against this box inside one write transaction
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BoxTx<'_, C>) -> Result<T>,
    {
        self.store.update(|tx| {
            let ns = self.resolve_mut(tx)?;
            f(&mut BoxTx::new(ns, self.codec.as_ref()))
        })
    }

    /// Read with absence semantics: a missing namespace yields `default`
    fn read<T, F>(&self, default: T, f: F) -> T
    where
        F: FnOnce(&BoxView<'_, C>) -> T,
    {
        let tx = self.store.begin_read();
        match self.resolve(tx.root()) {
            Ok(ns) => f(&BoxView::new(ns, self.codec.as_ref())),
            Err(err) => {
                trace!("Read treated as empty: {}", err);
                default
            }
        }
    }

    fn require_codec(&self) -> Result<&C> {
        self.codec.as_ref().ok_or(NestboxError::NoCodec)
    }

    /// Whether the namespace of this box has been created
    pub fn exists(&self) -> bool {
        self.read(false, |_| true)
    }

    /// Value stored at `key`, `None` if the key or the namespace is absent
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<Vec<u8>> {
        self.read(None, |view| view.get(key))
    }

    /// Decode the value stored at `key`
    ///
    /// An absent value is passed to the codec as empty input, which both
    /// bundled codecs reject with a `Codec` error.
    pub fn get_decoded<T: DeserializeOwned>(&self, key: impl AsRef<[u8]>) -> Result<T> {
        let codec = self.require_codec()?;
        let bytes = self.get(key).unwrap_or_default();
        codec.unmarshal(&bytes)
    }

    /// Every value in ascending key order
    pub fn get_all(&self) -> Vec<Vec<u8>> {
        self.read(Vec::new(), |view| view.get_all())
    }

    /// Every key/value pair in ascending key order
    pub fn get_all_entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.read(Vec::new(), |view| view.get_all_entries())
    }

    /// Decode every value of the box as one collection
    pub fn get_all_decoded<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let codec = self.require_codec()?;
        codec.unmarshal(&codec.join(self.get_all()))
    }

    /// Values whose key starts with `prefix`, in ascending key order
    pub fn prefix_scan(&self, prefix: impl AsRef<[u8]>) -> Vec<Vec<u8>> {
        self.read(Vec::new(), |view| view.prefix_scan(prefix))
    }

    pub fn prefix_scan_decoded<T: DeserializeOwned>(
        &self,
        prefix: impl AsRef<[u8]>,
    ) -> Result<Vec<T>> {
        let codec = self.require_codec()?;
        codec.unmarshal(&codec.join(self.prefix_scan(prefix)))
    }

    /// Store `value` at `key`, replacing any previous value
    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let (key, value) = (key.as_ref(), value.as_ref());
        debug!("Put {} bytes in {}", value.len(), self.path_string());
        self.update(|tx| tx.put(key, value))
    }

    /// Encode `value` with the box codec and store it at `key`
    pub fn put_encoded<T>(&self, key: impl AsRef<[u8]>, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let encoded = self.require_codec()?.marshal(value)?;
        self.put(key, encoded)
    }

    /// Store several entries in one transaction
    pub fn put_many<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.update(|tx| {
            for (key, value) in entries {
                tx.put(key, value)?;
            }
            Ok(())
        })
    }

    /// Remove `key`; removing an absent key is not an error
    pub fn delete(&self, key: impl AsRef<[u8]>) -> Result<()> {
        debug!("Delete in {}", self.path_string());
        self.update(|tx| {
            tx.delete(key);
            Ok(())
        })
    }

    /// Remove `key` and return the value it held
    ///
    /// The read and the delete run in the same write transaction, so the
    /// returned value is exactly the one removed.
    pub fn delete_returning(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        debug!("Delete (returning) in {}", self.path_string());
        self.update(|tx| Ok(tx.delete_returning(key)))
    }

    /// Remove `key` and decode the value it held
    ///
    /// Fails with `NoCodec` before touching the store when no codec is set.
    /// The delete commits before decoding, so a decode failure is reported
    /// with the key already gone. Use [`BoxTx::delete_returning_decoded`]
    /// inside [`KeyBox::update`] to keep the key when decoding fails.
    pub fn delete_returning_decoded<T: DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
    ) -> Result<T> {
        let codec = self.require_codec()?;
        let previous = self.delete_returning(key)?;
        codec.unmarshal(&previous.unwrap_or_default())
    }

    /// Next value of the box's monotonic counter (1 for a fresh box)
    pub fn next_sequence(&self) -> Result<u64> {
        let seq = self.update(|tx| tx.next_sequence())?;
        debug!("Sequence {} issued in {}", seq, self.path_string());
        Ok(seq)
    }

    /// Overwrite the box's counter
    pub fn set_sequence(&self, value: u64) -> Result<()> {
        self.update(|tx| {
            tx.set_sequence(value);
            Ok(())
        })
    }
}

impl<C> std::fmt::Debug for KeyBox<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBox")
            .field("path", &self.path_string())
            .field("codec", &self.codec.is_some())
            .finish()
    }
}

/// Binds a store and a codec and hands out root boxes by name
pub struct BoxFactory<'a, C = JsonCodec> {
    store: &'a Store,
    codec: Option<C>,
}

impl<'a> BoxFactory<'a> {
    /// Factory for boxes without a codec
    pub fn without_codec(store: &'a Store) -> Self {
        BoxFactory { store, codec: None }
    }
}

impl<'a, C: Codec> BoxFactory<'a, C> {
    /// Factory whose boxes all use `codec`
    pub fn new(store: &'a Store, codec: C) -> Self {
        BoxFactory {
            store,
            codec: Some(codec),
        }
    }

    /// Root box named `name`
    pub fn open(&self, name: impl AsRef<[u8]>) -> KeyBox<'a, C> {
        KeyBox {
            store: self.store,
            segment: Segment {
                name: name.as_ref().to_vec(),
                parent: None,
            },
            codec: self.codec.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BincodeCodec;

    #[test]
    fn test_path_is_root_first() {
        let store = Store::in_memory();
        let a = KeyBox::new(&store, "a");
        let b = a.nested("b");
        let c = b.nested("c");

        assert_eq!(c.path(), vec![&b"a"[..], &b"b"[..], &b"c"[..]]);
        assert_eq!(c.path_string(), "a/b/c");
        assert_eq!(c.name(), b"c");
    }

    #[test]
    fn test_resolve_reports_first_missing_prefix() {
        let store = Store::in_memory();
        let a = KeyBox::new(&store, "a");
        let b = a.nested("b");
        let c = b.nested("c");
        a.put("k", "v").unwrap();

        let tx = store.begin_read();
        match c.resolve(tx.root()) {
            Err(NestboxError::NamespaceNotFound(path)) => assert_eq!(path, "a/b"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_resolve_mut_creates_whole_chain() {
        let store = Store::in_memory();
        let a = KeyBox::new(&store, "a");
        let b = a.nested("b");
        let c = b.nested("c");
        let d = c.nested("d");

        d.put("leaf", "1").unwrap();

        assert!(a.exists());
        assert!(b.exists());
        assert!(c.exists());
        assert!(d.exists());
        assert!(a.get_all().is_empty());
        assert_eq!(d.get("leaf"), Some(b"1".to_vec()));
    }

    #[test]
    fn test_reads_do_not_create() {
        let store = Store::in_memory();
        let ghost = KeyBox::new(&store, "ghost");

        assert_eq!(ghost.get("k"), None);
        assert!(ghost.get_all().is_empty());
        assert!(ghost.prefix_scan("k").is_empty());
        assert!(!ghost.exists());
        assert!(store.namespaces().is_empty());
    }

    #[test]
    fn test_view_on_missing_namespace_fails() {
        let store = Store::in_memory();
        let ghost = KeyBox::new(&store, "ghost");

        let err = ghost.view(|v| Ok(v.len())).unwrap_err();
        assert!(err.is_namespace_not_found());
    }

    #[test]
    fn test_nested_inherits_codec() {
        let store = Store::in_memory();
        let root = KeyBox::with_codec(&store, "root", JsonCodec::new());
        let child = root.nested("child");

        assert!(child.codec().is_some());
        child.put_encoded("n", &5u32).unwrap();
        assert_eq!(child.get("n"), Some(b"5".to_vec()));
    }

    #[test]
    fn test_nested_with_codec_overrides() {
        let store = Store::in_memory();
        let root = KeyBox::new(&store, "root");
        let child = root.nested_with_codec("bin", BincodeCodec::new());

        child.put_encoded("n", &5u32).unwrap();
        assert_eq!(child.get("n"), Some(5u32.to_le_bytes().to_vec()));
        assert_eq!(child.get_decoded::<u32>("n").unwrap(), 5);
        assert!(matches!(
            root.put_encoded("n", &5u32),
            Err(NestboxError::NoCodec)
        ));
    }

    #[test]
    fn test_update_is_atomic() {
        let store = Store::in_memory();
        let b = KeyBox::new(&store, "atomic");
        b.put("keep", "1").unwrap();

        let result: Result<()> = b.update(|tx| {
            tx.put("keep", "2")?;
            tx.put("", "invalid")
        });

        assert!(matches!(result, Err(NestboxError::KeyRequired)));
        assert_eq!(b.get("keep"), Some(b"1".to_vec()));
    }

    #[test]
    fn test_delete_returning_decoded_deletes_before_decoding() {
        let store = Store::in_memory();
        let b = KeyBox::with_codec(&store, "decode", JsonCodec::new());
        b.put("raw", "not json").unwrap();

        assert!(matches!(
            b.delete_returning_decoded::<u32>("raw"),
            Err(NestboxError::Codec(_))
        ));
        assert_eq!(b.get("raw"), None);
    }

    #[test]
    fn test_scoped_delete_returning_decoded_rolls_back() {
        let store = Store::in_memory();
        let b = KeyBox::with_codec(&store, "scoped", JsonCodec::new());
        b.put("raw", "not json").unwrap();

        let result = b.update(|tx| tx.delete_returning_decoded::<u32>("raw"));
        assert!(matches!(result, Err(NestboxError::Codec(_))));
        assert_eq!(b.get("raw"), Some(b"not json".to_vec()));
    }

    #[test]
    fn test_factory_binds_codec() {
        let store = Store::in_memory();
        let factory = BoxFactory::new(&store, JsonCodec::new());
        let plain = BoxFactory::without_codec(&store);

        assert!(factory.open("x").codec().is_some());
        assert!(plain.open("x").codec().is_none());
    }

    #[test]
    fn test_debug_shows_path() {
        let store = Store::in_memory();
        let a = KeyBox::new(&store, "a");
        let b = a.nested("b");
        assert_eq!(format!("{:?}", b), "KeyBox { path: \"a/b\", codec: false }");
    }
}
