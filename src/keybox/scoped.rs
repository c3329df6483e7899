//! Transaction-scoped box access
//!
//! [`BoxView`] and [`BoxTx`] wrap a namespace that has already been resolved
//! inside an open transaction, so several operations can run against it
//! atomically. They are handed out by [`KeyBox::view`](super::KeyBox::view)
//! and [`KeyBox::update`](super::KeyBox::update).

use crate::codec::Codec;
use crate::error::{NestboxError, Result};
use crate::store::Namespace;
use serde::de::DeserializeOwned;
use serde::Serialize;

fn require<C>(codec: Option<&C>) -> Result<&C> {
    codec.ok_or(NestboxError::NoCodec)
}

/// Read access to a resolved box inside a read transaction
pub struct BoxView<'t, C> {
    ns: &'t Namespace,
    codec: Option<&'t C>,
}

impl<'t, C: Codec> BoxView<'t, C> {
    pub(crate) fn new(ns: &'t Namespace, codec: Option<&'t C>) -> Self {
        BoxView { ns, codec }
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<Vec<u8>> {
        self.ns.get(key.as_ref()).map(<[u8]>::to_vec)
    }

    /// Decode the value at `key`; an absent value is handed to the codec as
    /// empty input
    pub fn get_decoded<T: DeserializeOwned>(&self, key: impl AsRef<[u8]>) -> Result<T> {
        let codec = require(self.codec)?;
        codec.unmarshal(self.ns.get(key.as_ref()).unwrap_or_default())
    }

    /// Every value in ascending key order
    pub fn get_all(&self) -> Vec<Vec<u8>> {
        self.ns.cursor().map(|(_, v)| v.to_vec()).collect()
    }

    pub fn get_all_entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.ns
            .cursor()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect()
    }

    pub fn get_all_decoded<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let codec = require(self.codec)?;
        codec.unmarshal(&codec.join(self.get_all()))
    }

    /// Values whose key starts with `prefix`, in ascending key order
    pub fn prefix_scan(&self, prefix: impl AsRef<[u8]>) -> Vec<Vec<u8>> {
        self.ns
            .scan_prefix(prefix.as_ref())
            .map(|(_, v)| v.to_vec())
            .collect()
    }

    pub fn prefix_scan_decoded<T: DeserializeOwned>(
        &self,
        prefix: impl AsRef<[u8]>,
    ) -> Result<Vec<T>> {
        let codec = require(self.codec)?;
        codec.unmarshal(&codec.join(self.prefix_scan(prefix)))
    }

    /// Current counter value (0 if never advanced)
    pub fn sequence(&self) -> u64 {
        self.ns.sequence()
    }

    pub fn len(&self) -> usize {
        self.ns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ns.is_empty()
    }
}

/// Read-write access to a resolved box inside a write transaction
///
/// Everything done through a `BoxTx` commits or rolls back together.
pub struct BoxTx<'t, C> {
    ns: &'t mut Namespace,
    codec: Option<&'t C>,
}

impl<'t, C: Codec> BoxTx<'t, C> {
    pub(crate) fn new(ns: &'t mut Namespace, codec: Option<&'t C>) -> Self {
        BoxTx { ns, codec }
    }

    /// Read view over the uncommitted state of this transaction
    pub fn as_view(&self) -> BoxView<'_, C> {
        BoxView::new(&*self.ns, self.codec)
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<Vec<u8>> {
        self.as_view().get(key)
    }

    pub fn get_decoded<T: DeserializeOwned>(&self, key: impl AsRef<[u8]>) -> Result<T> {
        self.as_view().get_decoded(key)
    }

    pub fn get_all(&self) -> Vec<Vec<u8>> {
        self.as_view().get_all()
    }

    pub fn prefix_scan(&self, prefix: impl AsRef<[u8]>) -> Vec<Vec<u8>> {
        self.as_view().prefix_scan(prefix)
    }

    pub fn put(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        self.ns.put(key.as_ref(), value.as_ref())
    }

    pub fn put_encoded<T>(&mut self, key: impl AsRef<[u8]>, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let encoded = require(self.codec)?.marshal(value)?;
        self.put(key, encoded)
    }

    /// Remove `key`; removing an absent key is not an error
    pub fn delete(&mut self, key: impl AsRef<[u8]>) {
        self.ns.delete(key.as_ref());
    }

    /// Remove `key` and return the value it held
    pub fn delete_returning(&mut self, key: impl AsRef<[u8]>) -> Option<Vec<u8>> {
        self.ns.delete(key.as_ref())
    }

    /// Remove `key` and decode the value it held
    ///
    /// An absent value is handed to the codec as empty input. On a decode
    /// failure the error is returned and, when run through
    /// [`KeyBox::update`](super::KeyBox::update), the delete is rolled back.
    pub fn delete_returning_decoded<T: DeserializeOwned>(
        &mut self,
        key: impl AsRef<[u8]>,
    ) -> Result<T> {
        let codec = require(self.codec)?;
        let previous = self.ns.delete(key.as_ref()).unwrap_or_default();
        codec.unmarshal(&previous)
    }

    pub fn next_sequence(&mut self) -> Result<u64> {
        self.ns.next_sequence()
    }

    pub fn set_sequence(&mut self, value: u64) {
        self.ns.set_sequence(value);
    }

    pub fn sequence(&self) -> u64 {
        self.ns.sequence()
    }
}
