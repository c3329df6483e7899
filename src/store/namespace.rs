//! Namespaces and cursors
//!
//! A namespace is an ordered map of keys to values plus an ordered map of
//! child namespaces and a monotonic counter. Values and children live in
//! separate key spaces. Children are reference counted so that a write
//! transaction only copies the namespaces along the path it mutates.

use crate::error::{NestboxError, Result};
use crate::validation::{validate_key, validate_name, validate_value};
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// A node of the namespace tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Namespace {
    values: BTreeMap<Vec<u8>, Vec<u8>>,
    children: BTreeMap<Vec<u8>, Arc<Namespace>>,
    sequence: u64,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the value stored at `key`
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.values.get(key).map(Vec::as_slice)
    }

    /// Store `value` at `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns `KeyRequired`, `KeyTooLarge` or `ValueTooLarge` when the entry
    /// fails validation.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        validate_key(key)?;
        validate_value(value)?;
        self.values.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    /// Remove `key`, returning the value it held
    pub fn delete(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.values.remove(key)
    }

    /// Number of values (child namespaces excluded)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Ordered cursor over the values of this namespace
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.values)
    }

    /// Entries whose key starts with `prefix`, in ascending key order
    pub fn scan_prefix<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        let mut cursor = self.cursor();
        let first = cursor.seek(prefix);
        first
            .into_iter()
            .chain(cursor)
            .take_while(move |(k, _)| k.starts_with(prefix))
    }

    /// Current value of the counter (0 for a fresh namespace)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Advance the counter and return the new value
    pub fn next_sequence(&mut self) -> Result<u64> {
        self.sequence = self
            .sequence
            .checked_add(1)
            .ok_or(NestboxError::SequenceOverflow)?;
        Ok(self.sequence)
    }

    pub fn set_sequence(&mut self, value: u64) {
        self.sequence = value;
    }

    /// Child namespace named `name`, if it exists
    pub fn namespace(&self, name: &[u8]) -> Option<&Namespace> {
        self.children.get(name).map(Arc::as_ref)
    }

    /// Mutable child namespace named `name`, if it exists
    ///
    /// The child is copied first if it is still shared with a snapshot.
    pub fn namespace_mut(&mut self, name: &[u8]) -> Option<&mut Namespace> {
        self.children.get_mut(name).map(Arc::make_mut)
    }

    /// Open the child namespace named `name`, creating it if necessary
    pub fn create_namespace_if_missing(&mut self, name: &[u8]) -> Result<&mut Namespace> {
        validate_name(name)?;
        let child = self.children.entry(name.to_vec()).or_default();
        Ok(Arc::make_mut(child))
    }

    /// Drop the child namespace named `name` together with everything below it
    pub fn delete_namespace(&mut self, name: &[u8]) -> Result<()> {
        match self.children.remove(name) {
            Some(_) => Ok(()),
            None => Err(NestboxError::NamespaceNotFound(
                String::from_utf8_lossy(name).into_owned(),
            )),
        }
    }

    /// Names of the direct child namespaces, in ascending order
    pub fn namespace_names(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.children.keys().map(Vec::as_slice)
    }

    /// Recursive (namespace count, value count) below and including `self`
    pub(crate) fn totals(&self) -> (usize, usize) {
        self.children
            .values()
            .fold((0, self.values.len()), |(ns, keys), child| {
                let (child_ns, child_keys) = child.totals();
                (ns + 1 + child_ns, keys + child_keys)
            })
    }
}

/// Ordered cursor over the values of one namespace
///
/// `first` and `seek` reposition the cursor and return the entry they land
/// on; iteration continues from there in ascending key order.
pub struct Cursor<'a> {
    values: &'a BTreeMap<Vec<u8>, Vec<u8>>,
    range: btree_map::Range<'a, Vec<u8>, Vec<u8>>,
}

impl<'a> Cursor<'a> {
    fn new(values: &'a BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Cursor {
            values,
            range: values.range::<[u8], _>(..),
        }
    }

    /// Move to the first entry
    pub fn first(&mut self) -> Option<(&'a [u8], &'a [u8])> {
        self.range = self.values.range::<[u8], _>(..);
        self.next()
    }

    /// Move to the first entry whose key is greater than or equal to `key`
    pub fn seek(&mut self, key: &[u8]) -> Option<(&'a [u8], &'a [u8])> {
        self.range = self
            .values
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded));
        self.next()
    }
}

impl<'a> Iterator for Cursor<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        self.range
            .next()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}
