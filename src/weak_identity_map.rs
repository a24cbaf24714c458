//! WeakIdentityMap: public map with weakly held, identity-compared keys.

use crate::error::Result;
use crate::handle_hash_map::{self, HandleHashMap, Slot, Upsert};
use crate::reclaim::ReclaimQueue;
use crate::referent::{Referent, WeakReferent};
use crate::weak_key::WeakKeyHandle;
use core::fmt;
use core::hash::BuildHasher;
use std::collections::hash_map::RandomState;

/// Map from key *objects* to values that never keeps its keys alive.
///
/// Keys are compared by identity: two value-equal `Referent`s are two
/// different keys. Once the last owner of a key drops, its entry is purged
/// at the start of the map's next operation, so no accessor ever reports
/// it again. Every operation may purge and therefore takes `&mut self`.
pub struct WeakIdentityMap<K, V, S = RandomState> {
    table: HandleHashMap<K, V, S>,
    queue: ReclaimQueue,
}

impl<K, V> WeakIdentityMap<K, V> {
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V> Default for WeakIdentityMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> WeakIdentityMap<K, V, S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            table: HandleHashMap::with_capacity_and_hasher(capacity, hasher),
            queue: ReclaimQueue::new(),
        }
    }

    /// Hasher applied to key identities.
    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    /// Number of entries the map can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Drain the reclamation queue, removing every reported entry whose key
    /// is gone. Values are dropped one at a time outside the table; a value
    /// that owned the last reference to another key reports that key into
    /// the same queue, and this loop drains it too.
    fn purge(&mut self) {
        let mut purged = 0usize;
        while let Some(slot) = self.queue.poll() {
            if let Some(value) = self.table.remove_reclaimed(slot) {
                drop(value);
                purged += 1;
            }
        }
        if purged > 0 {
            log::trace!("purged {} reclaimed entries, {} remain", purged, self.table.len());
        }
    }

    fn find(&self, key: &Referent<K>) -> Option<Slot> {
        self.table.find(&self.table.make_handle(key))
    }

    fn insert_handle(&mut self, key: &Referent<K>, handle: WeakKeyHandle<K>, value: V) -> Option<V> {
        match self.table.upsert(handle, value) {
            Upsert::Inserted(slot) => {
                key.watch(self.queue.watcher(slot));
                None
            }
            Upsert::Replaced(previous) => Some(previous),
        }
    }

    /// Map `key` to `value`, returning the value previously mapped to the
    /// same object.
    pub fn put(&mut self, key: &Referent<K>, value: V) -> Option<V> {
        self.purge();
        let handle = self.table.make_handle(key);
        self.insert_handle(key, handle, value)
    }

    /// Like [`put`](Self::put) for a key reached through a weak reference.
    ///
    /// Fails with [`Error::ArgumentNull`](crate::Error::ArgumentNull) and
    /// leaves the map untouched if the reference is null or its object was
    /// already reclaimed.
    pub fn try_put(&mut self, key: &WeakReferent<K>, value: V) -> Result<Option<V>> {
        let (handle, key) = WeakKeyHandle::from_weak(key, self.table.hasher())?;
        self.purge();
        Ok(self.insert_handle(&key, handle, value))
    }

    pub fn get(&mut self, key: &Referent<K>) -> Option<&V> {
        self.purge();
        let slot = self.find(key)?;
        self.table.value(slot)
    }

    pub fn get_mut(&mut self, key: &Referent<K>) -> Option<&mut V> {
        self.purge();
        let slot = self.find(key)?;
        self.table.value_mut(slot)
    }

    /// True if this exact object is a key; value-equal objects do not count.
    pub fn contains_key(&mut self, key: &Referent<K>) -> bool {
        self.purge();
        self.find(key).is_some()
    }

    /// True if some entry with a live key holds a value equal to `value`.
    pub fn contains_value(&mut self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.purge();
        self.table
            .iter()
            .any(|(_, handle, v)| v == value && handle.is_live())
    }

    pub fn remove(&mut self, key: &Referent<K>) -> Option<V> {
        self.purge();
        let slot = self.find(key)?;
        let (_handle, value) = self.table.remove(slot)?;
        key.unwatch(&self.queue, slot);
        Some(value)
    }

    /// Number of entries left after purging.
    pub fn len(&mut self) -> usize {
        self.purge();
        self.table.len()
    }

    /// True if no entry has a live key. Checks every remaining key
    /// directly instead of trusting the queue alone.
    pub fn is_empty(&mut self) -> bool {
        self.purge();
        !self.table.iter().any(|(_, handle, _)| handle.is_live())
    }

    /// Snapshot of the live keys.
    pub fn keys(&mut self) -> Vec<Referent<K>> {
        self.purge();
        self.table
            .iter()
            .filter_map(|(_, handle, _)| handle.get())
            .collect()
    }

    /// Snapshot of the values whose keys are live.
    pub fn values(&mut self) -> Vec<V>
    where
        V: Clone,
    {
        self.purge();
        self.table
            .iter()
            .filter(|(_, handle, _)| handle.is_live())
            .map(|(_, _, v)| v.clone())
            .collect()
    }

    /// Snapshot of the live entries. Each [`EntryView`] reads and writes
    /// its value back through the map.
    pub fn entries(&mut self) -> Vec<EntryView<K>> {
        self.keys().into_iter().map(|key| EntryView { key }).collect()
    }

    /// Iterate live entries as `(key, &value)`.
    pub fn iter(&mut self) -> Iter<'_, K, V> {
        self.purge();
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Iterate live entries as `(key, &mut value)`.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.purge();
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Keep only the entries for which `keep` returns true. Entries whose
    /// key is gone are dropped without consulting `keep`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Referent<K>, &mut V) -> bool,
    {
        self.purge();
        let removed = self.table.extract_if(|handle, v| match handle.get() {
            Some(key) => keep(&key, v),
            None => false,
        });
        self.release(removed);
    }

    pub fn clear(&mut self) {
        self.purge();
        let removed = self.table.drain_all();
        self.release(removed);
        // Slots reported while the values dropped no longer exist.
        self.queue.clear();
    }

    /// Purge once, then `put` every pair in iteration order. Keys passed by
    /// value and owned nowhere else are reclaimed as soon as they drop.
    pub fn put_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (Referent<K>, V)>,
    {
        self.purge();
        for (key, value) in entries {
            self.put(&key, value);
        }
    }

    /// Detach this map's watchers from the live keys of removed entries,
    /// then drop the entries.
    fn release(&self, removed: Vec<(Slot, WeakKeyHandle<K>, V)>) {
        for (slot, handle, _) in &removed {
            if let Some(key) = handle.get() {
                key.unwatch(&self.queue, *slot);
            }
        }
        drop(removed);
    }
}

/// One `(key, value)` pair of an [`entries`](WeakIdentityMap::entries)
/// snapshot. Holds the key itself; the value stays in the map.
pub struct EntryView<K> {
    key: Referent<K>,
}

impl<K> EntryView<K> {
    pub fn key(&self) -> &Referent<K> {
        &self.key
    }

    pub fn into_key(self) -> Referent<K> {
        self.key
    }

    /// Current value for this key in `map`.
    pub fn value<'m, V, S: BuildHasher>(&self, map: &'m mut WeakIdentityMap<K, V, S>) -> Option<&'m V> {
        map.get(&self.key)
    }

    pub fn value_mut<'m, V, S: BuildHasher>(
        &self,
        map: &'m mut WeakIdentityMap<K, V, S>,
    ) -> Option<&'m mut V> {
        map.get_mut(&self.key)
    }

    /// Write `value` through to `map`, returning the value it replaced.
    pub fn set_value<V, S: BuildHasher>(&self, map: &mut WeakIdentityMap<K, V, S>, value: V) -> Option<V> {
        map.put(&self.key, value)
    }
}

impl<K> Clone for EntryView<K> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for EntryView<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryView").field("key", &self.key).finish()
    }
}

/// Iterator over live entries of a [`WeakIdentityMap`].
pub struct Iter<'a, K, V> {
    inner: handle_hash_map::Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Referent<K>, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .by_ref()
            .find_map(|(_, handle, v)| handle.get().map(|key| (key, v)))
    }
}

/// Mutable iterator over live entries of a [`WeakIdentityMap`].
pub struct IterMut<'a, K, V> {
    inner: handle_hash_map::IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (Referent<K>, &'a mut V);
    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .by_ref()
            .find_map(|(_, handle, v)| handle.get().map(|key| (key, v)))
    }
}

impl<K, V, S: BuildHasher> Extend<(Referent<K>, V)> for WeakIdentityMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (Referent<K>, V)>>(&mut self, iter: I) {
        self.put_all(iter);
    }
}

impl<'k, K, V, S: BuildHasher> Extend<(&'k Referent<K>, V)> for WeakIdentityMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (&'k Referent<K>, V)>>(&mut self, iter: I) {
        self.purge();
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<K, V> FromIterator<(Referent<K>, V)> for WeakIdentityMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (Referent<K>, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.put_all(iter);
        map
    }
}

/// Lists live entries without purging.
impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for WeakIdentityMap<K, V, S>
where
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.table
                    .iter()
                    .filter_map(|(_, handle, v)| handle.get().map(|key| (key, v))),
            )
            .finish()
    }
}
