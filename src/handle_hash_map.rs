//! HandleHashMap: identity-keyed structural layer with generational slots.
//!
//! Entries live in a `SlotMap`; a `HashTable` indexes slot keys by the
//! identity hash cached in each entry's `WeakKeyHandle`. Removal unlinks
//! the entry from both before handing it back, so dropping the returned
//! value (which may reclaim other keys) always sees a consistent table.

use crate::referent::Referent;
use crate::weak_key::WeakKeyHandle;
use core::hash::BuildHasher;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Stable, generational position of one entry. A slot of a removed entry
/// never resolves again, even if its storage is reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Slot(DefaultKey);

impl Slot {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Slot(k)
    }
    pub(crate) fn raw_slot(&self) -> DefaultKey {
        self.0
    }
}

#[derive(Debug)]
struct Entry<K, V> {
    handle: WeakKeyHandle<K>,
    value: V,
}

/// Outcome of [`HandleHashMap::upsert`].
#[derive(Debug)]
pub(crate) enum Upsert<V> {
    /// No entry for that key existed; a new one now lives in the slot.
    Inserted(Slot),
    /// The key was present; its value was swapped and the old one returned.
    Replaced(V),
}

pub(crate) struct HandleHashMap<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>, // storage using generational keys
}

/// Iterator over entries in `HandleHashMap`, including reclaimed ones.
pub(crate) struct Iter<'a, K, V> {
    it: slotmap::basic::Iter<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Slot, &'a WeakKeyHandle<K>, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(k, e)| (Slot::new(k), &e.handle, &e.value))
    }
}

/// Mutable iterator over entries in `HandleHashMap`.
pub(crate) struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (Slot, &'a WeakKeyHandle<K>, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(k, e)| (Slot::new(k), &e.handle, &mut e.value))
    }
}

impl<K, V, S> HandleHashMap<K, V, S>
where
    S: BuildHasher,
{
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::with_capacity(capacity),
            slots: SlotMap::with_capacity_and_key(capacity),
        }
    }

    pub(crate) fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Build a handle for `key` hashed with this table's hasher.
    pub(crate) fn make_handle(&self, key: &Referent<K>) -> WeakKeyHandle<K> {
        WeakKeyHandle::new(key, &self.hasher)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) fn find(&self, probe: &WeakKeyHandle<K>) -> Option<Slot> {
        self.index
            .find(probe.cached_hash(), |&k| {
                self.slots
                    .get(k)
                    .map(|e| e.handle == *probe)
                    .unwrap_or(false)
            })
            .map(|&k| Slot::new(k))
    }

    /// Insert under `handle`, or replace the value of the equal handle
    /// already present. The existing handle is kept on replacement.
    pub(crate) fn upsert(&mut self, handle: WeakKeyHandle<K>, value: V) -> Upsert<V> {
        let hash = handle.cached_hash();
        match self.index.entry(
            hash,
            |&kk| {
                self.slots
                    .get(kk)
                    .map(|e| e.handle == handle)
                    .unwrap_or(false)
            },
            |&kk| self.slots.get(kk).map(|e| e.handle.cached_hash()).unwrap_or(0),
        ) {
            hashbrown::hash_table::Entry::Occupied(o) => {
                let k = *o.get();
                if let Some(e) = self.slots.get_mut(k) {
                    return Upsert::Replaced(core::mem::replace(&mut e.value, value));
                }
                // Index and slots disagree; drop the dangling index entry.
                debug_assert!(false, "index points at an empty slot");
                o.remove();
            }
            hashbrown::hash_table::Entry::Vacant(v) => {
                let k = self.slots.insert(Entry { handle, value });
                let _ = v.insert(k);
                return Upsert::Inserted(Slot::new(k));
            }
        }
        self.link(handle, value)
    }

    fn link(&mut self, handle: WeakKeyHandle<K>, value: V) -> Upsert<V> {
        let hash = handle.cached_hash();
        let k = self.slots.insert(Entry { handle, value });
        let slots = &self.slots;
        self.index.insert_unique(hash, k, |&kk| {
            slots.get(kk).map(|e| e.handle.cached_hash()).unwrap_or(0)
        });
        Upsert::Inserted(Slot::new(k))
    }

    pub(crate) fn remove(&mut self, slot: Slot) -> Option<(WeakKeyHandle<K>, V)> {
        let k = slot.raw_slot();

        // Remove slot
        let entry = self.slots.remove(k)?;

        // Unlink from index via occupied entry removal
        match self.index.find_entry(entry.handle.cached_hash(), |&kk| kk == k) {
            Ok(o) => {
                o.remove();
            }
            Err(_) => debug_assert!(false, "slot missing from index"),
        }

        Some((entry.handle, entry.value))
    }

    /// Remove the entry at `slot` only if its key has been reclaimed.
    /// Slots of entries that were already removed resolve to nothing.
    pub(crate) fn remove_reclaimed(&mut self, slot: Slot) -> Option<V> {
        let reclaimed = self
            .slots
            .get(slot.raw_slot())
            .map(|e| !e.handle.is_live())
            .unwrap_or(false);
        if !reclaimed {
            return None;
        }
        self.remove(slot).map(|(_handle, value)| value)
    }

    pub(crate) fn value(&self, slot: Slot) -> Option<&V> {
        self.slots.get(slot.raw_slot()).map(|e| &e.value)
    }

    pub(crate) fn value_mut(&mut self, slot: Slot) -> Option<&mut V> {
        self.slots.get_mut(slot.raw_slot()).map(|e| &mut e.value)
    }

    /// Unlink every entry for which `keep` returns false and hand the
    /// removed entries back to the caller.
    pub(crate) fn extract_if<F>(&mut self, mut keep: F) -> Vec<(Slot, WeakKeyHandle<K>, V)>
    where
        F: FnMut(&WeakKeyHandle<K>, &mut V) -> bool,
    {
        let doomed: Vec<Slot> = self
            .iter_mut()
            .filter_map(|(slot, h, v)| if keep(h, v) { None } else { Some(slot) })
            .collect();
        doomed
            .into_iter()
            .filter_map(|slot| self.remove(slot).map(|(h, v)| (slot, h, v)))
            .collect()
    }

    /// Unlink everything and hand the entries back to the caller.
    pub(crate) fn drain_all(&mut self) -> Vec<(Slot, WeakKeyHandle<K>, V)> {
        self.index.clear();
        self.slots
            .drain()
            .map(|(k, e)| (Slot::new(k), e.handle, e.value))
            .collect()
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.slots.iter(),
        }
    }

    pub(crate) fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.slots.iter_mut(),
        }
    }
}
