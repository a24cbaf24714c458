//! Application-owned key objects.
//!
//! `Referent<K>` is a shared owner of one key object, much like `Rc<K>`:
//! clones are further owners of the *same* object. Maps only ever hold a
//! `WeakReferent<K>` to it. When the last `Referent` drops, every map that
//! watches the object is told through its reclamation queue.
//!
//! Identity is the address of the shared allocation. A map's weak handle
//! keeps the allocation (not the value) alive, so an address can never be
//! handed to a new object while some map still tracks the old one.

use crate::handle_hash_map::Slot;
use crate::reclaim::{ReclaimQueue, Watcher};
use core::cell::RefCell;
use core::fmt;
use core::ops::Deref;
use std::rc::{Rc, Weak};

pub(crate) struct KeyCell<K> {
    value: K,
    watchers: RefCell<Vec<Watcher>>,
}

impl<K> Drop for KeyCell<K> {
    fn drop(&mut self) {
        for watcher in self.watchers.get_mut().drain(..) {
            watcher.notify();
        }
    }
}

/// Strong, shared owner of a key object.
pub struct Referent<K> {
    cell: Rc<KeyCell<K>>,
}

impl<K> Referent<K> {
    pub fn new(value: K) -> Self {
        Self {
            cell: Rc::new(KeyCell {
                value,
                watchers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create a non-owning reference to this object.
    pub fn downgrade(&self) -> WeakReferent<K> {
        WeakReferent {
            cell: Rc::downgrade(&self.cell),
        }
    }

    /// True if both owners refer to the same object.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.cell, &other.cell)
    }

    /// Identity token of the object; stable for the object's lifetime and
    /// unrelated to its contents.
    #[inline]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.cell) as *const () as usize
    }

    /// Number of `Referent` owners of this object.
    pub fn owners(this: &Self) -> usize {
        Rc::strong_count(&this.cell)
    }

    /// Register a map entry to be reported when this object is reclaimed.
    /// Watchers of dropped maps are pruned on the way.
    pub(crate) fn watch(&self, watcher: Watcher) {
        let mut watchers = self.cell.watchers.borrow_mut();
        watchers.retain(|w| !w.is_orphaned());
        watchers.push(watcher);
    }

    /// Detach the watcher `queue` registered for `slot`.
    pub(crate) fn unwatch(&self, queue: &ReclaimQueue, slot: Slot) {
        self.cell
            .watchers
            .borrow_mut()
            .retain(|w| !(queue.owns(w) && w.slot() == slot));
    }

    #[cfg(test)]
    pub(crate) fn watcher_count(&self) -> usize {
        self.cell.watchers.borrow().len()
    }

    /// Simulate a notification that never arrives.
    #[cfg(test)]
    pub(crate) fn forget_watchers(&self) {
        self.cell.watchers.borrow_mut().clear();
    }
}

impl<K> Clone for Referent<K> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<K> Deref for Referent<K> {
    type Target = K;
    #[inline]
    fn deref(&self) -> &K {
        &self.cell.value
    }
}

impl<K> AsRef<K> for Referent<K> {
    fn as_ref(&self) -> &K {
        &self.cell.value
    }
}

impl<K> From<K> for Referent<K> {
    fn from(value: K) -> Self {
        Self::new(value)
    }
}

/// Value equality, like the key type's own `==`. Use [`Referent::ptr_eq`]
/// for identity.
impl<K: PartialEq> PartialEq for Referent<K> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<K: Eq> Eq for Referent<K> {}

impl<K: fmt::Debug> fmt::Debug for Referent<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<K: fmt::Display> fmt::Display for Referent<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

/// Non-owning reference to a key object. `WeakReferent::new()` never had
/// a referent and stands in for a null reference.
pub struct WeakReferent<K> {
    cell: Weak<KeyCell<K>>,
}

impl<K> WeakReferent<K> {
    pub fn new() -> Self {
        Self { cell: Weak::new() }
    }

    /// Recover an owner, or `None` once the object has been reclaimed.
    pub fn upgrade(&self) -> Option<Referent<K>> {
        self.cell.upgrade().map(|cell| Referent { cell })
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.cell.strong_count() > 0
    }

    #[inline]
    pub(crate) fn identity(&self) -> usize {
        self.cell.as_ptr() as *const () as usize
    }
}

impl<K> Default for WeakReferent<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for WeakReferent<K> {
    fn clone(&self) -> Self {
        Self {
            cell: Weak::clone(&self.cell),
        }
    }
}

impl<K> fmt::Debug for WeakReferent<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(WeakReferent)")
    }
}
