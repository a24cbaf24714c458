//! Reclamation notifications.
//!
//! A `ReclaimQueue` belongs to exactly one map. Referents carry `Watcher`s
//! that point at the queue weakly; when the last owner of a referent drops,
//! every watcher pushes its slot into its queue. The owning map drains the
//! queue at the start of its next operation.

use crate::handle_hash_map::Slot;
use core::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

type Pending = RefCell<VecDeque<Slot>>;

pub(crate) struct ReclaimQueue {
    pending: Rc<Pending>,
}

impl ReclaimQueue {
    pub(crate) fn new() -> Self {
        Self {
            pending: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    /// Mint a watcher that reports `slot` to this queue.
    pub(crate) fn watcher(&self, slot: Slot) -> Watcher {
        Watcher {
            queue: Rc::downgrade(&self.pending),
            slot,
        }
    }

    /// Pop the oldest reported slot. The borrow ends before returning so
    /// callers may drop values (and trigger further reports) freely.
    #[inline]
    pub(crate) fn poll(&self) -> Option<Slot> {
        self.pending.borrow_mut().pop_front()
    }

    pub(crate) fn clear(&self) {
        self.pending.borrow_mut().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// True if `watcher` reports to this queue.
    #[inline]
    pub(crate) fn owns(&self, watcher: &Watcher) -> bool {
        core::ptr::eq(watcher.queue.as_ptr(), Rc::as_ptr(&self.pending))
    }
}

/// Registration of one map entry on a referent.
pub(crate) struct Watcher {
    queue: Weak<Pending>,
    slot: Slot,
}

impl Watcher {
    #[inline]
    pub(crate) fn slot(&self) -> Slot {
        self.slot
    }

    /// The owning map is gone; nothing will ever drain this watcher.
    #[inline]
    pub(crate) fn is_orphaned(&self) -> bool {
        self.queue.strong_count() == 0
    }

    /// Report the slot to its queue, if the queue still exists.
    pub(crate) fn notify(self) {
        let Some(queue) = self.queue.upgrade() else {
            return;
        };
        let pending = queue.try_borrow_mut();
        match pending {
            Ok(mut pending) => pending.push_back(self.slot),
            Err(_) => {
                // The map's live checks still hide the entry; it lingers
                // in storage until removed explicitly or cleared.
                log::warn!("reclamation queue busy; dropped notification for {:?}", self.slot);
                debug_assert!(false, "reclamation queue borrowed during notification");
            }
        }
    }
}

impl core::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Watcher")
            .field("slot", &self.slot)
            .field("orphaned", &self.is_orphaned())
            .finish()
    }
}
