//! weak-identity-map: a single-threaded map whose keys are held weakly and
//! compared by identity, with entries purged once their keys are dropped.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: attach data to objects (for example a correlation id to an
//!   error) without keeping them alive and without two distinct but equal
//!   objects sharing an entry.
//! - Layers:
//!   - Referent<K>: application-owned, `Rc`-like owner of a key object.
//!     Its identity is the address of its allocation. When the last owner
//!     drops, it reports every watching map entry to that map's queue.
//!   - HandleHashMap<K, V, S>: structural table keyed by `WeakKeyHandle`s
//!     (weak reference + cached identity hash) with generational slots.
//!   - WeakIdentityMap<K, V, S>: public API. Drains its reclamation queue
//!     at the start of every operation, then runs against the table.
//!   - ErrorIds<E, S>: correlation-id service built on one map.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (no atomics, `Rc`/`RefCell` only).
//!   Share through a `RefCell` or keep the map on one thread.
//! - The map never owns a key; it holds only a `Weak` to the allocation.
//!   That keeps the address reserved, so a cached identity hash can never
//!   alias a newer object.
//! - The map does not decide when keys die; it reacts at its next call.
//!
//! Consistency
//! - Purge: every public operation first drains the queue and removes the
//!   reported entries whose key is no longer live. Purging an empty queue
//!   is a no-op.
//! - Live checks: `is_empty`, `contains_value`, snapshots and iteration
//!   also test each key directly, so an entry whose report has not been
//!   drained is never returned.
//! - Cascades: dropping a purged value may drop the last owner of another
//!   key of the same map. That report lands in the queue while the purge
//!   loop runs, and the same loop removes it.
//! - Late reports: a report for an entry that was removed meanwhile names
//!   a dead generational slot and is ignored.
//!
//! Notes and non-goals
//! - Not a cache: entries leave only by removal, clearing, or reclamation.
//! - Accessors take `&mut self` because any of them may purge.
//! - Snapshots (`keys`, `values`, `entries`) are point-in-time copies.
//!   Holding one keeps the returned keys alive.

mod check;
mod error;
mod error_ids;
mod handle_hash_map;
mod handle_hash_map_proptest;
mod reclaim;
mod referent;
mod weak_identity_map;
mod weak_key;

// Public surface
pub use check::{argument_not_null, property_not_already_set};
pub use error::{Error, Result};
pub use error_ids::ErrorIds;
pub use referent::{Referent, WeakReferent};
pub use weak_identity_map::{EntryView, Iter, IterMut, WeakIdentityMap};
