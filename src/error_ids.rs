//! ErrorIds: stable correlation identifiers for error objects.
//!
//! An identifier lets one error instance be matched between, say, a log
//! line and the message shown to a user. The same error object always gets
//! the same identifier; any other object, even a value-equal one, gets a
//! different one. Identifiers are forgotten once the error is dropped.

use crate::check;
use crate::error::Result;
use crate::referent::{Referent, WeakReferent};
use crate::weak_identity_map::WeakIdentityMap;
use core::cell::{Cell, RefCell};
use core::hash::BuildHasher;
use sha1::{Digest, Sha1};
use std::collections::hash_map::RandomState;

/// Identifier service backed by one [`WeakIdentityMap`].
///
/// The map sits behind a `RefCell`, which is its synchronization
/// boundary: the service is single-threaded and every call borrows the map
/// exclusively for its whole duration. The service is `!Send`, so each
/// thread needs its own instance, and identifiers are then only unique
/// within the thread that minted them.
pub struct ErrorIds<E, S = RandomState> {
    ids: RefCell<WeakIdentityMap<E, String, S>>,
    next_sequence: Cell<u64>,
}

impl<E> ErrorIds<E> {
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<E> Default for ErrorIds<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, S> ErrorIds<E, S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            ids: RefCell::new(WeakIdentityMap::with_hasher(hasher)),
            next_sequence: Cell::new(0),
        }
    }

    /// Identifier of `error`, minted on first request.
    ///
    /// New identifiers are the lowercase hex SHA-1 of the error's type
    /// name, its identity and a sequence number that only ever grows.
    pub fn unique_id(&self, error: &Referent<E>) -> String {
        let mut ids = self.ids.borrow_mut();
        if let Some(existing) = ids.get(error).cloned() {
            return existing;
        }
        let created = self.mint(error);
        log::debug!(
            "assigned id {} to {} at {:#x}",
            created,
            core::any::type_name::<E>(),
            error.identity()
        );
        ids.put(error, created.clone());
        created
    }

    /// [`unique_id`](Self::unique_id) for an error reached through a weak
    /// reference; a null or reclaimed reference is a usage error.
    pub fn try_unique_id(&self, error: &WeakReferent<E>) -> Result<String> {
        let error = check::argument_not_null("error", error.upgrade())?;
        Ok(self.unique_id(&error))
    }

    /// Attach a known identifier, e.g. one received from an upstream
    /// system, to `error`. Fails if `error` already has an identifier.
    pub fn assign(&self, error: &Referent<E>, id: String) -> Result<()> {
        let mut ids = self.ids.borrow_mut();
        check::property_not_already_set("id", &ids.get(error))?;
        log::debug!("adopted id {} for {}", id, core::any::type_name::<E>());
        ids.put(error, id);
        Ok(())
    }

    /// Number of live errors holding an identifier.
    pub fn len(&self) -> usize {
        self.ids.borrow_mut().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.borrow_mut().is_empty()
    }

    /// Forget every identifier and restart the sequence at zero.
    pub fn reset(&self) {
        self.ids.borrow_mut().clear();
        self.next_sequence.set(0);
    }

    fn mint(&self, error: &Referent<E>) -> String {
        let sequence = self.next_sequence.get();
        self.next_sequence.set(sequence.wrapping_add(1));
        let content = format!(
            "{}_{:08x}_{:08x}",
            core::any::type_name::<E>(),
            error.identity(),
            sequence
        );
        format!("{:x}", Sha1::digest(content.as_bytes()))
    }
}
