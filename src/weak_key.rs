//! Weak, identity-comparing key handle used inside the map.

use crate::check;
use crate::error::Result;
use crate::referent::{Referent, WeakReferent};
use core::hash::{BuildHasher, Hash, Hasher};

/// Weak reference to a key plus the identity hash computed when the
/// handle was built. The hash never changes, even after the referent is
/// reclaimed.
pub(crate) struct WeakKeyHandle<K> {
    referent: WeakReferent<K>,
    hash: u64,
}

impl<K> WeakKeyHandle<K> {
    pub(crate) fn new<S: BuildHasher>(key: &Referent<K>, hasher: &S) -> Self {
        Self {
            referent: key.downgrade(),
            hash: hasher.hash_one(key.identity()),
        }
    }

    /// Build a handle from a possibly-null reference, also returning an
    /// owner that keeps the key alive for the rest of the caller's work.
    pub(crate) fn from_weak<S: BuildHasher>(
        key: &WeakReferent<K>,
        hasher: &S,
    ) -> Result<(Self, Referent<K>)> {
        let key = check::argument_not_null("key", key.upgrade())?;
        Ok((Self::new(&key, hasher), key))
    }

    #[inline]
    pub(crate) fn cached_hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub(crate) fn is_live(&self) -> bool {
        self.referent.is_live()
    }

    /// Current referent, if it has not been reclaimed.
    #[inline]
    pub(crate) fn get(&self) -> Option<Referent<K>> {
        self.referent.upgrade()
    }
}

impl<K> PartialEq for WeakKeyHandle<K> {
    fn eq(&self, other: &Self) -> bool {
        if core::ptr::eq(self, other) {
            return true;
        }
        self.hash == other.hash
            && self.referent.is_live()
            && other.referent.is_live()
            && self.referent.identity() == other.referent.identity()
    }
}

impl<K> Eq for WeakKeyHandle<K> {}

impl<K> Hash for WeakKeyHandle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl<K> core::fmt::Debug for WeakKeyHandle<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WeakKeyHandle")
            .field("hash", &self.hash)
            .field("live", &self.is_live())
            .finish()
    }
}
