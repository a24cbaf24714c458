//! Precondition helpers.
//!
//! Both helpers are pure: they inspect a value and either hand it back or
//! report which named argument/property broke the contract.

use crate::error::{Error, Result};

/// Unwrap a required argument, or fail with [`Error::ArgumentNull`].
#[inline]
pub fn argument_not_null<T>(name: &'static str, value: Option<T>) -> Result<T> {
    value.ok_or(Error::ArgumentNull { name })
}

/// Fail with [`Error::PropertyAlreadySet`] if `value` is already populated.
#[inline]
pub fn property_not_already_set<T>(name: &'static str, value: &Option<T>) -> Result<()> {
    match value {
        None => Ok(()),
        Some(_) => Err(Error::PropertyAlreadySet { name }),
    }
}
