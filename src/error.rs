//! Error type shared by the precondition helpers, the map and the
//! error-correlation service.

use thiserror::Error;

/// Misuse reported synchronously at the offending call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A required argument was absent, e.g. a key whose referent is gone.
    #[error("Argument [{name}] cannot be null.")]
    ArgumentNull {
        /// Name of the offending argument.
        name: &'static str,
    },

    /// A property expected to be unset already holds a value.
    #[error("Property [{name}] has already been set.")]
    PropertyAlreadySet {
        /// Name of the offending property.
        name: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
