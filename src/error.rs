//! Error taxonomy for the credential store.
//!
//! One flat enum covering every failure kind the store can produce. No
//! per-operation wrapper types: every public operation returns
//! `Result<T, StoreError>` directly.

use std::fmt;

/// Everything that can go wrong, grouped by the operation that surfaces it.
#[derive(Debug)]
pub enum StoreError {
    /// Any operation attempted before `initialize`.
    NotInitialized,
    /// `initialize` found no file at `location` and `create` was false.
    AutomaticCreationDisabled,
    /// I/O or integrity failure while reading the underlying container.
    CannotInitialize(String),
    /// Encoding or underlying `set_entry` failure during `store`.
    CannotWrite(String),
    /// Decoding or underlying `get_entry` failure during `retrieve`.
    CannotRead(String),
    /// Underlying `delete_entry` failure during `remove`.
    CannotRemove(String),
    /// Any I/O failure while persisting.
    CannotFlush(String),
    /// Credential class or password algorithm is outside the closed set.
    UnsupportedCredential(String),
    /// An underlying entry's kind contradicts the indexed credential type.
    InvalidEntryType { alias: String, expected: &'static str, found: &'static str },
    /// The supplied `ProtectionParameter` is not of an accepted shape.
    InvalidProtectionParameter,
    /// `store`/`remove` attempted on a store that is not modifiable.
    NonModifiable,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "credential store has not been initialized"),
            Self::AutomaticCreationDisabled => write!(
                f,
                "no credential store found at the configured location and `create` is false"
            ),
            Self::CannotInitialize(msg) => write!(f, "cannot initialize credential store: {msg}"),
            Self::CannotWrite(msg) => write!(f, "cannot write credential: {msg}"),
            Self::CannotRead(msg) => write!(f, "cannot read credential: {msg}"),
            Self::CannotRemove(msg) => write!(f, "cannot remove credential: {msg}"),
            Self::CannotFlush(msg) => write!(f, "cannot flush credential store: {msg}"),
            Self::UnsupportedCredential(msg) => write!(f, "unsupported credential: {msg}"),
            Self::InvalidEntryType { alias, expected, found } => write!(
                f,
                "entry '{alias}' is a {found} entry but the index expects a {expected} entry"
            ),
            Self::InvalidProtectionParameter => {
                write!(f, "protection parameter is not an accepted shape")
            }
            Self::NonModifiable => write!(f, "credential store is not modifiable"),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    /// Fill in the alias on an `InvalidEntryType` raised before the caller
    /// (the codec) knew which alias it was decoding under; a no-op for
    /// every other variant.
    pub(crate) fn with_alias(self, alias: &str) -> Self {
        match self {
            Self::InvalidEntryType { expected, found, .. } => {
                Self::InvalidEntryType { alias: alias.to_string(), expected, found }
            }
            other => other,
        }
    }
}

impl From<crate::der::DerError> for StoreError {
    fn from(e: crate::der::DerError) -> Self {
        Self::CannotRead(e.to_string())
    }
}
