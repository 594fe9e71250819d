//! Error type shared by every catalog operation.

use crate::form::FormErrors;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors produced by the catalog and its stores.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    /// The user may not modify or delete the item.
    #[error("permission denied")]
    Forbidden,

    /// Submitted form input failed validation.
    #[error("invalid input: {0}")]
    Invalid(FormErrors),

    /// A unique value (username, material name) is already taken.
    #[error("already exists: {0}")]
    Duplicate(String),

    /// Username or password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The underlying database failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored record could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A snapshot could not be imported.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl CatalogError {
    pub(crate) fn not_found(entity: &'static str, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    /// True for failures of the store itself rather than of the request.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Encoding(_))
    }
}

impl From<postcard::Error> for CatalogError {
    fn from(err: postcard::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<redb::Error> for CatalogError {
    fn from(err: redb::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

macro_rules! storage_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CatalogError {
                fn from(err: $ty) -> Self {
                    Self::Storage(err.to_string())
                }
            }
        )*
    };
}

storage_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
