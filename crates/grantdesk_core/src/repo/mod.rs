//! Repository layer between the untyped store and the typed model.
//!
//! # Responsibility
//! - Decode stored collections into model records, hardening the fields
//!   known to arrive in ambiguous encodings (`status`, `reviewedBy`).
//! - Provide the pure draft operations (`select_project`, `add_attachment`,
//!   `submit`) and the whole-list write path.
//!
//! # Invariants
//! - Read paths never fail on bad data: corrupt or absent collections load
//!   as empty, bad fields fall back to safe values.
//! - Write paths always replace the whole collection.
//! - List order is preserved on every read and write.

use crate::model::application::ApplicationValidationError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod application_repo;
pub mod codec;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    /// Draft failed submission checks.
    Validation(ApplicationValidationError),
    /// Store adapter failure on a write path.
    Store(StoreError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<ApplicationValidationError> for RepoError {
    fn from(value: ApplicationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
