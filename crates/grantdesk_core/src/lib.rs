//! Core state and persistence for grant applications.
//! This crate is the single source of truth for application invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::application::{
    ApplicationValidationError, Attachment, BadgeTone, GrantApplication, Reviewer, Status,
};
pub use model::project::Project;
pub use repo::application_repo::{
    add_attachment, add_attachments, select_project, submit, ApplicationRepository, Submission,
};
pub use repo::{RepoError, RepoResult};
pub use service::application_service::{ApplicationService, ServiceError};
pub use store::{
    KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError, StoreResult,
    APPLICATIONS_KEY, DEFAULT_STORE_FILE_NAME, PROJECTS_KEY,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
