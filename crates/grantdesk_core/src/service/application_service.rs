//! Grant application session service.
//!
//! # Responsibility
//! - Load projects and applications once per session and keep them in memory.
//! - Own the draft being edited and route edits through the repository's
//!   draft operations.
//! - Submit-then-persist with rollback on any failure.
//!
//! # Invariants
//! - In-memory applications change only after the store accepted the write.
//! - A failed submission leaves both the list and the draft untouched.
//! - Writes are version-checked against the revision last read or written.

use crate::model::application::{ApplicationValidationError, Attachment, GrantApplication};
use crate::model::project::Project;
use crate::repo::application_repo::{
    add_attachment, add_attachments, select_project, submit, ApplicationRepository,
};
use crate::repo::RepoError;
use crate::store::{KeyValueStore, StoreError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for grant application use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// The draft is not ready to submit.
    Validation(ApplicationValidationError),
    /// Another writer changed the stored list since it was loaded.
    StaleData { expected: u64, actual: u64 },
    /// Any other persistence failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::StaleData { expected, actual } => write!(
                f,
                "applications changed elsewhere (loaded revision {expected}, stored revision {actual}); reload and retry"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StaleData { .. } => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::Store(StoreError::StaleRevision {
                expected, actual, ..
            }) => Self::StaleData { expected, actual },
            other => Self::Repo(other),
        }
    }
}

/// One grant-application editing session.
pub struct ApplicationService<S: KeyValueStore> {
    repo: ApplicationRepository<S>,
    projects: Vec<Project>,
    applications: Vec<GrantApplication>,
    revision: u64,
    draft: GrantApplication,
}

impl<S: KeyValueStore> ApplicationService<S> {
    /// Loads both collections and starts with an empty draft.
    pub fn open(repo: ApplicationRepository<S>) -> Self {
        let projects = repo.load_projects();
        let (applications, revision) = repo.load_applications_with_revision();
        info!(
            "event=session_open module=service status=ok projects={} applications={} revision={revision}",
            projects.len(),
            applications.len()
        );
        Self {
            repo,
            projects,
            applications,
            revision,
            draft: GrantApplication::draft(),
        }
    }

    /// Re-reads both collections. The draft is kept.
    pub fn reload(&mut self) {
        self.projects = self.repo.load_projects();
        let (applications, revision) = self.repo.load_applications_with_revision();
        self.applications = applications;
        self.revision = revision;
    }

    pub fn repository(&self) -> &ApplicationRepository<S> {
        &self.repo
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn applications(&self) -> &[GrantApplication] {
        &self.applications
    }

    /// Application at list position `index`.
    pub fn application(&self, index: usize) -> Option<&GrantApplication> {
        self.applications.get(index)
    }

    pub fn draft(&self) -> &GrantApplication {
        &self.draft
    }

    /// Snapshots the project with `project_id` into the draft.
    ///
    /// Unknown ids are ignored.
    pub fn select_project(&mut self, project_id: &str) {
        let draft = std::mem::take(&mut self.draft);
        self.draft = select_project(draft, project_id, &self.projects);
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        let draft = std::mem::take(&mut self.draft);
        self.draft = add_attachment(draft, attachment);
    }

    pub fn add_attachments(&mut self, attachments: impl IntoIterator<Item = Attachment>) {
        let draft = std::mem::take(&mut self.draft);
        self.draft = add_attachments(draft, attachments);
    }

    /// Applies a plain field edit to the draft.
    pub fn update_draft(&mut self, edit: impl FnOnce(&mut GrantApplication)) {
        edit(&mut self.draft);
    }

    pub fn reset_draft(&mut self) {
        self.draft = GrantApplication::draft();
    }

    /// Submits the current draft and persists the full list.
    ///
    /// On success the in-memory list is replaced, the draft is reset and
    /// the new application's list position is returned. On failure nothing
    /// in the session changes.
    pub fn submit_draft(&mut self) -> Result<usize, ServiceError> {
        let submission = submit(&self.applications, self.draft.clone())?;

        match self.repo.persist_submission(&submission, self.revision) {
            Ok(revision) => {
                info!(
                    "event=application_submit module=service status=ok index={} revision={revision}",
                    submission.index
                );
                self.revision = revision;
                self.applications = submission.applications;
                self.draft = GrantApplication::draft();
                Ok(submission.index)
            }
            Err(err) => {
                let err = ServiceError::from(err);
                match &err {
                    ServiceError::StaleData { .. } => warn!(
                        "event=application_submit module=service status=stale error={err}"
                    ),
                    _ => error!(
                        "event=application_submit module=service status=error error={err}"
                    ),
                }
                Err(err)
            }
        }
    }
}
