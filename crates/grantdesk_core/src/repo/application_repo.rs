//! Application repository over a [`KeyValueStore`].
//!
//! # Responsibility
//! - Load the project and application collections as typed records.
//! - Write the application collection back as one blob.
//! - Apply draft edits (project selection, attachments) and build
//!   submissions.
//!
//! # Invariants
//! - Absent, corrupt or non-array collections load as empty lists.
//! - `submit` forces `Status::Submitted` and appends at the end.
//! - `select_project` copies project fields as a snapshot; an unknown id
//!   leaves the draft untouched.

use crate::model::application::{Attachment, GrantApplication, Status};
use crate::model::project::{find_project, Project};
use crate::repo::codec::{decode_application, decode_project, encode_applications};
use crate::repo::RepoResult;
use crate::store::{KeyValueStore, APPLICATIONS_KEY, PROJECTS_KEY};
use log::{debug, info, warn};
use serde_json::Value;

/// Result of appending a draft to the application list.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Full list with the new application last.
    pub applications: Vec<GrantApplication>,
    /// Encoded form of `applications`, ready for the store.
    pub blob: Value,
    /// Position of the new application in `applications`.
    pub index: usize,
}

/// Typed access to the stored project and application collections.
pub struct ApplicationRepository<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ApplicationRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads the project reference list.
    pub fn load_projects(&self) -> Vec<Project> {
        self.load_collection(PROJECTS_KEY)
            .iter()
            .map(decode_project)
            .collect()
    }

    /// Loads and hardens the stored application list.
    pub fn load_applications(&self) -> Vec<GrantApplication> {
        let applications: Vec<GrantApplication> = self
            .load_collection(APPLICATIONS_KEY)
            .iter()
            .enumerate()
            .map(|(index, raw)| decode_application(raw, index))
            .collect();
        debug!(
            "event=applications_load module=repo status=ok count={}",
            applications.len()
        );
        applications
    }

    /// Loads the application list together with the revision it was read at.
    ///
    /// A revision that cannot be read is reported as `0`, which makes a
    /// later version-checked write fail rather than overwrite blindly.
    pub fn load_applications_with_revision(&self) -> (Vec<GrantApplication>, u64) {
        let revision = self.applications_revision().unwrap_or(0);
        (self.load_applications(), revision)
    }

    /// Current write revision of the application collection.
    pub fn applications_revision(&self) -> RepoResult<u64> {
        Ok(self.store.revision(APPLICATIONS_KEY)?)
    }

    /// Replaces the stored application list. Last writer wins.
    pub fn save_applications(&self, applications: &[GrantApplication]) -> RepoResult<()> {
        self.store
            .save(APPLICATIONS_KEY, &encode_applications(applications))?;
        info!(
            "event=applications_save module=repo status=ok count={}",
            applications.len()
        );
        Ok(())
    }

    /// Replaces the stored list only if nobody wrote since `expected_revision`.
    ///
    /// Returns the new revision.
    pub fn save_applications_if_unchanged(
        &self,
        applications: &[GrantApplication],
        expected_revision: u64,
    ) -> RepoResult<u64> {
        self.write_blob_if_unchanged(
            &encode_applications(applications),
            applications.len(),
            expected_revision,
        )
    }

    /// Persists a [`Submission`] built by [`submit`].
    pub fn persist_submission(
        &self,
        submission: &Submission,
        expected_revision: u64,
    ) -> RepoResult<u64> {
        self.write_blob_if_unchanged(
            &submission.blob,
            submission.applications.len(),
            expected_revision,
        )
    }

    fn write_blob_if_unchanged(
        &self,
        blob: &Value,
        count: usize,
        expected_revision: u64,
    ) -> RepoResult<u64> {
        let revision = self
            .store
            .save_if_revision(APPLICATIONS_KEY, blob, expected_revision)?;
        info!(
            "event=applications_save module=repo status=ok count={count} revision={revision}"
        );
        Ok(revision)
    }

    fn load_collection(&self, key: &str) -> Vec<Value> {
        match self.store.load(key) {
            Ok(Some(Value::Array(items))) => items,
            Ok(Some(_)) => {
                warn!("event=collection_load module=repo status=corrected key={key} reason=not_an_array");
                Vec::new()
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("event=collection_load module=repo status=corrected key={key} reason=load_failed error={err}");
                Vec::new()
            }
        }
    }
}

/// Points `draft` at the project with `project_id`.
///
/// Overwrites exactly `project_id`, `project_title` and
/// `project_description`. An unknown id returns the draft unchanged.
pub fn select_project(
    mut draft: GrantApplication,
    project_id: &str,
    projects: &[Project],
) -> GrantApplication {
    match find_project(projects, project_id) {
        Some(project) => {
            draft.project_id = project.id.clone();
            draft.project_title = project.title.clone();
            draft.project_description = project.description.clone();
        }
        None => debug!("event=project_select module=repo status=ignored reason=unknown_id"),
    }
    draft
}

/// Appends one attachment. Duplicates are kept.
pub fn add_attachment(mut draft: GrantApplication, attachment: Attachment) -> GrantApplication {
    draft.attachments.push(attachment);
    draft
}

/// Appends a batch of attachments in the given order.
pub fn add_attachments(
    mut draft: GrantApplication,
    attachments: impl IntoIterator<Item = Attachment>,
) -> GrantApplication {
    draft.attachments.extend(attachments);
    draft
}

/// Appends `draft` to `existing` as a new `Submitted` application.
///
/// Whatever status the draft carried is discarded. The returned blob
/// encodes the full list and is what the store should receive.
pub fn submit(existing: &[GrantApplication], mut draft: GrantApplication) -> RepoResult<Submission> {
    draft.validate_for_submit()?;
    draft.status = Status::Submitted;

    let mut applications = Vec::with_capacity(existing.len() + 1);
    applications.extend_from_slice(existing);
    applications.push(draft);

    let blob = encode_applications(&applications);
    Ok(Submission {
        index: applications.len() - 1,
        applications,
        blob,
    })
}

#[cfg(test)]
mod tests {
    use super::{add_attachments, select_project, submit, ApplicationRepository};
    use crate::model::application::{Attachment, GrantApplication, Status};
    use crate::model::project::Project;
    use crate::repo::RepoError;
    use crate::store::{KeyValueStore, MemoryKeyValueStore, APPLICATIONS_KEY, PROJECTS_KEY};
    use serde_json::json;

    #[test]
    fn non_array_collections_load_empty() {
        let store = MemoryKeyValueStore::new();
        store.save(PROJECTS_KEY, &json!({"id": 1})).unwrap();
        store.save(APPLICATIONS_KEY, &json!("nope")).unwrap();
        let repo = ApplicationRepository::new(&store);

        assert!(repo.load_projects().is_empty());
        assert!(repo.load_applications().is_empty());
    }

    #[test]
    fn select_project_on_empty_list_is_noop() {
        let draft = GrantApplication::draft();
        assert_eq!(select_project(draft.clone(), "1", &[]), draft);
    }

    #[test]
    fn select_project_overwrites_previous_snapshot() {
        let projects = vec![
            Project::new("1", "Soil", "Carbon"),
            Project::new("2", "Reef", "Coral"),
        ];
        let draft = select_project(GrantApplication::draft(), "1", &projects);
        let draft = select_project(draft, "2", &projects);

        assert_eq!(draft.project_id, "2");
        assert_eq!(draft.project_title, "Reef");
        assert_eq!(draft.project_description, "Coral");
    }

    #[test]
    fn add_attachments_keeps_order_and_duplicates() {
        let draft = add_attachments(
            GrantApplication::draft(),
            vec![
                Attachment::new("a.pdf", "application/pdf"),
                Attachment::new("a.pdf", "application/pdf"),
                Attachment::new("b.png", "image/png"),
            ],
        );
        let names: Vec<&str> = draft.attachments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "a.pdf", "b.png"]);
    }

    #[test]
    fn submit_rejects_draft_without_project() {
        let err = submit(&[], GrantApplication::draft()).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[test]
    fn submit_blob_matches_encoded_list() {
        let draft = GrantApplication {
            project_id: "1".to_string(),
            status: Status::Accepted,
            ..GrantApplication::draft()
        };
        let submission = submit(&[], draft).unwrap();

        assert_eq!(submission.index, 0);
        assert_eq!(submission.blob[0]["status"], json!("submitted"));
        assert_eq!(submission.blob.as_array().unwrap().len(), 1);
    }
}
