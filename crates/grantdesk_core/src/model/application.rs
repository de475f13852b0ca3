//! Grant application domain model.
//!
//! # Responsibility
//! - Define `GrantApplication` and its value types.
//! - Encode the status lifecycle as a closed enum with explicit edges.
//! - Check the preconditions a draft must meet before it is submitted.
//!
//! # Invariants
//! - `Status` has exactly four members; there is no "unknown" state.
//! - A new application is born `Submitted`; only reviewers move it further.
//! - `Accepted` and `Rejected` are terminal.
//! - `attachments` keeps insertion order and allows duplicates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lifecycle state of a grant application.
///
/// ```text
/// submitted ──> under_review ──> accepted | rejected
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Birth state of every new application.
    #[default]
    Submitted,
    /// A reviewer has picked the application up.
    UnderReview,
    /// Terminal: declined.
    Rejected,
    /// Terminal: funded.
    Accepted,
}

/// Display tone for a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Default,
    Secondary,
    Destructive,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Submitted,
        Status::UnderReview,
        Status::Rejected,
        Status::Accepted,
    ];

    /// Canonical persisted value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Rejected => "rejected",
            Self::Accepted => "accepted",
        }
    }

    /// Parses a persisted value.
    ///
    /// Accepts the canonical values plus the legacy `"under review"`
    /// spelling written by older dashboard builds. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(Self::Submitted),
            "under_review" | "under review" => Some(Self::UnderReview),
            "rejected" => Some(Self::Rejected),
            "accepted" => Some(Self::Accepted),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UnderReview => "under review",
            Self::Rejected => "rejected",
            Self::Accepted => "accepted",
        }
    }

    pub fn badge(self) -> BadgeTone {
        match self {
            Self::Accepted => BadgeTone::Secondary,
            Self::Rejected => BadgeTone::Destructive,
            Self::Submitted | Self::UnderReview => BadgeTone::Default,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// Whether a reviewer may move an application from `self` to `next`.
    ///
    /// Re-entering `Submitted` is never a transition: that state is only
    /// assigned when a new application is created.
    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::UnderReview)
                | (Self::UnderReview, Self::Accepted)
                | (Self::UnderReview, Self::Rejected)
        )
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer reference shown on reviewed applications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    pub first_name: String,
    pub last_name: String,
}

impl Reviewer {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// First character of each name; empty names contribute nothing.
    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .take(1)
            .chain(self.last_name.chars().take(1))
            .collect()
    }
}

/// File metadata attached to an application. Content is never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    /// MIME label as reported by the file picker (may be empty).
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// A grant application, either a draft being edited or a stored record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrantApplication {
    /// Referenced project; empty only while drafting.
    pub project_id: String,
    /// Snapshot of the project title at selection time.
    pub project_title: String,
    /// Snapshot of the project description at selection time.
    pub project_description: String,
    pub request_amount: f64,
    /// Comma-separated keywords, stored verbatim.
    pub keywords: String,
    pub status: Status,
    pub reviewed_by: Option<Reviewer>,
    pub attachments: Vec<Attachment>,
    /// Stored keys this model does not name, written back untouched.
    pub extra_fields: Map<String, Value>,
}

impl GrantApplication {
    /// Empty draft as shown by a freshly opened application form.
    pub fn draft() -> Self {
        Self::default()
    }

    /// Keyword tokens split on `,` and trimmed.
    ///
    /// Empty and duplicate tokens are kept.
    pub fn keyword_tokens(&self) -> Vec<&str> {
        self.keywords.split(',').map(str::trim).collect()
    }

    /// Checks the fields a draft needs before it can be submitted.
    pub fn validate_for_submit(&self) -> Result<(), ApplicationValidationError> {
        if self.project_id.trim().is_empty() {
            return Err(ApplicationValidationError::EmptyProjectId);
        }
        if !self.request_amount.is_finite() || self.request_amount < 0.0 {
            return Err(ApplicationValidationError::InvalidRequestAmount(
                self.request_amount,
            ));
        }
        Ok(())
    }
}

/// Reasons a draft cannot be submitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApplicationValidationError {
    /// No project was selected.
    EmptyProjectId,
    /// Amount is negative, NaN or infinite.
    InvalidRequestAmount(f64),
}

impl Display for ApplicationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyProjectId => write!(f, "project_id must not be empty"),
            Self::InvalidRequestAmount(amount) => {
                write!(f, "request_amount must be a non-negative number, got {amount}")
            }
        }
    }
}

impl Error for ApplicationValidationError {}

#[cfg(test)]
mod tests {
    use super::{
        ApplicationValidationError, Attachment, BadgeTone, GrantApplication, Reviewer, Status,
    };

    #[test]
    fn status_parse_accepts_canonical_and_legacy_values() {
        for status in Status::ALL {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse("under review"), Some(Status::UnderReview));
        assert_eq!(Status::parse("APPROVED"), None);
        assert_eq!(Status::parse("Submitted"), None);
        assert_eq!(Status::parse(""), None);
    }

    #[test]
    fn lifecycle_edges_follow_review_flow() {
        use Status::*;

        assert!(Submitted.can_transition_to(UnderReview));
        assert!(UnderReview.can_transition_to(Accepted));
        assert!(UnderReview.can_transition_to(Rejected));

        assert!(!Submitted.can_transition_to(Accepted));
        assert!(!Submitted.can_transition_to(Rejected));
        assert!(!UnderReview.can_transition_to(Submitted));
        for next in Status::ALL {
            assert!(!Accepted.can_transition_to(next));
            assert!(!Rejected.can_transition_to(next));
            assert!(!next.can_transition_to(Submitted));
        }

        assert!(Accepted.is_terminal());
        assert!(Rejected.is_terminal());
        assert!(!Submitted.is_terminal());
        assert!(!UnderReview.is_terminal());
    }

    #[test]
    fn status_display_helpers() {
        assert_eq!(Status::UnderReview.label(), "under review");
        assert_eq!(Status::UnderReview.to_string(), "under_review");
        assert_eq!(Status::Accepted.badge(), BadgeTone::Secondary);
        assert_eq!(Status::Rejected.badge(), BadgeTone::Destructive);
        assert_eq!(Status::Submitted.badge(), BadgeTone::Default);
        assert_eq!(Status::UnderReview.badge(), BadgeTone::Default);
    }

    #[test]
    fn reviewer_display_and_initials() {
        let reviewer = Reviewer::new("Ada", "Lovelace");
        assert_eq!(reviewer.display_name(), "Ada Lovelace");
        assert_eq!(reviewer.initials(), "AL");
        assert_eq!(Reviewer::new("", "Lee").initials(), "L");
    }

    #[test]
    fn value_types_use_wire_field_names() {
        let reviewer = serde_json::to_value(Reviewer::new("Jo", "Lee")).unwrap();
        assert_eq!(reviewer, serde_json::json!({"firstName": "Jo", "lastName": "Lee"}));

        let attachment = serde_json::to_value(Attachment::new("a.pdf", "application/pdf")).unwrap();
        assert_eq!(
            attachment,
            serde_json::json!({"name": "a.pdf", "type": "application/pdf"})
        );
    }

    #[test]
    fn draft_starts_empty_and_submitted() {
        let draft = GrantApplication::draft();
        assert_eq!(draft.project_id, "");
        assert_eq!(draft.request_amount, 0.0);
        assert_eq!(draft.status, Status::Submitted);
        assert!(draft.reviewed_by.is_none());
        assert!(draft.attachments.is_empty());
        assert!(draft.extra_fields.is_empty());
    }

    #[test]
    fn keyword_tokens_trim_but_keep_empty_and_duplicates() {
        let app = GrantApplication {
            keywords: " soil, carbon ,,soil".to_string(),
            ..GrantApplication::draft()
        };
        assert_eq!(app.keyword_tokens(), vec!["soil", "carbon", "", "soil"]);
    }

    #[test]
    fn validate_for_submit_checks_project_and_amount() {
        let mut app = GrantApplication::draft();
        assert_eq!(
            app.validate_for_submit(),
            Err(ApplicationValidationError::EmptyProjectId)
        );

        app.project_id = "7".to_string();
        assert_eq!(app.validate_for_submit(), Ok(()));

        app.request_amount = -1.0;
        assert!(matches!(
            app.validate_for_submit(),
            Err(ApplicationValidationError::InvalidRequestAmount(_))
        ));

        app.request_amount = f64::NAN;
        assert!(app.validate_for_submit().is_err());
    }
}
