//! Transcoding between stored JSON records and model types.
//!
//! # Responsibility
//! - Decode untrusted stored records field by field, never by blind cast.
//! - Encode model records into the persisted layout.
//!
//! # Invariants
//! - `status` outside the enum decodes to `Submitted`.
//! - `reviewedBy` is a JSON string on the wire and a `Reviewer` in memory;
//!   anything undecodable becomes `None`.
//! - Unknown record keys round-trip through `extra_fields`.
//! - Decoding never fails and never changes a record's list position.

use crate::model::application::{Attachment, GrantApplication, Reviewer, Status};
use crate::model::project::Project;
use log::warn;
use serde::Deserialize;
use serde_json::{json, Map, Value};

const FIELD_PROJECT_ID: &str = "project_id";
const FIELD_PROJECT_TITLE: &str = "project_title";
const FIELD_PROJECT_DESCRIPTION: &str = "project_description";
const FIELD_REQUEST_AMOUNT: &str = "request_amount";
const FIELD_KEYWORDS: &str = "keywords";
const FIELD_STATUS: &str = "status";
const FIELD_REVIEWED_BY: &str = "reviewedBy";
// Older dashboard builds wrote the structured reviewer under this key.
const FIELD_REVIEWED_BY_LEGACY: &str = "reviewed_by";
const FIELD_ATTACHMENTS: &str = "attachments";

const KNOWN_FIELDS: &[&str] = &[
    FIELD_PROJECT_ID,
    FIELD_PROJECT_TITLE,
    FIELD_PROJECT_DESCRIPTION,
    FIELD_REQUEST_AMOUNT,
    FIELD_KEYWORDS,
    FIELD_STATUS,
    FIELD_REVIEWED_BY,
    FIELD_REVIEWED_BY_LEGACY,
    FIELD_ATTACHMENTS,
];

/// Decodes a stored status, substituting `Submitted` for anything invalid.
///
/// Accepted values are the four canonical ones plus the legacy
/// `"under review"` spelling (see [`Status::parse`]); every other value,
/// type or absence decodes to `Submitted`.
pub fn decode_status(raw: Option<&Value>) -> Status {
    parse_status(raw).unwrap_or_default()
}

fn parse_status(raw: Option<&Value>) -> Option<Status> {
    raw.and_then(Value::as_str).and_then(Status::parse)
}

/// Decodes a stored reviewer reference.
///
/// The expected form is a string holding `{"firstName", "lastName"}` JSON.
/// A structured object is accepted as well. Null, empty, undecodable or
/// incomplete references all yield `None`.
pub fn decode_reviewer(raw: Option<&Value>) -> Option<Reviewer> {
    let value = raw?;
    match value {
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => serde_json::from_str::<Reviewer>(text).ok(),
        Value::Object(_) => Reviewer::deserialize(value).ok(),
        _ => None,
    }
}

/// Encodes a reviewer into its persisted JSON-string form.
pub fn encode_reviewer(reviewer: &Reviewer) -> String {
    json!({
        "firstName": reviewer.first_name,
        "lastName": reviewer.last_name,
    })
    .to_string()
}

/// Decodes one stored project record.
///
/// Projects come from a trusted producer: numeric ids are stringified and
/// missing text fields become empty, but no record is rejected.
pub fn decode_project(raw: &Value) -> Project {
    Project {
        id: text_field(raw.get("id")),
        title: text_field(raw.get("title")),
        description: text_field(raw.get("description")),
    }
}

/// Decodes one stored application record.
///
/// `index` is the record's list position, used only for log correlation.
pub fn decode_application(raw: &Value, index: usize) -> GrantApplication {
    let Some(record) = raw.as_object() else {
        warn!("event=application_decode module=repo status=corrected index={index} reason=not_an_object");
        return GrantApplication::draft();
    };

    let raw_status = record.get(FIELD_STATUS);
    let status = match parse_status(raw_status) {
        Some(status) => status,
        None => {
            warn!(
                "event=application_decode module=repo status=corrected index={index} field=status reason={}",
                json_kind(raw_status)
            );
            Status::Submitted
        }
    };

    let raw_reviewer = record
        .get(FIELD_REVIEWED_BY)
        .filter(|value| !value.is_null())
        .or_else(|| record.get(FIELD_REVIEWED_BY_LEGACY));
    let reviewed_by = decode_reviewer(raw_reviewer);
    if reviewed_by.is_none() && raw_reviewer.is_some_and(is_present) {
        warn!(
            "event=application_decode module=repo status=corrected index={index} field=reviewedBy reason=undecodable"
        );
    }

    let extra_fields: Map<String, Value> = record
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    GrantApplication {
        project_id: text_field(record.get(FIELD_PROJECT_ID)),
        project_title: text_field(record.get(FIELD_PROJECT_TITLE)),
        project_description: text_field(record.get(FIELD_PROJECT_DESCRIPTION)),
        request_amount: amount_field(record.get(FIELD_REQUEST_AMOUNT)),
        keywords: text_field(record.get(FIELD_KEYWORDS)),
        status,
        reviewed_by,
        attachments: attachments_field(record.get(FIELD_ATTACHMENTS)),
        extra_fields,
    }
}

/// Encodes one application into its persisted layout.
pub fn encode_application(app: &GrantApplication) -> Value {
    let mut record = app.extra_fields.clone();
    record.insert(FIELD_PROJECT_ID.into(), Value::from(app.project_id.as_str()));
    record.insert(
        FIELD_PROJECT_TITLE.into(),
        Value::from(app.project_title.as_str()),
    );
    record.insert(
        FIELD_PROJECT_DESCRIPTION.into(),
        Value::from(app.project_description.as_str()),
    );
    record.insert(FIELD_REQUEST_AMOUNT.into(), encode_amount(app.request_amount));
    record.insert(FIELD_KEYWORDS.into(), Value::from(app.keywords.as_str()));
    record.insert(FIELD_STATUS.into(), Value::from(app.status.as_str()));
    if let Some(reviewer) = &app.reviewed_by {
        record.insert(FIELD_REVIEWED_BY.into(), Value::String(encode_reviewer(reviewer)));
    }
    record.insert(
        FIELD_ATTACHMENTS.into(),
        Value::Array(
            app.attachments
                .iter()
                .map(|attachment| {
                    json!({
                        "name": attachment.name,
                        "type": attachment.mime_type,
                    })
                })
                .collect(),
        ),
    );
    Value::Object(record)
}

/// Encodes a whole application list, preserving order.
pub fn encode_applications(apps: &[GrantApplication]) -> Value {
    Value::Array(apps.iter().map(encode_application).collect())
}

fn text_field(raw: Option<&Value>) -> String {
    match raw {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

// Form inputs historically stored the amount as text, so numeric strings
// are read as numbers. "NaN" and "inf" parse as f64 but have no JSON form.
fn amount_field(raw: Option<&Value>) -> f64 {
    match raw {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|amount| amount.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn encode_amount(amount: f64) -> Value {
    const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;
    if amount.is_finite() && amount.fract() == 0.0 && amount.abs() <= MAX_EXACT_INTEGER {
        Value::from(amount as i64)
    } else {
        Value::from(amount)
    }
}

fn attachments_field(raw: Option<&Value>) -> Vec<Attachment> {
    let Some(Value::Array(items)) = raw else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| Attachment {
            name: text_field(item.get("name")),
            mime_type: text_field(item.get("type")),
        })
        .collect()
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

fn json_kind(raw: Option<&Value>) -> &'static str {
    match raw {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::String(_)) => "unknown_value",
        Some(_) => "wrong_type",
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_application, decode_project, decode_reviewer, decode_status, encode_application,
        encode_reviewer,
    };
    use crate::model::application::{Attachment, GrantApplication, Reviewer, Status};
    use serde_json::{json, Value};

    #[test]
    fn invalid_statuses_decode_as_submitted() {
        for raw in [
            json!("APPROVED"),
            json!("Accepted"),
            json!(""),
            json!(null),
            json!(3),
            json!(true),
            json!(["accepted"]),
        ] {
            assert_eq!(decode_status(Some(&raw)), Status::Submitted, "raw: {raw}");
        }
        assert_eq!(decode_status(None), Status::Submitted);
    }

    #[test]
    fn valid_statuses_decode_unchanged() {
        for status in Status::ALL {
            let raw = json!(status.as_str());
            assert_eq!(decode_status(Some(&raw)), status);
        }
    }

    #[test]
    fn reviewer_string_round_trips() {
        let reviewer = Reviewer::new("Ada", "Lovelace");
        let encoded = Value::String(encode_reviewer(&reviewer));
        assert_eq!(decode_reviewer(Some(&encoded)), Some(reviewer));
        assert_eq!(decode_reviewer(None), None);
    }

    #[test]
    fn bad_reviewer_references_decode_as_none() {
        for raw in [
            json!(""),
            json!("{not json"),
            json!("\"just a string\""),
            json!(r#"{"firstName":"Jo"}"#),
            json!(42),
            json!(null),
        ] {
            assert_eq!(decode_reviewer(Some(&raw)), None, "raw: {raw}");
        }
    }

    #[test]
    fn structured_reviewer_object_is_accepted() {
        let raw = json!({"firstName": "Jo", "lastName": "Lee"});
        assert_eq!(decode_reviewer(Some(&raw)), Some(Reviewer::new("Jo", "Lee")));
    }

    #[test]
    fn project_ids_are_stringified() {
        let project = decode_project(&json!({"id": 17, "title": "Reef", "description": "Dive"}));
        assert_eq!(project.id, "17");
        assert_eq!(project.title, "Reef");

        let partial = decode_project(&json!({"id": "p-1"}));
        assert_eq!(partial.id, "p-1");
        assert_eq!(partial.title, "");
        assert_eq!(partial.description, "");
    }

    #[test]
    fn legacy_structured_reviewed_by_is_migrated_on_write() {
        let raw = json!({
            "project_id": "1",
            "status": "accepted",
            "reviewed_by": {"firstName": "Jo", "lastName": "Lee"},
            "attachments": []
        });
        let app = decode_application(&raw, 0);
        assert_eq!(app.reviewed_by, Some(Reviewer::new("Jo", "Lee")));
        assert!(app.extra_fields.is_empty());

        let encoded = encode_application(&app);
        assert!(encoded.get("reviewed_by").is_none());
        assert_eq!(
            encoded["reviewedBy"],
            json!(r#"{"firstName":"Jo","lastName":"Lee"}"#)
        );
    }

    #[test]
    fn wrong_typed_fields_fall_back_to_empty_values() {
        let raw = json!({
            "project_id": 9,
            "project_title": null,
            "request_amount": "2500",
            "keywords": ["a"],
            "attachments": "a.pdf"
        });
        let app = decode_application(&raw, 3);
        assert_eq!(app.project_id, "9");
        assert_eq!(app.project_title, "");
        assert_eq!(app.request_amount, 2500.0);
        assert_eq!(app.keywords, "");
        assert!(app.attachments.is_empty());
        assert_eq!(app.status, Status::Submitted);
    }

    #[test]
    fn non_finite_amount_text_decodes_as_zero() {
        for text in ["NaN", "inf", "-infinity", " Infinity "] {
            let app = decode_application(&json!({"request_amount": text}), 0);
            assert_eq!(app.request_amount, 0.0, "text: {text}");
            assert_eq!(encode_application(&app)["request_amount"], json!(0));
        }
        let app = decode_application(&json!({"request_amount": " 12.5 "}), 0);
        assert_eq!(app.request_amount, 12.5);
    }

    #[test]
    fn missing_reviewer_stays_missing_through_a_record_cycle() {
        let app = GrantApplication {
            project_id: "5".to_string(),
            status: Status::UnderReview,
            reviewed_by: None,
            ..GrantApplication::draft()
        };

        let encoded = encode_application(&app);
        assert!(encoded.get("reviewedBy").is_none());
        assert!(encoded.get("reviewed_by").is_none());

        let decoded = decode_application(&encoded, 0);
        assert_eq!(decoded.reviewed_by, None);
        assert_eq!(decoded, app);
    }

    #[test]
    fn present_reviewer_survives_a_record_cycle() {
        let app = GrantApplication {
            project_id: "5".to_string(),
            reviewed_by: Some(Reviewer::new("Ada", "Lovelace")),
            ..GrantApplication::draft()
        };
        let decoded = decode_application(&encode_application(&app), 0);
        assert_eq!(decoded.reviewed_by, Some(Reviewer::new("Ada", "Lovelace")));
    }

    #[test]
    fn non_object_record_decodes_to_empty_draft() {
        assert_eq!(decode_application(&json!("garbage"), 0), GrantApplication::draft());
    }

    #[test]
    fn encode_writes_persisted_layout() {
        let app = GrantApplication {
            project_id: "4".to_string(),
            project_title: "Soil".to_string(),
            project_description: "Carbon".to_string(),
            request_amount: 1200.0,
            keywords: "soil, carbon".to_string(),
            status: Status::UnderReview,
            reviewed_by: None,
            attachments: vec![Attachment::new("a.pdf", "application/pdf")],
            extra_fields: Default::default(),
        };

        assert_eq!(
            encode_application(&app),
            json!({
                "project_id": "4",
                "project_title": "Soil",
                "project_description": "Carbon",
                "request_amount": 1200,
                "keywords": "soil, carbon",
                "status": "under_review",
                "attachments": [{"name": "a.pdf", "type": "application/pdf"}]
            })
        );
    }

    #[test]
    fn fractional_amounts_keep_their_fraction() {
        let app = GrantApplication {
            request_amount: 99.5,
            ..GrantApplication::draft()
        };
        assert_eq!(encode_application(&app)["request_amount"], json!(99.5));
    }
}
