//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `grantdesk_core` linkage and store decoding from a shell.
//! - Print one deterministic summary line per collection.
//!
//! Usage: `grantdesk_cli [store_path]` (defaults to `grantdesk_store.sqlite3`).

use grantdesk_core::db::open_db;
use grantdesk_core::{ApplicationRepository, SqliteKeyValueStore, Status, DEFAULT_STORE_FILE_NAME};
use std::process::ExitCode;

fn main() -> ExitCode {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_STORE_FILE_NAME.to_string());

    println!("grantdesk_core version={}", grantdesk_core::core_version());

    let conn = match open_db(&path) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("failed to open store `{path}`: {err}");
            return ExitCode::FAILURE;
        }
    };
    let repo = ApplicationRepository::new(SqliteKeyValueStore::new(&conn));

    let projects = repo.load_projects();
    let applications = repo.load_applications();
    println!("projects={}", projects.len());

    let counts: Vec<String> = Status::ALL
        .iter()
        .map(|status| {
            let count = applications
                .iter()
                .filter(|app| app.status == *status)
                .count();
            format!("{}={count}", status.as_str())
        })
        .collect();
    println!("applications={} {}", applications.len(), counts.join(" "));

    ExitCode::SUCCESS
}
