//! Domain model for grant applications and the projects they reference.
//!
//! # Responsibility
//! - Define the typed records the repository decodes stored data into.
//! - Own the application status lifecycle and submission checks.
//!
//! # Invariants
//! - Applications have no primary key; identity is list position.
//! - Project fields on an application are a snapshot, never a live join.

pub mod application;
pub mod project;
