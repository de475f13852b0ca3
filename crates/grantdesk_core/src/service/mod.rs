//! Use-case services over the repository layer.
//!
//! # Responsibility
//! - Hold per-session state (loaded collections, current draft).
//! - Keep callers away from store revisions and blob encoding.

pub mod application_service;
