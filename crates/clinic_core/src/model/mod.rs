//! Domain model for the clinic records backend.
//!
//! # Responsibility
//! - Define identity, profile, record and note shapes used by core logic.
//! - Own field-level validation that must hold before persistence.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID that is never reused.
//! - A user carries at most one role and at most one matching profile.

pub mod profile;
pub mod record;
pub mod user;
