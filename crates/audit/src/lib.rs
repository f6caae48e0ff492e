//! Immutable audit trail for AI activity
//!
//! One [`AiAuditLog`](careflow_types::AiAuditLog) entry per significant
//! event: request, response, human review, approval, rejection, guardrail
//! violation, consent check. Entries never carry raw assistant input or
//! output: input appears as a PHI-redacted, length-capped summary and
//! output only as a SHA-256 digest.
//!
//! Logging failures propagate to the caller. A missing audit entry in a
//! regulated domain is itself a compliance defect.

#![deny(unsafe_code)]

pub mod error;
pub mod logger;
pub mod repository;

pub use error::{AuditError, Result};
pub use logger::AuditLogger;
pub use repository::{AuditRepository, FileAuditRepository, InMemoryAuditRepository};
