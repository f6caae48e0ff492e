//! Patient consent verification
//!
//! Every patient-scoped assistant call must pass a consent check first.
//! [`ConsentChecker`] evaluates records fetched through the async
//! [`ConsentRepository`] trait; the in-memory implementation backs tests
//! and single-process deployments.
//!
//! Revocation is a soft delete: the record keeps its history and gains a
//! `revoked_at` stamp.

#![deny(unsafe_code)]

pub mod checker;
pub mod error;
pub mod repository;

pub use checker::{ConsentChecker, ConsentDecision};
pub use error::{ConsentError, Result};
pub use repository::{ConsentRepository, InMemoryConsentRepository};
