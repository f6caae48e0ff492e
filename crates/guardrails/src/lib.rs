//! Guardrails for Careflow assistant traffic
//!
//! Two gates around every assistant call:
//!
//! - [`InputGuardrail`] validates and sanitizes the input before it is
//!   logged or forwarded to a model, redacting PHI from string leaves.
//! - [`OutputGuardrail`] checks responses for structure, confidence sanity,
//!   and safety phrasing, and computes the human-review decision.
//!
//! Both gates run a two-tier [`RuleRegistry`]: universal rules applied to
//! every assistant type, plus a per-type rule set. A rule predicate that
//! errors is recorded as an error-severity violation; validation never
//! aborts the caller.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod phi;
pub mod rules;

pub use config::GuardrailConfig;
pub use error::GuardrailError;
pub use input::InputGuardrail;
pub use output::OutputGuardrail;
pub use phi::PhiRedactor;
pub use rules::{Rule, RuleRegistry};
