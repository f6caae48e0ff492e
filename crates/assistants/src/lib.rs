//! Clinical assistant adapters
//!
//! Five adapters share one external contract: `generate_suggestions`
//! takes an [`AssistantRequest`](careflow_types::AssistantRequest) and
//! returns an [`AssistantResponse`](careflow_types::AssistantResponse) of
//! confidence-scored suggestions. Each adapter wraps an injected async
//! model trait, measures wall-clock time, synthesizes rationale and
//! warnings, and applies its type's human-review policy:
//!
//! - documentation, coding, patient messaging: always review-mandatory
//! - triage: review on a critical priority or any red flag
//! - medication safety: review on any allergy alert, contraindication,
//!   or severe interaction
//!
//! The [`mock`] module provides deterministic models for tests and demos.

#![deny(unsafe_code)]

pub mod coding;
pub mod documentation;
pub mod error;
pub mod medication_safety;
pub mod mock;
pub mod patient_messaging;
pub mod triage;

pub use coding::{CodingAssistant, CodingDraft, CodingModel, ScoredCode};
pub use documentation::{DocumentationAssistant, DocumentationDraft, DocumentationModel};
pub use error::{AssistantError, Result};
pub use medication_safety::{
    MedicationSafetyAssistant, MedicationSafetyModel, SafetyDraft, ScoredAlert, SafetyQuickCheck,
};
pub use patient_messaging::{
    MessageUrgency, PatientMessagingAssistant, PatientMessagingModel, ScoredDraft,
};
pub use triage::{TriageAssistant, TriageDraft, TriageModel};
