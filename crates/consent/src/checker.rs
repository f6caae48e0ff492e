//! Consent checking logic

use crate::error::{ConsentError, Result};
use crate::repository::ConsentRepository;
use careflow_types::ConsentRecord;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;

/// Outcome of a consent check
#[derive(Clone, Debug)]
pub struct ConsentDecision {
    pub granted: bool,
    /// Human-readable reason when consent is not granted
    pub reason: Option<String>,
    /// The record examined, when one exists
    pub record: Option<ConsentRecord>,
}

impl ConsentDecision {
    fn granted(record: ConsentRecord) -> Self {
        Self {
            granted: true,
            reason: None,
            record: Some(record),
        }
    }

    fn denied(reason: impl Into<String>, record: Option<ConsentRecord>) -> Self {
        Self {
            granted: false,
            reason: Some(reason.into()),
            record,
        }
    }
}

/// Verifies AI-processing consent before patient-scoped assistant calls
pub struct ConsentChecker {
    repository: Arc<dyn ConsentRepository>,
}

impl ConsentChecker {
    pub fn new(repository: Arc<dyn ConsentRepository>) -> Self {
        Self { repository }
    }

    /// Evaluate consent, returning a decision rather than an error
    pub async fn check_consent(
        &self,
        patient_id: &str,
        organization_id: &str,
    ) -> Result<ConsentDecision> {
        let record = self.repository.get(patient_id, organization_id).await?;
        let decision = match record {
            None => ConsentDecision::denied("no consent record on file", None),
            Some(record) => Self::evaluate(record),
        };
        tracing::debug!(
            patient_id,
            organization_id,
            granted = decision.granted,
            "consent checked"
        );
        Ok(decision)
    }

    fn evaluate(record: ConsentRecord) -> ConsentDecision {
        if record.revoked_at.is_some() {
            return ConsentDecision::denied("consent was revoked", Some(record));
        }
        if let Some(expires_at) = record.expires_at {
            if expires_at <= Utc::now() {
                return ConsentDecision::denied("consent has expired", Some(record));
            }
        }
        if !record.ai_processing_consent {
            return ConsentDecision::denied("AI processing consent was not granted", Some(record));
        }
        ConsentDecision::granted(record)
    }

    /// Throwing variant used before any patient-scoped assistant call
    pub async fn require_consent(
        &self,
        patient_id: &str,
        organization_id: &str,
    ) -> Result<ConsentRecord> {
        let record = self.repository.get(patient_id, organization_id).await?;
        let record = record.ok_or_else(|| ConsentError::NotFound {
            patient_id: patient_id.to_string(),
        })?;
        if record.revoked_at.is_some() {
            return Err(ConsentError::Revoked {
                patient_id: patient_id.to_string(),
            });
        }
        if record.expires_at.map(|e| e <= Utc::now()).unwrap_or(false) {
            return Err(ConsentError::Expired {
                patient_id: patient_id.to_string(),
            });
        }
        if !record.ai_processing_consent {
            return Err(ConsentError::NotGranted {
                patient_id: patient_id.to_string(),
            });
        }
        Ok(record)
    }

    /// Record a fresh grant
    pub async fn grant_consent(
        &self,
        patient_id: &str,
        organization_id: &str,
        consent_version: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ConsentRecord> {
        let record = ConsentRecord::granted(patient_id, organization_id, consent_version, expires_at);
        self.repository.save(record.clone()).await?;
        tracing::info!(patient_id, organization_id, consent_version, "consent granted");
        Ok(record)
    }

    /// Revoke an existing grant (soft delete)
    pub async fn revoke_consent(
        &self,
        patient_id: &str,
        organization_id: &str,
    ) -> Result<ConsentRecord> {
        let record = self.repository.revoke(patient_id, organization_id).await?;
        tracing::info!(patient_id, organization_id, "consent revoked");
        Ok(record)
    }

    /// Concurrent pre-flight check across a patient cohort
    ///
    /// Returns one (patient, decision) pair per input, in input order.
    pub async fn check_batch(
        &self,
        patient_ids: &[String],
        organization_id: &str,
    ) -> Vec<(String, Result<ConsentDecision>)> {
        let checks = patient_ids
            .iter()
            .map(|patient_id| async move {
                (
                    patient_id.clone(),
                    self.check_consent(patient_id, organization_id).await,
                )
            });
        join_all(checks).await
    }
}
