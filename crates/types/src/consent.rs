//! Patient consent records
//!
//! Records are never physically deleted; revocation stamps `revoked_at` so
//! the consent history stays intact for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One patient's AI-processing consent within one organization
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub patient_id: String,
    pub organization_id: String,
    pub ai_processing_consent: bool,
    pub consent_date: DateTime<Utc>,
    pub consent_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ConsentRecord {
    /// Create a freshly granted record
    pub fn granted(
        patient_id: impl Into<String>,
        organization_id: impl Into<String>,
        consent_version: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            organization_id: organization_id.into(),
            ai_processing_consent: true,
            consent_date: Utc::now(),
            consent_version: consent_version.into(),
            expires_at,
            revoked_at: None,
        }
    }

    /// Validity at a given instant: consent granted, not revoked, and
    /// either no expiry or an expiry still in the future
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.ai_processing_consent
            && self.revoked_at.is_none()
            && self.expires_at.map(|e| e > now).unwrap_or(true)
    }

    /// Validity right now
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Stamp the record revoked
    pub fn revoke(&mut self) {
        self.revoked_at = Some(Utc::now());
    }
}
