//! Consent error types

use thiserror::Error;

/// Why a consent requirement was not met
#[derive(Debug, Error)]
pub enum ConsentError {
    /// No record on file for the patient in this organization
    #[error("no AI processing consent on file for patient {patient_id}")]
    NotFound { patient_id: String },

    /// The record exists but was revoked
    #[error("AI processing consent for patient {patient_id} was revoked")]
    Revoked { patient_id: String },

    /// The record exists but has expired
    #[error("AI processing consent for patient {patient_id} has expired")]
    Expired { patient_id: String },

    /// The record exists but consent was withheld
    #[error("patient {patient_id} has not granted AI processing consent")]
    NotGranted { patient_id: String },

    /// The backing store failed
    #[error("consent repository error: {0}")]
    Repository(String),
}

impl ConsentError {
    /// The patient the failure concerns, when there is one
    pub fn patient_id(&self) -> Option<&str> {
        match self {
            Self::NotFound { patient_id }
            | Self::Revoked { patient_id }
            | Self::Expired { patient_id }
            | Self::NotGranted { patient_id } => Some(patient_id),
            Self::Repository(_) => None,
        }
    }
}

/// Result type alias for consent operations
pub type Result<T> = std::result::Result<T, ConsentError>;
