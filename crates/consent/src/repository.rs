//! Consent record storage

use crate::error::{ConsentError, Result};
use async_trait::async_trait;
use careflow_types::ConsentRecord;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Storage abstraction for consent records
///
/// Records are keyed by (patient, organization). `revoke` must stamp the
/// record rather than delete it.
#[async_trait]
pub trait ConsentRepository: Send + Sync {
    /// Fetch the record for a patient within an organization
    async fn get(&self, patient_id: &str, organization_id: &str)
        -> Result<Option<ConsentRecord>>;

    /// Insert or replace a record
    async fn save(&self, record: ConsentRecord) -> Result<()>;

    /// Soft-delete by stamping `revoked_at`; errors if no record exists
    async fn revoke(&self, patient_id: &str, organization_id: &str) -> Result<ConsentRecord>;
}

/// In-memory repository for tests and single-process deployments
#[derive(Default)]
pub struct InMemoryConsentRepository {
    records: RwLock<HashMap<(String, String), ConsentRecord>>,
}

impl InMemoryConsentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, revoked ones included
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ConsentRepository for InMemoryConsentRepository {
    async fn get(
        &self,
        patient_id: &str,
        organization_id: &str,
    ) -> Result<Option<ConsentRecord>> {
        let key = (patient_id.to_string(), organization_id.to_string());
        Ok(self.records.read().get(&key).cloned())
    }

    async fn save(&self, record: ConsentRecord) -> Result<()> {
        let key = (record.patient_id.clone(), record.organization_id.clone());
        self.records.write().insert(key, record);
        Ok(())
    }

    async fn revoke(&self, patient_id: &str, organization_id: &str) -> Result<ConsentRecord> {
        let key = (patient_id.to_string(), organization_id.to_string());
        let mut records = self.records.write();
        let record = records.get_mut(&key).ok_or_else(|| ConsentError::NotFound {
            patient_id: patient_id.to_string(),
        })?;
        record.revoke();
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_get() {
        let repo = InMemoryConsentRepository::new();
        let record = ConsentRecord::granted("patient-1", "org-1", "2.1", None);
        repo.save(record).await.unwrap();

        let found = repo.get("patient-1", "org-1").await.unwrap().unwrap();
        assert!(found.is_valid());
        assert!(repo.get("patient-1", "org-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_keeps_record() {
        let repo = InMemoryConsentRepository::new();
        repo.save(ConsentRecord::granted("patient-1", "org-1", "2.1", None))
            .await
            .unwrap();

        let revoked = repo.revoke("patient-1", "org-1").await.unwrap();
        assert!(revoked.revoked_at.is_some());

        // Soft delete: the record is still there
        assert_eq!(repo.len(), 1);
        let found = repo.get("patient-1", "org-1").await.unwrap().unwrap();
        assert!(!found.is_valid());
    }

    #[tokio::test]
    async fn test_revoke_missing_record_errors() {
        let repo = InMemoryConsentRepository::new();
        let err = repo.revoke("ghost", "org-1").await.unwrap_err();
        assert!(matches!(err, ConsentError::NotFound { .. }));
    }
}
