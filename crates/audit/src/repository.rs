//! Audit log storage
//!
//! The repository trait abstracts the storage technology entirely. The
//! in-memory implementation backs tests; the file implementation is the
//! durable reference store, appending one JSON entry per line.

use crate::error::Result;
use async_trait::async_trait;
use careflow_types::{AiAuditLog, AuditQueryParams};
use parking_lot::RwLock;
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Storage abstraction for audit entries
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persist one immutable entry
    async fn save(&self, log: AiAuditLog) -> Result<()>;

    /// Matching entries, newest first, honoring offset/limit
    async fn query(&self, params: &AuditQueryParams) -> Result<Vec<AiAuditLog>>;

    /// Number of matching entries, ignoring pagination
    async fn count(&self, params: &AuditQueryParams) -> Result<u64>;
}

fn filter_and_page(logs: &[AiAuditLog], params: &AuditQueryParams) -> Vec<AiAuditLog> {
    let mut matched: Vec<AiAuditLog> = logs.iter().filter(|l| params.matches(l)).cloned().collect();
    matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let offset = params.offset.unwrap_or(0);
    matched
        .into_iter()
        .skip(offset)
        .take(params.limit.unwrap_or(usize::MAX))
        .collect()
}

/// In-memory repository for tests
#[derive(Default)]
pub struct InMemoryAuditRepository {
    logs: RwLock<Vec<AiAuditLog>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored entry, in insertion order
    pub fn all(&self) -> Vec<AiAuditLog> {
        self.logs.read().clone()
    }

    pub fn clear(&self) {
        self.logs.write().clear();
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn save(&self, log: AiAuditLog) -> Result<()> {
        self.logs.write().push(log);
        Ok(())
    }

    async fn query(&self, params: &AuditQueryParams) -> Result<Vec<AiAuditLog>> {
        Ok(filter_and_page(&self.logs.read(), params))
    }

    async fn count(&self, params: &AuditQueryParams) -> Result<u64> {
        Ok(self.logs.read().iter().filter(|l| params.matches(l)).count() as u64)
    }
}

/// Durable append-only repository writing one JSON entry per line
///
/// Existing entries are loaded at open so queries see the full history.
pub struct FileAuditRepository {
    path: PathBuf,
    cache: RwLock<Vec<AiAuditLog>>,
}

impl FileAuditRepository {
    /// Open (or create) a JSONL audit file
    pub async fn open(path: PathBuf) -> Result<Self> {
        let cache = if path.exists() {
            Self::load_entries(&path).await?
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            Vec::new()
        };
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    async fn load_entries(path: &PathBuf) -> Result<Vec<AiAuditLog>> {
        let file = File::open(path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut entries = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Number of entries, loaded and appended
    pub fn entry_count(&self) -> usize {
        self.cache.read().len()
    }
}

#[async_trait]
impl AuditRepository for FileAuditRepository {
    async fn save(&self, log: AiAuditLog) -> Result<()> {
        // Serialize before any await; the cache lock is never held across one
        let json = serde_json::to_string(&log)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        self.cache.write().push(log);
        Ok(())
    }

    async fn query(&self, params: &AuditQueryParams) -> Result<Vec<AiAuditLog>> {
        Ok(filter_and_page(&self.cache.read(), params))
    }

    async fn count(&self, params: &AuditQueryParams) -> Result<u64> {
        Ok(self.cache.read().iter().filter(|l| params.matches(l)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careflow_types::AuditEventType;
    use chrono::Duration;

    fn make_log(org: &str, event: AuditEventType) -> AiAuditLog {
        AiAuditLog::new(event, org, "tenant-1", "user-1")
    }

    #[tokio::test]
    async fn test_memory_query_newest_first() {
        let repo = InMemoryAuditRepository::new();
        let mut older = make_log("org-1", AuditEventType::AiRequest);
        older.timestamp = older.timestamp - Duration::hours(1);
        let newer = make_log("org-1", AuditEventType::AiResponse);

        repo.save(older).await.unwrap();
        repo.save(newer).await.unwrap();

        let params = AuditQueryParams::for_organization("org-1");
        let logs = repo.query(&params).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].event_type, AuditEventType::AiResponse);
    }

    #[tokio::test]
    async fn test_memory_pagination() {
        let repo = InMemoryAuditRepository::new();
        for i in 0..5 {
            let mut log = make_log("org-1", AuditEventType::AiRequest);
            log.timestamp = log.timestamp + Duration::seconds(i);
            repo.save(log).await.unwrap();
        }

        let page = AuditQueryParams::for_organization("org-1").with_page(1, 2);
        let logs = repo.query(&page).await.unwrap();
        assert_eq!(logs.len(), 2);

        // Count ignores pagination
        assert_eq!(repo.count(&page).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_memory_filters_by_organization() {
        let repo = InMemoryAuditRepository::new();
        repo.save(make_log("org-1", AuditEventType::AiRequest))
            .await
            .unwrap();
        repo.save(make_log("org-2", AuditEventType::AiRequest))
            .await
            .unwrap();

        let params = AuditQueryParams::for_organization("org-1");
        assert_eq!(repo.query(&params).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_repository_appends_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let repo = FileAuditRepository::open(path.clone()).await.unwrap();
        repo.save(make_log("org-1", AuditEventType::AiRequest))
            .await
            .unwrap();
        repo.save(make_log("org-1", AuditEventType::AiResponse))
            .await
            .unwrap();
        assert_eq!(repo.entry_count(), 2);

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_file_repository_reloads_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        {
            let repo = FileAuditRepository::open(path.clone()).await.unwrap();
            repo.save(make_log("org-1", AuditEventType::ConsentCheck))
                .await
                .unwrap();
        }

        let reopened = FileAuditRepository::open(path).await.unwrap();
        assert_eq!(reopened.entry_count(), 1);

        let params = AuditQueryParams::for_organization("org-1");
        let logs = reopened.query(&params).await.unwrap();
        assert_eq!(logs[0].event_type, AuditEventType::ConsentCheck);
    }
}
