//! In-memory record repository for deterministic testing.
//!
//! ## Usage
//!
//! ```rust
//! use reclass_db::memory::MemoryRecordRepository;
//! use reclass_core::{AttachmentRef, Record, StorageCategory};
//!
//! let repo = MemoryRecordRepository::new(vec![Record::new(
//!     7,
//!     [AttachmentRef::new("abc", "report.pdf", "https://x/abc", StorageCategory::Media)],
//! )])
//! .failing_persist_for(8);
//! assert_eq!(repo.writes().len(), 0);
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use reclass_core::{Attachment, Error, Record, RecordRepository, Result};

/// Record repository backed by a vector.
#[derive(Clone, Default)]
pub struct MemoryRecordRepository {
    records: Arc<Mutex<Vec<Record>>>,
    writes: Arc<Mutex<Vec<i64>>>,
    failing: Arc<HashSet<i64>>,
    unavailable: bool,
}

impl MemoryRecordRepository {
    /// Create a repository holding `records` in the given order.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            ..Self::default()
        }
    }

    /// Make writes to `record_id` fail.
    pub fn failing_persist_for(mut self, record_id: i64) -> Self {
        Arc::make_mut(&mut self.failing).insert(record_id);
        self
    }

    /// Make listing fail as if the store were unreachable.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Current state of all records, including those with no attachments.
    pub fn snapshot(&self) -> Vec<Record> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Current state of one record.
    pub fn get(&self, record_id: i64) -> Option<Record> {
        self.snapshot().into_iter().find(|r| r.id == record_id)
    }

    /// Ids of successfully written records, in write order.
    pub fn writes(&self) -> Vec<i64> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Internal("memory repository lock poisoned".to_string())
}

#[async_trait]
impl RecordRepository for MemoryRecordRepository {
    async fn list_with_attachments(&self) -> Result<Vec<Record>> {
        if self.unavailable {
            return Err(Error::Connection("memory repository unavailable".to_string()));
        }
        let records = self.records.lock().map_err(poisoned)?;
        Ok(records
            .iter()
            .filter(|r| !r.attachments.is_empty())
            .cloned()
            .collect())
    }

    async fn replace_attachments(
        &self,
        record_id: i64,
        attachments: &[Attachment],
    ) -> Result<()> {
        if self.failing.contains(&record_id) {
            return Err(Error::Persist {
                record_id,
                message: "injected write failure".to_string(),
            });
        }
        let mut records = self.records.lock().map_err(poisoned)?;
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::Persist {
                record_id,
                message: "record no longer exists".to_string(),
            })?;
        record.attachments = attachments.to_vec();
        self.writes.lock().map_err(poisoned)?.push(record_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reclass_core::{AttachmentRef, StorageCategory};

    fn attachment(id: &str) -> AttachmentRef {
        AttachmentRef::new(id, format!("{}.pdf", id), format!("https://x/{}", id), StorageCategory::Media)
    }

    #[tokio::test]
    async fn test_list_skips_empty_records() {
        let repo = MemoryRecordRepository::new(vec![
            Record { id: 1, attachments: vec![] },
            Record::new(2, [attachment("a")]),
        ]);
        let listed = repo.list_with_attachments().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, 2);
    }

    #[tokio::test]
    async fn test_replace_and_failures() {
        let repo = MemoryRecordRepository::new(vec![
            Record::new(1, [attachment("a")]),
            Record::new(2, [attachment("b")]),
        ])
        .failing_persist_for(2);

        repo.replace_attachments(1, &[attachment("c").into()]).await.unwrap();
        assert_eq!(repo.get(1).unwrap(), Record::new(1, [attachment("c")]));

        let err = repo
            .replace_attachments(2, &[attachment("d").into()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persist { record_id: 2, .. }));
        assert!(repo.replace_attachments(3, &[]).await.is_err());
        assert_eq!(repo.writes(), vec![1]);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let repo = MemoryRecordRepository::default().unavailable();
        assert!(matches!(
            repo.list_with_attachments().await,
            Err(Error::Connection(_))
        ));
    }
}
