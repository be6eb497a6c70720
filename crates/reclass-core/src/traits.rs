//! Collaborator traits.
//!
//! The engine only talks to the record store and the object store through
//! these traits; concrete implementations live in `reclass-db` and
//! `reclass-store`.

use async_trait::async_trait;

use crate::{Attachment, Record, Result, StorageCategory, StoredObject, UploadRequest};

/// Remote object store holding attachment content.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether `identifier` exists under `category`.
    ///
    /// Absence is `Ok(false)`. Any other failure is an error and must not be
    /// read as absence.
    async fn exists(&self, identifier: &str, category: StorageCategory) -> Result<bool>;

    /// Download the full content at a retrieval location.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Upload content. Must not overwrite an existing object unless the
    /// request asks for it. The returned identifier may differ from the
    /// suggested one.
    async fn store(&self, request: UploadRequest) -> Result<StoredObject>;

    /// Remove `identifier` from `category`.
    async fn delete(&self, identifier: &str, category: StorageCategory) -> Result<()>;
}

/// Relational store owning records and their attachment collections.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// All records whose attachment collection is non-empty, in store order.
    async fn list_with_attachments(&self) -> Result<Vec<Record>>;

    /// Replace the attachment collection of one record.
    async fn replace_attachments(&self, record_id: i64, attachments: &[Attachment])
        -> Result<()>;
}
