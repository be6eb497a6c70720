//! Data model shared by the record store, the object store and the engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::Error;

// =============================================================================
// STORAGE CATEGORY
// =============================================================================

/// Category an object is physically stored under in the object store.
///
/// Persisted with the object store's own resource-type names (`raw`, `image`);
/// `document` and `media` are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageCategory {
    /// Non-media files served verbatim (`raw`).
    #[serde(rename = "raw", alias = "document")]
    Document,
    /// Images and rendered media (`image`).
    #[serde(rename = "image", alias = "media")]
    Media,
}

impl StorageCategory {
    /// The other member of the closed two-member set.
    pub fn other(self) -> Self {
        match self {
            Self::Document => Self::Media,
            Self::Media => Self::Document,
        }
    }

    /// Resource-type segment used by the object store API.
    pub fn resource_type(self) -> &'static str {
        match self {
            Self::Document => "raw",
            Self::Media => "image",
        }
    }
}

impl fmt::Display for StorageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Media => write!(f, "media"),
        }
    }
}

impl FromStr for StorageCategory {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "document" | "raw" => Ok(Self::Document),
            "media" | "image" => Ok(Self::Media),
            _ => Err(format!("Invalid storage category: {}", s)),
        }
    }
}

// =============================================================================
// ATTACHMENTS AND RECORDS
// =============================================================================

/// One file reference inside a record's attachment collection.
///
/// Fields the application stores alongside the reference (size, upload date,
/// mime type, …) are kept in `extra` and survive a rewrite untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Stable key of the object in the object store.
    #[serde(rename = "public_id", alias = "identifier")]
    pub identifier: String,
    /// File name at upload time. Only used for extension-based candidacy.
    #[serde(
        rename = "original_name",
        alias = "originalName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub original_name: Option<String>,
    /// Last known retrieval location.
    pub url: String,
    /// Declared storage category. Absent on some legacy uploads.
    #[serde(
        rename = "resource_type",
        alias = "category",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<StorageCategory>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl AttachmentRef {
    /// Build a reference with no extra fields.
    pub fn new(
        identifier: impl Into<String>,
        original_name: impl Into<String>,
        url: impl Into<String>,
        category: StorageCategory,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            original_name: Some(original_name.into()),
            url: url.into(),
            category: Some(category),
            extra: Map::new(),
        }
    }

    /// Copy of this reference pointing at a relocated object.
    pub fn relocated(&self, stored: &StoredObject, category: StorageCategory) -> Self {
        Self {
            identifier: stored.identifier.clone(),
            url: stored.url.clone(),
            category: Some(category),
            ..self.clone()
        }
    }

    /// Display name for logs.
    pub fn display_name(&self) -> &str {
        self.original_name.as_deref().unwrap_or(&self.identifier)
    }
}

/// One element of a stored attachment collection.
///
/// Elements that do not decode as an `AttachmentRef` (unknown resource type,
/// null url, …) are kept as raw JSON. They are never candidates and are
/// written back exactly as read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attachment {
    Ref(AttachmentRef),
    Opaque(JsonValue),
}

impl Attachment {
    /// The decoded reference, if this element has one.
    pub fn as_known(&self) -> Option<&AttachmentRef> {
        match self {
            Self::Ref(attachment) => Some(attachment),
            Self::Opaque(_) => None,
        }
    }
}

impl From<AttachmentRef> for Attachment {
    fn from(attachment: AttachmentRef) -> Self {
        Self::Ref(attachment)
    }
}

/// A relational entity owning an ordered attachment collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub attachments: Vec<Attachment>,
}

impl Record {
    /// Build a record whose elements all decoded.
    pub fn new(id: i64, attachments: impl IntoIterator<Item = AttachmentRef>) -> Self {
        Self {
            id,
            attachments: attachments.into_iter().map(Attachment::from).collect(),
        }
    }
}

// =============================================================================
// OBJECT STORE VALUES
// =============================================================================

/// Parameters of an upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Object content.
    pub data: Vec<u8>,
    /// Identifier the caller would like; the store may return another one.
    pub identifier: String,
    /// Category to store under.
    pub category: StorageCategory,
    /// Namespace folder, if any.
    pub folder: Option<String>,
    /// Whether the object is publicly readable.
    pub public: bool,
    /// Whether an existing object at the same identifier may be replaced.
    pub overwrite: bool,
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("size_bytes", &self.data.len())
            .field("identifier", &self.identifier)
            .field("category", &self.category)
            .field("folder", &self.folder)
            .field("public", &self.public)
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub identifier: String,
    pub url: String,
}

// =============================================================================
// DECISIONS AND OUTCOMES
// =============================================================================

/// Classifier verdict for a single attachment.
#[derive(Debug)]
pub enum CandidateDecision {
    /// File type is not affected; no remote call was made.
    NotCandidate,
    /// Object already exists under the target category.
    AlreadyCorrect,
    /// Object exists only under the given (wrong) category.
    MisplacedAt(StorageCategory),
    /// Object exists under neither category.
    Missing,
    /// A probe failed for a reason other than absence.
    ProbeFailed(Error),
}

impl CandidateDecision {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotCandidate => "not_candidate",
            Self::AlreadyCorrect => "already_correct",
            Self::MisplacedAt(_) => "misplaced",
            Self::Missing => "missing",
            Self::ProbeFailed(_) => "probe_failed",
        }
    }
}

/// Per-attachment result folded into the record by the driver.
#[derive(Debug)]
pub enum MigrationOutcome {
    /// Attachment passes through as-is.
    Unchanged(AttachmentRef),
    /// Attachment was relocated; `stale_removed` is false when the misplaced
    /// copy could not be deleted and is now an orphan.
    Fixed {
        attachment: AttachmentRef,
        stale_removed: bool,
    },
    /// Object exists under neither category.
    NotFound(AttachmentRef),
    /// A step failed; the original reference is kept.
    Failed { attachment: AttachmentRef, cause: Error },
}

impl MigrationOutcome {
    /// The reference that belongs in the record after this outcome.
    pub fn into_attachment(self) -> AttachmentRef {
        match self {
            Self::Unchanged(a) | Self::NotFound(a) => a,
            Self::Fixed { attachment, .. } | Self::Failed { attachment, .. } => attachment,
        }
    }

    /// True if the record's collection changes because of this outcome.
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed { .. })
    }

    /// True for outcomes counted as errors.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Failed { .. })
    }
}

// =============================================================================
// RUN COUNTERS
// =============================================================================

/// Process-scoped tally of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// Attachments relocated to the target category.
    pub fixed: u64,
    /// Attachments that were missing or failed to migrate.
    pub errored: u64,
    /// Candidates already under the target category.
    pub already_correct: u64,
    /// Attachments whose file type is not affected.
    pub not_candidate: u64,
    /// Collection elements that could not be read and were passed through.
    pub unrecognized: u64,
    /// Stale copies left behind after a failed delete.
    pub orphaned: u64,
    /// Misplaced attachments found during a dry run.
    pub planned: u64,
    /// Records visited.
    pub records_scanned: u64,
    /// Records whose attachment collection was written back.
    pub records_updated: u64,
    /// Records whose write failed.
    pub record_failures: u64,
    /// The run stopped early on a shutdown signal.
    pub interrupted: bool,
}

impl RunCounters {
    /// Fold one attachment outcome into the tally.
    pub fn record_outcome(&mut self, outcome: &MigrationOutcome) {
        match outcome {
            MigrationOutcome::Fixed { stale_removed, .. } => {
                self.fixed += 1;
                if !stale_removed {
                    self.orphaned += 1;
                }
            }
            MigrationOutcome::NotFound(_) | MigrationOutcome::Failed { .. } => self.errored += 1,
            MigrationOutcome::Unchanged(_) => {}
        }
    }

    /// Whether any record failed to persist.
    pub fn has_record_failures(&self) -> bool {
        self.record_failures > 0
    }
}

impl fmt::Display for RunCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(50))?;
        if self.interrupted {
            writeln!(f, "Migration interrupted")?;
        } else {
            writeln!(f, "Migration complete")?;
        }
        writeln!(f, "   Records scanned:  {}", self.records_scanned)?;
        writeln!(f, "   Records updated:  {}", self.records_updated)?;
        writeln!(f, "   Fixed:            {}", self.fixed)?;
        writeln!(f, "   Errors:           {}", self.errored)?;
        writeln!(f, "   Already correct:  {}", self.already_correct)?;
        if self.planned > 0 {
            writeln!(f, "   Would fix:        {}", self.planned)?;
        }
        if self.unrecognized > 0 {
            writeln!(f, "   Unrecognized:     {}", self.unrecognized)?;
        }
        if self.orphaned > 0 {
            writeln!(f, "   Orphaned copies:  {}", self.orphaned)?;
        }
        if self.record_failures > 0 {
            writeln!(f, "   Record failures:  {}", self.record_failures)?;
        }
        write!(f, "{}", "=".repeat(50))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_other() {
        assert_eq!(StorageCategory::Document.other(), StorageCategory::Media);
        assert_eq!(StorageCategory::Media.other(), StorageCategory::Document);
    }

    #[test]
    fn test_category_from_str_accepts_both_vocabularies() {
        assert_eq!("raw".parse::<StorageCategory>(), Ok(StorageCategory::Document));
        assert_eq!("Document".parse::<StorageCategory>(), Ok(StorageCategory::Document));
        assert_eq!("image".parse::<StorageCategory>(), Ok(StorageCategory::Media));
        assert_eq!("media".parse::<StorageCategory>(), Ok(StorageCategory::Media));
        assert!("video".parse::<StorageCategory>().is_err());
    }

    #[test]
    fn test_attachment_deserializes_stored_layout() {
        let value = json!({
            "public_id": "res-management/abc",
            "original_name": "report.pdf",
            "url": "https://x/abc",
            "resource_type": "image",
            "size": 1024
        });
        let att: AttachmentRef = serde_json::from_value(value).unwrap();
        assert_eq!(att.identifier, "res-management/abc");
        assert_eq!(att.original_name.as_deref(), Some("report.pdf"));
        assert_eq!(att.category, Some(StorageCategory::Media));
        assert_eq!(att.extra.get("size"), Some(&json!(1024)));
    }

    #[test]
    fn test_attachment_accepts_spec_names() {
        let value = json!({
            "identifier": "abc",
            "originalName": "report.pdf",
            "url": "https://x/abc",
            "category": "media"
        });
        let att: AttachmentRef = serde_json::from_value(value).unwrap();
        assert_eq!(att.identifier, "abc");
        assert_eq!(att.category, Some(StorageCategory::Media));
        assert!(att.extra.is_empty());
    }

    #[test]
    fn test_attachment_legacy_row_without_name_or_category() {
        let att: AttachmentRef =
            serde_json::from_value(json!({"public_id": "x", "url": "https://x/x"})).unwrap();
        assert!(att.original_name.is_none());
        assert!(att.category.is_none());

        let back = serde_json::to_value(&att).unwrap();
        assert_eq!(back, json!({"public_id": "x", "url": "https://x/x"}));
    }

    #[test]
    fn test_collection_keeps_undecodable_elements() {
        let value = json!([
            {"public_id": "abc", "original_name": "report.pdf",
             "url": "https://x/abc", "resource_type": "image"},
            {"public_id": "clip", "url": "https://x/clip", "resource_type": "video"},
            {"public_id": "broken", "url": null}
        ]);
        let attachments: Vec<Attachment> = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(attachments.len(), 3);
        assert_eq!(attachments[0].as_known().unwrap().identifier, "abc");
        assert!(attachments[1].as_known().is_none());
        assert!(attachments[2].as_known().is_none());
        assert_eq!(serde_json::to_value(&attachments).unwrap(), value);
    }

    #[test]
    fn test_relocated_keeps_extra_fields() {
        let mut att = AttachmentRef::new("abc", "report.pdf", "https://x/abc", StorageCategory::Media);
        att.extra.insert("uploaded_at".into(), json!("2024-03-01"));

        let stored = StoredObject {
            identifier: "abc_fixed".into(),
            url: "https://x/abc_fixed".into(),
        };
        let moved = att.relocated(&stored, StorageCategory::Document);

        assert_eq!(moved.identifier, "abc_fixed");
        assert_eq!(moved.url, "https://x/abc_fixed");
        assert_eq!(moved.category, Some(StorageCategory::Document));
        assert_eq!(moved.original_name.as_deref(), Some("report.pdf"));
        assert_eq!(moved.extra.get("uploaded_at"), Some(&json!("2024-03-01")));

        let value = serde_json::to_value(&moved).unwrap();
        assert_eq!(value["resource_type"], json!("raw"));
        assert_eq!(value["public_id"], json!("abc_fixed"));
    }

    #[test]
    fn test_counters_fold_outcomes() {
        let att = AttachmentRef::new("a", "a.pdf", "u", StorageCategory::Media);
        let mut counters = RunCounters::default();

        counters.record_outcome(&MigrationOutcome::Fixed {
            attachment: att.clone(),
            stale_removed: true,
        });
        counters.record_outcome(&MigrationOutcome::Fixed {
            attachment: att.clone(),
            stale_removed: false,
        });
        counters.record_outcome(&MigrationOutcome::NotFound(att.clone()));
        counters.record_outcome(&MigrationOutcome::Failed {
            attachment: att.clone(),
            cause: Error::Upload("boom".into()),
        });
        counters.record_outcome(&MigrationOutcome::Unchanged(att));

        assert_eq!(counters.fixed, 2);
        assert_eq!(counters.orphaned, 1);
        assert_eq!(counters.errored, 2);
    }

    #[test]
    fn test_counters_summary_mentions_totals() {
        let counters = RunCounters {
            fixed: 3,
            errored: 1,
            ..Default::default()
        };
        let summary = counters.to_string();
        assert!(summary.contains("Migration complete"));
        assert!(summary.contains("Fixed:            3"));
        assert!(summary.contains("Errors:           1"));
        assert!(!summary.contains("Would fix"));
    }

    #[test]
    fn test_upload_request_debug_hides_content() {
        let req = UploadRequest {
            data: vec![0u8; 4096],
            identifier: "abc_fixed".into(),
            category: StorageCategory::Document,
            folder: None,
            public: true,
            overwrite: false,
        };
        let debug = format!("{:?}", req);
        assert!(debug.contains("size_bytes: 4096"));
        assert!(!debug.contains("[0, 0"));
    }
}
