//! Structured logging field name constants.
//!
//! Every crate logs with these names so a run can be filtered by record,
//! object or operation regardless of which component emitted the event.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Record could not be persisted, operator must re-apply |
//! | WARN  | Attachment left unchanged after a failure, orphaned stale copy |
//! | INFO  | Run lifecycle, each fixed attachment, each persisted record |
//! | DEBUG | Classifier decisions, config choices |
//! | TRACE | Per-attachment iteration, raw remote responses |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "store", "engine", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "records", "cloudinary", "classifier", "migrator", "driver"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "exists", "fetch", "store", "delete", "list", "persist"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Integer id of the record being processed.
pub const RECORD_ID: &str = "record_id";

/// Object identifier in the remote store.
pub const IDENTIFIER: &str = "identifier";

/// Storage category of an object ("document" / "media").
pub const CATEGORY: &str = "category";

/// Original file name of an attachment.
pub const ORIGINAL_NAME: &str = "original_name";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of records returned by a listing.
pub const RECORD_COUNT: &str = "record_count";

/// Number of attachments in a record.
pub const ATTACHMENT_COUNT: &str = "attachment_count";

/// Byte length of a transferred object.
pub const SIZE_BYTES: &str = "size_bytes";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Database table affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Decision reached by the classifier.
pub const DECISION: &str = "decision";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Error class label (see `Error::kind`).
pub const ERROR_KIND: &str = "error_kind";

/// Whether the run only plans changes.
pub const DRY_RUN: &str = "dry_run";

/// Every field name above.
pub const ALL_FIELDS: &[&str] = &[
    SUBSYSTEM,
    COMPONENT,
    OPERATION,
    RECORD_ID,
    IDENTIFIER,
    CATEGORY,
    ORIGINAL_NAME,
    DURATION_MS,
    RECORD_COUNT,
    ATTACHMENT_COUNT,
    SIZE_BYTES,
    POOL_SIZE,
    DB_TABLE,
    DECISION,
    ERROR_MSG,
    ERROR_KIND,
    DRY_RUN,
];
