//! Centralized default constants.
//!
//! Crates reference these instead of defining their own magic values. The
//! migration defaults describe the historical defect this tool repairs: PDF
//! uploads that landed in the image bucket instead of the raw bucket.

// =============================================================================
// MIGRATION
// =============================================================================

/// File extension whose uploads were misclassified (matched case-insensitively).
pub const TARGET_EXTENSION: &str = ".pdf";

/// Suffix appended to the identifier of the corrected copy so it never
/// collides with the still-present misplaced object.
pub const ID_SUFFIX: &str = "_fixed";

/// Folder the application uploads into.
pub const UPLOAD_FOLDER: &str = "res-management";

// =============================================================================
// RECORD STORE
// =============================================================================

/// Table holding the records with attachment collections.
pub const RECORD_TABLE: &str = "CheckHistories";

/// Integer primary key column.
pub const ID_COLUMN: &str = "id";

/// JSON column holding the attachment collection.
pub const ATTACHMENTS_COLUMN: &str = "attachments";

/// Timestamp column refreshed on every write by the application's ORM.
pub const UPDATED_AT_COLUMN: &str = "updatedAt";

/// A single sequential worker never needs more than a couple of connections.
pub const DB_MAX_CONNECTIONS: u32 = 2;

/// Seconds to wait for a database connection at startup.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// OBJECT STORE
// =============================================================================

/// Base URL of the object store REST API (cloud name is appended).
pub const STORE_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Per-request timeout for object store calls.
pub const STORE_TIMEOUT_SECS: u64 = 60;

/// Transfers slower than this are logged as slow.
pub const SLOW_TRANSFER_MS: u64 = 10_000;
