//! Relocates a misplaced object to the target category.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use reclass_core::{
    AttachmentRef, MigrationOutcome, MigrationPolicy, ObjectStore, StorageCategory, UploadRequest,
};

/// Copies a misplaced object under the target category, then removes the
/// stale copy.
///
/// Fetch or upload failures leave the original reference in place. A failed
/// delete does not: the record already points at the new copy, so the
/// outcome is still `Fixed` and the stale object becomes an orphan.
#[derive(Clone)]
pub struct Migrator {
    store: Arc<dyn ObjectStore>,
    policy: MigrationPolicy,
}

impl Migrator {
    pub fn new(store: Arc<dyn ObjectStore>, policy: MigrationPolicy) -> Self {
        Self { store, policy }
    }

    #[instrument(skip(self, attachment), fields(subsystem = "engine", component = "migrator", identifier = %attachment.identifier, from = %actual))]
    pub async fn migrate(
        &self,
        attachment: &AttachmentRef,
        actual: StorageCategory,
    ) -> MigrationOutcome {
        let start = Instant::now();

        let data = match self.store.fetch(&attachment.url).await {
            Ok(data) => data,
            Err(cause) => {
                return MigrationOutcome::Failed {
                    attachment: attachment.clone(),
                    cause,
                }
            }
        };
        let size_bytes = data.len();

        let request = UploadRequest {
            data,
            identifier: self.policy.corrected_identifier(&attachment.identifier),
            category: self.policy.target,
            folder: self.policy.folder.clone(),
            public: self.policy.public,
            overwrite: false,
        };
        let stored = match self.store.store(request).await {
            Ok(stored) => stored,
            Err(cause) => {
                return MigrationOutcome::Failed {
                    attachment: attachment.clone(),
                    cause,
                }
            }
        };

        let stale_removed = match self.store.delete(&attachment.identifier, actual).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    error = %e,
                    stale = %attachment.identifier,
                    category = %actual,
                    "Could not delete stale copy, left orphaned"
                );
                false
            }
        };

        info!(
            original_name = attachment.display_name(),
            new_identifier = %stored.identifier,
            size_bytes,
            duration_ms = start.elapsed().as_millis() as u64,
            "Relocated attachment"
        );

        MigrationOutcome::Fixed {
            attachment: attachment.relocated(&stored, self.policy.target),
            stale_removed,
        }
    }
}
