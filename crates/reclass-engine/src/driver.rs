//! Reconciliation pass over all records.
//!
//! Records are processed one at a time in repository order. Each record is
//! written back right after its attachments are resolved, and only if one of
//! them changed, so an interrupted pass leaves every visited record either
//! fixed or untouched.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, trace, warn};

use reclass_core::{
    Attachment, AttachmentRef, CandidateDecision, MigrationOutcome, MigrationPolicy, ObjectStore,
    Record, RecordRepository, Result, RunCounters,
};

use crate::classifier::Classifier;
use crate::migrator::Migrator;

/// Drives the classifier and migrator over every record.
pub struct Reconciler {
    records: Arc<dyn RecordRepository>,
    classifier: Classifier,
    migrator: Migrator,
    dry_run: bool,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordRepository>,
        policy: MigrationPolicy,
    ) -> Self {
        Self {
            records,
            classifier: Classifier::new(store.clone(), policy.clone()),
            migrator: Migrator::new(store, policy),
            dry_run: false,
            shutdown: None,
        }
    }

    /// Only probe and report; never upload, delete or write.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Stop between records once `shutdown` turns true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Run the pass.
    ///
    /// Fails only if the records cannot be listed. Per-attachment and
    /// per-record failures are counted and logged.
    #[instrument(skip(self), fields(subsystem = "engine", component = "driver", dry_run = self.dry_run))]
    pub async fn run(&self) -> Result<RunCounters> {
        let start = Instant::now();
        let mut counters = RunCounters::default();

        let records = self.records.list_with_attachments().await?;
        info!(record_count = records.len(), "Loaded records with attachments");

        for record in records {
            if self.shutdown_requested() {
                warn!(
                    records_scanned = counters.records_scanned,
                    "Shutdown requested, stopping before next record"
                );
                counters.interrupted = true;
                break;
            }
            if record.attachments.is_empty() {
                continue;
            }
            counters.records_scanned += 1;
            self.reconcile_record(record, &mut counters).await;
        }

        info!(
            fixed = counters.fixed,
            errored = counters.errored,
            records_updated = counters.records_updated,
            record_failures = counters.record_failures,
            duration_ms = start.elapsed().as_millis() as u64,
            "Reconciliation pass finished"
        );
        Ok(counters)
    }

    #[instrument(skip_all, fields(record_id = record.id, attachment_count = record.attachments.len()))]
    async fn reconcile_record(&self, record: Record, counters: &mut RunCounters) {
        let mut changed = false;
        let mut attachments = Vec::with_capacity(record.attachments.len());

        for (index, entry) in record.attachments.iter().enumerate() {
            let Attachment::Ref(attachment) = entry else {
                counters.unrecognized += 1;
                debug!(index, "Passing through unreadable attachment");
                attachments.push(entry.clone());
                continue;
            };
            trace!(identifier = %attachment.identifier, "Checking attachment");
            let outcome = self.resolve(attachment, counters).await;
            counters.record_outcome(&outcome);
            changed |= outcome.is_fixed();
            attachments.push(Attachment::Ref(outcome.into_attachment()));
        }

        if !changed {
            return;
        }

        match self.records.replace_attachments(record.id, &attachments).await {
            Ok(()) => {
                counters.records_updated += 1;
                info!("Record updated");
            }
            Err(e) => {
                counters.record_failures += 1;
                let replacement = serde_json::to_string(&attachments)
                    .unwrap_or_else(|se| format!("<unserializable: {}>", se));
                error!(
                    error = %e,
                    attachments = %replacement,
                    "Failed to persist record, re-apply these attachments manually"
                );
            }
        }
    }

    async fn resolve(
        &self,
        attachment: &AttachmentRef,
        counters: &mut RunCounters,
    ) -> MigrationOutcome {
        let decision = self.classifier.classify(attachment).await;
        match decision {
            CandidateDecision::NotCandidate => {
                counters.not_candidate += 1;
                MigrationOutcome::Unchanged(attachment.clone())
            }
            CandidateDecision::AlreadyCorrect => {
                counters.already_correct += 1;
                debug!(identifier = %attachment.identifier, "Already in target category");
                MigrationOutcome::Unchanged(attachment.clone())
            }
            CandidateDecision::MisplacedAt(actual) if self.dry_run => {
                counters.planned += 1;
                info!(
                    identifier = %attachment.identifier,
                    original_name = attachment.display_name(),
                    from = %actual,
                    "Would relocate attachment"
                );
                MigrationOutcome::Unchanged(attachment.clone())
            }
            CandidateDecision::MisplacedAt(actual) => {
                let outcome = self.migrator.migrate(attachment, actual).await;
                if let MigrationOutcome::Failed { cause, .. } = &outcome {
                    warn!(
                        identifier = %attachment.identifier,
                        error = %cause,
                        error_kind = cause.kind(),
                        "Migration failed, attachment left unchanged"
                    );
                }
                outcome
            }
            CandidateDecision::Missing => {
                warn!(
                    identifier = %attachment.identifier,
                    original_name = attachment.display_name(),
                    "Object not found under either category"
                );
                MigrationOutcome::NotFound(attachment.clone())
            }
            CandidateDecision::ProbeFailed(cause) => {
                warn!(
                    identifier = %attachment.identifier,
                    error = %cause,
                    "Existence probe failed, attachment left unchanged"
                );
                MigrationOutcome::Failed {
                    attachment: attachment.clone(),
                    cause,
                }
            }
        }
    }
}
