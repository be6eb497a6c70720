//! Decides, per attachment, whether it is misplaced.

use std::sync::Arc;

use tracing::{debug, instrument};

use reclass_core::{AttachmentRef, CandidateDecision, MigrationPolicy, ObjectStore};

/// Classifies attachments by probing the object store.
///
/// Non-candidates are decided from the file name alone. Candidates are probed
/// under the target category first, so an object present under both
/// categories is left alone.
#[derive(Clone)]
pub struct Classifier {
    store: Arc<dyn ObjectStore>,
    policy: MigrationPolicy,
}

impl Classifier {
    pub fn new(store: Arc<dyn ObjectStore>, policy: MigrationPolicy) -> Self {
        Self { store, policy }
    }

    #[instrument(skip(self, attachment), fields(subsystem = "engine", component = "classifier", identifier = %attachment.identifier))]
    pub async fn classify(&self, attachment: &AttachmentRef) -> CandidateDecision {
        if !self.policy.is_candidate(attachment.original_name.as_deref()) {
            return CandidateDecision::NotCandidate;
        }

        let decision = self.locate(attachment).await;
        debug!(decision = decision.label(), "Classified candidate");
        decision
    }

    async fn locate(&self, attachment: &AttachmentRef) -> CandidateDecision {
        match self.store.exists(&attachment.identifier, self.policy.target).await {
            Ok(true) => return CandidateDecision::AlreadyCorrect,
            Ok(false) => {}
            Err(e) => return CandidateDecision::ProbeFailed(e),
        }

        let other = self.policy.other_category();
        match self.store.exists(&attachment.identifier, other).await {
            Ok(true) => CandidateDecision::MisplacedAt(other),
            Ok(false) => CandidateDecision::Missing,
            Err(e) => CandidateDecision::ProbeFailed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    use reclass_core::{Error, StorageCategory};
    use reclass_store::mock::{MockObjectStore, MockOp};
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn policy() -> MigrationPolicy {
        MigrationPolicy {
            folder: None,
            ..MigrationPolicy::default()
        }
    }

    fn pdf(identifier: &str) -> AttachmentRef {
        AttachmentRef::new(
            identifier,
            "report.PDF",
            format!("https://x/{}", identifier),
            StorageCategory::Media,
        )
    }

    fn classifier(store: &MockObjectStore) -> Classifier {
        Classifier::new(Arc::new(store.clone()), policy())
    }

    #[tokio::test]
    async fn test_non_candidate_makes_no_calls() {
        let store = MockObjectStore::new();
        let mut photo = pdf("img");
        photo.original_name = Some("photo.jpg".to_string());
        let mut unnamed = pdf("legacy");
        unnamed.original_name = None;

        let classifier = classifier(&store);
        assert!(matches!(
            classifier.classify(&photo).await,
            CandidateDecision::NotCandidate
        ));
        assert!(matches!(
            classifier.classify(&unnamed).await,
            CandidateDecision::NotCandidate
        ));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_already_correct_probes_target_only() {
        let store = MockObjectStore::new().with_object("abc", StorageCategory::Document, b"pdf");
        let decision = classifier(&store).classify(&pdf("abc")).await;

        assert!(matches!(decision, CandidateDecision::AlreadyCorrect));
        let probes = store.calls_for(MockOp::Exists);
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].category, Some(StorageCategory::Document));
    }

    #[tokio::test]
    async fn test_every_decision_is_logged() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = MockObjectStore::new()
            .with_object("right", StorageCategory::Document, b"pdf")
            .with_object("wrong", StorageCategory::Media, b"pdf");
        let classifier = classifier(&store);
        classifier.classify(&pdf("right")).await;
        classifier.classify(&pdf("wrong")).await;

        let text = logs.text();
        assert_eq!(text.matches("Classified candidate").count(), 2);
        assert!(text.contains("already_correct"));
        assert!(text.contains("misplaced"));
    }

    #[tokio::test]
    async fn test_present_under_both_is_already_correct() {
        let store = MockObjectStore::new()
            .with_object("abc", StorageCategory::Document, b"pdf")
            .with_object("abc", StorageCategory::Media, b"pdf");
        assert!(matches!(
            classifier(&store).classify(&pdf("abc")).await,
            CandidateDecision::AlreadyCorrect
        ));
    }

    #[tokio::test]
    async fn test_misplaced_and_missing() {
        let store = MockObjectStore::new().with_object("abc", StorageCategory::Media, b"pdf");
        let classifier = classifier(&store);

        assert!(matches!(
            classifier.classify(&pdf("abc")).await,
            CandidateDecision::MisplacedAt(StorageCategory::Media)
        ));
        assert!(matches!(
            classifier.classify(&pdf("gone")).await,
            CandidateDecision::Missing
        ));
    }

    #[tokio::test]
    async fn test_probe_failure_is_not_absence() {
        let store = MockObjectStore::new()
            .with_object("abc", StorageCategory::Media, b"pdf")
            .failing_on(MockOp::Exists, Some("abc"));

        let decision = classifier(&store).classify(&pdf("abc")).await;
        assert!(matches!(
            decision,
            CandidateDecision::ProbeFailed(Error::Transient(_))
        ));
        // the other category is never probed after a failed target probe
        assert_eq!(store.calls_for(MockOp::Exists).len(), 1);
    }
}
