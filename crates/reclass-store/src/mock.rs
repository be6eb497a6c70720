//! In-memory object store for deterministic testing.
//!
//! Objects are keyed by identifier and category. Every object gets a
//! retrieval URL of the form `https://mock.store/{type}/upload/{identifier}`
//! and its content can be fetched from that URL. Failures are injected per
//! operation, optionally restricted to one identifier or URL.
//!
//! ## Usage
//!
//! ```rust
//! use reclass_store::mock::{MockObjectStore, MockOp};
//! use reclass_core::StorageCategory;
//!
//! let store = MockObjectStore::new()
//!     .with_object("abc", StorageCategory::Media, b"%PDF-1.4")
//!     .failing_on(MockOp::Delete, Some("abc"));
//! assert!(store.contains("abc", StorageCategory::Media));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use reclass_core::{Error, ObjectStore, Result, StorageCategory, StoredObject, UploadRequest};

const MOCK_BASE_URL: &str = "https://mock.store";

/// Object store operation, used for fault injection and the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Exists,
    Fetch,
    Store,
    Delete,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub op: MockOp,
    /// Identifier for exists/store/delete, URL for fetch.
    pub target: String,
    pub category: Option<StorageCategory>,
}

#[derive(Debug, Clone)]
struct Fault {
    op: MockOp,
    target: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    objects: HashMap<(String, StorageCategory), String>,
    content: HashMap<String, Vec<u8>>,
}

/// Object store backed by hash maps.
#[derive(Clone, Default)]
pub struct MockObjectStore {
    state: Arc<Mutex<MockState>>,
    faults: Arc<Vec<Fault>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

/// Retrieval URL the mock assigns to an object.
pub fn mock_url(identifier: &str, category: StorageCategory) -> String {
    format!(
        "{}/{}/upload/{}",
        MOCK_BASE_URL,
        category.resource_type(),
        identifier
    )
}

fn poisoned<T>(_: T) -> Error {
    Error::Internal("mock store lock poisoned".to_string())
}

impl MockObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object under `category`, fetchable from its mock URL.
    pub fn with_object(self, identifier: &str, category: StorageCategory, data: &[u8]) -> Self {
        if let Ok(mut state) = self.state.lock() {
            let url = mock_url(identifier, category);
            state
                .objects
                .insert((identifier.to_string(), category), url.clone());
            state.content.insert(url, data.to_vec());
        }
        self
    }

    /// Serve `data` from an arbitrary URL without registering an object.
    pub fn with_content(self, url: &str, data: &[u8]) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.content.insert(url.to_string(), data.to_vec());
        }
        self
    }

    /// Make `op` fail, for every target or only for `target`.
    pub fn failing_on(mut self, op: MockOp, target: Option<&str>) -> Self {
        Arc::make_mut(&mut self.faults).push(Fault {
            op,
            target: target.map(str::to_string),
        });
        self
    }

    /// Whether an object exists under `category`.
    pub fn contains(&self, identifier: &str, category: StorageCategory) -> bool {
        self.state
            .lock()
            .map(|s| s.objects.contains_key(&(identifier.to_string(), category)))
            .unwrap_or(false)
    }

    /// Content stored for an object.
    pub fn content_of(&self, identifier: &str, category: StorageCategory) -> Option<Vec<u8>> {
        let state = self.state.lock().ok()?;
        let url = state.objects.get(&(identifier.to_string(), category))?;
        state.content.get(url).cloned()
    }

    /// All calls in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Calls of one kind.
    pub fn calls_for(&self, op: MockOp) -> Vec<MockCall> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    fn record(&self, op: MockOp, target: &str, category: Option<StorageCategory>) -> Result<()> {
        self.call_log.lock().map_err(poisoned)?.push(MockCall {
            op,
            target: target.to_string(),
            category,
        });
        Ok(())
    }

    fn should_fail(&self, op: MockOp, target: &str) -> bool {
        self.faults
            .iter()
            .any(|f| f.op == op && f.target.as_deref().map_or(true, |t| t == target))
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn exists(&self, identifier: &str, category: StorageCategory) -> Result<bool> {
        self.record(MockOp::Exists, identifier, Some(category))?;
        if self.should_fail(MockOp::Exists, identifier) {
            return Err(Error::Transient("injected probe failure".to_string()));
        }
        Ok(self.contains(identifier, category))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.record(MockOp::Fetch, url, None)?;
        if self.should_fail(MockOp::Fetch, url) {
            return Err(Error::Fetch("injected download failure".to_string()));
        }
        let state = self.state.lock().map_err(poisoned)?;
        state
            .content
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("download returned 404 Not Found: {}", url)))
    }

    async fn store(&self, request: UploadRequest) -> Result<StoredObject> {
        self.record(MockOp::Store, &request.identifier, Some(request.category))?;
        if self.should_fail(MockOp::Store, &request.identifier) {
            return Err(Error::Upload("injected upload failure".to_string()));
        }

        let identifier = match &request.folder {
            Some(folder) => format!("{}/{}", folder, request.identifier),
            None => request.identifier.clone(),
        };
        let key = (identifier.clone(), request.category);

        let mut state = self.state.lock().map_err(poisoned)?;
        if let Some(url) = state.objects.get(&key) {
            if !request.overwrite {
                return Ok(StoredObject {
                    identifier,
                    url: url.clone(),
                });
            }
        }

        let url = mock_url(&identifier, request.category);
        state.objects.insert(key, url.clone());
        state.content.insert(url.clone(), request.data);
        Ok(StoredObject { identifier, url })
    }

    async fn delete(&self, identifier: &str, category: StorageCategory) -> Result<()> {
        self.record(MockOp::Delete, identifier, Some(category))?;
        if self.should_fail(MockOp::Delete, identifier) {
            return Err(Error::Delete("injected delete failure".to_string()));
        }
        let mut state = self.state.lock().map_err(poisoned)?;
        if let Some(url) = state.objects.remove(&(identifier.to_string(), category)) {
            state.content.remove(&url);
        }
        Ok(())
    }
}
