//! Cloudinary-backed object store.
//!
//! Probes use the Admin API (`GET resources/{type}/upload/{public_id}`, basic
//! auth). Uploads and deletions use the signed Upload API.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, instrument, trace, warn};

use reclass_core::{
    defaults, Error, ObjectStore, Result, StorageCategory, StoredObject, UploadRequest,
};

use crate::config::StoreConfig;
use crate::signing::{self, SIGNATURE_ALGORITHM};

/// Upload API response. Only the fields we use.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: Option<String>,
    url: Option<String>,
    #[serde(default)]
    existing: bool,
}

/// Destroy API response.
#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorMessage {
    message: String,
}

/// Pull the `error.message` out of a failed API response, falling back to
/// the raw body.
fn api_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => format!("{}: {}", status, parsed.error.message),
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => format!("{}: {}", status, body),
    }
}

/// Object store backed by a Cloudinary account.
pub struct CloudinaryStore {
    client: Client,
    config: StoreConfig,
}

impl CloudinaryStore {
    /// Create a store with its own HTTP client.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(StoreConfig::from_env()?)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}/{}", self.config.account_url(), path))
            .map_err(|e| Error::Config(format!("invalid store endpoint: {}", e)))
    }

    fn resource_url(&self, identifier: &str, category: StorageCategory) -> Result<Url> {
        let mut url = self.endpoint(&format!(
            "resources/{}/upload",
            category.resource_type()
        ))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("store endpoint cannot be a base".to_string()))?
            .extend(identifier.split('/'));
        Ok(url)
    }

    fn timestamp() -> String {
        chrono::Utc::now().timestamp().to_string()
    }

    /// Sign `params` and return them with `api_key`, `signature` and
    /// `signature_algorithm` appended.
    fn signed(&self, params: BTreeMap<&'static str, String>) -> Vec<(&'static str, String)> {
        let signature = signing::sign(&params, &self.config.api_secret);
        let mut fields: Vec<(&'static str, String)> = params
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .collect();
        fields.push(("api_key", self.config.api_key.clone()));
        fields.push(("signature", signature));
        fields.push(("signature_algorithm", SIGNATURE_ALGORITHM.to_string()));
        fields
    }

    fn warn_if_slow(op: &'static str, elapsed: u64, size_bytes: usize) {
        if elapsed > defaults::SLOW_TRANSFER_MS {
            warn!(
                op,
                duration_ms = elapsed,
                size_bytes,
                "Slow object store transfer"
            );
        }
    }
}

#[async_trait]
impl ObjectStore for CloudinaryStore {
    #[instrument(skip(self), fields(subsystem = "store", component = "cloudinary", op = "exists", category = %category))]
    async fn exists(&self, identifier: &str, category: StorageCategory) -> Result<bool> {
        let url = self.resource_url(identifier, category)?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("probe request failed: {}", e)))?;

        let status = response.status();
        trace!(status = status.as_u16(), "Probe response");
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Transient(format!(
                    "probe for {} returned {}",
                    identifier,
                    api_error_message(s, &body)
                )))
            }
        }
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "cloudinary", op = "fetch"))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("download failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("download returned {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("download interrupted: {}", e)))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(duration_ms = elapsed, size_bytes = bytes.len(), "Downloaded object");
        Self::warn_if_slow("fetch", elapsed, bytes.len());
        Ok(bytes.to_vec())
    }

    #[instrument(skip(self, request), fields(subsystem = "store", component = "cloudinary", op = "store", identifier = %request.identifier, category = %request.category, size_bytes = request.data.len()))]
    async fn store(&self, request: UploadRequest) -> Result<StoredObject> {
        let start = Instant::now();
        let size_bytes = request.data.len();
        let url = self.endpoint(&format!("{}/upload", request.category.resource_type()))?;

        let mut params = BTreeMap::new();
        params.insert("public_id", request.identifier.clone());
        params.insert("folder", request.folder.clone().unwrap_or_default());
        params.insert(
            "access_mode",
            if request.public { "public" } else { "authenticated" }.to_string(),
        );
        params.insert("overwrite", request.overwrite.to_string());
        params.insert("timestamp", Self::timestamp());

        let file_name = request
            .identifier
            .rsplit('/')
            .next()
            .unwrap_or(&request.identifier)
            .to_string();
        let mut form = multipart::Form::new()
            .part("file", multipart::Part::bytes(request.data).file_name(file_name));
        for (name, value) in self.signed(params) {
            form = form.text(name, value);
        }

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Upload(format!("upload request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Upload(format!("upload response unreadable: {}", e)))?;
        if !status.is_success() {
            return Err(Error::Upload(api_error_message(status, &body)));
        }

        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Upload(format!("unexpected upload response: {}", e)))?;
        let url = parsed
            .secure_url
            .or(parsed.url)
            .ok_or_else(|| Error::Upload("upload response has no url".to_string()))?;

        let elapsed = start.elapsed().as_millis() as u64;
        if parsed.existing {
            info!(
                stored_as = %parsed.public_id,
                "Object already present at target, reusing it"
            );
        } else {
            debug!(stored_as = %parsed.public_id, duration_ms = elapsed, "Uploaded object");
        }
        Self::warn_if_slow("store", elapsed, size_bytes);

        Ok(StoredObject {
            identifier: parsed.public_id,
            url,
        })
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "cloudinary", op = "delete", category = %category))]
    async fn delete(&self, identifier: &str, category: StorageCategory) -> Result<()> {
        let url = self.endpoint(&format!("{}/destroy", category.resource_type()))?;

        let mut params = BTreeMap::new();
        params.insert("public_id", identifier.to_string());
        params.insert("timestamp", Self::timestamp());

        let response = self
            .client
            .post(url)
            .form(&self.signed(params))
            .send()
            .await
            .map_err(|e| Error::Delete(format!("destroy request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Delete(api_error_message(status, &body)));
        }

        let parsed: DestroyResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Delete(format!("unexpected destroy response: {}", e)))?;
        match parsed.result.as_str() {
            "ok" => Ok(()),
            "not found" => {
                debug!("Object was already gone");
                Ok(())
            }
            other => Err(Error::Delete(format!("destroy returned '{}'", other))),
        }
    }
}
