//! Bluesky (AT Protocol) banner publisher
//!
//! Every publish opens a fresh session, uploads the processed banner as a
//! blob and upserts the `app.bsky.actor.profile` record so that only its
//! `banner` field changes.
//!
//! # XRPC calls
//!
//! | Step | Method | NSID |
//! |------|--------|------|
//! | login | POST | `com.atproto.server.createSession` |
//! | upload | POST | `com.atproto.repo.uploadBlob` |
//! | read profile | GET | `com.atproto.repo.getRecord` |
//! | write profile | POST | `com.atproto.repo.putRecord` |
//!
//! # Example
//!
//! ```rust,ignore
//! use skybanner::publisher::bluesky::{BlueskyConfig, BlueskyPublisher};
//!
//! let config = BlueskyConfig::new("alice.bsky.social", "app-password")
//!     .with_service("https://bsky.social")
//!     .with_timeout(15);
//!
//! let publisher = BlueskyPublisher::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use url::Url;

use super::processing::{BannerProcessor, ProcessedBanner};
use super::{PublishError, PublishReceipt, PublishRequest, PublishResult, Publisher};
use crate::scheduler::report::CycleReport;

/// Default PDS entryway
pub const DEFAULT_SERVICE: &str = "https://bsky.social";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const PROFILE_COLLECTION: &str = "app.bsky.actor.profile";
const PROFILE_RKEY: &str = "self";

// ============================================================================
// Configuration
// ============================================================================

/// Bluesky account configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    /// PDS base URL
    #[serde(default = "default_service")]
    pub service: String,
    /// Handle or DID used to log in
    #[serde(default)]
    pub identifier: String,
    /// App password (never logged)
    #[serde(default)]
    pub app_password: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            identifier: String::new(),
            app_password: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl fmt::Debug for BlueskyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlueskyConfig")
            .field("service", &self.service)
            .field("identifier", &self.identifier)
            .field(
                "app_password",
                &if self.app_password.is_empty() {
                    ""
                } else {
                    "<redacted>"
                },
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl BlueskyConfig {
    /// Create a configuration for the default service
    pub fn new(identifier: impl Into<String>, app_password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            app_password: app_password.into(),
            ..Self::default()
        }
    }

    /// Set the PDS base URL
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validate the service settings
    pub fn validate(&self) -> Result<(), String> {
        if self.service.is_empty() {
            return Err("Bluesky service URL cannot be empty".to_string());
        }

        if !self.service.starts_with("http://") && !self.service.starts_with("https://") {
            return Err("Bluesky service URL must start with http:// or https://".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Validate that login credentials are present
    pub fn validate_credentials(&self) -> Result<(), String> {
        if self.identifier.trim().is_empty() {
            return Err("BLUESKY_IDENTIFIER is not set".to_string());
        }
        if self.app_password.is_empty() {
            return Err("BLUESKY_APP_PASSWORD is not set".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Authenticated session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_jwt: String,
    pub did: String,
    #[serde(default)]
    pub handle: Option<String>,
}

/// Current profile record, if the account has one
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub cid: Option<String>,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
struct GetRecordResponse {
    #[serde(default)]
    cid: Option<String>,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct UploadBlobResponse {
    blob: Value,
}

#[derive(Debug, Default, Deserialize)]
struct XrpcError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl XrpcError {
    fn describe(&self, status: StatusCode) -> String {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => format!("{error}: {message} ({status})"),
            (Some(error), None) => format!("{error} ({status})"),
            (None, Some(message)) => format!("{message} ({status})"),
            (None, None) => status.to_string(),
        }
    }
}

/// Read an XRPC error body, tolerating non-JSON payloads
async fn read_error(response: Response) -> (StatusCode, XrpcError) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let error = serde_json::from_str(&body).unwrap_or_else(|_| XrpcError {
        error: None,
        message: (!body.trim().is_empty()).then(|| body.trim().to_string()),
    });
    (status, error)
}

/// Extract `ref.$link` from a blob object
pub fn blob_link(blob: &Value) -> Option<&str> {
    blob.get("ref")?.get("$link")?.as_str()
}

/// Profile record with the banner replaced and every other field kept
pub fn merge_banner(existing: Option<&Value>, blob: Value) -> Value {
    let mut record = match existing {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        _ => json!({}),
    };

    if let Value::Object(map) = &mut record {
        map.entry("$type")
            .or_insert_with(|| Value::String(PROFILE_COLLECTION.to_string()));
        map.insert("banner".to_string(), blob);
    }
    record
}

// ============================================================================
// Publisher
// ============================================================================

/// Publishes banners to a Bluesky profile
pub struct BlueskyPublisher {
    config: BlueskyConfig,
    client: Client,
    base: Url,
    processor: BannerProcessor,
}

impl BlueskyPublisher {
    /// Create a new publisher
    pub fn new(config: BlueskyConfig) -> PublishResult<Self> {
        config.validate().map_err(PublishError::InvalidConfig)?;
        config
            .validate_credentials()
            .map_err(PublishError::InvalidConfig)?;

        // Keep any path prefix of the service when joining NSIDs
        let mut service = config.service.trim_end_matches('/').to_string();
        service.push('/');
        let base = Url::parse(&service)
            .map_err(|e| PublishError::InvalidConfig(format!("Invalid service URL: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("skybanner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                PublishError::InvalidConfig(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            client,
            base,
            processor: BannerProcessor::new(),
        })
    }

    fn endpoint(&self, nsid: &str) -> PublishResult<Url> {
        self.base
            .join(&format!("xrpc/{nsid}"))
            .map_err(|e| PublishError::InvalidConfig(format!("Invalid endpoint {nsid}: {e}")))
    }

    /// Open a session with the configured credentials
    pub async fn login(&self) -> PublishResult<Session> {
        let url = self.endpoint("com.atproto.server.createSession")?;
        let response = self
            .client
            .post(url)
            .json(&json!({
                "identifier": self.config.identifier,
                "password": self.config.app_password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, error) = read_error(response).await;
            return Err(PublishError::Authentication(error.describe(status)));
        }

        let session: Session = response
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(format!("createSession: {e}")))?;

        tracing::debug!(did = %session.did, "Session created");
        Ok(session)
    }

    /// Upload an encoded banner, returning the blob object
    pub async fn upload_blob(
        &self,
        session: &Session,
        banner: &ProcessedBanner,
    ) -> PublishResult<Value> {
        let url = self.endpoint("com.atproto.repo.uploadBlob")?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&session.access_jwt)
            .header(header::CONTENT_TYPE, banner.mime_type())
            .body(banner.bytes.clone())
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, error) = read_error(response).await;
            return Err(PublishError::UploadRejected(error.describe(status)));
        }

        let uploaded: UploadBlobResponse = response
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(format!("uploadBlob: {e}")))?;

        Ok(uploaded.blob)
    }

    /// Fetch the current profile record
    ///
    /// Returns `None` when the account has never written a profile.
    pub async fn get_profile(&self, session: &Session) -> PublishResult<Option<ProfileRecord>> {
        let mut url = self.endpoint("com.atproto.repo.getRecord")?;
        url.query_pairs_mut()
            .append_pair("repo", &session.did)
            .append_pair("collection", PROFILE_COLLECTION)
            .append_pair("rkey", PROFILE_RKEY);

        let response = self
            .client
            .get(url)
            .bearer_auth(&session.access_jwt)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, error) = read_error(response).await;
            if status == StatusCode::BAD_REQUEST
                && error.error.as_deref() == Some("RecordNotFound")
            {
                return Ok(None);
            }
            return Err(PublishError::ProfileUpdateRejected(error.describe(status)));
        }

        let record: GetRecordResponse = response
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(format!("getRecord: {e}")))?;

        Ok(Some(ProfileRecord {
            cid: record.cid,
            value: record.value,
        }))
    }

    /// Write the profile record with the new banner
    pub async fn put_profile(
        &self,
        session: &Session,
        existing: Option<&ProfileRecord>,
        blob: Value,
    ) -> PublishResult<()> {
        let url = self.endpoint("com.atproto.repo.putRecord")?;
        let record = merge_banner(existing.map(|p| &p.value), blob);

        let mut body = json!({
            "repo": session.did,
            "collection": PROFILE_COLLECTION,
            "rkey": PROFILE_RKEY,
            "record": record,
        });
        if let Some(cid) = existing.and_then(|p| p.cid.as_ref()) {
            body["swapRecord"] = Value::String(cid.clone());
        }

        let response = self
            .client
            .post(url)
            .bearer_auth(&session.access_jwt)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, error) = read_error(response).await;
            return Err(PublishError::ProfileUpdateRejected(error.describe(status)));
        }

        Ok(())
    }

    async fn process(&self, request: &PublishRequest) -> PublishResult<ProcessedBanner> {
        let processor = self.processor.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || processor.process(&request))
            .await
            .map_err(|e| PublishError::Processing(format!("Processing task failed: {e}")))?
    }
}

#[async_trait]
impl Publisher for BlueskyPublisher {
    fn name(&self) -> &str {
        "bluesky"
    }

    async fn publish(
        &self,
        request: &PublishRequest,
        report: &mut CycleReport,
    ) -> PublishResult<PublishReceipt> {
        let session = self.login().await?;
        report.success("Authenticated successfully");

        let banner = self.process(request).await?;
        report.success(format!(
            "Image processed successfully ({}x{} {})",
            banner.width,
            banner.height,
            banner.mime_type()
        ));

        let blob = self.upload_blob(&session, &banner).await?;
        let blob_ref = blob_link(&blob)
            .ok_or_else(|| PublishError::InvalidResponse("uploadBlob: blob has no ref".into()))?
            .to_string();
        report.success(format!(
            "Banner uploaded successfully with blob reference: {blob_ref}"
        ));

        let existing = self.get_profile(&session).await?;
        self.put_profile(&session, existing.as_ref(), blob).await?;
        report.success("Profile banner updated successfully");

        tracing::info!(
            identity = %request.identity,
            blob_ref = %blob_ref,
            size = banner.size(),
            "Banner published"
        );

        Ok(PublishReceipt {
            blob_ref,
            mime_type: banner.mime_type().to_string(),
            size: banner.size(),
        })
    }
}
