//! Publishing a selected banner to the remote profile
//!
//! The rotation engine only depends on the [`Publisher`] trait: given a
//! banner and the desired geometry, do the work and either succeed or return
//! a [`PublishError`] whose message ends up in the cycle report. Each step
//! that completes appends its own line to the report.
//!
//! # Modules
//!
//! - [`processing`] - Resize and center-crop to the banner geometry
//! - [`bluesky`] - AT Protocol client (session, blob upload, profile upsert)

pub mod bluesky;
pub mod processing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scheduler::report::CycleReport;

pub use bluesky::BlueskyPublisher;
pub use processing::{BannerFormat, BannerProcessor, ProcessedBanner};

/// Banner width expected by the profile
pub const BANNER_WIDTH: u32 = 1500;

/// Banner height expected by the profile
pub const BANNER_HEIGHT: u32 = 500;

/// Result type for publisher operations
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors that can occur while processing or publishing a banner
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Login was rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// File extension is not a supported image format
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// Source image could not be opened
    #[error("Failed to read image {}: {reason}", path.display())]
    ImageRead { path: PathBuf, reason: String },

    /// Decoding, resizing or encoding failed
    #[error("Image processing failed: {0}")]
    Processing(String),

    /// Blob upload was rejected
    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    /// Profile record could not be read or written
    #[error("Profile update rejected: {0}")]
    ProfileUpdateRejected(String),

    /// Remote answered with something we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Publisher misconfigured
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<image::ImageError> for PublishError {
    fn from(err: image::ImageError) -> Self {
        Self::Processing(err.to_string())
    }
}

impl PublishError {
    /// Check if the error is recoverable (worth trying again next cycle)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::UploadRejected(_) | Self::ProfileUpdateRejected(_)
        )
    }
}

/// How the source image is fitted to the target geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// Scale to cover the target, then crop the overflow around the center
    #[default]
    Cover,
    /// Scale each axis independently, ignoring the aspect ratio
    Stretch,
}

/// What to publish and at which geometry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Banner identity (path of the source image)
    pub identity: String,
    pub width: u32,
    pub height: u32,
    pub fit: FitPolicy,
}

impl PublishRequest {
    /// Standard profile banner request: 1500x500, center-cropped cover
    pub fn banner(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            width: BANNER_WIDTH,
            height: BANNER_HEIGHT,
            fit: FitPolicy::Cover,
        }
    }

    /// Source image path
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.identity)
    }
}

/// What a successful publish produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Content reference of the uploaded blob
    pub blob_ref: String,
    pub mime_type: String,
    /// Encoded size in bytes
    pub size: usize,
}

/// Publishes a banner to a remote profile
///
/// Implementations append one report line per completed step and return an
/// error for the step that failed; the caller adds the error line.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Get the publisher name
    fn name(&self) -> &str;

    /// Process and publish one banner
    async fn publish(
        &self,
        request: &PublishRequest,
        report: &mut CycleReport,
    ) -> PublishResult<PublishReceipt>;
}
