//! Common test utilities

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;
use std::sync::Mutex;

use skybanner::catalog::{BannerEntry, Catalog};
use skybanner::publisher::{PublishError, PublishReceipt, PublishRequest, PublishResult, Publisher};
use skybanner::scheduler::CycleReport;

/// Build a catalog from `(identity, last_used_at)` pairs
#[allow(dead_code)]
pub fn catalog_of(entries: &[(&str, i64)]) -> Catalog {
    Catalog::from_entries(
        entries
            .iter()
            .map(|(id, ts)| BannerEntry::with_last_used(*id, *ts))
            .collect(),
    )
    .unwrap()
}

/// Write a small solid-color image; the format follows the extension
#[allow(dead_code)]
pub fn write_image(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_pixel(width, height, Rgb([40, 120, 200]));
    DynamicImage::ImageRgb8(img).save(path).unwrap();
}

/// Create `names` as files in `dir`; image extensions get real image data
#[allow(dead_code)]
pub fn populate_dir(dir: &Path, names: &[&str]) {
    for name in names {
        let path = dir.join(name);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") | Some("jpg") | Some("jpeg") => write_image(&path, 60, 40),
            _ => std::fs::write(&path, b"not an image").unwrap(),
        }
    }
}

/// Publisher double that records what it was asked to publish
#[allow(dead_code)]
pub struct RecordingPublisher {
    fail_with: Option<String>,
    published: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn succeeding() -> Self {
        Self {
            fail_with: None,
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(
        &self,
        request: &PublishRequest,
        report: &mut CycleReport,
    ) -> PublishResult<PublishReceipt> {
        self.published.lock().unwrap().push(request.identity.clone());

        if let Some(reason) = &self.fail_with {
            return Err(PublishError::UploadRejected(reason.clone()));
        }

        report.success("Authenticated successfully");
        report.success("Profile banner updated successfully");
        Ok(PublishReceipt {
            blob_ref: "bafkreitest".to_string(),
            mime_type: "image/png".to_string(),
            size: 0,
        })
    }
}
