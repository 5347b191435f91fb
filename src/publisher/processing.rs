//! Banner image processing
//!
//! Decodes the source image, fits it to the banner geometry and re-encodes
//! it in the format it came in. The default fit scales the image until it
//! covers the target and crops the overflow around the center.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

use super::{FitPolicy, PublishError, PublishRequest, PublishResult};

/// Default JPEG re-encode quality
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Encodings a banner can be published in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerFormat {
    Png,
    Jpeg,
}

impl BannerFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> PublishResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            _ => Err(PublishError::UnsupportedFormat(format!(".{ext}"))),
        }
    }

    /// MIME type sent with the upload
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Encoded banner ready for upload
#[derive(Debug, Clone)]
pub struct ProcessedBanner {
    pub bytes: Vec<u8>,
    pub format: BannerFormat,
    pub width: u32,
    pub height: u32,
}

impl ProcessedBanner {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Resizes and re-encodes banner images
#[derive(Debug, Clone)]
pub struct BannerProcessor {
    jpeg_quality: u8,
}

impl Default for BannerProcessor {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl BannerProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the banner from disk and fit it to the request geometry
    pub fn process(&self, request: &PublishRequest) -> PublishResult<ProcessedBanner> {
        let path = request.path();
        let format = BannerFormat::from_path(&path)?;

        let image = ImageReader::open(&path)
            .map_err(|e| PublishError::ImageRead {
                path: path.clone(),
                reason: e.to_string(),
            })?
            .with_guessed_format()
            .map_err(|e| PublishError::ImageRead {
                path: path.clone(),
                reason: e.to_string(),
            })?
            .decode()?;

        tracing::debug!(
            path = %path.display(),
            source_width = image.width(),
            source_height = image.height(),
            "Decoded banner source"
        );

        self.process_image(image, format, request.width, request.height, request.fit)
    }

    /// Fit an already decoded image and encode it
    pub fn process_image(
        &self,
        image: DynamicImage,
        format: BannerFormat,
        width: u32,
        height: u32,
        fit: FitPolicy,
    ) -> PublishResult<ProcessedBanner> {
        if width == 0 || height == 0 {
            return Err(PublishError::Processing(format!(
                "invalid target size {width}x{height}"
            )));
        }

        let fitted = match fit {
            FitPolicy::Cover => image.resize_to_fill(width, height, FilterType::Lanczos3),
            FitPolicy::Stretch => image.resize_exact(width, height, FilterType::Lanczos3),
        };

        let bytes = self.encode(&fitted, format)?;

        Ok(ProcessedBanner {
            bytes,
            format,
            width: fitted.width(),
            height: fitted.height(),
        })
    }

    fn encode(&self, image: &DynamicImage, format: BannerFormat) -> PublishResult<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        match format {
            BannerFormat::Png => {
                image.write_to(&mut buffer, format.image_format())?;
            }
            BannerFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = image.to_rgb8();
                let encoder = JpegEncoder::new_with_quality(&mut buffer, self.jpeg_quality);
                rgb.write_with_encoder(encoder)?;
            }
        }
        Ok(buffer.into_inner())
    }
}
