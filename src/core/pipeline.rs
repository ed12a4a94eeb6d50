use image::DynamicImage;
use tracing::debug;

use super::{
    algorithm::{self, MAX_IMAGE_DIMENSION, MAX_OUTPUT_PIXELS},
    crop::CropMode,
    error::TransformError,
};

pub const MIN_BLUR_SIGMA: f32 = 0.3;
pub const MAX_BLUR_SIGMA: f32 = 1000.0;
pub const DEFAULT_QUALITY: u8 = 80;

/// Per-request transform knobs as they arrived on the query string.
/// `None` means absent or unparseable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub blur: Option<f32>,
    pub quality: Option<i64>,
    pub crop_mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    /// Exactly this box, trimming overflow according to the crop mode.
    Exact { width: u32, height: u32 },
    /// Aspect-preserving, to this width.
    Width(u32),
    /// Aspect-preserving, to this height.
    Height(u32),
}

impl Resize {
    /// Output size for a source of the given size. Sizes past
    /// `MAX_IMAGE_DIMENSION` per side or `MAX_OUTPUT_PIXELS` overall fail.
    pub fn target(self, src: (u32, u32)) -> Result<(u32, u32), TransformError> {
        let (sw, sh) = (src.0.max(1) as f64, src.1.max(1) as f64);
        let (width, height) = match self {
            Resize::Exact { width, height } => (width as f64, height as f64),
            Resize::Width(width) => (width as f64, (sh * width as f64 / sw).round().max(1.0)),
            Resize::Height(height) => ((sw * height as f64 / sh).round().max(1.0), height as f64),
        };

        let (width, height) = (width as u64, height as u64);
        if width > MAX_IMAGE_DIMENSION as u64
            || height > MAX_IMAGE_DIMENSION as u64
            || width * height > MAX_OUTPUT_PIXELS
        {
            return Err(TransformError::TooLarge(width, height));
        }

        Ok((width as u32, height as u32))
    }
}

/// Fully resolved transform for one request. Stages run in order:
/// resize (with crop), blur, jpeg encode.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformConfig {
    pub resize: Option<Resize>,
    pub blur: Option<f32>,
    pub crop: Option<CropMode>,
    pub quality: u8,
}

impl TransformConfig {
    pub fn from_params(params: &TransformParams) -> TransformConfig {
        let resize = match (params.width, params.height) {
            (Some(width), Some(height)) => Some(Resize::Exact { width, height }),
            (Some(width), None) => Some(Resize::Width(width)),
            (None, Some(height)) => Some(Resize::Height(height)),
            (None, None) => None,
        };

        let blur = params
            .blur
            .map(|sigma| sigma.clamp(MIN_BLUR_SIGMA, MAX_BLUR_SIGMA));

        let crop = params.crop_mode.as_deref().and_then(CropMode::from_keyword);

        let quality = params
            .quality
            .map(|q| q.clamp(1, 100) as u8)
            .unwrap_or(DEFAULT_QUALITY);

        TransformConfig {
            resize,
            blur,
            crop,
            quality,
        }
    }

    /// Decodes `input`, applies every configured stage and returns jpeg bytes.
    pub fn apply(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let decoded = algorithm::decode(input)?;
        debug!(
            "decoded {}x{} source, applying {:?}",
            decoded.width(),
            decoded.height(),
            self
        );

        let mut img = DynamicImage::ImageRgb8(decoded.into_rgb8());

        if let Some(resize) = self.resize {
            let target = resize.target((img.width(), img.height()))?;
            img = algorithm::resize(&img, target, self.crop)?;
        }

        if let Some(sigma) = self.blur {
            img = algorithm::blur(img, sigma);
        }

        algorithm::encode_jpeg(&img, self.quality)
    }
}
