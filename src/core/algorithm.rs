use std::io::Cursor;

use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{codecs::jpeg::JpegEncoder, imageops, DynamicImage, ImageReader, Limits, RgbImage};

use super::{
    crop::{self, CropMode},
    error::TransformError,
};

/// Largest width or height accepted on either side of the pipeline.
pub const MAX_IMAGE_DIMENSION: u32 = 16384;

/// Largest output image, in pixels.
pub const MAX_OUTPUT_PIXELS: u64 = 64 * 1024 * 1024;

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, TransformError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(TransformError::Io)?;

    if reader.format().is_none() {
        return Err(TransformError::UnknownFormat);
    }

    // small compressed files can still expand to huge buffers
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    reader.limits(limits);

    Ok(reader.decode()?)
}

/// Scales an RGB8 `src_image` to exactly `target`. The source region is chosen by `crop`
/// when the aspect ratios differ, and is the whole image otherwise.
pub fn resize(
    src_image: &DynamicImage,
    target: (u32, u32),
    crop: Option<CropMode>,
) -> Result<DynamicImage, TransformError> {
    let (target_width, target_height) = target;

    let window = crop::select_window(src_image, target, crop);

    let mut dst_image = Image::new(target_width, target_height, PixelType::U8x3);

    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3))
        .crop(window.left, window.top, window.width, window.height);

    let mut resizer = Resizer::new();
    resizer.resize(src_image, &mut dst_image, &options)?;

    RgbImage::from_raw(target_width, target_height, dst_image.into_vec())
        .map(DynamicImage::ImageRgb8)
        .ok_or(TransformError::Buffer)
}

pub fn blur(src: DynamicImage, sigma: f32) -> DynamicImage {
    let rgb = src.into_rgb8();
    DynamicImage::ImageRgb8(imageops::fast_blur(&rgb, sigma))
}

pub fn encode_jpeg(src: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    let mut writer = Cursor::new(Vec::new());
    src.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        .map_err(TransformError::Encode)?;
    Ok(writer.into_inner())
}
