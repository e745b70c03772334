//! Image decode, resize and encode helpers.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageFormat as CodecFormat, Rgba, RgbImage, RgbaImage};
use mediaflow_workflow::PluginError;
use mediaflow_workflow::config::{FitMode, ImageFormat};
use std::io::Cursor;

const FILTER: FilterType = FilterType::Lanczos3;

/// Largest output, in pixels, a resize may allocate.
pub const MAX_OUTPUT_PIXELS: u64 = 64 * 1024 * 1024;

fn codec_error(e: impl std::fmt::Display) -> PluginError {
    PluginError::Codec {
        message: e.to_string(),
    }
}

/// A decoded image and the container format it was stored in, if known.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

/// Decodes image bytes, sniffing the container format.
///
/// # Errors
///
/// Returns [`PluginError::Codec`] if the bytes are not a decodable image.
pub fn decode(bytes: &[u8]) -> Result<Decoded, PluginError> {
    let format = image::guess_format(bytes).ok().and_then(|format| match format {
        CodecFormat::Png => Some(ImageFormat::Png),
        CodecFormat::Jpeg => Some(ImageFormat::Jpeg),
        CodecFormat::WebP => Some(ImageFormat::Webp),
        _ => None,
    });
    let image = image::load_from_memory(bytes).map_err(codec_error)?;
    Ok(Decoded { image, format })
}

/// Resolves the requested box against the source size.
///
/// With one side given the other follows the source aspect ratio. With
/// neither, the source size is kept.
fn target_box(source: (u32, u32), width: Option<u32>, height: Option<u32>) -> (u32, u32) {
    let (sw, sh) = (f64::from(source.0.max(1)), f64::from(source.1.max(1)));
    // `as u32` saturates, so extreme aspect ratios land on the pixel limit.
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, ((f64::from(w) * sh / sw).round() as u32).max(1)),
        (None, Some(h)) => (((f64::from(h) * sw / sh).round() as u32).max(1), h),
        (None, None) => source,
    }
}

/// Resizes `image` into the requested box.
///
/// - `contain`: fit inside, centered on a transparent canvas of the box size
/// - `cover`: fill the box, cropping the overflow
/// - `stretch`: exactly the box, ignoring aspect ratio
/// - `scale-down`: fit inside, never enlarging
///
/// When only one side is requested the box already has the source aspect
/// ratio, so every mode except `scale-down` scales to it exactly.
///
/// # Errors
///
/// Returns [`PluginError::Codec`] if the box exceeds [`MAX_OUTPUT_PIXELS`].
pub fn resize(
    image: &DynamicImage,
    width: Option<u32>,
    height: Option<u32>,
    fit: FitMode,
) -> Result<DynamicImage, PluginError> {
    let source = image.dimensions();
    if width.is_none() && height.is_none() {
        return Ok(image.clone());
    }
    let (tw, th) = target_box(source, width, height);
    if u64::from(tw) * u64::from(th) > MAX_OUTPUT_PIXELS {
        return Err(PluginError::Codec {
            message: format!("resize target {tw}x{th} exceeds {MAX_OUTPUT_PIXELS} pixels"),
        });
    }
    let both = width.is_some() && height.is_some();

    Ok(match fit {
        FitMode::Stretch => image.resize_exact(tw, th, FILTER),
        FitMode::Cover if both => image.resize_to_fill(tw, th, FILTER),
        FitMode::Contain if both => {
            let fitted = image.resize(tw, th, FILTER);
            let mut canvas = DynamicImage::ImageRgba8(RgbaImage::from_pixel(tw, th, Rgba([0, 0, 0, 0])));
            let x = (tw - fitted.width()) / 2;
            let y = (th - fitted.height()) / 2;
            imageops::overlay(&mut canvas, &fitted, i64::from(x), i64::from(y));
            canvas
        }
        FitMode::ScaleDown => {
            if source.0 <= tw && source.1 <= th {
                image.clone()
            } else if both {
                image.resize(tw, th, FILTER)
            } else {
                image.resize_exact(tw, th, FILTER)
            }
        }
        FitMode::Cover | FitMode::Contain => image.resize_exact(tw, th, FILTER),
    })
}

/// Composites `image` over an opaque `background`.
#[must_use]
pub fn flatten(image: &DynamicImage, background: [u8; 3]) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let pixel = rgba.get_pixel(x, y);
        let alpha = u16::from(pixel[3]);
        let blend = |c: u8, bg: u8| ((u16::from(c) * alpha + u16::from(bg) * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([
            blend(pixel[0], background[0]),
            blend(pixel[1], background[1]),
            blend(pixel[2], background[2]),
        ])
    })
}

/// Encodes `image` as `format`.
///
/// JPEG has no alpha channel, so the image is flattened onto `background`
/// first. WebP is written lossless and ignores `quality`.
///
/// # Errors
///
/// Returns [`PluginError::Codec`] if encoding fails.
pub fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    quality: u8,
    background: [u8; 3],
) -> Result<Bytes, PluginError> {
    let mut buffer = Vec::new();
    match format {
        ImageFormat::Png => image
            .write_to(&mut Cursor::new(&mut buffer), CodecFormat::Png)
            .map_err(codec_error)?,
        ImageFormat::Jpeg => {
            let flattened = DynamicImage::ImageRgb8(flatten(image, background));
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
            flattened.write_with_encoder(encoder).map_err(codec_error)?;
        }
        ImageFormat::Webp => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_to(&mut Cursor::new(&mut buffer), CodecFormat::WebP)
            .map_err(codec_error)?,
    }
    Ok(Bytes::from(buffer))
}
