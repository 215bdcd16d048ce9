//! Raster re-encoding for GIF, JPEG and PNG
//!
//! Each function decodes the input and encodes it again with the configured
//! settings. Callers decide whether the result is worth keeping.

use image::codecs::gif::GifDecoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{AnimationDecoder, Delay, DynamicImage, ImageDecoder, ImageEncoder, ImageFormat};
use jpeg_encoder::{ColorType as JpegColor, Encoder as JpegEncoder};
use std::io::Cursor;

/// NeuQuant sampling speed used when a GIF frame needs a reduced palette.
const GIF_QUANTIZE_SPEED: i32 = 10;

/// Map an optimization level (0-7) to the PNG encoder's settings.
pub fn png_settings(level: u8) -> (CompressionType, FilterType) {
    match level {
        0 => (CompressionType::Fast, FilterType::NoFilter),
        1..=3 => (CompressionType::Default, FilterType::Adaptive),
        _ => (CompressionType::Best, FilterType::Adaptive),
    }
}

/// GIF and JPEG store dimensions as 16-bit values.
fn dimension(value: u32) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("dimension {} exceeds 65535", value))
}

/// Convert a frame delay to GIF hundredths of a second.
fn gif_delay(delay: Delay) -> u16 {
    let (numer, denom) = delay.numer_denom_ms();
    let centis = u64::from(numer) / (u64::from(denom) * 10).max(1);
    u16::try_from(centis).unwrap_or(u16::MAX)
}

/// Losslessly re-encode a PNG.
pub fn recompress_png(bytes: &[u8], level: u8) -> Result<Vec<u8>, String> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    let (compression, filter) = png_settings(level);

    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, compression, filter)
        .write_image(image.as_bytes(), image.width(), image.height(), image.color())
        .map_err(|e| e.to_string())?;
    Ok(out)
}

/// Re-encode a JPEG at the given quality (1-100), optionally as progressive.
///
/// Grayscale input stays grayscale; everything else is written as RGB.
pub fn recompress_jpeg(bytes: &[u8], quality: u8, progressive: bool) -> Result<Vec<u8>, String> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| e.to_string())?;

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new(&mut out, quality.clamp(1, 100));
    encoder.set_progressive(progressive);
    match image {
        DynamicImage::ImageLuma8(gray) => encoder.encode(
            gray.as_raw(),
            dimension(gray.width())?,
            dimension(gray.height())?,
            JpegColor::Luma,
        ),
        other => {
            let rgb = other.to_rgb8();
            encoder.encode(
                rgb.as_raw(),
                dimension(rgb.width())?,
                dimension(rgb.height())?,
                JpegColor::Rgb,
            )
        }
    }
    .map_err(|e| e.to_string())?;
    Ok(out)
}

/// Decode every frame of a GIF and encode them again.
///
/// Animations (more than one frame) are written to loop forever. Frames keep
/// their delay and are written interlaced when asked.
pub fn recompress_gif(bytes: &[u8], interlaced: bool) -> Result<Vec<u8>, String> {
    let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let (width, height) = decoder.dimensions();
    let frames = decoder.into_frames().collect_frames().map_err(|e| e.to_string())?;
    if frames.is_empty() {
        return Err("GIF has no frames".to_string());
    }
    let animated = frames.len() > 1;

    let mut out = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut out, dimension(width)?, dimension(height)?, &[])
            .map_err(|e| e.to_string())?;
        if animated {
            encoder.set_repeat(gif::Repeat::Infinite).map_err(|e| e.to_string())?;
        }

        for frame in frames {
            let delay = gif_delay(frame.delay());
            let (left, top) = (dimension(frame.left())?, dimension(frame.top())?);
            let buffer = frame.into_buffer();
            let (frame_width, frame_height) = (dimension(buffer.width())?, dimension(buffer.height())?);
            let mut pixels = buffer.into_raw();

            let mut gif_frame =
                gif::Frame::from_rgba_speed(frame_width, frame_height, &mut pixels, GIF_QUANTIZE_SPEED);
            gif_frame.delay = delay;
            gif_frame.left = left;
            gif_frame.top = top;
            gif_frame.interlaced = interlaced;
            encoder.write_frame(&gif_frame).map_err(|e| e.to_string())?;
        }
    }
    Ok(out)
}
