use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use image::{DynamicImage, ImageFormat, imageops::FilterType};
use tracing::info;

use crate::services::pipeline::{ImageRequest, PipelineError};
use crate::services::scratch::ScratchSpace;

/// Suffix appended to the source file name for the transcoded output
const CONVERTED_SUFFIX: &str = "-converted.webp";

pub struct ImageTranscoder {
    max_width: u32,
}

impl ImageTranscoder {
    pub fn new(max_width: u32) -> Self {
        Self { max_width }
    }

    /// Re-encode the fetched image as WebP, capped at `max_width` with the
    /// aspect ratio preserved. Images already within the cap are not
    /// enlarged. The input file is left untouched.
    pub async fn transcode(
        &self,
        input: &Path,
        request: &ImageRequest,
        scratch: &mut ScratchSpace,
    ) -> Result<PathBuf, PipelineError> {
        let output = scratch.register(&format!("{}{}", request.file_name, CONVERTED_SUFFIX));

        let img = image::open(input).map_err(|e| PipelineError::Transcode(e.to_string()))?;
        let (source_width, source_height) = (img.width(), img.height());

        let resized = if source_width > self.max_width {
            img.resize(self.max_width, u32::MAX, FilterType::Lanczos3)
        } else {
            img
        };

        let encoded = encode_webp(&resized).map_err(|e| PipelineError::Transcode(e.to_string()))?;

        tokio::fs::write(&output, encoded)
            .await
            .map_err(|e| PipelineError::Transcode(e.to_string()))?;

        info!(
            source_width,
            source_height,
            width = resized.width(),
            height = resized.height(),
            path = %output.display(),
            "image transcoded to webp"
        );

        Ok(output)
    }
}

/// Encode an image::DynamicImage to WebP bytes.
fn encode_webp(img: &DynamicImage) -> Result<Vec<u8>> {
    // WebP does not support 16-bit or 32-bit float color spaces. Convert down to 8-bit.
    let img_8bit = match img.color() {
        image::ColorType::Rgba16 | image::ColorType::La16 | image::ColorType::Rgba32F => {
            DynamicImage::ImageRgba8(img.to_rgba8())
        }
        image::ColorType::Rgb16 | image::ColorType::L16 | image::ColorType::Rgb32F => {
            DynamicImage::ImageRgb8(img.to_rgb8())
        }
        _ => img.clone(),
    };

    let mut out_data = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut out_data);
    img_8bit
        .write_to(&mut cursor, ImageFormat::WebP)
        .map_err(|e| anyhow!("webp encoding failed: {}", e))?;
    Ok(out_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    #[test]
    fn encoded_output_is_webp() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])));
        let bytes = encode_webp(&img).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn deep_color_is_converted_before_encoding() {
        let img = DynamicImage::ImageRgb16(
            ImageBuffer::<Rgb<u16>, Vec<u16>>::from_pixel(8, 8, Rgb([1000, 2000, 3000])),
        );
        let bytes = encode_webp(&img).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::WebP);
    }
}
