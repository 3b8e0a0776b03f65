//! Raster image strategy built on the `image` crate.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::CategoryConverter;
use super::types::ConversionRequest;
use crate::format::FormatCategory;

/// Decodes and re-encodes raster images.
pub struct PhotoConverter {
    config: Arc<ConverterConfig>,
}

impl PhotoConverter {
    /// Creates a new photo converter with the given configuration.
    pub fn new(config: Arc<ConverterConfig>) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(ConverterConfig::default()))
    }

    fn target_image_format(target_format: &str) -> Option<ImageFormat> {
        match target_format {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Converts the pixel layout to one the target encoder accepts.
    fn normalize_color(img: DynamicImage, format: ImageFormat) -> DynamicImage {
        let has_alpha = img.color().has_alpha();
        match format {
            // Baseline JPEG has no alpha channel.
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
            ImageFormat::WebP | ImageFormat::Gif | ImageFormat::Bmp => {
                if has_alpha {
                    DynamicImage::ImageRgba8(img.to_rgba8())
                } else {
                    DynamicImage::ImageRgb8(img.to_rgb8())
                }
            }
            ImageFormat::Tiff | ImageFormat::Png => match img {
                DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                    if has_alpha {
                        DynamicImage::ImageRgba16(img.to_rgba16())
                    } else {
                        DynamicImage::ImageRgb16(img.to_rgb16())
                    }
                }
                other => other,
            },
            _ => img,
        }
    }

    fn decode(path: &Path) -> Result<DynamicImage, ConverterError> {
        let reader = ImageReader::open(path)?
            .with_guessed_format()
            .map_err(ConverterError::Io)?;
        reader.decode().map_err(|e| match e {
            ImageError::IoError(io) => ConverterError::Io(io),
            other => ConverterError::decode(path, other),
        })
    }

    fn encode(
        img: &DynamicImage,
        output_path: &Path,
        format: ImageFormat,
        target_format: &str,
        jpeg_quality: u8,
    ) -> Result<(), ConverterError> {
        let file = File::create(output_path)?;
        let mut writer = BufWriter::new(file);

        let result = match format {
            ImageFormat::Jpeg => {
                img.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, jpeg_quality))
            }
            ImageFormat::Png => img.write_with_encoder(PngEncoder::new_with_quality(
                &mut writer,
                CompressionType::Best,
                FilterType::Adaptive,
            )),
            ImageFormat::WebP => img.write_with_encoder(WebPEncoder::new_lossless(&mut writer)),
            other => img.write_to(&mut writer, other),
        };

        result.map_err(|e| match e {
            ImageError::IoError(io) => ConverterError::Io(io),
            other => ConverterError::encode(target_format, other),
        })?;
        writer.flush()?;
        Ok(())
    }

    fn convert_blocking(
        input_path: &Path,
        output_path: &Path,
        target_format: &str,
        jpeg_quality: u8,
    ) -> Result<(), ConverterError> {
        let format = Self::target_image_format(target_format).ok_or_else(|| {
            ConverterError::unsupported_conversion(
                crate::format::current_format(input_path),
                target_format,
            )
        })?;

        let img = Self::decode(input_path)?;
        debug!(
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Decoded image"
        );

        let img = Self::normalize_color(img, format);
        Self::encode(&img, output_path, format, target_format, jpeg_quality)
    }
}

#[async_trait]
impl CategoryConverter for PhotoConverter {
    fn name(&self) -> &str {
        "image"
    }

    fn category(&self) -> FormatCategory {
        FormatCategory::Photos
    }

    async fn convert(&self, request: ConversionRequest) -> Result<(), ConverterError> {
        let quality = self.config.jpeg_quality;
        let ConversionRequest {
            input_path,
            output_path,
            target_format,
            ..
        } = request;

        let output = output_path.clone();
        tokio::task::spawn_blocking(move || {
            Self::convert_blocking(&input_path, &output_path, &target_format, quality)
        })
        .await??;

        info!(output = %output.display(), "Image conversion finished");
        Ok(())
    }
}
