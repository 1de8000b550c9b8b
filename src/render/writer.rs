use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;

use crate::foundation::core::UdimTile;
use crate::foundation::error::{BakeError, BakeResult};
use crate::scene::{ColorMode, FileFormat, Image, ImageOutputSettings, ImageTile};

/// Literal token replaced by the tile number when writing tiled images.
pub const UDIM_TOKEN: &str = "<UDIM>";

/// Opaque "write this image to disk" capability.
pub trait ImageWriter {
    fn write(
        &mut self,
        image: &Image,
        path: &Path,
        output: &ImageOutputSettings,
    ) -> BakeResult<()>;
}

/// Writer backed by the `image` crate.
///
/// Float formats (EXR, HDR) keep 32-bit floats; PNG and TIFF honour a 16-bit
/// depth; everything else is quantized to 8 bits. A path carrying
/// [`UDIM_TOKEN`] is expanded once per tile.
#[derive(Debug, Default)]
pub struct FileImageWriter;

impl ImageWriter for FileImageWriter {
    fn write(
        &mut self,
        image: &Image,
        path: &Path,
        output: &ImageOutputSettings,
    ) -> BakeResult<()> {
        let raw = path.to_string_lossy();
        if raw.contains(UDIM_TOKEN) {
            for (tile, data) in &image.tiles {
                let tile_path = expand_udim(path, *tile);
                if !data.is_initialized() {
                    tracing::warn!(path = %tile_path.display(), "skipping uninitialized tile");
                    continue;
                }
                write_tile(data, &tile_path, output)?;
            }
            return Ok(());
        }
        let tile = image
            .tiles
            .get(&UdimTile::FIRST)
            .or_else(|| image.tiles.values().next())
            .ok_or_else(|| BakeError::io(format!("image '{}' has no pixels", image.name)))?;
        write_tile(tile, path, output)
    }
}

/// Replace the UDIM token in `path` with a concrete tile number.
pub fn expand_udim(path: &Path, tile: UdimTile) -> PathBuf {
    PathBuf::from(
        path.to_string_lossy()
            .replace(UDIM_TOKEN, &tile.number().to_string()),
    )
}

fn write_tile(tile: &ImageTile, path: &Path, output: &ImageOutputSettings) -> BakeResult<()> {
    let format = output.file_format;
    let target = codec_format(format)
        .ok_or_else(|| BakeError::io(format!("no encoder for {format:?}")))?;
    let buffer =
        image::Rgba32FImage::from_raw(tile.size.width, tile.size.height, tile.pixels.clone())
            .ok_or_else(|| BakeError::io("pixel buffer does not match tile size"))?;
    let src = DynamicImage::ImageRgba32F(buffer);

    let mut mode = format.resolve_mode(output.color_mode);
    if format == FileFormat::Webp && mode == ColorMode::Bw {
        mode = ColorMode::Rgb;
    }
    let depth = format.resolve_depth(output.color_depth);

    let out = match (format.is_float(), depth, mode) {
        (true, _, ColorMode::Rgba) if format != FileFormat::Hdr => {
            DynamicImage::ImageRgba32F(src.to_rgba32f())
        }
        (true, ..) => DynamicImage::ImageRgb32F(src.to_rgb32f()),
        (false, 16, ColorMode::Rgba) => DynamicImage::ImageRgba16(src.to_rgba16()),
        (false, 16, ColorMode::Rgb) => DynamicImage::ImageRgb16(src.to_rgb16()),
        (false, 16, ColorMode::Bw) => DynamicImage::ImageLuma16(src.to_luma16()),
        (false, _, ColorMode::Rgba) => DynamicImage::ImageRgba8(src.to_rgba8()),
        (false, _, ColorMode::Rgb) => DynamicImage::ImageRgb8(src.to_rgb8()),
        (false, _, ColorMode::Bw) => DynamicImage::ImageLuma8(src.to_luma8()),
    };

    if target == image::ImageFormat::Jpeg {
        let file =
            File::create(path).with_context(|| format!("create {}", path.display()))?;
        let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), output.quality.max(1));
        out.write_with_encoder(encoder)
            .with_context(|| format!("encode {}", path.display()))?;
    } else {
        out.save_with_format(path, target)
            .with_context(|| format!("encode {}", path.display()))?;
    }
    tracing::debug!(path = %path.display(), ?format, depth, "wrote image");
    Ok(())
}

fn codec_format(format: FileFormat) -> Option<image::ImageFormat> {
    match format {
        FileFormat::Png => Some(image::ImageFormat::Png),
        FileFormat::Jpeg => Some(image::ImageFormat::Jpeg),
        FileFormat::Bmp => Some(image::ImageFormat::Bmp),
        FileFormat::Targa | FileFormat::TargaRaw => Some(image::ImageFormat::Tga),
        FileFormat::Tiff => Some(image::ImageFormat::Tiff),
        FileFormat::Webp => Some(image::ImageFormat::WebP),
        FileFormat::OpenExr | FileFormat::OpenExrMultilayer => Some(image::ImageFormat::OpenExr),
        FileFormat::Hdr => Some(image::ImageFormat::Hdr),
        FileFormat::Iris | FileFormat::Jpeg2000 | FileFormat::Cineon | FileFormat::Dpx => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/writer.rs"]
mod tests;
