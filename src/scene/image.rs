use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::foundation::core::{ColorSpace, Resolution, Rgba, UdimTile};
use crate::foundation::error::{BakeError, BakeResult};

/// Output file formats the host can write.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileFormat {
    Bmp,
    Iris,
    #[default]
    Png,
    Jpeg,
    Jpeg2000,
    Targa,
    TargaRaw,
    Cineon,
    Dpx,
    OpenExrMultilayer,
    OpenExr,
    Hdr,
    Tiff,
    Webp,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorMode {
    Bw,
    Rgb,
    #[default]
    Rgba,
}

impl FileFormat {
    /// Primary file extension, including the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Bmp => ".bmp",
            Self::Iris => ".rgb",
            Self::Png => ".png",
            Self::Jpeg => ".jpg",
            Self::Jpeg2000 => ".jp2",
            Self::Targa | Self::TargaRaw => ".tga",
            Self::Cineon => ".cin",
            Self::Dpx => ".dpx",
            Self::OpenExrMultilayer | Self::OpenExr => ".exr",
            Self::Hdr => ".hdr",
            Self::Tiff => ".tif",
            Self::Webp => ".webp",
        }
    }

    /// Bit depths the format can store.
    pub fn depths(self) -> &'static [u8] {
        match self {
            Self::Bmp | Self::Iris | Self::Jpeg | Self::Targa | Self::TargaRaw | Self::Webp => &[8],
            Self::Png | Self::Tiff => &[8, 16],
            Self::Jpeg2000 => &[8, 12, 16],
            Self::Cineon => &[10],
            Self::Dpx => &[8, 10, 12, 16],
            Self::OpenExrMultilayer | Self::OpenExr => &[16, 32],
            Self::Hdr => &[32],
        }
    }

    pub fn modes(self) -> &'static [ColorMode] {
        match self {
            Self::Bmp | Self::Jpeg | Self::Cineon | Self::Hdr => &[ColorMode::Bw, ColorMode::Rgb],
            Self::OpenExrMultilayer => &[ColorMode::Rgba],
            _ => &[ColorMode::Bw, ColorMode::Rgb, ColorMode::Rgba],
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::OpenExr | Self::OpenExrMultilayer | Self::Hdr)
    }

    /// Clamp a requested depth to one the format supports.
    pub fn resolve_depth(self, requested: u8) -> u8 {
        let depths = self.depths();
        if depths.contains(&requested) {
            requested
        } else {
            depths.first().copied().unwrap_or(8)
        }
    }

    pub fn resolve_mode(self, requested: ColorMode) -> ColorMode {
        let modes = self.modes();
        if modes.contains(&requested) {
            requested
        } else {
            modes.last().copied().unwrap_or(ColorMode::Rgb)
        }
    }
}

/// Where an image's pixels come from.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ImageSource {
    #[default]
    Generated,
    Tiled,
    File,
    /// Numbered image sequence starting at `filepath`.
    Sequence {
        frame_duration: u32,
    },
}

/// One UDIM tile's pixel store. Bare tiles (no pixels) are allowed when
/// the host could not initialize them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageTile {
    pub size: Resolution,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pixels: Vec<f32>,
}

impl ImageTile {
    pub fn new(size: Resolution, fill: Rgba) -> BakeResult<Self> {
        let len = size.rgba_len()?;
        let mut pixels = vec![0.0; len];
        for px in pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&fill);
        }
        Ok(Self { size, pixels })
    }

    pub fn bare(size: Resolution) -> Self {
        Self {
            size,
            pixels: Vec::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.pixels.is_empty()
    }

    pub fn fill(&mut self, color: Rgba) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }
}

/// Raster image datablock: straight-alpha RGBA f32 per tile.
///
/// Non-tiled images keep their single buffer under tile 1001.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Image {
    pub name: String,
    pub tiles: BTreeMap<UdimTile, ImageTile>,
    pub source: ImageSource,
    pub alpha: bool,
    pub float_buffer: bool,
    pub color_space: ColorSpace,
    pub generated_color: Rgba,
    pub filepath: Option<PathBuf>,
    pub file_format: FileFormat,
    pub packed: bool,
    pub fake_user: bool,
}

impl Image {
    pub fn new(name: impl Into<String>, size: Resolution, alpha: bool) -> BakeResult<Self> {
        let mut tiles = BTreeMap::new();
        tiles.insert(UdimTile::FIRST, ImageTile::new(size, [0.0, 0.0, 0.0, 1.0])?);
        Ok(Self {
            name: name.into(),
            tiles,
            source: ImageSource::Generated,
            alpha,
            float_buffer: false,
            color_space: ColorSpace::Srgb,
            generated_color: [0.0, 0.0, 0.0, 1.0],
            filepath: None,
            file_format: FileFormat::Png,
            packed: false,
            fake_user: false,
        })
    }

    pub fn is_tiled(&self) -> bool {
        matches!(self.source, ImageSource::Tiled)
    }

    /// Base size: tile 1001 if present, else the first tile.
    pub fn size(&self) -> Resolution {
        self.tiles
            .get(&UdimTile::FIRST)
            .or_else(|| self.tiles.values().next())
            .map(|t| t.size)
            .unwrap_or_else(|| Resolution::new(0, 0))
    }

    /// Pixels of the base tile.
    pub fn pixels(&self) -> &[f32] {
        self.tiles
            .get(&UdimTile::FIRST)
            .or_else(|| self.tiles.values().next())
            .map(|t| t.pixels.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_pixels(&mut self, pixels: Vec<f32>) -> BakeResult<()> {
        let tile = self
            .tiles
            .values_mut()
            .next()
            .ok_or_else(|| BakeError::validation(format!("image '{}' has no tiles", self.name)))?;
        let expected = tile.size.rgba_len()?;
        if pixels.len() != expected {
            return Err(BakeError::validation(format!(
                "image '{}' expects {expected} floats, got {}",
                self.name,
                pixels.len()
            )));
        }
        tile.pixels = pixels;
        Ok(())
    }

    /// Resize the base tile, refilling it with the generated colour.
    pub fn scale_base(&mut self, size: Resolution) -> BakeResult<()> {
        let fill = self.generated_color;
        let tile = ImageTile::new(size, fill)?;
        match self.tiles.get_mut(&UdimTile::FIRST) {
            Some(t) => *t = tile,
            None => {
                self.tiles.insert(UdimTile::FIRST, tile);
            }
        }
        Ok(())
    }

    /// Fill every initialized tile with `color` and remember it as the generated colour.
    pub fn clear(&mut self, color: Rgba) {
        self.generated_color = color;
        for tile in self.tiles.values_mut() {
            tile.fill(color);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/image.rs"]
mod tests;
