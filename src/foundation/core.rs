use std::fmt;

use crate::foundation::error::{BakeError, BakeResult};

pub use kurbo::Vec2;

/// Straight-alpha RGBA colour, components nominally in `[0, 1]`.
pub type Rgba = [f32; 4];

/// One cell of the 10x10 UDIM grid: `1001 + u + 10 * v`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct UdimTile(pub u32);

impl UdimTile {
    pub const FIRST: UdimTile = UdimTile(1001);
    pub const LAST: UdimTile = UdimTile(1100);
    pub const GRID: u32 = 10;

    pub fn new(number: u32) -> BakeResult<Self> {
        let tile = Self(number);
        if !tile.is_valid() {
            return Err(BakeError::validation(format!(
                "UDIM tile {number} outside 1001..=1100"
            )));
        }
        Ok(tile)
    }

    pub fn from_uv(u: u32, v: u32) -> BakeResult<Self> {
        if u >= Self::GRID || v >= Self::GRID {
            return Err(BakeError::validation(format!(
                "UDIM grid cell ({u}, {v}) outside 10x10"
            )));
        }
        Ok(Self(1001 + u + v * Self::GRID))
    }

    /// Tile for floored UV coordinates, `None` when outside the grid.
    pub fn from_floored(u: i64, v: i64) -> Option<Self> {
        let grid = i64::from(Self::GRID);
        if !(0..grid).contains(&u) || !(0..grid).contains(&v) {
            return None;
        }
        Some(Self(1001 + u as u32 + v as u32 * Self::GRID))
    }

    pub fn number(self) -> u32 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        (Self::FIRST.0..=Self::LAST.0).contains(&self.0)
    }

    pub fn u(self) -> u32 {
        self.0.saturating_sub(1001) % Self::GRID
    }

    pub fn v(self) -> u32 {
        self.0.saturating_sub(1001) / Self::GRID
    }

    /// Integer UV translation that moves geometry from `self` onto `target`.
    pub fn offset_to(self, target: UdimTile) -> Vec2 {
        Vec2::new(
            f64::from(target.u()) - f64::from(self.u()),
            f64::from(target.v()) - f64::from(self.v()),
        )
    }

    pub fn next(self) -> Option<Self> {
        let next = Self(self.0 + 1);
        next.is_valid().then_some(next)
    }
}

impl Default for UdimTile {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for UdimTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> BakeResult<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .ok_or_else(|| BakeError::validation("image dimensions overflow"))
    }

    /// Length of a tightly packed RGBA f32 buffer at this resolution.
    pub fn rgba_len(self) -> BakeResult<usize> {
        self.pixel_count()?
            .checked_mul(4)
            .ok_or_else(|| BakeError::validation("image buffer size overflow"))
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1024, 1024)
    }
}

/// Colour-space tag carried by images.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum ColorSpace {
    #[default]
    #[serde(rename = "sRGB", alias = "SRGB")]
    Srgb,
    #[serde(rename = "Non-Color", alias = "NONCOL")]
    NonColor,
    #[serde(rename = "Linear", alias = "LINEAR")]
    Linear,
}

impl ColorSpace {
    pub fn is_data(self) -> bool {
        !matches!(self, Self::Srgb)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Srgb => "sRGB",
            Self::NonColor => "Non-Color",
            Self::Linear => "Linear",
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
