use crate::foundation::core::Rgba;
use crate::foundation::math::{Rng64, hsv_to_rgb, rgb_to_hsv};

const GOLDEN_RATIO: f64 = 0.618_033_988_749_895;

/// Seeding of an ID palette.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IdColorParams {
    pub start_color: Rgba,
    /// Start from `start_color`'s hue and keep it exact at index 0.
    pub manual_start: bool,
    pub seed: u64,
}

impl Default for IdColorParams {
    fn default() -> Self {
        Self {
            start_color: [1.0, 0.0, 0.0, 1.0],
            manual_start: false,
            seed: 0,
        }
    }
}

/// Deterministic palette of `count` visually distinct opaque colours.
pub fn generate_distinct_colors(count: usize, params: &IdColorParams) -> Vec<Rgba> {
    if count == 0 {
        return Vec::new();
    }

    let [r, g, b, _] = params.start_color;
    let hue_start = if params.manual_start {
        rgb_to_hsv(f64::from(r), f64::from(g), f64::from(b)).0
    } else {
        Rng64::new(params.seed).next_f64_01()
    };

    let mut rng = Rng64::new(params.seed);
    let sats: Vec<f64> = (0..count).map(|_| 0.5 + rng.next_f64_01() * 0.3).collect();
    let vals: Vec<f64> = (0..count).map(|_| 0.8 + rng.next_f64_01() * 0.2).collect();

    let mut colors: Vec<Rgba> = (0..count)
        .map(|i| {
            let hue = (hue_start + i as f64 * GOLDEN_RATIO).rem_euclid(1.0);
            let (r, g, b) = hsv_to_rgb(hue, sats[i], vals[i]);
            [r as f32, g as f32, b as f32, 1.0]
        })
        .collect();

    if params.manual_start {
        colors[0] = params.start_color;
    }
    colors
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/id_colors.rs"]
mod tests;
