//! UDIM tile detection and placement plus the scoped scratch UV layout.

pub mod layout;
pub mod tiles;

pub use layout::{TEMP_UV_LAYER, UvLayoutGuard};
pub use tiles::{calculate_repack, detect_tile, detect_tiles, tile_resolutions, udim_configuration};
