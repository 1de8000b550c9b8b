//! Numeric post-processing over flat RGBA f32 buffers.

pub mod compose;
pub mod id_attribute;
pub mod id_colors;
pub mod pack;
pub mod pbr;

pub use compose::compose_custom;
pub use id_attribute::{build_id_attribute, face_islands};
pub use id_colors::{IdColorParams, generate_distinct_colors};
pub use pack::{PackReport, pack_channels};
pub use pbr::pbr_convert;
