//! Per-step bake orchestration: scoped scene overrides, channel execution,
//! saving, packing, and the optional apply/export stage.

pub mod apply;
pub mod export;
pub mod scene_settings;
pub mod step;

pub use apply::{RESULT_COLLECTION, apply_baked_result};
pub use export::{export_model, export_path};
pub use scene_settings::{SceneSettingsGuard, output_settings};
pub use step::{BakedImageResult, PACKED_CHANNEL, StepOutcome, run_step};
