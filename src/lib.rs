#![forbid(unsafe_code)]

pub mod assets;
pub mod bake;
pub mod channels;
pub mod cleanup;
pub mod compile;
pub mod config;
pub mod foundation;
pub mod graph;
pub mod pixel;
pub mod render;
pub mod scene;
pub mod session;
pub mod uv;

pub use bake::{BakedImageResult, StepOutcome, run_step};
pub use channels::{BakePass, ChannelId};
pub use cleanup::{CleanupReport, emergency_cleanup};
pub use compile::{BakeStep, BakeTask, ExecutionPlan, prepare_execution_queue};
pub use config::{ChannelSetting, CustomChannel, Job, JobSetting};
pub use foundation::core::{ColorSpace, Resolution, Rgba, UdimTile, Vec2};
pub use foundation::error::{BakeError, BakeResult};
pub use render::Services;
pub use scene::{ImageId, MaterialId, ObjectId, Scene};
pub use session::{QueueRunner, RunnerStatus, SessionStateTracker, Tick};
