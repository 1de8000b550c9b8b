//! Planning: jobs and object selections into an ordered queue of bake steps.

pub mod channels;
pub mod naming;
pub mod queue;
pub mod tasks;

pub use channels::{ChannelConfig, ChannelKind, collect_channels};
pub use naming::{get_folder_name, get_safe_base_name};
pub use queue::{BakeStep, ExecutionPlan, FrameInfo, frame_range, prepare_execution_queue};
pub use tasks::{BakeTask, build_tasks};
