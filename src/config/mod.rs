pub mod bindings;
pub mod model;
pub mod preset;

pub use bindings::{JobBindings, load_jobs};
pub use model::{
    Axis, BakeMode, BakeObject, BakeType, ChannelSetting, Component, CustomChannel, CustomSlot,
    ExportFormat, Job, JobSetting, NameSetting, UdimMode,
};
pub use preset::{Preset, PresetIo, PresetStats, read_preset, write_preset};
