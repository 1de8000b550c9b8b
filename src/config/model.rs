use crate::channels::{ChannelId, DefinitionGroup, definitions};
use crate::foundation::core::{ColorSpace, Resolution, Rgba, UdimTile};
use crate::scene::{ColorMode, Device, ExrCodec, FileFormat, ObjectId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BakeMode {
    #[default]
    SingleObject,
    CombineObject,
    SelectActive,
    SplitMaterial,
    Udim,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BakeType {
    Basic,
    #[default]
    Bsdf,
    Multires,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UdimMode {
    #[default]
    Detect,
    Repack,
    Custom,
}

/// How base names and folder names are derived for a task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NameSetting {
    Object,
    #[default]
    Mat,
    ObjMat,
    Custom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportFormat {
    #[default]
    Fbx,
    Glb,
    Usd,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Fbx => "fbx",
            Self::Glb => "glb",
            Self::Usd => "usd",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

/// One RGBA component, used to pick a source component in custom channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Component {
    #[default]
    R,
    G,
    B,
    A,
}

impl Component {
    pub fn index(self) -> usize {
        match self {
            Self::R => 0,
            Self::G => 1,
            Self::B => 2,
            Self::A => 3,
        }
    }
}

/// Weak binding of a host object to a UDIM tile and resolution override.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BakeObject {
    #[serde(skip)]
    pub object: Option<ObjectId>,
    pub udim_tile: UdimTile,
    pub override_size: bool,
    pub udim_width: u32,
    pub udim_height: u32,
}

impl BakeObject {
    pub fn new(object: ObjectId) -> Self {
        Self {
            object: Some(object),
            udim_width: 1024,
            udim_height: 1024,
            ..Self::default()
        }
    }

    pub fn tile_resolution(&self) -> Option<Resolution> {
        self.override_size
            .then(|| Resolution::new(self.udim_width, self.udim_height))
    }
}

/// Per-channel configuration inside a job.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ChannelSetting {
    pub id: ChannelId,
    pub name: String,
    pub enabled: bool,
    /// False when the channel does not belong to the current bake type.
    pub valid_for_mode: bool,
    pub prefix: String,
    pub suffix: String,
    pub override_defaults: bool,
    pub custom_cs: ColorSpace,
    pub custom_mode: ColorMode,
    pub rough_inv: bool,
    pub normal_obj: bool,
    pub ao_sample: u32,
    pub ao_dis: f32,
    pub ao_inside: bool,
    pub ao_local: bool,
    pub bevel_sample: u32,
    pub bevel_rad: f32,
    pub wireframe_use_pix: bool,
    pub wireframe_dis: f32,
    pub position_invert_g: bool,
    pub slope_direction: Axis,
    pub slope_invert: bool,
    pub pbr_conv_threshold: f32,
    pub node_group: Option<String>,
    pub node_group_output: Option<String>,
}

impl Default for ChannelSetting {
    fn default() -> Self {
        Self {
            id: ChannelId::Color,
            name: String::new(),
            enabled: false,
            valid_for_mode: true,
            prefix: String::new(),
            suffix: String::new(),
            override_defaults: false,
            custom_cs: ColorSpace::NonColor,
            custom_mode: ColorMode::Rgb,
            rough_inv: false,
            normal_obj: false,
            ao_sample: 16,
            ao_dis: 1.0,
            ao_inside: false,
            ao_local: false,
            bevel_sample: 8,
            bevel_rad: 0.1,
            wireframe_use_pix: false,
            wireframe_dis: 0.01,
            position_invert_g: false,
            slope_direction: Axis::Z,
            slope_invert: false,
            pbr_conv_threshold: 0.04,
            node_group: None,
            node_group_output: None,
        }
    }
}

impl ChannelSetting {
    pub fn new(id: ChannelId, enabled: bool) -> Self {
        Self {
            id,
            name: id.as_str().to_string(),
            enabled,
            ..Self::default()
        }
    }

    pub fn color_space(&self) -> ColorSpace {
        if self.override_defaults {
            self.custom_cs
        } else {
            self.id.default_color_space()
        }
    }

    pub fn color_mode(&self) -> ColorMode {
        if self.override_defaults {
            self.custom_mode
        } else {
            self.id.default_color_mode()
        }
    }
}

/// One R/G/B/A slot of a custom channel.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CustomSlot {
    pub value: f32,
    pub use_map: bool,
    pub source: Option<ChannelId>,
    pub invert: bool,
    /// Read one component instead of the source's luminance.
    pub separate: bool,
    pub component: Component,
}

impl Default for CustomSlot {
    fn default() -> Self {
        Self {
            value: 0.0,
            use_map: false,
            source: None,
            invert: false,
            separate: false,
            component: Component::R,
        }
    }
}

impl CustomSlot {
    pub fn constant(value: f32) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn mapped(source: ChannelId) -> Self {
        Self {
            use_map: true,
            source: Some(source),
            ..Self::default()
        }
    }
}

/// User-composed channel assembled from earlier channel results.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CustomChannel {
    pub name: String,
    pub enabled: bool,
    pub bw: bool,
    pub bw_slot: CustomSlot,
    pub r: CustomSlot,
    pub g: CustomSlot,
    pub b: CustomSlot,
    pub a: CustomSlot,
    pub prefix: String,
    pub suffix: String,
    pub color_space: ColorSpace,
}

impl Default for CustomChannel {
    fn default() -> Self {
        Self {
            name: String::from("Custom"),
            enabled: true,
            bw: false,
            bw_slot: CustomSlot::default(),
            r: CustomSlot::default(),
            g: CustomSlot::default(),
            b: CustomSlot::default(),
            a: CustomSlot::constant(1.0),
            prefix: String::new(),
            suffix: String::new(),
            color_space: ColorSpace::NonColor,
        }
    }
}

impl CustomChannel {
    pub fn slots(&self) -> [&CustomSlot; 4] {
        [&self.r, &self.g, &self.b, &self.a]
    }

    /// Channels whose results this composition reads.
    pub fn sources(&self) -> Vec<ChannelId> {
        let slots: Vec<&CustomSlot> = if self.bw {
            vec![&self.bw_slot]
        } else {
            self.slots().to_vec()
        };
        slots
            .into_iter()
            .filter(|s| s.use_map)
            .filter_map(|s| s.source)
            .collect()
    }
}

/// The configuration aggregate of one job.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct JobSetting {
    pub bake_objects: Vec<BakeObject>,
    #[serde(skip)]
    pub active_object: Option<ObjectId>,
    #[serde(skip)]
    pub cage_object: Option<ObjectId>,

    pub res_x: u32,
    pub res_y: u32,
    pub sample: u32,
    pub margin: u32,
    pub device: Device,
    pub bake_type: BakeType,
    pub bake_mode: BakeMode,
    pub udim_mode: UdimMode,

    pub use_auto_uv: bool,
    pub auto_uv_angle: f32,
    pub auto_uv_margin: f32,
    pub extrusion: f32,
    pub ray_distance: f32,

    pub bake_motion: bool,
    pub bake_motion_use_custom: bool,
    pub bake_motion_start: i32,
    /// Frame count of a custom range.
    pub bake_motion_last: i32,
    pub bake_motion_startindex: i32,
    pub bake_motion_digit: usize,
    pub bake_motion_separator: String,

    pub float32: bool,
    pub clearimage: bool,
    pub colorbase: Rgba,
    pub use_alpha: bool,

    pub save_out: bool,
    pub save_path: String,
    pub use_fake_user: bool,
    pub reload: bool,
    pub save_format: FileFormat,
    pub color_depth: u8,
    pub color_mode: ColorMode,
    pub quality: u8,
    pub exr_code: ExrCodec,
    pub create_new_folder: bool,
    pub new_folder_name_setting: NameSetting,
    pub folder_name: String,

    pub name_setting: NameSetting,
    pub custom_name: String,

    pub bake_texture_apply: bool,
    pub export_model: bool,
    pub export_format: ExportFormat,

    pub channels: Vec<ChannelSetting>,
    pub use_light_map: bool,
    pub use_mesh_map: bool,
    pub use_extension_map: bool,
    pub use_custom_map: bool,

    pub use_packing: bool,
    pub pack_r: Option<String>,
    pub pack_g: Option<String>,
    pub pack_b: Option<String>,
    pub pack_a: Option<String>,
    pub pack_suffix: String,

    pub id_start_color: Rgba,
    pub id_manual_start_color: bool,
    pub id_seed: u64,
    pub id_iterations: u32,
}

impl Default for JobSetting {
    fn default() -> Self {
        Self {
            bake_objects: Vec::new(),
            active_object: None,
            cage_object: None,
            res_x: 1024,
            res_y: 1024,
            sample: 1,
            margin: 8,
            device: Device::Gpu,
            bake_type: BakeType::Bsdf,
            bake_mode: BakeMode::SingleObject,
            udim_mode: UdimMode::Detect,
            use_auto_uv: false,
            auto_uv_angle: 66.0,
            auto_uv_margin: 0.003,
            extrusion: 0.0,
            ray_distance: 0.0,
            bake_motion: false,
            bake_motion_use_custom: false,
            bake_motion_start: 1,
            bake_motion_last: 250,
            bake_motion_startindex: 0,
            bake_motion_digit: 4,
            bake_motion_separator: String::from("_"),
            float32: false,
            clearimage: true,
            colorbase: [0.0, 0.0, 0.0, 0.0],
            use_alpha: true,
            save_out: false,
            save_path: String::from("//"),
            use_fake_user: true,
            reload: false,
            save_format: FileFormat::Png,
            color_depth: 8,
            color_mode: ColorMode::Rgba,
            quality: 85,
            exr_code: ExrCodec::Zip,
            create_new_folder: false,
            new_folder_name_setting: NameSetting::Mat,
            folder_name: String::new(),
            name_setting: NameSetting::Mat,
            custom_name: String::new(),
            bake_texture_apply: false,
            export_model: false,
            export_format: ExportFormat::Fbx,
            channels: Vec::new(),
            use_light_map: false,
            use_mesh_map: false,
            use_extension_map: false,
            use_custom_map: false,
            use_packing: false,
            pack_r: None,
            pack_g: None,
            pack_b: None,
            pack_a: None,
            pack_suffix: String::from("_pack"),
            id_start_color: [1.0, 0.0, 0.0, 1.0],
            id_manual_start_color: false,
            id_seed: 0,
            id_iterations: 50,
        }
    }
}

impl JobSetting {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.res_x, self.res_y)
    }

    /// Definition groups that apply to the current bake type and map toggles.
    pub fn definition_groups(&self) -> Vec<DefinitionGroup> {
        let mut groups = Vec::new();
        match self.bake_type {
            BakeType::Bsdf => groups.push(DefinitionGroup::Bsdf),
            BakeType::Basic => groups.push(DefinitionGroup::Basic),
            BakeType::Multires => {}
        }
        if self.use_light_map {
            groups.push(DefinitionGroup::Light);
        }
        if self.use_mesh_map {
            groups.push(DefinitionGroup::Mesh);
        }
        if self.use_extension_map {
            groups.push(DefinitionGroup::Extension);
        }
        groups
    }

    /// Rebuild the channel list for the current mode, keeping existing
    /// per-channel settings and flagging channels outside the mode.
    pub fn sync_channels(&mut self) {
        let mut targets = Vec::new();
        for group in self.definition_groups() {
            for def in definitions(group) {
                if !targets.iter().any(|(id, _)| *id == def.id) {
                    targets.push((def.id, def));
                }
            }
        }

        for channel in &mut self.channels {
            match targets.iter().find(|(id, _)| *id == channel.id) {
                Some((_, def)) => {
                    channel.valid_for_mode = true;
                    channel.name = def.name.to_string();
                }
                None => channel.valid_for_mode = false,
            }
        }

        for (id, def) in targets {
            if self.channels.iter().any(|c| c.id == id) {
                continue;
            }
            self.channels.push(ChannelSetting {
                id,
                name: def.name.to_string(),
                enabled: def.enabled,
                suffix: def.suffix.to_string(),
                ..ChannelSetting::default()
            });
        }
    }

    /// Repair the invalid SELECT_ACTIVE + BSDF combination. Returns whether
    /// anything changed.
    pub fn migrate(&mut self) -> bool {
        if self.bake_mode == BakeMode::SelectActive && self.bake_type == BakeType::Bsdf {
            self.bake_type = BakeType::Basic;
            self.sync_channels();
            return true;
        }
        false
    }

    pub fn channel(&self, id: ChannelId) -> Option<&ChannelSetting> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut ChannelSetting> {
        self.channels.iter_mut().find(|c| c.id == id)
    }

    /// Enable (adding if needed) a channel with default settings.
    pub fn enable_channel(&mut self, id: ChannelId) -> &mut ChannelSetting {
        let index = match self.channels.iter().position(|c| c.id == id) {
            Some(i) => i,
            None => {
                self.channels.push(ChannelSetting::new(id, true));
                self.channels.len() - 1
            }
        };
        let channel = &mut self.channels[index];
        channel.enabled = true;
        channel
    }

    /// Packing slot assignments in R, G, B, A order.
    pub fn pack_slots(&self) -> [Option<&str>; 4] {
        [
            self.pack_r.as_deref(),
            self.pack_g.as_deref(),
            self.pack_b.as_deref(),
            self.pack_a.as_deref(),
        ]
    }
}

/// A named, independently enabled bake configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Job {
    pub name: String,
    pub enabled: bool,
    pub setting: JobSetting,
    pub custom_channels: Vec<CustomChannel>,
}

impl Default for Job {
    fn default() -> Self {
        Self {
            name: String::from("Job"),
            enabled: true,
            setting: JobSetting::default(),
            custom_channels: Vec::new(),
        }
    }
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        let mut job = Self {
            name: name.into(),
            ..Self::default()
        };
        job.setting.sync_channels();
        job
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/model.rs"]
mod tests;
