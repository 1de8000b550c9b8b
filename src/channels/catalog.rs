use std::fmt;
use std::str::FromStr;

use crate::foundation::core::{ColorSpace, Rgba};
use crate::foundation::error::BakeError;
use crate::scene::ColorMode;

/// Every bakeable channel. Behaviour per channel is looked up through the
/// exhaustive tables below rather than by string id.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    #[default]
    Color,
    Metal,
    Rough,
    Specular,
    SpecularTint,
    Anisotropic,
    AnisotropicRot,
    Sheen,
    SheenTint,
    SheenRough,
    Clearcoat,
    ClearcoatRough,
    ClearcoatTint,
    Tran,
    TranRou,
    Emi,
    EmiStr,
    Alpha,
    Normal,
    Subface,
    SubfaceCol,
    SubfaceAni,
    Diff,
    Gloss,
    Tranb,
    Combine,
    Shadow,
    Env,
    Ao,
    Height,
    Vertex,
    Bevel,
    Bevnor,
    #[serde(rename = "UV")]
    Uv,
    Wireframe,
    Position,
    Slope,
    Thickness,
    #[serde(rename = "ID_mat")]
    IdMat,
    #[serde(rename = "ID_ele")]
    IdEle,
    #[serde(rename = "ID_UVI")]
    IdUvi,
    #[serde(rename = "ID_seam")]
    IdSeam,
    Select,
    Curvature,
    PbrConvBase,
    PbrConvMetal,
    NodeGroup,
}

/// Render pass requested from the bake backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BakePass {
    Emit,
    Normal,
    Diffuse,
    Glossy,
    Transmission,
    Combined,
    Shadow,
    Environment,
    Displacement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Data,
    Light,
    Mesh,
    Extension,
}

/// Node-construction strategy for mesh-derived maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshLogic {
    Position,
    Uv,
    Wireframe,
    Ao,
    Bevel,
    Slope,
    Vertex,
    Id(IdKind),
}

/// Island/colour grouping used by ID maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdKind {
    Mat,
    Element,
    Uvi,
    Seam,
}

impl IdKind {
    /// Deterministic mesh attribute name for this kind.
    pub fn attribute_name(self) -> String {
        let key = match self {
            Self::Mat => "MAT",
            Self::Element => "ELEMENT",
            Self::Uvi => "UVI",
            Self::Seam => "SEAM",
        };
        format!("{ID_ATTRIBUTE_PREFIX}{key}")
    }
}

/// Prefix of every temporary ID attribute.
pub const ID_ATTRIBUTE_PREFIX: &str = "BT_ATTR_";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PbrMode {
    Metal,
    BaseColor,
}

/// Ordering tier inside a step: ID maps first, conversions last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SortTier {
    Id = 0,
    Regular = 1,
    Derived = 2,
}

impl ChannelId {
    pub const ALL: [ChannelId; 47] = [
        Self::Color,
        Self::Metal,
        Self::Rough,
        Self::Specular,
        Self::SpecularTint,
        Self::Anisotropic,
        Self::AnisotropicRot,
        Self::Sheen,
        Self::SheenTint,
        Self::SheenRough,
        Self::Clearcoat,
        Self::ClearcoatRough,
        Self::ClearcoatTint,
        Self::Tran,
        Self::TranRou,
        Self::Emi,
        Self::EmiStr,
        Self::Alpha,
        Self::Normal,
        Self::Subface,
        Self::SubfaceCol,
        Self::SubfaceAni,
        Self::Diff,
        Self::Gloss,
        Self::Tranb,
        Self::Combine,
        Self::Shadow,
        Self::Env,
        Self::Ao,
        Self::Height,
        Self::Vertex,
        Self::Bevel,
        Self::Bevnor,
        Self::Uv,
        Self::Wireframe,
        Self::Position,
        Self::Slope,
        Self::Thickness,
        Self::IdMat,
        Self::IdEle,
        Self::IdUvi,
        Self::IdSeam,
        Self::Select,
        Self::Curvature,
        Self::PbrConvBase,
        Self::PbrConvMetal,
        Self::NodeGroup,
    ];

    /// Stable string id, also used as the result key inside a step.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Metal => "metal",
            Self::Rough => "rough",
            Self::Specular => "specular",
            Self::SpecularTint => "specular_tint",
            Self::Anisotropic => "anisotropic",
            Self::AnisotropicRot => "anisotropic_rot",
            Self::Sheen => "sheen",
            Self::SheenTint => "sheen_tint",
            Self::SheenRough => "sheen_rough",
            Self::Clearcoat => "clearcoat",
            Self::ClearcoatRough => "clearcoat_rough",
            Self::ClearcoatTint => "clearcoat_tint",
            Self::Tran => "tran",
            Self::TranRou => "tran_rou",
            Self::Emi => "emi",
            Self::EmiStr => "emi_str",
            Self::Alpha => "alpha",
            Self::Normal => "normal",
            Self::Subface => "subface",
            Self::SubfaceCol => "subface_col",
            Self::SubfaceAni => "subface_ani",
            Self::Diff => "diff",
            Self::Gloss => "gloss",
            Self::Tranb => "tranb",
            Self::Combine => "combine",
            Self::Shadow => "shadow",
            Self::Env => "env",
            Self::Ao => "ao",
            Self::Height => "height",
            Self::Vertex => "vertex",
            Self::Bevel => "bevel",
            Self::Bevnor => "bevnor",
            Self::Uv => "UV",
            Self::Wireframe => "wireframe",
            Self::Position => "position",
            Self::Slope => "slope",
            Self::Thickness => "thickness",
            Self::IdMat => "ID_mat",
            Self::IdEle => "ID_ele",
            Self::IdUvi => "ID_UVI",
            Self::IdSeam => "ID_seam",
            Self::Select => "select",
            Self::Curvature => "curvature",
            Self::PbrConvBase => "pbr_conv_base",
            Self::PbrConvMetal => "pbr_conv_metal",
            Self::NodeGroup => "node_group",
        }
    }

    pub fn bake_pass(self) -> BakePass {
        match self {
            Self::Normal | Self::Bevnor => BakePass::Normal,
            Self::Diff => BakePass::Diffuse,
            Self::Gloss => BakePass::Glossy,
            Self::Tranb => BakePass::Transmission,
            Self::Combine => BakePass::Combined,
            Self::Shadow => BakePass::Shadow,
            Self::Env => BakePass::Environment,
            Self::Height => BakePass::Displacement,
            _ => BakePass::Emit,
        }
    }

    pub fn category(self) -> Category {
        match self {
            Self::Diff
            | Self::Gloss
            | Self::Tranb
            | Self::Combine
            | Self::Shadow
            | Self::Env
            | Self::Ao => Category::Light,
            Self::Height
            | Self::Vertex
            | Self::Bevel
            | Self::Bevnor
            | Self::Uv
            | Self::Wireframe
            | Self::Position
            | Self::Slope
            | Self::Thickness
            | Self::IdMat
            | Self::IdEle
            | Self::IdUvi
            | Self::IdSeam
            | Self::Select
            | Self::Curvature => Category::Mesh,
            Self::PbrConvBase | Self::PbrConvMetal => Category::Extension,
            _ => Category::Data,
        }
    }

    pub fn default_color_space(self) -> ColorSpace {
        match self {
            Self::Color
            | Self::Emi
            | Self::SubfaceCol
            | Self::Diff
            | Self::Gloss
            | Self::Tranb
            | Self::Combine
            | Self::Env
            | Self::Vertex
            | Self::PbrConvBase
            | Self::NodeGroup => ColorSpace::Srgb,
            _ => ColorSpace::NonColor,
        }
    }

    pub fn default_color_mode(self) -> ColorMode {
        match self {
            Self::Color
            | Self::SpecularTint
            | Self::SheenTint
            | Self::ClearcoatTint
            | Self::Emi
            | Self::Normal
            | Self::SubfaceCol
            | Self::Diff
            | Self::Gloss
            | Self::Tranb
            | Self::Combine
            | Self::Env
            | Self::Vertex
            | Self::Bevnor
            | Self::Uv
            | Self::Position
            | Self::IdMat
            | Self::IdEle
            | Self::IdUvi
            | Self::IdSeam
            | Self::PbrConvBase
            | Self::NodeGroup => ColorMode::Rgb,
            _ => ColorMode::Bw,
        }
    }

    /// Principled-BSDF input names to try, first match wins.
    pub fn socket_candidates(self) -> &'static [&'static str] {
        match self {
            Self::Color => &["Base Color", "Diffuse"],
            Self::Alpha => &["Alpha"],
            Self::Normal => &["Normal"],
            Self::Emi => &["Emission Color", "Emission"],
            Self::EmiStr => &["Emission Strength"],
            Self::Metal => &["Metallic"],
            Self::Specular => &["Specular IOR Level", "Specular"],
            Self::SpecularTint => &["Specular Tint"],
            Self::Rough => &["Roughness"],
            Self::Subface => &["Subsurface Weight", "Subsurface"],
            Self::SubfaceCol => &["Subsurface Radius", "Subsurface Color"],
            Self::SubfaceAni => &["Subsurface Anisotropy"],
            Self::Tran => &["Transmission Weight", "Transmission"],
            Self::TranRou => &["Transmission Roughness"],
            Self::Clearcoat => &["Coat Weight", "Coat", "Clearcoat"],
            Self::ClearcoatRough => &["Coat Roughness", "Clearcoat Roughness"],
            Self::ClearcoatTint => &["Coat Tint", "Clearcoat Tint"],
            Self::Sheen => &["Sheen Weight", "Sheen"],
            Self::SheenRough => &["Sheen Roughness"],
            Self::SheenTint => &["Sheen Tint"],
            Self::Anisotropic => &["Anisotropic"],
            Self::AnisotropicRot => &["Anisotropic Rotation"],
            _ => &[],
        }
    }

    /// Static fallback when no shader input can be found.
    pub fn socket_default(self) -> Rgba {
        match self {
            Self::Color => [0.8, 0.8, 0.8, 1.0],
            Self::Normal => [0.5, 0.5, 1.0, 1.0],
            Self::Rough => [0.5, 0.5, 0.5, 1.0],
            Self::Alpha => [1.0, 1.0, 1.0, 1.0],
            _ => [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Channels that may fall back to an emission node when no BSDF exists.
    pub fn uses_emission_fallback(self) -> bool {
        matches!(self, Self::Color | Self::Emi)
    }

    pub fn mesh_logic(self) -> Option<MeshLogic> {
        match self {
            Self::Position => Some(MeshLogic::Position),
            Self::Uv => Some(MeshLogic::Uv),
            Self::Wireframe => Some(MeshLogic::Wireframe),
            Self::Ao => Some(MeshLogic::Ao),
            Self::Bevel | Self::Bevnor => Some(MeshLogic::Bevel),
            Self::Slope => Some(MeshLogic::Slope),
            Self::Vertex => Some(MeshLogic::Vertex),
            _ => self.id_kind().map(MeshLogic::Id),
        }
    }

    pub fn id_kind(self) -> Option<IdKind> {
        match self {
            Self::IdMat => Some(IdKind::Mat),
            Self::IdEle => Some(IdKind::Element),
            Self::IdUvi => Some(IdKind::Uvi),
            Self::IdSeam => Some(IdKind::Seam),
            _ => None,
        }
    }

    pub fn pbr_mode(self) -> Option<PbrMode> {
        match self {
            Self::PbrConvBase => Some(PbrMode::BaseColor),
            Self::PbrConvMetal => Some(PbrMode::Metal),
            _ => None,
        }
    }

    /// Pure data passes render with a single sample.
    pub fn is_data_pass(self) -> bool {
        matches!(
            self,
            Self::Normal
                | Self::Position
                | Self::Uv
                | Self::Height
                | Self::Wireframe
                | Self::IdMat
                | Self::IdEle
        )
    }

    /// Channels always baked into float buffers.
    pub fn forces_float(self) -> bool {
        matches!(self, Self::Position | Self::Normal)
    }

    pub fn sort_tier(self) -> SortTier {
        if self.id_kind().is_some() {
            SortTier::Id
        } else if self.category() == Category::Extension {
            SortTier::Derived
        } else {
            SortTier::Regular
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelId {
    type Err = BakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| BakeError::validation(format!("unknown channel id '{s}'")))
    }
}

/// Catalog entry used to seed a job's channel list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelDefinition {
    pub id: ChannelId,
    pub name: &'static str,
    pub enabled: bool,
    pub suffix: &'static str,
}

const fn def(id: ChannelId, name: &'static str, suffix: &'static str) -> ChannelDefinition {
    ChannelDefinition {
        id,
        name,
        enabled: false,
        suffix,
    }
}

const fn on(id: ChannelId, name: &'static str, suffix: &'static str) -> ChannelDefinition {
    ChannelDefinition {
        id,
        name,
        enabled: true,
        suffix,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefinitionGroup {
    Bsdf,
    Basic,
    Light,
    Mesh,
    Extension,
}

const BSDF: &[ChannelDefinition] = &[
    on(ChannelId::Color, "Base Color", "_color"),
    def(ChannelId::Subface, "SSS", "_subface"),
    def(ChannelId::SubfaceAni, "SSS Anisotropy", "_subfaceani"),
    def(ChannelId::Metal, "Metalness", "_metal"),
    def(ChannelId::Specular, "Specular", "_spe"),
    def(ChannelId::SpecularTint, "Specular Tint", "_spet"),
    on(ChannelId::Rough, "Roughness", "_rough"),
    def(ChannelId::Anisotropic, "Anisotropy", "_aniso"),
    def(ChannelId::AnisotropicRot, "Anisotropy Rotating", "_anisorot"),
    def(ChannelId::Sheen, "Sheen", "_sheen"),
    def(ChannelId::SheenTint, "Sheen Tint", "_sheentint"),
    def(ChannelId::SheenRough, "Sheen Roughness", "_sheenrough"),
    def(ChannelId::Clearcoat, "Clearcoat", "_cc"),
    def(ChannelId::ClearcoatRough, "Clearcoat Roughness", "_ccr"),
    def(ChannelId::ClearcoatTint, "Clearcoat Tint", "_cct"),
    def(ChannelId::Tran, "Transmission", "_tran"),
    def(ChannelId::Emi, "Emission", "_emi"),
    def(ChannelId::EmiStr, "Emission Strength", "_emistr"),
    def(ChannelId::Alpha, "Alpha", "_alpha"),
    on(ChannelId::Normal, "Normal", "_nor"),
];

const BASIC: &[ChannelDefinition] = &[
    on(ChannelId::Diff, "Diffuse", "_diff"),
    def(ChannelId::Gloss, "Gloss", "_gloss"),
    def(ChannelId::Tranb, "Transmission", "_tran"),
    on(ChannelId::Normal, "Normal", "_nor"),
    def(ChannelId::Combine, "Combine", "_com"),
    def(ChannelId::Emi, "Emission", "_emi"),
    on(ChannelId::Rough, "Roughness", "_rough"),
];

const LIGHT: &[ChannelDefinition] = &[
    def(ChannelId::Ao, "Ambient Occlusion", "_ao"),
    def(ChannelId::Shadow, "Shadow", "_sha"),
    def(ChannelId::Env, "Environment", "_env"),
];

const MESH: &[ChannelDefinition] = &[
    def(ChannelId::Vertex, "Vertex Color", "_vertex"),
    def(ChannelId::Bevel, "Bevel", "_bv"),
    def(ChannelId::Curvature, "Curvature", "_curv"),
    def(ChannelId::Uv, "UV", "_UV"),
    def(ChannelId::Wireframe, "Wireframe", "_wf"),
    def(ChannelId::Bevnor, "Bevel Normal", "_bn"),
    def(ChannelId::Position, "Position", "_pos"),
    def(ChannelId::Slope, "Slope", "_slope"),
    def(ChannelId::Thickness, "Thickness", "_thick"),
    def(ChannelId::IdMat, "Material ID", "_idmat"),
    def(ChannelId::IdEle, "Element ID", "_idele"),
    def(ChannelId::IdUvi, "UV ID", "_idUVI"),
    def(ChannelId::IdSeam, "Seam ID", "_idseam"),
    def(ChannelId::Select, "Select", "_select"),
];

const EXTENSION: &[ChannelDefinition] = &[
    def(ChannelId::PbrConvBase, "Conv: Base Color", "_base_conv"),
    def(ChannelId::PbrConvMetal, "Conv: Metallic", "_metal_conv"),
];

pub fn definitions(group: DefinitionGroup) -> &'static [ChannelDefinition] {
    match group {
        DefinitionGroup::Bsdf => BSDF,
        DefinitionGroup::Basic => BASIC,
        DefinitionGroup::Light => LIGHT,
        DefinitionGroup::Mesh => MESH,
        DefinitionGroup::Extension => EXTENSION,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/channels/catalog.rs"]
mod tests;
