use crate::foundation::core::Rgba;
use crate::foundation::error::{BakeError, BakeResult};
use crate::scene::ImageId;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(pub u32);

/// Default value carried by an unlinked input socket.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SocketValue {
    Float(f32),
    Color(Rgba),
    Vector([f32; 3]),
    Shader,
}

impl SocketValue {
    /// Broadcast to an opaque RGBA constant (scalars fill RGB).
    pub fn to_rgba(self) -> Rgba {
        match self {
            Self::Float(v) => [v, v, v, 1.0],
            Self::Color(c) => [c[0], c[1], c[2], 1.0],
            Self::Vector(v) => [v[0], v[1], v[2], 1.0],
            Self::Shader => [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Socket {
    pub name: String,
    pub value: SocketValue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Maximum,
    Minimum,
    Absolute,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    OutputMaterial { is_active_output: bool },
    PrincipledBsdf,
    Emission,
    TexImage,
    Rgb { color: Rgba },
    Invert,
    Attribute { attribute_name: String },
    AmbientOcclusion { samples: u32, inside: bool, only_local: bool },
    NewGeometry,
    UvMap { uv_map: String },
    Wireframe { use_pixel_size: bool },
    Bevel { samples: u32 },
    Math { op: MathOp },
    SeparateColor,
    SeparateXyz,
    Clamp,
    MixRgb,
    NormalMap,
    VertexColor { layer_name: String },
    Group { group: String },
}

impl NodeKind {
    /// Host type name, used for default node names.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::OutputMaterial { .. } => "Material Output",
            Self::PrincipledBsdf => "Principled BSDF",
            Self::Emission => "Emission",
            Self::TexImage => "Image Texture",
            Self::Rgb { .. } => "RGB",
            Self::Invert => "Invert Color",
            Self::Attribute { .. } => "Attribute",
            Self::AmbientOcclusion { .. } => "Ambient Occlusion",
            Self::NewGeometry => "Geometry",
            Self::UvMap { .. } => "UV Map",
            Self::Wireframe { .. } => "Wireframe",
            Self::Bevel { .. } => "Bevel",
            Self::Math { .. } => "Math",
            Self::SeparateColor => "Separate Color",
            Self::SeparateXyz => "Separate XYZ",
            Self::Clamp => "Clamp",
            Self::MixRgb => "Mix",
            Self::NormalMap => "Normal Map",
            Self::VertexColor { .. } => "Color Attribute",
            Self::Group { .. } => "Group",
        }
    }

    fn sockets(&self) -> (Vec<Socket>, Vec<String>) {
        use SocketValue::{Color, Float, Shader, Vector};
        fn ins(list: &[(&str, SocketValue)]) -> Vec<Socket> {
            list.iter()
                .map(|(n, v)| Socket {
                    name: (*n).to_string(),
                    value: *v,
                })
                .collect()
        }
        fn outs(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];
        const NORMAL: [f32; 3] = [0.0, 0.0, 0.0];

        match self {
            Self::OutputMaterial { .. } => (
                ins(&[
                    ("Surface", Shader),
                    ("Volume", Shader),
                    ("Displacement", Vector(NORMAL)),
                ]),
                Vec::new(),
            ),
            Self::PrincipledBsdf => (
                ins(&[
                    ("Base Color", Color([0.8, 0.8, 0.8, 1.0])),
                    ("Metallic", Float(0.0)),
                    ("Roughness", Float(0.5)),
                    ("IOR", Float(1.5)),
                    ("Alpha", Float(1.0)),
                    ("Normal", Vector(NORMAL)),
                    ("Subsurface Weight", Float(0.0)),
                    ("Subsurface Radius", Vector([1.0, 0.2, 0.1])),
                    ("Subsurface Anisotropy", Float(0.0)),
                    ("Specular IOR Level", Float(0.5)),
                    ("Specular Tint", Color(WHITE)),
                    ("Anisotropic", Float(0.0)),
                    ("Anisotropic Rotation", Float(0.0)),
                    ("Transmission Weight", Float(0.0)),
                    ("Coat Weight", Float(0.0)),
                    ("Coat Roughness", Float(0.03)),
                    ("Coat Tint", Color(WHITE)),
                    ("Sheen Weight", Float(0.0)),
                    ("Sheen Roughness", Float(0.5)),
                    ("Sheen Tint", Color(WHITE)),
                    ("Emission Color", Color(WHITE)),
                    ("Emission Strength", Float(0.0)),
                ]),
                outs(&["BSDF"]),
            ),
            Self::Emission => (
                ins(&[("Color", Color(WHITE)), ("Strength", Float(1.0))]),
                outs(&["Emission"]),
            ),
            Self::TexImage => (ins(&[("Vector", Vector(NORMAL))]), outs(&["Color", "Alpha"])),
            Self::Rgb { .. } => (Vec::new(), outs(&["Color"])),
            Self::Invert => (
                ins(&[("Fac", Float(1.0)), ("Color", Color([0.0, 0.0, 0.0, 1.0]))]),
                outs(&["Color"]),
            ),
            Self::Attribute { .. } => (Vec::new(), outs(&["Color", "Vector", "Fac", "Alpha"])),
            Self::AmbientOcclusion { .. } => (
                ins(&[
                    ("Color", Color(WHITE)),
                    ("Distance", Float(1.0)),
                    ("Normal", Vector(NORMAL)),
                ]),
                outs(&["Color", "AO"]),
            ),
            Self::NewGeometry => (
                Vec::new(),
                outs(&["Position", "Normal", "Tangent", "True Normal"]),
            ),
            Self::UvMap { .. } => (Vec::new(), outs(&["UV"])),
            Self::Wireframe { .. } => (ins(&[("Size", Float(0.01))]), outs(&["Fac"])),
            Self::Bevel { .. } => (
                ins(&[("Radius", Float(0.05)), ("Normal", Vector(NORMAL))]),
                outs(&["Normal"]),
            ),
            Self::Math { .. } => (
                ins(&[("Value", Float(0.5)), ("Value_001", Float(0.5))]),
                outs(&["Value"]),
            ),
            Self::SeparateColor => (
                ins(&[("Color", Color([0.8, 0.8, 0.8, 1.0]))]),
                outs(&["Red", "Green", "Blue"]),
            ),
            Self::SeparateXyz => (ins(&[("Vector", Vector(NORMAL))]), outs(&["X", "Y", "Z"])),
            Self::Clamp => (
                ins(&[("Value", Float(1.0)), ("Min", Float(0.0)), ("Max", Float(1.0))]),
                outs(&["Result"]),
            ),
            Self::MixRgb => (
                ins(&[
                    ("Fac", Float(0.5)),
                    ("Color1", Color([0.5, 0.5, 0.5, 1.0])),
                    ("Color2", Color([0.5, 0.5, 0.5, 1.0])),
                ]),
                outs(&["Color"]),
            ),
            Self::NormalMap => (
                ins(&[
                    ("Strength", Float(1.0)),
                    ("Color", Color([0.5, 0.5, 1.0, 1.0])),
                ]),
                outs(&["Normal"]),
            ),
            Self::VertexColor { .. } => (Vec::new(), outs(&["Color", "Alpha"])),
            Self::Group { .. } => (Vec::new(), Vec::new()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub label: String,
    pub kind: NodeKind,
    pub inputs: Vec<Socket>,
    pub outputs: Vec<String>,
    #[serde(default)]
    pub image: Option<ImageId>,
}

impl Node {
    pub fn input(&self, name: &str) -> Option<&Socket> {
        self.inputs.iter().find(|s| s.name == name)
    }

    pub fn input_mut(&mut self, name: &str) -> Option<&mut Socket> {
        self.inputs.iter_mut().find(|s| s.name == name)
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o == name)
    }

    pub fn first_output(&self) -> Option<&str> {
        self.outputs.first().map(String::as_str)
    }

    pub fn set_input(&mut self, name: &str, value: SocketValue) -> BakeResult<()> {
        let socket = self
            .input_mut(name)
            .ok_or_else(|| BakeError::graph(format!("node has no input '{name}'")))?;
        socket.value = value;
        Ok(())
    }
}

/// Reference to one output socket of a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SocketRef {
    pub node: NodeId,
    pub socket: String,
}

impl SocketRef {
    pub fn new(node: NodeId, socket: impl Into<String>) -> Self {
        Self {
            node,
            socket: socket.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Link {
    pub from: SocketRef,
    pub to: SocketRef,
}

/// Shader node graph owned by one material.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NodeTree {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub active: Option<NodeId>,
    next_id: u32,
}

impl NodeTree {
    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        let (inputs, outputs) = kind.sockets();
        self.add_with_outputs(kind, inputs, outputs)
    }

    /// Add a node with an explicit socket layout (node-group instances).
    pub fn add_with_outputs(
        &mut self,
        kind: NodeKind,
        inputs: Vec<Socket>,
        outputs: Vec<String>,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let base = kind.type_name();
        let name = if self.nodes.iter().any(|n| n.name == base) {
            format!("{base}.{:03}", id.0)
        } else {
            base.to_string()
        };
        self.nodes.push(Node {
            id,
            name,
            label: String::new(),
            kind,
            inputs,
            outputs,
            image: None,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Remove a node together with every link touching it.
    pub fn remove(&mut self, id: NodeId) -> BakeResult<Node> {
        let pos = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| BakeError::graph(format!("node {} not in tree", id.0)))?;
        self.links.retain(|l| l.from.node != id && l.to.node != id);
        if self.active == Some(id) {
            self.active = None;
        }
        Ok(self.nodes.remove(pos))
    }

    /// Connect `from` into `to`, replacing whatever fed `to` before.
    pub fn link(&mut self, from: SocketRef, to: SocketRef) -> BakeResult<()> {
        let src = self
            .node(from.node)
            .ok_or_else(|| BakeError::graph(format!("link source node {} missing", from.node.0)))?;
        if !src.has_output(&from.socket) {
            return Err(BakeError::graph(format!(
                "node '{}' has no output '{}'",
                src.name, from.socket
            )));
        }
        let dst = self
            .node(to.node)
            .ok_or_else(|| BakeError::graph(format!("link target node {} missing", to.node.0)))?;
        if dst.input(&to.socket).is_none() {
            return Err(BakeError::graph(format!(
                "node '{}' has no input '{}'",
                dst.name, to.socket
            )));
        }
        self.links.retain(|l| l.to != to);
        self.links.push(Link { from, to });
        Ok(())
    }

    pub fn unlink_input(&mut self, to: &SocketRef) {
        self.links.retain(|l| &l.to != to);
    }

    /// Upstream socket feeding the given input, if linked.
    pub fn source_of(&self, to: &SocketRef) -> Option<&SocketRef> {
        self.links.iter().find(|l| &l.to == to).map(|l| &l.from)
    }

    pub fn find_kind(&self, pred: impl Fn(&NodeKind) -> bool) -> Option<&Node> {
        self.nodes.iter().find(|n| pred(&n.kind))
    }

    /// The active material output, else the first output node.
    pub fn material_output(&self) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| {
                matches!(
                    n.kind,
                    NodeKind::OutputMaterial {
                        is_active_output: true
                    }
                )
            })
            .or_else(|| {
                self.nodes
                    .iter()
                    .find(|n| matches!(n.kind, NodeKind::OutputMaterial { .. }))
            })
            .map(|n| n.id)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/nodes.rs"]
mod tests;
