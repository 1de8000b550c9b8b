use std::collections::BTreeMap;

use crate::channels::{ChannelId, MeshLogic, PbrMode};
use crate::config::{Axis, ChannelSetting};
use crate::foundation::error::{BakeError, BakeResult};
use crate::scene::{MathOp, NodeGroup, NodeId, NodeKind, NodeTree, SocketRef, SocketValue};

/// Label carried by per-channel nodes; they are rebuilt for every channel.
pub const LOGIC_LABEL: &str = "BT_Logic";

/// Builds the per-channel node chain feeding the session emission node.
///
/// Every node it adds is labelled [`LOGIC_LABEL`] and recorded in
/// `created` so the caller can tear the chain down before the next channel.
pub struct LogicBuilder<'t> {
    tree: &'t mut NodeTree,
    created: &'t mut Vec<NodeId>,
    /// Session nodes that must never be picked as a signal source.
    exclude: &'t [NodeId],
}

impl<'t> LogicBuilder<'t> {
    pub fn new(tree: &'t mut NodeTree, created: &'t mut Vec<NodeId>, exclude: &'t [NodeId]) -> Self {
        Self {
            tree,
            created,
            exclude,
        }
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = self.tree.add(kind);
        if let Some(node) = self.tree.node_mut(id) {
            node.label = LOGIC_LABEL.to_string();
        }
        self.created.push(id);
        id
    }

    fn set(&mut self, node: NodeId, input: &str, value: SocketValue) -> BakeResult<()> {
        self.tree
            .node_mut(node)
            .ok_or_else(|| BakeError::graph(format!("node {} vanished", node.0)))?
            .set_input(input, value)
    }

    fn link(&mut self, from: &SocketRef, node: NodeId, input: &str) -> BakeResult<()> {
        self.tree.link(from.clone(), SocketRef::new(node, input))
    }

    /// Signal source for a mesh-derived map.
    pub fn mesh_logic(
        &mut self,
        logic: MeshLogic,
        attribute: Option<&str>,
        s: &ChannelSetting,
    ) -> BakeResult<SocketRef> {
        let out = match logic {
            MeshLogic::Id(kind) => {
                let name = attribute
                    .map(str::to_string)
                    .unwrap_or_else(|| kind.attribute_name());
                let n = self.add(NodeKind::Attribute {
                    attribute_name: name,
                });
                SocketRef::new(n, "Color")
            }
            MeshLogic::Ao => {
                let n = self.add(NodeKind::AmbientOcclusion {
                    samples: s.ao_sample,
                    inside: s.ao_inside,
                    only_local: s.ao_local,
                });
                self.set(n, "Distance", SocketValue::Float(s.ao_dis))?;
                SocketRef::new(n, "Color")
            }
            MeshLogic::Position => SocketRef::new(self.add(NodeKind::NewGeometry), "Position"),
            MeshLogic::Uv => {
                let n = self.add(NodeKind::UvMap {
                    uv_map: String::new(),
                });
                SocketRef::new(n, "UV")
            }
            MeshLogic::Wireframe => {
                let n = self.add(NodeKind::Wireframe {
                    use_pixel_size: s.wireframe_use_pix,
                });
                self.set(n, "Size", SocketValue::Float(s.wireframe_dis))?;
                SocketRef::new(n, "Fac")
            }
            MeshLogic::Bevel => {
                let n = self.add(NodeKind::Bevel {
                    samples: s.bevel_sample,
                });
                self.set(n, "Radius", SocketValue::Float(s.bevel_rad))?;
                SocketRef::new(n, "Normal")
            }
            MeshLogic::Slope => {
                let geo = self.add(NodeKind::NewGeometry);
                let sep = self.add(NodeKind::SeparateXyz);
                self.link(&SocketRef::new(geo, "Normal"), sep, "Vector")?;
                let axis = match s.slope_direction {
                    Axis::X => "X",
                    Axis::Y => "Y",
                    Axis::Z => "Z",
                };
                let component = SocketRef::new(sep, axis);
                if s.slope_invert {
                    let sub = self.add(NodeKind::Math {
                        op: MathOp::Subtract,
                    });
                    self.set(sub, "Value", SocketValue::Float(1.0))?;
                    self.link(&component, sub, "Value_001")?;
                    SocketRef::new(sub, "Value")
                } else {
                    component
                }
            }
            MeshLogic::Vertex => {
                let n = self.add(NodeKind::VertexColor {
                    layer_name: String::new(),
                });
                SocketRef::new(n, "Color")
            }
        };
        Ok(out)
    }

    /// Metalness (and optionally base colour) derived from the specular
    /// signal: `clamp((max(r, g, b) - t) / max(1e-5, 1 - t))`.
    pub fn pbr_conversion(&mut self, mode: PbrMode, threshold: f32) -> BakeResult<SocketRef> {
        let spec = self.socket_source(ChannelId::Specular, None)?;
        let sep = self.add(NodeKind::SeparateColor);
        self.link(&spec, sep, "Color")?;

        let max_rg = self.add(NodeKind::Math { op: MathOp::Maximum });
        self.link(&SocketRef::new(sep, "Red"), max_rg, "Value")?;
        self.link(&SocketRef::new(sep, "Green"), max_rg, "Value_001")?;
        let max_rgb = self.add(NodeKind::Math { op: MathOp::Maximum });
        self.link(&SocketRef::new(max_rg, "Value"), max_rgb, "Value")?;
        self.link(&SocketRef::new(sep, "Blue"), max_rgb, "Value_001")?;

        let sub = self.add(NodeKind::Math {
            op: MathOp::Subtract,
        });
        self.link(&SocketRef::new(max_rgb, "Value"), sub, "Value")?;
        self.set(sub, "Value_001", SocketValue::Float(threshold))?;
        let div = self.add(NodeKind::Math { op: MathOp::Divide });
        self.link(&SocketRef::new(sub, "Value"), div, "Value")?;
        self.set(
            div,
            "Value_001",
            SocketValue::Float((1.0 - threshold).max(1e-5)),
        )?;
        let clamp = self.add(NodeKind::Clamp);
        self.link(&SocketRef::new(div, "Value"), clamp, "Value")?;
        let metal = SocketRef::new(clamp, "Result");

        match mode {
            PbrMode::Metal => Ok(metal),
            PbrMode::BaseColor => {
                let diffuse = self.socket_source(ChannelId::Color, None)?;
                let mix = self.add(NodeKind::MixRgb);
                self.link(&metal, mix, "Fac")?;
                self.link(&diffuse, mix, "Color1")?;
                self.link(&spec, mix, "Color2")?;
                Ok(SocketRef::new(mix, "Color"))
            }
        }
    }

    /// Named output of the configured node group, else its first output.
    pub fn node_group(
        &mut self,
        groups: &BTreeMap<String, NodeGroup>,
        s: &ChannelSetting,
    ) -> Option<SocketRef> {
        let name = s.node_group.as_deref()?;
        let Some(group) = groups.get(name) else {
            tracing::warn!(group = name, "node group not found");
            return None;
        };
        let outputs: Vec<String> = group.outputs.iter().map(|(n, _)| n.clone()).collect();
        let id = self.tree.add_with_outputs(
            NodeKind::Group {
                group: name.to_string(),
            },
            Vec::new(),
            outputs,
        );
        if let Some(node) = self.tree.node_mut(id) {
            node.label = LOGIC_LABEL.to_string();
        }
        self.created.push(id);

        let node = self.tree.node(id)?;
        let socket = match s.node_group_output.as_deref() {
            Some(wanted) if node.has_output(wanted) => wanted.to_string(),
            Some(wanted) => {
                tracing::warn!(group = name, output = wanted, "node group output not found");
                return None;
            }
            None => node.first_output()?.to_string(),
        };
        Some(SocketRef::new(id, socket))
    }

    /// Generic lookup: the principled input feeding this channel (or its
    /// upstream link), an emission colour fallback, else a constant.
    pub fn socket_source(
        &mut self,
        id: ChannelId,
        setting: Option<&ChannelSetting>,
    ) -> BakeResult<SocketRef> {
        let mut found: Option<SocketRef> = None;
        if let Some(bsdf) = self
            .tree
            .find_kind(|k| matches!(k, NodeKind::PrincipledBsdf))
        {
            found = id
                .socket_candidates()
                .iter()
                .find(|c| bsdf.input(c).is_some())
                .map(|c| SocketRef::new(bsdf.id, *c));
        }
        if found.is_none() && id.uses_emission_fallback() {
            found = self
                .tree
                .nodes
                .iter()
                .find(|n| {
                    matches!(n.kind, NodeKind::Emission)
                        && !self.exclude.contains(&n.id)
                        && n.label != LOGIC_LABEL
                })
                .map(|n| SocketRef::new(n.id, "Color"));
        }

        let linked = found
            .as_ref()
            .and_then(|input| self.tree.source_of(input))
            .cloned();
        let mut src = match linked {
            Some(upstream) => upstream,
            None => {
                let color = found
                    .as_ref()
                    .and_then(|r| self.tree.node(r.node)?.input(&r.socket))
                    .map(|s| s.value.to_rgba())
                    .unwrap_or_else(|| id.socket_default());
                let rgb = self.add(NodeKind::Rgb { color });
                SocketRef::new(rgb, "Color")
            }
        };

        if id == ChannelId::Rough && setting.is_some_and(|s| s.rough_inv) {
            let inv = self.add(NodeKind::Invert);
            self.set(inv, "Fac", SocketValue::Float(1.0))?;
            self.link(&src, inv, "Color")?;
            src = SocketRef::new(inv, "Color");
        }
        Ok(src)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/logic.rs"]
mod tests;
