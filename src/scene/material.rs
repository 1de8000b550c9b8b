use crate::scene::nodes::{Link, NodeId, NodeKind, NodeTree, SocketRef, SocketValue};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlendMethod {
    #[default]
    Opaque,
    Clip,
    Blend,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default = "default_true")]
    pub use_nodes: bool,
    /// Name of the library this material is linked from; linked materials are read-only.
    #[serde(default)]
    pub library: Option<String>,
    #[serde(default)]
    pub blend_method: BlendMethod,
    #[serde(default)]
    pub node_tree: NodeTree,
}

fn default_true() -> bool {
    true
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            use_nodes: true,
            library: None,
            blend_method: BlendMethod::Opaque,
            node_tree: NodeTree::default(),
        }
    }

    /// Principled BSDF wired into an active material output.
    pub fn principled(name: impl Into<String>) -> Self {
        let mut mat = Self::new(name);
        let tree = &mut mat.node_tree;
        let bsdf = tree.add(NodeKind::PrincipledBsdf);
        let out = tree.add(NodeKind::OutputMaterial {
            is_active_output: true,
        });
        tree.links.push(Link {
            from: SocketRef::new(bsdf, "BSDF"),
            to: SocketRef::new(out, "Surface"),
        });
        mat
    }

    /// Principled material with one input default overridden.
    pub fn principled_with(name: impl Into<String>, input: &str, value: SocketValue) -> Self {
        let mut mat = Self::principled(name);
        if let Some(id) = mat.principled_bsdf() {
            if let Some(node) = mat.node_tree.node_mut(id) {
                if let Some(socket) = node.input_mut(input) {
                    socket.value = value;
                }
            }
        }
        mat
    }

    pub fn principled_bsdf(&self) -> Option<NodeId> {
        self.node_tree
            .find_kind(|k| matches!(k, NodeKind::PrincipledBsdf))
            .map(|n| n.id)
    }

    pub fn is_linked(&self) -> bool {
        self.library.is_some()
    }
}

/// Reusable node group exposing constant named outputs.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeGroup {
    pub name: String,
    pub outputs: Vec<(String, SocketValue)>,
}
