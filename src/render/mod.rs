//! Capabilities the bake engine consumes from its host, plus the in-crate
//! implementations used by the CLI and tests.

pub mod backend;
pub mod reference;
pub mod writer;

pub use backend::{
    BakeBackend, BakeParams, JsonModelExporter, ModelExporter, NormalSpace, PlanarUnwrapper,
    SelectedToActive, UvUnwrapper,
};
pub use reference::ReferenceBaker;
pub use writer::{FileImageWriter, ImageWriter, UDIM_TOKEN, expand_udim};

/// The set of host capabilities one bake run needs.
pub struct Services {
    pub baker: Box<dyn BakeBackend>,
    pub exporter: Box<dyn ModelExporter>,
    pub unwrapper: Box<dyn UvUnwrapper>,
    pub writer: Box<dyn ImageWriter>,
}

impl Services {
    /// CPU reference baker, JSON exporter, planar unwrapper and file writer.
    pub fn reference() -> Self {
        Self {
            baker: Box::new(ReferenceBaker),
            exporter: Box::new(JsonModelExporter),
            unwrapper: Box::new(PlanarUnwrapper),
            writer: Box::new(FileImageWriter),
        }
    }
}
