pub mod catalog;

pub use catalog::{
    BakePass, Category, ChannelDefinition, ChannelId, DefinitionGroup, ID_ATTRIBUTE_PREFIX,
    IdKind, MeshLogic, PbrMode, SortTier, definitions,
};
