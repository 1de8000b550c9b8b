//! Scoped shading-graph isolation for bake sessions.

pub mod editor;
pub mod logic;

pub use editor::{GraphSession, PROTECTION_IMAGE, PROTECTION_LABEL, SESSION_LABEL};
pub use logic::{LOGIC_LABEL, LogicBuilder};
