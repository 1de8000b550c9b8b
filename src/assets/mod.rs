//! Bake target images: creation, UDIM tile reconciliation and persistence.

pub mod save;
pub mod store;

pub use save::{
    SaveOptions, SequenceFrame, image_file_name, output_directory, pack_image, persist_image,
    save_image,
};
pub use store::{ImageEditorContext, ImageSpec, get_or_create_image};
