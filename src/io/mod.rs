//! Model I/O - persisting and loading model artifacts
//!
//! Provides the save/load entrypoints, the container format codec, and
//! rehydration of runnable models from persisted artifacts.

mod container;
mod format;
mod load;
mod save;

#[cfg(test)]
mod tests;

pub use container::{
    is_container, ArtifactMetadata, ContainerHeader, CONTAINER_MAGIC, FORMAT_VERSION,
};
pub use format::SaveFormat;
pub use load::{load_model, rehydrate};
pub use save::save_model;
