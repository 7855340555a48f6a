//! # Guardar: Model Persistence Library
//!
//! Guardar persists graph-structured models: it serializes a model's
//! structure to a JSON config, stores per-layer weight tensors, bundles both
//! into a self-describing binary container, and rehydrates runnable models
//! from persisted artifacts.
//!
//! ## Architecture
//!
//! - **graph**: Model graph data model (layers, variables, registry, predict)
//! - **config**: Structural config serialization (`to_json` / `from_json`)
//! - **weights**: Weight extraction and validated assignment
//! - **io**: Save/load entrypoints, container codec, rehydration
//!
//! ## Example
//!
//! ```no_run
//! use guardar::graph::{ActivationFn, Dense, ModelGraph};
//! use guardar::io::{load_model, save_model, SaveFormat};
//!
//! let mut model = ModelGraph::new().with_name("mlp");
//! model.add_input("x", 4).unwrap();
//! model
//!     .add_layer(Box::new(Dense::new("out", 4, 2, ActivationFn::Relu)), &["x"])
//!     .unwrap();
//!
//! save_model(&model, "mlp.guardar", SaveFormat::Auto).unwrap();
//! let restored = load_model("mlp.guardar", None).unwrap();
//! ```

pub mod config;
pub mod graph;
pub mod io;
pub mod weights;

pub mod error;

// Re-export commonly used types
pub use config::{from_json, to_json, GraphConfig, LayerConfig};
pub use error::{Error, Result};
pub use graph::{
    register_custom_layer, ActivationFn, Layer, LayerConstructor, LayerRegistry, ModelGraph,
    TrainingConfig, Variable,
};
pub use io::{is_container, load_model, rehydrate, save_model, SaveFormat};
pub use weights::WeightSet;
