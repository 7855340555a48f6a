//! Config serialization
//!
//! Converts a [`ModelGraph`] to and from its structural description: layer
//! types, names, hyperparameter mappings, and connectivity, excluding weight
//! values. The JSON encoding of [`GraphConfig`] is the textual config format
//! exposed by [`to_json`] and [`from_json`].

use crate::graph::{LayerConstructor, LayerRegistry, ModelGraph, TrainingConfig};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Serialized description of a single layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Layer type identifier resolved through the registry on rebuild
    pub class_name: String,

    /// Unique layer name within the graph
    pub name: String,

    /// Hyperparameter mapping
    #[serde(default)]
    pub config: Map<String, Value>,

    /// Names of upstream layers; empty for entry layers
    #[serde(default)]
    pub inbound: Vec<String>,
}

/// Structural description of a model graph, excluding weight values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Layers in creation order; inbound edges never reference forward
    pub layers: Vec<LayerConfig>,

    /// Entry layer names forming the input contract
    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingConfig>,
}

impl GraphConfig {
    /// Extract the structural config from a live graph
    pub fn from_graph(graph: &ModelGraph) -> Self {
        Self {
            name: graph.name().map(str::to_string),
            layers: graph
                .iter()
                .map(|(layer, inbound)| LayerConfig {
                    class_name: layer.type_name().to_string(),
                    name: layer.name().to_string(),
                    config: layer.config(),
                    inbound: inbound.to_vec(),
                })
                .collect(),
            inputs: graph.inputs().to_vec(),
            output: graph.output().map(str::to_string),
            training: graph.training().cloned(),
        }
    }

    /// Rebuild a freshly initialized (unweighted) graph from this config.
    ///
    /// Each layer's type identifier is resolved through `registry`; unknown
    /// identifiers fail with [`Error::UnknownLayerType`].
    pub fn build(&self, registry: &LayerRegistry) -> Result<ModelGraph> {
        let mut graph = ModelGraph::new();
        if let Some(name) = &self.name {
            graph.set_name(name);
        }
        for lc in &self.layers {
            let layer = registry.construct(&lc.class_name, &lc.name, &lc.config)?;
            if lc.inbound.is_empty() {
                if !self.inputs.contains(&lc.name) {
                    return Err(Error::Graph(format!(
                        "layer `{}` has no inbound edges but is not a declared input",
                        lc.name
                    )));
                }
                graph.add_entry(layer)?;
            } else {
                let inbound: Vec<&str> = lc.inbound.iter().map(String::as_str).collect();
                graph.add_layer(layer, &inbound)?;
            }
        }
        for input in &self.inputs {
            if graph.layer(input).is_none() {
                return Err(Error::Graph(format!(
                    "declared input `{input}` does not exist"
                )));
            }
        }
        if let Some(output) = &self.output {
            graph.set_output(output)?;
        }
        if let Some(training) = &self.training {
            graph.set_training(training.clone());
        }
        graph.validate()?;
        Ok(graph)
    }
}

/// Export a graph's structural config as a JSON string
pub fn to_json(graph: &ModelGraph) -> Result<String> {
    serde_json::to_string_pretty(&GraphConfig::from_graph(graph))
        .map_err(|e| Error::Serialization(format!("config serialization failed: {e}")))
}

/// Rebuild a freshly initialized graph from a JSON config.
///
/// `custom_objects` supplies constructors for layer types not in the built-in
/// registry.
pub fn from_json(
    json: &str,
    custom_objects: Option<&HashMap<String, LayerConstructor>>,
) -> Result<ModelGraph> {
    let config: GraphConfig = serde_json::from_str(json)
        .map_err(|e| Error::Serialization(format!("config deserialization failed: {e}")))?;
    config.build(&LayerRegistry::builtin().with_custom(custom_objects))
}
