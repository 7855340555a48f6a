//! Weight extraction and assignment
//!
//! A [`WeightSet`] is the numeric counterpart of a graph config: per-layer
//! tensor records in stable declaration order, independent of how they are
//! persisted. Assignment is two-phase: every record is validated against the
//! live graph before any variable is mutated, so a failed assignment never
//! leaves the model partially updated.

use crate::graph::ModelGraph;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One stored tensor: name, shape, dtype, and raw numeric buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorRecord {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
    pub data: Vec<f32>,
}

/// Stored tensors for one layer, in variable declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    pub layer: String,
    pub tensors: Vec<TensorRecord>,
}

/// All stored tensors for a graph, in layer creation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightSet {
    pub layers: Vec<LayerWeights>,
}

impl WeightSet {
    /// Extract every layer's variables; zero-variable layers yield empty entries
    pub fn extract(graph: &ModelGraph) -> Self {
        let layers = graph
            .layers()
            .map(|layer| LayerWeights {
                layer: layer.name().to_string(),
                tensors: layer
                    .variables()
                    .iter()
                    .map(|v| TensorRecord {
                        name: v.name().to_string(),
                        shape: v.shape().to_vec(),
                        dtype: "f32".to_string(),
                        data: v.data().to_vec(),
                    })
                    .collect(),
            })
            .collect();
        Self { layers }
    }

    pub fn get(&self, layer: &str) -> Option<&LayerWeights> {
        self.layers.iter().find(|lw| lw.layer == layer)
    }

    /// Total number of stored tensors
    pub fn num_tensors(&self) -> usize {
        self.layers.iter().map(|lw| lw.tensors.len()).sum()
    }

    /// Assign stored buffers into the graph's variables.
    ///
    /// Every graph layer that owns variables must have a matching entry with a
    /// record per variable ([`Error::MissingWeights`] otherwise), and every
    /// stored shape must agree with the live variable
    /// ([`Error::ShapeMismatch`]). Zero-variable layers need no entry. Stored
    /// entries for layers absent from the graph are ignored. On error the
    /// graph is left unmodified.
    pub fn assign(&self, graph: &mut ModelGraph) -> Result<()> {
        let by_layer: HashMap<&str, &LayerWeights> = self
            .layers
            .iter()
            .map(|lw| (lw.layer.as_str(), lw))
            .collect();

        // Phase 1: validate everything against the live graph
        for layer in graph.layers() {
            let vars = layer.variables();
            if vars.is_empty() {
                continue;
            }
            let stored = by_layer
                .get(layer.name())
                .ok_or_else(|| Error::MissingWeights(layer.name().to_string()))?;
            for var in &vars {
                let record = stored
                    .tensors
                    .iter()
                    .find(|t| t.name == var.name())
                    .ok_or_else(|| {
                        Error::MissingWeights(format!("{}/{}", layer.name(), var.name()))
                    })?;
                if record.shape != var.shape() {
                    return Err(Error::ShapeMismatch {
                        name: format!("{}/{}", layer.name(), var.name()),
                        expected: var.shape().to_vec(),
                        got: record.shape.clone(),
                    });
                }
                let expected_len: usize = record.shape.iter().product();
                if record.data.len() != expected_len {
                    return Err(Error::Serialization(format!(
                        "stored tensor `{}/{}` has {} elements, shape implies {expected_len}",
                        layer.name(),
                        var.name(),
                        record.data.len()
                    )));
                }
            }
        }

        // Phase 2: apply
        for layer in graph.layers_mut() {
            let layer_name = layer.name().to_string();
            for var in layer.variables_mut() {
                let record = by_layer
                    .get(layer_name.as_str())
                    .and_then(|lw| lw.tensors.iter().find(|t| t.name == var.name()));
                if let Some(record) = record {
                    var.assign(&record.shape, record.data.clone())?;
                }
            }
        }
        Ok(())
    }
}
