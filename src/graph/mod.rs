//! Model graph data model
//!
//! A [`ModelGraph`] is a directed acyclic graph of named [`Layer`] nodes
//! connected by inbound-edge references. Layers are stored in creation order,
//! and every inbound reference must name a layer that already exists, so
//! creation order is an execution order.

mod layer;
mod registry;
mod variable;

pub use layer::{Activation, ActivationFn, Concatenate, Dense, Input, Layer};
pub use registry::{constructor, register_custom_layer, LayerConstructor, LayerRegistry};
pub use variable::Variable;

use crate::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Loss, optimizer, and metrics recorded by [`ModelGraph::compile`].
///
/// Persisted alongside the graph structure; this crate records it but does
/// not execute training.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub loss: String,
    pub optimizer: String,
    #[serde(default)]
    pub metrics: Vec<String>,
}

struct Node {
    layer: Box<dyn Layer>,
    inbound: Vec<String>,
}

/// A directed acyclic graph of layers with named entry points
#[derive(Default)]
pub struct ModelGraph {
    name: Option<String>,
    nodes: Vec<Node>,
    inputs: Vec<String>,
    output: Option<String>,
    training: Option<TrainingConfig>,
}

impl ModelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Add a named entry point with a declared feature width
    pub fn add_input(&mut self, name: &str, units: usize) -> Result<()> {
        self.add_entry(Box::new(Input::new(name, units)))
    }

    /// Add an entry layer (no inbound edges); it becomes part of the input contract
    pub fn add_entry(&mut self, layer: Box<dyn Layer>) -> Result<()> {
        self.check_unique(layer.name())?;
        self.inputs.push(layer.name().to_string());
        self.nodes.push(Node {
            layer,
            inbound: Vec::new(),
        });
        Ok(())
    }

    /// Add a layer connected to already-present layers.
    ///
    /// Every inbound name must reference an existing layer; forward references
    /// are rejected. The most recently added layer becomes the graph output.
    pub fn add_layer(&mut self, layer: Box<dyn Layer>, inbound: &[&str]) -> Result<()> {
        if inbound.is_empty() {
            return Err(Error::Graph(format!(
                "layer `{}` has no inbound edges; use add_input or add_entry for entry layers",
                layer.name()
            )));
        }
        self.check_unique(layer.name())?;
        for src in inbound {
            if !self.nodes.iter().any(|n| n.layer.name() == *src) {
                return Err(Error::Graph(format!(
                    "layer `{}` references unknown layer `{src}`",
                    layer.name()
                )));
            }
        }
        self.output = Some(layer.name().to_string());
        self.nodes.push(Node {
            layer,
            inbound: inbound.iter().map(|s| s.to_string()).collect(),
        });
        Ok(())
    }

    fn check_unique(&self, name: &str) -> Result<()> {
        if self.nodes.iter().any(|n| n.layer.name() == name) {
            return Err(Error::Graph(format!("duplicate layer name `{name}`")));
        }
        Ok(())
    }

    /// Designate the output layer
    pub fn set_output(&mut self, name: &str) -> Result<()> {
        if !self.nodes.iter().any(|n| n.layer.name() == name) {
            return Err(Error::Graph(format!("unknown output layer `{name}`")));
        }
        self.output = Some(name.to_string());
        Ok(())
    }

    /// Record training configuration (loss, optimizer, metrics)
    pub fn compile(&mut self, loss: &str, optimizer: &str, metrics: &[&str]) {
        self.training = Some(TrainingConfig {
            loss: loss.to_string(),
            optimizer: optimizer.to_string(),
            metrics: metrics.iter().map(|s| s.to_string()).collect(),
        });
    }

    pub fn set_training(&mut self, training: TrainingConfig) {
        self.training = Some(training);
    }

    pub fn training(&self) -> Option<&TrainingConfig> {
        self.training.as_ref()
    }

    /// Entry layer names, in creation order
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Layers in creation order
    pub fn layers(&self) -> impl Iterator<Item = &dyn Layer> {
        self.nodes.iter().map(|n| n.layer.as_ref())
    }

    pub fn layers_mut(&mut self) -> impl Iterator<Item = &mut (dyn Layer + 'static)> + '_ {
        self.nodes.iter_mut().map(move |n| n.layer.as_mut())
    }

    /// Layers with their inbound-edge names, in creation order
    pub fn iter(&self) -> impl Iterator<Item = (&dyn Layer, &[String])> {
        self.nodes
            .iter()
            .map(|n| (n.layer.as_ref(), n.inbound.as_slice()))
    }

    pub fn layer(&self, name: &str) -> Option<&dyn Layer> {
        self.nodes
            .iter()
            .find(|n| n.layer.name() == name)
            .map(|n| n.layer.as_ref())
    }

    pub fn num_layers(&self) -> usize {
        self.nodes.len()
    }

    /// Check structural invariants: entry layers have no inbound edges, every
    /// edge references an earlier layer, and the output layer exists.
    pub fn validate(&self) -> Result<()> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            for src in &node.inbound {
                if !seen.contains(&src.as_str()) {
                    return Err(Error::Graph(format!(
                        "layer `{}` references `{src}` before it is defined",
                        node.layer.name()
                    )));
                }
            }
            seen.push(node.layer.name());
        }
        for input in &self.inputs {
            match self.nodes.iter().find(|n| n.layer.name() == *input) {
                Some(n) if n.inbound.is_empty() => {}
                Some(_) => {
                    return Err(Error::Graph(format!(
                        "declared input `{input}` has inbound edges"
                    )))
                }
                None => {
                    return Err(Error::Graph(format!(
                        "declared input `{input}` does not exist"
                    )))
                }
            }
        }
        if let Some(output) = &self.output {
            if !self.nodes.iter().any(|n| n.layer.name() == *output) {
                return Err(Error::Graph(format!("output layer `{output}` does not exist")));
            }
        }
        Ok(())
    }

    /// Run the graph on a batch of named inputs.
    ///
    /// Each entry layer is fed the tensor keyed by its name; layers evaluate
    /// in creation order. The output's leading dimension equals the batch
    /// size of the fed inputs.
    pub fn predict(&self, feeds: &HashMap<String, Array2<f32>>) -> Result<Array2<f32>> {
        let mut computed: HashMap<&str, Array2<f32>> = HashMap::new();
        for node in &self.nodes {
            let name = node.layer.name();
            let out = if node.inbound.is_empty() {
                let feed = feeds
                    .get(name)
                    .ok_or_else(|| Error::Graph(format!("no feed for input `{name}`")))?;
                node.layer.forward(&[feed.view()])?
            } else {
                let mut views = Vec::with_capacity(node.inbound.len());
                for src in &node.inbound {
                    let upstream = computed.get(src.as_str()).ok_or_else(|| {
                        Error::Graph(format!("layer `{name}` depends on unevaluated `{src}`"))
                    })?;
                    views.push(upstream.view());
                }
                node.layer.forward(&views)?
            };
            computed.insert(name, out);
        }

        let output = self
            .output
            .as_deref()
            .or_else(|| self.nodes.last().map(|n| n.layer.name()))
            .ok_or_else(|| Error::Graph("model has no layers".to_string()))?;
        computed
            .remove(output)
            .ok_or_else(|| Error::Graph(format!("output layer `{output}` was not evaluated")))
    }
}
