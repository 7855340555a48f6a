//! Layer trait and built-in layer types

use super::Variable;
use crate::{Error, Result};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use rand::Rng;
use serde_json::{json, Map, Value};

/// A named, typed computation unit in a model graph.
///
/// A layer owns an ordered sequence of variables (its weights, possibly
/// empty) and exposes a configuration mapping sufficient to reconstruct an
/// equivalent, freshly initialized instance without the weights.
pub trait Layer {
    /// Stable type identifier used in serialized configs and registry lookup
    fn type_name(&self) -> &'static str;

    /// Unique layer name within the graph
    fn name(&self) -> &str;

    /// Hyperparameter mapping, excluding weight values
    fn config(&self) -> Map<String, Value>;

    /// Owned variables in declaration order
    fn variables(&self) -> Vec<&Variable>;

    /// Owned variables in declaration order, mutable
    fn variables_mut(&mut self) -> Vec<&mut Variable>;

    /// Compute the layer output for a batch of inputs
    fn forward(&self, inputs: &[ArrayView2<'_, f32>]) -> Result<Array2<f32>>;
}

fn single_input<'a, 'v>(
    name: &str,
    inputs: &'a [ArrayView2<'v, f32>],
) -> Result<&'a ArrayView2<'v, f32>> {
    match inputs {
        [x] => Ok(x),
        _ => Err(Error::Graph(format!(
            "layer `{name}` expects exactly one input, got {}",
            inputs.len()
        ))),
    }
}

pub(crate) fn usize_field(config: &Map<String, Value>, key: &str) -> Result<usize> {
    config
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .ok_or_else(|| Error::Serialization(format!("layer config missing `{key}`")))
}

pub(crate) fn str_field<'a>(config: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    config
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Serialization(format!("layer config missing `{key}`")))
}

/// Elementwise activation functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationFn {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl ActivationFn {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "linear" => Ok(ActivationFn::Linear),
            "relu" => Ok(ActivationFn::Relu),
            "sigmoid" => Ok(ActivationFn::Sigmoid),
            "tanh" => Ok(ActivationFn::Tanh),
            other => Err(Error::Serialization(format!(
                "unknown activation `{other}`"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ActivationFn::Linear => "linear",
            ActivationFn::Relu => "relu",
            ActivationFn::Sigmoid => "sigmoid",
            ActivationFn::Tanh => "tanh",
        }
    }

    pub fn apply(self, x: Array2<f32>) -> Array2<f32> {
        match self {
            ActivationFn::Linear => x,
            ActivationFn::Relu => x.mapv(|v| v.max(0.0)),
            ActivationFn::Sigmoid => x.mapv(|v| 1.0 / (1.0 + (-v).exp())),
            ActivationFn::Tanh => x.mapv(f32::tanh),
        }
    }
}

/// Named entry point of a graph; declares the feature width callers must feed
pub struct Input {
    name: String,
    units: usize,
}

impl Input {
    pub fn new(name: impl Into<String>, units: usize) -> Self {
        Self {
            name: name.into(),
            units,
        }
    }

    pub(crate) fn from_config(name: &str, config: &Map<String, Value>) -> Result<Self> {
        Ok(Self::new(name, usize_field(config, "units")?))
    }

    pub fn units(&self) -> usize {
        self.units
    }
}

impl Layer for Input {
    fn type_name(&self) -> &'static str {
        "Input"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert("units".to_string(), json!(self.units));
        config
    }

    fn variables(&self) -> Vec<&Variable> {
        Vec::new()
    }

    fn variables_mut(&mut self) -> Vec<&mut Variable> {
        Vec::new()
    }

    fn forward(&self, inputs: &[ArrayView2<'_, f32>]) -> Result<Array2<f32>> {
        let x = single_input(&self.name, inputs)?;
        if x.ncols() != self.units {
            return Err(Error::ShapeMismatch {
                name: self.name.clone(),
                expected: vec![self.units],
                got: vec![x.ncols()],
            });
        }
        Ok(x.to_owned())
    }
}

/// Fully connected transformation: `y = activation(x . kernel + bias)`
pub struct Dense {
    name: String,
    input_dim: usize,
    units: usize,
    activation: ActivationFn,
    kernel: Variable,
    bias: Variable,
}

impl Dense {
    /// Create a freshly initialized dense layer (Glorot-uniform kernel, zero bias)
    pub fn new(
        name: impl Into<String>,
        input_dim: usize,
        units: usize,
        activation: ActivationFn,
    ) -> Self {
        let limit = (6.0 / (input_dim + units) as f32).sqrt();
        let mut rng = rand::thread_rng();
        let kernel_data: Vec<f32> = (0..input_dim * units)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();
        let kernel = Variable::from_vec("kernel", vec![input_dim, units], kernel_data)
            .expect("kernel buffer length matches shape");
        let bias = Variable::zeros("bias", vec![units]);
        Self {
            name: name.into(),
            input_dim,
            units,
            activation,
            kernel,
            bias,
        }
    }

    pub(crate) fn from_config(name: &str, config: &Map<String, Value>) -> Result<Self> {
        let input_dim = usize_field(config, "input_dim")?;
        let units = usize_field(config, "units")?;
        let activation = match config.get("activation") {
            Some(v) => ActivationFn::from_name(v.as_str().ok_or_else(|| {
                Error::Serialization("`activation` must be a string".to_string())
            })?)?,
            None => ActivationFn::Linear,
        };
        Ok(Self::new(name, input_dim, units, activation))
    }

    pub fn units(&self) -> usize {
        self.units
    }
}

impl Layer for Dense {
    fn type_name(&self) -> &'static str {
        "Dense"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert("input_dim".to_string(), json!(self.input_dim));
        config.insert("units".to_string(), json!(self.units));
        config.insert("activation".to_string(), json!(self.activation.name()));
        config
    }

    fn variables(&self) -> Vec<&Variable> {
        vec![&self.kernel, &self.bias]
    }

    fn variables_mut(&mut self) -> Vec<&mut Variable> {
        vec![&mut self.kernel, &mut self.bias]
    }

    fn forward(&self, inputs: &[ArrayView2<'_, f32>]) -> Result<Array2<f32>> {
        let x = single_input(&self.name, inputs)?;
        if x.ncols() != self.input_dim {
            return Err(Error::ShapeMismatch {
                name: self.name.clone(),
                expected: vec![self.input_dim],
                got: vec![x.ncols()],
            });
        }
        let kernel = self.kernel.view_2d()?;
        let mut out = x.dot(&kernel);
        out += self.bias.data();
        Ok(self.activation.apply(out))
    }
}

/// Standalone elementwise activation layer
pub struct Activation {
    name: String,
    activation: ActivationFn,
}

impl Activation {
    pub fn new(name: impl Into<String>, activation: ActivationFn) -> Self {
        Self {
            name: name.into(),
            activation,
        }
    }

    pub(crate) fn from_config(name: &str, config: &Map<String, Value>) -> Result<Self> {
        let activation = ActivationFn::from_name(str_field(config, "activation")?)?;
        Ok(Self::new(name, activation))
    }
}

impl Layer for Activation {
    fn type_name(&self) -> &'static str {
        "Activation"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert("activation".to_string(), json!(self.activation.name()));
        config
    }

    fn variables(&self) -> Vec<&Variable> {
        Vec::new()
    }

    fn variables_mut(&mut self) -> Vec<&mut Variable> {
        Vec::new()
    }

    fn forward(&self, inputs: &[ArrayView2<'_, f32>]) -> Result<Array2<f32>> {
        let x = single_input(&self.name, inputs)?;
        Ok(self.activation.apply(x.to_owned()))
    }
}

/// Merges named input tensors by concatenating them column-wise.
///
/// All inbound tensors must share the same batch (leading) dimension; the
/// output preserves it.
pub struct Concatenate {
    name: String,
}

impl Concatenate {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub(crate) fn from_config(name: &str, _config: &Map<String, Value>) -> Result<Self> {
        Ok(Self::new(name))
    }
}

impl Layer for Concatenate {
    fn type_name(&self) -> &'static str {
        "Concatenate"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> Map<String, Value> {
        Map::new()
    }

    fn variables(&self) -> Vec<&Variable> {
        Vec::new()
    }

    fn variables_mut(&mut self) -> Vec<&mut Variable> {
        Vec::new()
    }

    fn forward(&self, inputs: &[ArrayView2<'_, f32>]) -> Result<Array2<f32>> {
        if inputs.is_empty() {
            return Err(Error::Graph(format!(
                "layer `{}` requires at least one input",
                self.name
            )));
        }
        let batch = inputs[0].nrows();
        for x in inputs {
            if x.nrows() != batch {
                return Err(Error::ShapeMismatch {
                    name: self.name.clone(),
                    expected: vec![batch],
                    got: vec![x.nrows()],
                });
            }
        }
        concatenate(Axis(1), inputs)
            .map_err(|e| Error::Graph(format!("layer `{}` concatenation failed: {e}", self.name)))
    }
}
