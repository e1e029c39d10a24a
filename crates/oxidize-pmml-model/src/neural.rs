use oxidize_pmml_core::Activation;
use serde::{Deserialize, Serialize};

use crate::expression::{Expression, LinearNorm};
use crate::model::ModelInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerNormalization {
    #[default]
    None,
    Simplemax,
    Softmax,
}

/// An input neuron fed by an expression over the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralInput {
    pub id: String,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    pub id: String,
    #[serde(default)]
    pub bias: f64,
    pub connections: Vec<Connection>,
}

impl Neuron {
    pub fn new(id: &str, bias: f64, connections: &[(&str, f64)]) -> Self {
        Neuron {
            id: id.to_string(),
            bias,
            connections: connections
                .iter()
                .map(|(from, weight)| Connection { from: from.to_string(), weight: *weight })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeuralLayer {
    /// Overrides the network's activation function.
    #[serde(default)]
    pub activation_function: Option<Activation>,
    #[serde(default)]
    pub normalization_method: Option<LayerNormalization>,
    pub neurons: Vec<Neuron>,
}

impl NeuralLayer {
    pub fn new(neurons: Vec<Neuron>) -> Self {
        NeuralLayer {
            activation_function: None,
            normalization_method: None,
            neurons,
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation_function = Some(activation);
        self
    }

    pub fn with_normalization(mut self, normalization: LayerNormalization) -> Self {
        self.normalization_method = Some(normalization);
        self
    }
}

/// Maps an output neuron to a target category (classification) or to a
/// denormalized target value (regression).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeuralOutput {
    pub output_neuron: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub denormalization: Vec<LinearNorm>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeuralNetwork {
    #[serde(flatten)]
    pub info: ModelInfo,
    pub activation_function: Activation,
    #[serde(default)]
    pub normalization_method: LayerNormalization,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub inputs: Vec<NeuralInput>,
    #[serde(default)]
    pub layers: Vec<NeuralLayer>,
    #[serde(default)]
    pub outputs: Vec<NeuralOutput>,
}

impl NeuralNetwork {
    pub fn new(info: ModelInfo, activation_function: Activation) -> Self {
        NeuralNetwork {
            info,
            activation_function,
            normalization_method: LayerNormalization::None,
            threshold: 0.0,
            inputs: Vec::new(),
            layers: Vec::new(),
            outputs: Vec::new(),
        }
    }
}
