//! Feed-forward neural network evaluation.
//!
//! Neurons are evaluated layer by layer in declaration order; a connection
//! may only reference an input or a neuron of an earlier layer.

pub mod evaluator;

pub use evaluator::NeuralNetworkEvaluator;
