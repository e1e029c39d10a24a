//! Ensemble evaluation and the single place where a [`Model`] becomes an
//! evaluator.
//!
//! [`Model`]: oxidize_pmml_model::Model

pub mod factory;
pub mod evaluator;

pub use factory::new_evaluator;
pub use evaluator::MiningModelEvaluator;
