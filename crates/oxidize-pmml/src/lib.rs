//! # OxidizePMML
//!
//! Scores records against PMML-style predictive models.
//!
//! ## Modules
//!
//! - **core**: numeric contexts, `Value<N>` accumulators, scalars, field values, errors
//! - **model**: the immutable model graph (dictionary, transformations, one module per model kind)
//! - **eval**: per-record evaluation context, expressions, predicates, results, output fields
//! - **tree**: decision trees with fast and fully tracked traversal
//! - **regression**: regression tables and link functions
//! - **neural**: feed-forward neural networks
//! - **svm**: support vector machines
//! - **neighbors**: k-nearest-neighbor models
//! - **association**: association rules
//! - **mining**: ensembles of any of the above
//!
//! [`Evaluator`] is the entry point:
//!
//! ```ignore
//! let pmml = oxidize_pmml::from_json(&std::fs::read_to_string("model.json")?)?;
//! let evaluator = Evaluator::new(&pmml)?;
//! let results = evaluator.evaluate([("x", 1.5)])?;
//! ```

pub mod evaluator;
pub mod verification;

pub use evaluator::{from_json, Evaluator};
pub use verification::{VerificationFailure, VerificationReport};

/// Scalars, field values, accumulators and errors.
pub use oxidize_pmml_core as core;

/// The model graph.
pub use oxidize_pmml_model as model;

/// Evaluation context and results.
pub use oxidize_pmml_eval as eval;

/// Tree models.
pub use oxidize_pmml_tree as tree;

/// Regression models.
pub use oxidize_pmml_regression as regression;

/// Neural networks.
pub use oxidize_pmml_neural as neural;

/// Support vector machines.
pub use oxidize_pmml_svm as svm;

/// Nearest-neighbor models.
pub use oxidize_pmml_neighbors as neighbors;

/// Association rules.
pub use oxidize_pmml_association as association;

/// Ensembles.
pub use oxidize_pmml_mining as mining;

pub use oxidize_pmml_core::{FieldValue, PmmlError, PmmlResult, Scalar};
pub use oxidize_pmml_eval::{EvaluatorConfig, ResultValue, Results};
pub use oxidize_pmml_model::{Pmml, ResultFeature};
