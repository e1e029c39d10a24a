//! Per-record evaluation machinery shared by every model evaluator.
//!
//! An [`EvaluationContext`] resolves field names for one record, lazily
//! deriving transformed fields and memoizing them. Model evaluators implement
//! [`ModelEvaluator`] and report their output as [`Results`].

pub mod config;
pub mod stack;
pub mod context;
pub mod expression;
pub mod builtins;
pub mod predicate;
pub mod result;
pub mod target;
pub mod output;
pub mod registry;
pub mod evaluator;

pub use config::EvaluatorConfig;
pub use context::EvaluationContext;
pub use expression::evaluate_expression;
pub use predicate::evaluate_predicate;
pub use result::{
    AssociationResult, Classification, ClassificationKind, EntityValue, ResultValue, Results, RuleMatch,
    SegmentResult,
};
pub use target::ModelTarget;
pub use registry::EntityRegistry;
pub use evaluator::ModelEvaluator;
