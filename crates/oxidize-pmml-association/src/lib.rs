pub mod evaluator;

pub use evaluator::AssociationModelEvaluator;
