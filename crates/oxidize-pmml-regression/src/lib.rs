pub mod evaluator;

pub use evaluator::RegressionModelEvaluator;
