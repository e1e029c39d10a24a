pub mod evaluator;

pub use evaluator::{TreeModelEvaluator, Tracking};
