pub mod number;
pub mod value;
pub mod aggregator;
pub mod scalar;
pub mod field_value;
pub mod error;

pub use number::Number;
pub use value::{Activation, Value};
pub use aggregator::{ProbabilityAggregator, ValueAggregator, VoteAggregator};
pub use scalar::{DataType, OpType, Scalar};
pub use field_value::FieldValue;
pub use error::{PmmlError, PmmlResult};
