use thiserror::Error;

/// Error type for model construction and per-record evaluation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PmmlError {
    #[error("Missing structure: {0}")]
    MissingStructure(String),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Unsupported {attribute} value: {value}")]
    UnsupportedVariant { attribute: String, value: String },

    #[error("Cannot coerce {value:?} to {data_type}")]
    TypeCoercion { value: String, data_type: String },

    #[error("Type mismatch: cannot compare {left} with {right}")]
    TypeMismatch { left: String, right: String },

    #[error("Invalid value {value:?} for field {field:?}")]
    InvalidValue { field: String, value: String },

    #[error("Evaluation cycle through field {0:?}")]
    EvaluationCycle(String),

    #[error("Recursion depth {depth} exceeded while evaluating {name:?}")]
    RecursionDepthExceeded { name: String, depth: usize },

    #[error("Node {0} has no score")]
    MissingScore(String),

    #[error("Inconsistent evaluation: {0}")]
    EvaluationConsistency(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Verification failed: {0}")]
    Verification(String),
}

impl PmmlError {
    pub fn unsupported(attribute: impl Into<String>, value: impl std::fmt::Debug) -> Self {
        PmmlError::UnsupportedVariant {
            attribute: attribute.into(),
            value: format!("{:?}", value),
        }
    }

    /// Structural errors make an evaluator unusable; everything else is
    /// scoped to the record being evaluated.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PmmlError::MissingStructure(_)
                | PmmlError::InvalidStructure(_)
                | PmmlError::UnsupportedVariant { .. }
        )
    }
}

pub type PmmlResult<T> = Result<T, PmmlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_classification() {
        assert!(PmmlError::MissingStructure("TreeModel/Node".into()).is_structural());
        assert!(PmmlError::unsupported("missingPredictionTreatment", "SkipSegment").is_structural());
        assert!(!PmmlError::EvaluationCycle("x".into()).is_structural());
        assert!(!PmmlError::MissingScore("3".into()).is_structural());
    }

    #[test]
    fn test_messages() {
        let err = PmmlError::RecursionDepthExceeded { name: "fact".into(), depth: 8 };
        assert_eq!(err.to_string(), "Recursion depth 8 exceeded while evaluating \"fact\"");
    }
}
