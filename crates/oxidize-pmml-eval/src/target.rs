use oxidize_pmml_core::{DataType, OpType, PmmlResult, Scalar};
use oxidize_pmml_model::{MiningFunction, ModelInfo, Pmml};

/// The field a model predicts.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTarget {
    pub name: String,
    pub data_type: DataType,
    pub op_type: OpType,
}

impl ModelTarget {
    /// Result name used when the mining schema declares no target.
    pub const DEFAULT_NAME: &'static str = "_target";

    pub fn resolve(pmml: &Pmml, info: &ModelInfo) -> Self {
        let declared = info
            .mining_schema
            .target()
            .map(|field| (field.name.as_str(), pmml.data_dictionary.field(&field.name)));

        let (default_type, default_op) = match info.mining_function {
            MiningFunction::Regression => (DataType::Double, OpType::Continuous),
            _ => (DataType::String, OpType::Categorical),
        };

        match declared {
            Some((name, Some(field))) => ModelTarget {
                name: name.to_string(),
                data_type: field.data_type,
                op_type: field.op_type,
            },
            Some((name, None)) => ModelTarget {
                name: name.to_string(),
                data_type: default_type,
                op_type: default_op,
            },
            None => ModelTarget {
                name: Self::DEFAULT_NAME.to_string(),
                data_type: default_type,
                op_type: default_op,
            },
        }
    }

    /// Parse model-graph text (a score, a category) as a target value.
    pub fn parse(&self, raw: &str) -> PmmlResult<Scalar> {
        self.data_type.parse(&Scalar::from(raw))
    }
}
