use serde::{Deserialize, Serialize};

use crate::model::ModelInfo;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Kernel {
    Linear,
    Polynomial { gamma: f64, coef0: f64, degree: f64 },
    RadialBasis { gamma: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SvmClassificationMethod {
    OneAgainstAll,
    #[default]
    OneAgainstOne,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportVector {
    pub id: String,
    pub values: Vec<f64>,
}

/// Support vectors, aligned with the input fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorDictionary {
    pub fields: Vec<String>,
    pub vectors: Vec<SupportVector>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvmCoefficient {
    pub vector_id: String,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportVectorMachine {
    #[serde(default)]
    pub target_category: Option<String>,
    #[serde(default)]
    pub alternate_target_category: Option<String>,
    /// The `b` term.
    #[serde(default)]
    pub absolute_value: f64,
    pub coefficients: Vec<SvmCoefficient>,
    /// Overrides the model-level threshold.
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl SupportVectorMachine {
    pub fn new(absolute_value: f64, coefficients: &[(&str, f64)]) -> Self {
        SupportVectorMachine {
            target_category: None,
            alternate_target_category: None,
            absolute_value,
            coefficients: coefficients
                .iter()
                .map(|(id, c)| SvmCoefficient { vector_id: id.to_string(), coefficient: *c })
                .collect(),
            threshold: None,
        }
    }

    pub fn for_categories(mut self, target: &str, alternate: Option<&str>) -> Self {
        self.target_category = Some(target.to_string());
        self.alternate_target_category = alternate.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportVectorMachineModel {
    #[serde(flatten)]
    pub info: ModelInfo,
    pub kernel: Kernel,
    #[serde(default)]
    pub classification_method: SvmClassificationMethod,
    #[serde(default)]
    pub threshold: f64,
    pub vector_dictionary: VectorDictionary,
    #[serde(default)]
    pub machines: Vec<SupportVectorMachine>,
}

impl SupportVectorMachineModel {
    pub fn new(info: ModelInfo, kernel: Kernel, vector_dictionary: VectorDictionary, machines: Vec<SupportVectorMachine>) -> Self {
        SupportVectorMachineModel {
            info,
            kernel,
            classification_method: SvmClassificationMethod::default(),
            threshold: 0.0,
            vector_dictionary,
            machines,
        }
    }
}
