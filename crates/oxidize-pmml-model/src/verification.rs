use std::collections::HashMap;

use oxidize_pmml_core::Scalar;
use serde::{Deserialize, Serialize};

/// Tolerance for one verified output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationField {
    pub field: String,
    #[serde(default = "default_precision")]
    pub precision: f64,
    #[serde(default = "default_zero_threshold")]
    pub zero_threshold: f64,
}

fn default_precision() -> f64 {
    1e-6
}

fn default_zero_threshold() -> f64 {
    1e-16
}

impl VerificationField {
    pub fn new(field: &str) -> Self {
        VerificationField {
            field: field.to_string(),
            precision: default_precision(),
            zero_threshold: default_zero_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub inputs: HashMap<String, Scalar>,
    pub expected: HashMap<String, Scalar>,
}

/// Expected input/output fixtures embedded in a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelVerification {
    #[serde(default)]
    pub fields: Vec<VerificationField>,
    #[serde(default)]
    pub records: Vec<VerificationRecord>,
}

impl ModelVerification {
    pub fn field(&self, name: &str) -> Option<&VerificationField> {
        self.fields.iter().find(|f| f.field == name)
    }
}
