use oxidize_pmml_core::DataType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldUsage {
    #[default]
    Active,
    Target,
    Supplementary,
    Group,
}

/// What to do with a value outside the declared categories or intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvalidValueTreatment {
    ReturnInvalid,
    #[default]
    AsMissing,
    AsIs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningField {
    pub name: String,
    #[serde(default)]
    pub usage_type: FieldUsage,
    #[serde(default)]
    pub missing_value_replacement: Option<String>,
    #[serde(default)]
    pub invalid_value_treatment: InvalidValueTreatment,
}

impl MiningField {
    pub fn active(name: &str) -> Self {
        MiningField {
            name: name.to_string(),
            usage_type: FieldUsage::Active,
            missing_value_replacement: None,
            invalid_value_treatment: InvalidValueTreatment::default(),
        }
    }

    pub fn target(name: &str) -> Self {
        MiningField {
            usage_type: FieldUsage::Target,
            ..MiningField::active(name)
        }
    }

    pub fn with_replacement(mut self, replacement: &str) -> Self {
        self.missing_value_replacement = Some(replacement.to_string());
        self
    }

    pub fn with_invalid_treatment(mut self, treatment: InvalidValueTreatment) -> Self {
        self.invalid_value_treatment = treatment;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiningSchema {
    #[serde(default)]
    pub fields: Vec<MiningField>,
}

impl MiningSchema {
    pub fn new(fields: Vec<MiningField>) -> Self {
        MiningSchema { fields }
    }

    pub fn field(&self, name: &str) -> Option<&MiningField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn target(&self) -> Option<&MiningField> {
        self.fields.iter().find(|f| f.usage_type == FieldUsage::Target)
    }

    pub fn active_fields(&self) -> impl Iterator<Item = &MiningField> {
        self.fields.iter().filter(|f| f.usage_type == FieldUsage::Active)
    }
}

/// A result feature an evaluator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultFeature {
    PredictedValue,
    Probability,
    Confidence,
    Affinity,
    EntityId,
    DecisionPath,
    RuleId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputField {
    pub name: String,
    pub feature: ResultFeature,
    /// Category for probability, confidence and affinity features.
    #[serde(default)]
    pub value: Option<String>,
    /// 1-based rank for rule features.
    #[serde(default)]
    pub rank: Option<usize>,
    #[serde(default)]
    pub data_type: Option<DataType>,
}

impl OutputField {
    pub fn new(name: &str, feature: ResultFeature) -> Self {
        OutputField {
            name: name.to_string(),
            feature,
            value: None,
            rank: None,
            data_type: None,
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = Some(rank);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub fields: Vec<OutputField>,
}

impl Output {
    pub fn new(fields: Vec<OutputField>) -> Self {
        Output { fields }
    }

    pub fn requests(&self, feature: ResultFeature) -> bool {
        self.fields.iter().any(|f| f.feature == feature)
    }
}
