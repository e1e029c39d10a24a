use std::collections::HashMap;

use oxidize_pmml_core::Scalar;
use serde::{Deserialize, Serialize};

use crate::model::ModelInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonMeasure {
    #[default]
    Euclidean,
    SquaredEuclidean,
    CityBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContinuousScoringMethod {
    #[default]
    Average,
    Median,
    WeightedAverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoricalScoringMethod {
    #[default]
    MajorityVote,
    WeightedMajorityVote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnnInput {
    pub field: String,
    #[serde(default = "default_field_weight")]
    pub field_weight: f64,
}

fn default_field_weight() -> f64 {
    1.0
}

impl KnnInput {
    pub fn new(field: &str) -> Self {
        KnnInput {
            field: field.to_string(),
            field_weight: default_field_weight(),
        }
    }
}

/// One stored training record, keyed by field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingInstance {
    pub values: HashMap<String, Scalar>,
}

impl TrainingInstance {
    pub fn new(values: &[(&str, Scalar)]) -> Self {
        TrainingInstance {
            values: values.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestNeighborModel {
    #[serde(flatten)]
    pub info: ModelInfo,
    pub number_of_neighbors: usize,
    #[serde(default)]
    pub measure: ComparisonMeasure,
    #[serde(default)]
    pub continuous_scoring_method: ContinuousScoringMethod,
    #[serde(default)]
    pub categorical_scoring_method: CategoricalScoringMethod,
    /// Field of a training instance holding its identifier.
    #[serde(default)]
    pub instance_id_variable: Option<String>,
    /// Added to distances before inverting them into vote weights.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub inputs: Vec<KnnInput>,
    #[serde(default)]
    pub instances: Vec<TrainingInstance>,
}

fn default_threshold() -> f64 {
    0.001
}

impl NearestNeighborModel {
    pub fn new(info: ModelInfo, number_of_neighbors: usize, inputs: Vec<KnnInput>, instances: Vec<TrainingInstance>) -> Self {
        NearestNeighborModel {
            info,
            number_of_neighbors,
            measure: ComparisonMeasure::default(),
            continuous_scoring_method: ContinuousScoringMethod::default(),
            categorical_scoring_method: CategoricalScoringMethod::default(),
            instance_id_variable: None,
            threshold: default_threshold(),
            inputs,
            instances,
        }
    }
}
