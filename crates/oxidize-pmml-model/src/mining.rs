use serde::{Deserialize, Serialize};

use crate::model::{Model, ModelInfo};
use crate::predicate::Predicate;

/// How segment results combine into the ensemble result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MultipleModelMethod {
    SelectFirst,
    SelectAll,
    ModelChain,
    Average,
    WeightedAverage,
    Median,
    WeightedMedian,
    Sum,
    WeightedSum,
    MajorityVote,
    WeightedMajorityVote,
    Max,
}

impl MultipleModelMethod {
    /// Whether every firing segment feeds an accumulator.
    pub fn is_aggregating(self) -> bool {
        !matches!(
            self,
            MultipleModelMethod::SelectFirst | MultipleModelMethod::SelectAll | MultipleModelMethod::ModelChain
        )
    }
}

/// What a segment whose prediction is missing does to the segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingPredictionTreatment {
    ReturnMissing,
    SkipSegment,
    #[default]
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub predicate: Predicate,
    pub model: Option<Model>,
}

fn default_weight() -> f64 {
    1.0
}

impl Segment {
    pub fn new(id: &str, predicate: Predicate, model: Model) -> Self {
        Segment {
            id: Some(id.to_string()),
            weight: default_weight(),
            predicate,
            model: Some(model),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segmentation {
    pub multiple_model_method: Option<MultipleModelMethod>,
    #[serde(default)]
    pub missing_prediction_treatment: MissingPredictionTreatment,
    /// Largest tolerated fraction of segments without a prediction.
    #[serde(default = "default_threshold")]
    pub missing_threshold: f64,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

fn default_threshold() -> f64 {
    1.0
}

impl Segmentation {
    pub fn new(method: MultipleModelMethod, segments: Vec<Segment>) -> Self {
        Segmentation {
            multiple_model_method: Some(method),
            missing_prediction_treatment: MissingPredictionTreatment::default(),
            missing_threshold: default_threshold(),
            segments,
        }
    }

    pub fn with_missing_prediction_treatment(mut self, treatment: MissingPredictionTreatment) -> Self {
        self.missing_prediction_treatment = treatment;
        self
    }

    pub fn with_missing_threshold(mut self, threshold: f64) -> Self {
        self.missing_threshold = threshold;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningModel {
    #[serde(flatten)]
    pub info: ModelInfo,
    pub segmentation: Option<Segmentation>,
}

impl MiningModel {
    pub fn new(info: ModelInfo, segmentation: Segmentation) -> Self {
        MiningModel {
            info,
            segmentation: Some(segmentation),
        }
    }
}
