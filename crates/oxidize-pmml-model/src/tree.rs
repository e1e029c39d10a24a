use serde::{Deserialize, Serialize};

use crate::model::ModelInfo;
use crate::predicate::Predicate;

/// How to continue when a child's guard cannot be decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingValueStrategy {
    LastPrediction,
    NullPrediction,
    DefaultChild,
    WeightedConfidence,
    AggregateNodes,
    #[default]
    None,
}

/// What a node with no true child resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoTrueChildStrategy {
    #[default]
    ReturnNullPrediction,
    ReturnLastPrediction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDistribution {
    pub value: String,
    pub record_count: f64,
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl ScoreDistribution {
    pub fn new(value: &str, record_count: f64) -> Self {
        ScoreDistribution {
            value: value.to_string(),
            record_count,
            probability: None,
            confidence: None,
        }
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub record_count: Option<f64>,
    /// Id of the child to follow when a guard is undecidable.
    #[serde(default)]
    pub default_child: Option<String>,
    pub predicate: Predicate,
    #[serde(default)]
    pub score_distributions: Vec<ScoreDistribution>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Node {
    pub fn new(predicate: Predicate) -> Self {
        Node {
            id: None,
            score: None,
            record_count: None,
            default_child: None,
            predicate,
            score_distributions: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_score(mut self, score: &str) -> Self {
        self.score = Some(score.to_string());
        self
    }

    pub fn with_default_child(mut self, id: &str) -> Self {
        self.default_child = Some(id.to_string());
        self
    }

    pub fn with_distribution(mut self, distributions: Vec<ScoreDistribution>) -> Self {
        self.score_distributions = distributions;
        self
    }

    pub fn with_children(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeModel {
    #[serde(flatten)]
    pub info: ModelInfo,
    #[serde(default)]
    pub missing_value_strategy: MissingValueStrategy,
    #[serde(default = "default_penalty")]
    pub missing_value_penalty: f64,
    #[serde(default)]
    pub no_true_child_strategy: NoTrueChildStrategy,
    pub node: Option<Node>,
}

fn default_penalty() -> f64 {
    1.0
}

impl TreeModel {
    pub fn new(info: ModelInfo, node: Option<Node>) -> Self {
        TreeModel {
            info,
            missing_value_strategy: MissingValueStrategy::default(),
            missing_value_penalty: default_penalty(),
            no_true_child_strategy: NoTrueChildStrategy::default(),
            node,
        }
    }

    pub fn with_missing_value_strategy(mut self, strategy: MissingValueStrategy, penalty: f64) -> Self {
        self.missing_value_strategy = strategy;
        self.missing_value_penalty = penalty;
        self
    }

    pub fn with_no_true_child_strategy(mut self, strategy: NoTrueChildStrategy) -> Self {
        self.no_true_child_strategy = strategy;
        self
    }
}
