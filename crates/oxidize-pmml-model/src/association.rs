use serde::{Deserialize, Serialize};

use crate::model::ModelInfo;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub value: String,
    /// Restricts the match to one input field.
    #[serde(default)]
    pub field: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itemset {
    pub id: String,
    pub item_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    #[serde(default)]
    pub id: Option<String>,
    pub antecedent: String,
    pub consequent: String,
    pub support: f64,
    pub confidence: f64,
    #[serde(default)]
    pub lift: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationModel {
    #[serde(flatten)]
    pub info: ModelInfo,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub itemsets: Vec<Itemset>,
    #[serde(default)]
    pub rules: Vec<AssociationRule>,
}
