use serde::{Deserialize, Serialize};

use crate::model::ModelInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegressionNormalization {
    #[default]
    None,
    Simplemax,
    Softmax,
    Logit,
    Probit,
    Cloglog,
    Exp,
    Loglog,
    Cauchit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericPredictor {
    pub name: String,
    #[serde(default = "default_exponent")]
    pub exponent: i32,
    pub coefficient: f64,
}

fn default_exponent() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalPredictor {
    pub name: String,
    pub value: String,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionTable {
    pub intercept: f64,
    #[serde(default)]
    pub target_category: Option<String>,
    #[serde(default)]
    pub numeric_predictors: Vec<NumericPredictor>,
    #[serde(default)]
    pub categorical_predictors: Vec<CategoricalPredictor>,
}

impl RegressionTable {
    pub fn new(intercept: f64) -> Self {
        RegressionTable {
            intercept,
            target_category: None,
            numeric_predictors: Vec::new(),
            categorical_predictors: Vec::new(),
        }
    }

    pub fn for_category(mut self, category: &str) -> Self {
        self.target_category = Some(category.to_string());
        self
    }

    pub fn numeric(mut self, name: &str, coefficient: f64, exponent: i32) -> Self {
        self.numeric_predictors.push(NumericPredictor {
            name: name.to_string(),
            exponent,
            coefficient,
        });
        self
    }

    pub fn categorical(mut self, name: &str, value: &str, coefficient: f64) -> Self {
        self.categorical_predictors.push(CategoricalPredictor {
            name: name.to_string(),
            value: value.to_string(),
            coefficient,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionModel {
    #[serde(flatten)]
    pub info: ModelInfo,
    #[serde(default)]
    pub normalization_method: RegressionNormalization,
    #[serde(default)]
    pub tables: Vec<RegressionTable>,
}

impl RegressionModel {
    pub fn new(info: ModelInfo, normalization_method: RegressionNormalization, tables: Vec<RegressionTable>) -> Self {
        RegressionModel {
            info,
            normalization_method,
            tables,
        }
    }
}
