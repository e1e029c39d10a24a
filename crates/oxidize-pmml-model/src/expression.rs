use oxidize_pmml_core::{DataType, OpType};
use serde::{Deserialize, Serialize};

use crate::field::Interval;

/// What `NormContinuous` does with inputs outside its breakpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutlierTreatment {
    #[default]
    AsIs,
    AsMissingValues,
    AsExtremeValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearNorm {
    pub orig: f64,
    pub norm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscretizeBin {
    pub interval: Interval,
    pub bin_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueMapping {
    pub input: String,
    pub output: String,
}

/// Expression tree of derived fields and function bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Expression {
    #[serde(rename_all = "camelCase")]
    Constant {
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        data_type: Option<DataType>,
    },
    #[serde(rename_all = "camelCase")]
    FieldRef {
        field: String,
        #[serde(default)]
        map_missing_to: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    NormContinuous {
        field: String,
        norms: Vec<LinearNorm>,
        #[serde(default)]
        outliers: OutlierTreatment,
        #[serde(default)]
        map_missing_to: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    NormDiscrete {
        field: String,
        value: String,
        #[serde(default)]
        map_missing_to: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Discretize {
        field: String,
        bins: Vec<DiscretizeBin>,
        #[serde(default)]
        map_missing_to: Option<String>,
        #[serde(default)]
        default_value: Option<String>,
        #[serde(default)]
        data_type: Option<DataType>,
    },
    #[serde(rename_all = "camelCase")]
    MapValues {
        field: String,
        mappings: Vec<ValueMapping>,
        #[serde(default)]
        map_missing_to: Option<String>,
        #[serde(default)]
        default_value: Option<String>,
        #[serde(default)]
        data_type: Option<DataType>,
    },
    #[serde(rename_all = "camelCase")]
    Apply {
        function: String,
        #[serde(default)]
        arguments: Vec<Expression>,
        #[serde(default)]
        map_missing_to: Option<String>,
        #[serde(default)]
        default_value: Option<String>,
    },
}

impl Expression {
    pub fn constant(value: &str) -> Self {
        Expression::Constant {
            value: Some(value.to_string()),
            data_type: None,
        }
    }

    pub fn missing() -> Self {
        Expression::Constant { value: None, data_type: None }
    }

    pub fn field(name: &str) -> Self {
        Expression::FieldRef {
            field: name.to_string(),
            map_missing_to: None,
        }
    }

    pub fn apply(function: &str, arguments: Vec<Expression>) -> Self {
        Expression::Apply {
            function: function.to_string(),
            arguments,
            map_missing_to: None,
            default_value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedField {
    pub name: String,
    pub data_type: DataType,
    pub op_type: OpType,
    pub expression: Expression,
}

impl DerivedField {
    pub fn new(name: &str, data_type: DataType, op_type: OpType, expression: Expression) -> Self {
        DerivedField {
            name: name.to_string(),
            data_type,
            op_type,
            expression,
        }
    }

    pub fn continuous(name: &str, expression: Expression) -> Self {
        DerivedField::new(name, DataType::Double, OpType::Continuous, expression)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterField {
    pub name: String,
    #[serde(default)]
    pub data_type: Option<DataType>,
}

/// A user-defined function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefineFunction {
    pub name: String,
    pub data_type: DataType,
    pub op_type: OpType,
    pub parameters: Vec<ParameterField>,
    pub expression: Expression,
}

impl DefineFunction {
    pub fn new(name: &str, data_type: DataType, parameters: &[&str], expression: Expression) -> Self {
        DefineFunction {
            name: name.to_string(),
            data_type,
            op_type: OpType::Continuous,
            parameters: parameters
                .iter()
                .map(|p| ParameterField { name: p.to_string(), data_type: None })
                .collect(),
            expression,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationDictionary {
    #[serde(default)]
    pub derived_fields: Vec<DerivedField>,
    #[serde(default)]
    pub define_functions: Vec<DefineFunction>,
}

impl TransformationDictionary {
    pub fn derived_field(&self, name: &str) -> Option<&DerivedField> {
        self.derived_fields.iter().find(|f| f.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&DefineFunction> {
        self.define_functions.iter().find(|f| f.name == name)
    }
}
