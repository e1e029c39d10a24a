use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SimpleOperator {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    IsMissing,
    IsNotMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BooleanOperator {
    IsIn,
    IsNotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompoundOperator {
    And,
    Or,
    Xor,
    Surrogate,
}

/// Guard of a tree node or an ensemble segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Predicate {
    True,
    False,
    #[serde(rename_all = "camelCase")]
    Simple {
        field: String,
        operator: SimpleOperator,
        #[serde(default)]
        value: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SimpleSet {
        field: String,
        boolean_operator: BooleanOperator,
        values: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Compound {
        boolean_operator: CompoundOperator,
        predicates: Vec<Predicate>,
    },
}

impl Predicate {
    pub fn simple(field: &str, operator: SimpleOperator, value: &str) -> Self {
        Predicate::Simple {
            field: field.to_string(),
            operator,
            value: Some(value.to_string()),
        }
    }

    pub fn is_missing(field: &str) -> Self {
        Predicate::Simple {
            field: field.to_string(),
            operator: SimpleOperator::IsMissing,
            value: None,
        }
    }

    pub fn is_in(field: &str, values: &[&str]) -> Self {
        Predicate::SimpleSet {
            field: field.to_string(),
            boolean_operator: BooleanOperator::IsIn,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn compound(boolean_operator: CompoundOperator, predicates: Vec<Predicate>) -> Self {
        Predicate::Compound { boolean_operator, predicates }
    }
}
