use oxidize_pmml_core::{DataType, OpType};
use serde::{Deserialize, Serialize};

/// Interval closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Closure {
    OpenOpen,
    OpenClosed,
    ClosedOpen,
    ClosedClosed,
}

/// A numeric interval; an absent margin is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub closure: Closure,
    #[serde(default)]
    pub left_margin: Option<f64>,
    #[serde(default)]
    pub right_margin: Option<f64>,
}

impl Interval {
    pub fn new(closure: Closure, left_margin: Option<f64>, right_margin: Option<f64>) -> Self {
        Interval { closure, left_margin, right_margin }
    }

    pub fn contains(&self, x: f64) -> bool {
        let left_closed = matches!(self.closure, Closure::ClosedOpen | Closure::ClosedClosed);
        let right_closed = matches!(self.closure, Closure::OpenClosed | Closure::ClosedClosed);

        let above_left = match self.left_margin {
            Some(l) if left_closed => x >= l,
            Some(l) => x > l,
            None => true,
        };
        let below_right = match self.right_margin {
            Some(r) if right_closed => x <= r,
            Some(r) => x < r,
            None => true,
        };
        above_left && below_right
    }
}

/// A raw input field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataField {
    pub name: String,
    pub data_type: DataType,
    pub op_type: OpType,
    /// Valid categories; for ordinal fields also their order.
    #[serde(default)]
    pub values: Vec<String>,
    /// Valid ranges of a continuous field.
    #[serde(default)]
    pub intervals: Vec<Interval>,
}

impl DataField {
    pub fn new(name: &str, data_type: DataType, op_type: OpType) -> Self {
        DataField {
            name: name.to_string(),
            data_type,
            op_type,
            values: Vec::new(),
            intervals: Vec::new(),
        }
    }

    pub fn continuous(name: &str) -> Self {
        DataField::new(name, DataType::Double, OpType::Continuous)
    }

    pub fn categorical(name: &str, values: &[&str]) -> Self {
        DataField {
            values: values.iter().map(|v| v.to_string()).collect(),
            ..DataField::new(name, DataType::String, OpType::Categorical)
        }
    }

    pub fn ordinal(name: &str, values: &[&str]) -> Self {
        DataField {
            values: values.iter().map(|v| v.to_string()).collect(),
            ..DataField::new(name, DataType::String, OpType::Ordinal)
        }
    }

    pub fn with_intervals(mut self, intervals: Vec<Interval>) -> Self {
        self.intervals = intervals;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataDictionary {
    #[serde(default)]
    pub fields: Vec<DataField>,
}

impl DataDictionary {
    pub fn new(fields: Vec<DataField>) -> Self {
        DataDictionary { fields }
    }

    pub fn field(&self, name: &str) -> Option<&DataField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_closures() {
        let i = Interval::new(Closure::ClosedOpen, Some(0.0), Some(1.0));
        assert!(i.contains(0.0));
        assert!(!i.contains(1.0));

        let i = Interval::new(Closure::OpenClosed, None, Some(5.0));
        assert!(i.contains(-1e9));
        assert!(i.contains(5.0));
    }

    #[test]
    fn test_dictionary_lookup() {
        let dict = DataDictionary::new(vec![DataField::continuous("x"), DataField::categorical("c", &["a"])]);
        assert_eq!(dict.field("c").unwrap().values, vec!["a".to_string()]);
        assert!(dict.field("y").is_none());
    }
}
