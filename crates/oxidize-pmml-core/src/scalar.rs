use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PmmlError, PmmlResult};

/// Declared data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    String,
    Integer,
    Float,
    Double,
    Boolean,
    Date,
    Time,
    DateTime,
}

/// Operational type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpType {
    Categorical,
    Ordinal,
    Continuous,
}

/// A raw, untyped-by-declaration value as supplied by callers or stored in
/// the model graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Float(f32),
    String(String),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(v) => Some(*v as f64),
            Scalar::Double(v) => Some(*v),
            Scalar::Float(v) => Some(*v as f64),
            Scalar::Boolean(_) | Scalar::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// The data type this scalar naturally carries.
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::Boolean(_) => DataType::Boolean,
            Scalar::Integer(_) => DataType::Integer,
            Scalar::Double(_) => DataType::Double,
            Scalar::Float(_) => DataType::Float,
            Scalar::String(_) => DataType::String,
        }
    }

    /// NaN numbers count as missing input, like absent ones.
    pub fn is_nan(&self) -> bool {
        match self {
            Scalar::Double(v) => v.is_nan(),
            Scalar::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Parse model-graph text, picking the narrowest fitting type.
    pub fn infer(raw: &str) -> Scalar {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Scalar::Integer(i);
        }
        if let Ok(d) = trimmed.parse::<f64>() {
            return Scalar::Double(d);
        }
        Scalar::String(raw.to_string())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(v) => write!(f, "{}", v),
            Scalar::Integer(v) => write!(f, "{}", v),
            Scalar::Double(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self { Scalar::Double(v) }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self { Scalar::Float(v) }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self { Scalar::Integer(v) }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self { Scalar::Integer(v as i64) }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self { Scalar::Boolean(v) }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self { Scalar::String(v.to_string()) }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self { Scalar::String(v) }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::DateTime => "dateTime",
        };
        f.write_str(name)
    }
}

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Integer | DataType::Float | DataType::Double)
    }

    /// Coerce a raw value into this type's canonical representation.
    pub fn parse(self, raw: &Scalar) -> PmmlResult<Scalar> {
        let fail = || PmmlError::TypeCoercion {
            value: raw.to_string(),
            data_type: self.to_string(),
        };

        match self {
            DataType::String => Ok(match raw {
                Scalar::String(s) => Scalar::String(s.clone()),
                other => Scalar::String(other.to_string()),
            }),
            DataType::Integer => match raw {
                Scalar::Integer(v) => Ok(Scalar::Integer(*v)),
                Scalar::Boolean(v) => Ok(Scalar::Integer(*v as i64)),
                Scalar::Double(_) | Scalar::Float(_) => {
                    let v = raw.as_f64().ok_or_else(fail)?;
                    integral(v).map(Scalar::Integer).ok_or_else(fail)
                }
                Scalar::String(s) => {
                    let s = s.trim();
                    if let Ok(v) = s.parse::<i64>() {
                        return Ok(Scalar::Integer(v));
                    }
                    s.parse::<f64>()
                        .ok()
                        .and_then(integral)
                        .map(Scalar::Integer)
                        .ok_or_else(fail)
                }
            },
            DataType::Float => match raw {
                Scalar::Boolean(v) => Ok(Scalar::Float(if *v { 1.0 } else { 0.0 })),
                Scalar::String(s) => s.trim().parse::<f32>().map(Scalar::Float).map_err(|_| fail()),
                other => other.as_f64().map(|v| Scalar::Float(v as f32)).ok_or_else(fail),
            },
            DataType::Double => match raw {
                Scalar::Boolean(v) => Ok(Scalar::Double(if *v { 1.0 } else { 0.0 })),
                Scalar::String(s) => s.trim().parse::<f64>().map(Scalar::Double).map_err(|_| fail()),
                other => other.as_f64().map(Scalar::Double).ok_or_else(fail),
            },
            DataType::Boolean => match raw {
                Scalar::Boolean(v) => Ok(Scalar::Boolean(*v)),
                Scalar::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Ok(Scalar::Boolean(true)),
                    "false" | "0" => Ok(Scalar::Boolean(false)),
                    _ => Err(fail()),
                },
                other => match other.as_f64() {
                    Some(v) if v == 1.0 => Ok(Scalar::Boolean(true)),
                    Some(v) if v == 0.0 => Ok(Scalar::Boolean(false)),
                    _ => Err(fail()),
                },
            },
            DataType::Date | DataType::Time | DataType::DateTime => {
                Err(PmmlError::unsupported("dataType", self))
            }
        }
    }
}

fn integral(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}
