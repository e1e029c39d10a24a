use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{PmmlError, PmmlResult};
use crate::scalar::{DataType, OpType, Scalar};

/// An immutable, typed field value.
///
/// Missing values are never represented by a `FieldValue`; callers see
/// `Option<FieldValue>` and `None` means missing.
#[derive(Debug, Clone)]
pub struct FieldValue {
    value: Scalar,
    data_type: DataType,
    op_type: OpType,
    ordering: Option<Arc<[Scalar]>>,
}

impl FieldValue {
    /// Coerce `raw` into `data_type`.
    pub fn create(data_type: DataType, op_type: OpType, raw: impl Into<Scalar>) -> PmmlResult<Self> {
        let value = data_type.parse(&raw.into())?;
        Ok(FieldValue {
            value,
            data_type,
            op_type,
            ordering: None,
        })
    }

    /// Create an ordinal value ranked by the declared category order.
    pub fn ordinal(data_type: DataType, raw: impl Into<Scalar>, ordering: Arc<[Scalar]>) -> PmmlResult<Self> {
        let mut value = FieldValue::create(data_type, OpType::Ordinal, raw)?;
        value.ordering = Some(ordering);
        Ok(value)
    }

    /// Type a scalar by its own shape: numbers are continuous, the rest categorical.
    pub fn infer(raw: Scalar) -> Self {
        let data_type = raw.data_type();
        let op_type = if data_type.is_numeric() {
            OpType::Continuous
        } else {
            OpType::Categorical
        };
        FieldValue {
            value: raw,
            data_type,
            op_type,
            ordering: None,
        }
    }

    pub fn is_missing(value: Option<&FieldValue>) -> bool {
        value.is_none()
    }

    pub fn value(&self) -> &Scalar {
        &self.value
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn op_type(&self) -> OpType {
        self.op_type
    }

    /// Re-type this value, keeping the ordering when it stays ordinal.
    pub fn cast(&self, data_type: DataType, op_type: OpType) -> PmmlResult<FieldValue> {
        let mut value = FieldValue::create(data_type, op_type, self.value.clone())?;
        if op_type == OpType::Ordinal {
            value.ordering = self.ordering.clone();
        }
        Ok(value)
    }

    /// Parse model-graph text as a value of this field's type.
    pub fn sibling(&self, raw: &str) -> PmmlResult<FieldValue> {
        let mut value = FieldValue::create(self.data_type, self.op_type, raw)?;
        value.ordering = self.ordering.clone();
        Ok(value)
    }

    pub fn as_f64(&self) -> PmmlResult<f64> {
        match &self.value {
            Scalar::Boolean(v) => Ok(if *v { 1.0 } else { 0.0 }),
            other => other.as_f64().ok_or_else(|| PmmlError::TypeMismatch {
                left: self.data_type.to_string(),
                right: DataType::Double.to_string(),
            }),
        }
    }

    pub fn as_bool(&self) -> PmmlResult<bool> {
        match DataType::Boolean.parse(&self.value)? {
            Scalar::Boolean(v) => Ok(v),
            _ => Err(PmmlError::TypeMismatch {
                left: self.data_type.to_string(),
                right: DataType::Boolean.to_string(),
            }),
        }
    }

    /// Canonical text form, used for category keys.
    pub fn as_category(&self) -> String {
        self.value.to_string()
    }

    pub fn compare_to(&self, other: &FieldValue) -> PmmlResult<Ordering> {
        if self.op_type == OpType::Ordinal && other.op_type == OpType::Ordinal {
            if let Some(ordering) = self.ordering.as_ref().or(other.ordering.as_ref()) {
                let left = self.rank(ordering)?;
                let right = other.rank(ordering)?;
                return Ok(left.cmp(&right));
            }
        }

        match (&self.value, &other.value) {
            (Scalar::String(a), Scalar::String(b)) => Ok(a.cmp(b)),
            (Scalar::Boolean(a), Scalar::Boolean(b)) => Ok(a.cmp(b)),
            (a, b) if self.data_type.is_numeric() && other.data_type.is_numeric() => {
                let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                let ordering = if self.data_type == DataType::Float || other.data_type == DataType::Float {
                    (a as f32).partial_cmp(&(b as f32))
                } else {
                    a.partial_cmp(&b)
                };
                ordering.ok_or_else(|| self.mismatch(other))
            }
            _ => Err(self.mismatch(other)),
        }
    }

    pub fn equals(&self, other: &FieldValue) -> PmmlResult<bool> {
        Ok(self.compare_to(other)? == Ordering::Equal)
    }

    pub fn compare_to_raw(&self, raw: &str) -> PmmlResult<Ordering> {
        self.compare_to(&self.sibling(raw)?)
    }

    pub fn equals_raw(&self, raw: &str) -> PmmlResult<bool> {
        self.equals(&self.sibling(raw)?)
    }

    fn rank(&self, ordering: &[Scalar]) -> PmmlResult<usize> {
        ordering
            .iter()
            .position(|candidate| candidate == &self.value)
            .ok_or_else(|| PmmlError::InvalidValue {
                field: "ordinal".into(),
                value: self.value.to_string(),
            })
    }

    fn mismatch(&self, other: &FieldValue) -> PmmlError {
        PmmlError::TypeMismatch {
            left: self.data_type.to_string(),
            right: other.data_type.to_string(),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other).unwrap_or(false)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
