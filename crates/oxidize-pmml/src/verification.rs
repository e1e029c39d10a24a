use std::fmt;

use oxidize_pmml_core::{PmmlError, PmmlResult, Scalar};
use oxidize_pmml_eval::{ResultValue, Results};
use oxidize_pmml_model::{ModelVerification, VerificationField};

/// One mismatch between a fixture and what the model produced.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationFailure {
    /// Position of the record in the fixture list.
    pub record: usize,
    /// `None` when the record failed to evaluate at all.
    pub field: Option<String>,
    pub expected: Option<Scalar>,
    pub actual: Option<Scalar>,
    pub error: Option<String>,
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.field, &self.error) {
            (_, Some(error)) => write!(f, "record {}: {}", self.record, error),
            (Some(field), None) => write!(
                f,
                "record {}: {} expected {}, got {}",
                self.record,
                field,
                display(self.expected.as_ref()),
                display(self.actual.as_ref())
            ),
            (None, None) => write!(f, "record {}", self.record),
        }
    }
}

fn display(value: Option<&Scalar>) -> String {
    value.map_or_else(|| "missing".to_string(), Scalar::to_string)
}

/// Outcome of checking a model against its embedded fixtures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationReport {
    pub records: usize,
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn check(&self) -> PmmlResult<()> {
        match self.failures.first() {
            None => Ok(()),
            Some(first) => Err(PmmlError::Verification(format!(
                "{} mismatches over {} records, first: {}",
                self.failures.len(),
                self.records,
                first
            ))),
        }
    }
}

/// Run every fixture record through `evaluate` and compare the fields it
/// lists as expected.
pub(crate) fn verify<F>(fixtures: &ModelVerification, mut evaluate: F) -> VerificationReport
where
    F: FnMut(&[(&str, Scalar)]) -> PmmlResult<Results>,
{
    let mut report = VerificationReport {
        records: fixtures.records.len(),
        failures: Vec::new(),
    };

    for (index, record) in fixtures.records.iter().enumerate() {
        let inputs: Vec<(&str, Scalar)> = record.inputs.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        let results = match evaluate(&inputs) {
            Ok(results) => results,
            Err(err) => {
                report.failures.push(VerificationFailure {
                    record: index,
                    field: None,
                    expected: None,
                    actual: None,
                    error: Some(err.to_string()),
                });
                continue;
            }
        };

        let mut expected: Vec<(&String, &Scalar)> = record.expected.iter().collect();
        expected.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in expected {
            let actual = results.get(name).and_then(ResultValue::predicted_value);
            let tolerance = fixtures.field(name).cloned().unwrap_or_else(|| VerificationField::new(name));
            if !agrees(value, actual, &tolerance) {
                report.failures.push(VerificationFailure {
                    record: index,
                    field: Some(name.clone()),
                    expected: Some(value.clone()),
                    actual: actual.cloned(),
                    error: None,
                });
            }
        }
    }
    report
}

/// Numbers agree within a relative precision, and anything within the zero
/// threshold of zero counts as zero. Everything else compares as text.
fn agrees(expected: &Scalar, actual: Option<&Scalar>, tolerance: &VerificationField) -> bool {
    let actual = match actual {
        Some(actual) => actual,
        None => return false,
    };
    match (expected.as_f64(), actual.as_f64()) {
        (Some(e), Some(a)) => {
            if e.abs() <= tolerance.zero_threshold {
                return a.abs() <= tolerance.zero_threshold;
            }
            (a - e).abs() <= tolerance.precision * e.abs()
        }
        _ => expected.to_string() == actual.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tolerance(precision: f64) -> VerificationField {
        VerificationField {
            precision,
            ..VerificationField::new("y")
        }
    }

    #[test]
    fn test_relative_precision() {
        let e = Scalar::Double(100.0);
        assert!(agrees(&e, Some(&Scalar::Double(100.0005)), &tolerance(1e-5)));
        assert!(!agrees(&e, Some(&Scalar::Double(100.01)), &tolerance(1e-5)));
        assert!(agrees(&e, Some(&Scalar::Float(100.0)), &tolerance(1e-6)));
        assert!(!agrees(&e, None, &tolerance(1e-6)));
    }

    #[test]
    fn test_zero_threshold() {
        let zero = Scalar::Double(0.0);
        assert!(agrees(&zero, Some(&Scalar::Double(1e-20)), &tolerance(1e-6)));
        assert!(!agrees(&zero, Some(&Scalar::Double(1e-3)), &tolerance(1e-6)));
    }

    #[test]
    fn test_categories_compare_as_text() {
        assert!(agrees(&Scalar::from("yes"), Some(&Scalar::from("yes")), &tolerance(1e-6)));
        assert!(!agrees(&Scalar::from("yes"), Some(&Scalar::from("no")), &tolerance(1e-6)));
        assert!(agrees(&Scalar::from("1"), Some(&Scalar::Integer(1)), &tolerance(1e-6)));
    }

    #[test]
    fn test_report_result() {
        let report = VerificationReport {
            records: 2,
            failures: vec![VerificationFailure {
                record: 1,
                field: Some("y".into()),
                expected: Some(Scalar::Double(1.0)),
                actual: None,
                error: None,
            }],
        };
        let err = report.check().unwrap_err();
        assert_eq!(
            err,
            PmmlError::Verification("1 mismatches over 2 records, first: record 1: y expected 1, got missing".into())
        );
        assert!(VerificationReport::default().check().is_ok());
    }
}
