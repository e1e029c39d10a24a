use std::collections::BTreeSet;

use oxidize_pmml_core::{FieldValue, OpType, PmmlError, PmmlResult, Scalar};
use oxidize_pmml_model::{ModelInfo, OutputField, ResultFeature};

use crate::result::{ResultValue, Results};
use crate::target::ModelTarget;

/// Reject output fields asking for a feature the evaluator cannot produce.
pub fn check_features(info: &ModelInfo, features: &BTreeSet<ResultFeature>) -> PmmlResult<()> {
    match info.output.fields.iter().find(|f| !features.contains(&f.feature)) {
        Some(field) => Err(PmmlError::unsupported(format!("OutputField {:?}", field.name), field.feature)),
        None => Ok(()),
    }
}

/// Compute the model's output fields from its target result and add them
/// to `results`.
pub fn apply_outputs(info: &ModelInfo, target: &ModelTarget, results: &mut Results) -> PmmlResult<()> {
    let mut computed = Vec::with_capacity(info.output.fields.len());
    {
        let prediction = results.get(&target.name);
        for field in &info.output.fields {
            computed.push((field.name.as_str(), output_value(field, prediction)?));
        }
    }
    for (name, value) in computed {
        results.insert(name, value);
    }
    Ok(())
}

/// Output fields of `info` as field values, for chaining into later models.
pub fn output_values(info: &ModelInfo, results: &Results) -> PmmlResult<Vec<(String, Option<FieldValue>)>> {
    info.output
        .fields
        .iter()
        .map(|field| {
            let value = match results.get(&field.name).and_then(ResultValue::predicted_value) {
                Some(scalar) => Some(field_value(field, scalar)?),
                None => None,
            };
            Ok((field.name.clone(), value))
        })
        .collect()
}

fn output_value(field: &OutputField, prediction: Option<&ResultValue>) -> PmmlResult<Option<ResultValue>> {
    let prediction = match prediction {
        Some(prediction) => prediction,
        None => return Ok(None),
    };

    let scalar = match field.feature {
        ResultFeature::PredictedValue => prediction.predicted_value().cloned(),
        ResultFeature::Probability | ResultFeature::Affinity | ResultFeature::Confidence => {
            let classification = match prediction.classification() {
                Some(c) => c,
                None => return Ok(None),
            };
            let category = match &field.value {
                Some(category) => category.clone(),
                None => classification.result.to_string(),
            };
            let value = if field.feature == ResultFeature::Confidence {
                classification.confidence(&category)
            } else {
                Some(classification.value(&category).unwrap_or(0.0))
            };
            value.map(Scalar::Double)
        }
        ResultFeature::EntityId => prediction.entity_id().map(Scalar::from),
        ResultFeature::DecisionPath => {
            return Ok(prediction.decision_path().map(|path| {
                ResultValue::Collection(
                    path.iter()
                        .map(|id| Some(ResultValue::Value(Scalar::from(id.as_str()))))
                        .collect(),
                )
            }));
        }
        ResultFeature::RuleId => {
            let rank = field.rank.unwrap_or(1).max(1);
            prediction
                .association()
                .and_then(|a| a.rules.get(rank - 1))
                .map(|rule| Scalar::from(rule.id.as_str()))
        }
    };

    match (scalar, field.data_type) {
        (Some(scalar), Some(data_type)) => Ok(Some(ResultValue::Value(data_type.parse(&scalar)?))),
        (scalar, _) => Ok(scalar.map(ResultValue::Value)),
    }
}

fn field_value(field: &OutputField, scalar: &Scalar) -> PmmlResult<FieldValue> {
    match field.data_type {
        Some(data_type) => {
            let op_type = if data_type.is_numeric() { OpType::Continuous } else { OpType::Categorical };
            FieldValue::create(data_type, op_type, scalar.clone())
        }
        None => Ok(FieldValue::infer(scalar.clone())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::result::{AssociationResult, Classification, ClassificationKind, EntityValue, RuleMatch};
    use oxidize_pmml_core::DataType;
    use oxidize_pmml_model::{MiningFunction, MiningSchema, Output};

    fn info(fields: Vec<OutputField>) -> ModelInfo {
        let mut info = ModelInfo::new(MiningFunction::Classification, MiningSchema::default());
        info.output = Output::new(fields);
        info
    }

    fn target() -> ModelTarget {
        ModelTarget { name: "y".into(), data_type: DataType::String, op_type: OpType::Categorical }
    }

    fn classification() -> ResultValue {
        let values: BTreeMap<String, f64> = [("yes".to_string(), 0.7), ("no".to_string(), 0.3)].into_iter().collect();
        let confidences = values.iter().map(|(k, v)| (k.clone(), v / 2.0)).collect();
        ResultValue::Classification(
            Classification::new(ClassificationKind::Probability, Scalar::from("yes"), values)
                .with_confidences(confidences)
                .with_entity(Some("4".into()), vec!["1".into(), "4".into()]),
        )
    }

    #[test]
    fn test_classification_outputs() {
        let info = info(vec![
            OutputField::new("label", ResultFeature::PredictedValue),
            OutputField::new("p_no", ResultFeature::Probability).with_value("no"),
            OutputField::new("p_best", ResultFeature::Probability),
            OutputField::new("c_yes", ResultFeature::Confidence).with_value("yes"),
            OutputField::new("node", ResultFeature::EntityId),
            OutputField::new("path", ResultFeature::DecisionPath),
        ]);
        let mut results = Results::single("y", Some(classification()));
        apply_outputs(&info, &target(), &mut results).unwrap();

        let scalar = |name: &str| results.get(name).and_then(ResultValue::predicted_value).cloned();
        assert_eq!(scalar("label"), Some(Scalar::from("yes")));
        assert_eq!(scalar("p_no"), Some(Scalar::Double(0.3)));
        assert_eq!(scalar("p_best"), Some(Scalar::Double(0.7)));
        assert_eq!(scalar("c_yes"), Some(Scalar::Double(0.35)));
        assert_eq!(scalar("node"), Some(Scalar::from("4")));
        match results.get("path") {
            Some(ResultValue::Collection(ids)) => assert_eq!(ids.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_prediction_gives_missing_outputs() {
        let info = info(vec![OutputField::new("label", ResultFeature::PredictedValue)]);
        let mut results = Results::single("y", None);
        apply_outputs(&info, &target(), &mut results).unwrap();
        assert!(results.contains("label"));
        assert!(results.get("label").is_none());
    }

    #[test]
    fn test_rule_ranks() {
        let info = info(vec![
            OutputField::new("top", ResultFeature::RuleId),
            OutputField::new("second", ResultFeature::RuleId).with_rank(2),
            OutputField::new("third", ResultFeature::RuleId).with_rank(3),
        ]);
        let rule = |id: &str| RuleMatch { id: id.into(), support: 0.1, confidence: 0.5, consequent: vec![] };
        let association = AssociationResult { rules: vec![rule("r1"), rule("r2")], recommendations: vec![] };
        let mut results = Results::single("y", Some(ResultValue::Association(association)));
        apply_outputs(&info, &target(), &mut results).unwrap();
        assert_eq!(results.get("second").and_then(ResultValue::predicted_value), Some(&Scalar::from("r2")));
        assert!(results.get("third").is_none());
    }

    #[test]
    fn test_typed_output_and_chaining() {
        let mut field = OutputField::new("score", ResultFeature::PredictedValue);
        field.data_type = Some(DataType::Double);
        let info = info(vec![field]);
        let entity = EntityValue { value: Scalar::Integer(3), entity_id: None, decision_path: vec![] };
        let mut results = Results::single("y", Some(ResultValue::Entity(entity)));
        apply_outputs(&info, &target(), &mut results).unwrap();

        let chained = output_values(&info, &results).unwrap();
        assert_eq!(chained.len(), 1);
        assert_eq!(chained[0].0, "score");
        assert_eq!(chained[0].1.as_ref().unwrap().data_type(), DataType::Double);
    }

    #[test]
    fn test_unsupported_feature_rejected() {
        let info = info(vec![OutputField::new("node", ResultFeature::EntityId)]);
        let features: BTreeSet<_> = [ResultFeature::PredictedValue].into_iter().collect();
        assert!(check_features(&info, &features).unwrap_err().is_structural());
    }
}
