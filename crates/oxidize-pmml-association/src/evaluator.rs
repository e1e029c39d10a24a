use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use oxidize_pmml_core::{PmmlError, PmmlResult};
use oxidize_pmml_eval::output;
use oxidize_pmml_eval::{
    AssociationResult, EntityRegistry, EvaluationContext, EvaluatorConfig, ModelEvaluator, ModelTarget, ResultValue,
    Results, RuleMatch,
};
use oxidize_pmml_model::{AssociationModel, AssociationRule, Item, MiningFunction, ModelInfo, Pmml, ResultFeature};

/// Matches a record against association rules.
///
/// The values of the record's active fields form the transaction. A rule
/// fires when every item of its antecedent is in the transaction.
pub struct AssociationModelEvaluator<'m> {
    model: &'m AssociationModel,
    itemsets: HashMap<&'m str, Vec<&'m Item>>,
    target: ModelTarget,
    registry: OnceLock<EntityRegistry<'m, AssociationRule>>,
}

impl<'m> AssociationModelEvaluator<'m> {
    pub fn new(pmml: &'m Pmml, model: &'m AssociationModel, _config: &EvaluatorConfig) -> PmmlResult<Self> {
        if model.info.mining_function != MiningFunction::AssociationRules {
            return Err(PmmlError::unsupported("miningFunction", model.info.mining_function));
        }
        if model.rules.is_empty() {
            return Err(PmmlError::MissingStructure("AssociationModel/AssociationRule".into()));
        }

        let items: HashMap<&str, &Item> = model.items.iter().map(|item| (item.id.as_str(), item)).collect();
        let mut itemsets = HashMap::new();
        for itemset in &model.itemsets {
            let members = itemset
                .item_refs
                .iter()
                .map(|id| {
                    items.get(id.as_str()).copied().ok_or_else(|| {
                        PmmlError::InvalidStructure(format!("itemset {} refers to unknown item {}", itemset.id, id))
                    })
                })
                .collect::<PmmlResult<Vec<_>>>()?;
            itemsets.insert(itemset.id.as_str(), members);
        }

        for rule in &model.rules {
            for itemset in [&rule.antecedent, &rule.consequent] {
                if !itemsets.contains_key(itemset.as_str()) {
                    return Err(PmmlError::InvalidStructure(format!("rule refers to unknown itemset {}", itemset)));
                }
            }
        }

        let evaluator = AssociationModelEvaluator {
            model,
            itemsets,
            target: ModelTarget::resolve(pmml, &model.info),
            registry: OnceLock::new(),
        };
        output::check_features(&model.info, &evaluator.features())?;
        Ok(evaluator)
    }

    pub fn registry(&self) -> &EntityRegistry<'m, AssociationRule> {
        self.registry
            .get_or_init(|| EntityRegistry::build(self.model.rules.iter().map(|rule| (rule.id.as_deref(), rule))))
    }

    fn itemset(&self, id: &str) -> PmmlResult<&[&'m Item]> {
        self.itemsets
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| PmmlError::InvalidStructure(format!("unknown itemset {}", id)))
    }

    fn rule_match(&self, position: usize, rule: &'m AssociationRule) -> PmmlResult<RuleMatch> {
        let id = match self.registry().id_of(rule) {
            Some(id) => id.to_string(),
            None => (position + 1).to_string(),
        };
        let consequent = self.itemset(&rule.consequent)?.iter().map(|item| item.value.clone()).collect();
        Ok(RuleMatch {
            id,
            support: rule.support,
            confidence: rule.confidence,
            consequent,
        })
    }
}

impl<'m> ModelEvaluator for AssociationModelEvaluator<'m> {
    fn info(&self) -> &ModelInfo {
        &self.model.info
    }

    fn target(&self) -> &ModelTarget {
        &self.target
    }

    fn features(&self) -> BTreeSet<ResultFeature> {
        BTreeSet::from([ResultFeature::RuleId, ResultFeature::EntityId])
    }

    fn evaluate_model(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        let mut transaction: Vec<(&str, String)> = Vec::new();
        for field in self.model.info.mining_schema.active_fields() {
            if let Some(value) = ctx.evaluate(&field.name)? {
                transaction.push((field.name.as_str(), value.as_category()));
            }
        }
        if transaction.is_empty() {
            return Ok(self.missing());
        }

        let contained: HashSet<&str> = self
            .model
            .items
            .iter()
            .filter(|item| {
                transaction.iter().any(|(field, value)| {
                    *value == item.value && item.field.as_deref().map_or(true, |name| name == *field)
                })
            })
            .map(|item| item.id.as_str())
            .collect();

        let mut fired = Vec::new();
        for (position, rule) in self.model.rules.iter().enumerate() {
            if self.itemset(&rule.antecedent)?.iter().all(|item| contained.contains(item.id.as_str())) {
                fired.push((position, rule));
            }
        }
        // Stable: equally ranked rules keep their declaration order.
        fired.sort_by(|(_, a), (_, b)| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| b.support.total_cmp(&a.support))
        });

        let mut rules = Vec::with_capacity(fired.len());
        let mut recommendations: Vec<String> = Vec::new();
        for (position, rule) in fired {
            for item in self.itemset(&rule.consequent)? {
                if !contained.contains(item.id.as_str()) && !recommendations.contains(&item.value) {
                    recommendations.push(item.value.clone());
                }
            }
            rules.push(self.rule_match(position, rule)?);
        }
        tracing::trace!(items = contained.len(), fired = rules.len(), "association rules matched");

        let result = AssociationResult { rules, recommendations };
        Ok(Results::single(&self.target.name, Some(ResultValue::Association(result))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxidize_pmml_core::{DataType, OpType, Scalar};
    use oxidize_pmml_model::{DataDictionary, DataField, Itemset, MiningField, MiningSchema, Output, OutputField};

    fn pmml() -> Pmml {
        Pmml::new(
            DataDictionary::new(vec![
                DataField::new("first", DataType::String, OpType::Categorical),
                DataField::new("second", DataType::String, OpType::Categorical),
            ]),
            vec![],
        )
    }

    fn item(id: &str, value: &str, field: Option<&str>) -> Item {
        Item { id: id.into(), value: value.into(), field: field.map(str::to_string) }
    }

    fn itemset(id: &str, items: &[&str]) -> Itemset {
        Itemset { id: id.into(), item_refs: items.iter().map(|s| s.to_string()).collect() }
    }

    fn rule(id: Option<&str>, antecedent: &str, consequent: &str, support: f64, confidence: f64) -> AssociationRule {
        AssociationRule {
            id: id.map(str::to_string),
            antecedent: antecedent.into(),
            consequent: consequent.into(),
            support,
            confidence,
            lift: None,
        }
    }

    fn model() -> AssociationModel {
        AssociationModel {
            info: ModelInfo::new(
                MiningFunction::AssociationRules,
                MiningSchema::new(vec![MiningField::active("first"), MiningField::active("second")]),
            ),
            items: vec![
                item("1", "bread", None),
                item("2", "butter", None),
                item("3", "milk", None),
                item("4", "beer", None),
                item("5", "bread", Some("second")),
            ],
            itemsets: vec![
                itemset("s1", &["1"]),
                itemset("s2", &["2"]),
                itemset("s3", &["3"]),
                itemset("s4", &["4"]),
                itemset("s5", &["5"]),
                itemset("s12", &["1", "2"]),
            ],
            rules: vec![
                rule(Some("r1"), "s1", "s2", 0.3, 0.8),
                rule(Some("r2"), "s12", "s3", 0.2, 0.9),
                rule(Some("r3"), "s4", "s3", 0.1, 0.5),
                rule(None, "s2", "s1", 0.4, 0.8),
                rule(Some("r5"), "s5", "s4", 0.1, 0.3),
            ],
        }
    }

    fn run(model: &AssociationModel, inputs: &[(&str, &str)]) -> PmmlResult<Results> {
        let pmml = pmml();
        let config = EvaluatorConfig::default();
        let evaluator = AssociationModelEvaluator::new(&pmml, model, &config)?;
        let mut ctx = EvaluationContext::new(&pmml, &model.info, &config);
        ctx.set_arguments(inputs.iter().copied());
        evaluator.evaluate(&mut ctx)
    }

    fn association(results: &Results) -> &AssociationResult {
        results.get(ModelTarget::DEFAULT_NAME).and_then(ResultValue::association).unwrap()
    }

    #[test]
    fn test_fired_rules_are_ranked() {
        let results = run(&model(), &[("first", "bread"), ("second", "butter")]).unwrap();
        let result = association(&results);
        let ids: Vec<&str> = result.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "4", "r1"]);
        assert_eq!(result.recommendations, vec!["milk".to_string()]);
        assert_eq!(result.rules[0].consequent, vec!["milk".to_string()]);
    }

    #[test]
    fn test_field_restricted_items() {
        let results = run(&model(), &[("first", "bread")]).unwrap();
        let ids: Vec<&str> = association(&results).rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1"]);

        let results = run(&model(), &[("second", "bread")]).unwrap();
        let ids: Vec<&str> = association(&results).rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r5"]);
        assert_eq!(association(&results).recommendations, vec!["butter".to_string(), "beer".to_string()]);
    }

    #[test]
    fn test_rule_outputs() {
        let mut model = model();
        model.info.output = Output::new(vec![
            OutputField::new("best", ResultFeature::RuleId),
            OutputField::new("runner_up", ResultFeature::RuleId).with_rank(2),
        ]);
        let results = run(&model, &[("first", "bread"), ("second", "butter")]).unwrap();
        assert_eq!(results.get("best").and_then(ResultValue::predicted_value), Some(&Scalar::from("r2")));
        assert_eq!(results.get("runner_up").and_then(ResultValue::predicted_value), Some(&Scalar::from("4")));
    }

    #[test]
    fn test_empty_transaction() {
        let results = run(&model(), &[]).unwrap();
        assert!(results.get(ModelTarget::DEFAULT_NAME).is_none());

        let results = run(&model(), &[("first", "cheese")]).unwrap();
        assert!(association(&results).rules.is_empty());
    }

    #[test]
    fn test_rejected_structures() {
        let pmml = pmml();
        let config = EvaluatorConfig::default();

        let mut broken = model();
        broken.itemsets.push(itemset("s9", &["9"]));
        let err = AssociationModelEvaluator::new(&pmml, &broken, &config).err().unwrap();
        assert!(matches!(err, PmmlError::InvalidStructure(_)));

        let mut dangling = model();
        dangling.rules.push(rule(None, "s1", "nowhere", 0.1, 0.1));
        assert!(AssociationModelEvaluator::new(&pmml, &dangling, &config).is_err());

        let mut ruleless = model();
        ruleless.rules.clear();
        let err = AssociationModelEvaluator::new(&pmml, &ruleless, &config).err().unwrap();
        assert!(matches!(err, PmmlError::MissingStructure(_)));
    }
}
