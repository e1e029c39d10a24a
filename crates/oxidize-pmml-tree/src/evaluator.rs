use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use oxidize_pmml_core::{PmmlError, PmmlResult};
use oxidize_pmml_eval::output;
use oxidize_pmml_eval::{
    evaluate_predicate, Classification, ClassificationKind, EntityRegistry, EntityValue, EvaluationContext,
    EvaluatorConfig, ModelEvaluator, ModelTarget, ResultValue, Results,
};
use oxidize_pmml_model::{
    MiningFunction, MissingValueStrategy, ModelInfo, NoTrueChildStrategy, Node, Pmml, ResultFeature, TreeModel,
};

/// How much of the traversal is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracking {
    /// Only the prediction.
    Fast,
    /// The prediction, the resolved node's id and the decision path.
    Full,
}

/// Traversal state. Every step either descends into a node whose guard
/// held or resolves the tree, possibly to no node at all.
#[derive(Debug, Clone, Copy)]
enum TreeState<'m> {
    Evaluating(&'m Node),
    Resolved(Option<&'m Node>),
}

/// What the traversal remembers along the way.
struct Trail<'m> {
    tracking: Tracking,
    path: Vec<&'m Node>,
    last_prediction: Option<&'m Node>,
    missing_levels: i32,
}

impl<'m> Trail<'m> {
    fn new(tracking: Tracking) -> Self {
        Trail {
            tracking,
            path: Vec::new(),
            last_prediction: None,
            missing_levels: 0,
        }
    }

    fn visit(&mut self, node: &'m Node) {
        if self.tracking == Tracking::Full {
            self.path.push(node);
        }
        if node.score.is_some() {
            self.last_prediction = Some(node);
        }
    }
}

/// Evaluates a decision tree.
pub struct TreeModelEvaluator<'m> {
    model: &'m TreeModel,
    root: &'m Node,
    target: ModelTarget,
    tracking: Tracking,
    registry: OnceLock<EntityRegistry<'m, Node>>,
}

impl<'m> TreeModelEvaluator<'m> {
    pub fn new(pmml: &'m Pmml, model: &'m TreeModel, config: &EvaluatorConfig) -> PmmlResult<Self> {
        let root = model
            .node
            .as_ref()
            .ok_or_else(|| PmmlError::MissingStructure("TreeModel/Node".into()))?;

        match model.missing_value_strategy {
            MissingValueStrategy::WeightedConfidence | MissingValueStrategy::AggregateNodes => {
                return Err(PmmlError::unsupported("missingValueStrategy", model.missing_value_strategy));
            }
            _ => {}
        }
        match model.info.mining_function {
            MiningFunction::Classification | MiningFunction::Regression => {}
            other => return Err(PmmlError::unsupported("miningFunction", other)),
        }

        let output = &model.info.output;
        let tracking = if config.track_entities
            || output.requests(ResultFeature::EntityId)
            || output.requests(ResultFeature::DecisionPath)
        {
            Tracking::Full
        } else {
            Tracking::Fast
        };

        let evaluator = TreeModelEvaluator {
            model,
            root,
            target: ModelTarget::resolve(pmml, &model.info),
            tracking,
            registry: OnceLock::new(),
        };
        output::check_features(&model.info, &evaluator.features())?;
        Ok(evaluator)
    }

    pub fn tracking(&self) -> Tracking {
        self.tracking
    }

    /// Nodes by id; implicit ids are 1-based depth-first preorder positions.
    pub fn registry(&self) -> &EntityRegistry<'m, Node> {
        self.registry.get_or_init(|| {
            let mut nodes = Vec::new();
            let mut pending = vec![self.root];
            while let Some(node) = pending.pop() {
                nodes.push((node.id.as_deref(), node));
                pending.extend(node.nodes.iter().rev());
            }
            EntityRegistry::build(nodes)
        })
    }

    fn traverse(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<(Option<&'m Node>, Trail<'m>)> {
        let mut trail = Trail::new(self.tracking);
        let mut state = match evaluate_predicate(&self.root.predicate, ctx)? {
            Some(true) => TreeState::Evaluating(self.root),
            _ => TreeState::Resolved(None),
        };
        loop {
            state = match state {
                TreeState::Resolved(node) => return Ok((node, trail)),
                TreeState::Evaluating(node) => self.step(node, ctx, &mut trail)?,
            };
        }
    }

    fn step(&self, node: &'m Node, ctx: &mut EvaluationContext<'_>, trail: &mut Trail<'m>) -> PmmlResult<TreeState<'m>> {
        trail.visit(node);
        if node.is_leaf() {
            return Ok(TreeState::Resolved(Some(node)));
        }

        for child in &node.nodes {
            match evaluate_predicate(&child.predicate, ctx)? {
                Some(true) => return Ok(TreeState::Evaluating(child)),
                Some(false) => {}
                None => match self.model.missing_value_strategy {
                    MissingValueStrategy::NullPrediction => return Ok(TreeState::Resolved(None)),
                    MissingValueStrategy::LastPrediction => return Ok(TreeState::Resolved(trail.last_prediction)),
                    MissingValueStrategy::DefaultChild => {
                        trail.missing_levels += 1;
                        return Ok(TreeState::Evaluating(self.default_child(node)?));
                    }
                    MissingValueStrategy::None => {}
                    strategy => return Err(PmmlError::unsupported("missingValueStrategy", strategy)),
                },
            }
        }

        Ok(match self.model.no_true_child_strategy {
            NoTrueChildStrategy::ReturnNullPrediction => TreeState::Resolved(None),
            NoTrueChildStrategy::ReturnLastPrediction if node.score.is_some() => TreeState::Resolved(Some(node)),
            NoTrueChildStrategy::ReturnLastPrediction => TreeState::Resolved(None),
        })
    }

    fn default_child(&self, node: &'m Node) -> PmmlResult<&'m Node> {
        let name = self.node_name(node);
        let id = node
            .default_child
            .as_deref()
            .ok_or_else(|| PmmlError::InvalidStructure(format!("node {} has no defaultChild", name)))?;
        node.nodes
            .iter()
            .find(|child| child.id.as_deref() == Some(id))
            .ok_or_else(|| PmmlError::InvalidStructure(format!("node {} has no child {:?}", name, id)))
    }

    fn node_name(&self, node: &Node) -> String {
        self.registry().id_of(node).unwrap_or("?").to_string()
    }

    fn score(&self, node: &'m Node, trail: &Trail<'m>) -> PmmlResult<ResultValue> {
        let (entity_id, decision_path) = match self.tracking {
            Tracking::Full => {
                let registry = self.registry();
                let path = trail
                    .path
                    .iter()
                    .filter_map(|n| registry.id_of(n).map(str::to_string))
                    .collect();
                (registry.id_of(node).map(str::to_string), path)
            }
            Tracking::Fast => (None, Vec::new()),
        };

        if self.model.info.mining_function == MiningFunction::Classification {
            return self
                .classify(node, trail)
                .map(|c| ResultValue::Classification(c.with_entity(entity_id, decision_path)));
        }

        let score = node
            .score
            .as_deref()
            .ok_or_else(|| PmmlError::MissingScore(self.node_name(node)))?;
        let value = self.target.parse(score)?;
        Ok(match self.tracking {
            Tracking::Fast => ResultValue::Value(value),
            Tracking::Full => ResultValue::Entity(EntityValue { value, entity_id, decision_path }),
        })
    }

    fn classify(&self, node: &'m Node, trail: &Trail<'m>) -> PmmlResult<Classification> {
        let distributions = &node.score_distributions;
        if node.score.is_none() && distributions.is_empty() {
            return Err(PmmlError::MissingScore(self.node_name(node)));
        }

        let explicit = distributions.iter().filter(|d| d.probability.is_some()).count();
        let probabilities: BTreeMap<String, f64> = if distributions.is_empty() {
            node.score.iter().map(|s| (s.clone(), 1.0)).collect()
        } else if explicit == distributions.len() {
            distributions
                .iter()
                .map(|d| (d.value.clone(), d.probability.unwrap_or(0.0)))
                .collect()
        } else if explicit > 0 {
            return Err(PmmlError::InvalidStructure(format!(
                "node {} gives probabilities for some categories only",
                self.node_name(node)
            )));
        } else {
            let total: f64 = distributions.iter().map(|d| d.record_count).sum();
            if total <= 0.0 {
                return Err(PmmlError::InvalidStructure(format!("node {} has no records", self.node_name(node))));
            }
            distributions
                .iter()
                .map(|d| (d.value.clone(), d.record_count / total))
                .collect()
        };

        let category = match &node.score {
            Some(score) => score.clone(),
            None => Classification::best_category(ClassificationKind::Probability, &probabilities)
                .map(str::to_string)
                .ok_or_else(|| PmmlError::MissingScore(self.node_name(node)))?,
        };

        let penalty = self.model.missing_value_penalty.powi(trail.missing_levels);
        let confidences = probabilities
            .iter()
            .map(|(value, probability)| {
                let confidence = distributions
                    .iter()
                    .find(|d| &d.value == value)
                    .and_then(|d| d.confidence)
                    .unwrap_or(*probability);
                (value.clone(), confidence * penalty)
            })
            .collect();
        let record_counts = distributions
            .iter()
            .map(|d| (d.value.clone(), d.record_count))
            .collect();

        Ok(
            Classification::new(ClassificationKind::Probability, self.target.parse(&category)?, probabilities)
                .with_confidences(confidences)
                .with_record_counts(record_counts),
        )
    }
}

impl<'m> ModelEvaluator for TreeModelEvaluator<'m> {
    fn info(&self) -> &ModelInfo {
        &self.model.info
    }

    fn target(&self) -> &ModelTarget {
        &self.target
    }

    fn features(&self) -> BTreeSet<ResultFeature> {
        let mut features = BTreeSet::from([ResultFeature::PredictedValue]);
        if self.model.info.mining_function == MiningFunction::Classification {
            features.extend([ResultFeature::Probability, ResultFeature::Confidence]);
        }
        if self.tracking == Tracking::Full {
            features.extend([ResultFeature::EntityId, ResultFeature::DecisionPath]);
        }
        features
    }

    fn evaluate_model(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        let (node, trail) = self.traverse(ctx)?;
        match node {
            Some(node) => {
                tracing::trace!(node = ?node.id, missing_levels = trail.missing_levels, "tree resolved");
                let value = self.score(node, &trail)?;
                Ok(Results::single(&self.target.name, Some(value)))
            }
            None => {
                tracing::trace!("tree resolved without a prediction");
                Ok(self.missing())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use oxidize_pmml_core::{DataType, OpType, Scalar};
    use oxidize_pmml_model::{
        DataDictionary, DataField, MiningField, MiningSchema, Output, OutputField, Predicate, ScoreDistribution,
        SimpleOperator,
    };

    fn x(operator: SimpleOperator, value: &str) -> Predicate {
        Predicate::simple("x", operator, value)
    }

    fn y(operator: SimpleOperator, value: &str) -> Predicate {
        Predicate::simple("y", operator, value)
    }

    fn pmml() -> Pmml {
        Pmml::new(
            DataDictionary::new(vec![
                DataField::continuous("x"),
                DataField::continuous("y"),
                DataField::continuous("t"),
                DataField::new("label", DataType::String, OpType::Categorical),
            ]),
            vec![],
        )
    }

    fn regression_tree() -> TreeModel {
        let root = Node::new(Predicate::True).with_score("0").with_children(vec![
            Node::new(x(SimpleOperator::LessThan, "5"))
                .with_id("low")
                .with_score("1")
                .with_default_child("low-b")
                .with_children(vec![
                    Node::new(y(SimpleOperator::LessThan, "2")).with_id("low-a").with_score("10"),
                    Node::new(y(SimpleOperator::GreaterThan, "4")).with_id("low-b").with_score("20"),
                ]),
            Node::new(x(SimpleOperator::GreaterOrEqual, "5"))
                .with_id("high")
                .with_children(vec![Node::new(y(SimpleOperator::LessThan, "0")).with_id("high-neg")]),
        ]);
        let info = ModelInfo::new(
            MiningFunction::Regression,
            MiningSchema::new(vec![MiningField::active("x"), MiningField::active("y"), MiningField::target("t")]),
        );
        TreeModel::new(info, Some(root))
    }

    fn classification_tree(strategy: MissingValueStrategy, penalty: f64) -> TreeModel {
        let root = Node::new(Predicate::True).with_default_child("left").with_children(vec![
            Node::new(x(SimpleOperator::LessThan, "5"))
                .with_id("left")
                .with_score("yes")
                .with_distribution(vec![ScoreDistribution::new("yes", 3.0), ScoreDistribution::new("no", 1.0)]),
            Node::new(x(SimpleOperator::GreaterOrEqual, "5"))
                .with_id("right")
                .with_score("no")
                .with_distribution(vec![
                    ScoreDistribution::new("yes", 1.0).with_probability(0.2),
                    ScoreDistribution::new("no", 4.0).with_probability(0.8),
                ]),
        ]);
        let info = ModelInfo::new(
            MiningFunction::Classification,
            MiningSchema::new(vec![MiningField::active("x"), MiningField::target("label")]),
        );
        TreeModel::new(info, Some(root)).with_missing_value_strategy(strategy, penalty)
    }

    fn run(model: &TreeModel, config: &EvaluatorConfig, inputs: &[(&str, f64)]) -> PmmlResult<Results> {
        let pmml = pmml();
        let evaluator = TreeModelEvaluator::new(&pmml, model, config)?;
        let mut ctx = EvaluationContext::new(&pmml, &model.info, config);
        ctx.set_arguments(inputs.iter().copied());
        evaluator.evaluate(&mut ctx)
    }

    fn predict(model: &TreeModel, inputs: &[(&str, f64)]) -> PmmlResult<Option<f64>> {
        let results = run(model, &EvaluatorConfig::default(), inputs)?;
        Ok(results
            .get("t")
            .and_then(ResultValue::predicted_value)
            .and_then(Scalar::as_f64))
    }

    #[test]
    fn test_descends_to_leaf() {
        let model = regression_tree();
        assert_eq!(predict(&model, &[("x", 1.0), ("y", 1.0)]).unwrap(), Some(10.0));
        assert_eq!(predict(&model, &[("x", 1.0), ("y", 5.0)]).unwrap(), Some(20.0));
    }

    #[test]
    fn test_root_guard_false() {
        let mut model = regression_tree();
        if let Some(root) = model.node.as_mut() {
            root.predicate = Predicate::False;
        }
        assert_eq!(predict(&model, &[("x", 1.0), ("y", 1.0)]).unwrap(), None);
    }

    #[test]
    fn test_no_true_child() {
        let model = regression_tree();
        assert_eq!(predict(&model, &[("x", 1.0), ("y", 3.0)]).unwrap(), None);

        let model = regression_tree().with_no_true_child_strategy(NoTrueChildStrategy::ReturnLastPrediction);
        assert_eq!(predict(&model, &[("x", 1.0), ("y", 3.0)]).unwrap(), Some(1.0));
    }

    #[test]
    fn test_return_last_without_score_is_null() {
        // "high" has no score, so falling back to it must not invent one.
        let model = regression_tree().with_no_true_child_strategy(NoTrueChildStrategy::ReturnLastPrediction);
        assert_eq!(predict(&model, &[("x", 7.0), ("y", 5.0)]).unwrap(), None);
    }

    #[test]
    fn test_terminal_without_score() {
        let model = regression_tree();
        let err = predict(&model, &[("x", 7.0), ("y", -1.0)]).unwrap_err();
        assert_eq!(err, PmmlError::MissingScore("high-neg".into()));
    }

    #[test]
    fn test_missing_value_strategies() {
        let inputs = [("x", 1.0)];
        let with = |strategy| regression_tree().with_missing_value_strategy(strategy, 1.0);

        assert_eq!(predict(&with(MissingValueStrategy::NullPrediction), &inputs).unwrap(), None);
        assert_eq!(predict(&with(MissingValueStrategy::LastPrediction), &inputs).unwrap(), Some(1.0));
        assert_eq!(predict(&with(MissingValueStrategy::DefaultChild), &inputs).unwrap(), Some(20.0));
        assert_eq!(predict(&with(MissingValueStrategy::None), &inputs).unwrap(), None);

        let skip_then_last = with(MissingValueStrategy::None)
            .with_no_true_child_strategy(NoTrueChildStrategy::ReturnLastPrediction);
        assert_eq!(predict(&skip_then_last, &inputs).unwrap(), Some(1.0));

        // Both guards at the root are undecidable; the root scored "0".
        assert_eq!(predict(&with(MissingValueStrategy::LastPrediction), &[]).unwrap(), Some(0.0));
    }

    #[test]
    fn test_default_child_must_exist() {
        let model = classification_tree(MissingValueStrategy::DefaultChild, 1.0);
        let mut broken = model.clone();
        if let Some(root) = broken.node.as_mut() {
            root.default_child = Some("nowhere".into());
        }
        let err = run(&broken, &EvaluatorConfig::default(), &[]).unwrap_err();
        assert!(matches!(err, PmmlError::InvalidStructure(_)));
    }

    #[test]
    fn test_unsupported_strategies_rejected() {
        let pmml = pmml();
        for strategy in [MissingValueStrategy::WeightedConfidence, MissingValueStrategy::AggregateNodes] {
            let model = regression_tree().with_missing_value_strategy(strategy, 1.0);
            let err = TreeModelEvaluator::new(&pmml, &model, &EvaluatorConfig::default()).err().unwrap();
            assert!(err.is_structural());
        }
        let mut model = regression_tree();
        model.node = None;
        let err = TreeModelEvaluator::new(&pmml, &model, &EvaluatorConfig::default()).err().unwrap();
        assert_eq!(err, PmmlError::MissingStructure("TreeModel/Node".into()));
    }

    #[test]
    fn test_full_tracking_reports_path() {
        let model = regression_tree();
        let config = EvaluatorConfig::default().track_entities(true);
        let results = run(&model, &config, &[("x", 1.0), ("y", 5.0)]).unwrap();
        let value = results.get("t").unwrap();
        assert_eq!(value.entity_id(), Some("low-b"));
        let path: Vec<&str> = value.decision_path().unwrap().iter().map(String::as_str).collect();
        assert_eq!(path, vec!["1", "low", "low-b"]);
    }

    #[test]
    fn test_outputs_select_tracking() {
        let pmml = pmml();
        let fast = regression_tree();
        let evaluator = TreeModelEvaluator::new(&pmml, &fast, &EvaluatorConfig::default()).unwrap();
        assert_eq!(evaluator.tracking(), Tracking::Fast);
        assert!(!evaluator.supports(ResultFeature::EntityId));

        let mut full = regression_tree();
        full.info.output = Output::new(vec![OutputField::new("node", ResultFeature::EntityId)]);
        let evaluator = TreeModelEvaluator::new(&pmml, &full, &EvaluatorConfig::default()).unwrap();
        assert_eq!(evaluator.tracking(), Tracking::Full);
        assert!(evaluator.supports(ResultFeature::DecisionPath));

        let mut ctx = EvaluationContext::new(&pmml, &full.info, &EvaluatorConfig::default());
        ctx.set_arguments([("x", 7.0), ("y", -1.0)]);
        assert!(evaluator.evaluate(&mut ctx).is_err());

        let mut ctx = EvaluationContext::new(&pmml, &full.info, &EvaluatorConfig::default());
        ctx.set_arguments([("x", 1.0), ("y", 1.0)]);
        let results = evaluator.evaluate(&mut ctx).unwrap();
        assert_eq!(results.get("node").and_then(ResultValue::predicted_value), Some(&Scalar::from("low-a")));
    }

    #[test]
    fn test_classification_distributions() {
        let model = classification_tree(MissingValueStrategy::NullPrediction, 1.0);
        let results = run(&model, &EvaluatorConfig::default(), &[("x", 1.0)]).unwrap();
        let c = results.get("label").and_then(ResultValue::classification).unwrap();
        assert_eq!(c.result, Scalar::from("yes"));
        assert_abs_diff_eq!(c.value("yes").unwrap(), 0.75);
        assert_abs_diff_eq!(c.value("no").unwrap(), 0.25);
        assert_eq!(c.record_count("yes"), 3.0);

        let results = run(&model, &EvaluatorConfig::default(), &[("x", 9.0)]).unwrap();
        let c = results.get("label").and_then(ResultValue::classification).unwrap();
        assert_eq!(c.result, Scalar::from("no"));
        assert_abs_diff_eq!(c.value("no").unwrap(), 0.8);
        assert_abs_diff_eq!(c.confidence("no").unwrap(), 0.8);
    }

    #[test]
    fn test_missing_levels_penalize_confidence() {
        let model = classification_tree(MissingValueStrategy::DefaultChild, 0.5);
        let results = run(&model, &EvaluatorConfig::default(), &[]).unwrap();
        let c = results.get("label").and_then(ResultValue::classification).unwrap();
        assert_abs_diff_eq!(c.value("yes").unwrap(), 0.75);
        assert_abs_diff_eq!(c.confidence("yes").unwrap(), 0.375);
        assert_abs_diff_eq!(c.confidence("no").unwrap(), 0.125);
    }

    #[test]
    fn test_partial_probabilities_rejected() {
        let mut model = classification_tree(MissingValueStrategy::NullPrediction, 1.0);
        if let Some(root) = model.node.as_mut() {
            root.nodes[0].score_distributions[0].probability = Some(0.5);
        }
        let err = run(&model, &EvaluatorConfig::default(), &[("x", 1.0)]).unwrap_err();
        assert!(matches!(err, PmmlError::InvalidStructure(_)));
    }

    #[test]
    fn test_idempotent() {
        let model = regression_tree();
        let first = run(&model, &EvaluatorConfig::default(), &[("x", 1.0), ("y", 5.0)]).unwrap();
        let second = run(&model, &EvaluatorConfig::default(), &[("x", 1.0), ("y", 5.0)]).unwrap();
        assert_eq!(first, second);
    }
}
