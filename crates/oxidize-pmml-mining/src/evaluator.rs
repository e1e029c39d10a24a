use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use oxidize_pmml_core::{
    Number, PmmlError, PmmlResult, ProbabilityAggregator, Scalar, ValueAggregator, VoteAggregator,
};
use oxidize_pmml_eval::output;
use oxidize_pmml_eval::{
    evaluate_predicate, Classification, ClassificationKind, EntityRegistry, EvaluationContext, EvaluatorConfig,
    ModelEvaluator, ModelTarget, ResultValue, Results, SegmentResult,
};
use oxidize_pmml_model::{
    MathContext, MiningFunction, MiningModel, MissingPredictionTreatment, Model, ModelInfo, MultipleModelMethod,
    Pmml, ResultFeature, Segment, Segmentation,
};

use crate::factory;

/// Per-record accumulator of segment predictions.
enum Accumulator<N: Number> {
    Values(ValueAggregator<N>),
    Votes(VoteAggregator<N>),
    Probabilities(ProbabilityAggregator<N>),
}

/// Evaluates a segmentation: guarded member models whose results are
/// selected, chained or aggregated.
///
/// Member evaluators are built on first use and cached for the lifetime of
/// this evaluator, keyed by segment id.
pub struct MiningModelEvaluator<'m> {
    pmml: &'m Pmml,
    model: &'m MiningModel,
    segmentation: &'m Segmentation,
    method: MultipleModelMethod,
    target: ModelTarget,
    config: EvaluatorConfig,
    evaluators: DashMap<String, Arc<dyn ModelEvaluator + 'm>>,
    registry: OnceLock<EntityRegistry<'m, Segment>>,
}

impl<'m> MiningModelEvaluator<'m> {
    pub fn new(pmml: &'m Pmml, model: &'m MiningModel, config: &EvaluatorConfig) -> PmmlResult<Self> {
        let segmentation = model
            .segmentation
            .as_ref()
            .ok_or_else(|| PmmlError::MissingStructure("MiningModel/Segmentation".into()))?;
        let method = segmentation
            .multiple_model_method
            .ok_or_else(|| PmmlError::MissingStructure("MiningModel/Segmentation@multipleModelMethod".into()))?;
        if segmentation.segments.is_empty() {
            return Err(PmmlError::MissingStructure("MiningModel/Segmentation/Segment".into()));
        }
        if segmentation.missing_prediction_treatment == MissingPredictionTreatment::SkipSegment {
            return Err(PmmlError::unsupported(
                "missingPredictionTreatment",
                segmentation.missing_prediction_treatment,
            ));
        }

        let function = model.info.mining_function;
        match (function, method) {
            (MiningFunction::Regression, MultipleModelMethod::MajorityVote)
            | (MiningFunction::Regression, MultipleModelMethod::WeightedMajorityVote)
            | (MiningFunction::Classification, MultipleModelMethod::Sum)
            | (MiningFunction::Classification, MultipleModelMethod::WeightedSum)
            | (MiningFunction::Classification, MultipleModelMethod::WeightedMedian) => {
                return Err(PmmlError::unsupported("multipleModelMethod", method));
            }
            (MiningFunction::Regression, _) | (MiningFunction::Classification, _) => {}
            (other, _) => return Err(PmmlError::unsupported("miningFunction", other)),
        }

        for segment in &segmentation.segments {
            let nested = segment
                .model
                .as_ref()
                .ok_or_else(|| PmmlError::MissingStructure("Segment/Model".into()))?;
            // A chain only constrains the segment that runs last.
            if method != MultipleModelMethod::ModelChain && nested.info().mining_function != function {
                return Err(mismatch(function, nested));
            }
        }

        let evaluator = MiningModelEvaluator {
            pmml,
            model,
            segmentation,
            method,
            target: ModelTarget::resolve(pmml, &model.info),
            config: config.clone(),
            evaluators: DashMap::new(),
            registry: OnceLock::new(),
        };
        output::check_features(&model.info, &evaluator.features())?;
        Ok(evaluator)
    }

    /// Segments by id; segments without an id get their 1-based position.
    pub fn registry(&self) -> &EntityRegistry<'m, Segment> {
        self.registry.get_or_init(|| {
            EntityRegistry::build(
                self.segmentation
                    .segments
                    .iter()
                    .map(|segment| (segment.id.as_deref(), segment)),
            )
        })
    }

    /// Number of member evaluators built so far.
    pub fn cached_evaluators(&self) -> usize {
        self.evaluators.len()
    }

    fn segment_id(&self, position: usize, segment: &Segment) -> String {
        match self.registry().id_of(segment) {
            Some(id) => id.to_string(),
            None => (position + 1).to_string(),
        }
    }

    fn segment_evaluator(&self, id: &str, segment: &'m Segment) -> PmmlResult<Arc<dyn ModelEvaluator + 'm>> {
        if let Some(evaluator) = self.evaluators.get(id) {
            return Ok(Arc::clone(evaluator.value()));
        }

        let model = segment
            .model
            .as_ref()
            .ok_or_else(|| PmmlError::MissingStructure("Segment/Model".into()))?;
        // Racing threads may both build; the first insert wins and the
        // other copy is dropped.
        let built = factory::new_evaluator(self.pmml, model, &self.config)?;
        tracing::debug!(segment = %id, model = model.kind(), "built segment evaluator");
        let cached = self.evaluators.entry(id.to_string()).or_insert(built);
        Ok(Arc::clone(cached.value()))
    }

    fn accumulator<N: Number>(&self) -> Accumulator<N> {
        match (self.model.info.mining_function, self.method) {
            (_, MultipleModelMethod::MajorityVote | MultipleModelMethod::WeightedMajorityVote) => {
                Accumulator::Votes(VoteAggregator::new())
            }
            (MiningFunction::Classification, _) => Accumulator::Probabilities(ProbabilityAggregator::new()),
            (_, MultipleModelMethod::Median | MultipleModelMethod::WeightedMedian) => {
                Accumulator::Values(ValueAggregator::buffered())
            }
            _ => Accumulator::Values(ValueAggregator::streaming()),
        }
    }

    fn evaluate_in<N: Number>(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        let segments = &self.segmentation.segments;
        let treatment = self.segmentation.missing_prediction_treatment;

        let mut accumulator = self.accumulator::<N>();
        let mut contributing = 0usize;
        let mut selected: Vec<Results> = Vec::new();
        let mut chained: Option<(Results, Arc<dyn ModelEvaluator + 'm>)> = None;
        let mut evaluated: Vec<SegmentResult> = Vec::new();

        for (position, segment) in segments.iter().enumerate() {
            if evaluate_predicate(&segment.predicate, ctx)? != Some(true) {
                continue;
            }

            let id = self.segment_id(position, segment);
            let evaluator = self.segment_evaluator(&id, segment)?;
            let results = {
                let mut child = ctx.child(evaluator.info());
                evaluator.evaluate(&mut child)?
            };
            let prediction = results.get(&evaluator.target().name).cloned();
            tracing::debug!(segment = %id, missing = prediction.is_none(), "segment evaluated");

            if self.method == MultipleModelMethod::ModelChain {
                for (name, value) in output::output_values(evaluator.info(), &results)? {
                    ctx.declare(&name, value)?;
                }
            }
            evaluated.push(SegmentResult {
                id,
                weight: segment.weight,
                results: results.clone(),
            });

            let prediction = match prediction {
                Some(prediction) => prediction,
                None => match treatment {
                    MissingPredictionTreatment::ReturnMissing => return Ok(self.finish(None, evaluated)),
                    MissingPredictionTreatment::Continue => continue,
                    MissingPredictionTreatment::SkipSegment => {
                        return Err(PmmlError::unsupported("missingPredictionTreatment", treatment));
                    }
                },
            };
            contributing += 1;

            match self.method {
                MultipleModelMethod::SelectFirst => {
                    let mut results = results;
                    results.insert(&self.target.name, Some(prediction));
                    return Ok(self.attach(results, evaluated));
                }
                MultipleModelMethod::SelectAll => selected.push(results),
                MultipleModelMethod::ModelChain => chained = Some((results, evaluator)),
                MultipleModelMethod::MajorityVote => feed(&mut accumulator, &prediction, N::ONE)?,
                _ => feed(&mut accumulator, &prediction, N::from_f64(segment.weight))?,
            }
        }

        match self.method {
            MultipleModelMethod::SelectFirst => Ok(self.finish(None, evaluated)),
            MultipleModelMethod::SelectAll => {
                let results = collect_all(&selected)?;
                Ok(self.attach(results, evaluated))
            }
            MultipleModelMethod::ModelChain => match chained {
                Some((mut results, last)) => {
                    if last.info().mining_function != self.model.info.mining_function {
                        return Err(PmmlError::EvaluationConsistency(format!(
                            "last segment of the chain is a {:?} model, the ensemble is {:?}",
                            last.info().mining_function,
                            self.model.info.mining_function
                        )));
                    }
                    let prediction = results.get(&last.target().name).cloned();
                    results.insert(&self.target.name, prediction);
                    Ok(self.attach(results, evaluated))
                }
                None => Ok(self.finish(None, evaluated)),
            },
            _ => {
                let absent = segments.len() - contributing;
                if contributing == 0 || absent as f64 / segments.len() as f64 > self.segmentation.missing_threshold {
                    tracing::debug!(absent, total = segments.len(), "too many segments without a prediction");
                    return Ok(self.finish(None, evaluated));
                }
                let value = self.aggregate(&accumulator)?;
                Ok(self.finish(value, evaluated))
            }
        }
    }

    fn aggregate<N: Number>(&self, accumulator: &Accumulator<N>) -> PmmlResult<Option<ResultValue>> {
        match accumulator {
            Accumulator::Values(values) => {
                let value = match self.method {
                    MultipleModelMethod::Average => values.average(),
                    MultipleModelMethod::WeightedAverage => values.weighted_average(),
                    MultipleModelMethod::Median => values.median()?,
                    MultipleModelMethod::WeightedMedian => values.weighted_median()?,
                    MultipleModelMethod::Sum => values.sum(),
                    MultipleModelMethod::WeightedSum => values.weighted_sum(),
                    MultipleModelMethod::Max => values.max(),
                    other => return Err(PmmlError::unsupported("multipleModelMethod", other)),
                };
                match value {
                    Some(v) => Ok(Some(ResultValue::Value(self.target.data_type.parse(&v.get().to_scalar())?))),
                    None => Ok(None),
                }
            }
            Accumulator::Votes(votes) => {
                let winner = match votes.winner() {
                    Some(winner) => winner,
                    None => return Ok(None),
                };
                let values = votes.votes().into_iter().map(|(k, v)| (k, v.to_f64())).collect();
                Ok(Some(ResultValue::Classification(Classification::new(
                    ClassificationKind::Vote,
                    self.target.parse(&winner)?,
                    values,
                ))))
            }
            Accumulator::Probabilities(probabilities) => {
                let distribution = match self.method {
                    MultipleModelMethod::Average => probabilities.average(),
                    MultipleModelMethod::WeightedAverage => probabilities.weighted_average(),
                    MultipleModelMethod::Median => probabilities.median(),
                    MultipleModelMethod::Max => probabilities.max(),
                    other => return Err(PmmlError::unsupported("multipleModelMethod", other)),
                };
                let values: BTreeMap<String, f64> =
                    distribution.into_iter().map(|(k, v)| (k, v.to_f64())).collect();
                let category = match Classification::best_category(ClassificationKind::Probability, &values) {
                    Some(category) => category.to_string(),
                    None => return Ok(None),
                };
                Ok(Some(ResultValue::Classification(Classification::new(
                    ClassificationKind::Probability,
                    self.target.parse(&category)?,
                    values,
                ))))
            }
        }
    }

    fn finish(&self, value: Option<ResultValue>, segments: Vec<SegmentResult>) -> Results {
        self.attach(Results::single(&self.target.name, value), segments)
    }

    fn attach(&self, mut results: Results, segments: Vec<SegmentResult>) -> Results {
        for segment in segments {
            results.push_segment(segment);
        }
        results
    }
}

fn mismatch(function: MiningFunction, nested: &Model) -> PmmlError {
    PmmlError::EvaluationConsistency(format!(
        "{} segment performs {:?}, the ensemble performs {:?}",
        nested.kind(),
        nested.info().mining_function,
        function
    ))
}

fn feed<N: Number>(accumulator: &mut Accumulator<N>, prediction: &ResultValue, weight: N) -> PmmlResult<()> {
    match accumulator {
        Accumulator::Values(values) => {
            let value = prediction.predicted_value().and_then(Scalar::as_f64).ok_or_else(|| {
                PmmlError::TypeMismatch {
                    left: format!("{:?}", prediction.predicted_value()),
                    right: "double".into(),
                }
            })?;
            values.add_weighted(N::from_f64(value), weight);
        }
        Accumulator::Votes(votes) => {
            let category = match prediction.predicted_value() {
                Some(value) => value.to_string(),
                None => return Ok(()),
            };
            let record_count = prediction
                .classification()
                .map(|c| c.record_count(&category))
                .unwrap_or(0.0);
            votes.add_weighted(&category, weight, N::from_f64(record_count));
        }
        Accumulator::Probabilities(probabilities) => {
            let distribution: BTreeMap<String, N> = match prediction.classification() {
                Some(c) => c.values.iter().map(|(k, &v)| (k.clone(), N::from_f64(v))).collect(),
                None => match prediction.predicted_value() {
                    Some(value) => BTreeMap::from([(value.to_string(), N::ONE)]),
                    None => return Ok(()),
                },
            };
            probabilities.add_weighted(distribution, weight);
        }
    }
    Ok(())
}

/// One collection per output name, one entry per selected segment.
fn collect_all(selected: &[Results]) -> PmmlResult<Results> {
    let mut results = Results::new();
    let first = match selected.first() {
        Some(first) => first,
        None => return Ok(results),
    };
    let names: BTreeSet<&str> = first.names().collect();
    for other in &selected[1..] {
        let other_names: BTreeSet<&str> = other.names().collect();
        if other_names != names {
            return Err(PmmlError::EvaluationConsistency(format!(
                "segments produce different fields: {:?} and {:?}",
                names, other_names
            )));
        }
    }
    for name in names {
        let values = selected.iter().map(|r| r.get(name).cloned()).collect();
        results.insert(name, Some(ResultValue::Collection(values)));
    }
    Ok(results)
}

impl<'m> ModelEvaluator for MiningModelEvaluator<'m> {
    fn info(&self) -> &ModelInfo {
        &self.model.info
    }

    fn target(&self) -> &ModelTarget {
        &self.target
    }

    fn features(&self) -> BTreeSet<ResultFeature> {
        let mut features = BTreeSet::from([ResultFeature::PredictedValue]);
        if self.model.info.mining_function == MiningFunction::Classification {
            features.insert(ResultFeature::Probability);
        }
        if !self.method.is_aggregating() {
            if self.model.info.mining_function == MiningFunction::Classification {
                features.insert(ResultFeature::Confidence);
            }
            // Selected member trees report their nodes when tracking is on.
            if self.config.track_entities {
                features.extend([ResultFeature::EntityId, ResultFeature::DecisionPath]);
            }
        }
        features
    }

    fn evaluate_model(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        match self.model.info.math_context {
            MathContext::Float => self.evaluate_in::<f32>(ctx),
            MathContext::Double => self.evaluate_in::<f64>(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use oxidize_pmml_core::{DataType, OpType};
    use oxidize_pmml_model::{
        DataDictionary, DataField, MiningField, MiningSchema, Node, Output, OutputField, Predicate,
        RegressionModel, RegressionNormalization, RegressionTable, ScoreDistribution, SimpleOperator, TreeModel,
    };

    fn pmml() -> Pmml {
        Pmml::new(
            DataDictionary::new(vec![
                DataField::continuous("x"),
                DataField::continuous("z"),
                DataField::continuous("y"),
                DataField::new("label", DataType::String, OpType::Categorical),
            ]),
            vec![],
        )
    }

    fn info(function: MiningFunction) -> ModelInfo {
        let target = if function == MiningFunction::Regression { "y" } else { "label" };
        ModelInfo::new(function, MiningSchema::new(vec![MiningField::active("x"), MiningField::target(target)]))
    }

    fn constant(value: f64) -> Model {
        Model::Regression(RegressionModel::new(
            info(MiningFunction::Regression),
            RegressionNormalization::None,
            vec![RegressionTable::new(value)],
        ))
    }

    /// A regression on a field that is never supplied.
    fn unpredictable() -> Model {
        Model::Regression(RegressionModel::new(
            info(MiningFunction::Regression),
            RegressionNormalization::None,
            vec![RegressionTable::new(0.0).numeric("z", 1.0, 1)],
        ))
    }

    fn leaf(distribution: Vec<ScoreDistribution>) -> Model {
        Model::Tree(TreeModel::new(
            info(MiningFunction::Classification),
            Some(Node::new(Predicate::True).with_distribution(distribution)),
        ))
    }

    fn voter(category: &str, record_count: f64) -> Model {
        Model::Tree(TreeModel::new(
            info(MiningFunction::Classification),
            Some(
                Node::new(Predicate::True)
                    .with_score(category)
                    .with_distribution(vec![ScoreDistribution::new(category, record_count)]),
            ),
        ))
    }

    fn segment(id: &str, model: Model) -> Segment {
        Segment::new(id, Predicate::True, model)
    }

    fn ensemble(function: MiningFunction, segmentation: Segmentation) -> MiningModel {
        MiningModel::new(info(function), segmentation)
    }

    fn run(model: &MiningModel, inputs: &[(&str, f64)]) -> PmmlResult<Results> {
        let pmml = pmml();
        let config = EvaluatorConfig::default();
        let evaluator = MiningModelEvaluator::new(&pmml, model, &config)?;
        let mut ctx = EvaluationContext::new(&pmml, &model.info, &config);
        ctx.set_arguments(inputs.iter().copied());
        evaluator.evaluate(&mut ctx)
    }

    fn predicted(results: &Results, name: &str) -> Option<Scalar> {
        results.get(name).and_then(ResultValue::predicted_value).cloned()
    }

    fn aggregate(method: MultipleModelMethod) -> f64 {
        let segments = vec![
            segment("a", constant(2.0)).with_weight(1.0),
            segment("b", constant(4.0)).with_weight(2.0),
            segment("c", constant(6.0)).with_weight(3.0),
        ];
        let model = ensemble(MiningFunction::Regression, Segmentation::new(method, segments));
        let results = run(&model, &[("x", 0.0)]).unwrap();
        predicted(&results, "y").and_then(|s| s.as_f64()).unwrap()
    }

    #[test]
    fn test_numeric_aggregation() {
        assert_abs_diff_eq!(aggregate(MultipleModelMethod::Average), 4.0);
        assert_abs_diff_eq!(aggregate(MultipleModelMethod::WeightedAverage), 28.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(aggregate(MultipleModelMethod::Median), 4.0);
        assert_abs_diff_eq!(aggregate(MultipleModelMethod::Sum), 12.0);
        assert_abs_diff_eq!(aggregate(MultipleModelMethod::WeightedSum), 28.0);
        assert_abs_diff_eq!(aggregate(MultipleModelMethod::WeightedMedian), 4.0);
        assert_abs_diff_eq!(aggregate(MultipleModelMethod::Max), 6.0);
    }

    #[test]
    fn test_only_medians_buffer_contributions() {
        let pmml = pmml();
        let config = EvaluatorConfig::default();
        let values = |method: MultipleModelMethod| {
            let segments = vec![segment("a", constant(1.0))];
            let model = ensemble(MiningFunction::Regression, Segmentation::new(method, segments));
            let evaluator = MiningModelEvaluator::new(&pmml, &model, &config).unwrap();
            match evaluator.accumulator::<f64>() {
                Accumulator::Values(mut values) => {
                    values.add_weighted(3.0, 1.0);
                    values.add_weighted(5.0, 1.0);
                    values
                }
                _ => panic!("{:?} should aggregate values", method),
            }
        };

        let streamed = values(MultipleModelMethod::Sum);
        assert_abs_diff_eq!(streamed.sum().unwrap().get(), 8.0);
        assert!(matches!(streamed.median(), Err(PmmlError::InvalidArgument(_))));
        for method in [
            MultipleModelMethod::Average,
            MultipleModelMethod::WeightedAverage,
            MultipleModelMethod::WeightedSum,
            MultipleModelMethod::Max,
        ] {
            assert!(values(method).median().is_err(), "{:?}", method);
        }

        let buffered = values(MultipleModelMethod::Median);
        assert_abs_diff_eq!(buffered.median().unwrap().unwrap().get(), 4.0);
        assert!(values(MultipleModelMethod::WeightedMedian).weighted_median().unwrap().is_some());
    }

    #[test]
    fn test_float_context_aggregation() {
        let segments = vec![segment("a", constant(0.1)), segment("b", constant(0.2))];
        let mut model = ensemble(MiningFunction::Regression, Segmentation::new(MultipleModelMethod::Sum, segments));
        model.info.math_context = MathContext::Float;
        let results = run(&model, &[("x", 0.0)]).unwrap();
        let sum = predicted(&results, "y").and_then(|s| s.as_f64()).unwrap();
        assert_abs_diff_eq!(sum, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_majority_vote_tie_break() {
        let segments = |a_records: f64, b_records: f64| {
            vec![
                segment("1", voter("A", a_records)),
                segment("2", voter("B", b_records)),
                segment("3", voter("A", a_records)),
                segment("4", voter("B", b_records)),
            ]
        };

        let model = ensemble(
            MiningFunction::Classification,
            Segmentation::new(MultipleModelMethod::MajorityVote, segments(10.0, 5.0)),
        );
        let results = run(&model, &[("x", 0.0)]).unwrap();
        assert_eq!(predicted(&results, "label"), Some(Scalar::from("A")));

        // The record count decides before the category name does.
        let model = ensemble(
            MiningFunction::Classification,
            Segmentation::new(MultipleModelMethod::MajorityVote, segments(1.0, 5.0)),
        );
        let results = run(&model, &[("x", 0.0)]).unwrap();
        assert_eq!(predicted(&results, "label"), Some(Scalar::from("B")));
        let c = results.get("label").and_then(ResultValue::classification).unwrap();
        assert_eq!(c.value("A"), Some(2.0));
    }

    #[test]
    fn test_weighted_majority_vote() {
        let segments = vec![
            segment("1", voter("A", 1.0)),
            segment("2", voter("A", 1.0)),
            segment("3", voter("B", 1.0)).with_weight(3.0),
        ];
        let model = ensemble(
            MiningFunction::Classification,
            Segmentation::new(MultipleModelMethod::WeightedMajorityVote, segments),
        );
        let results = run(&model, &[("x", 0.0)]).unwrap();
        assert_eq!(predicted(&results, "label"), Some(Scalar::from("B")));
    }

    #[test]
    fn test_probability_average() {
        let segments = vec![
            segment(
                "1",
                leaf(vec![
                    ScoreDistribution::new("A", 8.0).with_probability(0.8),
                    ScoreDistribution::new("B", 2.0).with_probability(0.2),
                ]),
            ),
            segment(
                "2",
                leaf(vec![
                    ScoreDistribution::new("A", 4.0).with_probability(0.4),
                    ScoreDistribution::new("B", 6.0).with_probability(0.6),
                ]),
            ),
        ];
        let model = ensemble(MiningFunction::Classification, Segmentation::new(MultipleModelMethod::Average, segments));
        let results = run(&model, &[("x", 0.0)]).unwrap();
        let c = results.get("label").and_then(ResultValue::classification).unwrap();
        assert_eq!(c.result, Scalar::from("A"));
        assert_abs_diff_eq!(c.value("A").unwrap(), 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(c.value("B").unwrap(), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_threshold() {
        let segmentation = |threshold: f64| {
            Segmentation::new(
                MultipleModelMethod::Average,
                vec![
                    segment("1", constant(2.0)),
                    Segment::new("2", Predicate::False, constant(100.0)),
                    segment("3", constant(4.0)),
                    Segment::new("4", Predicate::False, constant(100.0)),
                ],
            )
            .with_missing_threshold(threshold)
        };

        // Half of the segments are silent.
        let model = ensemble(MiningFunction::Regression, segmentation(0.75));
        let results = run(&model, &[("x", 0.0)]).unwrap();
        assert_abs_diff_eq!(predicted(&results, "y").and_then(|s| s.as_f64()).unwrap(), 3.0);

        let model = ensemble(MiningFunction::Regression, segmentation(0.4));
        let results = run(&model, &[("x", 0.0)]).unwrap();
        assert!(results.contains("y"));
        assert!(results.get("y").is_none());
    }

    #[test]
    fn test_select_first() {
        let segments = vec![
            Segment::new("neg", Predicate::simple("x", SimpleOperator::LessThan, "0"), constant(1.0)),
            segment("rest", constant(2.0)),
        ];
        let model = ensemble(MiningFunction::Regression, Segmentation::new(MultipleModelMethod::SelectFirst, segments));

        let results = run(&model, &[("x", 5.0)]).unwrap();
        assert_eq!(predicted(&results, "y"), Some(Scalar::Double(2.0)));
        assert!(results.segment(&["rest"]).is_some());
        assert!(results.segment(&["neg"]).is_none());

        let results = run(&model, &[("x", -1.0)]).unwrap();
        assert_eq!(predicted(&results, "y"), Some(Scalar::Double(1.0)));
    }

    #[test]
    fn test_member_evaluators_are_lazy_and_cached() {
        let pmml = pmml();
        let config = EvaluatorConfig::default();
        let segments = vec![
            Segment::new("neg", Predicate::simple("x", SimpleOperator::LessThan, "0"), constant(1.0)),
            segment("rest", constant(2.0)),
        ];
        let model = ensemble(MiningFunction::Regression, Segmentation::new(MultipleModelMethod::SelectFirst, segments));
        let evaluator = MiningModelEvaluator::new(&pmml, &model, &config).unwrap();
        assert_eq!(evaluator.cached_evaluators(), 0);

        for _ in 0..3 {
            let mut ctx = EvaluationContext::new(&pmml, &model.info, &config);
            ctx.set_argument("x", 5.0);
            evaluator.evaluate(&mut ctx).unwrap();
        }
        assert_eq!(evaluator.cached_evaluators(), 1);

        let mut ctx = EvaluationContext::new(&pmml, &model.info, &config);
        ctx.set_argument("x", -5.0);
        evaluator.evaluate(&mut ctx).unwrap();
        assert_eq!(evaluator.cached_evaluators(), 2);
    }

    #[test]
    fn test_missing_prediction_treatment() {
        let segments = || vec![segment("blind", unpredictable()), segment("sighted", constant(7.0))];

        let model = ensemble(MiningFunction::Regression, Segmentation::new(MultipleModelMethod::SelectFirst, segments()));
        let results = run(&model, &[("x", 0.0)]).unwrap();
        assert_eq!(predicted(&results, "y"), Some(Scalar::Double(7.0)));

        let model = ensemble(
            MiningFunction::Regression,
            Segmentation::new(MultipleModelMethod::SelectFirst, segments())
                .with_missing_prediction_treatment(MissingPredictionTreatment::ReturnMissing),
        );
        let results = run(&model, &[("x", 0.0)]).unwrap();
        assert!(results.get("y").is_none());
        assert_eq!(results.segments().len(), 1);
    }

    #[test]
    fn test_select_all() {
        let segments = vec![segment("a", constant(1.0)), segment("b", constant(2.0))];
        let model = ensemble(MiningFunction::Regression, Segmentation::new(MultipleModelMethod::SelectAll, segments));
        let results = run(&model, &[("x", 0.0)]).unwrap();
        match results.get("y") {
            Some(ResultValue::Collection(values)) => {
                let values: Vec<Option<f64>> = values
                    .iter()
                    .map(|v| v.as_ref().and_then(ResultValue::predicted_value).and_then(Scalar::as_f64))
                    .collect();
                assert_eq!(values, vec![Some(1.0), Some(2.0)]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_select_all_field_mismatch() {
        let mut renamed = RegressionModel::new(
            ModelInfo::new(
                MiningFunction::Regression,
                MiningSchema::new(vec![MiningField::target("z")]),
            ),
            RegressionNormalization::None,
            vec![RegressionTable::new(1.0)],
        );
        renamed.info.output = Output::new(vec![OutputField::new("extra", ResultFeature::PredictedValue)]);
        let segments = vec![segment("a", constant(1.0)), segment("b", Model::Regression(renamed))];
        let model = ensemble(MiningFunction::Regression, Segmentation::new(MultipleModelMethod::SelectAll, segments));
        let err = run(&model, &[("x", 0.0)]).unwrap_err();
        assert!(matches!(err, PmmlError::EvaluationConsistency(_)));
    }

    #[test]
    fn test_model_chain() {
        let mut first = RegressionModel::new(
            info(MiningFunction::Regression),
            RegressionNormalization::None,
            vec![RegressionTable::new(3.0)],
        );
        first.info.output = Output::new(vec![OutputField::new("stage1", ResultFeature::PredictedValue)]);
        let second = RegressionModel::new(
            info(MiningFunction::Regression),
            RegressionNormalization::None,
            vec![RegressionTable::new(0.0).numeric("stage1", 2.0, 1)],
        );
        let segments = vec![
            segment("first", Model::Regression(first)),
            Segment::new(
                "second",
                Predicate::simple("stage1", SimpleOperator::GreaterThan, "1"),
                Model::Regression(second),
            ),
        ];
        let model = ensemble(MiningFunction::Regression, Segmentation::new(MultipleModelMethod::ModelChain, segments));
        let results = run(&model, &[("x", 0.0)]).unwrap();
        assert_eq!(predicted(&results, "y"), Some(Scalar::Double(6.0)));
        assert_eq!(results.segments().len(), 2);
    }

    #[test]
    fn test_model_chain_checks_last_segment() {
        let mut first = RegressionModel::new(
            info(MiningFunction::Regression),
            RegressionNormalization::None,
            vec![RegressionTable::new(3.0)],
        );
        first.info.output = Output::new(vec![OutputField::new("stage1", ResultFeature::PredictedValue)]);
        let segments = vec![segment("first", Model::Regression(first)), segment("second", voter("A", 1.0))];
        let model = ensemble(MiningFunction::Regression, Segmentation::new(MultipleModelMethod::ModelChain, segments));
        let err = run(&model, &[("x", 0.0)]).unwrap_err();
        assert!(matches!(err, PmmlError::EvaluationConsistency(_)));
    }

    #[test]
    fn test_nested_ensembles() {
        let inner = ensemble(
            MiningFunction::Regression,
            Segmentation::new(
                MultipleModelMethod::Sum,
                vec![segment("i1", constant(1.0)), segment("i2", constant(2.0))],
            ),
        );
        let outer = ensemble(
            MiningFunction::Regression,
            Segmentation::new(
                MultipleModelMethod::Average,
                vec![segment("inner", Model::Mining(inner)), segment("plain", constant(5.0))],
            ),
        );
        let results = run(&outer, &[("x", 0.0)]).unwrap();
        assert_abs_diff_eq!(predicted(&results, "y").and_then(|s| s.as_f64()).unwrap(), 4.0);

        let nested = results.segment(&["inner", "i2"]).unwrap();
        assert_eq!(predicted(nested, "y"), Some(Scalar::Double(2.0)));
    }

    #[test]
    fn test_rejected_structures() {
        let pmml = pmml();
        let config = EvaluatorConfig::default();
        let build = |model: &MiningModel| MiningModelEvaluator::new(&pmml, model, &config).err();

        let skip = ensemble(
            MiningFunction::Regression,
            Segmentation::new(MultipleModelMethod::Average, vec![segment("a", constant(1.0))])
                .with_missing_prediction_treatment(MissingPredictionTreatment::SkipSegment),
        );
        assert!(matches!(build(&skip), Some(PmmlError::UnsupportedVariant { .. })));

        let bare = MiningModel { info: info(MiningFunction::Regression), segmentation: None };
        assert!(matches!(build(&bare), Some(PmmlError::MissingStructure(_))));

        let mixed = ensemble(
            MiningFunction::Regression,
            Segmentation::new(MultipleModelMethod::Average, vec![segment("a", voter("A", 1.0))]),
        );
        assert!(matches!(build(&mixed), Some(PmmlError::EvaluationConsistency(_))));

        let voting = ensemble(
            MiningFunction::Regression,
            Segmentation::new(MultipleModelMethod::MajorityVote, vec![segment("a", constant(1.0))]),
        );
        assert!(matches!(build(&voting), Some(PmmlError::UnsupportedVariant { .. })));
    }
}
