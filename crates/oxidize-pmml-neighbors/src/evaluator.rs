use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use oxidize_pmml_core::{Number, PmmlError, PmmlResult, Scalar, ValueAggregator, VoteAggregator};
use oxidize_pmml_eval::output;
use oxidize_pmml_eval::{
    Classification, ClassificationKind, EntityRegistry, EntityValue, EvaluationContext, EvaluatorConfig,
    ModelEvaluator, ModelTarget, ResultValue, Results,
};
use oxidize_pmml_model::{
    CategoricalScoringMethod, ComparisonMeasure, ContinuousScoringMethod, MathContext, MiningFunction, ModelInfo,
    NearestNeighborModel, Pmml, ResultFeature, TrainingInstance,
};

/// Scores a record from the `k` training instances closest to it.
pub struct NearestNeighborEvaluator<'m> {
    model: &'m NearestNeighborModel,
    /// Input coordinates of every training instance.
    points: Vec<Vec<f64>>,
    targets: Vec<&'m Scalar>,
    k: usize,
    target: ModelTarget,
    registry: OnceLock<EntityRegistry<'m, TrainingInstance>>,
}

impl<'m> NearestNeighborEvaluator<'m> {
    pub fn new(pmml: &'m Pmml, model: &'m NearestNeighborModel, _config: &EvaluatorConfig) -> PmmlResult<Self> {
        if model.inputs.is_empty() {
            return Err(PmmlError::MissingStructure("NearestNeighborModel/KNNInputs".into()));
        }
        if model.instances.is_empty() {
            return Err(PmmlError::MissingStructure("NearestNeighborModel/TrainingInstances".into()));
        }
        if model.number_of_neighbors == 0 {
            return Err(PmmlError::InvalidStructure("numberOfNeighbors must be positive".into()));
        }
        match model.info.mining_function {
            MiningFunction::Classification | MiningFunction::Regression => {}
            other => return Err(PmmlError::unsupported("miningFunction", other)),
        }

        let target = ModelTarget::resolve(pmml, &model.info);
        let mut points = Vec::with_capacity(model.instances.len());
        let mut targets = Vec::with_capacity(model.instances.len());
        for (position, instance) in model.instances.iter().enumerate() {
            let mut point = Vec::with_capacity(model.inputs.len());
            for input in &model.inputs {
                let x = instance.values.get(&input.field).and_then(Scalar::as_f64).ok_or_else(|| {
                    PmmlError::InvalidStructure(format!(
                        "training instance {} has no numeric {}",
                        position + 1,
                        input.field
                    ))
                })?;
                point.push(x);
            }
            let y = instance.values.get(&target.name).ok_or_else(|| {
                PmmlError::InvalidStructure(format!("training instance {} has no {}", position + 1, target.name))
            })?;
            points.push(point);
            targets.push(y);
        }

        let evaluator = NearestNeighborEvaluator {
            model,
            points,
            targets,
            k: model.number_of_neighbors.min(model.instances.len()),
            target,
            registry: OnceLock::new(),
        };
        output::check_features(&model.info, &evaluator.features())?;
        Ok(evaluator)
    }

    /// Training instances by id. Ids come from the instance id variable when
    /// it holds text, otherwise from the 1-based instance position.
    pub fn registry(&self) -> &EntityRegistry<'m, TrainingInstance> {
        self.registry.get_or_init(|| {
            let variable = self.model.instance_id_variable.as_deref();
            EntityRegistry::build(self.model.instances.iter().map(|instance| {
                let id = variable
                    .and_then(|name| instance.values.get(name))
                    .and_then(Scalar::as_str);
                (id, instance)
            }))
        })
    }

    fn distance<N: Number>(&self, query: &[N], point: &[f64]) -> N {
        let terms = self.model.inputs.iter().zip(query).zip(point).map(|((input, &x), &y)| {
            (N::from_f64(input.field_weight), x - N::from_f64(y))
        });
        match self.model.measure {
            ComparisonMeasure::Euclidean => terms.map(|(w, d)| w * d * d).sum::<N>().sqrt(),
            ComparisonMeasure::SquaredEuclidean => terms.map(|(w, d)| w * d * d).sum(),
            ComparisonMeasure::CityBlock => terms.map(|(w, d)| w * d.abs()).sum(),
        }
    }

    /// Indices and distances of the nearest instances, closest first.
    /// Equally distant instances keep their training order.
    fn neighbors<N: Number>(&self, query: &[N]) -> Vec<(usize, N)> {
        let mut neighbors: Vec<(usize, N)> = self
            .points
            .iter()
            .enumerate()
            .map(|(index, point)| (index, self.distance(query, point)))
            .collect();
        neighbors.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        neighbors.truncate(self.k);
        neighbors
    }

    fn weight<N: Number>(&self, distance: N) -> N {
        N::ONE / (distance + N::from_f64(self.model.threshold))
    }

    fn evaluate_in<N: Number>(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        let mut query = Vec::with_capacity(self.model.inputs.len());
        for input in &self.model.inputs {
            match ctx.evaluate(&input.field)? {
                Some(value) => query.push(N::from_f64(value.as_f64()?)),
                None => return Ok(self.missing()),
            }
        }

        let neighbors = self.neighbors(&query);
        let entity_id = neighbors
            .first()
            .and_then(|&(index, _)| self.registry().id_of(&self.model.instances[index]))
            .map(str::to_string);
        tracing::trace!(neighbors = neighbors.len(), nearest = ?entity_id, "neighbors selected");

        let value = match self.model.info.mining_function {
            MiningFunction::Classification => {
                let mut votes = VoteAggregator::<N>::new();
                for &(index, distance) in &neighbors {
                    let category = self.targets[index].to_string();
                    match self.model.categorical_scoring_method {
                        CategoricalScoringMethod::MajorityVote => votes.add(&category),
                        CategoricalScoringMethod::WeightedMajorityVote => {
                            votes.add_weighted(&category, self.weight(distance), N::ZERO)
                        }
                    }
                }
                let winner = votes
                    .winner()
                    .ok_or_else(|| PmmlError::EvaluationConsistency("no neighbor voted".into()))?;
                let values: BTreeMap<String, f64> = votes.votes().into_iter().map(|(k, v)| (k, v.to_f64())).collect();
                ResultValue::Classification(
                    Classification::new(ClassificationKind::Vote, self.target.parse(&winner)?, values)
                        .with_entity(entity_id, Vec::new()),
                )
            }
            _ => {
                let mut aggregator = ValueAggregator::<N>::buffered();
                for &(index, distance) in &neighbors {
                    let y = self.targets[index].as_f64().ok_or_else(|| PmmlError::TypeMismatch {
                        left: self.targets[index].data_type().to_string(),
                        right: self.target.data_type.to_string(),
                    })?;
                    aggregator.add_weighted(N::from_f64(y), self.weight(distance));
                }
                let value = match self.model.continuous_scoring_method {
                    ContinuousScoringMethod::Average => aggregator.average(),
                    ContinuousScoringMethod::WeightedAverage => aggregator.weighted_average(),
                    ContinuousScoringMethod::Median => aggregator.median()?,
                };
                let value = match value {
                    Some(value) => self.target.data_type.parse(&value.get().to_scalar())?,
                    None => return Ok(self.missing()),
                };
                ResultValue::Entity(EntityValue { value, entity_id, decision_path: Vec::new() })
            }
        };
        Ok(Results::single(&self.target.name, Some(value)))
    }
}

impl<'m> ModelEvaluator for NearestNeighborEvaluator<'m> {
    fn info(&self) -> &ModelInfo {
        &self.model.info
    }

    fn target(&self) -> &ModelTarget {
        &self.target
    }

    fn features(&self) -> BTreeSet<ResultFeature> {
        BTreeSet::from([ResultFeature::PredictedValue, ResultFeature::EntityId])
    }

    fn evaluate_model(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        match self.model.info.math_context {
            MathContext::Float => self.evaluate_in::<f32>(ctx),
            MathContext::Double => self.evaluate_in::<f64>(ctx),
        }
    }
}
