use std::collections::{BTreeMap, BTreeSet, HashMap};

use oxidize_pmml_core::{Number, PmmlError, PmmlResult, Value, VoteAggregator};
use oxidize_pmml_eval::output;
use oxidize_pmml_eval::{
    Classification, ClassificationKind, EvaluationContext, EvaluatorConfig, ModelEvaluator, ModelTarget,
    ResultValue, Results,
};
use oxidize_pmml_model::{
    Kernel, MathContext, MiningFunction, ModelInfo, Pmml, ResultFeature, SupportVectorMachine,
    SupportVectorMachineModel, SvmClassificationMethod,
};

/// Evaluates support vector machines.
///
/// Each machine computes `Σ coefficient·K(x, vector) + b`. Regression
/// reports the single machine's value; one-against-one classification
/// counts the votes of binary machines, one-against-all picks the category
/// whose machine gives the smallest value.
pub struct SupportVectorMachineEvaluator<'m> {
    model: &'m SupportVectorMachineModel,
    vectors: HashMap<&'m str, &'m [f64]>,
    target: ModelTarget,
}

impl<'m> SupportVectorMachineEvaluator<'m> {
    pub fn new(pmml: &'m Pmml, model: &'m SupportVectorMachineModel, _config: &EvaluatorConfig) -> PmmlResult<Self> {
        if model.machines.is_empty() {
            return Err(PmmlError::MissingStructure("SupportVectorMachineModel/SupportVectorMachine".into()));
        }

        let dictionary = &model.vector_dictionary;
        let mut vectors = HashMap::new();
        for vector in &dictionary.vectors {
            if vector.values.len() != dictionary.fields.len() {
                return Err(PmmlError::InvalidStructure(format!(
                    "support vector {} has {} values for {} fields",
                    vector.id,
                    vector.values.len(),
                    dictionary.fields.len()
                )));
            }
            vectors.insert(vector.id.as_str(), vector.values.as_slice());
        }

        for machine in &model.machines {
            if let Some(c) = machine.coefficients.iter().find(|c| !vectors.contains_key(c.vector_id.as_str())) {
                return Err(PmmlError::InvalidStructure(format!("unknown support vector {}", c.vector_id)));
            }
        }

        match model.info.mining_function {
            MiningFunction::Regression => {}
            MiningFunction::Classification => {
                for machine in &model.machines {
                    let complete = match model.classification_method {
                        SvmClassificationMethod::OneAgainstOne => {
                            machine.target_category.is_some() && machine.alternate_target_category.is_some()
                        }
                        SvmClassificationMethod::OneAgainstAll => machine.target_category.is_some(),
                    };
                    if !complete {
                        return Err(PmmlError::InvalidStructure(format!(
                            "SupportVectorMachine without target categories for {:?}",
                            model.classification_method
                        )));
                    }
                }
            }
            other => return Err(PmmlError::unsupported("miningFunction", other)),
        }

        let evaluator = SupportVectorMachineEvaluator {
            model,
            vectors,
            target: ModelTarget::resolve(pmml, &model.info),
        };
        output::check_features(&model.info, &evaluator.features())?;
        Ok(evaluator)
    }

    fn decision<N: Number>(&self, machine: &SupportVectorMachine, input: &[N]) -> PmmlResult<Value<N>> {
        let mut result = Value::from_f64(machine.absolute_value);
        for c in &machine.coefficients {
            let vector = self
                .vectors
                .get(c.vector_id.as_str())
                .ok_or_else(|| PmmlError::InvalidStructure(format!("unknown support vector {}", c.vector_id)))?;
            result.add_product(N::from_f64(c.coefficient), kernel_eval(&self.model.kernel, input, vector));
        }
        Ok(result)
    }

    fn evaluate_in<N: Number>(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        let fields = &self.model.vector_dictionary.fields;
        let mut input = Vec::with_capacity(fields.len());
        for field in fields {
            match ctx.evaluate(field)? {
                Some(value) => input.push(N::from_f64(value.as_f64()?)),
                None => return Ok(self.missing()),
            }
        }

        let value = match self.model.info.mining_function {
            MiningFunction::Classification => ResultValue::Classification(self.classify(&input)?),
            _ => {
                let value = self.decision(&self.model.machines[0], &input)?;
                ResultValue::Value(self.target.data_type.parse(&value.get().to_scalar())?)
            }
        };
        Ok(Results::single(&self.target.name, Some(value)))
    }

    fn classify<N: Number>(&self, input: &[N]) -> PmmlResult<Classification> {
        let (kind, values) = match self.model.classification_method {
            SvmClassificationMethod::OneAgainstOne => {
                let mut votes = VoteAggregator::<N>::new();
                for machine in &self.model.machines {
                    let value = self.decision(machine, input)?;
                    let threshold = N::from_f64(machine.threshold.unwrap_or(self.model.threshold));
                    let category = if value.get() < threshold {
                        &machine.target_category
                    } else {
                        &machine.alternate_target_category
                    };
                    if let Some(category) = category {
                        votes.add(category);
                    }
                }
                let values: BTreeMap<String, f64> = votes.votes().into_iter().map(|(k, v)| (k, v.to_f64())).collect();
                (ClassificationKind::Vote, values)
            }
            SvmClassificationMethod::OneAgainstAll => {
                let mut values = BTreeMap::new();
                for machine in &self.model.machines {
                    if let Some(category) = &machine.target_category {
                        values.insert(category.clone(), self.decision(machine, input)?.to_f64());
                    }
                }
                (ClassificationKind::Distance, values)
            }
        };

        let category = Classification::best_category(kind, &values)
            .map(str::to_string)
            .ok_or_else(|| PmmlError::EvaluationConsistency("no category scored".into()))?;
        tracing::trace!(category = %category, method = ?self.model.classification_method, "svm classified");
        Ok(Classification::new(kind, self.target.parse(&category)?, values))
    }
}

fn dot<N: Number>(x: &[N], y: &[f64]) -> N {
    x.iter().zip(y).map(|(&a, &b)| a * N::from_f64(b)).sum()
}

fn kernel_eval<N: Number>(kernel: &Kernel, x: &[N], y: &[f64]) -> N {
    match *kernel {
        Kernel::Linear => dot(x, y),
        Kernel::Polynomial { gamma, coef0, degree } => {
            (N::from_f64(gamma) * dot(x, y) + N::from_f64(coef0)).powf(N::from_f64(degree))
        }
        Kernel::RadialBasis { gamma } => {
            let sq_dist: N = x
                .iter()
                .zip(y)
                .map(|(&a, &b)| {
                    let diff = a - N::from_f64(b);
                    diff * diff
                })
                .sum();
            (-N::from_f64(gamma) * sq_dist).exp()
        }
        Kernel::Sigmoid { gamma, coef0 } => (N::from_f64(gamma) * dot(x, y) + N::from_f64(coef0)).tanh(),
    }
}

impl<'m> ModelEvaluator for SupportVectorMachineEvaluator<'m> {
    fn info(&self) -> &ModelInfo {
        &self.model.info
    }

    fn target(&self) -> &ModelTarget {
        &self.target
    }

    fn features(&self) -> BTreeSet<ResultFeature> {
        BTreeSet::from([ResultFeature::PredictedValue])
    }

    fn evaluate_model(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        match self.model.info.math_context {
            MathContext::Float => self.evaluate_in::<f32>(ctx),
            MathContext::Double => self.evaluate_in::<f64>(ctx),
        }
    }
}
