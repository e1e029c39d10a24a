use std::collections::{BTreeMap, BTreeSet};

use oxidize_pmml_core::{Number, PmmlError, PmmlResult, Value};
use oxidize_pmml_eval::output;
use oxidize_pmml_eval::{
    Classification, ClassificationKind, EvaluationContext, EvaluatorConfig, ModelEvaluator, ModelTarget,
    ResultValue, Results,
};
use oxidize_pmml_model::{
    MathContext, MiningFunction, ModelInfo, Pmml, RegressionModel, RegressionNormalization, RegressionTable,
    ResultFeature,
};

/// Evaluates regression tables, either as a single regression equation or
/// as one equation per target category.
pub struct RegressionModelEvaluator<'m> {
    model: &'m RegressionModel,
    target: ModelTarget,
}

impl<'m> RegressionModelEvaluator<'m> {
    pub fn new(pmml: &'m Pmml, model: &'m RegressionModel, _config: &EvaluatorConfig) -> PmmlResult<Self> {
        if model.tables.is_empty() {
            return Err(PmmlError::MissingStructure("RegressionModel/RegressionTable".into()));
        }

        let normalization = model.normalization_method;
        match model.info.mining_function {
            MiningFunction::Regression => match normalization {
                RegressionNormalization::Simplemax
                | RegressionNormalization::Softmax
                | RegressionNormalization::Probit => {
                    return Err(PmmlError::unsupported("normalizationMethod", normalization));
                }
                _ => {}
            },
            MiningFunction::Classification => {
                if normalization == RegressionNormalization::Probit {
                    return Err(PmmlError::unsupported("normalizationMethod", normalization));
                }
                if model.tables.len() < 2 {
                    return Err(PmmlError::InvalidStructure(
                        "classification needs a regression table per category".into(),
                    ));
                }
                if model.tables.iter().any(|t| t.target_category.is_none()) {
                    return Err(PmmlError::InvalidStructure("RegressionTable without targetCategory".into()));
                }
            }
            other => return Err(PmmlError::unsupported("miningFunction", other)),
        }

        let evaluator = RegressionModelEvaluator {
            model,
            target: ModelTarget::resolve(pmml, &model.info),
        };
        output::check_features(&model.info, &evaluator.features())?;
        Ok(evaluator)
    }

    fn regression<N: Number>(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        let mut value = match table_value::<N>(&self.model.tables[0], ctx)? {
            Some(value) => value,
            None => return Ok(self.missing()),
        };
        link(&mut value, self.model.normalization_method)?;

        let scalar = self.target.data_type.parse(&value.get().to_scalar())?;
        Ok(Results::single(&self.target.name, Some(ResultValue::Value(scalar))))
    }

    fn classification<N: Number>(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        let mut values: Vec<Value<N>> = Vec::with_capacity(self.model.tables.len());
        for table in &self.model.tables {
            match table_value::<N>(table, ctx)? {
                Some(value) => values.push(value),
                None => return Ok(self.missing()),
            }
        }

        match self.model.normalization_method {
            RegressionNormalization::Softmax => Value::softmax(&mut values),
            RegressionNormalization::Simplemax => Value::simplemax(&mut values),
            method => {
                // Every equation but the last is a probability in its own
                // right; the last category takes what is left.
                let (last, rest) = match values.split_last_mut() {
                    Some(split) => split,
                    None => return Ok(self.missing()),
                };
                let mut total = N::ZERO;
                for value in rest.iter_mut() {
                    link(value, method)?;
                    total += value.get();
                }
                *last = Value::new(N::ONE);
                last.subtract(total);
            }
        }

        let probabilities: BTreeMap<String, f64> = self
            .model
            .tables
            .iter()
            .zip(&values)
            .filter_map(|(table, value)| table.target_category.clone().map(|c| (c, value.to_f64())))
            .collect();
        let category = Classification::best_category(ClassificationKind::Probability, &probabilities)
            .map(str::to_string)
            .ok_or_else(|| PmmlError::EvaluationConsistency("no category scored".into()))?;
        tracing::trace!(category = %category, "regression classified");

        let classification =
            Classification::new(ClassificationKind::Probability, self.target.parse(&category)?, probabilities);
        Ok(Results::single(&self.target.name, Some(ResultValue::Classification(classification))))
    }

    fn evaluate_in<N: Number>(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        match self.model.info.mining_function {
            MiningFunction::Classification => self.classification::<N>(ctx),
            _ => self.regression::<N>(ctx),
        }
    }
}

fn link<N: Number>(value: &mut Value<N>, method: RegressionNormalization) -> PmmlResult<()> {
    match method {
        RegressionNormalization::None => {}
        RegressionNormalization::Logit => {
            value.inverse_logit();
        }
        RegressionNormalization::Exp => {
            value.exp();
        }
        RegressionNormalization::Cloglog => {
            value.inverse_cloglog();
        }
        RegressionNormalization::Loglog => {
            value.inverse_loglog();
        }
        RegressionNormalization::Cauchit => {
            value.inverse_cauchit();
        }
        other => return Err(PmmlError::unsupported("normalizationMethod", other)),
    }
    Ok(())
}

/// `intercept + Σ coefficient·x^exponent + Σ coefficient·[x = value]`, or
/// `None` when a predictor's field is missing.
fn table_value<N: Number>(table: &RegressionTable, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Option<Value<N>>> {
    let mut result = Value::from_f64(table.intercept);

    for predictor in &table.numeric_predictors {
        let x = match ctx.evaluate(&predictor.name)? {
            Some(value) => N::from_f64(value.as_f64()?),
            None => return Ok(None),
        };
        result.add_product(N::from_f64(predictor.coefficient), x.powi(predictor.exponent));
    }

    for predictor in &table.categorical_predictors {
        let matches = match ctx.evaluate(&predictor.name)? {
            Some(value) => value.equals_raw(&predictor.value)?,
            None => return Ok(None),
        };
        if matches {
            result.add(N::from_f64(predictor.coefficient));
        }
    }
    Ok(Some(result))
}

impl<'m> ModelEvaluator for RegressionModelEvaluator<'m> {
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
        features
    }

    fn evaluate_model(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        match self.model.info.math_context {
            MathContext::Float => self.evaluate_in::<f32>(ctx),
            MathContext::Double => self.evaluate_in::<f64>(ctx),
        }
    }
}
