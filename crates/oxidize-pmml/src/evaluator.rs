use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use rayon::prelude::*;

use oxidize_pmml_core::{PmmlError, PmmlResult, Scalar};
use oxidize_pmml_eval::{EvaluationContext, EvaluatorConfig, ModelEvaluator, ModelTarget, Results};
use oxidize_pmml_mining::new_evaluator;
use oxidize_pmml_model::{Model, Pmml, ResultFeature};

use crate::verification::{self, VerificationReport};

/// Read a model document from its JSON form.
pub fn from_json(json: &str) -> PmmlResult<Pmml> {
    serde_json::from_str(json).map_err(|e| PmmlError::InvalidStructure(format!("malformed model document: {}", e)))
}

/// Scores records against one model of a document.
///
/// Construction validates the model and fails on anything the engine cannot
/// evaluate. After that the evaluator is read-only and can be shared across
/// threads; every call to [`evaluate`](Evaluator::evaluate) gets a fresh
/// context.
pub struct Evaluator<'m> {
    pmml: &'m Pmml,
    model: &'m Model,
    config: EvaluatorConfig,
    inner: Arc<dyn ModelEvaluator + 'm>,
    report: OnceLock<VerificationReport>,
}

impl<'m> Evaluator<'m> {
    /// Evaluator for the first model of the document, with default settings.
    pub fn new(pmml: &'m Pmml) -> PmmlResult<Self> {
        Evaluator::with_config(pmml, None, EvaluatorConfig::default())
    }

    /// Evaluator for the model called `name`.
    pub fn for_model(pmml: &'m Pmml, name: &str) -> PmmlResult<Self> {
        Evaluator::with_config(pmml, Some(name), EvaluatorConfig::default())
    }

    pub fn with_config(pmml: &'m Pmml, name: Option<&str>, config: EvaluatorConfig) -> PmmlResult<Self> {
        let model = pmml.model(name)?;
        model.check_structure()?;
        let inner = new_evaluator(pmml, model, &config)?;
        tracing::debug!(model = model.kind(), name = ?model.info().model_name, "evaluator built");

        let evaluator = Evaluator {
            pmml,
            model,
            config,
            inner,
            report: OnceLock::new(),
        };
        if evaluator.config.verify_on_build && model.info().verification.is_some() {
            let report = evaluator.verify();
            if !report.is_ok() {
                // Fixture mismatches are diagnostics; evaluation stays available.
                for failure in &report.failures {
                    tracing::warn!(model = model.kind(), %failure, "verification mismatch");
                }
            }
        }
        Ok(evaluator)
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn target(&self) -> &ModelTarget {
        self.inner.target()
    }

    /// Result features the model can produce.
    pub fn features(&self) -> BTreeSet<ResultFeature> {
        self.inner.features()
    }

    pub fn supports(&self, feature: ResultFeature) -> bool {
        self.inner.supports(feature)
    }

    /// Evaluate one record given as (field name, raw value) pairs.
    pub fn evaluate<I, K, V>(&self, inputs: I) -> PmmlResult<Results>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        let mut ctx = EvaluationContext::new(self.pmml, self.model.info(), &self.config);
        ctx.set_arguments(inputs);
        self.inner.evaluate(&mut ctx)
    }

    /// Evaluate independent records in parallel. The output is in input
    /// order; a failing record does not affect the others.
    pub fn evaluate_batch(&self, records: &[HashMap<String, Scalar>]) -> Vec<PmmlResult<Results>> {
        records
            .par_iter()
            .map(|record| self.evaluate(record.iter().map(|(k, v)| (k.as_str(), v.clone()))))
            .collect()
    }

    /// Check the model against its embedded fixtures. Runs at most once per
    /// evaluator; later calls return the same report.
    pub fn verify(&self) -> &VerificationReport {
        self.report.get_or_init(|| {
            let report = match &self.model.info().verification {
                Some(fixtures) => verification::verify(fixtures, |inputs| self.evaluate(inputs.iter().cloned())),
                None => VerificationReport::default(),
            };
            tracing::debug!(records = report.records, failures = report.failures.len(), "model verified");
            report
        })
    }
}
