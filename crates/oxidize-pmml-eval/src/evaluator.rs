use std::collections::BTreeSet;

use oxidize_pmml_core::PmmlResult;
use oxidize_pmml_model::{ModelInfo, ResultFeature};

use crate::context::EvaluationContext;
use crate::output;
use crate::result::Results;
use crate::target::ModelTarget;

/// Common interface of all model evaluators.
///
/// An evaluator is built once per model and shared across threads; all
/// per-record state lives in the [`EvaluationContext`].
pub trait ModelEvaluator: Send + Sync {
    fn info(&self) -> &ModelInfo;

    fn target(&self) -> &ModelTarget;

    /// Result features this evaluator can produce.
    fn features(&self) -> BTreeSet<ResultFeature>;

    /// Evaluate the model itself, without output fields.
    fn evaluate_model(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results>;

    /// Evaluate the model and apply its output fields.
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        let mut results = self.evaluate_model(ctx)?;
        output::apply_outputs(self.info(), self.target(), &mut results)?;
        Ok(results)
    }

    fn supports(&self, feature: ResultFeature) -> bool {
        self.features().contains(&feature)
    }

    /// A result with the target missing.
    fn missing(&self) -> Results {
        Results::single(&self.target().name, None)
    }
}
