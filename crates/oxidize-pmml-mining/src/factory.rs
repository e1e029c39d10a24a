use std::sync::Arc;

use oxidize_pmml_core::PmmlResult;
use oxidize_pmml_eval::{EvaluatorConfig, ModelEvaluator};
use oxidize_pmml_model::{Model, Pmml};

use oxidize_pmml_association::AssociationModelEvaluator;
use oxidize_pmml_neighbors::NearestNeighborEvaluator;
use oxidize_pmml_neural::NeuralNetworkEvaluator;
use oxidize_pmml_regression::RegressionModelEvaluator;
use oxidize_pmml_svm::SupportVectorMachineEvaluator;
use oxidize_pmml_tree::TreeModelEvaluator;

use crate::evaluator::MiningModelEvaluator;

/// Build the evaluator for `model`.
pub fn new_evaluator<'m>(
    pmml: &'m Pmml,
    model: &'m Model,
    config: &EvaluatorConfig,
) -> PmmlResult<Arc<dyn ModelEvaluator + 'm>> {
    let evaluator: Arc<dyn ModelEvaluator + 'm> = match model {
        Model::Tree(m) => Arc::new(TreeModelEvaluator::new(pmml, m, config)?),
        Model::Mining(m) => Arc::new(MiningModelEvaluator::new(pmml, m, config)?),
        Model::NeuralNetwork(m) => Arc::new(NeuralNetworkEvaluator::new(pmml, m, config)?),
        Model::SupportVectorMachine(m) => Arc::new(SupportVectorMachineEvaluator::new(pmml, m, config)?),
        Model::NearestNeighbor(m) => Arc::new(NearestNeighborEvaluator::new(pmml, m, config)?),
        Model::Regression(m) => Arc::new(RegressionModelEvaluator::new(pmml, m, config)?),
        Model::Association(m) => Arc::new(AssociationModelEvaluator::new(pmml, m, config)?),
    };
    Ok(evaluator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxidize_pmml_core::PmmlError;
    use oxidize_pmml_model::{
        DataDictionary, MiningFunction, MiningSchema, ModelInfo, Node, Predicate, RegressionModel,
        RegressionNormalization, RegressionTable, ResultFeature, TreeModel,
    };

    #[test]
    fn test_dispatch_by_kind() {
        let pmml = Pmml::new(DataDictionary::default(), vec![]);
        let config = EvaluatorConfig::default();

        let regression = Model::Regression(RegressionModel::new(
            ModelInfo::new(MiningFunction::Regression, MiningSchema::default()),
            RegressionNormalization::None,
            vec![RegressionTable::new(1.0)],
        ));
        let evaluator = new_evaluator(&pmml, &regression, &config).unwrap();
        assert_eq!(evaluator.info().mining_function, MiningFunction::Regression);
        assert!(evaluator.supports(ResultFeature::PredictedValue));

        let tree = Model::Tree(TreeModel::new(
            ModelInfo::new(MiningFunction::Classification, MiningSchema::default()),
            Some(Node::new(Predicate::True).with_score("a")),
        ));
        let evaluator = new_evaluator(&pmml, &tree, &config).unwrap();
        assert!(evaluator.supports(ResultFeature::Probability));

        let rootless = Model::Tree(TreeModel::new(
            ModelInfo::new(MiningFunction::Classification, MiningSchema::default()),
            None,
        ));
        assert!(matches!(new_evaluator(&pmml, &rootless, &config).err(), Some(PmmlError::MissingStructure(_))));
    }
}
