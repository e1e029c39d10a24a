use oxidize_pmml_core::{PmmlError, PmmlResult};
use serde::{Deserialize, Serialize};

use crate::association::AssociationModel;
use crate::expression::{DerivedField, TransformationDictionary};
use crate::field::DataDictionary;
use crate::mining::MiningModel;
use crate::neighbors::NearestNeighborModel;
use crate::neural::NeuralNetwork;
use crate::regression::RegressionModel;
use crate::schema::{MiningSchema, Output};
use crate::svm::SupportVectorMachineModel;
use crate::tree::TreeModel;
use crate::verification::ModelVerification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MiningFunction {
    Classification,
    Regression,
    Clustering,
    AssociationRules,
}

/// Numeric precision a model is evaluated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MathContext {
    Float,
    #[default]
    Double,
}

/// Attributes and sub-structures shared by every model kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    #[serde(default)]
    pub model_name: Option<String>,
    pub mining_function: MiningFunction,
    #[serde(default)]
    pub mining_schema: MiningSchema,
    #[serde(default)]
    pub local_transformations: Vec<DerivedField>,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub math_context: MathContext,
    #[serde(default)]
    pub verification: Option<ModelVerification>,
}

impl ModelInfo {
    pub fn new(mining_function: MiningFunction, mining_schema: MiningSchema) -> Self {
        ModelInfo {
            model_name: None,
            mining_function,
            mining_schema,
            local_transformations: Vec::new(),
            output: Output::default(),
            math_context: MathContext::default(),
            verification: None,
        }
    }

    pub fn local_field(&self, name: &str) -> Option<&DerivedField> {
        self.local_transformations.iter().find(|f| f.name == name)
    }
}

/// One model of any supported kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Model {
    Tree(TreeModel),
    Mining(MiningModel),
    NeuralNetwork(NeuralNetwork),
    SupportVectorMachine(SupportVectorMachineModel),
    NearestNeighbor(NearestNeighborModel),
    Regression(RegressionModel),
    Association(AssociationModel),
}

impl Model {
    pub fn info(&self) -> &ModelInfo {
        match self {
            Model::Tree(m) => &m.info,
            Model::Mining(m) => &m.info,
            Model::NeuralNetwork(m) => &m.info,
            Model::SupportVectorMachine(m) => &m.info,
            Model::NearestNeighbor(m) => &m.info,
            Model::Regression(m) => &m.info,
            Model::Association(m) => &m.info,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Model::Tree(_) => "TreeModel",
            Model::Mining(_) => "MiningModel",
            Model::NeuralNetwork(_) => "NeuralNetwork",
            Model::SupportVectorMachine(_) => "SupportVectorMachineModel",
            Model::NearestNeighbor(_) => "NearestNeighborModel",
            Model::Regression(_) => "RegressionModel",
            Model::Association(_) => "AssociationModel",
        }
    }

    /// Verify that the mandatory sub-structures are present, recursing into
    /// ensemble members.
    pub fn check_structure(&self) -> PmmlResult<()> {
        let missing = |what: &str| Err(PmmlError::MissingStructure(format!("{}/{}", self.kind(), what)));
        match self {
            Model::Tree(m) if m.node.is_none() => missing("Node"),
            Model::Mining(m) => {
                let segmentation = match &m.segmentation {
                    Some(s) => s,
                    None => return missing("Segmentation"),
                };
                if segmentation.multiple_model_method.is_none() {
                    return missing("Segmentation@multipleModelMethod");
                }
                for segment in &segmentation.segments {
                    match &segment.model {
                        Some(model) => model.check_structure()?,
                        None => return missing("Segment/Model"),
                    }
                }
                Ok(())
            }
            Model::NeuralNetwork(m) if m.layers.is_empty() => missing("NeuralLayer"),
            Model::SupportVectorMachine(m) if m.machines.is_empty() => missing("SupportVectorMachine"),
            Model::Regression(m) if m.tables.is_empty() => missing("RegressionTable"),
            Model::NearestNeighbor(m) if m.instances.is_empty() => missing("TrainingInstances"),
            _ => Ok(()),
        }
    }
}

/// Document root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pmml {
    pub data_dictionary: DataDictionary,
    #[serde(default)]
    pub transformation_dictionary: TransformationDictionary,
    #[serde(default)]
    pub models: Vec<Model>,
}

impl Pmml {
    pub fn new(data_dictionary: DataDictionary, models: Vec<Model>) -> Self {
        Pmml {
            data_dictionary,
            transformation_dictionary: TransformationDictionary::default(),
            models,
        }
    }

    pub fn with_transformations(mut self, transformations: TransformationDictionary) -> Self {
        self.transformation_dictionary = transformations;
        self
    }

    pub fn model(&self, name: Option<&str>) -> PmmlResult<&Model> {
        let found = match name {
            Some(name) => self.models.iter().find(|m| m.info().model_name.as_deref() == Some(name)),
            None => self.models.first(),
        };
        found.ok_or_else(|| PmmlError::MissingStructure(format!("PMML/Model {}", name.unwrap_or(""))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::DataField;
    use crate::mining::{MultipleModelMethod, Segment, Segmentation};
    use crate::predicate::Predicate;
    use crate::schema::MiningField;

    fn info() -> ModelInfo {
        ModelInfo::new(MiningFunction::Regression, MiningSchema::new(vec![MiningField::target("y")]))
    }

    #[test]
    fn test_tree_without_root_is_missing_structure() {
        let model = Model::Tree(TreeModel::new(info(), None));
        assert!(matches!(model.check_structure(), Err(PmmlError::MissingStructure(_))));
    }

    #[test]
    fn test_nested_segment_checked() {
        let inner = Model::Tree(TreeModel::new(info(), None));
        let segmentation = Segmentation::new(
            MultipleModelMethod::Average,
            vec![Segment::new("1", Predicate::True, inner)],
        );
        let model = Model::Mining(MiningModel::new(info(), segmentation));
        let err = model.check_structure().unwrap_err();
        assert_eq!(err, PmmlError::MissingStructure("TreeModel/Node".into()));
    }

    #[test]
    fn test_model_lookup() {
        let pmml = Pmml::new(DataDictionary::new(vec![DataField::continuous("y")]), vec![]);
        assert!(pmml.model(None).is_err());
    }

    #[test]
    fn test_deserialize_tree_model() {
        let json = r#"{
            "dataDictionary": {"fields": [
                {"name": "x", "dataType": "double", "opType": "continuous"},
                {"name": "y", "dataType": "double", "opType": "continuous"}
            ]},
            "models": [{
                "type": "Tree",
                "miningFunction": "regression",
                "miningSchema": {"fields": [{"name": "x"}, {"name": "y", "usageType": "target"}]},
                "node": {
                    "predicate": {"type": "true"},
                    "score": "1",
                    "nodes": [
                        {"id": "left", "score": "2",
                         "predicate": {"type": "simple", "field": "x", "operator": "lessThan", "value": "0"}}
                    ]
                }
            }]
        }"#;
        let pmml: Pmml = serde_json::from_str(json).unwrap();
        let model = pmml.model(None).unwrap();
        assert_eq!(model.kind(), "TreeModel");
        assert!(model.check_structure().is_ok());
        match model {
            Model::Tree(tree) => {
                let root = tree.node.as_ref().unwrap();
                assert_eq!(root.nodes[0].id.as_deref(), Some("left"));
            }
            other => panic!("unexpected model {:?}", other.kind()),
        }
    }
}
