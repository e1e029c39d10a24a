//! The model graph consumed by the evaluators.
//!
//! Everything here is plain data: built once (by a parser, a deserializer or
//! by hand), never mutated during evaluation, and shared by reference.

pub mod field;
pub mod schema;
pub mod expression;
pub mod predicate;
pub mod model;
pub mod tree;
pub mod mining;
pub mod regression;
pub mod neural;
pub mod svm;
pub mod neighbors;
pub mod association;
pub mod verification;

pub use field::{Closure, DataDictionary, DataField, Interval};
pub use schema::{
    FieldUsage, InvalidValueTreatment, MiningField, MiningSchema, Output, OutputField, ResultFeature,
};
pub use expression::{
    DefineFunction, DerivedField, DiscretizeBin, Expression, LinearNorm, OutlierTreatment, ParameterField,
    TransformationDictionary, ValueMapping,
};
pub use predicate::{BooleanOperator, CompoundOperator, Predicate, SimpleOperator};
pub use model::{MathContext, MiningFunction, Model, ModelInfo, Pmml};
pub use tree::{
    MissingValueStrategy, NoTrueChildStrategy, Node, ScoreDistribution, TreeModel,
};
pub use mining::{
    MiningModel, MissingPredictionTreatment, MultipleModelMethod, Segment, Segmentation,
};
pub use regression::{
    CategoricalPredictor, NumericPredictor, RegressionModel, RegressionNormalization, RegressionTable,
};
pub use neural::{
    Connection, LayerNormalization, NeuralInput, NeuralLayer, NeuralNetwork, NeuralOutput, Neuron,
};
pub use svm::{
    Kernel, SupportVector, SupportVectorMachine, SupportVectorMachineModel, SvmClassificationMethod,
    SvmCoefficient, VectorDictionary,
};
pub use neighbors::{
    CategoricalScoringMethod, ComparisonMeasure, ContinuousScoringMethod, KnnInput, NearestNeighborModel,
    TrainingInstance,
};
pub use association::{AssociationModel, AssociationRule, Item, Itemset};
pub use verification::{ModelVerification, VerificationField, VerificationRecord};
