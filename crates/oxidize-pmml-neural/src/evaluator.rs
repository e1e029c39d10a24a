use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use oxidize_pmml_core::{Activation, Number, PmmlError, PmmlResult, Value};
use oxidize_pmml_eval::output;
use oxidize_pmml_eval::{
    evaluate_expression, Classification, ClassificationKind, EntityRegistry, EvaluationContext, EvaluatorConfig,
    ModelEvaluator, ModelTarget, ResultValue, Results,
};
use oxidize_pmml_model::{
    LayerNormalization, LinearNorm, MathContext, MiningFunction, ModelInfo, NeuralNetwork, Neuron, Pmml,
    ResultFeature,
};

pub struct NeuralNetworkEvaluator<'m> {
    model: &'m NeuralNetwork,
    target: ModelTarget,
    registry: OnceLock<EntityRegistry<'m, Neuron>>,
}

impl<'m> NeuralNetworkEvaluator<'m> {
    pub fn new(pmml: &'m Pmml, model: &'m NeuralNetwork, _config: &EvaluatorConfig) -> PmmlResult<Self> {
        if model.inputs.is_empty() {
            return Err(PmmlError::MissingStructure("NeuralNetwork/NeuralInputs".into()));
        }
        if model.layers.is_empty() {
            return Err(PmmlError::MissingStructure("NeuralNetwork/NeuralLayer".into()));
        }
        if model.outputs.is_empty() {
            return Err(PmmlError::MissingStructure("NeuralNetwork/NeuralOutputs".into()));
        }
        match model.info.mining_function {
            MiningFunction::Classification | MiningFunction::Regression => {}
            other => return Err(PmmlError::unsupported("miningFunction", other)),
        }

        let activations = std::iter::once(model.activation_function)
            .chain(model.layers.iter().filter_map(|layer| layer.activation_function));
        for activation in activations {
            if activation == Activation::RadialBasis {
                return Err(PmmlError::unsupported("activationFunction", activation));
            }
        }

        // Connections only look backwards.
        let mut known: HashSet<&str> = model.inputs.iter().map(|input| input.id.as_str()).collect();
        for layer in &model.layers {
            for neuron in &layer.neurons {
                if let Some(connection) = neuron.connections.iter().find(|c| !known.contains(c.from.as_str())) {
                    return Err(PmmlError::InvalidStructure(format!(
                        "neuron {} is connected to unknown neuron {}",
                        neuron.id, connection.from
                    )));
                }
            }
            known.extend(layer.neurons.iter().map(|neuron| neuron.id.as_str()));
        }

        for output in &model.outputs {
            if !known.contains(output.output_neuron.as_str()) {
                return Err(PmmlError::InvalidStructure(format!("unknown output neuron {}", output.output_neuron)));
            }
            match (model.info.mining_function, &output.category) {
                (MiningFunction::Classification, None) => {
                    return Err(PmmlError::InvalidStructure(format!(
                        "output neuron {} has no target category",
                        output.output_neuron
                    )));
                }
                (MiningFunction::Regression, _) if !output.denormalization.is_empty() && output.denormalization.len() < 2 => {
                    return Err(PmmlError::InvalidStructure("denormalization needs at least two LinearNorm".into()));
                }
                _ => {}
            }
        }

        let evaluator = NeuralNetworkEvaluator {
            model,
            target: ModelTarget::resolve(pmml, &model.info),
            registry: OnceLock::new(),
        };
        output::check_features(&model.info, &evaluator.features())?;
        Ok(evaluator)
    }

    /// Neurons of all layers, by id.
    pub fn registry(&self) -> &EntityRegistry<'m, Neuron> {
        self.registry.get_or_init(|| {
            EntityRegistry::build(
                self.model
                    .layers
                    .iter()
                    .flat_map(|layer| layer.neurons.iter())
                    .map(|neuron| (Some(neuron.id.as_str()), neuron)),
            )
        })
    }

    /// Activation of every input and neuron, or `None` if an input is missing.
    fn propagate<N: Number>(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Option<HashMap<&'m str, N>>> {
        let mut activations: HashMap<&'m str, N> = HashMap::new();
        for input in &self.model.inputs {
            match evaluate_expression(&input.expression, ctx)? {
                Some(value) => activations.insert(input.id.as_str(), N::from_f64(value.as_f64()?)),
                None => return Ok(None),
            };
        }

        let threshold = N::from_f64(self.model.threshold);
        for layer in &self.model.layers {
            let activation = layer.activation_function.unwrap_or(self.model.activation_function);
            let mut outputs: Vec<Value<N>> = Vec::with_capacity(layer.neurons.len());
            for neuron in &layer.neurons {
                let mut z = Value::from_f64(neuron.bias);
                for connection in &neuron.connections {
                    let input = activations
                        .get(connection.from.as_str())
                        .copied()
                        .ok_or_else(|| PmmlError::InvalidStructure(format!("unknown neuron {}", connection.from)))?;
                    z.add_product(N::from_f64(connection.weight), input);
                }
                z.activate(activation, threshold)?;
                outputs.push(z);
            }

            match layer.normalization_method.unwrap_or(self.model.normalization_method) {
                LayerNormalization::None => {}
                LayerNormalization::Softmax => Value::softmax(&mut outputs),
                LayerNormalization::Simplemax => Value::simplemax(&mut outputs),
            }
            for (neuron, value) in layer.neurons.iter().zip(&outputs) {
                activations.insert(neuron.id.as_str(), value.get());
            }
        }
        Ok(Some(activations))
    }

    fn evaluate_in<N: Number>(&self, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Results> {
        let activations = match self.propagate::<N>(ctx)? {
            Some(activations) => activations,
            None => return Ok(self.missing()),
        };
        let activation_of = |id: &str| {
            activations
                .get(id)
                .map(|v| v.to_f64())
                .ok_or_else(|| PmmlError::InvalidStructure(format!("unknown output neuron {}", id)))
        };

        let value = if self.model.info.mining_function == MiningFunction::Classification {
            let mut values = BTreeMap::new();
            let mut neurons = BTreeMap::new();
            for output in &self.model.outputs {
                if let Some(category) = &output.category {
                    values.insert(category.clone(), activation_of(&output.output_neuron)?);
                    neurons.insert(category.as_str(), output.output_neuron.as_str());
                }
            }
            let category = Classification::best_category(ClassificationKind::Probability, &values)
                .map(str::to_string)
                .ok_or_else(|| PmmlError::EvaluationConsistency("no category scored".into()))?;
            let entity_id = neurons
                .get(category.as_str())
                .and_then(|id| self.registry().get(id))
                .map(|neuron| neuron.id.clone());
            tracing::trace!(category = %category, neuron = ?entity_id, "neural network classified");

            let result = self.target.parse(&category)?;
            ResultValue::Classification(
                Classification::new(ClassificationKind::Probability, result, values).with_entity(entity_id, Vec::new()),
            )
        } else {
            let output = &self.model.outputs[0];
            let mut value = activation_of(&output.output_neuron)?;
            if !output.denormalization.is_empty() {
                value = denormalize(value, &output.denormalization);
            }
            ResultValue::Value(self.target.data_type.parse(&N::from_f64(value).to_scalar())?)
        };
        Ok(Results::single(&self.target.name, Some(value)))
    }
}

/// Map a normalized value back onto the original scale by inverting the
/// piecewise-linear normalization.
fn denormalize(y: f64, norms: &[LinearNorm]) -> f64 {
    let mut points: Vec<&LinearNorm> = norms.iter().collect();
    points.sort_by(|a, b| a.norm.total_cmp(&b.norm));
    let segment = points
        .windows(2)
        .position(|pair| y <= pair[1].norm)
        .unwrap_or(points.len() - 2);
    let (lo, hi) = (points[segment], points[segment + 1]);
    lo.orig + (y - lo.norm) * (hi.orig - lo.orig) / (hi.norm - lo.norm)
}

impl<'m> ModelEvaluator for NeuralNetworkEvaluator<'m> {
    fn info(&self) -> &ModelInfo {
        &self.model.info
    }

    fn target(&self) -> &ModelTarget {
        &self.target
    }

    fn features(&self) -> BTreeSet<ResultFeature> {
        let mut features = BTreeSet::from([ResultFeature::PredictedValue]);
        if self.model.info.mining_function == MiningFunction::Classification {
            features.extend([ResultFeature::Probability, ResultFeature::EntityId]);
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
