use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use oxidize_pmml_core::{FieldValue, OpType, PmmlError, PmmlResult, Scalar};
use oxidize_pmml_model::{DataField, DerivedField, Expression, InvalidValueTreatment, ModelInfo, Pmml};

use crate::config::EvaluatorConfig;
use crate::expression::evaluate_expression;
use crate::stack::BoundedStack;

/// Parameter bindings of one active user-defined function call.
#[derive(Debug)]
struct FunctionFrame {
    parameters: HashMap<String, Option<FieldValue>>,
}

/// Resolves field names to values for a single record.
///
/// Values are memoized: once a name has resolved, it resolves to the same
/// value for the rest of the context's life. A context belongs to exactly one
/// in-flight evaluation and is never shared between threads.
///
/// Nested models get a [`child`](EvaluationContext::child) context. A child
/// keeps its own model-local fields and prepared inputs. Fields defined by an
/// enclosing model or by the document are memoized in the scope that owns
/// them, so sibling children share one evaluation.
#[derive(Debug)]
pub struct EvaluationContext<'a> {
    pmml: &'a Pmml,
    info: &'a ModelInfo,
    parent: Option<&'a EvaluationContext<'a>>,
    arguments: HashMap<String, Scalar>,
    values: RefCell<HashMap<String, Option<FieldValue>>>,
    derivations: BoundedStack<String>,
    frames: BoundedStack<FunctionFrame>,
    derivation_count: usize,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(pmml: &'a Pmml, info: &'a ModelInfo, config: &EvaluatorConfig) -> Self {
        EvaluationContext {
            pmml,
            info,
            parent: None,
            arguments: HashMap::new(),
            values: RefCell::new(HashMap::new()),
            derivations: BoundedStack::new(config.max_derived_field_depth),
            frames: BoundedStack::new(config.max_function_depth),
            derivation_count: 0,
        }
    }

    /// A context for a nested model, chained to this one.
    pub fn child<'c>(&'c self, info: &'c ModelInfo) -> EvaluationContext<'c> {
        EvaluationContext {
            pmml: self.pmml,
            info,
            parent: Some(self),
            arguments: HashMap::new(),
            values: RefCell::new(HashMap::new()),
            derivations: BoundedStack::new(self.derivations.limit()),
            frames: BoundedStack::new(self.frames.limit()),
            derivation_count: 0,
        }
    }

    pub fn pmml(&self) -> &'a Pmml {
        self.pmml
    }

    pub fn model_info(&self) -> &'a ModelInfo {
        self.info
    }

    /// Supply a raw input. Values already resolved are not affected.
    pub fn set_argument(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        self.arguments.insert(name.into(), value.into());
    }

    pub fn set_arguments<I, K, V>(&mut self, arguments: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        for (name, value) in arguments {
            self.set_argument(name, value);
        }
    }

    /// Resolve `name`, returning `None` when the value is missing.
    pub fn evaluate(&mut self, name: &str) -> PmmlResult<Option<FieldValue>> {
        if let Some(frame) = self.frames.last() {
            return frame
                .parameters
                .get(name)
                .cloned()
                .ok_or_else(|| PmmlError::UnknownField(name.to_string()));
        }

        if let Some(value) = self.memoized(name) {
            return Ok(value);
        }

        let info = self.info;
        if let Some(field) = info.local_field(name) {
            let value = self.derive(field)?;
            self.values.get_mut().insert(name.to_string(), value.clone());
            return Ok(value);
        }

        if let Some((owner, field)) = self.scoped_field(name) {
            let value = self.derive(field)?;
            let memo = match owner {
                Some(owner) => &owner.values,
                None => &self.values,
            };
            memo.borrow_mut().insert(name.to_string(), value.clone());
            return Ok(value);
        }

        let pmml = self.pmml;
        let value = match pmml.data_dictionary.field(name) {
            Some(field) => self.prepare_input(field)?,
            None => return Err(PmmlError::UnknownField(name.to_string())),
        };
        self.values.get_mut().insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Call a user-defined function with already evaluated arguments.
    ///
    /// Functions may recurse; only the nesting depth is bounded.
    pub fn call_function(&mut self, name: &str, arguments: Vec<Option<FieldValue>>) -> PmmlResult<Option<FieldValue>> {
        let pmml = self.pmml;
        let function = pmml
            .transformation_dictionary
            .function(name)
            .ok_or_else(|| PmmlError::UnknownFunction(name.to_string()))?;

        if arguments.len() != function.parameters.len() {
            return Err(PmmlError::InvalidArgument(format!(
                "{} expects {} arguments, got {}",
                name,
                function.parameters.len(),
                arguments.len()
            )));
        }

        let mut parameters = HashMap::with_capacity(arguments.len());
        for (parameter, argument) in function.parameters.iter().zip(arguments) {
            let argument = match (argument, parameter.data_type) {
                (Some(value), Some(data_type)) => Some(value.cast(data_type, value.op_type())?),
                (argument, _) => argument,
            };
            parameters.insert(parameter.name.clone(), argument);
        }

        self.frames.push(FunctionFrame { parameters }, name)?;
        let value = evaluate_expression(&function.expression, self);
        self.frames.pop();

        value?
            .map(|v| v.cast(function.data_type, function.op_type))
            .transpose()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.pmml.transformation_dictionary.function(name).is_some()
    }

    /// Make `value` visible under `name` to this context and its children.
    pub fn declare(&mut self, name: &str, value: Option<FieldValue>) -> PmmlResult<()> {
        let values = self.values.get_mut();
        if values.contains_key(name) {
            return Err(PmmlError::EvaluationConsistency(format!("field {:?} is already defined", name)));
        }
        values.insert(name.to_string(), value);
        Ok(())
    }

    /// Number of derived-field expressions evaluated by this context.
    pub fn derivation_count(&self) -> usize {
        self.derivation_count
    }

    fn memoized(&self, name: &str) -> Option<Option<FieldValue>> {
        if let Some(value) = self.values.borrow().get(name) {
            return Some(value.clone());
        }
        let mut scope = self.parent;
        while let Some(ctx) = scope {
            if let Some(value) = ctx.values.borrow().get(name) {
                return Some(value.clone());
            }
            scope = ctx.parent;
        }
        None
    }

    fn argument(&self, name: &str) -> Option<&Scalar> {
        if let Some(value) = self.arguments.get(name) {
            return Some(value);
        }
        let mut scope = self.parent;
        while let Some(ctx) = scope {
            if let Some(value) = ctx.arguments.get(name) {
                return Some(value);
            }
            scope = ctx.parent;
        }
        None
    }

    /// A derived field from an enclosing model scope or, failing that, the
    /// document-level dictionary, paired with the scope that memoizes it.
    /// `None` stands for this context.
    fn scoped_field(&self, name: &str) -> Option<(Option<&'a EvaluationContext<'a>>, &'a DerivedField)> {
        let mut root = None;
        let mut scope = self.parent;
        while let Some(ctx) = scope {
            if let Some(field) = ctx.info.local_field(name) {
                return Some((Some(ctx), field));
            }
            root = Some(ctx);
            scope = ctx.parent;
        }
        self.pmml
            .transformation_dictionary
            .derived_field(name)
            .map(|field| (root, field))
    }

    fn derived_field(&self, name: &str) -> Option<&'a DerivedField> {
        self.info
            .local_field(name)
            .or_else(|| self.scoped_field(name).map(|(_, field)| field))
    }

    fn derive(&mut self, field: &'a DerivedField) -> PmmlResult<Option<FieldValue>> {
        if self.derivations.contains(&field.name) {
            return Err(PmmlError::EvaluationCycle(field.name.clone()));
        }
        if let Err(err) = self.derivations.push(field.name.clone(), &field.name) {
            return Err(match self.cycle_through(field) {
                Some(name) => PmmlError::EvaluationCycle(name),
                None => err,
            });
        }
        self.derivation_count += 1;

        let value = evaluate_expression(&field.expression, self);
        self.derivations.pop();

        value?
            .map(|v| v.cast(field.data_type, field.op_type))
            .transpose()
    }

    /// Follow the references of `field` past the depth bound. Returns the
    /// first name found that is either `field` itself or already being
    /// derived, since either one closes a cycle.
    fn cycle_through(&self, field: &'a DerivedField) -> Option<String> {
        let mut visited = HashSet::new();
        let mut pending = vec![&field.expression];
        while let Some(expression) = pending.pop() {
            let name = match expression {
                Expression::Constant { .. } => continue,
                Expression::Apply { arguments, .. } => {
                    pending.extend(arguments);
                    continue;
                }
                Expression::FieldRef { field: name, .. }
                | Expression::NormContinuous { field: name, .. }
                | Expression::NormDiscrete { field: name, .. }
                | Expression::Discretize { field: name, .. }
                | Expression::MapValues { field: name, .. } => name,
            };
            if *name == field.name || self.derivations.contains(name) {
                return Some(name.clone());
            }
            if !visited.insert(name.as_str()) {
                continue;
            }
            if let Some(next) = self.derived_field(name) {
                pending.push(&next.expression);
            }
        }
        None
    }

    fn prepare_input(&self, field: &DataField) -> PmmlResult<Option<FieldValue>> {
        let mining_field = self.info.mining_schema.field(&field.name);
        let replacement = mining_field.and_then(|f| f.missing_value_replacement.as_deref());
        let treatment = mining_field.map(|f| f.invalid_value_treatment).unwrap_or_default();

        let replace = || {
            replacement
                .map(|raw| typed_input(field, Scalar::from(raw)))
                .transpose()
        };

        let raw = match self.argument(&field.name) {
            Some(raw) if !raw.is_nan() => raw.clone(),
            _ => return replace(),
        };

        let value = typed_input(field, raw)?;
        if is_valid(field, &value) {
            return Ok(Some(value));
        }
        match treatment {
            InvalidValueTreatment::ReturnInvalid => Err(PmmlError::InvalidValue {
                field: field.name.clone(),
                value: value.to_string(),
            }),
            InvalidValueTreatment::AsMissing => replace(),
            InvalidValueTreatment::AsIs => Ok(Some(value)),
        }
    }
}

fn typed_input(field: &DataField, raw: Scalar) -> PmmlResult<FieldValue> {
    match field.op_type {
        OpType::Ordinal if !field.values.is_empty() => {
            let ordering = field
                .values
                .iter()
                .map(|v| field.data_type.parse(&Scalar::from(v.as_str())))
                .collect::<PmmlResult<Vec<_>>>()?;
            FieldValue::ordinal(field.data_type, raw, ordering.into())
        }
        op_type => FieldValue::create(field.data_type, op_type, raw),
    }
}

fn is_valid(field: &DataField, value: &FieldValue) -> bool {
    if !field.values.is_empty() && field.op_type != OpType::Continuous {
        return field.values.iter().any(|v| value.equals_raw(v).unwrap_or(false));
    }
    if !field.intervals.is_empty() {
        return value
            .as_f64()
            .map(|x| field.intervals.iter().any(|interval| interval.contains(x)))
            .unwrap_or(false);
    }
    true
}
