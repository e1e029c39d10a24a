use oxidize_pmml_core::{DataType, FieldValue, OpType, PmmlError, PmmlResult, Scalar};
use oxidize_pmml_model::{Expression, LinearNorm, OutlierTreatment};

use crate::builtins;
use crate::context::EvaluationContext;

/// Evaluate an expression tree against `ctx`; `None` means missing.
pub fn evaluate_expression(expression: &Expression, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Option<FieldValue>> {
    match expression {
        Expression::Constant { value, data_type } => match value {
            Some(raw) => constant(raw, *data_type).map(Some),
            None => Ok(None),
        },

        Expression::FieldRef { field, map_missing_to } => match ctx.evaluate(field)? {
            Some(value) => Ok(Some(value)),
            None => Ok(map_missing_to.as_deref().map(inferred)),
        },

        Expression::NormContinuous { field, norms, outliers, map_missing_to } => {
            let x = match ctx.evaluate(field)? {
                Some(value) => value.as_f64()?,
                None => return Ok(map_missing_to.map(double)),
            };
            Ok(normalize(x, norms, *outliers)?.map(double))
        }

        Expression::NormDiscrete { field, value, map_missing_to } => match ctx.evaluate(field)? {
            Some(v) => Ok(Some(double(if v.equals_raw(value)? { 1.0 } else { 0.0 }))),
            None => Ok(map_missing_to.map(double)),
        },

        Expression::Discretize { field, bins, map_missing_to, default_value, data_type } => {
            let x = match ctx.evaluate(field)? {
                Some(value) => value.as_f64()?,
                None => return map_missing_to.as_deref().map(|raw| categorical(raw, *data_type)).transpose(),
            };
            bins.iter()
                .find(|bin| bin.interval.contains(x))
                .map(|bin| bin.bin_value.as_str())
                .or(default_value.as_deref())
                .map(|raw| categorical(raw, *data_type))
                .transpose()
        }

        Expression::MapValues { field, mappings, map_missing_to, default_value, data_type } => {
            let value = match ctx.evaluate(field)? {
                Some(value) => value,
                None => return map_missing_to.as_deref().map(|raw| categorical(raw, *data_type)).transpose(),
            };
            mappings
                .iter()
                .find(|m| value.equals_raw(&m.input).unwrap_or(false))
                .map(|m| m.output.as_str())
                .or(default_value.as_deref())
                .map(|raw| categorical(raw, *data_type))
                .transpose()
        }

        Expression::Apply { function, arguments, map_missing_to, default_value } => {
            if function == "if" {
                return conditional(arguments, ctx);
            }

            let mut values = Vec::with_capacity(arguments.len());
            for argument in arguments {
                values.push(evaluate_expression(argument, ctx)?);
            }

            let any_missing = values.iter().any(Option::is_none);
            if any_missing {
                if let Some(raw) = map_missing_to {
                    return Ok(Some(inferred(raw)));
                }
            }

            let result = if ctx.has_function(function) {
                ctx.call_function(function, values)?
            } else {
                builtins::apply(function, &values)?
            };

            match result {
                Some(value) => Ok(Some(value)),
                None if !any_missing => Ok(default_value.as_deref().map(inferred)),
                None => Ok(None),
            }
        }
    }
}

/// `if(condition, then, else)`; only the taken branch is evaluated.
fn conditional(arguments: &[Expression], ctx: &mut EvaluationContext<'_>) -> PmmlResult<Option<FieldValue>> {
    if arguments.len() != 2 && arguments.len() != 3 {
        return Err(PmmlError::InvalidArgument(format!("if expects 2 or 3 arguments, got {}", arguments.len())));
    }
    let condition = match evaluate_expression(&arguments[0], ctx)? {
        Some(value) => value.as_bool()?,
        None => return Ok(None),
    };
    match (condition, arguments.get(2)) {
        (true, _) => evaluate_expression(&arguments[1], ctx),
        (false, Some(otherwise)) => evaluate_expression(otherwise, ctx),
        (false, None) => Ok(None),
    }
}

/// Piecewise-linear interpolation through `norms`, sorted by `orig`.
fn normalize(x: f64, norms: &[LinearNorm], outliers: OutlierTreatment) -> PmmlResult<Option<f64>> {
    if norms.len() < 2 {
        return Err(PmmlError::InvalidStructure("NormContinuous needs at least two LinearNorm".into()));
    }
    let first = &norms[0];
    let last = &norms[norms.len() - 1];

    if x < first.orig || x > last.orig {
        match outliers {
            OutlierTreatment::AsMissingValues => return Ok(None),
            OutlierTreatment::AsExtremeValues => {
                return Ok(Some(if x < first.orig { first.norm } else { last.norm }));
            }
            OutlierTreatment::AsIs => {}
        }
    }

    let segment = norms
        .windows(2)
        .position(|pair| x <= pair[1].orig)
        .unwrap_or(norms.len() - 2);
    let (lo, hi) = (&norms[segment], &norms[segment + 1]);
    Ok(Some(lo.norm + (x - lo.orig) * (hi.norm - lo.norm) / (hi.orig - lo.orig)))
}

fn constant(raw: &str, data_type: Option<DataType>) -> PmmlResult<FieldValue> {
    match data_type {
        Some(data_type) => FieldValue::create(data_type, op_type_of(data_type), raw),
        None => Ok(inferred(raw)),
    }
}

fn categorical(raw: &str, data_type: Option<DataType>) -> PmmlResult<FieldValue> {
    let data_type = data_type.unwrap_or(DataType::String);
    FieldValue::create(data_type, op_type_of(data_type), raw)
}

fn inferred(raw: &str) -> FieldValue {
    FieldValue::infer(Scalar::infer(raw))
}

fn double(v: f64) -> FieldValue {
    FieldValue::infer(Scalar::Double(v))
}

fn op_type_of(data_type: DataType) -> OpType {
    if data_type.is_numeric() {
        OpType::Continuous
    } else {
        OpType::Categorical
    }
}
