use std::cmp::Ordering;

use oxidize_pmml_core::{PmmlError, PmmlResult};
use oxidize_pmml_model::{BooleanOperator, CompoundOperator, Predicate, SimpleOperator};

use crate::context::EvaluationContext;

/// Evaluate a predicate with three-valued logic: `None` means the outcome
/// cannot be decided because an input is missing.
pub fn evaluate_predicate(predicate: &Predicate, ctx: &mut EvaluationContext<'_>) -> PmmlResult<Option<bool>> {
    match predicate {
        Predicate::True => Ok(Some(true)),
        Predicate::False => Ok(Some(false)),

        Predicate::Simple { field, operator, value } => {
            let actual = ctx.evaluate(field)?;
            let accepts: fn(Ordering) -> bool = match operator {
                SimpleOperator::IsMissing => return Ok(Some(actual.is_none())),
                SimpleOperator::IsNotMissing => return Ok(Some(actual.is_some())),
                SimpleOperator::Equal => |o| o == Ordering::Equal,
                SimpleOperator::NotEqual => |o| o != Ordering::Equal,
                SimpleOperator::LessThan => |o| o == Ordering::Less,
                SimpleOperator::LessOrEqual => |o| o != Ordering::Greater,
                SimpleOperator::GreaterThan => |o| o == Ordering::Greater,
                SimpleOperator::GreaterOrEqual => |o| o != Ordering::Less,
            };
            let actual = match actual {
                Some(actual) => actual,
                None => return Ok(None),
            };
            let raw = value
                .as_deref()
                .ok_or_else(|| PmmlError::InvalidStructure(format!("SimplePredicate on {:?} has no value", field)))?;
            Ok(Some(accepts(actual.compare_to_raw(raw)?)))
        }

        Predicate::SimpleSet { field, boolean_operator, values } => {
            let actual = match ctx.evaluate(field)? {
                Some(actual) => actual,
                None => return Ok(None),
            };
            let mut found = false;
            for raw in values {
                if actual.equals_raw(raw)? {
                    found = true;
                    break;
                }
            }
            Ok(Some(found == (*boolean_operator == BooleanOperator::IsIn)))
        }

        Predicate::Compound { boolean_operator, predicates } => compound(*boolean_operator, predicates, ctx),
    }
}

fn compound(operator: CompoundOperator, predicates: &[Predicate], ctx: &mut EvaluationContext<'_>) -> PmmlResult<Option<bool>> {
    match operator {
        CompoundOperator::And | CompoundOperator::Or => {
            // The value that decides the outcome on its own.
            let decisive = operator == CompoundOperator::Or;
            let mut undecided = false;
            for predicate in predicates {
                match evaluate_predicate(predicate, ctx)? {
                    Some(v) if v == decisive => return Ok(Some(decisive)),
                    Some(_) => {}
                    None => undecided = true,
                }
            }
            Ok(if undecided { None } else { Some(!decisive) })
        }
        CompoundOperator::Xor => {
            let mut result = false;
            for predicate in predicates {
                match evaluate_predicate(predicate, ctx)? {
                    Some(v) => result ^= v,
                    None => return Ok(None),
                }
            }
            Ok(Some(result))
        }
        CompoundOperator::Surrogate => {
            for predicate in predicates {
                if let Some(v) = evaluate_predicate(predicate, ctx)? {
                    return Ok(Some(v));
                }
            }
            Ok(None)
        }
    }
}
