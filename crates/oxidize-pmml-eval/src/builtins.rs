use std::cmp::Ordering;

use oxidize_pmml_core::{FieldValue, PmmlError, PmmlResult, Scalar};

/// Apply a built-in function to evaluated arguments.
///
/// Any missing argument makes the result missing, except for the
/// `isMissing`/`isNotMissing` tests.
pub fn apply(name: &str, args: &[Option<FieldValue>]) -> PmmlResult<Option<FieldValue>> {
    match name {
        "isMissing" => {
            arity(name, args, 1)?;
            return Ok(Some(boolean(args[0].is_none())));
        }
        "isNotMissing" => {
            arity(name, args, 1)?;
            return Ok(Some(boolean(args[0].is_some())));
        }
        _ => {}
    }

    if !is_builtin(name) {
        return Err(PmmlError::UnknownFunction(name.to_string()));
    }
    let args: Vec<&FieldValue> = match args.iter().map(Option::as_ref).collect::<Option<Vec<_>>>() {
        Some(args) => args,
        None => return Ok(None),
    };

    let value = match name {
        "+" | "-" | "*" | "/" | "pow" | "threshold" => {
            arity(name, &args, 2)?;
            let (a, b) = (args[0].as_f64()?, args[1].as_f64()?);
            number(match name {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                "/" if b == 0.0 => return Err(PmmlError::InvalidArgument("division by zero".into())),
                "/" => a / b,
                "pow" => a.powf(b),
                _ => {
                    if a > b {
                        1.0
                    } else {
                        0.0
                    }
                }
            })
        }

        "min" | "max" | "sum" | "avg" => {
            let xs = numbers(&args)?;
            if xs.is_empty() {
                return Err(PmmlError::InvalidArgument(format!("{} needs at least one argument", name)));
            }
            number(match name {
                "min" => xs.iter().copied().fold(f64::INFINITY, f64::min),
                "max" => xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                "sum" => xs.iter().sum(),
                _ => xs.iter().sum::<f64>() / xs.len() as f64,
            })
        }

        "log10" | "ln" | "sqrt" | "abs" | "exp" | "floor" | "ceil" | "round" => {
            arity(name, &args, 1)?;
            let x = args[0].as_f64()?;
            let domain_error = || PmmlError::InvalidArgument(format!("{}({}) is undefined", name, x));
            number(match name {
                "log10" if x <= 0.0 => return Err(domain_error()),
                "log10" => x.log10(),
                "ln" if x <= 0.0 => return Err(domain_error()),
                "ln" => x.ln(),
                "sqrt" if x < 0.0 => return Err(domain_error()),
                "sqrt" => x.sqrt(),
                "abs" => x.abs(),
                "exp" => x.exp(),
                "floor" => x.floor(),
                "ceil" => x.ceil(),
                _ => x.round(),
            })
        }

        "equal" | "notEqual" | "lessThan" | "lessOrEqual" | "greaterThan" | "greaterOrEqual" => {
            arity(name, &args, 2)?;
            let ordering = args[0].compare_to(args[1])?;
            boolean(match name {
                "equal" => ordering == Ordering::Equal,
                "notEqual" => ordering != Ordering::Equal,
                "lessThan" => ordering == Ordering::Less,
                "lessOrEqual" => ordering != Ordering::Greater,
                "greaterThan" => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }

        "and" | "or" => {
            if args.len() < 2 {
                return Err(PmmlError::InvalidArgument(format!("{} needs at least two arguments", name)));
            }
            let flags = args.iter().map(|a| a.as_bool()).collect::<PmmlResult<Vec<_>>>()?;
            boolean(if name == "and" {
                flags.iter().all(|f| *f)
            } else {
                flags.iter().any(|f| *f)
            })
        }
        "not" => {
            arity(name, &args, 1)?;
            boolean(!args[0].as_bool()?)
        }

        "isIn" | "isNotIn" => {
            if args.is_empty() {
                return Err(PmmlError::InvalidArgument(format!("{} needs a value", name)));
            }
            let mut found = false;
            for candidate in &args[1..] {
                if args[0].equals(candidate)? {
                    found = true;
                    break;
                }
            }
            boolean(found == (name == "isIn"))
        }

        "concat" => text(args.iter().map(|a| a.as_category()).collect::<String>()),
        "uppercase" => {
            arity(name, &args, 1)?;
            text(args[0].as_category().to_uppercase())
        }
        _ => {
            arity(name, &args, 1)?;
            text(args[0].as_category().to_lowercase())
        }
    };
    Ok(Some(value))
}

/// Whether `name` is handled by [`apply`].
pub fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "+" | "-"
            | "*"
            | "/"
            | "min"
            | "max"
            | "sum"
            | "avg"
            | "log10"
            | "ln"
            | "sqrt"
            | "abs"
            | "exp"
            | "pow"
            | "threshold"
            | "floor"
            | "ceil"
            | "round"
            | "isMissing"
            | "isNotMissing"
            | "equal"
            | "notEqual"
            | "lessThan"
            | "lessOrEqual"
            | "greaterThan"
            | "greaterOrEqual"
            | "and"
            | "or"
            | "not"
            | "isIn"
            | "isNotIn"
            | "concat"
            | "uppercase"
            | "lowercase"
    )
}

fn arity<T>(name: &str, args: &[T], expected: usize) -> PmmlResult<()> {
    if args.len() != expected {
        return Err(PmmlError::InvalidArgument(format!(
            "{} expects {} arguments, got {}",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn numbers(args: &[&FieldValue]) -> PmmlResult<Vec<f64>> {
    args.iter().map(|a| a.as_f64()).collect()
}

fn number(v: f64) -> FieldValue {
    FieldValue::infer(Scalar::Double(v))
}

fn boolean(v: bool) -> FieldValue {
    FieldValue::infer(Scalar::Boolean(v))
}

fn text(v: String) -> FieldValue {
    FieldValue::infer(Scalar::String(v))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn num(v: f64) -> Option<FieldValue> {
        Some(FieldValue::infer(Scalar::Double(v)))
    }

    fn s(v: &str) -> Option<FieldValue> {
        Some(FieldValue::infer(Scalar::from(v)))
    }

    fn call(name: &str, args: &[Option<FieldValue>]) -> f64 {
        apply(name, args).unwrap().unwrap().as_f64().unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(call("+", &[num(1.0), num(2.0)]), 3.0);
        assert_eq!(call("-", &[num(1.0), num(2.0)]), -1.0);
        assert_eq!(call("*", &[num(3.0), num(2.0)]), 6.0);
        assert_eq!(call("/", &[num(3.0), num(2.0)]), 1.5);
        assert_eq!(call("pow", &[num(2.0), num(10.0)]), 1024.0);
        assert_eq!(call("threshold", &[num(2.0), num(1.0)]), 1.0);
        assert!(matches!(apply("/", &[num(1.0), num(0.0)]), Err(PmmlError::InvalidArgument(_))));
    }

    #[test]
    fn test_aggregates() {
        let xs = [num(4.0), num(1.0), num(7.0)];
        assert_eq!(call("min", &xs), 1.0);
        assert_eq!(call("max", &xs), 7.0);
        assert_eq!(call("sum", &xs), 12.0);
        assert_eq!(call("avg", &xs), 4.0);
    }

    #[test]
    fn test_math() {
        assert_abs_diff_eq!(call("log10", &[num(1000.0)]), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(call("ln", &[num(std::f64::consts::E)]), 1.0, epsilon = 1e-12);
        assert_eq!(call("round", &[num(2.5)]), 3.0);
        assert_eq!(call("floor", &[num(-0.5)]), -1.0);
        assert!(apply("sqrt", &[num(-1.0)]).is_err());
    }

    #[test]
    fn test_missing_propagation() {
        assert_eq!(apply("+", &[num(1.0), None]).unwrap(), None);
        let flag = apply("isMissing", &[None]).unwrap().unwrap();
        assert!(flag.as_bool().unwrap());
        let flag = apply("isNotMissing", &[None]).unwrap().unwrap();
        assert!(!flag.as_bool().unwrap());
    }

    #[test]
    fn test_comparisons_and_logic() {
        let t = apply("lessOrEqual", &[num(1.0), num(1.0)]).unwrap().unwrap();
        assert!(t.as_bool().unwrap());
        let t = apply("isIn", &[s("b"), s("a"), s("b")]).unwrap().unwrap();
        assert!(t.as_bool().unwrap());
        let t = apply("isNotIn", &[s("c"), s("a"), s("b")]).unwrap().unwrap();
        assert!(t.as_bool().unwrap());

        let yes = Some(FieldValue::infer(Scalar::Boolean(true)));
        let no = Some(FieldValue::infer(Scalar::Boolean(false)));
        assert!(!apply("and", &[yes.clone(), no.clone()]).unwrap().unwrap().as_bool().unwrap());
        assert!(apply("or", &[yes, no.clone()]).unwrap().unwrap().as_bool().unwrap());
        assert!(apply("not", &[no]).unwrap().unwrap().as_bool().unwrap());

        assert!(matches!(apply("equal", &[s("a"), num(1.0)]), Err(PmmlError::TypeMismatch { .. })));
    }

    #[test]
    fn test_strings() {
        let v = apply("concat", &[s("ab"), num(1.5)]).unwrap().unwrap();
        assert_eq!(v.as_category(), "ab1.5");
        assert_eq!(apply("uppercase", &[s("ab")]).unwrap().unwrap().as_category(), "AB");
        assert_eq!(apply("lowercase", &[s("AB")]).unwrap().unwrap().as_category(), "ab");
    }

    #[test]
    fn test_unknown() {
        assert!(matches!(apply("frobnicate", &[]), Err(PmmlError::UnknownFunction(_))));
        assert!(matches!(apply("abs", &[num(1.0), num(2.0)]), Err(PmmlError::InvalidArgument(_))));
    }
}
