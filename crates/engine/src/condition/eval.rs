// Condition evaluator - evaluates bound expressions one row at a time

use crate::table::{Scalar, Table};

use super::parser::{ArithOp, BoundExpr, CmpOp, Expr};

/// Per-call evaluation parameters.
#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    /// Absolute tolerance for numeric equality
    pub numeric_tolerance: f64,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self { numeric_tolerance: 0.0 }
    }
}

/// Evaluate a bound expression for one row.
///
/// Errors are plain messages; the caller attaches the condition text.
pub fn evaluate<'a>(
    expr: &'a BoundExpr,
    table: &'a Table,
    row: usize,
    opts: &EvalOptions,
) -> Result<Scalar<'a>, String> {
    match expr {
        Expr::Literal(lit) => Ok(lit.as_scalar()),
        Expr::Column(index) => Ok(table.column_at(*index).get(row)),
        Expr::Compare { op, left, right } => {
            let l = evaluate(left, table, row, opts)?;
            let r = evaluate(right, table, row, opts)?;
            compare(*op, l, r, opts).map(Scalar::Boolean)
        }
        Expr::Arith { op, left, right } => {
            let l = evaluate(left, table, row, opts)?;
            let r = evaluate(right, table, row, opts)?;
            arith(*op, l, r)
        }
        Expr::And(left, right) => {
            // Both sides are always evaluated so type errors do not depend on data order
            let l = truth(evaluate(left, table, row, opts)?)?;
            let r = truth(evaluate(right, table, row, opts)?)?;
            Ok(Scalar::Boolean(l && r))
        }
        Expr::Or(left, right) => {
            let l = truth(evaluate(left, table, row, opts)?)?;
            let r = truth(evaluate(right, table, row, opts)?)?;
            Ok(Scalar::Boolean(l || r))
        }
        Expr::Not(inner) => {
            let v = truth(evaluate(inner, table, row, opts)?)?;
            Ok(Scalar::Boolean(!v))
        }
        Expr::Neg(inner) => match evaluate(inner, table, row, opts)? {
            Scalar::Missing => Ok(Scalar::Missing),
            v => match v.as_number() {
                Some(n) => Ok(Scalar::Number(-n)),
                None => Err(format!("cannot negate {}", v.type_name())),
            },
        },
        Expr::Between { target, low, high } => {
            let v = evaluate(target, table, row, opts)?;
            let lo = evaluate(low, table, row, opts)?;
            let hi = evaluate(high, table, row, opts)?;
            let above = compare(CmpOp::GtEq, v, lo, opts)?;
            let below = compare(CmpOp::LtEq, v, hi, opts)?;
            Ok(Scalar::Boolean(above && below))
        }
        Expr::IsIn { target, values, negated } => {
            let v = evaluate(target, table, row, opts)?;
            let mut found = false;
            for lit in values {
                if compare(CmpOp::Eq, v, lit.as_scalar(), opts)? {
                    found = true;
                    break;
                }
            }
            Ok(Scalar::Boolean(found != *negated))
        }
        Expr::IsMissing { target, negated } => {
            let v = evaluate(target, table, row, opts)?;
            Ok(Scalar::Boolean(v.is_missing() != *negated))
        }
    }
}

/// Interpret a condition result as a row mask entry. Missing counts as false.
pub fn truth(value: Scalar<'_>) -> Result<bool, String> {
    match value {
        Scalar::Boolean(b) => Ok(b),
        Scalar::Missing => Ok(false),
        other => Err(format!("condition must be boolean, got {}", other.type_name())),
    }
}

/// Compare two cells.
///
/// Missing compares unequal to everything. Text only orders against text;
/// text vs number equality is simply false. Booleans compare as 1/0.
pub fn compare(op: CmpOp, left: Scalar<'_>, right: Scalar<'_>, opts: &EvalOptions) -> Result<bool, String> {
    match (left, right) {
        (Scalar::Missing, _) | (_, Scalar::Missing) => Ok(op == CmpOp::NotEq),
        (Scalar::Text(a), Scalar::Text(b)) => Ok(match op {
            CmpOp::Eq => a == b,
            CmpOp::NotEq => a != b,
            CmpOp::Lt => a < b,
            CmpOp::LtEq => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::GtEq => a >= b,
        }),
        (l, r) => match (l.as_number(), r.as_number()) {
            (Some(a), Some(b)) => {
                let eq = a == b || (a - b).abs() <= opts.numeric_tolerance;
                Ok(match op {
                    CmpOp::Eq => eq,
                    CmpOp::NotEq => !eq,
                    CmpOp::Lt => a < b && !eq,
                    CmpOp::LtEq => a < b || eq,
                    CmpOp::Gt => a > b && !eq,
                    CmpOp::GtEq => a > b || eq,
                })
            }
            _ => match op {
                CmpOp::Eq => Ok(false),
                CmpOp::NotEq => Ok(true),
                _ => Err(format!("cannot order {} against {}", l.type_name(), r.type_name())),
            },
        },
    }
}

fn arith<'a>(op: ArithOp, left: Scalar<'a>, right: Scalar<'a>) -> Result<Scalar<'a>, String> {
    if left.is_missing() || right.is_missing() {
        return Ok(Scalar::Missing);
    }
    let (a, b) = match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(format!(
                "arithmetic needs numbers, got {} and {}",
                left.type_name(),
                right.type_name()
            ))
        }
    };
    let n = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
    };
    if n.is_nan() {
        Ok(Scalar::Missing)
    } else {
        Ok(Scalar::Number(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::parser::{bind_expr, parse};

    fn people() -> Table {
        Table::new()
            .with_column("sex", vec!["M", "F", "M", "F"])
            .unwrap()
            .with_column("age", vec![3.0, 10.0, f64::NAN, 50.0])
            .unwrap()
            .with_column("is_alive", vec![Some(true), Some(false), None, Some(true)])
            .unwrap()
    }

    /// Evaluate `text` on every row of `people()` as a mask
    fn mask(text: &str) -> Result<Vec<bool>, String> {
        let table = people();
        let expr = parse(text).map_err(|e| e.to_string())?;
        let bound = bind_expr(&expr, |name| table.column_index(name))?;
        let opts = EvalOptions::default();
        (0..table.row_count())
            .map(|row| truth(evaluate(&bound, &table, row, &opts)?))
            .collect()
    }

    #[test]
    fn test_equality_on_text() {
        assert_eq!(mask("sex == 'M'").unwrap(), vec![true, false, true, false]);
        assert_eq!(mask("sex != 'M'").unwrap(), vec![false, true, false, true]);
    }

    #[test]
    fn test_missing_never_matches_comparisons() {
        assert_eq!(mask("age < 5").unwrap(), vec![true, false, false, false]);
        assert_eq!(mask("age >= 5").unwrap(), vec![false, true, false, true]);
        assert_eq!(mask("age == 3").unwrap(), vec![true, false, false, false]);
        // != is the one comparison missing satisfies
        assert_eq!(mask("age != 3").unwrap(), vec![false, true, true, true]);
    }

    #[test]
    fn test_boolean_column_as_condition() {
        assert_eq!(mask("is_alive").unwrap(), vec![true, false, false, true]);
        assert_eq!(mask("~is_alive").unwrap(), vec![false, true, true, false]);
        assert_eq!(mask("is_alive == True").unwrap(), vec![true, false, false, true]);
    }

    #[test]
    fn test_combined_conditions() {
        assert_eq!(
            mask("(age >= 5) & (sex == 'F')").unwrap(),
            vec![false, true, false, true]
        );
        assert_eq!(
            mask("(age < 5) | (sex == 'F')").unwrap(),
            vec![true, true, false, true]
        );
    }

    #[test]
    fn test_methods() {
        assert_eq!(mask("age.between(3, 10)").unwrap(), vec![true, true, false, false]);
        assert_eq!(mask("sex.isin(['F'])").unwrap(), vec![false, true, false, true]);
        assert_eq!(mask("age.isna()").unwrap(), vec![false, false, true, false]);
        assert_eq!(mask("age not in [3, 50]").unwrap(), vec![false, true, true, false]);
    }

    #[test]
    fn test_arithmetic_in_conditions() {
        assert_eq!(mask("age * 2 > 15").unwrap(), vec![false, true, false, true]);
        // Missing propagates through arithmetic
        assert_eq!(mask("(age + 1).isna()").unwrap(), vec![false, false, true, false]);
    }

    #[test]
    fn test_text_number_equality_is_false_not_error() {
        assert_eq!(mask("sex == 1").unwrap(), vec![false; 4]);
    }

    #[test]
    fn test_text_number_ordering_is_error() {
        let err = mask("sex > 1").unwrap_err();
        assert!(err.contains("cannot order"), "{err}");
    }

    #[test]
    fn test_non_boolean_condition_is_error() {
        let err = mask("age + 1").unwrap_err();
        assert!(err.contains("must be boolean"), "{err}");
    }

    #[test]
    fn test_numeric_tolerance() {
        let opts = EvalOptions { numeric_tolerance: 1e-6 };
        assert!(compare(CmpOp::Eq, Scalar::Number(0.1 + 0.2), Scalar::Number(0.3), &opts).unwrap());
        assert!(!compare(CmpOp::Lt, Scalar::Number(0.3 - 1e-9), Scalar::Number(0.3), &opts).unwrap());

        let exact = EvalOptions::default();
        assert!(!compare(CmpOp::Eq, Scalar::Number(0.1 + 0.2), Scalar::Number(0.3), &exact).unwrap());
    }

    #[test]
    fn test_boolean_compares_as_number() {
        let opts = EvalOptions::default();
        assert!(compare(CmpOp::Eq, Scalar::Boolean(true), Scalar::Number(1.0), &opts).unwrap());
        assert!(compare(CmpOp::Lt, Scalar::Boolean(false), Scalar::Number(0.5), &opts).unwrap());
    }
}
