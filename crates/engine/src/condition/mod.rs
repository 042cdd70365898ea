// Rule conditions: literals, the condition mini-language, and row matching

pub mod eval;
pub mod parser;

use std::fmt;

use crate::error::LmError;
use crate::table::{Scalar, Table};

use eval::{compare, evaluate, truth, EvalOptions};
use parser::{bind_expr, parse, BoundExpr, CmpOp, ParsedExpr};

/// Characters that mark a `when` string as an expression fragment to splice
/// after the attribute name, rather than a value to test equality against.
pub const FRAGMENT_PREFIXES: [char; 6] = ['=', '<', '>', '~', '(', '.'];

// =============================================================================
// Literal
// =============================================================================

/// A constant in a condition: the first argument of `Predictor::when`, or a
/// literal inside condition text.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl Literal {
    pub fn as_scalar(&self) -> Scalar<'_> {
        match self {
            Literal::Number(n) if n.is_nan() => Scalar::Missing,
            Literal::Number(n) => Scalar::Number(*n),
            Literal::Text(s) => Scalar::Text(s),
            Literal::Boolean(b) => Scalar::Boolean(*b),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Literal::Text(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Literal::Boolean(true) => write!(f, "True"),
            Literal::Boolean(false) => write!(f, "False"),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Text(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Text(s)
    }
}

impl From<&String> for Literal {
    fn from(s: &String) -> Self {
        Literal::Text(s.clone())
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Number(n)
    }
}

impl From<f32> for Literal {
    fn from(n: f32) -> Self {
        Literal::Number(f64::from(n))
    }
}

impl From<i32> for Literal {
    fn from(n: i32) -> Self {
        Literal::Number(f64::from(n))
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Number(n as f64)
    }
}

impl From<u32> for Literal {
    fn from(n: u32) -> Self {
        Literal::Number(f64::from(n))
    }
}

impl From<usize> for Literal {
    fn from(n: usize) -> Self {
        Literal::Number(n as f64)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Boolean(b)
    }
}

// =============================================================================
// Condition
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Matches every row not matched by an earlier rule
    Always,
    /// `attribute == literal`
    Equals { attribute: String, literal: Literal },
    /// Raw condition text and its parsed form
    Expr { text: String, expr: ParsedExpr },
}

impl Condition {
    /// Normalize a `when` argument into a condition.
    ///
    /// With an attribute, text starting with one of [`FRAGMENT_PREFIXES`] is
    /// spliced as `(attribute<fragment>)`; other values become an equality test.
    /// Without one, text is a condition over the whole row.
    pub fn from_literal(attribute: Option<&str>, literal: Literal) -> Result<Condition, LmError> {
        let Some(attribute) = attribute else {
            return match literal {
                Literal::Text(text) => Condition::raw(&text),
                Literal::Boolean(b) => Ok(Condition::Expr {
                    text: Literal::Boolean(b).to_string(),
                    expr: ParsedExpr::Literal(Literal::Boolean(b)),
                }),
                Literal::Number(n) => Err(LmError::UnsupportedCondition(format!(
                    "number {n} needs a predictor attribute to compare against"
                ))),
            };
        };

        match literal {
            Literal::Text(text) => {
                let first = text.chars().next().ok_or_else(|| {
                    LmError::UnsupportedCondition(format!(
                        "empty condition for attribute '{attribute}'"
                    ))
                })?;
                if FRAGMENT_PREFIXES.contains(&first) {
                    Condition::raw(&format!("({}{})", quote_name(attribute), text))
                } else if text.chars().all(|c| c.is_ascii_digit()) {
                    // Numeric-looking text compares unquoted
                    let n = text.parse::<f64>().map_err(|_| {
                        LmError::UnsupportedCondition(format!("cannot read '{text}' as a number"))
                    })?;
                    Ok(Condition::Equals { attribute: attribute.to_string(), literal: Literal::Number(n) })
                } else {
                    Ok(Condition::Equals { attribute: attribute.to_string(), literal: Literal::Text(text) })
                }
            }
            literal => Ok(Condition::Equals { attribute: attribute.to_string(), literal }),
        }
    }

    /// A raw condition over the row, e.g. `(age >= 15) & (sex == "F")`.
    pub fn raw(text: &str) -> Result<Condition, LmError> {
        let expr = parse(text)?;
        Ok(Condition::Expr { text: text.to_string(), expr })
    }

    pub fn is_unconditioned(&self) -> bool {
        matches!(self, Condition::Always)
    }

    /// Resolve column names against `table` for one evaluation.
    pub(crate) fn bind(&self, table: &Table) -> Result<BoundCondition<'_>, LmError> {
        match self {
            Condition::Always => Ok(BoundCondition::Always),
            Condition::Equals { attribute, literal } => {
                let column = table.column_index(attribute).ok_or_else(|| {
                    LmError::UnknownAttribute { attribute: attribute.clone() }
                })?;
                Ok(BoundCondition::Equals { column, literal })
            }
            Condition::Expr { text, expr } => {
                let bound = bind_expr(expr, |name| table.column_index(name)).map_err(|symbol| {
                    LmError::UnknownSymbol { expr: text.clone(), symbol }
                })?;
                Ok(BoundCondition::Expr { text, expr: bound })
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => write!(f, "otherwise"),
            Condition::Equals { attribute, literal } => {
                write!(f, "({} == {})", quote_name(attribute), literal)
            }
            Condition::Expr { text, .. } => write!(f, "{}", text),
        }
    }
}

/// Spell a column name so the condition parser reads it back as one name.
fn quote_name(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false)
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !matches!(name, "True" | "False" | "and" | "or" | "not" | "in");
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name)
    }
}

// =============================================================================
// BoundCondition: a condition resolved against one table
// =============================================================================

pub(crate) enum BoundCondition<'c> {
    Always,
    Equals { column: usize, literal: &'c Literal },
    Expr { text: &'c str, expr: BoundExpr },
}

impl BoundCondition<'_> {
    pub(crate) fn matches(&self, table: &Table, row: usize, opts: &EvalOptions) -> Result<bool, LmError> {
        match self {
            BoundCondition::Always => Ok(true),
            BoundCondition::Equals { column, literal } => {
                let cell = table.column_at(*column).get(row);
                // Equality never fails on type
                Ok(compare(CmpOp::Eq, cell, literal.as_scalar(), opts).unwrap_or(false))
            }
            BoundCondition::Expr { text, expr } => evaluate(expr, table, row, opts)
                .and_then(truth)
                .map_err(|message| LmError::TypeMismatch { expr: text.to_string(), message }),
        }
    }
}
