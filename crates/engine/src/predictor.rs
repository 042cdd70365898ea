//! Predictor - ordered (condition, coefficient) rules over one attribute
//!
//! Rules are evaluated in the order they were added. A row takes the
//! coefficient of the first rule that matches it; later rules never see it
//! again. Rows no rule matches get `None` ("no effect"), which is not zero.

use std::fmt;

use crate::condition::{Condition, Literal};
use crate::error::LmError;
use crate::table::Table;
use crate::trace::{EvalContext, RuleTrace};

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub condition: Condition,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predictor {
    attribute: Option<String>,
    rules: Vec<Rule>,
    has_default: bool,
}

impl Predictor {
    /// Predictor over one column of the table, e.g. `Predictor::new("sex")`.
    pub fn new(attribute: &str) -> Self {
        Self {
            attribute: Some(attribute.to_string()),
            rules: Vec::new(),
            has_default: false,
        }
    }

    /// Predictor whose conditions are written over the whole row,
    /// e.g. `(age >= 15) & (sex == "F")`.
    pub fn unnamed() -> Self {
        Self {
            attribute: None,
            rules: Vec::new(),
            has_default: false,
        }
    }

    /// Add a conditioned rule.
    ///
    /// With an attribute, `condition` is a value to compare against, or text
    /// starting with `=`, `<`, `>`, `~`, `(` or `.` spliced after the attribute
    /// name (`"<5"`, `".between(15, 49)"`). Without an attribute it is a
    /// condition over the row.
    pub fn when(mut self, condition: impl Into<Literal>, coefficient: f64) -> Result<Self, LmError> {
        let condition = Condition::from_literal(self.attribute.as_deref(), condition.into())?;
        self.rules.push(Rule { condition, coefficient });
        Ok(self)
    }

    /// Add the rule for every row not matched so far. Only one per predictor.
    pub fn otherwise(mut self, coefficient: f64) -> Result<Self, LmError> {
        let attribute = self.attribute.as_deref().ok_or(LmError::DefaultWithoutAttribute)?;
        if self.has_default {
            return Err(LmError::DuplicateDefault { attribute: attribute.to_string() });
        }
        self.has_default = true;
        self.rules.push(Rule { condition: Condition::Always, coefficient });
        Ok(self)
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    /// Column label in a model breakdown
    pub fn label(&self) -> &str {
        self.attribute.as_deref().unwrap_or("<expr>")
    }

    pub fn predict(&self, table: &Table) -> Result<Vec<Option<f64>>, LmError> {
        self.predict_with(table, &EvalContext::default())
    }

    /// Evaluate every row, first matching rule wins.
    ///
    /// Fails without a partial result if the attribute is not a column, a
    /// condition names an unknown column, or a condition cannot be evaluated.
    pub fn predict_with(&self, table: &Table, ctx: &EvalContext<'_>) -> Result<Vec<Option<f64>>, LmError> {
        if let Some(attribute) = &self.attribute {
            if !table.has_column(attribute) {
                return Err(LmError::UnknownAttribute { attribute: attribute.clone() });
            }
        }

        let bound = self
            .rules
            .iter()
            .map(|rule| rule.condition.bind(table))
            .collect::<Result<Vec<_>, _>>()?;

        let opts = ctx.options();
        let rows = table.row_count();
        let mut output = vec![None; rows];
        // Rows already claimed by an earlier rule; local to this call
        let mut touched = vec![false; rows];

        for (rule, condition) in self.rules.iter().zip(&bound) {
            let mut matched = 0;
            for row in 0..rows {
                if touched[row] {
                    continue;
                }
                if condition.matches(table, row, &opts)? {
                    output[row] = Some(rule.coefficient);
                    touched[row] = true;
                    matched += 1;
                }
            }
            ctx.emit(RuleTrace {
                attribute: self.attribute.clone(),
                condition: rule.condition.to_string(),
                coefficient: rule.coefficient,
                rows_matched: matched,
            });
        }

        Ok(output)
    }
}

impl fmt::Display for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.label())?;
        for (i, rule) in self.rules.iter().enumerate() {
            let sep = if i == 0 { " " } else { "; " };
            write!(f, "{}{} -> {}", sep, rule.condition, rule.coefficient)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::CollectingSink;

    fn sexes() -> Table {
        Table::new()
            .with_column("sex", vec!["M", "F", "M", "F"])
            .unwrap()
            .with_column("age", vec![3.0, 10.0, 70.0, f64::NAN])
            .unwrap()
    }

    #[test]
    fn test_default_only_predictor() {
        let p = Predictor::new("sex").otherwise(2.5).unwrap();
        assert_eq!(p.predict(&sexes()).unwrap(), vec![Some(2.5); 4]);
    }

    #[test]
    fn test_unmatched_rows_are_none() {
        let p = Predictor::new("sex").when("M", 1.5).unwrap();
        assert_eq!(p.predict(&sexes()).unwrap(), vec![Some(1.5), None, Some(1.5), None]);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // Row 0 (age 3) satisfies both rules
        let p = Predictor::new("age")
            .when("<5", 2.0)
            .unwrap()
            .when("<50", 3.0)
            .unwrap();
        assert_eq!(p.predict(&sexes()).unwrap(), vec![Some(2.0), Some(3.0), None, None]);
    }

    #[test]
    fn test_otherwise_after_conditions() {
        let p = Predictor::new("sex").when("M", 1.5).unwrap().otherwise(1.0).unwrap();
        assert_eq!(
            p.predict(&sexes()).unwrap(),
            vec![Some(1.5), Some(1.0), Some(1.5), Some(1.0)]
        );
    }

    #[test]
    fn test_otherwise_catches_missing_attribute_values() {
        let p = Predictor::new("age").when(">=5", 0.5).unwrap().otherwise(9.0).unwrap();
        assert_eq!(p.predict(&sexes()).unwrap(), vec![Some(9.0), Some(0.5), Some(0.5), Some(9.0)]);
    }

    #[test]
    fn test_second_otherwise_is_rejected() {
        let err = Predictor::new("sex").otherwise(1.0).unwrap().otherwise(2.0).unwrap_err();
        assert_eq!(err, LmError::DuplicateDefault { attribute: "sex".into() });
    }

    #[test]
    fn test_otherwise_without_attribute_is_rejected() {
        let err = Predictor::unnamed().otherwise(1.0).unwrap_err();
        assert_eq!(err, LmError::DefaultWithoutAttribute);
    }

    #[test]
    fn test_unnamed_predictor_over_several_columns() {
        let p = Predictor::unnamed()
            .when("(age < 50) & (sex == 'F')", 4.0)
            .unwrap()
            .when("age >= 50", 5.0)
            .unwrap();
        assert_eq!(p.predict(&sexes()).unwrap(), vec![None, Some(4.0), Some(5.0), None]);
    }

    #[test]
    fn test_unknown_attribute_fails_whole_call() {
        let p = Predictor::new("li_bmi").otherwise(1.0).unwrap();
        let err = p.predict(&sexes()).unwrap_err();
        assert_eq!(err, LmError::UnknownAttribute { attribute: "li_bmi".into() });
    }

    #[test]
    fn test_unknown_symbol_in_expression() {
        let p = Predictor::unnamed().when("li_bmi > 3", 1.0).unwrap();
        let err = p.predict(&sexes()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Expression);
    }

    #[test]
    fn test_type_error_fails_whole_call() {
        let p = Predictor::new("sex").when(">3", 1.0).unwrap();
        let err = p.predict(&sexes()).unwrap_err();
        assert!(matches!(err, LmError::TypeMismatch { .. }), "{err:?}");
    }

    #[test]
    fn test_predict_does_not_mutate_rules() {
        let p = Predictor::new("sex").when("M", 1.5).unwrap().otherwise(1.0).unwrap();
        let before = p.clone();
        p.predict(&sexes()).unwrap();
        p.predict(&sexes()).unwrap();
        assert_eq!(p, before);
    }

    #[test]
    fn test_trace_one_record_per_rule() {
        let sink = CollectingSink::new();
        let ctx = EvalContext::default().with_sink(&sink);
        let p = Predictor::new("sex").when("M", 1.5).unwrap().otherwise(1.0).unwrap();

        let traced = p.predict_with(&sexes(), &ctx).unwrap();
        assert_eq!(traced, p.predict(&sexes()).unwrap());

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].condition, "(sex == \"M\")");
        assert_eq!(records[0].rows_matched, 2);
        assert_eq!(records[1].condition, "otherwise");
        assert_eq!(records[1].rows_matched, 2);
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new().with_column("sex", Vec::<String>::new()).unwrap();
        let p = Predictor::new("sex").when("M", 1.5).unwrap();
        assert!(p.predict(&table).unwrap().is_empty());
    }

    #[test]
    fn test_display() {
        let p = Predictor::new("sex").when("M", 1.5).unwrap().otherwise(1.0).unwrap();
        assert_eq!(p.to_string(), "sex: (sex == \"M\") -> 1.5; otherwise -> 1");
    }
}
