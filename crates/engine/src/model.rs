//! LinearModel - intercept plus predictors, combined by a composition rule
//!
//! Each predictor yields one `Option<f64>` per row. The model lays those out
//! next to a constant intercept column (the [`Breakdown`]) and reduces each row
//! with the rule of its [`LinearModelType`]. A missing contribution leaves the
//! row unchanged: it adds nothing and multiplies by one.

use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::LmError;
use crate::predictor::Predictor;
use crate::table::Table;
use crate::trace::EvalContext;

/// How intercept and predictor values are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinearModelType {
    /// Sum of intercept and contributions
    Additive,
    /// Intercept is the baseline odds, contributions are odds ratios;
    /// the product is turned into a probability `odds / (1 + odds)`
    Logistic,
    /// Product of intercept and contributions
    Multiplicative,
}

impl LinearModelType {
    /// Reduce one row. `contributions` are the predictor values present for the row.
    pub fn combine(self, intercept: f64, contributions: impl IntoIterator<Item = f64>) -> f64 {
        let present = contributions.into_iter().filter(|v| !v.is_nan());
        match self {
            LinearModelType::Additive => intercept + present.sum::<f64>(),
            LinearModelType::Multiplicative => intercept * present.product::<f64>(),
            LinearModelType::Logistic => {
                let odds = intercept * present.product::<f64>();
                if odds.is_infinite() && odds > 0.0 {
                    1.0
                } else {
                    odds / (1.0 + odds)
                }
            }
        }
    }
}

impl fmt::Display for LinearModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Additive => write!(f, "additive"),
            Self::Logistic => write!(f, "logistic"),
            Self::Multiplicative => write!(f, "multiplicative"),
        }
    }
}

// =============================================================================
// Breakdown: the per-predictor working frame
// =============================================================================

/// Intercept and every predictor's column, before combination.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub model_type: LinearModelType,
    pub intercept: f64,
    /// (predictor label, one value per row), in predictor order
    pub columns: Vec<(String, Vec<Option<f64>>)>,
    pub rows: usize,
}

impl Breakdown {
    /// Combine row-wise into the model output.
    pub fn combine(&self) -> Vec<f64> {
        (0..self.rows)
            .map(|row| {
                let present = self.columns.iter().filter_map(|(_, values)| values[row]);
                self.model_type.combine(self.intercept, present)
            })
            .collect()
    }
}

// =============================================================================
// LinearModel
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    model_type: LinearModelType,
    intercept: f64,
    predictors: Vec<Predictor>,
}

impl LinearModel {
    /// A NaN intercept counts as not specified and fails at `predict`.
    pub fn new(model_type: LinearModelType, intercept: f64, predictors: Vec<Predictor>) -> Self {
        Self { model_type, intercept, predictors }
    }

    pub fn builder(model_type: LinearModelType) -> LinearModelBuilder {
        LinearModelBuilder {
            model_type,
            intercept: None,
            predictors: Vec::new(),
        }
    }

    pub fn model_type(&self) -> LinearModelType {
        self.model_type
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn predictors(&self) -> &[Predictor] {
        &self.predictors
    }

    pub fn predict(&self, table: &Table) -> Result<Vec<f64>, LmError> {
        self.predict_with(table, &EvalContext::default())
    }

    pub fn predict_with(&self, table: &Table, ctx: &EvalContext<'_>) -> Result<Vec<f64>, LmError> {
        log::debug!(
            "{} model: {} predictor(s) over {} row(s)",
            self.model_type,
            self.predictors.len(),
            table.row_count()
        );
        Ok(self.breakdown_with(table, ctx)?.combine())
    }

    pub fn breakdown(&self, table: &Table) -> Result<Breakdown, LmError> {
        self.breakdown_with(table, &EvalContext::default())
    }

    /// Validate, then evaluate every predictor into the working frame.
    pub fn breakdown_with(&self, table: &Table, ctx: &EvalContext<'_>) -> Result<Breakdown, LmError> {
        self.validate(table)?;

        let columns = self.predictor_columns(table, ctx)?;
        Ok(Breakdown {
            model_type: self.model_type,
            intercept: self.intercept,
            columns: self
                .predictors
                .iter()
                .map(|p| p.label().to_string())
                .zip(columns)
                .collect(),
            rows: table.row_count(),
        })
    }

    /// Checks run before any predictor is evaluated.
    pub fn validate(&self, table: &Table) -> Result<(), LmError> {
        if self.intercept.is_nan() {
            return Err(LmError::MissingIntercept);
        }
        for predictor in &self.predictors {
            if let Some(attribute) = predictor.attribute() {
                if !table.has_column(attribute) {
                    return Err(LmError::UnknownAttribute { attribute: attribute.to_string() });
                }
            }
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn predictor_columns(&self, table: &Table, ctx: &EvalContext<'_>) -> Result<Vec<Vec<Option<f64>>>, LmError> {
        if ctx.settings.eval.parallel {
            return self
                .predictors
                .par_iter()
                .map(|p| p.predict_with(table, ctx))
                .collect();
        }
        self.predictors.iter().map(|p| p.predict_with(table, ctx)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn predictor_columns(&self, table: &Table, ctx: &EvalContext<'_>) -> Result<Vec<Vec<Option<f64>>>, LmError> {
        self.predictors.iter().map(|p| p.predict_with(table, ctx)).collect()
    }
}

impl fmt::Display for LinearModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} model, intercept {}", self.model_type, self.intercept)?;
        for predictor in &self.predictors {
            write!(f, "\n  {}", predictor)?;
        }
        Ok(())
    }
}

/// Builder for a [`LinearModel`]; `build` fails if no intercept was given.
#[derive(Debug, Clone)]
pub struct LinearModelBuilder {
    model_type: LinearModelType,
    intercept: Option<f64>,
    predictors: Vec<Predictor>,
}

impl LinearModelBuilder {
    pub fn intercept(mut self, intercept: f64) -> Self {
        self.intercept = Some(intercept);
        self
    }

    pub fn predictor(mut self, predictor: Predictor) -> Self {
        self.predictors.push(predictor);
        self
    }

    pub fn predictors(mut self, predictors: impl IntoIterator<Item = Predictor>) -> Self {
        self.predictors.extend(predictors);
        self
    }

    pub fn build(self) -> Result<LinearModel, LmError> {
        match self.intercept {
            Some(intercept) if !intercept.is_nan() => {
                Ok(LinearModel::new(self.model_type, intercept, self.predictors))
            }
            _ => Err(LmError::MissingIntercept),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{actual:?} vs {expected:?}");
        }
    }

    fn table(rows: usize) -> Table {
        Table::new().with_column("x", vec![0.0; rows]).unwrap()
    }

    #[test]
    fn test_no_predictor_models() {
        let t = table(3);
        let additive = LinearModel::new(LinearModelType::Additive, 0.25, vec![]);
        assert_close(&additive.predict(&t).unwrap(), &[0.25; 3]);

        let logistic = LinearModel::new(LinearModelType::Logistic, 0.25, vec![]);
        assert_close(&logistic.predict(&t).unwrap(), &[0.2; 3]);

        let multiplicative = LinearModel::new(LinearModelType::Multiplicative, 0.25, vec![]);
        assert_close(&multiplicative.predict(&t).unwrap(), &[0.25; 3]);
    }

    #[test]
    fn test_combine_skips_missing() {
        assert_eq!(LinearModelType::Additive.combine(1.0, [2.0, f64::NAN, 3.0]), 6.0);
        assert_eq!(LinearModelType::Multiplicative.combine(2.0, [f64::NAN, 3.0]), 6.0);
        assert_eq!(LinearModelType::Logistic.combine(1.0, [f64::NAN]), 0.5);
    }

    #[test]
    fn test_logistic_with_infinite_odds() {
        assert_eq!(LinearModelType::Logistic.combine(1.0, [f64::INFINITY]), 1.0);
        assert_eq!(LinearModelType::Logistic.combine(0.0, []), 0.0);
    }

    #[test]
    fn test_missing_intercept() {
        let model = LinearModel::new(LinearModelType::Additive, f64::NAN, vec![]);
        assert_eq!(model.predict(&table(1)).unwrap_err(), LmError::MissingIntercept);

        let err = LinearModel::builder(LinearModelType::Logistic).build().unwrap_err();
        assert_eq!(err, LmError::MissingIntercept);
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_intercept_checked_before_columns() {
        let p = Predictor::new("absent").otherwise(1.0).unwrap();
        let model = LinearModel::new(LinearModelType::Additive, f64::NAN, vec![p]);
        assert_eq!(model.predict(&table(1)).unwrap_err(), LmError::MissingIntercept);
    }

    #[test]
    fn test_unknown_attribute_is_validation_error() {
        let p = Predictor::new("li_bmi").when("3", 2.0).unwrap();
        let model = LinearModel::new(LinearModelType::Multiplicative, 1.0, vec![p]);
        let err = model.predict(&table(2)).unwrap_err();
        assert_eq!(err, LmError::UnknownAttribute { attribute: "li_bmi".into() });
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_breakdown_keeps_predictor_order() {
        let t = Table::new()
            .with_column("sex", vec!["M", "F"])
            .unwrap()
            .with_column("age", vec![3.0, 30.0])
            .unwrap();
        let model = LinearModel::builder(LinearModelType::Additive)
            .intercept(1.0)
            .predictor(Predictor::new("sex").when("M", 0.5).unwrap())
            .predictor(Predictor::unnamed().when("age > 18", 2.0).unwrap())
            .build()
            .unwrap();

        let breakdown = model.breakdown(&t).unwrap();
        assert_eq!(breakdown.columns[0], ("sex".to_string(), vec![Some(0.5), None]));
        assert_eq!(breakdown.columns[1], ("<expr>".to_string(), vec![None, Some(2.0)]));
        assert_eq!(breakdown.combine(), vec![1.5, 3.0]);
        assert_eq!(model.predict(&t).unwrap(), vec![1.5, 3.0]);
    }

    #[test]
    fn test_display() {
        let model = LinearModel::builder(LinearModelType::Logistic)
            .intercept(0.5)
            .predictor(Predictor::new("sex").when("M", 1.5).unwrap())
            .build()
            .unwrap();
        assert_eq!(model.to_string(), "logistic model, intercept 0.5\n  sex: (sex == \"M\") -> 1.5");
    }
}
