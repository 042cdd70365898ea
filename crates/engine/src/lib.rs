//! `lmgrid-engine`: rule-table linear models over columnar data.
//!
//! A [`Predictor`] maps rows of a [`Table`] to coefficients through ordered
//! (condition, coefficient) rules; a [`LinearModel`] combines an intercept with
//! several predictors additively, multiplicatively or as a logistic odds model.
//! Pure engine crate: callers load the data, the engine returns one value per row.

pub mod condition;
pub mod error;
pub mod model;
pub mod predictor;
pub mod table;
pub mod trace;

pub use condition::{Condition, Literal};
pub use error::{ErrorKind, LmError};
pub use lmgrid_config::Settings;
pub use model::{Breakdown, LinearModel, LinearModelBuilder, LinearModelType};
pub use predictor::{Predictor, Rule};
pub use table::{Column, Scalar, Table};
pub use trace::{CollectingSink, EvalContext, RuleTrace, TraceSink};
