//! Evaluation context and rule tracing
//!
//! Every rule a predictor evaluates produces one [`RuleTrace`]. Records go to
//! the `log` facade (trace level, or debug when `trace.log_rules` is set) and
//! to an optional caller-supplied [`TraceSink`]. Tracing never changes results.

use lmgrid_config::Settings;
use parking_lot::Mutex;
use serde::Serialize;

use crate::condition::eval::EvalOptions;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleTrace {
    /// Predictor attribute, `None` for predictors over the whole row
    pub attribute: Option<String>,
    /// Condition as written (`otherwise` for the default rule)
    pub condition: String,
    pub coefficient: f64,
    /// Rows this rule assigned (rows already matched are not counted)
    pub rows_matched: usize,
}

/// Receiver for rule traces. Must be shareable: predictors may be evaluated
/// from several threads at once.
pub trait TraceSink: Send + Sync {
    fn record(&self, trace: &RuleTrace);
}

/// Sink that keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<RuleTrace>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RuleTrace> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl TraceSink for CollectingSink {
    fn record(&self, trace: &RuleTrace) {
        self.records.lock().push(trace.clone());
    }
}

/// Settings and trace sink for one `predict_with` call.
#[derive(Clone, Default)]
pub struct EvalContext<'a> {
    pub settings: Settings,
    pub sink: Option<&'a dyn TraceSink>,
}

impl<'a> EvalContext<'a> {
    pub fn new(settings: Settings) -> Self {
        Self { settings, sink: None }
    }

    pub fn with_sink(mut self, sink: &'a dyn TraceSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub(crate) fn options(&self) -> EvalOptions {
        EvalOptions {
            numeric_tolerance: self.settings.eval.numeric_tolerance,
        }
    }

    pub(crate) fn emit(&self, trace: RuleTrace) {
        let attribute = trace.attribute.as_deref().unwrap_or("<row>");
        if self.settings.trace.log_rules {
            log::debug!(
                "{}: {} -> {} matched {} row(s)",
                attribute, trace.condition, trace.coefficient, trace.rows_matched
            );
        } else {
            log::trace!(
                "{}: {} -> {} matched {} row(s)",
                attribute, trace.condition, trace.coefficient, trace.rows_matched
            );
        }
        if let Some(sink) = self.sink {
            sink.record(&trace);
        }
    }
}

impl std::fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("settings", &self.settings)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
