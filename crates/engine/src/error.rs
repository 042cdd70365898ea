use std::fmt;

/// Broad class of an [`LmError`], for callers that only care whether the
/// model, the table, or an expression is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed model, detected while building or before evaluating.
    Configuration,
    /// The table does not fit the model (or is itself malformed).
    Validation,
    /// A raw condition cannot be parsed or evaluated.
    Expression,
    /// Table loading failed.
    Input,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LmError {
    /// Model has no intercept (or a NaN one).
    MissingIntercept,
    /// `otherwise` called twice on the same predictor.
    DuplicateDefault { attribute: String },
    /// `otherwise` called on a predictor without an attribute.
    DefaultWithoutAttribute,
    /// A `when` argument that has no meaning for this predictor.
    UnsupportedCondition(String),
    /// A predictor's attribute is not a column of the table.
    UnknownAttribute { attribute: String },
    /// Column length differs from the table's row count.
    ColumnLength { column: String, expected: usize, found: usize },
    /// Two columns with the same name.
    DuplicateColumn(String),
    /// Raw condition text failed to parse.
    ExpressionSyntax { expr: String, message: String },
    /// Raw condition refers to a name that is not a column.
    UnknownSymbol { expr: String, symbol: String },
    /// Operands of incompatible types, or a condition that is not boolean.
    TypeMismatch { expr: String, message: String },
    /// CSV read/parse error.
    Csv(String),
}

impl LmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingIntercept
            | Self::DuplicateDefault { .. }
            | Self::DefaultWithoutAttribute
            | Self::UnsupportedCondition(_) => ErrorKind::Configuration,
            Self::UnknownAttribute { .. }
            | Self::ColumnLength { .. }
            | Self::DuplicateColumn(_) => ErrorKind::Validation,
            Self::ExpressionSyntax { .. }
            | Self::UnknownSymbol { .. }
            | Self::TypeMismatch { .. } => ErrorKind::Expression,
            Self::Csv(_) => ErrorKind::Input,
        }
    }
}

impl fmt::Display for LmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIntercept => write!(f, "intercept is not specified"),
            Self::DuplicateDefault { attribute } => {
                write!(f, "predictor '{attribute}': only one unconditioned value is allowed")
            }
            Self::DefaultWithoutAttribute => {
                write!(f, "cannot use `otherwise` on a predictor without an attribute")
            }
            Self::UnsupportedCondition(msg) => write!(f, "unsupported condition: {msg}"),
            Self::UnknownAttribute { attribute } => {
                write!(f, "predictor attribute '{attribute}' is not a column of the table")
            }
            Self::ColumnLength { column, expected, found } => {
                write!(f, "column '{column}' has {found} rows, table has {expected}")
            }
            Self::DuplicateColumn(name) => write!(f, "duplicate column '{name}'"),
            Self::ExpressionSyntax { expr, message } => {
                write!(f, "cannot parse condition '{expr}': {message}")
            }
            Self::UnknownSymbol { expr, symbol } => {
                write!(f, "condition '{expr}': unknown column '{symbol}'")
            }
            Self::TypeMismatch { expr, message } => {
                write!(f, "condition '{expr}': {message}")
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
        }
    }
}

impl std::error::Error for LmError {}
