//! Criteria validation.
//!
//! Pure checks run before a list definition is persisted and again before a
//! smart list is compiled.

use crate::model::list::ListKind;
use crate::model::rule::{LeadField, OperatorName, Rule};
use crate::segment::catalog::{check_rule, CheckedRule};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Why a literal could not be parsed for its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralProblem {
    Empty,
    NotANumber,
    NotADayCount,
    NotADate,
}

impl Display for LiteralProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "value is empty"),
            Self::NotANumber => write!(f, "expected a decimal number"),
            Self::NotADayCount => write!(f, "expected a non-negative whole number of days"),
            Self::NotADate => {
                write!(f, "expected YYYY-MM-DD, an RFC 3339 timestamp or epoch milliseconds")
            }
        }
    }
}

/// Criteria rejected before persistence or compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Smart list with zero rules.
    EmptyCriteria,
    /// Operator is not legal for the field's class.
    InvalidOperatorForField {
        field: LeadField,
        operator: OperatorName,
    },
    /// Literal does not parse for the field's class.
    InvalidLiteral {
        field: LeadField,
        operator: OperatorName,
        value: String,
        problem: LiteralProblem,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCriteria => write!(f, "smart list requires at least one rule"),
            Self::InvalidOperatorForField { field, operator } => {
                write!(f, "operator `{operator}` is not valid for field `{field}`")
            }
            Self::InvalidLiteral {
                field,
                operator,
                value,
                problem,
            } => write!(
                f,
                "invalid value `{value}` for `{field} {operator}`: {problem}"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Validates a list's criteria for the given list kind.
///
/// Static lists always pass; their criteria is ignored.
pub fn validate_criteria(kind: ListKind, rules: &[Rule]) -> Result<(), ValidationError> {
    match kind {
        ListKind::Static => Ok(()),
        ListKind::Smart => check_criteria(rules).map(|_| ()),
    }
}

/// Checks every rule in order and returns their parsed forms.
///
/// The first failing rule wins.
pub fn check_criteria(rules: &[Rule]) -> Result<Vec<CheckedRule>, ValidationError> {
    if rules.is_empty() {
        return Err(ValidationError::EmptyCriteria);
    }
    rules.iter().map(check_rule).collect()
}
