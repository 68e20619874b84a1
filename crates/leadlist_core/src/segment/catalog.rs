//! Operator catalog.
//!
//! # Responsibility
//! - Fix, per field class, which operator names are legal.
//! - Turn an editable [`Rule`] into a [`CheckedRule`] whose operator is a
//!   class-specific enum and whose literal is already parsed.
//!
//! # Invariants
//! - Text comparisons fold Unicode case on both operands through
//!   [`fold_text`], the same folding the SQL store registers.
//! - Numeric literals must be finite decimals.
//! - Day counts for `in_last_days` are non-negative integers.

use crate::model::rule::{FieldClass, LeadField, OperatorName, Rule};
use crate::segment::validation::{LiteralProblem, ValidationError};
use chrono::{DateTime, NaiveDate};

/// Milliseconds in one day.
pub const DAY_MS: i64 = 86_400_000;

const TEXT_OPERATORS: &[OperatorName] = &[
    OperatorName::Equals,
    OperatorName::NotEquals,
    OperatorName::Contains,
    OperatorName::StartsWith,
    OperatorName::EndsWith,
];

const NUMERIC_OPERATORS: &[OperatorName] = &[
    OperatorName::Equals,
    OperatorName::GreaterThan,
    OperatorName::LessThan,
    OperatorName::GreaterEqual,
    OperatorName::LessEqual,
];

const DATE_OPERATORS: &[OperatorName] = &[
    OperatorName::Equals,
    OperatorName::After,
    OperatorName::Before,
    OperatorName::InLastDays,
];

/// Case folding shared by every text comparison.
pub fn fold_text(value: &str) -> String {
    value.to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
}

impl TextOperator {
    /// Evaluates `haystack <op> needle`, ignoring case.
    pub fn eval(self, haystack: &str, needle: &str) -> bool {
        let haystack = fold_text(haystack);
        let needle = fold_text(needle);
        match self {
            TextOperator::Equals => haystack == needle,
            TextOperator::NotEquals => haystack != needle,
            TextOperator::Contains => haystack.contains(needle.as_str()),
            TextOperator::StartsWith => haystack.starts_with(needle.as_str()),
            TextOperator::EndsWith => haystack.ends_with(needle.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOperator {
    Equals,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
}

impl NumericOperator {
    pub fn eval(self, lhs: f64, rhs: f64) -> bool {
        match self {
            NumericOperator::Equals => lhs == rhs,
            NumericOperator::GreaterThan => lhs > rhs,
            NumericOperator::LessThan => lhs < rhs,
            NumericOperator::GreaterEqual => lhs >= rhs,
            NumericOperator::LessEqual => lhs <= rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOperator {
    Equals,
    After,
    Before,
    InLastDays,
}

/// Class-tagged operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Text(TextOperator),
    Numeric(NumericOperator),
    Date(DateOperator),
}

/// Half-open time span `[start_ms, end_ms)` denoted by a date literal.
///
/// A calendar date covers the whole UTC day; a timestamp covers one
/// millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl DateSpan {
    pub fn instant(epoch_ms: i64) -> Self {
        Self {
            start_ms: epoch_ms,
            end_ms: epoch_ms.saturating_add(1),
        }
    }
}

/// Parsed operand for one rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Text(TextOperator, String),
    Numeric(NumericOperator, f64),
    Date(DateCondition),
}

/// Date comparison with its literal already parsed.
///
/// `InLastDays` keeps the raw day count; the cutoff instant depends on the
/// clock at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCondition {
    Equals(DateSpan),
    After(DateSpan),
    Before(DateSpan),
    InLastDays(u32),
}

/// Rule whose operator and literal passed the catalog checks.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedRule {
    pub field: LeadField,
    pub condition: Condition,
}

/// Legal operator names for a field class, in picker order.
pub fn operators_for(class: FieldClass) -> &'static [OperatorName] {
    match class {
        FieldClass::Text => TEXT_OPERATORS,
        FieldClass::Numeric => NUMERIC_OPERATORS,
        FieldClass::Date => DATE_OPERATORS,
    }
}

/// Operator a rule row starts with after its field changes.
pub fn default_operator(class: FieldClass) -> OperatorName {
    match class {
        FieldClass::Text | FieldClass::Numeric | FieldClass::Date => OperatorName::Equals,
    }
}

/// Resolves an operator name against a field class.
///
/// Returns `None` when the name is not legal for the class.
pub fn typed_operator(class: FieldClass, name: OperatorName) -> Option<Operator> {
    let operator = match (class, name) {
        (FieldClass::Text, OperatorName::Equals) => Operator::Text(TextOperator::Equals),
        (FieldClass::Text, OperatorName::NotEquals) => Operator::Text(TextOperator::NotEquals),
        (FieldClass::Text, OperatorName::Contains) => Operator::Text(TextOperator::Contains),
        (FieldClass::Text, OperatorName::StartsWith) => Operator::Text(TextOperator::StartsWith),
        (FieldClass::Text, OperatorName::EndsWith) => Operator::Text(TextOperator::EndsWith),
        (FieldClass::Numeric, OperatorName::Equals) => {
            Operator::Numeric(NumericOperator::Equals)
        }
        (FieldClass::Numeric, OperatorName::GreaterThan) => {
            Operator::Numeric(NumericOperator::GreaterThan)
        }
        (FieldClass::Numeric, OperatorName::LessThan) => {
            Operator::Numeric(NumericOperator::LessThan)
        }
        (FieldClass::Numeric, OperatorName::GreaterEqual) => {
            Operator::Numeric(NumericOperator::GreaterEqual)
        }
        (FieldClass::Numeric, OperatorName::LessEqual) => {
            Operator::Numeric(NumericOperator::LessEqual)
        }
        (FieldClass::Date, OperatorName::Equals) => Operator::Date(DateOperator::Equals),
        (FieldClass::Date, OperatorName::After) => Operator::Date(DateOperator::After),
        (FieldClass::Date, OperatorName::Before) => Operator::Date(DateOperator::Before),
        (FieldClass::Date, OperatorName::InLastDays) => Operator::Date(DateOperator::InLastDays),
        _ => return None,
    };
    Some(operator)
}

/// Checks one rule and parses its literal.
pub fn check_rule(rule: &Rule) -> Result<CheckedRule, ValidationError> {
    let operator = typed_operator(rule.field.class(), rule.operator).ok_or(
        ValidationError::InvalidOperatorForField {
            field: rule.field,
            operator: rule.operator,
        },
    )?;

    let invalid = |problem: LiteralProblem| ValidationError::InvalidLiteral {
        field: rule.field,
        operator: rule.operator,
        value: rule.value.clone(),
        problem,
    };

    let condition = match operator {
        Operator::Text(op) => Condition::Text(op, rule.value.clone()),
        Operator::Numeric(op) => {
            let value = parse_decimal(&rule.value).map_err(invalid)?;
            Condition::Numeric(op, value)
        }
        Operator::Date(op) => Condition::Date(match op {
            DateOperator::InLastDays => {
                DateCondition::InLastDays(parse_day_count(&rule.value).map_err(invalid)?)
            }
            DateOperator::Equals => {
                DateCondition::Equals(parse_date_span(&rule.value).map_err(invalid)?)
            }
            DateOperator::After => {
                DateCondition::After(parse_date_span(&rule.value).map_err(invalid)?)
            }
            DateOperator::Before => {
                DateCondition::Before(parse_date_span(&rule.value).map_err(invalid)?)
            }
        }),
    };

    Ok(CheckedRule {
        field: rule.field,
        condition,
    })
}

fn parse_decimal(value: &str) -> Result<f64, LiteralProblem> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LiteralProblem::Empty);
    }
    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(LiteralProblem::NotANumber),
    }
}

fn parse_day_count(value: &str) -> Result<u32, LiteralProblem> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LiteralProblem::Empty);
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| LiteralProblem::NotADayCount)
}

/// Parses `YYYY-MM-DD`, RFC 3339 or raw epoch milliseconds.
fn parse_date_span(value: &str) -> Result<DateSpan, LiteralProblem> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LiteralProblem::Empty);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let start_ms = date
            .and_hms_opt(0, 0, 0)
            .ok_or(LiteralProblem::NotADate)?
            .and_utc()
            .timestamp_millis();
        return Ok(DateSpan {
            start_ms,
            end_ms: start_ms + DAY_MS,
        });
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(DateSpan::instant(timestamp.timestamp_millis()));
    }

    trimmed
        .parse::<i64>()
        .map(DateSpan::instant)
        .map_err(|_| LiteralProblem::NotADate)
}
