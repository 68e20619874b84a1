//! Predicate compiler.
//!
//! # Responsibility
//! - Fold a smart list's criteria into one conjunctive [`LeadPredicate`]
//!   that a record store can execute.
//! - Provide the reference in-memory evaluation of that predicate.
//!
//! # Invariants
//! - Filters keep the rules' sequence order.
//! - Relative date cutoffs are computed from the `now_ms` passed to each
//!   compilation, never cached on the list.
//! - Rules with empty literals still participate; non-text rules with empty
//!   literals fail with `InvalidLiteral`.

use crate::model::lead::{Lead, OrganizationId};
use crate::model::rule::{LeadField, Rule};
use crate::segment::catalog::{
    CheckedRule, Condition, DateCondition, NumericOperator, TextOperator, DAY_MS,
};
use crate::segment::validation::{check_criteria, ValidationError};

/// Store-level test on a date column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTest {
    /// `start_ms <= ts < end_ms`.
    Within { start_ms: i64, end_ms: i64 },
    /// `ts >= bound_ms`.
    AtOrAfter(i64),
    /// `ts < bound_ms`.
    Before(i64),
}

/// Store-level test on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterTest {
    Text { op: TextOperator, needle: String },
    Numeric { op: NumericOperator, value: f64 },
    Date(DateTest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: LeadField,
    pub test: FilterTest,
}

/// Conjunction of field filters scoped to one organization.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadPredicate {
    pub organization_id: OrganizationId,
    pub filters: Vec<FieldFilter>,
}

impl LeadPredicate {
    /// Predicate matching every lead of the organization.
    pub fn all(organization_id: OrganizationId) -> Self {
        Self {
            organization_id,
            filters: Vec::new(),
        }
    }

    /// Narrows this predicate by one more filter.
    pub fn and(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Returns whether `lead` satisfies the organization scope and every
    /// filter.
    pub fn matches(&self, lead: &Lead) -> bool {
        lead.organization_id == self.organization_id
            && self.filters.iter().all(|filter| filter.matches(lead))
    }
}

impl FieldFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        match &self.test {
            FilterTest::Text { op, needle } => op.eval(text_value(lead, self.field), needle),
            FilterTest::Numeric { op, value } => numeric_value(lead, self.field)
                .map(|lhs| op.eval(lhs, *value))
                .unwrap_or(false),
            FilterTest::Date(test) => date_value(lead, self.field)
                .map(|ts| test.matches(ts))
                .unwrap_or(false),
        }
    }
}

impl DateTest {
    pub fn matches(self, ts: i64) -> bool {
        match self {
            DateTest::Within { start_ms, end_ms } => ts >= start_ms && ts < end_ms,
            DateTest::AtOrAfter(bound_ms) => ts >= bound_ms,
            DateTest::Before(bound_ms) => ts < bound_ms,
        }
    }
}

/// Compiles criteria into a predicate evaluated as of `now_ms`.
pub fn compile_criteria(
    organization_id: OrganizationId,
    rules: &[Rule],
    now_ms: i64,
) -> Result<LeadPredicate, ValidationError> {
    let checked = check_criteria(rules)?;
    Ok(checked
        .into_iter()
        .fold(LeadPredicate::all(organization_id), |predicate, rule| {
            predicate.and(compile_rule(rule, now_ms))
        }))
}

fn compile_rule(rule: CheckedRule, now_ms: i64) -> FieldFilter {
    let test = match rule.condition {
        Condition::Text(op, needle) => FilterTest::Text { op, needle },
        Condition::Numeric(op, value) => FilterTest::Numeric { op, value },
        Condition::Date(condition) => FilterTest::Date(match condition {
            DateCondition::Equals(span) => DateTest::Within {
                start_ms: span.start_ms,
                end_ms: span.end_ms,
            },
            DateCondition::After(span) => DateTest::AtOrAfter(span.end_ms),
            DateCondition::Before(span) => DateTest::Before(span.start_ms),
            DateCondition::InLastDays(days) => {
                DateTest::AtOrAfter(now_ms.saturating_sub(i64::from(days) * DAY_MS))
            }
        }),
    };
    FieldFilter {
        field: rule.field,
        test,
    }
}

/// Text value of a field; missing optional values read as `""`.
fn text_value(lead: &Lead, field: LeadField) -> &str {
    let value = match field {
        LeadField::Name => Some(lead.name.as_str()),
        LeadField::Status => Some(lead.status.as_str()),
        LeadField::Email => lead.email.as_deref(),
        LeadField::Company => lead.company.as_deref(),
        LeadField::Title => lead.title.as_deref(),
        LeadField::Industry => lead.industry.as_deref(),
        LeadField::Location => lead.location.as_deref(),
        LeadField::Source => lead.source.as_deref(),
        LeadField::Score | LeadField::CreatedAt | LeadField::UpdatedAt => None,
    };
    value.unwrap_or("")
}

fn numeric_value(lead: &Lead, field: LeadField) -> Option<f64> {
    match field {
        LeadField::Score => lead.score.map(|score| score as f64),
        _ => None,
    }
}

fn date_value(lead: &Lead, field: LeadField) -> Option<i64> {
    match field {
        LeadField::CreatedAt => Some(lead.created_at),
        LeadField::UpdatedAt => Some(lead.updated_at),
        _ => None,
    }
}
