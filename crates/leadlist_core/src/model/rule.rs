//! Smart-list criteria model.
//!
//! # Responsibility
//! - Define the editable shape of one criterion (`field`, `operator`,
//!   `value`) as stored in `lists.criteria_json`.
//! - Map every lead field onto the comparison class that decides which
//!   operators it accepts.
//!
//! # Invariants
//! - `value` is kept as the user typed it; typed parsing happens in
//!   [`crate::segment::catalog::check_rule`].
//! - A list's criteria is an ordered sequence combined with logical AND.

use crate::segment::catalog::default_operator;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Comparison class a lead field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    Text,
    Numeric,
    Date,
}

/// Lead attributes a rule may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    Name,
    Email,
    Company,
    Title,
    Industry,
    Location,
    Status,
    Source,
    Score,
    CreatedAt,
    UpdatedAt,
}

impl LeadField {
    /// Every field in picker order.
    pub const ALL: [LeadField; 11] = [
        LeadField::Name,
        LeadField::Email,
        LeadField::Company,
        LeadField::Title,
        LeadField::Industry,
        LeadField::Location,
        LeadField::Status,
        LeadField::Source,
        LeadField::Score,
        LeadField::CreatedAt,
        LeadField::UpdatedAt,
    ];

    /// Fixed field -> class mapping.
    pub fn class(self) -> FieldClass {
        match self {
            LeadField::Name
            | LeadField::Email
            | LeadField::Company
            | LeadField::Title
            | LeadField::Industry
            | LeadField::Location
            | LeadField::Status
            | LeadField::Source => FieldClass::Text,
            LeadField::Score => FieldClass::Numeric,
            LeadField::CreatedAt | LeadField::UpdatedAt => FieldClass::Date,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadField::Name => "name",
            LeadField::Email => "email",
            LeadField::Company => "company",
            LeadField::Title => "title",
            LeadField::Industry => "industry",
            LeadField::Location => "location",
            LeadField::Status => "status",
            LeadField::Source => "source",
            LeadField::Score => "score",
            LeadField::CreatedAt => "created_at",
            LeadField::UpdatedAt => "updated_at",
        }
    }
}

impl Display for LeadField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator name as chosen in the editor and persisted in criteria JSON.
///
/// Names are shared across classes (`equals` is valid for text, numbers and
/// dates); the catalog decides which names a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorName {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    After,
    Before,
    InLastDays,
}

impl OperatorName {
    pub fn as_str(self) -> &'static str {
        match self {
            OperatorName::Equals => "equals",
            OperatorName::NotEquals => "not_equals",
            OperatorName::Contains => "contains",
            OperatorName::StartsWith => "starts_with",
            OperatorName::EndsWith => "ends_with",
            OperatorName::GreaterThan => "greater_than",
            OperatorName::LessThan => "less_than",
            OperatorName::GreaterEqual => "greater_equal",
            OperatorName::LessEqual => "less_equal",
            OperatorName::After => "after",
            OperatorName::Before => "before",
            OperatorName::InLastDays => "in_last_days",
        }
    }
}

impl Display for OperatorName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One criterion of a smart list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub field: LeadField,
    pub operator: OperatorName,
    /// String-encoded literal; numeric and date rules parse it on use.
    pub value: String,
}

impl Rule {
    pub fn new(field: LeadField, operator: OperatorName, value: impl Into<String>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }

    /// Creates a rule for `field` with the class default operator and an
    /// empty value, as a freshly added editor row.
    pub fn blank(field: LeadField) -> Self {
        Self::new(field, default_operator(field.class()), String::new())
    }

    /// Points this rule at another field.
    ///
    /// Operator resets to the new class default and the value is cleared so
    /// a literal typed for the old field never survives a class change.
    pub fn change_field(&mut self, field: LeadField) {
        *self = Self::blank(field);
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldClass, LeadField, OperatorName, Rule};

    #[test]
    fn field_classes_follow_fixed_mapping() {
        assert_eq!(LeadField::Status.class(), FieldClass::Text);
        assert_eq!(LeadField::Score.class(), FieldClass::Numeric);
        assert_eq!(LeadField::CreatedAt.class(), FieldClass::Date);
    }

    #[test]
    fn change_field_resets_operator_and_value() {
        let mut rule = Rule::new(LeadField::Score, OperatorName::GreaterEqual, "50");
        rule.change_field(LeadField::Status);
        assert_eq!(rule.field, LeadField::Status);
        assert_eq!(rule.operator, OperatorName::Equals);
        assert!(rule.value.is_empty());
    }

    #[test]
    fn change_field_within_same_class_still_clears_value() {
        let mut rule = Rule::new(LeadField::Status, OperatorName::Contains, "qual");
        rule.change_field(LeadField::Source);
        assert_eq!(rule.operator, OperatorName::Equals);
        assert!(rule.value.is_empty());
    }
}
