//! Condition types and per-type comparison logic for segment rules.

use std::fmt;

use audience_core::Customer;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::catalog::{operator_label, Field};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    NotContains,
    Before,
    After,
    Between,
    /// Any operator name outside the set above. Loads so stored rules stay
    /// readable, never matches.
    #[serde(other)]
    Unrecognized,
}

impl ConditionOperator {
    pub fn id(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not_equals",
            ConditionOperator::GreaterThan => "greater_than",
            ConditionOperator::LessThan => "less_than",
            ConditionOperator::Contains => "contains",
            ConditionOperator::NotContains => "not_contains",
            ConditionOperator::Before => "before",
            ConditionOperator::After => "after",
            ConditionOperator::Between => "between",
            ConditionOperator::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    pub fn combine(self, acc: bool, next: bool) -> bool {
        match self {
            LogicalOperator::And => acc && next,
            LogicalOperator::Or => acc || next,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => f.write_str("AND"),
            LogicalOperator::Or => f.write_str("OR"),
        }
    }
}

/// The right-hand side of a condition. Its expected shape depends on the
/// field type: numbers for number fields, text for string/array fields and
/// single dates, and a two-element list for a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
    /// Anything else found in stored rules (`null`, booleans, objects).
    Other(serde_json::Value),
}

impl ConditionValue {
    pub fn range(start: impl Into<String>, end: impl Into<String>) -> Self {
        ConditionValue::List(vec![start.into(), end.into()])
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ConditionValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConditionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Both ends of a date range, if this value is exactly a pair.
    pub fn as_pair(&self) -> Option<(&str, &str)> {
        match self {
            ConditionValue::List(items) => match items.as_slice() {
                [start, end] => Some((start.as_str(), end.as_str())),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<f64> for ConditionValue {
    fn from(n: f64) -> Self {
        ConditionValue::Number(n)
    }
}

impl From<&str> for ConditionValue {
    fn from(s: &str) -> Self {
        ConditionValue::Text(s.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(s: String) -> Self {
        ConditionValue::Text(s)
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            ConditionValue::Number(n) => write!(f, "{}", n),
            ConditionValue::Text(s) => write!(f, "\"{}\"", s),
            ConditionValue::List(items) => f.write_str(&items.join(" and ")),
            ConditionValue::Other(raw) => write!(f, "{}", raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: String,
    /// Field catalog id, e.g. `totalSpend`. Ids outside the catalog are kept
    /// as-is and never match.
    pub field: String,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Field::from_id(&self.field) {
            Some(field) => write!(
                f,
                "{} {} {}",
                field.label(),
                operator_label(field.field_type(), self.operator),
                self.value
            ),
            None => write!(f, "{} {} {}", self.field, self.operator, self.value),
        }
    }
}

/// A customer attribute, typed by its field's declared type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attribute<'a> {
    Text(&'a str),
    Number(f64),
    Date(&'a str),
    Tags(&'a [String]),
}

pub fn attribute(customer: &Customer, field: Field) -> Attribute<'_> {
    match field {
        Field::TotalSpend => Attribute::Number(customer.total_spend),
        Field::Visits => Attribute::Number(f64::from(customer.visits)),
        Field::LastPurchaseDate => Attribute::Date(&customer.last_purchase_date),
        Field::JoinDate => Attribute::Date(&customer.join_date),
        Field::Tags => Attribute::Tags(&customer.tags),
        Field::FirstName => Attribute::Text(&customer.first_name),
        Field::LastName => Attribute::Text(&customer.last_name),
        Field::Email => Attribute::Text(&customer.email),
        Field::PhoneNumber => Attribute::Text(&customer.phone_number),
    }
}

/// Test one customer against one condition.
///
/// Unknown fields, operators that do not apply to the field's type, and
/// values of the wrong shape all evaluate to `false`.
pub fn evaluate_condition(customer: &Customer, condition: &Condition) -> bool {
    let Some(field) = Field::from_id(&condition.field) else {
        return false;
    };
    let operator = &condition.operator;
    let value = &condition.value;

    match attribute(customer, field) {
        Attribute::Text(actual) => value
            .as_text()
            .is_some_and(|expected| compare_text(actual, operator, expected)),
        Attribute::Number(actual) => value
            .as_number()
            .is_some_and(|expected| compare_numbers(actual, operator, expected)),
        Attribute::Date(actual) => compare_dates(actual, operator, value),
        Attribute::Tags(tags) => value
            .as_text()
            .is_some_and(|expected| compare_tags(tags, operator, expected)),
    }
}

pub fn compare_text(actual: &str, operator: &ConditionOperator, expected: &str) -> bool {
    match operator {
        ConditionOperator::Equals => actual == expected,
        ConditionOperator::NotEquals => actual != expected,
        ConditionOperator::Contains => actual.contains(expected),
        ConditionOperator::NotContains => !actual.contains(expected),
        _ => false,
    }
}

pub fn compare_numbers(actual: f64, operator: &ConditionOperator, expected: f64) -> bool {
    match operator {
        ConditionOperator::Equals => actual == expected,
        ConditionOperator::NotEquals => actual != expected,
        ConditionOperator::GreaterThan => actual > expected,
        ConditionOperator::LessThan => actual < expected,
        _ => false,
    }
}

/// Date comparison. Range and ordering tests use millisecond timestamps;
/// `equals` compares the raw strings, so `2024-01-01` and
/// `2024-01-01T00:00:00` are not equal.
pub fn compare_dates(actual: &str, operator: &ConditionOperator, expected: &ConditionValue) -> bool {
    if *operator == ConditionOperator::Between {
        if let Some((start, end)) = expected.as_pair() {
            return match (timestamp_millis(actual), timestamp_millis(start), timestamp_millis(end)) {
                (Some(value), Some(start), Some(end)) => value >= start && value <= end,
                _ => false,
            };
        }
    }

    let ordered = |cmp: fn(i64, i64) -> bool| {
        expected
            .as_text()
            .and_then(timestamp_millis)
            .zip(timestamp_millis(actual))
            .is_some_and(|(expected, actual)| cmp(actual, expected))
    };

    match operator {
        ConditionOperator::Before => ordered(|a, e| a < e),
        ConditionOperator::After => ordered(|a, e| a > e),
        ConditionOperator::Equals => expected.as_text() == Some(actual),
        // `between` without a two-element range lands here too.
        _ => false,
    }
}

pub fn compare_tags(tags: &[String], operator: &ConditionOperator, expected: &str) -> bool {
    match operator {
        ConditionOperator::Contains => tags.iter().any(|t| t == expected),
        ConditionOperator::NotContains => !tags.iter().any(|t| t == expected),
        _ => false,
    }
}

/// Milliseconds since the epoch for an RFC 3339 timestamp, a zone-less
/// `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) or a bare `YYYY-MM-DD`.
pub fn timestamp_millis(raw: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}
