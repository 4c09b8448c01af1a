//! Rule diagnostics: reports conditions the evaluator would silently treat
//! as non-matching.

use std::collections::HashSet;

use crate::catalog::{is_legal, Field, FieldType};
use crate::engine::SegmentRule;
use crate::error::RuleIssue;
use crate::predicates::{timestamp_millis, Condition, ConditionOperator, ConditionValue};

impl Condition {
    /// Checks the field exists, the operator applies to its type and the
    /// value has a shape the evaluator can compare.
    pub fn check(&self) -> Result<(), RuleIssue> {
        let Some(field) = Field::from_id(&self.field) else {
            return Err(RuleIssue::UnknownField {
                condition_id: self.id.clone(),
                field: self.field.clone(),
            });
        };

        let field_type = field.field_type();
        if !is_legal(field_type, self.operator) {
            return Err(RuleIssue::UnsupportedOperator {
                condition_id: self.id.clone(),
                field: self.field.clone(),
                operator: self.operator.to_string(),
            });
        }

        value_problem(field_type, self.operator, &self.value).map_or(Ok(()), |reason| {
            Err(RuleIssue::MalformedValue {
                condition_id: self.id.clone(),
                reason,
            })
        })
    }
}

fn value_problem(
    field_type: FieldType,
    operator: ConditionOperator,
    value: &ConditionValue,
) -> Option<String> {
    match field_type {
        FieldType::Number => value
            .as_number()
            .is_none()
            .then(|| "expected a number".to_string()),
        FieldType::String | FieldType::Array => value
            .as_text()
            .is_none()
            .then(|| "expected text".to_string()),
        FieldType::Date if operator == ConditionOperator::Between => match value.as_pair() {
            Some((start, end)) => [start, end]
                .into_iter()
                .find(|d| timestamp_millis(d).is_none())
                .map(|d| format!("unparseable date {}", d)),
            None => Some("expected a start and end date".to_string()),
        },
        FieldType::Date => match value.as_text() {
            Some(d) if operator != ConditionOperator::Equals && timestamp_millis(d).is_none() => {
                Some(format!("unparseable date {}", d))
            }
            Some(_) => None,
            None => Some("expected a date".to_string()),
        },
    }
}

impl SegmentRule {
    /// Every issue in the rule, in tree order. An empty list means each
    /// condition can be evaluated as written.
    pub fn validate(&self) -> Vec<RuleIssue> {
        let mut issues = Vec::new();
        if self.groups.is_empty() {
            issues.push(RuleIssue::EmptyRule);
        }

        let mut seen = HashSet::new();
        let mut track = |id: &str, issues: &mut Vec<RuleIssue>| {
            if !seen.insert(id.to_string()) {
                issues.push(RuleIssue::DuplicateId { id: id.to_string() });
            }
        };
        track(&self.id, &mut issues);

        for group in &self.groups {
            track(&group.id, &mut issues);
            if group.conditions.is_empty() {
                issues.push(RuleIssue::EmptyGroup {
                    group_id: group.id.clone(),
                });
            }
            for condition in &group.conditions {
                track(&condition.id, &mut issues);
                if let Err(issue) = condition.check() {
                    issues.push(issue);
                }
            }
        }
        issues
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
