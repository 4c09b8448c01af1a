//! Segment rule trees and their evaluation against customers.

use std::fmt;

use audience_core::Customer;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::predicates::{evaluate_condition, Condition, LogicalOperator};

/// Conditions combined by one logical operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionGroup {
    pub id: String,
    pub conditions: Vec<Condition>,
    pub logical_operator: LogicalOperator,
}

/// An audience definition: groups of conditions combined by a top-level
/// logical operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRule {
    pub id: String,
    pub groups: Vec<ConditionGroup>,
    pub logical_operator: LogicalOperator,
}

impl SegmentRule {
    pub fn matches(&self, customer: &Customer) -> bool {
        evaluate_rule(customer, self)
    }

    pub fn group(&self, group_id: &str) -> Option<&ConditionGroup> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    pub fn condition(&self, group_id: &str, condition_id: &str) -> Option<&Condition> {
        self.group(group_id)?
            .conditions
            .iter()
            .find(|c| c.id == condition_id)
    }
}

impl fmt::Display for ConditionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
        if parts.len() > 1 {
            let separator = format!(" {} ", self.logical_operator);
            write!(f, "({})", parts.join(separator.as_str()))
        } else {
            f.write_str(&parts.concat())
        }
    }
}

impl fmt::Display for SegmentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.groups.iter().map(|g| g.to_string()).collect();
        let separator = format!(" {} ", self.logical_operator);
        f.write_str(&parts.join(separator.as_str()))
    }
}

/// Left fold seeded with the first result. Empty input is `false`.
fn fold_results(results: impl IntoIterator<Item = bool>, operator: LogicalOperator) -> bool {
    let mut results = results.into_iter();
    match results.next() {
        Some(first) => results.fold(first, |acc, next| operator.combine(acc, next)),
        None => false,
    }
}

pub fn evaluate_group(customer: &Customer, group: &ConditionGroup) -> bool {
    fold_results(
        group
            .conditions
            .iter()
            .map(|c| evaluate_condition(customer, c)),
        group.logical_operator,
    )
}

pub fn evaluate_rule(customer: &Customer, rule: &SegmentRule) -> bool {
    fold_results(
        rule.groups.iter().map(|g| evaluate_group(customer, g)),
        rule.logical_operator,
    )
}

/// Customers matching the rule, in input order.
pub fn matching_customers<'a>(rule: &SegmentRule, customers: &'a [Customer]) -> Vec<&'a Customer> {
    let matched: Vec<&Customer> = customers.iter().filter(|c| evaluate_rule(c, rule)).collect();
    debug!(rule_id = %rule.id, matched = matched.len(), total = customers.len(), "Evaluated segment");
    matched
}

pub fn matching_count(rule: &SegmentRule, customers: &[Customer]) -> usize {
    matching_customers(rule, customers).len()
}

/// Summary shown while a rule is being edited.
#[derive(Debug, Clone, Serialize)]
pub struct AudiencePreview {
    pub matched: usize,
    pub total: usize,
    /// Share of the population, rounded to a whole percent.
    pub percentage: u32,
    pub sample: Vec<Customer>,
}

pub fn preview(rule: &SegmentRule, customers: &[Customer], sample_size: usize) -> AudiencePreview {
    let matched = matching_customers(rule, customers);
    let total = customers.len();
    let percentage = if total == 0 {
        0
    } else {
        (matched.len() as f64 / total as f64 * 100.0).round() as u32
    };

    AudiencePreview {
        matched: matched.len(),
        total,
        percentage,
        sample: matched.into_iter().take(sample_size).cloned().collect(),
    }
}
