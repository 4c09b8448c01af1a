use thiserror::Error;

/// A problem found while validating a rule. Evaluation never reports these;
/// they exist so editors can warn about conditions that can never match.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleIssue {
    #[error("rule has no groups")]
    EmptyRule,

    #[error("group {group_id} has no conditions")]
    EmptyGroup { group_id: String },

    #[error("id {id} is used more than once")]
    DuplicateId { id: String },

    #[error("condition {condition_id}: unknown field {field}")]
    UnknownField { condition_id: String, field: String },

    #[error("condition {condition_id}: operator {operator} does not apply to {field}")]
    UnsupportedOperator {
        condition_id: String,
        field: String,
        operator: String,
    },

    #[error("condition {condition_id}: {reason}")]
    MalformedValue { condition_id: String, reason: String },
}
