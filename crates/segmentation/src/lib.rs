//! Audience segmentation: field and operator catalogs, segment rule trees,
//! their evaluation against customers, immutable rule editing, and a
//! phrase-to-rule helper.

pub mod builder;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod parser;
pub mod predicates;
pub mod registry;
pub mod validate;

pub use builder::{ConditionDraft, ConditionPatch};
pub use catalog::{list_fields, operators_for, operators_for_type, Field, FieldType};
pub use engine::{
    evaluate_group, evaluate_rule, matching_count, matching_customers, preview, AudiencePreview,
    ConditionGroup, SegmentRule,
};
pub use error::RuleIssue;
pub use parser::{parse_natural_language, NaturalLanguageParser};
pub use predicates::{
    evaluate_condition, Condition, ConditionOperator, ConditionValue, LogicalOperator,
};
pub use registry::{SavedSegment, SegmentRegistry};
