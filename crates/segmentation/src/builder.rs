//! Rule mutation API. Every edit returns a new rule and leaves the input
//! untouched; edits that reference missing ids, or would empty a group or
//! rule, return an unchanged copy.

use chrono::{NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::catalog::{default_operator, default_value_for_at, Field};
use crate::engine::{ConditionGroup, SegmentRule};
use crate::error::RuleIssue;
use crate::predicates::{Condition, ConditionOperator, ConditionValue, LogicalOperator};

/// Prefixed random id, unique regardless of how fast rules are edited.
pub fn fresh_id(kind: &str) -> String {
    format!("{}_{}", kind, Uuid::new_v4().simple())
}

/// Field, operator and value for a condition that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionDraft {
    pub field: String,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
}

impl ConditionDraft {
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Same as [`ConditionDraft::new`], but rejects combinations the
    /// evaluator could never match.
    pub fn checked(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Result<Self, RuleIssue> {
        let draft = Self::new(field, operator, value);
        draft.clone().into_condition(String::new()).check()?;
        Ok(draft)
    }

    fn into_condition(self, id: String) -> Condition {
        Condition {
            id,
            field: self.field,
            operator: self.operator,
            value: self.value,
        }
    }
}

impl Default for ConditionDraft {
    /// `totalSpend greater_than 1000`
    fn default() -> Self {
        Self::new("totalSpend", ConditionOperator::GreaterThan, 1000.0)
    }
}

/// Partial update of a condition. Unset parts keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionPatch {
    pub field: Option<String>,
    pub operator: Option<ConditionOperator>,
    pub value: Option<ConditionValue>,
}

impl ConditionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn operator(mut self, operator: ConditionOperator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn value(mut self, value: impl Into<ConditionValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    fn apply(self, condition: &Condition) -> Condition {
        Condition {
            id: condition.id.clone(),
            field: self.field.unwrap_or_else(|| condition.field.clone()),
            operator: self.operator.unwrap_or(condition.operator),
            value: self.value.unwrap_or_else(|| condition.value.clone()),
        }
    }
}

impl ConditionGroup {
    /// A new AND group holding one default condition.
    pub fn new() -> Self {
        Self {
            id: fresh_id("group"),
            conditions: vec![ConditionDraft::default().into_condition(fresh_id("condition"))],
            logical_operator: LogicalOperator::And,
        }
    }
}

impl Default for ConditionGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentRule {
    /// One AND group with one `totalSpend greater_than 1000` condition.
    pub fn new() -> Self {
        Self {
            id: fresh_id("rule"),
            groups: vec![ConditionGroup::new()],
            logical_operator: LogicalOperator::And,
        }
    }

    /// Copy of the rule with `edit` applied to the named group, or an
    /// unchanged copy if there is no such group.
    fn edit_group(&self, group_id: &str, edit: impl FnOnce(&ConditionGroup) -> ConditionGroup) -> Self {
        let Some(index) = self.groups.iter().position(|g| g.id == group_id) else {
            debug!(rule_id = %self.id, group_id, "Group not found, rule unchanged");
            return self.clone();
        };

        let mut next = self.clone();
        next.groups[index] = edit(&self.groups[index]);
        next
    }

    pub fn add_condition(&self, group_id: &str, draft: ConditionDraft) -> Self {
        self.edit_group(group_id, |group| {
            let mut group = group.clone();
            group
                .conditions
                .push(draft.into_condition(fresh_id("condition")));
            group
        })
    }

    pub fn add_group(&self) -> Self {
        let mut next = self.clone();
        next.groups.push(ConditionGroup::new());
        next
    }

    pub fn update_condition(&self, group_id: &str, condition_id: &str, patch: ConditionPatch) -> Self {
        self.edit_group(group_id, |group| {
            let mut group = group.clone();
            match group.conditions.iter().position(|c| c.id == condition_id) {
                Some(index) => group.conditions[index] = patch.apply(&group.conditions[index]),
                None => debug!(group_id, condition_id, "Condition not found, rule unchanged"),
            }
            group
        })
    }

    /// Point a condition at another field. The operator resets to the
    /// field's first legal operator and the value to that pair's default.
    /// Fields outside the catalog keep the current operator.
    pub fn change_field(&self, group_id: &str, condition_id: &str, field: &str) -> Self {
        self.change_field_at(group_id, condition_id, field, Utc::now().date_naive())
    }

    pub fn change_field_at(
        &self,
        group_id: &str,
        condition_id: &str,
        field: &str,
        today: NaiveDate,
    ) -> Self {
        let patch = match Field::from_id(field) {
            Some(known) => {
                let operator = default_operator(known);
                ConditionPatch::new()
                    .field(field)
                    .operator(operator)
                    .value(default_value_for_at(field, operator, today))
            }
            None => ConditionPatch::new()
                .field(field)
                .value(ConditionValue::Text(String::new())),
        };
        self.update_condition(group_id, condition_id, patch)
    }

    /// Switch a condition's operator, resetting the value to the default for
    /// its field and the new operator.
    pub fn change_operator(
        &self,
        group_id: &str,
        condition_id: &str,
        operator: ConditionOperator,
    ) -> Self {
        self.change_operator_at(group_id, condition_id, operator, Utc::now().date_naive())
    }

    pub fn change_operator_at(
        &self,
        group_id: &str,
        condition_id: &str,
        operator: ConditionOperator,
        today: NaiveDate,
    ) -> Self {
        let Some(condition) = self.condition(group_id, condition_id) else {
            debug!(group_id, condition_id, "Condition not found, rule unchanged");
            return self.clone();
        };
        let value = default_value_for_at(&condition.field, operator, today);
        self.update_condition(
            group_id,
            condition_id,
            ConditionPatch::new().operator(operator).value(value),
        )
    }

    pub fn update_group_operator(&self, group_id: &str, operator: LogicalOperator) -> Self {
        self.edit_group(group_id, |group| ConditionGroup {
            logical_operator: operator,
            ..group.clone()
        })
    }

    pub fn update_rule_operator(&self, operator: LogicalOperator) -> Self {
        Self {
            logical_operator: operator,
            ..self.clone()
        }
    }

    /// Removes a condition unless it is the last one in its group.
    pub fn remove_condition(&self, group_id: &str, condition_id: &str) -> Self {
        self.edit_group(group_id, |group| {
            let mut group = group.clone();
            if group.conditions.len() <= 1 {
                debug!(group_id, condition_id, "Refusing to remove the last condition");
                return group;
            }
            if let Some(index) = group.conditions.iter().position(|c| c.id == condition_id) {
                group.conditions.remove(index);
            }
            group
        })
    }

    /// Removes a group unless it is the last one in the rule.
    pub fn remove_group(&self, group_id: &str) -> Self {
        if self.groups.len() <= 1 {
            debug!(rule_id = %self.id, group_id, "Refusing to remove the last group");
            return self.clone();
        }

        let mut next = self.clone();
        if let Some(index) = next.groups.iter().position(|g| g.id == group_id) {
            next.groups.remove(index);
        }
        next
    }
}

impl Default for SegmentRule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_condition_rule_from(rule: &SegmentRule) -> SegmentRule {
        rule.add_condition(
            &rule.groups[0].id,
            ConditionDraft::new("tags", ConditionOperator::Contains, "vip"),
        )
    }

    fn two_condition_rule() -> SegmentRule {
        two_condition_rule_from(&SegmentRule::new())
    }

    #[test]
    fn test_new_rule_shape() {
        let rule = SegmentRule::new();
        assert!(rule.id.starts_with("rule_"));
        assert_eq!(rule.logical_operator, LogicalOperator::And);
        assert_eq!(rule.groups.len(), 1);

        let group = &rule.groups[0];
        assert_eq!(group.logical_operator, LogicalOperator::And);
        assert_eq!(group.conditions.len(), 1);
        let cond = &group.conditions[0];
        assert_eq!(cond.field, "totalSpend");
        assert_eq!(cond.operator, ConditionOperator::GreaterThan);
        assert_eq!(cond.value, ConditionValue::Number(1000.0));
    }

    #[test]
    fn test_add_condition_appends_with_fresh_id() {
        let rule = SegmentRule::new();
        let before = rule.clone();
        let next = two_condition_rule_from(&rule);

        assert_eq!(rule, before);
        let conditions = &next.groups[0].conditions;
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[1].field, "tags");
        assert_ne!(conditions[0].id, conditions[1].id);
    }

    #[test]
    fn test_add_condition_defaults() {
        let rule = SegmentRule::new();
        let next = rule.add_condition(&rule.groups[0].id, ConditionDraft::default());
        let added = &next.groups[0].conditions[1];
        assert_eq!(added.field, "totalSpend");
        assert_eq!(added.operator, ConditionOperator::GreaterThan);
        assert_eq!(added.value, ConditionValue::Number(1000.0));
    }

    #[test]
    fn test_add_condition_unknown_group_is_noop() {
        let rule = SegmentRule::new();
        assert_eq!(rule.add_condition("missing", ConditionDraft::default()), rule);
    }

    #[test]
    fn test_add_group() {
        let rule = SegmentRule::new();
        let next = rule.add_group();
        assert_eq!(rule.groups.len(), 1);
        assert_eq!(next.groups.len(), 2);
        assert_eq!(next.groups[0], rule.groups[0]);
        assert_ne!(next.groups[1].id, rule.groups[0].id);
        assert_eq!(next.groups[1].conditions.len(), 1);
    }

    #[test]
    fn test_update_condition_partial() {
        let rule = SegmentRule::new();
        let (g, c) = (rule.groups[0].id.clone(), rule.groups[0].conditions[0].id.clone());

        let next = rule.update_condition(&g, &c, ConditionPatch::new().value(2500.0));
        let cond = &next.groups[0].conditions[0];
        assert_eq!(cond.value, ConditionValue::Number(2500.0));
        assert_eq!(cond.field, "totalSpend");
        assert_eq!(cond.operator, ConditionOperator::GreaterThan);
        assert_eq!(cond.id, c);
        assert_eq!(rule.groups[0].conditions[0].value, ConditionValue::Number(1000.0));

        let next = rule.update_condition(
            &g,
            &c,
            ConditionPatch::new()
                .field("visits")
                .operator(ConditionOperator::LessThan)
                .value(3.0),
        );
        let cond = &next.groups[0].conditions[0];
        assert_eq!(cond.field, "visits");
        assert_eq!(cond.operator, ConditionOperator::LessThan);
    }

    #[test]
    fn test_update_condition_empty_patch_is_identity() {
        let rule = two_condition_rule();
        let g = rule.groups[0].id.clone();
        for c in rule.groups[0].conditions.iter().map(|c| c.id.clone()) {
            assert_eq!(rule.update_condition(&g, &c, ConditionPatch::new()), rule);
        }
    }

    #[test]
    fn test_update_condition_missing_ids_are_noops() {
        let rule = SegmentRule::new();
        let g = rule.groups[0].id.clone();
        let c = rule.groups[0].conditions[0].id.clone();
        let patch = ConditionPatch::new().value(1.0);
        assert_eq!(rule.update_condition("missing", &c, patch.clone()), rule);
        assert_eq!(rule.update_condition(&g, "missing", patch), rule);
    }

    #[test]
    fn test_operator_updates() {
        let rule = SegmentRule::new().add_group();
        let g = rule.groups[1].id.clone();

        let next = rule.update_group_operator(&g, LogicalOperator::Or);
        assert_eq!(next.groups[1].logical_operator, LogicalOperator::Or);
        assert_eq!(next.groups[0].logical_operator, LogicalOperator::And);
        assert_eq!(rule.groups[1].logical_operator, LogicalOperator::And);
        assert_eq!(rule.update_group_operator("missing", LogicalOperator::Or), rule);

        let next = rule.update_rule_operator(LogicalOperator::Or);
        assert_eq!(next.logical_operator, LogicalOperator::Or);
        assert_eq!(next.groups, rule.groups);
        assert_eq!(rule.logical_operator, LogicalOperator::And);
    }

    #[test]
    fn test_remove_last_condition_refused() {
        let rule = SegmentRule::new();
        let g = rule.groups[0].id.clone();
        let c = rule.groups[0].conditions[0].id.clone();
        assert_eq!(rule.remove_condition(&g, &c), rule);
    }

    #[test]
    fn test_remove_condition() {
        let rule = two_condition_rule();
        let g = rule.groups[0].id.clone();
        let first = rule.groups[0].conditions[0].id.clone();

        let next = rule.remove_condition(&g, &first);
        assert_eq!(next.groups[0].conditions.len(), 1);
        assert_eq!(next.groups[0].conditions[0].field, "tags");
        assert_eq!(rule.groups[0].conditions.len(), 2);

        assert_eq!(rule.remove_condition(&g, "missing"), rule);
        assert_eq!(rule.remove_condition("missing", &first), rule);
    }

    #[test]
    fn test_remove_group() {
        let single = SegmentRule::new();
        assert_eq!(single.remove_group(&single.groups[0].id), single);

        let rule = single.add_group();
        let next = rule.remove_group(&rule.groups[0].id);
        assert_eq!(next.groups.len(), 1);
        assert_eq!(next.groups[0], rule.groups[1]);
        assert_eq!(rule.groups.len(), 2);
        assert_eq!(rule.remove_group("missing"), rule);
    }

    #[test]
    fn test_add_then_remove_round_trip() {
        let rule = SegmentRule::new();
        let g = rule.groups[0].id.clone();
        let added = rule.add_condition(&g, ConditionDraft::new("visits", ConditionOperator::Equals, 4.0));
        let new_id = added.groups[0].conditions[1].id.clone();
        assert_eq!(added.remove_condition(&g, &new_id), rule);
    }

    fn rule_from_json(groups: serde_json::Value) -> SegmentRule {
        serde_json::from_value(serde_json::json!({
            "id": "r",
            "logicalOperator": "AND",
            "groups": groups,
        }))
        .unwrap()
    }

    fn spend_condition(id: &str) -> serde_json::Value {
        serde_json::json!({"id": id, "field": "totalSpend", "operator": "greater_than", "value": 1000})
    }

    #[test]
    fn test_remove_condition_with_repeated_id_keeps_one() {
        let rule = rule_from_json(serde_json::json!([
            {"id": "g", "logicalOperator": "AND", "conditions": [spend_condition("c"), spend_condition("c")]}
        ]));
        let next = rule.remove_condition("g", "c");
        assert_eq!(next.groups[0].conditions.len(), 1);
        assert_eq!(next.remove_condition("g", "c"), next);
    }

    #[test]
    fn test_remove_group_with_repeated_id_keeps_one() {
        let rule = rule_from_json(serde_json::json!([
            {"id": "g", "logicalOperator": "AND", "conditions": [spend_condition("c1")]},
            {"id": "g", "logicalOperator": "OR", "conditions": [spend_condition("c2")]}
        ]));
        let next = rule.remove_group("g");
        assert_eq!(next.groups.len(), 1);
        assert_eq!(next.groups[0].logical_operator, LogicalOperator::Or);
        assert_eq!(next.remove_group("g"), next);
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_change_field_resets_operator_and_value() {
        let rule = SegmentRule::new();
        let (g, c) = (rule.groups[0].id.clone(), rule.groups[0].conditions[0].id.clone());

        let dated = rule.change_field_at(&g, &c, "joinDate", today());
        let cond = &dated.groups[0].conditions[0];
        assert_eq!(cond.field, "joinDate");
        assert_eq!(cond.operator, ConditionOperator::Before);
        assert_eq!(cond.value, ConditionValue::Text("2024-06-15".into()));

        let tagged = dated.change_field_at(&g, &c, "tags", today());
        let cond = &tagged.groups[0].conditions[0];
        assert_eq!(cond.operator, ConditionOperator::Contains);
        assert_eq!(cond.value, ConditionValue::Text(String::new()));

        let counted = tagged.change_field_at(&g, &c, "visits", today());
        let cond = &counted.groups[0].conditions[0];
        assert_eq!(cond.operator, ConditionOperator::Equals);
        assert_eq!(cond.value, ConditionValue::Number(1000.0));

        assert_eq!(rule.groups[0].conditions[0].field, "totalSpend");
    }

    #[test]
    fn test_change_field_outside_catalog_keeps_operator() {
        let rule = SegmentRule::new();
        let (g, c) = (rule.groups[0].id.clone(), rule.groups[0].conditions[0].id.clone());
        let next = rule.change_field_at(&g, &c, "loyaltyTier", today());
        let cond = &next.groups[0].conditions[0];
        assert_eq!(cond.field, "loyaltyTier");
        assert_eq!(cond.operator, ConditionOperator::GreaterThan);
        assert_eq!(cond.value, ConditionValue::Text(String::new()));
    }

    #[test]
    fn test_change_operator_to_between_gives_today_range() {
        let rule = SegmentRule::new();
        let (g, c) = (rule.groups[0].id.clone(), rule.groups[0].conditions[0].id.clone());
        let rule = rule.change_field_at(&g, &c, "lastPurchaseDate", today());

        let next = rule.change_operator_at(&g, &c, ConditionOperator::Between, today());
        let cond = &next.groups[0].conditions[0];
        assert_eq!(cond.operator, ConditionOperator::Between);
        assert_eq!(cond.value, ConditionValue::range("2024-06-15", "2024-06-15"));
        assert!(next.is_valid());

        let back = next.change_operator_at(&g, &c, ConditionOperator::After, today());
        assert_eq!(
            back.groups[0].conditions[0].value,
            ConditionValue::Text("2024-06-15".into())
        );
    }

    #[test]
    fn test_change_operator_missing_ids_are_noops() {
        let rule = SegmentRule::new();
        let g = rule.groups[0].id.clone();
        assert_eq!(rule.change_operator(&g, "missing", ConditionOperator::Equals), rule);
        assert_eq!(rule.change_field("missing", "missing", "visits"), rule);
    }

    #[test]
    fn test_fresh_ids_are_unique() {
        let mut rule = SegmentRule::new();
        for _ in 0..50 {
            let g = rule.groups[0].id.clone();
            rule = rule.add_condition(&g, ConditionDraft::default()).add_group();
        }
        let mut ids: Vec<&str> = rule
            .groups
            .iter()
            .flat_map(|g| std::iter::once(g.id.as_str()).chain(g.conditions.iter().map(|c| c.id.as_str())))
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_checked_draft() {
        assert!(ConditionDraft::checked("visits", ConditionOperator::LessThan, 3.0).is_ok());
        assert!(matches!(
            ConditionDraft::checked("visits", ConditionOperator::Before, 3.0),
            Err(RuleIssue::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            ConditionDraft::checked("age", ConditionOperator::Equals, 30.0),
            Err(RuleIssue::UnknownField { .. })
        ));
        assert!(matches!(
            ConditionDraft::checked("visits", ConditionOperator::Equals, "3"),
            Err(RuleIssue::MalformedValue { .. })
        ));
    }
}
