//! Saved segments. Campaigns pick rule snapshots from here.

use anyhow::{anyhow, Result};
use audience_core::Customer;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::{matching_count, SegmentRule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSegment {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub rule: SegmentRule,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl SavedSegment {
    pub fn new(name: impl Into<String>, rule: SegmentRule) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            rule,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentAudience {
    pub segment_id: Uuid,
    pub name: String,
    pub matched: usize,
}

#[derive(Debug, Default)]
pub struct SegmentRegistry {
    segments: DashMap<Uuid, SavedSegment>,
}

impl SegmentRegistry {
    pub fn new() -> Self {
        Self {
            segments: DashMap::new(),
        }
    }

    pub fn register(&self, segment: SavedSegment) -> Uuid {
        let id = segment.id;
        info!(segment_id = %id, name = %segment.name, "Registering segment");
        self.segments.insert(id, segment);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<SavedSegment> {
        self.segments.get(id).map(|s| s.clone())
    }

    /// All segments, ordered by name.
    pub fn list(&self) -> Vec<SavedSegment> {
        let mut segments: Vec<SavedSegment> = self.segments.iter().map(|s| s.value().clone()).collect();
        segments.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        segments
    }

    /// Swap in an edited rule. Returns the previous rule.
    pub fn replace_rule(&self, id: &Uuid, rule: SegmentRule) -> Result<SegmentRule> {
        let mut entry = self
            .segments
            .get_mut(id)
            .ok_or_else(|| anyhow!("Segment {} not found", id))?;
        info!(segment_id = %id, rule_id = %rule.id, "Replacing segment rule");
        entry.updated_at = Utc::now();
        Ok(std::mem::replace(&mut entry.rule, rule))
    }

    pub fn remove(&self, id: &Uuid) -> Result<SavedSegment> {
        let (_, segment) = self
            .segments
            .remove(id)
            .ok_or_else(|| anyhow!("Segment {} not found", id))?;
        info!(segment_id = %id, "Removed segment");
        Ok(segment)
    }

    /// Audience size of every saved segment against one customer collection.
    pub fn audience_sizes(&self, customers: &[Customer]) -> Vec<SegmentAudience> {
        self.list()
            .into_iter()
            .map(|s| SegmentAudience {
                segment_id: s.id,
                matched: matching_count(&s.rule, customers),
                name: s.name,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ConditionPatch;

    fn customer(id: &str, total_spend: f64) -> Customer {
        Customer {
            id: id.to_string(),
            first_name: "Lisa".to_string(),
            last_name: "Brown".to_string(),
            email: "lisa.brown@example.com".to_string(),
            phone_number: "+912222222222".to_string(),
            total_spend,
            visits: 5,
            last_purchase_date: "2024-04-01".to_string(),
            join_date: "2023-04-01".to_string(),
            tags: vec![],
        }
    }

    fn spend_rule(amount: f64) -> SegmentRule {
        let rule = SegmentRule::new();
        let (g, c) = (rule.groups[0].id.clone(), rule.groups[0].conditions[0].id.clone());
        rule.update_condition(&g, &c, ConditionPatch::new().value(amount))
    }

    #[test]
    fn test_register_get_list() {
        let registry = SegmentRegistry::new();
        assert!(registry.is_empty());
        let b = registry.register(SavedSegment::new("Big spenders", spend_rule(5000.0)).with_tag("vip"));
        let a = registry.register(
            SavedSegment::new("All buyers", spend_rule(0.0)).with_description("Anyone who bought"),
        );

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&b).unwrap().tags, vec!["vip".to_string()]);
        let names: Vec<String> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["All buyers", "Big spenders"]);
        assert_eq!(
            registry.get(&a).unwrap().description.as_deref(),
            Some("Anyone who bought")
        );
        assert!(registry.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_replace_rule_and_remove() {
        let registry = SegmentRegistry::new();
        let original = spend_rule(5000.0);
        let id = registry.register(SavedSegment::new("Big spenders", original.clone()));
        let created = registry.get(&id).unwrap().updated_at;

        let previous = registry.replace_rule(&id, spend_rule(9000.0)).unwrap();
        assert_eq!(previous, original);
        let saved = registry.get(&id).unwrap();
        assert_ne!(saved.rule, original);
        assert!(saved.updated_at >= created);

        assert!(registry.replace_rule(&Uuid::new_v4(), original).is_err());
        assert_eq!(registry.remove(&id).unwrap().name, "Big spenders");
        assert!(registry.remove(&id).is_err());
    }

    #[test]
    fn test_audience_sizes() {
        let registry = SegmentRegistry::new();
        registry.register(SavedSegment::new("Over 5000", spend_rule(5000.0)));
        registry.register(SavedSegment::new("Everyone", spend_rule(0.0)));
        let customers = vec![customer("c1", 6000.0), customer("c2", 4000.0)];

        let sizes = registry.audience_sizes(&customers);
        assert_eq!(sizes.len(), 2);
        assert_eq!((sizes[0].name.as_str(), sizes[0].matched), ("Everyone", 2));
        assert_eq!((sizes[1].name.as_str(), sizes[1].matched), ("Over 5000", 1));
    }

    #[test]
    fn test_saved_segment_defaults_on_load() {
        let json = serde_json::json!({
            "name": "Loaded",
            "rule": spend_rule(100.0),
        });
        let segment: SavedSegment = serde_json::from_value(json).unwrap();
        assert_eq!(segment.name, "Loaded");
        assert!(segment.tags.is_empty());
        assert!(segment.description.is_none());
    }
}
