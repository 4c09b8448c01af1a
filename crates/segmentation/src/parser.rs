//! Phrase-to-rule heuristics for the "describe your audience" box.
//!
//! Recognises three phrasings and otherwise returns the default rule. It never
//! fails: text it does not understand yields the default rule.

use chrono::{Days, NaiveDate, Utc};
use regex::Regex;
use tracing::debug;

use crate::builder::ConditionPatch;
use crate::engine::SegmentRule;
use crate::predicates::ConditionOperator;

/// Look-back used when an inactivity phrase carries no usable day count.
pub const DEFAULT_INACTIVE_DAYS: u64 = 90;

pub struct NaturalLanguageParser {
    spend: Regex,
    inactive: Regex,
    visits: Regex,
}

impl NaturalLanguageParser {
    pub fn new() -> Self {
        Self {
            spend: Regex::new(r"(?i)spent (?:over|more than) (?:₹|Rs\.|INR|\$)?(\d+)")
                .expect("spend pattern is valid"),
            inactive: Regex::new(r"(?i)(?:inactive|haven't purchased)(?:[ a-z]+)(\d+)(?:[ a-z]+)")
                .expect("inactivity pattern is valid"),
            visits: Regex::new(r"(?i)(?:visited |visits |fewer than |less than )(\d+)")
                .expect("visits pattern is valid"),
        }
    }

    pub fn parse(&self, text: &str) -> SegmentRule {
        self.parse_at(text, Utc::now().date_naive())
    }

    /// Parse relative to a fixed `today`, which inactivity phrases count back from.
    pub fn parse_at(&self, text: &str, today: NaiveDate) -> SegmentRule {
        let rule = SegmentRule::new();

        if text.contains("spent over") || text.contains("spent more than") {
            if let Some(amount) = self.capture_number(&self.spend, text) {
                debug!(amount, "Matched spend phrase");
                return with_sole_condition(
                    rule,
                    ConditionPatch::new()
                        .field("totalSpend")
                        .operator(ConditionOperator::GreaterThan)
                        .value(amount),
                );
            }
        }

        if text.contains("inactive") || text.contains("haven't purchased") {
            let days = self
                .inactive
                .captures(text)
                .and_then(|caps| caps[1].parse::<u64>().ok())
                .unwrap_or(DEFAULT_INACTIVE_DAYS);
            let cutoff = today
                .checked_sub_days(Days::new(days))
                .unwrap_or(NaiveDate::MIN);
            debug!(days, cutoff = %cutoff, "Matched inactivity phrase");
            return with_sole_condition(
                rule,
                ConditionPatch::new()
                    .field("lastPurchaseDate")
                    .operator(ConditionOperator::Before)
                    .value(cutoff.format("%Y-%m-%d").to_string()),
            );
        }

        if text.contains("visited less than")
            || text.contains("fewer than")
            || text.contains("less than")
        {
            if let Some(visits) = self.capture_number(&self.visits, text) {
                debug!(visits, "Matched visit-count phrase");
                return with_sole_condition(
                    rule,
                    ConditionPatch::new()
                        .field("visits")
                        .operator(ConditionOperator::LessThan)
                        .value(visits),
                );
            }
        }

        debug!("No phrase matched, using default rule");
        rule
    }

    fn capture_number(&self, pattern: &Regex, text: &str) -> Option<f64> {
        pattern.captures(text)?[1].parse::<f64>().ok()
    }
}

impl Default for NaturalLanguageParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse with a throwaway parser. Prefer keeping a [`NaturalLanguageParser`]
/// around when parsing repeatedly.
pub fn parse_natural_language(text: &str) -> SegmentRule {
    NaturalLanguageParser::new().parse(text)
}

fn with_sole_condition(rule: SegmentRule, patch: ConditionPatch) -> SegmentRule {
    let target = rule
        .groups
        .first()
        .and_then(|g| g.conditions.first().map(|c| (g.id.clone(), c.id.clone())));

    match target {
        Some((group_id, condition_id)) => rule.update_condition(&group_id, &condition_id, patch),
        None => rule,
    }
}
