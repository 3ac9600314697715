//! Dialogue lines authored as numbered map properties

use serde::{Deserialize, Serialize};
use towerkeep_core::Properties;

/// What an NPC does, as far as its default dialogue is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpcRole {
    Barman,
    Merchant,
    Other,
}

impl NpcRole {
    /// Built-in lines used when a map provides none
    pub fn default_lines(self) -> Vec<String> {
        let lines: &[&str] = match self {
            NpcRole::Barman => &[
                "Welcome to the tavern, traveller!",
                "The towers outside keep the monsters at bay. Mostly.",
                "Rest a while before you head back out.",
            ],
            NpcRole::Merchant => &[
                "Greetings! Care to see my wares?",
                "Only the finest goods, gathered from every corner of the realm.",
                "Come back when you have more gold.",
            ],
            NpcRole::Other => &[
                "Hello there.",
                "Be careful out there. The boss of this land is stronger than it looks.",
            ],
        };
        lines.iter().map(|line| line.to_string()).collect()
    }
}

/// Collect `<prefix>1`, `<prefix>2`, ... until the first missing index.
///
/// Non-string values are rendered as text.
pub fn collect_numbered_lines(properties: &Properties, prefix: &str) -> Vec<String> {
    (1..)
        .map(|index| properties.get(&format!("{prefix}{index}")))
        .take_while(Option::is_some)
        .flatten()
        .map(|value| match value.as_string() {
            Some(text) => text.to_string(),
            None => value.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use towerkeep_core::Value;

    fn props(entries: &[(&str, Value)]) -> Properties {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_collect_stops_at_first_gap() {
        let properties = props(&[
            ("dialogue1", "Hi".into()),
            ("dialogue2", "Bye".into()),
            ("dialogue4", "Skipped".into()),
        ]);
        assert_eq!(
            collect_numbered_lines(&properties, "dialogue"),
            vec!["Hi", "Bye"]
        );
    }

    #[test]
    fn test_collect_without_first_index() {
        let properties = props(&[("dialogue2", "Orphan".into())]);
        assert!(collect_numbered_lines(&properties, "dialogue").is_empty());
    }

    #[test]
    fn test_collect_renders_non_strings() {
        let properties = props(&[("dialogue1", Value::Int(42))]);
        assert_eq!(collect_numbered_lines(&properties, "dialogue"), vec!["42"]);
    }

    #[test]
    fn test_roles_have_default_lines() {
        for role in [NpcRole::Barman, NpcRole::Merchant, NpcRole::Other] {
            assert!(!role.default_lines().is_empty());
        }
    }
}
