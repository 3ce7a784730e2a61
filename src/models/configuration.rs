use super::section::Section;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version stamped on a freshly bootstrapped configuration.
pub const DEFAULT_CONFIG_VERSION: &str = "1.0.0";

/// Number of entries kept in [`Configuration::recent_activity`].
pub const MAX_RECENT_ACTIVITY: usize = 10;

/// The live CLAUDE.md configuration: ordered sections plus versioning metadata.
///
/// Section order is the rendering order of the generated document.
/// `character_count` is a cache; it is recomputed by every section mutation
/// and must not be trusted over [`total_characters`](Self::total_characters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub version: String,

    #[serde(default)]
    pub created: DateTime<Utc>,

    #[serde(default)]
    pub last_modified: DateTime<Utc>,

    pub sections: Vec<Section>,

    #[serde(default)]
    pub character_count: usize,

    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<RelatedCounts>,

    #[serde(default)]
    pub recent_activity: Vec<Activity>,

    /// Counter behind generated section ids. Only ever increases.
    #[serde(default)]
    pub section_seq: u64,
}

/// Counts of catalogue entities shown in the document footer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedCounts {
    pub skills: usize,
    pub agents: usize,
    pub templates: usize,
}

/// One entry of the recent activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub description: String,
}

/// Summary figures for dashboards and the CLI `show` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStats {
    pub sections: usize,
    pub enabled: usize,
    pub total_chars: usize,
    pub enabled_chars: usize,
    pub last_update: Option<DateTime<Utc>>,
    pub last_modified: DateTime<Utc>,
}

impl Configuration {
    /// An empty configuration created at `now`.
    pub fn new(version: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            version: version.into(),
            created: now,
            last_modified: now,
            sections: Vec::new(),
            character_count: 0,
            last_update: None,
            related: None,
            recent_activity: Vec::new(),
            section_seq: 0,
        }
    }

    pub fn find_section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == id)
    }

    pub fn enabled_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.enabled)
    }

    /// Sum of every section's characters, disabled ones included.
    pub fn total_characters(&self) -> usize {
        self.sections.iter().map(Section::character_count).sum()
    }

    pub fn recompute_character_count(&mut self) {
        self.character_count = self.total_characters();
    }

    /// Prepend an activity entry, keeping the newest [`MAX_RECENT_ACTIVITY`].
    pub fn record_activity(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.recent_activity.insert(
            0,
            Activity {
                timestamp: now,
                title: title.into(),
                description: description.into(),
            },
        );
        self.recent_activity.truncate(MAX_RECENT_ACTIVITY);
    }

    pub fn stats(&self) -> ConfigStats {
        ConfigStats {
            sections: self.sections.len(),
            enabled: self.enabled_sections().count(),
            total_chars: self.total_characters(),
            enabled_chars: self.enabled_sections().map(Section::character_count).sum(),
            last_update: self.last_update,
            last_modified: self.last_modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::section::NewSection;

    fn config_with(sections: &[(&str, &str, bool)]) -> Configuration {
        let mut config = Configuration::new(DEFAULT_CONFIG_VERSION, DateTime::<Utc>::default());
        for (id, content, enabled) in sections {
            config.sections.push(
                NewSection::titled(*id)
                    .with_content(*content)
                    .with_enabled(*enabled)
                    .into_section(id.to_string()),
            );
        }
        config
    }

    #[test]
    fn test_total_characters_counts_disabled() {
        let mut config = config_with(&[("a", "Hello", true), ("b", "World!", false)]);
        assert_eq!(config.total_characters(), 11);

        config.recompute_character_count();
        assert_eq!(config.character_count, 11);
    }

    #[test]
    fn test_stats() {
        let config = config_with(&[("a", "Hello", true), ("b", "World!", false)]);
        let stats = config.stats();
        assert_eq!(stats.sections, 2);
        assert_eq!(stats.enabled, 1);
        assert_eq!(stats.total_chars, 11);
        assert_eq!(stats.enabled_chars, 5);
        assert_eq!(stats.last_update, None);
    }

    #[test]
    fn test_recent_activity_is_capped() {
        let mut config = config_with(&[]);
        for i in 0..15 {
            config.record_activity(format!("Event {i}"), "", DateTime::<Utc>::default());
        }
        assert_eq!(config.recent_activity.len(), MAX_RECENT_ACTIVITY);
        assert_eq!(config.recent_activity[0].title, "Event 14");
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let config = config_with(&[("a", "x", true)]);
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("lastModified").is_some());
        assert!(json.get("characterCount").is_some());
        assert!(json.get("sections").unwrap().is_array());
        assert!(json.get("related").is_none());
    }
}
