//! Section Store: ordered CRUD over the sections of a [`Configuration`].
//!
//! These are plain functions over an in-memory value. They never touch the
//! backing store and never swallow errors; [`ConfigState`](crate::state::ConfigState)
//! wraps them with locking and change events, and the repository persists
//! the result.
//!
//! Every mutation recomputes the cached character count and stamps
//! `last_update`.

use crate::error::{ControlError, Result};
use crate::models::{Configuration, NewSection, Section, SectionPatch};
use chrono::{DateTime, Utc};

impl Configuration {
    /// Append a new section and return it.
    ///
    /// A requested id is kept when no current section uses it; otherwise a
    /// fresh `section-<millis>-<seq>` id is minted. Never fails.
    pub fn add_section(&mut self, initial: NewSection, now: DateTime<Utc>) -> Section {
        let requested = initial
            .id
            .clone()
            .filter(|id| !id.trim().is_empty() && self.find_section(id).is_none());

        let id = match requested {
            Some(id) => id,
            None => self.mint_section_id(now),
        };

        let section = initial.into_section(id);
        self.sections.push(section.clone());
        self.touch_sections(now);
        tracing::debug!("Added section {} at position {}", section.id, self.sections.len() - 1);
        section
    }

    /// Apply `patch` to the section with `id`, keeping its position.
    pub fn update_section(
        &mut self,
        id: &str,
        patch: SectionPatch,
        now: DateTime<Utc>,
    ) -> Result<Section> {
        let index = self
            .position_of(id)
            .ok_or_else(|| ControlError::section_not_found(id))?;

        patch.apply(&mut self.sections[index]);
        let updated = self.sections[index].clone();
        self.touch_sections(now);
        Ok(updated)
    }

    /// Remove the section with `id`. Absent ids are a no-op.
    ///
    /// Returns whether a section was removed.
    pub fn delete_section(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.id != id);
        let removed = self.sections.len() != before;
        if removed {
            self.touch_sections(now);
        }
        removed
    }

    /// Move a section to `new_index` (clamped to the end of the list).
    pub fn move_section(&mut self, id: &str, new_index: usize, now: DateTime<Utc>) -> Result<usize> {
        let index = self
            .position_of(id)
            .ok_or_else(|| ControlError::section_not_found(id))?;

        let section = self.sections.remove(index);
        let target = new_index.min(self.sections.len());
        self.sections.insert(target, section);
        self.touch_sections(now);
        Ok(target)
    }

    /// Sections in stored order, which is also the rendering order.
    pub fn list_sections(&self) -> &[Section] {
        &self.sections
    }

    fn mint_section_id(&mut self, now: DateTime<Utc>) -> String {
        loop {
            self.section_seq += 1;
            let id = format!("section-{}-{}", now.timestamp_millis(), self.section_seq);
            if self.find_section(&id).is_none() {
                return id;
            }
        }
    }

    fn touch_sections(&mut self, now: DateTime<Utc>) {
        self.recompute_character_count();
        self.last_update = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContextSet, ContextTag, DEFAULT_CONFIG_VERSION};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn empty() -> Configuration {
        Configuration::new(DEFAULT_CONFIG_VERSION, now())
    }

    #[test]
    fn test_add_section_defaults_and_order() {
        let mut config = empty();
        let a = config.add_section(NewSection::titled("A"), now());
        let b = config.add_section(NewSection::default(), now());

        assert_ne!(a.id, b.id);
        assert!(b.enabled);
        assert_eq!(b.priority, 2);
        assert_eq!(b.context, ContextSet::all());
        assert_eq!(b.title, "New Section");

        let ids: Vec<&str> = config.list_sections().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
    }

    #[test]
    fn test_requested_id_is_used_once() {
        let mut config = empty();
        let first = config.add_section(NewSection::titled("Core").with_id("core"), now());
        let second = config.add_section(NewSection::titled("Again").with_id("core"), now());

        assert_eq!(first.id, "core");
        assert_ne!(second.id, "core");
        assert_eq!(config.sections.len(), 2);
    }

    #[test]
    fn test_generated_ids_are_not_reused_after_delete() {
        let mut config = empty();
        let a = config.add_section(NewSection::default(), now());
        assert!(config.delete_section(&a.id, now()));
        let b = config.add_section(NewSection::default(), now());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_update_preserves_position() {
        let mut config = empty();
        let a = config.add_section(NewSection::titled("A"), now());
        let b = config.add_section(NewSection::titled("B"), now());

        let patch = SectionPatch {
            title: Some("A2".to_string()),
            content: Some("body".to_string()),
            priority: Some(1),
            enabled: Some(false),
            context: Some(ContextSet::from_tags([ContextTag::Code])),
            subsections: None,
        };
        let updated = config.update_section(&a.id, patch, now()).unwrap();

        assert_eq!(updated.title, "A2");
        assert!(!updated.enabled);
        assert_eq!(config.sections[0].id, a.id);
        assert_eq!(config.sections[1].id, b.id);
        assert_eq!(config.character_count, 4);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let mut config = empty();
        let err = config
            .update_section("missing", SectionPatch::title("x"), now())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut config = empty();
        config.add_section(NewSection::titled("A").with_id("a"), now());
        let before = config.sections.clone();

        assert!(!config.delete_section("missing", now()));
        assert_eq!(config.sections, before);

        assert!(config.delete_section("a", now()));
        assert!(!config.delete_section("a", now()));
        assert!(config.sections.is_empty());
    }

    #[test]
    fn test_move_section() {
        let mut config = empty();
        for id in ["a", "b", "c"] {
            config.add_section(NewSection::titled(id).with_id(id), now());
        }

        assert_eq!(config.move_section("c", 0, now()).unwrap(), 0);
        assert_eq!(config.move_section("a", 99, now()).unwrap(), 2);

        let ids: Vec<&str> = config.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert!(config.move_section("zzz", 0, now()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_mutations_refresh_character_count() {
        let mut config = empty();
        let a = config.add_section(NewSection::titled("A").with_content("Hello"), now());
        assert_eq!(config.character_count, 5);

        config.update_section(&a.id, SectionPatch::content("Hi"), now()).unwrap();
        assert_eq!(config.character_count, 2);

        config.delete_section(&a.id, now());
        assert_eq!(config.character_count, 0);
        assert_eq!(config.last_update, Some(now()));
    }
}
