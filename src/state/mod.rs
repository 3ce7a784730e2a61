// Live configuration state
//
// ConfigState wraps the live Configuration in Arc<RwLock<T>> so the CLI,
// the auto-save tasks and the archive can share it, and broadcasts a
// ConfigChange for every mutation.

use crate::clock::{Clock, SystemClock};
use crate::error::{PersistenceError, Result};
use crate::models::{Configuration, NewSection, Section, SectionPatch};
use crate::persistence::{ConfigRepository, default_configuration};
use crate::templates::SectionTemplate;
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Change events emitted when the live configuration is modified.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigChange {
    SectionAdded {
        id: String,
        position: usize,
    },

    SectionUpdated {
        id: String,
    },

    SectionDeleted {
        id: String,
    },

    SectionMoved {
        id: String,
        from: usize,
        to: usize,
    },

    /// The whole configuration was swapped (restore, import, reload)
    ConfigurationReplaced {
        version: String,
        sections: usize,
    },

    /// The configuration was written to the backing store
    Saved {
        at: DateTime<Utc>,
    },
}

/// Thread-safe handle to the live [`Configuration`].
///
/// Section operations delegate to the pure [`Configuration`] methods under
/// the write lock, stamp them with the injected clock and emit the matching
/// [`ConfigChange`]. Cloning shares the same configuration and channel.
pub struct ConfigState {
    config: Arc<RwLock<Configuration>>,

    /// Multiple subscribers can listen for changes
    change_tx: broadcast::Sender<ConfigChange>,

    clock: Arc<dyn Clock>,
}

impl ConfigState {
    /// Wrap `config` with a broadcast buffer of 100 events.
    pub fn new(config: Configuration, clock: Arc<dyn Clock>) -> Self {
        let (change_tx, _) = broadcast::channel(100);
        Self {
            config: Arc::new(RwLock::new(config)),
            change_tx,
            clock,
        }
    }

    /// Deep copy of the current configuration.
    pub fn snapshot(&self) -> Configuration {
        self.read_guard().clone()
    }

    /// Run `f` with read access to the configuration.
    ///
    /// # Example
    /// ```ignore
    /// let enabled = state.read(|config| config.enabled_sections().count());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Configuration) -> R,
    {
        f(&self.read_guard())
    }

    /// Apply an arbitrary mutation and emit the changes it caused.
    ///
    /// Section additions, removals, edits and reorderings are detected by
    /// comparing the section list before and after `update_fn`.
    pub fn update<F>(&self, update_fn: F) -> Vec<ConfigChange>
    where
        F: FnOnce(&mut Configuration),
    {
        let changes = {
            let mut config = self.write_guard();
            let old = config.sections.clone();
            update_fn(&mut config);
            detect_changes(&old, &config.sections)
        };
        self.emit(&changes);
        changes
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.change_tx.subscribe()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn add_section(&self, initial: NewSection) -> Section {
        let now = self.clock.now();
        let (section, position) = {
            let mut config = self.write_guard();
            let section = config.add_section(initial, now);
            (section, config.sections.len() - 1)
        };
        self.emit(&[ConfigChange::SectionAdded {
            id: section.id.clone(),
            position,
        }]);
        section
    }

    pub fn update_section(&self, id: &str, patch: SectionPatch) -> Result<Section> {
        let now = self.clock.now();
        let section = self.write_guard().update_section(id, patch, now)?;
        self.emit(&[ConfigChange::SectionUpdated { id: section.id.clone() }]);
        Ok(section)
    }

    /// Remove a section; absent ids are a no-op and emit nothing.
    pub fn delete_section(&self, id: &str) -> bool {
        let now = self.clock.now();
        let removed = self.write_guard().delete_section(id, now);
        if removed {
            self.emit(&[ConfigChange::SectionDeleted { id: id.to_string() }]);
        }
        removed
    }

    pub fn move_section(&self, id: &str, new_index: usize) -> Result<usize> {
        let now = self.clock.now();
        let (from, to) = {
            let mut config = self.write_guard();
            let from = config.position_of(id);
            let to = config.move_section(id, new_index, now)?;
            (from.unwrap_or(to), to)
        };
        if from != to {
            self.emit(&[ConfigChange::SectionMoved {
                id: id.to_string(),
                from,
                to,
            }]);
        }
        Ok(to)
    }

    pub fn list_sections(&self) -> Vec<Section> {
        self.read(|config| config.list_sections().to_vec())
    }

    pub fn insert_template(&self, id: &str, template: &SectionTemplate) -> Result<Section> {
        let now = self.clock.now();
        let section = self.write_guard().insert_template(id, template, now)?;
        self.emit(&[ConfigChange::SectionUpdated { id: section.id.clone() }]);
        Ok(section)
    }

    /// Swap in a whole new configuration.
    pub fn replace(&self, config: Configuration) -> ConfigChange {
        let change = ConfigChange::ConfigurationReplaced {
            version: config.version.clone(),
            sections: config.sections.len(),
        };
        *self.write_guard() = config;
        self.emit(std::slice::from_ref(&change));
        change
    }

    /// Save the live configuration through `repository` and emit
    /// [`ConfigChange::Saved`] on success.
    ///
    /// The write lock is held for the duration of the save so the stored
    /// blob and the in-memory `last_modified` agree.
    pub fn persist(&self, repository: &ConfigRepository) -> std::result::Result<(), PersistenceError> {
        let at = {
            let mut config = self.write_guard();
            repository.save(&mut config)?;
            config.last_modified
        };
        self.emit(&[ConfigChange::Saved { at }]);
        Ok(())
    }

    fn emit(&self, changes: &[ConfigChange]) {
        for change in changes {
            // Nobody listening is fine
            let _ = self.change_tx.send(change.clone());
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Configuration> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Configuration> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Diff two section lists into change events.
///
/// Removed ids come first, then additions, then edits of retained sections.
/// A retained section is reported as moved when its rank among the retained
/// sections changed.
fn detect_changes(old: &[Section], new: &[Section]) -> Vec<ConfigChange> {
    let mut changes = Vec::new();

    for section in old {
        if !new.iter().any(|s| s.id == section.id) {
            changes.push(ConfigChange::SectionDeleted {
                id: section.id.clone(),
            });
        }
    }

    for (position, section) in new.iter().enumerate() {
        if !old.iter().any(|s| s.id == section.id) {
            changes.push(ConfigChange::SectionAdded {
                id: section.id.clone(),
                position,
            });
        }
    }

    let retained_old: Vec<&Section> = old
        .iter()
        .filter(|s| new.iter().any(|n| n.id == s.id))
        .collect();
    let retained_new: Vec<&Section> = new
        .iter()
        .filter(|s| old.iter().any(|o| o.id == s.id))
        .collect();

    for (to, section) in retained_new.iter().enumerate() {
        let Some(from) = retained_old.iter().position(|s| s.id == section.id) else {
            continue;
        };
        if retained_old[from] != *section {
            changes.push(ConfigChange::SectionUpdated {
                id: section.id.clone(),
            });
        }
        if from != to {
            changes.push(ConfigChange::SectionMoved {
                id: section.id.clone(),
                from,
                to,
            });
        }
    }

    changes
}

impl Default for ConfigState {
    fn default() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::new(default_configuration(clock.now()), clock)
    }
}

impl Clone for ConfigState {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            change_tx: self.change_tx.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}
