use super::defaults::default_configuration;
use super::store::BackingStore;
use crate::clock::Clock;
use crate::error::{ControlError, PersistenceError};
use crate::models::Configuration;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

/// Store key of the live configuration.
pub const CONFIG_KEY: &str = "configuration";

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(?:[-+][0-9A-Za-z.+-]+)?$").expect("Invalid version regex")
});

/// Loads and saves the whole [`Configuration`] as a single JSON blob.
///
/// Saves replace the stored value in one `put`; there is no partial merge.
#[derive(Clone)]
pub struct ConfigRepository {
    store: Arc<dyn BackingStore>,
    clock: Arc<dyn Clock>,
}

impl ConfigRepository {
    pub fn new(store: Arc<dyn BackingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Load the stored configuration, or the built-in default if none exists.
    pub fn load(&self) -> Result<Configuration, PersistenceError> {
        match self.load_stored()? {
            Some(config) => Ok(config),
            None => {
                tracing::warn!("No stored configuration found, using defaults");
                Ok(default_configuration(self.clock.now()))
            }
        }
    }

    /// The stored configuration, `None` if nothing has been saved yet.
    pub fn load_stored(&self) -> Result<Option<Configuration>, PersistenceError> {
        let Some(bytes) = self.store.get(CONFIG_KEY)? else {
            return Ok(None);
        };

        let config: Configuration =
            serde_json::from_slice(&bytes).map_err(|e| PersistenceError::Deserialization {
                key: CONFIG_KEY.to_string(),
                source: e,
            })?;

        tracing::info!(
            "Loaded configuration v{} with {} sections",
            config.version,
            config.sections.len()
        );
        Ok(Some(config))
    }

    /// Like [`load`](Self::load), but falls back to the default on any failure.
    pub fn load_or_default(&self) -> Configuration {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load configuration ({e}), falling back to defaults");
                default_configuration(self.clock.now())
            }
        }
    }

    /// Stamp `last_modified` and persist the full configuration.
    pub fn save(&self, config: &mut Configuration) -> Result<(), PersistenceError> {
        config.last_modified = self.clock.now();

        let bytes = serde_json::to_vec(config).map_err(|e| PersistenceError::Serialization {
            what: "configuration",
            source: e,
        })?;
        self.store.put(CONFIG_KEY, &bytes)?;

        tracing::info!(
            "Saved configuration v{} ({} sections, {} chars)",
            config.version,
            config.sections.len(),
            config.character_count
        );
        Ok(())
    }

    /// Pretty-printed JSON backup of `config`.
    pub fn export_json(config: &Configuration) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(config).map_err(|e| PersistenceError::Serialization {
            what: "configuration",
            source: e,
        })
    }

    /// Validate a JSON backup and, if it is well formed, save it as the
    /// stored configuration. Nothing is written when validation fails.
    pub fn import_json(&self, text: &str) -> Result<Configuration, ControlError> {
        let mut config = parse_import(text)?;
        config.recompute_character_count();
        config.record_activity(
            "Configuration Imported",
            "Configuration restored from backup",
            self.clock.now(),
        );
        self.save(&mut config)?;
        Ok(config)
    }
}

/// Check an imported document and turn it into a typed configuration.
pub fn parse_import(text: &str) -> Result<Configuration, ControlError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ControlError::Validation(format!("not valid JSON: {e}")))?;

    let Some(object) = value.as_object() else {
        return Err(ControlError::Validation("expected a JSON object".to_string()));
    };

    let missing: Vec<&str> = ["version", "sections"]
        .into_iter()
        .filter(|field| !object.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(ControlError::Validation(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )));
    }

    match object.get("version").and_then(serde_json::Value::as_str) {
        Some(version) if VERSION_PATTERN.is_match(version) => {}
        _ => {
            return Err(ControlError::Validation(
                "version must be a semantic version string".to_string(),
            ));
        }
    }

    let config: Configuration = serde_json::from_value(value)
        .map_err(|e| ControlError::Validation(e.to_string()))?;

    let mut seen = HashSet::new();
    if let Some(dup) = config.sections.iter().find(|s| !seen.insert(s.id.as_str())) {
        return Err(ControlError::Validation(format!(
            "duplicate section id '{}'",
            dup.id
        )));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::persistence::store::{MemoryStore, MockBackingStore};

    fn create_test_repository() -> (ConfigRepository, Arc<MemoryStore>, Arc<FixedClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::epoch());
        let repo = ConfigRepository::new(store.clone(), clock.clone());
        (repo, store, clock)
    }

    #[test]
    fn test_load_without_stored_config_returns_default() {
        let (repo, store, _clock) = create_test_repository();
        let config = repo.load().unwrap();
        assert_eq!(config.sections.len(), 4);
        assert_eq!(store.put_count(), 0);
    }

    #[test]
    fn test_load_stored_distinguishes_first_run() {
        let (repo, _store, _clock) = create_test_repository();
        assert_eq!(repo.load_stored().unwrap(), None);

        let mut config = repo.load().unwrap();
        repo.save(&mut config).unwrap();
        assert_eq!(repo.load_stored().unwrap(), Some(config));
    }

    #[test]
    fn test_save_stamps_last_modified() {
        let (repo, _store, clock) = create_test_repository();
        let mut config = repo.load().unwrap();

        clock.advance_millis(5_000);
        repo.save(&mut config).unwrap();

        assert_eq!(config.last_modified, clock.now());
        assert_eq!(repo.load().unwrap(), config);
    }

    #[test]
    fn test_corrupt_blob_is_persistence_error() {
        let (repo, store, _clock) = create_test_repository();
        store.put(CONFIG_KEY, b"{not json").unwrap();

        assert!(matches!(
            repo.load(),
            Err(PersistenceError::Deserialization { .. })
        ));
        assert_eq!(repo.load_or_default().sections.len(), 4);
    }

    #[test]
    fn test_save_failure_propagates() {
        let mut store = MockBackingStore::new();
        store
            .expect_put()
            .withf(|key, _| key == CONFIG_KEY)
            .times(1)
            .returning(|_, _| Err(PersistenceError::Unavailable("disk gone".to_string())));

        let repo = ConfigRepository::new(Arc::new(store), Arc::new(FixedClock::epoch()));
        let mut config = default_configuration(FixedClock::epoch().now());

        assert!(matches!(
            repo.save(&mut config),
            Err(PersistenceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_unreachable_store_falls_back_to_default() {
        let mut store = MockBackingStore::new();
        store
            .expect_get()
            .returning(|_| Err(PersistenceError::Unavailable("offline".to_string())));

        let repo = ConfigRepository::new(Arc::new(store), Arc::new(FixedClock::epoch()));
        assert!(repo.load().is_err());
        assert_eq!(repo.load_or_default().sections[0].id, "core-identity");
    }

    #[test]
    fn test_import_rejects_missing_fields() {
        let (repo, store, _clock) = create_test_repository();

        let err = repo.import_json(r#"{"claude": {}}"#).unwrap_err();
        assert!(matches!(err, ControlError::Validation(ref m) if m.contains("version, sections")));

        let err = repo.import_json(r#"{"version": "1.0.0"}"#).unwrap_err();
        assert!(matches!(err, ControlError::Validation(ref m) if m.contains("sections")));

        assert_eq!(store.put_count(), 0);
    }

    #[test]
    fn test_import_rejects_bad_version_and_duplicates() {
        let (repo, store, _clock) = create_test_repository();

        let err = repo
            .import_json(r#"{"version": "latest", "sections": []}"#)
            .unwrap_err();
        assert!(matches!(err, ControlError::Validation(_)));

        let dup = r#"{"version": "1.0.0", "sections": [
            {"id": "a", "title": "A"}, {"id": "a", "title": "B"}
        ]}"#;
        let err = repo.import_json(dup).unwrap_err();
        assert!(matches!(err, ControlError::Validation(ref m) if m.contains("duplicate")));

        assert_eq!(store.put_count(), 0);
    }

    #[test]
    fn test_import_valid_backup() {
        let (repo, _store, _clock) = create_test_repository();
        let text = r#"{"version": "2.0.0", "sections": [
            {"id": "a", "title": "A", "content": "abc", "enabled": false, "context": ["code"], "priority": 3}
        ]}"#;

        let config = repo.import_json(text).unwrap();
        assert_eq!(config.version, "2.0.0");
        assert_eq!(config.character_count, 3);
        assert_eq!(config.recent_activity[0].title, "Configuration Imported");
        assert_eq!(repo.load().unwrap(), config);
    }

    #[test]
    fn test_export_then_import_keeps_sections() {
        let (repo, _store, _clock) = create_test_repository();
        let original = repo.load().unwrap();

        let json = ConfigRepository::export_json(&original).unwrap();
        let imported = repo.import_json(&json).unwrap();

        assert_eq!(imported.sections, original.sections);
        assert_eq!(imported.version, original.version);
    }
}
