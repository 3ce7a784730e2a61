// Workspace
//
// Composition root: wires the store, clock, live state, repository, archive
// and generator together from AppSettings. Nothing here is global; the CLI
// and tests build a Workspace explicitly.

use crate::archive::{ArchiveManager, RestoreOutcome};
use crate::autosave::AutoSaveCoordinator;
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::export::ExportSink;
use crate::generator::{DEFAULT_EXPORT_FILENAME, DocumentGenerator};
use crate::metrics::Metrics;
use crate::models::{AppSettings, Configuration, Snapshot};
use crate::persistence::{BackingStore, ConfigRepository, FileStore, default_configuration};
use crate::state::ConfigState;
use std::sync::Arc;

pub struct Workspace {
    settings: AppSettings,
    state: ConfigState,
    repository: ConfigRepository,
    archive: ArchiveManager,
    generator: DocumentGenerator,
    metrics: Arc<Metrics>,
}

impl Workspace {
    /// Open the on-disk workspace under `settings.data_dir`.
    pub fn open(settings: AppSettings) -> Result<Self> {
        let store = FileStore::open(&settings.data_dir)?;
        Self::with_store(settings, Arc::new(store), Arc::new(SystemClock))
    }

    /// Build a workspace over any store and clock.
    ///
    /// On first use the built-in default configuration is written so later
    /// loads see the same section ids. An unreadable store falls back to the
    /// in-memory default and nothing is written.
    pub fn with_store(
        settings: AppSettings,
        store: Arc<dyn BackingStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let repository = ConfigRepository::new(store.clone(), clock.clone());
        let metrics = Arc::new(Metrics::new());

        let (config, first_run) = match repository.load_stored() {
            Ok(Some(config)) => (config, false),
            Ok(None) => (default_configuration(clock.now()), true),
            Err(e) => {
                tracing::warn!("Failed to load configuration ({e}), falling back to defaults");
                (default_configuration(clock.now()), false)
            }
        };
        let state = ConfigState::new(config, clock.clone());
        let archive = ArchiveManager::new(store, clock)
            .with_retention(settings.snapshot_retention)
            .with_metrics(metrics.clone());
        let generator = DocumentGenerator::new(settings.document_title.clone());

        let workspace = Self {
            settings,
            state,
            repository,
            archive,
            generator,
            metrics,
        };

        if first_run {
            tracing::info!("No stored configuration, bootstrapping defaults");
            workspace.persist()?;
        }
        Ok(workspace)
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn state(&self) -> &ConfigState {
        &self.state
    }

    pub fn repository(&self) -> &ConfigRepository {
        &self.repository
    }

    pub fn archive(&self) -> &ArchiveManager {
        &self.archive
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Persist the live configuration after a section edit, logging a
    /// `CLAUDE.md Updated` activity.
    pub fn save(&self) -> Result<()> {
        let now = self.state.clock().now();
        self.state.update(|config| {
            let description = format!(
                "{} sections, {} characters",
                config.sections.len(),
                config.character_count
            );
            config.record_activity("CLAUDE.md Updated", description, now);
        });
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        match self.state.persist(&self.repository) {
            Ok(()) => {
                self.metrics.record_save();
                Ok(())
            }
            Err(e) => {
                self.metrics.record_save_failure();
                tracing::error!("Failed to save configuration: {}", e);
                Err(e.into())
            }
        }
    }

    /// Render the live configuration; `None` when nothing is enabled.
    pub fn generate(&self) -> Option<String> {
        let now = self.state.clock().now();
        let document = self.state.read(|config| self.generator.generate(config, now));
        if document.is_some() {
            self.metrics.record_document_generated();
        }
        document
    }

    /// Generate and hand the document to `sink` as `CLAUDE.md`.
    ///
    /// Returns the sink location, or `None` if there was nothing to export.
    pub fn export_document(&self, sink: &dyn ExportSink) -> Result<Option<String>> {
        let Some(document) = self.generate() else {
            tracing::warn!("No enabled sections, nothing to export");
            return Ok(None);
        };
        let location = sink.export(DEFAULT_EXPORT_FILENAME, &document)?;
        self.log_activity("CLAUDE.md Exported", format!("Exported CLAUDE.md to {location}"));
        Ok(Some(location))
    }

    pub fn snapshot(&self, note: Option<&str>) -> Result<Snapshot> {
        let snapshot = self.archive.create_snapshot(&self.state.snapshot(), note)?;
        self.log_activity(
            "Snapshot Created",
            format!("Configuration snapshot saved ({})", snapshot.note()),
        );
        Ok(snapshot)
    }

    /// Restore snapshot `id` into the live state and persist it.
    pub fn restore(&self, id: &str) -> Result<RestoreOutcome> {
        let outcome = self.archive.restore(id, &self.state)?;
        let now = self.state.clock().now();
        let restored_from = outcome.restored.created_at().to_rfc3339();
        self.state.update(|config| {
            config.record_activity(
                "Configuration Restored",
                format!("Restored from {restored_from}"),
                now,
            );
        });
        self.persist()?;
        Ok(outcome)
    }

    /// Import a JSON backup, replacing the live configuration.
    pub fn import_json(&self, text: &str) -> Result<Configuration> {
        let config = self.repository.import_json(text)?;
        self.state.replace(config.clone());
        Ok(config)
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(self.state.read(ConfigRepository::export_json)?)
    }

    /// Record an activity and persist it. The operation it describes has
    /// already succeeded, so a failed write is only logged.
    fn log_activity(&self, title: &str, description: String) {
        let now = self.state.clock().now();
        self.state
            .update(|config| config.record_activity(title, description, now));
        if let Err(e) = self.persist() {
            tracing::warn!("Activity '{}' not persisted: {}", title, e);
        }
    }

    /// Debounced section editor bound to this workspace.
    pub fn autosave(&self) -> AutoSaveCoordinator {
        AutoSaveCoordinator::with_metrics(
            self.state.clone(),
            self.repository.clone(),
            self.settings.autosave_delay(),
            self.metrics.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::export::MockExportSink;
    use crate::models::{NewSection, SectionPatch};
    use crate::persistence::MemoryStore;

    fn create_test_workspace() -> (Workspace, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let workspace = Workspace::with_store(
            AppSettings::default(),
            store.clone(),
            Arc::new(FixedClock::epoch()),
        )
        .unwrap();
        (workspace, store)
    }

    #[test]
    fn test_first_open_bootstraps_defaults() {
        let (workspace, store) = create_test_workspace();
        assert_eq!(store.put_count(), 1);
        assert_eq!(workspace.state().list_sections().len(), 4);
    }

    #[test]
    fn test_reopen_keeps_edits() {
        let (workspace, store) = create_test_workspace();
        workspace.state().add_section(NewSection::titled("Extra"));
        workspace.save().unwrap();

        let reopened =
            Workspace::with_store(AppSettings::default(), store.clone(), Arc::new(FixedClock::epoch()))
                .unwrap();
        assert_eq!(reopened.state().list_sections().len(), 5);
        assert_eq!(store.put_count(), 2);
    }

    #[test]
    fn test_export_document_through_sink() {
        let (workspace, _store) = create_test_workspace();
        let mut sink = MockExportSink::new();
        sink.expect_export()
            .withf(|name, contents| name == "CLAUDE.md" && contents.starts_with("# CLAUDE.md"))
            .times(1)
            .returning(|name, _| Ok(format!("/tmp/{name}")));

        let location = workspace.export_document(&sink).unwrap();
        assert_eq!(location.as_deref(), Some("/tmp/CLAUDE.md"));
    }

    #[test]
    fn test_export_with_nothing_enabled_skips_sink() {
        let (workspace, _store) = create_test_workspace();
        for section in workspace.state().list_sections() {
            workspace
                .state()
                .update_section(&section.id, SectionPatch::enabled(false))
                .unwrap();
        }
        let mut sink = MockExportSink::new();
        sink.expect_export().times(0);

        assert_eq!(workspace.export_document(&sink).unwrap(), None);
    }

    #[test]
    fn test_restore_persists_result() {
        let (workspace, _store) = create_test_workspace();
        let before = workspace.snapshot(None).unwrap();
        workspace.state().add_section(NewSection::titled("Scratch"));

        workspace.restore(before.id()).unwrap();

        let stored = workspace.repository().load().unwrap();
        assert_eq!(stored.sections, before.data().sections);
    }

    fn activity_titles(workspace: &Workspace) -> Vec<String> {
        workspace
            .state()
            .read(|config| config.recent_activity.iter().map(|a| a.title.clone()).collect())
    }

    #[test]
    fn test_unreachable_store_opens_with_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);

        let workspace = Workspace::with_store(
            AppSettings::default(),
            store.clone(),
            Arc::new(FixedClock::epoch()),
        )
        .unwrap();

        assert_eq!(workspace.state().list_sections()[0].id, "core-identity");
        assert_eq!(store.put_count(), 0);
        assert!(workspace.save().is_err());
    }

    #[test]
    fn test_operations_record_activity() {
        let (workspace, _store) = create_test_workspace();

        workspace.state().add_section(NewSection::titled("Extra"));
        workspace.save().unwrap();
        assert_eq!(activity_titles(&workspace)[0], "CLAUDE.md Updated");

        let snapshot = workspace.snapshot(None).unwrap();
        assert_eq!(activity_titles(&workspace)[0], "Snapshot Created");

        let mut sink = MockExportSink::new();
        sink.expect_export()
            .returning(|name, _| Ok(format!("/tmp/{name}")));
        workspace.export_document(&sink).unwrap();
        assert_eq!(activity_titles(&workspace)[0], "CLAUDE.md Exported");

        workspace.restore(snapshot.id()).unwrap();
        assert_eq!(activity_titles(&workspace)[0], "Configuration Restored");

        let stored = workspace.repository().load().unwrap();
        assert_eq!(stored.recent_activity[0].title, "Configuration Restored");
        assert_eq!(stored.recent_activity.len(), activity_titles(&workspace).len());
    }
}
