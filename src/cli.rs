//! Command-line surface of the `control-center` binary.

use crate::autosave::AutoSaveStatus;
use crate::config::ConfigManager;
use crate::export::{ExportSink, FileExportSink};
use crate::models::{
    AppSettings, ContentSize, ContextSet, ContextTag, NewSection, SectionPatch, Snapshot,
};
use crate::templates::{SECTION_TEMPLATES, find_template};
use crate::workspace::Workspace;
use anyhow::{Context, Result, anyhow, bail};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use std::fs;

#[derive(Parser, Debug)]
#[command(
    name = "control-center",
    version,
    about = "Versioned CLAUDE.md configuration: sections, snapshots and document export"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding control-center.yaml (default: current directory).
    #[arg(long = "settings-dir", value_name = "DIR", global = true, default_value = ".")]
    pub settings_dir: Utf8PathBuf,

    /// Log at debug level and mirror logs to stderr.
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize the live configuration.
    Show,

    /// Manage configuration sections.
    #[command(subcommand)]
    Sections(SectionsCommand),

    /// Render CLAUDE.md from the enabled sections.
    Generate {
        /// Write into this directory instead of printing.
        #[arg(long, value_name = "DIR")]
        out: Option<Utf8PathBuf>,
    },

    /// Manage configuration snapshots.
    #[command(subcommand)]
    Snapshot(SnapshotCommand),

    /// Replace the configuration with a JSON backup.
    Import {
        #[arg(value_name = "FILE")]
        file: Utf8PathBuf,
    },

    /// Write the configuration as a JSON backup.
    ExportJson {
        /// Output file (default: stdout).
        #[arg(long, value_name = "FILE")]
        out: Option<Utf8PathBuf>,
    },

    /// Write the effective settings to control-center.yaml.
    InitSettings,
}

#[derive(Subcommand, Debug)]
pub enum SectionsCommand {
    List,

    Add(SectionFields),

    /// Change fields of a section and save.
    Update {
        id: String,
        #[command(flatten)]
        fields: SectionFields,
    },

    /// Change fields of a section through the debounced auto-save.
    Edit {
        id: String,
        #[command(flatten)]
        fields: SectionFields,
    },

    Delete {
        id: String,
    },

    /// Move a section to a zero-based position.
    Move {
        id: String,
        position: usize,
    },

    /// Replace a section's body with a built-in template, or list templates.
    Template {
        id: Option<String>,
        #[arg(long, requires = "id")]
        name: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct SectionFields {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub content: Option<String>,

    /// Read the content from a file.
    #[arg(long, value_name = "FILE", conflicts_with = "content")]
    pub content_file: Option<Utf8PathBuf>,

    #[arg(long)]
    pub enabled: Option<bool>,

    /// Comma separated: all, desktop, code, web.
    #[arg(long, value_delimiter = ',')]
    pub context: Option<Vec<ContextTag>>,

    /// 1 (highest) to 3.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub priority: Option<u8>,
}

impl SectionFields {
    fn content(&self) -> Result<Option<String>> {
        match (&self.content, &self.content_file) {
            (Some(content), _) => Ok(Some(content.clone())),
            (None, Some(path)) => fs::read_to_string(path)
                .map(Some)
                .with_context(|| format!("Failed to read content file: {}", path)),
            (None, None) => Ok(None),
        }
    }

    fn context(&self) -> Option<ContextSet> {
        self.context
            .clone()
            .map(|tags| ContextSet::from_tags(tags).normalized())
    }

    fn into_new_section(self) -> Result<NewSection> {
        Ok(NewSection {
            content: self.content()?,
            context: self.context(),
            title: self.title,
            enabled: self.enabled,
            priority: self.priority,
            ..NewSection::default()
        })
    }

    fn into_patch(self) -> Result<SectionPatch> {
        let patch = SectionPatch {
            content: self.content()?,
            context: self.context(),
            title: self.title,
            enabled: self.enabled,
            priority: self.priority,
            subsections: None,
        };
        if patch.is_empty() {
            bail!("Nothing to change: pass at least one of --title, --content, --enabled, --context, --priority");
        }
        Ok(patch)
    }
}

#[derive(Subcommand, Debug)]
pub enum SnapshotCommand {
    Create {
        #[arg(long)]
        note: Option<String>,
    },

    List,

    Show {
        id: String,
    },

    /// Restore a snapshot; the current configuration is archived first.
    Restore {
        id: String,
    },

    Delete {
        id: String,
    },

    Stats,

    /// Write a snapshot as claude-config-YYYY-MM-DD.json.
    Export {
        id: String,
        #[arg(long, value_name = "DIR")]
        out: Option<Utf8PathBuf>,
    },
}

/// Load settings for `cli`, with `--debug` forcing debug mode.
pub fn load_settings(cli: &Cli) -> Result<(ConfigManager, AppSettings)> {
    let manager = ConfigManager::new(&cli.settings_dir)?;
    let mut settings = manager.load_settings()?;
    settings.debug_mode |= cli.debug;
    Ok((manager, settings))
}

/// Execute a parsed command.
pub async fn run(command: Command, manager: &ConfigManager, settings: AppSettings) -> Result<()> {
    if let Command::InitSettings = command {
        manager.save_settings(&settings)?;
        println!("Wrote {}", manager.settings_path());
        return Ok(());
    }

    let export_dir = settings.export_dir.clone();
    let workspace = Workspace::open(settings).context("Failed to open workspace")?;

    match command {
        Command::Show => show(&workspace),
        Command::Sections(command) => run_sections(&workspace, command).await?,
        Command::Generate { out } => match out {
            Some(dir) => match workspace.export_document(&FileExportSink::new(dir))? {
                Some(location) => println!("Wrote {location}"),
                None => println!("No enabled sections, nothing to export"),
            },
            None => match workspace.generate() {
                Some(document) => print!("{document}"),
                None => println!("No enabled sections, nothing to export"),
            },
        },
        Command::Snapshot(command) => run_snapshot(&workspace, command, export_dir)?,
        Command::Import { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read backup: {}", file))?;
            let config = workspace.import_json(&text)?;
            println!(
                "Imported v{} with {} sections",
                config.version,
                config.sections.len()
            );
        }
        Command::ExportJson { out } => {
            let json = workspace.export_json()?;
            match out {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write backup: {}", path))?;
                    println!("Wrote {path}");
                }
                None => println!("{json}"),
            }
        }
        // Written before the workspace is opened
        Command::InitSettings => return Ok(()),
    }

    workspace.metrics().log_summary();
    Ok(())
}

fn show(workspace: &Workspace) {
    let (version, stats, activity) = workspace.state().read(|config| {
        (
            config.version.clone(),
            config.stats(),
            config.recent_activity.first().cloned(),
        )
    });

    println!("Version:        {version}");
    println!("Sections:       {} ({} enabled)", stats.sections, stats.enabled);
    println!(
        "Characters:     {} stored, {} rendered",
        stats.total_chars, stats.enabled_chars
    );
    println!("Last modified:  {}", stats.last_modified);
    match stats.last_update {
        Some(at) => println!("Last update:    {at}"),
        None => println!("Last update:    never"),
    }
    if let Some(activity) = activity {
        println!("Last activity:  {} ({})", activity.title, activity.description);
    }
}

async fn run_sections(workspace: &Workspace, command: SectionsCommand) -> Result<()> {
    let state = workspace.state();
    match command {
        SectionsCommand::List => {
            for (index, section) in state.list_sections().iter().enumerate() {
                let size = match section.content_size() {
                    ContentSize::Normal => "",
                    ContentSize::Warning => " (long)",
                    ContentSize::Danger => " (too long)",
                };
                println!(
                    "{index:>2}. [{}] {} \"{}\" p{} [{}] {} chars{size}",
                    if section.enabled { "x" } else { " " },
                    section.id,
                    section.title,
                    section.priority,
                    section.context,
                    section.character_count(),
                );
            }
        }
        SectionsCommand::Add(fields) => {
            let section = state.add_section(fields.into_new_section()?);
            workspace.save()?;
            println!("Added {}", section.id);
        }
        SectionsCommand::Update { id, fields } => {
            let section = state.update_section(&id, fields.into_patch()?)?;
            workspace.save()?;
            println!("Updated {}", section.id);
        }
        SectionsCommand::Edit { id, fields } => {
            let patch = fields.into_patch()?;
            if state.read(|config| config.find_section(&id).is_none()) {
                bail!("Section '{id}' not found");
            }
            let autosave = workspace.autosave();
            let mut status = autosave.subscribe_status();
            autosave.edit(&id, patch);
            println!("Saving in {}ms...", autosave.delay().as_millis());

            let outcome = status
                .wait_for(|s| matches!(s, AutoSaveStatus::Saved { .. } | AutoSaveStatus::Failed { .. }))
                .await
                .map_err(|_| anyhow!("Auto-save stopped unexpectedly"))?
                .clone();
            match outcome {
                AutoSaveStatus::Failed { message, .. } => bail!("Auto-save failed: {message}"),
                _ => println!("Saved {id}"),
            }
        }
        SectionsCommand::Delete { id } => {
            if state.delete_section(&id) {
                workspace.save()?;
                println!("Deleted {id}");
            } else {
                println!("No section {id}");
            }
        }
        SectionsCommand::Move { id, position } => {
            let to = state.move_section(&id, position)?;
            workspace.save()?;
            println!("Moved {id} to position {to}");
        }
        SectionsCommand::Template { id: None, .. } => {
            for template in SECTION_TEMPLATES {
                println!("{:<18} {}", template.id, template.title);
            }
        }
        SectionsCommand::Template { id: Some(id), name } => {
            let name = name.ok_or_else(|| anyhow!("--name is required to apply a template"))?;
            let template =
                find_template(&name).ok_or_else(|| anyhow!("Unknown template '{name}'"))?;
            state.insert_template(&id, template)?;
            workspace.save()?;
            println!("Applied {} to {id}", template.id);
        }
    }
    Ok(())
}

fn run_snapshot(
    workspace: &Workspace,
    command: SnapshotCommand,
    export_dir: Utf8PathBuf,
) -> Result<()> {
    let archive = workspace.archive();
    match command {
        SnapshotCommand::Create { note } => {
            let snapshot = workspace.snapshot(note.as_deref())?;
            println!("Created {}", snapshot.id());
        }
        SnapshotCommand::List => {
            for snapshot in archive.list_snapshots()? {
                print_snapshot_line(&snapshot);
            }
        }
        SnapshotCommand::Show { id } => {
            let snapshot = archive.get_snapshot(&id)?;
            print_snapshot_line(&snapshot);
            for section in &snapshot.data().sections {
                println!(
                    "  [{}] {}",
                    if section.enabled { "x" } else { " " },
                    section.title
                );
            }
        }
        SnapshotCommand::Restore { id } => {
            let outcome = workspace.restore(&id)?;
            println!(
                "Restored {} (v{}); previous state saved as {}",
                outcome.restored.id(),
                outcome.restored.version(),
                outcome.backup.id()
            );
        }
        SnapshotCommand::Delete { id } => {
            archive.delete_snapshot(&id)?;
            println!("Deleted {id}");
        }
        SnapshotCommand::Stats => {
            let stats = archive.stats()?;
            println!("Snapshots:       {}/{}", stats.total_snapshots, archive.retention());
            println!("Current version: {}", stats.current_version);
            match stats.last_backup_time {
                Some(at) => println!("Last backup:     {at}"),
                None => println!("Last backup:     never"),
            }
            println!("Total size:      {} KB", stats.total_size_kb());
        }
        SnapshotCommand::Export { id, out } => {
            let (filename, json) = archive.export_snapshot(&id)?;
            let sink = FileExportSink::new(out.unwrap_or(export_dir));
            println!("Wrote {}", sink.export(&filename, &json)?);
        }
    }
    Ok(())
}

fn print_snapshot_line(snapshot: &Snapshot) {
    println!(
        "{}  {}  v{}  {} sections  {}",
        snapshot.id(),
        snapshot.created_at().format("%Y-%m-%d %H:%M:%S"),
        snapshot.version(),
        snapshot.data().sections.len(),
        snapshot.note()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_section_add() {
        let cli = Cli::try_parse_from([
            "control-center",
            "sections",
            "add",
            "--title",
            "Rules",
            "--context",
            "code,web",
            "--priority",
            "1",
        ])
        .unwrap();

        let Command::Sections(SectionsCommand::Add(fields)) = cli.command else {
            panic!("expected sections add");
        };
        let new_section = fields.into_new_section().unwrap();
        assert_eq!(new_section.title.as_deref(), Some("Rules"));
        assert_eq!(new_section.priority, Some(1));
        let context = new_section.context.unwrap();
        assert!(context.contains(ContextTag::Code) && context.contains(ContextTag::Web));
    }

    #[test]
    fn test_all_context_wins() {
        let fields = SectionFields {
            context: Some(vec![ContextTag::Code, ContextTag::All]),
            ..SectionFields::default()
        };
        assert_eq!(fields.context(), Some(ContextSet::all()));
    }

    #[test]
    fn test_empty_patch_rejected() {
        assert!(SectionFields::default().into_patch().is_err());
    }

    #[test]
    fn test_priority_range_checked() {
        let result = Cli::try_parse_from([
            "control-center",
            "sections",
            "update",
            "core",
            "--priority",
            "7",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli =
            Cli::try_parse_from(["control-center", "snapshot", "list", "--debug", "--settings-dir", "/tmp/cc"])
                .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.settings_dir, Utf8PathBuf::from("/tmp/cc"));
        assert!(matches!(cli.command, Command::Snapshot(SnapshotCommand::List)));
    }
}
