//! Document Generator: renders a [`Configuration`] into a CLAUDE.md document.
//!
//! Rendering is a pure function of the configuration, the document title and
//! the generation timestamp, so the same inputs always produce byte-identical
//! output.
//!
//! # Disabled sections
//!
//! Disabled sections are left out of every rendered artifact: the exported
//! file, the preview, and the character count in the footer. They stay in
//! storage and still count towards [`Configuration::character_count`], which
//! is storage accounting. A configuration with no enabled section has nothing
//! to export and [`DocumentGenerator::generate`] returns `None`.

use crate::models::{ConfigStats, Configuration, DEFAULT_DOCUMENT_TITLE, Section};
use chrono::{DateTime, SecondsFormat, Utc};

/// Suggested filename for the exported document.
pub const DEFAULT_EXPORT_FILENAME: &str = "CLAUDE.md";

const SEPARATOR: &str = "---\n\n";

#[derive(Debug, Clone)]
pub struct DocumentGenerator {
    title: String,
}

impl Default for DocumentGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT_TITLE)
    }
}

impl DocumentGenerator {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Render the enabled sections of `config`.
    ///
    /// Returns `None` when there is nothing to export.
    pub fn generate(&self, config: &Configuration, generated_at: DateTime<Utc>) -> Option<String> {
        let rendered: Vec<&Section> = config.enabled_sections().collect();
        if rendered.is_empty() {
            return None;
        }

        let mut out = String::new();
        out.push_str(&format!("# CLAUDE.md - {}\n\n", self.title));
        out.push_str("<!-- Generated by Control Center -->\n");
        out.push_str(&format!("<!-- Generated: {} -->\n", timestamp(generated_at)));
        out.push_str(&format!("<!-- Version: {} -->\n\n", config.version));
        out.push_str(SEPARATOR);

        for section in &rendered {
            out.push_str(&format!("## {}\n\n{}\n\n", section.title, section.content));
            for sub in &section.subsections {
                out.push_str(&format!("### {}\n\n{}\n\n", sub.title, sub.content));
            }
            out.push_str(SEPARATOR);
        }

        let rendered_chars: usize = rendered.iter().map(|s| s.character_count()).sum();
        let last_update = config
            .last_update
            .map_or_else(|| "Never".to_string(), timestamp);

        out.push('\n');
        out.push_str(SEPARATOR);
        out.push_str("**Configuration Details:**\n");
        out.push_str(&format!("- Total Sections: {}\n", rendered.len()));
        out.push_str(&format!("- Character Count: {rendered_chars}\n"));
        out.push_str(&format!("- Last Updated: {last_update}\n"));
        if let Some(related) = config.related {
            out.push_str(&format!("- Skills Available: {}\n", related.skills));
            out.push_str(&format!("- Agents Defined: {}\n", related.agents));
            out.push_str(&format!("- Project Templates: {}\n", related.templates));
        }

        Some(out)
    }
}

/// Counts shown next to the preview: all sections and the rendered subset.
pub fn preview_stats(config: &Configuration) -> ConfigStats {
    config.stats()
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
