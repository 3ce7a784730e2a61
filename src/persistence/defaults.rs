// Bootstrap configuration
//
// Starter sections used when no configuration has been stored yet. The text
// is static and versioned with DEFAULT_CONFIG_VERSION, independently of user
// edits.

use crate::models::{Configuration, ContextSet, DEFAULT_CONFIG_VERSION, Section};
use chrono::{DateTime, Utc};

const STARTER_SECTIONS: &[(&str, &str, &str)] = &[
    (
        "core-identity",
        "Core Identity & Purpose",
        "I am Claude, working on technology projects spanning embedded systems, educational content, web applications, and data analysis.

**Core Priorities:**
- Building distributable solutions over one-off tools
- Systematic analysis and evidence-based decision-making
- Creating reusable frameworks that benefit broader communities
- Comprehensive documentation and project organization",
    ),
    (
        "critical-rules",
        "Critical Rules (Binary - No Exceptions)",
        "These are hard on/off rules that MUST be followed:

**Documentation & Files:**
- ALWAYS archive previous versions with timestamps
- NEVER overwrite files without a backup

**Project Management:**
- ALWAYS ask before creating a new project
- ALWAYS plan complex work before executing it",
    ),
    (
        "decision-trees",
        "Decision Trees & Logic",
        "**Information Currency Assessment:**
```
IF information is timeless (fundamental concepts, historical facts)
  -> Answer directly without searching
ELSE IF information changes slowly (annual statistics, stable facts)
  -> Answer first, THEN offer to search for latest data
ELSE IF information is current/live (prices, news, events)
  -> Search immediately before answering
```",
    ),
    (
        "design-system",
        "Design System & Preferences",
        "**Design Rules:**
- Flat design only, no gradients
- Consistent color palette across every deliverable
- Bootstrap 5 for layout, Font Awesome 6 for icons",
    ),
];

/// The built-in configuration returned when nothing is stored yet.
pub fn default_configuration(now: DateTime<Utc>) -> Configuration {
    let mut config = Configuration::new(DEFAULT_CONFIG_VERSION, now);
    config.sections = STARTER_SECTIONS
        .iter()
        .map(|(id, title, content)| Section {
            id: (*id).to_string(),
            title: (*title).to_string(),
            content: (*content).to_string(),
            enabled: true,
            context: ContextSet::all(),
            priority: 1,
            subsections: Vec::new(),
        })
        .collect();
    config.recompute_character_count();
    config.last_update = Some(now);
    config.record_activity("System Initialized", "Default configuration sections loaded", now);
    config
}
