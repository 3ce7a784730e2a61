// Built-in section templates
//
// Inserting a template replaces a section's body and renames it after the
// template (minus the " Template" suffix).

use crate::error::Result;
use crate::models::{Configuration, Section, SectionPatch};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub content: &'static str,
}

impl SectionTemplate {
    /// Title given to a section the template is inserted into.
    pub fn section_title(&self) -> &'static str {
        self.title.strip_suffix(" Template").unwrap_or(self.title)
    }
}

pub const SECTION_TEMPLATES: &[SectionTemplate] = &[
    SectionTemplate {
        id: "critical-rules",
        title: "Critical Rules Template",
        content: "**Documentation & Files:**
- NEVER overwrite files without archiving the previous version
- ALWAYS keep generated documentation next to the project it describes

**Project Management:**
- ALWAYS confirm the target directory before creating a project
- ALWAYS plan multi-step work before writing code

**Tool Usage:**
- ALWAYS use the proper tool invocation format
- NEVER use placeholder formats like [tool: query]",
    },
    SectionTemplate {
        id: "decision-tree",
        title: "Decision Tree Template",
        content: "**Information Currency Check:**
```
IF information is timeless
  -> Answer directly without searching
ELSE IF information changes slowly
  -> Answer first, THEN offer to search
ELSE IF information is current/live
  -> Search immediately before answering
```

**Tool Selection Logic:**
```
IF task involves local files
  -> Use file system tools
ELSE IF task involves current events
  -> Use web search
ELSE IF task involves a code repository
  -> Use the repository tools
```",
    },
    SectionTemplate {
        id: "tool-priority",
        title: "Tool Priority Template",
        content: "**Tool Usage Priority Order:**

1. **File system tools** (Critical)
   - Reading, writing and moving files
   - Running terminal commands

2. **Planning tools** (High)
   - Multi-step problem solving
   - Architecture decisions

3. **Documentation lookup** (High)
   - SDK and API references

4. **Web search** (Medium)
   - Current events and real-time data",
    },
    SectionTemplate {
        id: "anti-patterns",
        title: "Anti-Patterns Template",
        content: "**What NOT to Do:**

- NEVER overwrite files without archiving
- NEVER assume user intent, always clarify
- NEVER use placeholder tool formats
- NEVER reproduce copyrighted material

**Common Mistakes to Avoid:**
- Creating single-use solutions instead of reusable tools
- Jumping to code without planning
- Not checking whether information is time-sensitive",
    },
    SectionTemplate {
        id: "context-specific",
        title: "Context-Specific Template",
        content: "**When on the desktop app:**
- Full tool access
- Can create files and directories
- Can execute terminal commands

**When in a terminal coding session:**
- Terminal-focused workflow
- Git integration preferred
- Code-first approach

**When in the web interface:**
- Limited to web-based tools
- Focus on analysis and planning
- Cannot access local files",
    },
    SectionTemplate {
        id: "90-10-rule",
        title: "90/10 Prevention Template",
        content: "**Prevention Over Instruction (90/10 Rule):**

Focus 90% on what NOT to do, 10% on what to do.

**Safety Boundaries:**
- Define clear limits and constraints
- Specify failure modes and how to handle them

**Counter-Examples:**
- Bad: \"Be concise\"
- Good: \"Responses must be under 500 words\"",
    },
];

pub fn find_template(id: &str) -> Option<&'static SectionTemplate> {
    SECTION_TEMPLATES.iter().find(|t| t.id == id)
}

impl Configuration {
    /// Replace the body and title of section `id` with `template`.
    pub fn insert_template(
        &mut self,
        id: &str,
        template: &SectionTemplate,
        now: DateTime<Utc>,
    ) -> Result<Section> {
        let patch = SectionPatch {
            title: Some(template.section_title().to_string()),
            content: Some(template.content.to_string()),
            ..SectionPatch::default()
        };
        self.update_section(id, patch, now)
    }
}
