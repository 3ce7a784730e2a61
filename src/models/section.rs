use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Priority given to sections created without an explicit one.
pub const DEFAULT_PRIORITY: u8 = 2;

/// Title given to sections created without an explicit one.
pub const DEFAULT_SECTION_TITLE: &str = "New Section";

/// Content length above which the editor warns about section size.
pub const CONTENT_WARNING_CHARS: usize = 5000;

/// Content length above which a section is considered too large.
pub const CONTENT_DANGER_CHARS: usize = 8000;

/// Where a section applies.
///
/// Ordering follows declaration order, which is also the order tags are
/// persisted and displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextTag {
    All,
    Desktop,
    Code,
    Web,
}

impl ContextTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Desktop => "desktop",
            Self::Code => "code",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "desktop" => Ok(Self::Desktop),
            "code" => Ok(Self::Code),
            "web" => Ok(Self::Web),
            other => Err(format!("unknown context '{other}' (expected all, desktop, code or web)")),
        }
    }
}

/// Set of applicability tags attached to a section.
///
/// Storage accepts any combination. The "all implies the others" rule is
/// applied by editing surfaces through [`normalized`](Self::normalized).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextSet(BTreeSet<ContextTag>);

impl ContextSet {
    pub fn all() -> Self {
        Self(BTreeSet::from([ContextTag::All]))
    }

    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn from_tags<I: IntoIterator<Item = ContextTag>>(tags: I) -> Self {
        Self(tags.into_iter().collect())
    }

    /// Drop the specific tags when `all` is selected.
    pub fn normalized(self) -> Self {
        if self.0.contains(&ContextTag::All) {
            Self::all()
        } else {
            self
        }
    }

    pub fn contains(&self, tag: ContextTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ContextTag> + '_ {
        self.0.iter().copied()
    }
}

impl Default for ContextSet {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for ContextSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.iter().map(ContextTag::as_str).collect();
        f.write_str(&tags.join(", "))
    }
}

/// Nested block rendered as a `###` heading under its parent section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// One named, toggleable block of CLAUDE.md text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub context: ContextSet,

    #[serde(default = "default_priority")]
    pub priority: u8,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<Subsection>,
}

impl Section {
    /// Characters contributed by this section, subsections included.
    pub fn character_count(&self) -> usize {
        self.content.chars().count()
            + self
                .subsections
                .iter()
                .map(|sub| sub.content.chars().count())
                .sum::<usize>()
    }

    pub fn content_size(&self) -> ContentSize {
        ContentSize::classify(self.content.chars().count())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

/// Initial values for a section about to be added.
///
/// Anything left as `None` falls back to the section defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSection {
    /// Requested id. Honoured only if no existing section already uses it.
    pub id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub enabled: Option<bool>,
    pub context: Option<ContextSet>,
    pub priority: Option<u8>,
    pub subsections: Vec<Subsection>,
}

impl NewSection {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_context(mut self, context: ContextSet) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub(crate) fn into_section(self, id: String) -> Section {
        Section {
            id,
            title: self.title.unwrap_or_else(|| DEFAULT_SECTION_TITLE.to_string()),
            content: self.content.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            context: self.context.unwrap_or_default(),
            priority: self.priority.unwrap_or(DEFAULT_PRIORITY),
            subsections: self.subsections,
        }
    }
}

/// Field replacements for an existing section. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub priority: Option<u8>,
    pub enabled: Option<bool>,
    pub context: Option<ContextSet>,
    pub subsections: Option<Vec<Subsection>>,
}

impl SectionPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.priority.is_none()
            && self.enabled.is_none()
            && self.context.is_none()
            && self.subsections.is_none()
    }

    /// Fold a later patch into this one; fields set in `later` win.
    pub fn merge(&mut self, later: SectionPatch) {
        if later.title.is_some() {
            self.title = later.title;
        }
        if later.content.is_some() {
            self.content = later.content;
        }
        if later.priority.is_some() {
            self.priority = later.priority;
        }
        if later.enabled.is_some() {
            self.enabled = later.enabled;
        }
        if later.context.is_some() {
            self.context = later.context;
        }
        if later.subsections.is_some() {
            self.subsections = later.subsections;
        }
    }

    pub(crate) fn apply(self, section: &mut Section) {
        if let Some(title) = self.title {
            section.title = title;
        }
        if let Some(content) = self.content {
            section.content = content;
        }
        if let Some(priority) = self.priority {
            section.priority = priority;
        }
        if let Some(enabled) = self.enabled {
            section.enabled = enabled;
        }
        if let Some(context) = self.context {
            section.context = context;
        }
        if let Some(subsections) = self.subsections {
            section.subsections = subsections;
        }
    }
}

/// Size band of a section body, used for the editor's character counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSize {
    Normal,
    Warning,
    Danger,
}

impl ContentSize {
    pub fn classify(chars: usize) -> Self {
        if chars > CONTENT_DANGER_CHARS {
            Self::Danger
        } else if chars > CONTENT_WARNING_CHARS {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}
