//! Discussion guide parsing.
//!
//! A guide is an ordered list of `{theme, question}` items. It can be given
//! as TOML (`[[items]]`), JSON (array or `{"items": [...]}`), or as sectioned
//! plain text:
//!
//! ```text
//! ## Warm-up
//! 1. What is your role?
//! 2. How long have you worked on this unit?
//! ### Probes
//! - What does a typical shift look like?
//! ## Current Treatment
//! - How do you manage pain today?
//! ```
//!
//! Headings open sections (the section title becomes the theme of every
//! question under it, including those in its subsections).

use crate::error::{Result, VerbatimError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

/// One question of the discussion guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideItem {
    /// Theme category (guide section) the question belongs to.
    pub theme: String,
    /// Question text, verbatim.
    pub question: String,
}

impl GuideItem {
    pub fn new(theme: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            question: question.into(),
        }
    }
}

/// A sectioned discussion guide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscussionGuide {
    pub sections: Vec<GuideSection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuideSection {
    pub title: String,
    pub questions: Vec<String>,
    pub subsections: Vec<GuideSubsection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuideSubsection {
    pub title: String,
    pub questions: Vec<String>,
}

/// Title used for questions that appear before the first heading.
pub const UNSECTIONED_TITLE: &str = "General";

/// Return a copy of `guide` with a new, empty section appended.
pub fn with_section(guide: &DiscussionGuide, title: &str) -> DiscussionGuide {
    let mut sections = guide.sections.clone();
    sections.push(GuideSection {
        title: title.to_string(),
        questions: Vec::new(),
        subsections: Vec::new(),
    });
    DiscussionGuide { sections }
}

/// Return a copy of `guide` with a new subsection appended to section `section_idx`.
pub fn with_subsection(
    guide: &DiscussionGuide,
    section_idx: usize,
    title: &str,
) -> Result<DiscussionGuide> {
    let section = section_at(guide, section_idx)?;

    let mut subsections = section.subsections.clone();
    subsections.push(GuideSubsection {
        title: title.to_string(),
        questions: Vec::new(),
    });

    Ok(replace_section(
        guide,
        section_idx,
        GuideSection {
            subsections,
            ..section.clone()
        },
    ))
}

/// Return a copy of `guide` with `question` appended to the addressed
/// section, or to one of its subsections.
pub fn with_question(
    guide: &DiscussionGuide,
    section_idx: usize,
    subsection_idx: Option<usize>,
    question: &str,
) -> Result<DiscussionGuide> {
    let section = section_at(guide, section_idx)?;

    let updated = match subsection_idx {
        None => {
            let mut questions = section.questions.clone();
            questions.push(question.to_string());
            GuideSection {
                questions,
                ..section.clone()
            }
        }
        Some(sub_idx) => {
            let subsection = section.subsections.get(sub_idx).ok_or_else(|| {
                VerbatimError::Guide(format!(
                    "section {} has no subsection {}",
                    section_idx, sub_idx
                ))
            })?;

            let mut questions = subsection.questions.clone();
            questions.push(question.to_string());

            let mut subsections = section.subsections.clone();
            subsections[sub_idx] = GuideSubsection {
                questions,
                ..subsection.clone()
            };

            GuideSection {
                subsections,
                ..section.clone()
            }
        }
    };

    Ok(replace_section(guide, section_idx, updated))
}

fn section_at(guide: &DiscussionGuide, section_idx: usize) -> Result<&GuideSection> {
    guide
        .sections
        .get(section_idx)
        .ok_or_else(|| VerbatimError::Guide(format!("no section at index {}", section_idx)))
}

fn replace_section(
    guide: &DiscussionGuide,
    section_idx: usize,
    section: GuideSection,
) -> DiscussionGuide {
    let sections = guide
        .sections
        .iter()
        .enumerate()
        .map(|(i, s)| if i == section_idx { section.clone() } else { s.clone() })
        .collect();
    DiscussionGuide { sections }
}

impl DiscussionGuide {
    /// Flatten into guide items, in document order.
    pub fn items(&self) -> Vec<GuideItem> {
        self.sections
            .iter()
            .flat_map(|section| {
                section
                    .questions
                    .iter()
                    .chain(section.subsections.iter().flat_map(|s| s.questions.iter()))
                    .map(move |q| GuideItem::new(section.title.clone(), q.clone()))
            })
            .collect()
    }
}

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,3})\s+(.+?)\s*#*$").expect("heading pattern is valid")
});

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•]|\d+[.)]|[A-Za-z][.)]|Q\d+[.):])\s+").expect("list marker pattern is valid")
});

/// Parse a sectioned plain-text guide.
pub fn parse_guide_text(text: &str) -> Result<DiscussionGuide> {
    let mut guide = DiscussionGuide::default();
    let mut current_subsection: Option<usize> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || is_note(line) {
            continue;
        }

        if let Some(caps) = HEADING.captures(line) {
            let title = caps[2].trim();
            if caps[1].len() <= 2 || guide.sections.is_empty() {
                guide = with_section(&guide, title);
                current_subsection = None;
            } else {
                let section_idx = guide.sections.len() - 1;
                guide = with_subsection(&guide, section_idx, title)?;
                current_subsection = Some(guide.sections[section_idx].subsections.len() - 1);
            }
            continue;
        }

        if guide.sections.is_empty() {
            guide = with_section(&guide, UNSECTIONED_TITLE);
        }

        let question = LIST_MARKER.replace(line, "");
        let question = question.trim();
        if question.is_empty() {
            continue;
        }

        let section_idx = guide.sections.len() - 1;
        guide = with_question(&guide, section_idx, current_subsection, question)?;
    }

    Ok(guide)
}

/// Interviewer notes such as `(probe if needed)` or `[show card B]`.
fn is_note(line: &str) -> bool {
    (line.starts_with('(') && line.ends_with(')')) || (line.starts_with('[') && line.ends_with(']'))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GuideFile {
    Wrapped { items: Vec<GuideItem> },
    Bare(Vec<GuideItem>),
}

impl From<GuideFile> for Vec<GuideItem> {
    fn from(file: GuideFile) -> Self {
        match file {
            GuideFile::Wrapped { items } | GuideFile::Bare(items) => items,
        }
    }
}

/// Load guide items from a file, picking the format from the extension.
pub async fn load_guide(path: &Path) -> Result<Vec<GuideItem>> {
    let content = tokio::fs::read_to_string(path).await?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let items: Vec<GuideItem> = match extension.as_deref() {
        Some("toml") => toml::from_str::<GuideFile>(&content)?.into(),
        Some("json") => serde_json::from_str::<GuideFile>(&content)?.into(),
        _ => parse_guide_text(&content)?.items(),
    };

    if items.iter().any(|i| i.question.trim().is_empty()) {
        return Err(VerbatimError::Guide(format!(
            "{} contains an empty question",
            path.display()
        )));
    }

    Ok(items)
}
