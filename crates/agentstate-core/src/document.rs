//! Minimal reader/writer for the semi-structured Markdown used by
//! current-state files:
//!
//! ```text
//! # Title
//!
//! **Key**: value
//!
//! ## Section
//! body
//! ```
//!
//! Field lines are only recognised before the first `## ` heading.

use regex::Regex;
use std::sync::OnceLock;

pub const NONE_MARKER: &str = "_None_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub value: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub title: Option<String>,
    pub fields: Vec<Field>,
    pub sections: Vec<Section>,
    /// Non-blank header lines that are neither the title nor a field,
    /// with 1-based line numbers.
    pub loose_lines: Vec<(usize, String)>,
}

static FIELD_RE: OnceLock<Regex> = OnceLock::new();

fn field_re() -> &'static Regex {
    FIELD_RE.get_or_init(|| Regex::new(r"^\*\*([^*]+)\*\*:\s*(.*)$").unwrap())
}

impl Document {
    pub fn parse(content: &str) -> Self {
        let mut doc = Document::default();
        let mut current: Option<Section> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_end();

            if let Some(title) = line.strip_prefix("## ") {
                if let Some(done) = current.take() {
                    doc.sections.push(finish(done));
                }
                current = Some(Section {
                    title: title.trim().to_string(),
                    body: String::new(),
                    line: line_no,
                });
                continue;
            }

            if let Some(section) = current.as_mut() {
                section.body.push_str(line);
                section.body.push('\n');
                continue;
            }

            if doc.title.is_none() {
                if let Some(title) = line.strip_prefix("# ") {
                    doc.title = Some(title.trim().to_string());
                    continue;
                }
            }
            if let Some(caps) = field_re().captures(line.trim_start()) {
                doc.fields.push(Field {
                    key: caps[1].trim().to_string(),
                    value: caps[2].trim().to_string(),
                    line: line_no,
                });
                continue;
            }
            if !line.trim().is_empty() {
                doc.loose_lines.push((line_no, line.trim().to_string()));
            }
        }
        if let Some(done) = current.take() {
            doc.sections.push(finish(done));
        }
        doc
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key.eq_ignore_ascii_case(key))
    }

    pub fn field_value(&self, key: &str) -> Option<&str> {
        self.field(key).map(|f| f.value.as_str())
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.title.eq_ignore_ascii_case(title))
    }

    /// Section body with the `_None_` marker treated as empty.
    pub fn section_text(&self, title: &str) -> String {
        match self.section(title) {
            Some(s) if s.body.trim() != NONE_MARKER => s.body.trim().to_string(),
            _ => String::new(),
        }
    }

    pub fn section_items(&self, title: &str) -> Vec<String> {
        self.section(title)
            .map(|s| list_items(&s.body))
            .unwrap_or_default()
    }
}

fn finish(mut section: Section) -> Section {
    let trimmed = section.body.trim_matches('\n').to_string();
    section.body = trimmed;
    section
}

/// Items of a Markdown bullet list, with `[ ]`/`[x]` checkboxes and
/// surrounding backticks stripped.
pub fn list_items(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|l| {
            let l = l.trim();
            let item = l.strip_prefix("- ").or_else(|| l.strip_prefix("* "))?;
            let item = item
                .strip_prefix("[x] ")
                .or_else(|| item.strip_prefix("[X] "))
                .or_else(|| item.strip_prefix("[ ] "))
                .unwrap_or(item)
                .trim();
            let item = item
                .strip_prefix('`')
                .and_then(|s| s.strip_suffix('`'))
                .unwrap_or(item);
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Writer {
    out: String,
}

impl Writer {
    pub fn new(title: &str) -> Self {
        let mut w = Writer::default();
        w.out.push_str("# ");
        w.out.push_str(title);
        w.out.push_str("\n\n");
        w
    }

    pub fn field(&mut self, key: &str, value: impl std::fmt::Display) -> &mut Self {
        self.out.push_str(&format!("**{key}**: {value}\n"));
        self
    }

    pub fn line(&mut self, text: &str) -> &mut Self {
        self.out.push('\n');
        self.out.push_str(text);
        self.out.push('\n');
        self
    }

    pub fn section(&mut self, title: &str, body: &str) -> &mut Self {
        self.out.push_str(&format!("\n## {title}\n"));
        if body.trim().is_empty() {
            self.out.push_str(NONE_MARKER);
        } else {
            self.out.push_str(body.trim_end());
        }
        self.out.push('\n');
        self
    }

    /// Render a bullet list; `checkbox` adds `[x]`/`[ ]` markers.
    pub fn list_section(&mut self, title: &str, items: &[String], checkbox: Option<bool>) -> &mut Self {
        let mark = match checkbox {
            Some(true) => "[x] ",
            Some(false) => "[ ] ",
            None => "",
        };
        let body: Vec<String> = items.iter().map(|i| format!("- {mark}{i}")).collect();
        self.section(title, &body.join("\n"))
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# backend-agent Current State

**Agent ID**: backend-agent
**Status**: in_progress
stray header text

## Current Task
Build the feed endpoint

## Completed Steps
- [x] Read the design notes
- [x] Draft the migration

## Files Touched
- `apps/backend/src/feed.ts`

## Notes
_None_
";

    #[test]
    fn parses_title_fields_and_sections() {
        let doc = Document::parse(SAMPLE);
        assert_eq!(doc.title.as_deref(), Some("backend-agent Current State"));
        assert_eq!(doc.field_value("Agent ID"), Some("backend-agent"));
        assert_eq!(doc.field_value("status"), Some("in_progress"));
        assert_eq!(doc.field("Status").unwrap().line, 4);
        assert_eq!(doc.sections.len(), 4);
        assert_eq!(doc.section_text("Current Task"), "Build the feed endpoint");
        assert_eq!(doc.section_text("Notes"), "");
        assert_eq!(doc.loose_lines, vec![(5, "stray header text".to_string())]);
    }

    #[test]
    fn list_items_strip_markers() {
        let doc = Document::parse(SAMPLE);
        assert_eq!(
            doc.section_items("Completed Steps"),
            vec!["Read the design notes", "Draft the migration"]
        );
        assert_eq!(doc.section_items("Files Touched"), vec!["apps/backend/src/feed.ts"]);
        assert!(doc.section_items("Notes").is_empty());
    }

    #[test]
    fn field_lines_inside_sections_are_body() {
        let doc = Document::parse("# T\n\n## Context\n**Status**: fake\n");
        assert!(doc.field("Status").is_none());
        assert_eq!(doc.section_text("Context"), "**Status**: fake");
    }

    #[test]
    fn writer_output_parses_back() {
        let mut w = Writer::new("qa-agent Current State");
        w.field("Agent ID", "qa-agent")
            .section("Approach", "")
            .list_section("Remaining Steps", &["one".to_string(), "two".to_string()], Some(false));
        let text = w.finish();
        assert!(text.contains("## Approach\n_None_\n"));
        let doc = Document::parse(&text);
        assert_eq!(doc.field_value("Agent ID"), Some("qa-agent"));
        assert_eq!(doc.section_items("Remaining Steps"), vec!["one", "two"]);
    }
}
