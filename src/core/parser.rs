use crate::domain::model::{DirectiveValue, OptionDirective};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Section whose keys describe the package rather than its build.
pub const METADATA_SECTION: &str = "package";

/// A line that could not be understood. It is skipped; the rest of the file
/// is still parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line_number}: {reason}: {content}")]
pub struct MalformedLine {
    pub line_number: usize,
    pub content: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    /// Build directives in file order, one per name.
    pub directives: Vec<OptionDirective>,
    /// `[package]` keys such as `name` and `url`.
    pub metadata: BTreeMap<String, String>,
    pub malformed: Vec<MalformedLine>,
}

impl ParsedOptions {
    pub fn get(&self, name: &str) -> Option<&OptionDirective> {
        self.directives.iter().find(|d| d.name == name)
    }

    pub fn package_name(&self) -> Option<&str> {
        self.metadata.get("name").map(String::as_str)
    }
}

fn key_pattern() -> &'static Regex {
    static KEY: OnceLock<Regex> = OnceLock::new();
    KEY.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.+\-]*$").expect("valid key regex"))
}

fn section_pattern() -> &'static Regex {
    static SECTION: OnceLock<Regex> = OnceLock::new();
    SECTION.get_or_init(|| Regex::new(r"^\[([A-Za-z0-9_.\- ]+)\]$").expect("valid section regex"))
}

enum Line<'a> {
    Skip,
    Section(&'a str),
    Entry { key: &'a str, value: Option<&'a str> },
}

fn classify(line: &str) -> Result<Line<'_>, String> {
    if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
        return Ok(Line::Skip);
    }

    if line.starts_with('[') {
        return section_pattern()
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| Line::Section(m.as_str().trim()))
            .ok_or_else(|| "invalid section header".to_string());
    }

    let (key, value) = match line.split_once('=') {
        Some((key, value)) => (key.trim_end(), Some(value.trim())),
        None => (line, None),
    };

    if key.is_empty() {
        return Err("missing option name".to_string());
    }
    if !key_pattern().is_match(key) {
        return Err("invalid option name".to_string());
    }

    Ok(Line::Entry { key, value })
}

fn directive_value(value: Option<&str>) -> DirectiveValue {
    match value {
        None => DirectiveValue::Flag(true),
        Some(v) if v.eq_ignore_ascii_case("true") => DirectiveValue::Flag(true),
        Some(v) if v.eq_ignore_ascii_case("false") => DirectiveValue::Flag(false),
        Some(v) => DirectiveValue::Text(v.to_string()),
    }
}

/// Parser for `options.conf`-style files: `KEY=VALUE` and bare `KEY` lines,
/// optional `[section]` headers, `#`/`;` comments.
#[derive(Debug, Clone, Default)]
pub struct OptionsFileParser;

impl OptionsFileParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, content: &str) -> ParsedOptions {
        let mut parsed = ParsedOptions::default();
        let mut section: Option<String> = None;

        for (index, raw) in content.lines().enumerate() {
            let line_number = index + 1;
            let line = raw.trim();

            match classify(line) {
                Ok(Line::Skip) => {}
                Ok(Line::Section(name)) => section = Some(name.to_string()),
                Ok(Line::Entry { key, value }) => {
                    if section.as_deref() == Some(METADATA_SECTION) {
                        parsed
                            .metadata
                            .insert(key.to_string(), value.unwrap_or_default().to_string());
                        continue;
                    }

                    // Later occurrences override earlier ones and take their place in order.
                    if let Some(pos) = parsed.directives.iter().position(|d| d.name == key) {
                        tracing::debug!(
                            "Option '{}' redefined on line {}, previous value dropped",
                            key,
                            line_number
                        );
                        parsed.directives.remove(pos);
                    }

                    parsed.directives.push(OptionDirective {
                        name: key.to_string(),
                        value: directive_value(value),
                        line_number,
                        section: section.clone(),
                    });
                }
                Err(reason) => {
                    tracing::debug!("Skipping malformed line {}: {}", line_number, reason);
                    parsed.malformed.push(MalformedLine {
                        line_number,
                        content: raw.to_string(),
                        reason,
                    });
                }
            }
        }

        parsed
    }
}
