use serde::{Deserialize, Serialize};
use std::fmt;

/// Package name in the source distribution (a Clear Linux package repo name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageIdentity(String);

impl PackageIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageIdentity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Target atom, `category/name` optionally carrying an operator, version or slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageAtom(String);

impl PackageAtom {
    pub fn new(atom: impl Into<String>) -> Self {
        Self(atom.into())
    }

    /// Checks the shape portage needs to key `package.env`: one category
    /// separator and no whitespace.
    pub fn is_valid(&self) -> bool {
        let Some((category, rest)) = self.0.split_once('/') else {
            return false;
        };
        let category = category.trim_start_matches(['<', '>', '=', '~', '!']);
        !category.is_empty()
            && !rest.is_empty()
            && !rest.contains('/')
            && !self.0.chars().any(char::is_whitespace)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageAtom {
    fn from(atom: &str) -> Self {
        Self::new(atom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectiveValue {
    Flag(bool),
    Text(String),
}

impl DirectiveValue {
    /// Boolean reading of the value. Text such as `yes`, `off` or a number is
    /// accepted; anything else has no boolean meaning.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            Self::Text(text) => {
                let text = text.trim();
                match text.to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" => Some(true),
                    "false" | "no" | "off" => Some(false),
                    _ if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) => {
                        Some(text.chars().any(|c| c != '0'))
                    }
                    _ => None,
                }
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Flag(_) => None,
        }
    }
}

/// One option declared in a source options file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDirective {
    pub name: String,
    pub value: DirectiveValue,
    pub line_number: usize,
    pub section: Option<String>,
}

impl OptionDirective {
    pub fn new(name: impl Into<String>, value: DirectiveValue) -> Self {
        Self {
            name: name.into(),
            value,
            line_number: 0,
            section: None,
        }
    }

    pub fn flag(name: impl Into<String>, enabled: bool) -> Self {
        Self::new(name, DirectiveValue::Flag(enabled))
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, DirectiveValue::Text(value.into()))
    }
}

impl fmt::Display for OptionDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            DirectiveValue::Flag(true) => write!(f, "{}", self.name),
            DirectiveValue::Flag(false) => write!(f, "{}=false", self.name),
            DirectiveValue::Text(text) => write!(f, "{}={}", self.name, text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedAssignment {
    pub variable: String,
    pub value: String,
}

impl TranslatedAssignment {
    pub fn new(variable: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    #[default]
    Append,
    LastWins,
}

/// Final override block for one atom. Variables keep the order in which they
/// first received a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideStanza {
    pub atom: PackageAtom,
    pub variables: Vec<(String, String)>,
}

impl OverrideStanza {
    pub fn get(&self, variable: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, value)| value.as_str())
    }
}
