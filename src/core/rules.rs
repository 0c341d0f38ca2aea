use crate::domain::model::MergePolicy;
use crate::utils::error::{ClearportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Placeholder replaced by a value rule with the directive's text.
pub const VALUE_PLACEHOLDER: &str = "{value}";

/// Compiler flag variables a Clear Linux optimization applies to.
pub const COMPILER_FLAG_VARIABLES: &[&str] = &["CFLAGS", "CXXFLAGS", "FCFLAGS", "FFLAGS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Fires when the directive's boolean equals `when`.
    Flag,
    /// Copies the directive's text into the templates.
    Value,
}

fn default_kind() -> RuleKind {
    RuleKind::Flag
}

fn default_when() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentTemplate {
    pub variable: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRule {
    pub option: String,
    #[serde(default = "default_kind")]
    pub kind: RuleKind,
    #[serde(default = "default_when")]
    pub when: bool,
    pub assign: Vec<AssignmentTemplate>,
    /// Per-token rewrites applied to a value rule's input.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub substitutions: BTreeMap<String, String>,
}

impl OptionRule {
    pub fn flag(option: &str, when: bool) -> Self {
        Self {
            option: option.to_string(),
            kind: RuleKind::Flag,
            when,
            assign: Vec::new(),
            substitutions: BTreeMap::new(),
        }
    }

    pub fn value(option: &str) -> Self {
        Self {
            kind: RuleKind::Value,
            ..Self::flag(option, true)
        }
    }

    pub fn assign(mut self, variable: &str, value: &str) -> Self {
        self.assign.push(AssignmentTemplate {
            variable: variable.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Same token list appended to every compiler flag variable.
    pub fn assign_compiler_flags(self, tokens: &str) -> Self {
        COMPILER_FLAG_VARIABLES
            .iter()
            .fold(self, |rule, variable| rule.assign(variable, tokens))
    }

    pub fn substitute(mut self, from: &str, to: &str) -> Self {
        self.substitutions.insert(from.to_string(), to.to_string());
        self
    }
}

/// Rule table as written in TOML: either a standalone rules file or the
/// `[rules]` section of a run config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTableConfig {
    /// Drop the built-in rules instead of extending them.
    #[serde(default)]
    pub replace_defaults: bool,
    #[serde(default)]
    pub options: Vec<OptionRule>,
    #[serde(default)]
    pub variables: BTreeMap<String, MergePolicy>,
}

/// Declarative mapping from source option names to target assignments, plus
/// the merge policy of every target variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: BTreeMap<String, Vec<OptionRule>>,
    policies: BTreeMap<String, MergePolicy>,
}

impl RuleTable {
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
            policies: BTreeMap::new(),
        }
    }

    pub fn with_rule(mut self, rule: OptionRule) -> Self {
        self.add_rule(rule);
        self
    }

    pub fn with_policy(mut self, variable: &str, policy: MergePolicy) -> Self {
        self.policies.insert(variable.to_string(), policy);
        self
    }

    pub fn add_rule(&mut self, rule: OptionRule) {
        self.rules.entry(rule.option.clone()).or_default().push(rule);
    }

    pub fn rules_for(&self, option: &str) -> &[OptionRule] {
        self.rules.get(option).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_known(&self, option: &str) -> bool {
        self.rules.contains_key(option)
    }

    pub fn policy_for(&self, variable: &str) -> MergePolicy {
        self.policies.get(variable).copied().unwrap_or_default()
    }

    pub fn policies(&self) -> &BTreeMap<String, MergePolicy> {
        &self.policies
    }

    pub fn option_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn from_config(config: RuleTableConfig) -> Result<Self> {
        let mut table = if config.replace_defaults {
            Self::empty()
        } else {
            Self::default()
        };

        for rule in config.options {
            validate_rule(&rule)?;
            table.add_rule(rule);
        }
        table.policies.extend(config.variables);
        Ok(table)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RuleTableConfig =
            toml::from_str(content).map_err(|e| ClearportError::ConfigValidationError {
                field: "rules".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        Self::from_config(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ClearportError::IoError)?;
        Self::from_toml_str(&content)
    }
}

fn validate_rule(rule: &OptionRule) -> Result<()> {
    let field = format!("rules.options.{}", rule.option);
    if rule.option.trim().is_empty() {
        return Err(ClearportError::MissingConfigError {
            field: "rules.options.option".to_string(),
        });
    }
    if rule.assign.is_empty() {
        return Err(ClearportError::ConfigValidationError {
            field,
            message: "rule has no assignments".to_string(),
        });
    }
    for template in &rule.assign {
        let valid_name = !template.variable.is_empty()
            && template
                .variable
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !template.variable.starts_with(|c: char| c.is_ascii_digit());
        if !valid_name {
            return Err(ClearportError::InvalidConfigValueError {
                field: field.clone(),
                value: template.variable.clone(),
                reason: "not a valid shell variable name".to_string(),
            });
        }
    }
    Ok(())
}

impl Default for RuleTable {
    /// Clear Linux autospec optimizations expressed as portage env overrides.
    fn default() -> Self {
        let mut table = Self::empty()
            .with_rule(
                OptionRule::flag("security_sensitive", true)
                    .assign_compiler_flags("-fzero-call-used-regs=used"),
            )
            .with_rule(
                OptionRule::flag("funroll-loops", true)
                    .assign_compiler_flags("-falign-functions=32 -fno-semantic-interposition"),
            )
            .with_rule(OptionRule::flag("optimize_size", true).assign_compiler_flags(
                "-Os -ffunction-sections -fdata-sections -fno-semantic-interposition",
            ))
            .with_rule(OptionRule::flag("fast-math", true).assign_compiler_flags("-ffast-math"))
            .with_rule(
                OptionRule::flag("use_lto", true)
                    .assign(
                        "WARNING_FLAGS",
                        "-Werror=odr -Werror=lto-type-mismatch -Werror=strict-aliasing",
                    )
                    .assign_compiler_flags("-O3 -flto=auto ${WARNING_FLAGS}"),
            )
            .with_rule(
                OptionRule::flag("use_lto", false)
                    .assign(
                        "DISABLE_LTO_FLAGS",
                        "-Wno-error=odr -Wno-error=lto-type-mismatch -Wno-error=strict-aliasing -fno-lto",
                    )
                    .assign_compiler_flags("${DISABLE_LTO_FLAGS}"),
            )
            .with_policy("WARNING_FLAGS", MergePolicy::LastWins)
            .with_policy("DISABLE_LTO_FLAGS", MergePolicy::LastWins);

        for (option, variable) in [
            ("cflags", "CFLAGS"),
            ("cxxflags", "CXXFLAGS"),
            ("fcflags", "FCFLAGS"),
            ("fflags", "FFLAGS"),
            ("ldflags", "LDFLAGS"),
        ] {
            table.add_rule(OptionRule::value(option).assign(variable, VALUE_PLACEHOLDER));
        }

        table
    }
}
