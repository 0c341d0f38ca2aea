use crate::core::rules::{OptionRule, RuleKind, RuleTable, VALUE_PLACEHOLDER};
use crate::domain::model::{OptionDirective, TranslatedAssignment};

/// Reason a value rule refuses a directive: the text would be expanded by
/// the shell that sources the env file.
pub const SHELL_EXPANSION: &str = "value contains shell expansion";
/// Reason a flag rule refuses a directive.
pub const NOT_A_BOOLEAN: &str = "value has no boolean meaning";
/// Reason a value rule refuses a bare flag.
pub const MISSING_VALUE: &str = "option needs a value";

/// Why a known directive produced nothing although it was present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MistypedDirective {
    pub name: String,
    pub expected: RuleKind,
    pub value: String,
    pub reason: &'static str,
}

/// Everything translated from one package's directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub assignments: Vec<TranslatedAssignment>,
    pub unknown: Vec<String>,
    pub mistyped: Vec<MistypedDirective>,
}

/// Rule-table driven translation. Pure: no I/O and no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct OptionTranslator<'a> {
    rules: &'a RuleTable,
}

impl<'a> OptionTranslator<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'a RuleTable {
        self.rules
    }

    pub fn is_known(&self, directive: &OptionDirective) -> bool {
        self.rules.is_known(&directive.name)
    }

    pub fn translate(&self, directive: &OptionDirective) -> Vec<TranslatedAssignment> {
        self.rules
            .rules_for(&directive.name)
            .iter()
            .flat_map(|rule| apply_rule(rule, directive).unwrap_or_default())
            .collect()
    }

    pub fn translate_all(&self, directives: &[OptionDirective]) -> TranslationOutcome {
        let mut outcome = TranslationOutcome::default();

        for directive in directives {
            let rules = self.rules.rules_for(&directive.name);
            if rules.is_empty() {
                tracing::debug!("No translation rule for option '{}'", directive.name);
                outcome.unknown.push(directive.name.clone());
                continue;
            }

            let mut refusal = None;
            let mut applicable = false;
            for rule in rules {
                match apply_rule(rule, directive) {
                    Ok(assignments) => {
                        applicable = true;
                        outcome.assignments.extend(assignments);
                    }
                    Err(reason) => refusal = refusal.or(Some((rule.kind, reason))),
                }
            }

            if let (false, Some((expected, reason))) = (applicable, refusal) {
                outcome.mistyped.push(MistypedDirective {
                    name: directive.name.clone(),
                    expected,
                    value: directive.to_string(),
                    reason,
                });
            }
        }

        outcome
    }
}

/// `Err` when the directive's value cannot be used the way the rule needs;
/// `Ok(vec![])` when it can but the rule does not fire.
fn apply_rule(
    rule: &OptionRule,
    directive: &OptionDirective,
) -> Result<Vec<TranslatedAssignment>, &'static str> {
    match rule.kind {
        RuleKind::Flag => {
            let enabled = directive.value.as_bool().ok_or(NOT_A_BOOLEAN)?;
            if enabled != rule.when {
                return Ok(Vec::new());
            }
            Ok(
                rule.assign
                    .iter()
                    .map(|t| TranslatedAssignment::new(&t.variable, &t.value))
                    .collect(),
            )
        }
        RuleKind::Value => {
            let text = directive.value.as_text().ok_or(MISSING_VALUE)?.trim();
            if text.is_empty() {
                return Ok(Vec::new());
            }
            if text.contains(['$', '`']) {
                return Err(SHELL_EXPANSION);
            }
            let value = substitute_tokens(text, rule);
            Ok(
                rule.assign
                    .iter()
                    .map(|t| TranslatedAssignment::new(&t.variable, t.value.replace(VALUE_PLACEHOLDER, &value)))
                    .collect(),
            )
        }
    }
}

fn substitute_tokens(text: &str, rule: &OptionRule) -> String {
    if rule.substitutions.is_empty() {
        return text.to_string();
    }
    text.split_whitespace()
        .map(|token| {
            rule.substitutions
                .get(token)
                .map(String::as_str)
                .unwrap_or(token)
        })
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
