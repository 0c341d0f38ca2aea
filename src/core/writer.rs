use crate::domain::model::{MergePolicy, OverrideStanza, PackageAtom, TranslatedAssignment};
use crate::utils::error::{ClearportError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::OnceLock;

/// Compiler and linker options whose argument is the following word.
const ARGUMENT_OPTIONS: &[&str] = &[
    "--param",
    "-D",
    "-I",
    "-L",
    "-MF",
    "-MQ",
    "-MT",
    "-T",
    "-U",
    "-Xassembler",
    "-Xclang",
    "-Xlinker",
    "-Xpreprocessor",
    "-idirafter",
    "-imacros",
    "-include",
    "-iprefix",
    "-iquote",
    "-isysroot",
    "-isystem",
    "-l",
    "-mllvm",
    "-o",
    "-u",
    "-x",
    "-z",
];

fn reference_pattern() -> &'static Regex {
    static REFERENCE: OnceLock<Regex> = OnceLock::new();
    REFERENCE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid reference regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Accumulating,
    Finalized,
}

#[derive(Debug, Clone, Default)]
struct StanzaBuilder {
    variables: Vec<(String, String)>,
}

impl StanzaBuilder {
    fn merge(&mut self, assignment: &TranslatedAssignment, policy: MergePolicy) {
        let index = match self
            .variables
            .iter()
            .position(|(name, _)| *name == assignment.variable)
        {
            Some(index) => index,
            None => {
                self.variables
                    .push((assignment.variable.clone(), String::new()));
                self.variables.len() - 1
            }
        };
        let slot = &mut self.variables[index].1;

        match policy {
            MergePolicy::LastWins => *slot = assignment.value.trim().to_string(),
            MergePolicy::Append => append_tokens(slot, &assignment.value),
        }
    }
}

/// Appends whitespace-separated tokens, skipping those already present.
/// Options that take a separate argument, and their arguments, are always
/// kept: `-include a.h -include b.h` needs both `-include` words.
fn append_tokens(current: &mut String, addition: &str) {
    let mut argument_pending = false;
    for token in addition.split_whitespace() {
        let keep = argument_pending || ARGUMENT_OPTIONS.contains(&token);
        argument_pending = !argument_pending && ARGUMENT_OPTIONS.contains(&token);
        if !keep && current.split_whitespace().any(|existing| existing == token) {
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(token);
    }
}

fn referenced_variables(value: &str) -> BTreeSet<&str> {
    reference_pattern()
        .captures_iter(value)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Moves every variable in front of the first variable that references it as
/// `${NAME}`, since portage sources env files top to bottom. Otherwise the
/// first-contribution order is kept. Reference cycles keep their order.
fn order_definitions_first(mut pending: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending.iter().position(|(name, value)| {
            referenced_variables(value)
                .into_iter()
                .filter(|referenced| *referenced != name.as_str())
                .all(|referenced| !pending.iter().any(|(other, _)| other == referenced))
        });
        match ready {
            Some(index) => ordered.push(pending.remove(index)),
            None => {
                tracing::warn!("Variables reference each other in a cycle, keeping their order");
                ordered.append(&mut pending);
            }
        }
    }
    ordered
}

/// Collects translated assignments per atom and hands out the merged stanzas
/// once the run is complete.
///
/// The writer is single-use: after [`OverrideWriter::finalize`] every further
/// [`OverrideWriter::record`] is rejected with `AlreadyFinalized`.
#[derive(Debug, Clone)]
pub struct OverrideWriter {
    policies: BTreeMap<String, MergePolicy>,
    stanzas: BTreeMap<PackageAtom, StanzaBuilder>,
    state: WriterState,
}

impl OverrideWriter {
    pub fn new(policies: BTreeMap<String, MergePolicy>) -> Self {
        Self {
            policies,
            stanzas: BTreeMap::new(),
            state: WriterState::Accumulating,
        }
    }

    pub fn policy_for(&self, variable: &str) -> MergePolicy {
        self.policies.get(variable).copied().unwrap_or_default()
    }

    pub fn is_finalized(&self) -> bool {
        self.state == WriterState::Finalized
    }

    pub fn record(&mut self, atom: &PackageAtom, assignments: &[TranslatedAssignment]) -> Result<()> {
        if self.is_finalized() {
            return Err(ClearportError::AlreadyFinalized {
                atom: atom.to_string(),
            });
        }
        if assignments.is_empty() {
            return Ok(());
        }

        let policies = &self.policies;
        let builder = self.stanzas.entry(atom.clone()).or_default();
        for assignment in assignments {
            let policy = policies.get(&assignment.variable).copied().unwrap_or_default();
            builder.merge(assignment, policy);
        }
        tracing::trace!("Recorded {} assignments for {}", assignments.len(), atom);
        Ok(())
    }

    /// Switches to the read-only state and returns one stanza per atom that
    /// received a non-empty value, ordered by atom. Within a stanza a
    /// referenced variable precedes its users. Calling it again returns the
    /// same stanzas.
    pub fn finalize(&mut self) -> Vec<OverrideStanza> {
        self.state = WriterState::Finalized;
        self.stanzas
            .iter()
            .filter_map(|(atom, builder)| {
                let variables: Vec<(String, String)> = builder
                    .variables
                    .iter()
                    .filter(|(_, value)| !value.is_empty())
                    .cloned()
                    .collect();
                (!variables.is_empty()).then(|| OverrideStanza {
                    atom: atom.clone(),
                    variables: order_definitions_first(variables),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Render append variables as `VAR="${VAR} ..."` so make.conf values survive.
    pub extend_globals: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            extend_globals: true,
        }
    }
}

/// True when `rest` (the text after a `$`) starts with a plain `{NAME}`.
fn starts_with_reference(rest: &str) -> bool {
    let Some(body) = rest.strip_prefix('{') else {
        return false;
    };
    let Some((name, _)) = body.split_once('}') else {
        return false;
    };
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escapes a value for a double-quoted bash assignment. Plain `${NAME}`
/// references stay live; every other `$` is literal, so no command or
/// arithmetic substitution survives.
fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (index, c) in value.char_indices() {
        let needs_escape = match c {
            '"' | '\\' | '`' => true,
            '$' => !starts_with_reference(&value[index + 1..]),
            _ => false,
        };
        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn operator_prefix(operator: &str) -> &'static str {
    match operator {
        "" => "",
        ">=" => "ge-",
        "<=" => "le-",
        ">" => "gt-",
        "<" => "lt-",
        "=" => "eq-",
        "~" => "rev-",
        _ => "op-",
    }
}

/// File name under `env/` for an atom, e.g. `dev-lang_python.conf` or
/// `ge-dev-libs_foo-1.2.conf` for `>=dev-libs/foo-1.2`.
pub fn env_file_name(atom: &PackageAtom) -> String {
    let atom = atom.as_str();
    let body = atom.trim_start_matches(['<', '>', '=', '~', '!']);
    let operator = &atom[..atom.len() - body.len()];
    let sanitized: String = body
        .chars()
        .map(|c| match c {
            '/' | ':' => '_',
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+') => c,
            _ => '-',
        })
        .collect();
    format!(
        "{}{}.conf",
        operator_prefix(operator),
        sanitized.trim_start_matches(['-', '.'])
    )
}

/// One distinct env file name per stanza, in stanza order. Atoms whose
/// sanitized names collide get a numeric suffix.
pub fn assign_env_files(stanzas: &[OverrideStanza]) -> Vec<String> {
    let mut used = HashSet::new();
    stanzas
        .iter()
        .map(|stanza| {
            let base = env_file_name(&stanza.atom);
            let mut name = base.clone();
            let mut counter = 2;
            while !used.insert(name.clone()) {
                name = format!("{}-{}.conf", base.trim_end_matches(".conf"), counter);
                counter += 1;
            }
            if name != base {
                tracing::warn!("Env file {} already taken, {} uses {}", base, stanza.atom, name);
            }
            name
        })
        .collect()
}

impl OverrideStanza {
    /// Portage env file body: an atom comment followed by one assignment per line.
    pub fn render(&self, policies: &BTreeMap<String, MergePolicy>, options: &RenderOptions) -> String {
        let mut out = format!("# {}\n", self.atom);
        for (variable, value) in &self.variables {
            let policy = policies.get(variable).copied().unwrap_or_default();
            let value = escape_value(value);
            if options.extend_globals && policy == MergePolicy::Append {
                out.push_str(&format!("{}=\"${{{}}} {}\"\n", variable, variable, value));
            } else {
                out.push_str(&format!("{}=\"{}\"\n", variable, value));
            }
        }
        out
    }
}

/// `package.env` index pointing each atom at its env file, as assigned by
/// [`assign_env_files`].
pub fn render_package_env(stanzas: &[OverrideStanza], files: &[String]) -> String {
    let mut out = String::from("# Generated by clearport from Clear Linux options.conf files\n");
    for (stanza, file) in stanzas.iter().zip(files) {
        out.push_str(&format!("{} {}\n", stanza.atom, file));
    }
    out
}
