use crate::domain::model::{PackageAtom, PackageIdentity};
use crate::utils::error::{ClearportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Controls how detailed matcher records are turned into atom sets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MappingOptions {
    /// Use every candidate in `all_matches` instead of only `gentoo_match`.
    pub include_alternates: bool,
    pub min_confidence: f64,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            include_alternates: false,
            min_confidence: 0.0,
        }
    }
}

/// One record of the persisted mapping table, as written by `build-mapping`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub gentoo_match: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub all_matches: Vec<String>,
}

impl MatchRecord {
    pub fn unmatched() -> Self {
        Self {
            gentoo_match: None,
            confidence: 0.0,
            all_matches: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MappingEntry {
    Atoms(Vec<String>),
    Single(String),
    Match(MatchRecord),
}

impl MappingEntry {
    fn into_atoms(self, options: &MappingOptions) -> Vec<String> {
        match self {
            Self::Atoms(atoms) => atoms,
            Self::Single(atom) => vec![atom],
            Self::Match(record) => {
                if record.confidence < options.min_confidence {
                    return Vec::new();
                }
                if options.include_alternates && !record.all_matches.is_empty() {
                    record.all_matches
                } else {
                    record.gentoo_match.into_iter().collect()
                }
            }
        }
    }
}

/// Read-only association of source identities with target atoms.
///
/// Identities without atoms are never stored: an unmapped package simply has
/// no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMapping {
    entries: BTreeMap<PackageIdentity, BTreeSet<PackageAtom>>,
}

impl PackageMapping {
    pub fn from_entries<I, A>(entries: I) -> Self
    where
        I: IntoIterator<Item = (PackageIdentity, A)>,
        A: IntoIterator<Item = PackageAtom>,
    {
        let mut mapping = BTreeMap::new();
        for (identity, atoms) in entries {
            let atoms: BTreeSet<PackageAtom> = atoms
                .into_iter()
                .filter(|atom| {
                    let valid = atom.is_valid();
                    if !valid {
                        tracing::warn!("Dropping invalid atom '{}' for {}", atom, identity);
                    }
                    valid
                })
                .collect();
            if atoms.is_empty() {
                continue;
            }
            mapping
                .entry(identity)
                .or_insert_with(BTreeSet::new)
                .extend(atoms);
        }
        Self { entries: mapping }
    }

    /// Parses the JSON mapping table. Both the matcher's detailed records and
    /// a plain `identity -> [atom, ...]` object are accepted.
    pub fn from_json_str(content: &str, options: &MappingOptions) -> Result<Self> {
        let raw: BTreeMap<String, Option<MappingEntry>> = serde_json::from_str(content)?;
        let entries = raw.into_iter().map(|(identity, entry)| {
            let atoms = entry
                .map(|e| e.into_atoms(options))
                .unwrap_or_default()
                .into_iter()
                .map(PackageAtom::new)
                .collect::<Vec<_>>();
            (PackageIdentity::new(identity), atoms)
        });
        Ok(Self::from_entries(entries))
    }

    pub fn from_json_bytes(path: &str, data: &[u8], options: &MappingOptions) -> Result<Self> {
        let content = std::str::from_utf8(data).map_err(|e| ClearportError::MappingError {
            path: path.to_string(),
            message: format!("not valid UTF-8: {}", e),
        })?;
        Self::from_json_str(content, options).map_err(|e| ClearportError::MappingError {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Atoms mapped to `identity`; empty when the package has no equivalent.
    pub fn lookup(&self, identity: &PackageIdentity) -> BTreeSet<PackageAtom> {
        self.entries.get(identity).cloned().unwrap_or_default()
    }

    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    /// Mapped identities in sorted order.
    pub fn all_mapped_identities(&self) -> impl Iterator<Item = &PackageIdentity> + '_ {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn atom_count(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }
}
