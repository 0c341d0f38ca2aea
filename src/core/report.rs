use crate::core::parser::MalformedLine;
use crate::core::translator::MistypedDirective;
use crate::domain::model::PackageIdentity;
use crate::utils::error::{ClearportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedEntry {
    pub package: PackageIdentity,
    pub line_number: usize,
    pub content: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistypedEntry {
    pub package: PackageIdentity,
    pub directive: String,
    pub expected: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounters {
    pub packages_seen: usize,
    pub packages_translated: usize,
    pub directives_seen: usize,
    pub directives_translated: usize,
    pub stanzas: usize,
}

/// Coverage diagnostics for human review. Nothing in here stops a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationReport {
    pub unmapped_packages: BTreeSet<PackageIdentity>,
    pub missing_options: BTreeSet<PackageIdentity>,
    /// Option name -> packages that declared it.
    pub unknown_options: BTreeMap<String, BTreeSet<PackageIdentity>>,
    pub malformed_lines: Vec<MalformedEntry>,
    pub mistyped_directives: Vec<MistypedEntry>,
    pub counters: ReportCounters,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    kind: &'a str,
    package: &'a str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    #[serde(flatten)]
    report: &'a TranslationReport,
}

impl TranslationReport {
    pub fn record_unmapped(&mut self, identity: &PackageIdentity) {
        self.unmapped_packages.insert(identity.clone());
    }

    pub fn record_missing_options(&mut self, identity: &PackageIdentity) {
        self.missing_options.insert(identity.clone());
    }

    pub fn record_unknown(&mut self, identity: &PackageIdentity, option: &str) {
        self.unknown_options
            .entry(option.to_string())
            .or_default()
            .insert(identity.clone());
    }

    pub fn record_malformed(&mut self, identity: &PackageIdentity, line: &MalformedLine) {
        self.malformed_lines.push(MalformedEntry {
            package: identity.clone(),
            line_number: line.line_number,
            content: line.content.clone(),
            reason: line.reason.clone(),
        });
    }

    pub fn record_mistyped(&mut self, identity: &PackageIdentity, mistyped: &MistypedDirective) {
        self.mistyped_directives.push(MistypedEntry {
            package: identity.clone(),
            directive: mistyped.value.clone(),
            expected: format!("{:?}", mistyped.expected).to_lowercase(),
            reason: mistyped.reason.to_string(),
        });
    }

    pub fn is_unmapped(&self, identity: &PackageIdentity) -> bool {
        self.unmapped_packages.contains(identity)
    }

    pub fn is_unknown_option(&self, option: &str) -> bool {
        self.unknown_options.contains_key(option)
    }

    /// Share of seen directives that produced at least one rule match.
    pub fn directive_coverage(&self) -> f64 {
        if self.counters.directives_seen == 0 {
            return 1.0;
        }
        self.counters.directives_translated as f64 / self.counters.directives_seen as f64
    }

    pub fn to_json(&self) -> Result<String> {
        let report = JsonReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            report: self,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    /// One `kind,package,detail` row per finding.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        for identity in &self.unmapped_packages {
            writer.serialize(CsvRow {
                kind: "unmapped_package",
                package: identity.as_str(),
                detail: String::new(),
            })?;
        }
        for identity in &self.missing_options {
            writer.serialize(CsvRow {
                kind: "missing_options",
                package: identity.as_str(),
                detail: String::new(),
            })?;
        }
        for (option, packages) in &self.unknown_options {
            for identity in packages {
                writer.serialize(CsvRow {
                    kind: "unknown_option",
                    package: identity.as_str(),
                    detail: option.clone(),
                })?;
            }
        }
        for entry in &self.malformed_lines {
            writer.serialize(CsvRow {
                kind: "malformed_line",
                package: entry.package.as_str(),
                detail: format!("{}: {}", entry.line_number, entry.content.trim()),
            })?;
        }
        for entry in &self.mistyped_directives {
            writer.serialize(CsvRow {
                kind: "mistyped_directive",
                package: entry.package.as_str(),
                detail: format!(
                    "{} (expected {}: {})",
                    entry.directive, entry.expected, entry.reason
                ),
            })?;
        }

        writer
            .into_inner()
            .map_err(|e| ClearportError::ProcessingError {
                message: format!("CSV report flush failed: {}", e),
            })
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "📊 Packages: {} seen, {} translated, {} unmapped, {} without options file",
            self.counters.packages_seen,
            self.counters.packages_translated,
            self.unmapped_packages.len(),
            self.missing_options.len()
        );
        tracing::info!(
            "📊 Directives: {}/{} translated ({:.1}%), {} unknown option names, {} malformed lines",
            self.counters.directives_translated,
            self.counters.directives_seen,
            self.directive_coverage() * 100.0,
            self.unknown_options.len(),
            self.malformed_lines.len()
        );
    }
}
