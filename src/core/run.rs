use crate::core::mapping::PackageMapping;
use crate::core::parser::{OptionsFileParser, ParsedOptions};
use crate::core::report::TranslationReport;
use crate::core::rules::RuleTable;
use crate::core::translator::OptionTranslator;
use crate::core::writer::OverrideWriter;
use crate::domain::model::{OverrideStanza, PackageIdentity};
use crate::utils::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageOutcome {
    Unmapped,
    /// Number of atoms the package's assignments were recorded for.
    Recorded { atoms: usize, assignments: usize },
}

/// One pass over the source packages: parse, translate, record per atom.
pub struct TranslationRun<'a> {
    mapping: &'a PackageMapping,
    parser: OptionsFileParser,
    translator: OptionTranslator<'a>,
    writer: OverrideWriter,
    report: TranslationReport,
}

impl<'a> TranslationRun<'a> {
    pub fn new(mapping: &'a PackageMapping, rules: &'a RuleTable) -> Self {
        Self {
            mapping,
            parser: OptionsFileParser::new(),
            translator: OptionTranslator::new(rules),
            writer: OverrideWriter::new(rules.policies().clone()),
            report: TranslationReport::default(),
        }
    }

    pub fn report(&self) -> &TranslationReport {
        &self.report
    }

    pub fn note_missing_options(&mut self, identity: &PackageIdentity) {
        tracing::debug!("No options file for mapped package {}", identity);
        self.report.record_missing_options(identity);
    }

    pub fn process(&mut self, identity: &PackageIdentity, options_text: &str) -> Result<PackageOutcome> {
        self.report.counters.packages_seen += 1;

        let atoms = self.mapping.lookup(identity);
        if atoms.is_empty() {
            tracing::debug!("No target atom for {}, skipping", identity);
            self.report.record_unmapped(identity);
            return Ok(PackageOutcome::Unmapped);
        }

        let parsed = self.parser.parse(options_text);
        self.check_package_name(identity, &parsed);
        for line in &parsed.malformed {
            tracing::warn!("{}: {}", identity, line);
            self.report.record_malformed(identity, line);
        }

        let outcome = self.translator.translate_all(&parsed.directives);
        for option in &outcome.unknown {
            self.report.record_unknown(identity, option);
        }
        for mistyped in &outcome.mistyped {
            tracing::debug!("{}: '{}' does not fit its rule", identity, mistyped.value);
            self.report.record_mistyped(identity, mistyped);
        }

        let counters = &mut self.report.counters;
        counters.directives_seen += parsed.directives.len();
        counters.directives_translated +=
            parsed.directives.len() - outcome.unknown.len() - outcome.mistyped.len();

        for atom in &atoms {
            self.writer.record(atom, &outcome.assignments)?;
        }
        if !outcome.assignments.is_empty() {
            self.report.counters.packages_translated += 1;
        }

        tracing::debug!(
            "{} -> {} atom(s), {} assignment(s)",
            identity,
            atoms.len(),
            outcome.assignments.len()
        );
        Ok(PackageOutcome::Recorded {
            atoms: atoms.len(),
            assignments: outcome.assignments.len(),
        })
    }

    fn check_package_name(&self, identity: &PackageIdentity, parsed: &ParsedOptions) {
        if let Some(name) = parsed.package_name() {
            if name != identity.as_str() {
                tracing::warn!(
                    "Options file for {} declares package name '{}'",
                    identity,
                    name
                );
            }
        }
    }

    pub fn finish(mut self) -> (Vec<OverrideStanza>, TranslationReport) {
        let stanzas = self.writer.finalize();
        self.report.counters.stanzas = stanzas.len();
        (stanzas, self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::OptionRule;
    use crate::domain::model::PackageAtom;

    fn mapping() -> PackageMapping {
        PackageMapping::from_entries(vec![
            (PackageIdentity::from("example"), vec![PackageAtom::from("dev-lang/example")]),
            (PackageIdentity::from("example-extras"), vec![PackageAtom::from("dev-lang/example")]),
            (
                PackageIdentity::from("gcc"),
                vec![PackageAtom::from("sys-devel/gcc"), PackageAtom::from("sys-libs/libgcc")],
            ),
        ])
    }

    fn rules() -> RuleTable {
        RuleTable::empty()
            .with_rule(OptionRule::flag("enable_lto", true).assign("CFLAGS", "-flto"))
            .with_rule(OptionRule::value("cflags").assign("CFLAGS", "{value}"))
    }

    #[test]
    fn test_file_order_drives_value_order() {
        let mapping = mapping();
        let rules = rules();
        let mut run = TranslationRun::new(&mapping, &rules);
        run.process(&PackageIdentity::from("example"), "enable_lto=true\ncflags=-march=native\n")
            .unwrap();
        let (stanzas, _) = run.finish();
        assert_eq!(stanzas.len(), 1);
        assert_eq!(stanzas[0].atom.as_str(), "dev-lang/example");
        assert_eq!(stanzas[0].get("CFLAGS"), Some("-flto -march=native"));
    }

    #[test]
    fn test_many_to_one_merges_contributions() {
        let mapping = mapping();
        let rules = rules();
        let mut run = TranslationRun::new(&mapping, &rules);
        run.process(&PackageIdentity::from("example"), "cflags=-O2\n").unwrap();
        run.process(&PackageIdentity::from("example-extras"), "cflags=-flto\nenable_lto\n")
            .unwrap();
        let (stanzas, _) = run.finish();
        assert_eq!(stanzas[0].get("CFLAGS"), Some("-O2 -flto"));
    }

    #[test]
    fn test_one_to_many_records_every_atom() {
        let mapping = mapping();
        let rules = rules();
        let mut run = TranslationRun::new(&mapping, &rules);
        let outcome = run.process(&PackageIdentity::from("gcc"), "enable_lto\n").unwrap();
        assert_eq!(outcome, PackageOutcome::Recorded { atoms: 2, assignments: 1 });
        let (stanzas, report) = run.finish();
        assert_eq!(stanzas.len(), 2);
        assert_eq!(report.counters.stanzas, 2);
    }

    #[test]
    fn test_unmapped_package_is_reported_and_run_continues() {
        let mapping = mapping();
        let rules = rules();
        let mut run = TranslationRun::new(&mapping, &rules);
        let outcome = run.process(&PackageIdentity::from("clr-boot-manager"), "enable_lto\n").unwrap();
        assert_eq!(outcome, PackageOutcome::Unmapped);
        run.process(&PackageIdentity::from("example"), "enable_lto\n").unwrap();

        let (stanzas, report) = run.finish();
        assert_eq!(stanzas.len(), 1);
        assert!(report.is_unmapped(&PackageIdentity::from("clr-boot-manager")));
        assert_eq!(report.counters.packages_seen, 2);
        assert_eq!(report.counters.packages_translated, 1);
    }

    #[test]
    fn test_unknown_and_malformed_are_reported() {
        let mapping = mapping();
        let rules = rules();
        let mut run = TranslationRun::new(&mapping, &rules);
        run.process(&PackageIdentity::from("example"), "autoupdate\nnot valid!\nenable_lto\n")
            .unwrap();
        let (stanzas, report) = run.finish();
        assert_eq!(stanzas[0].get("CFLAGS"), Some("-flto"));
        assert!(report.is_unknown_option("autoupdate"));
        assert_eq!(report.malformed_lines.len(), 1);
        assert_eq!(report.malformed_lines[0].line_number, 2);
        assert_eq!(report.counters.directives_seen, 2);
        assert_eq!(report.counters.directives_translated, 1);
    }

    #[test]
    fn test_mapped_package_without_assignments_has_no_stanza() {
        let mapping = mapping();
        let rules = rules();
        let mut run = TranslationRun::new(&mapping, &rules);
        run.process(&PackageIdentity::from("example"), "enable_lto=false\n").unwrap();
        run.note_missing_options(&PackageIdentity::from("gcc"));
        let (stanzas, report) = run.finish();
        assert!(stanzas.is_empty());
        assert!(report.missing_options.contains(&PackageIdentity::from("gcc")));
    }
}
