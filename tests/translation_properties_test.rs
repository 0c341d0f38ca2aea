use clearport::core::parser::OptionsFileParser;
use clearport::core::rules::{OptionRule, RuleTable, VALUE_PLACEHOLDER};
use clearport::core::translator::OptionTranslator;
use clearport::core::writer::OverrideWriter;
use clearport::core::{MergePolicy, PackageAtom, PackageIdentity, TranslatedAssignment};
use clearport::{ClearportError, PackageMapping, TranslationRun};
use std::collections::BTreeMap;

fn example_rules() -> RuleTable {
    RuleTable::empty()
        .with_rule(OptionRule::flag("enable_lto", true).assign("CFLAGS", "-flto"))
        .with_rule(OptionRule::value("cflags").assign("CFLAGS", VALUE_PLACEHOLDER))
        .with_rule(OptionRule::value("cc").assign("CC", VALUE_PLACEHOLDER))
        .with_policy("CC", MergePolicy::LastWins)
}

#[test]
fn test_parsed_directives_render_back_to_equivalent_lines() {
    let content = "use_lto\nfast-math=false\ncflags=-O2 -pipe\n# comment\n\nsecurity_sensitive = true\n";
    let parser = OptionsFileParser::new();
    let parsed = parser.parse(content);
    assert!(parsed.malformed.is_empty());

    let rendered: Vec<String> = parsed.directives.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec!["use_lto", "fast-math=false", "cflags=-O2 -pipe", "security_sensitive"]
    );

    let reparsed = parser.parse(&rendered.join("\n"));
    let names: Vec<&str> = reparsed.directives.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["use_lto", "fast-math", "cflags", "security_sensitive"]);
    for (original, again) in parsed.directives.iter().zip(&reparsed.directives) {
        assert_eq!(original.value, again.value);
    }
}

#[test]
fn test_append_keeps_first_occurrence_order() {
    let mut writer = OverrideWriter::new(BTreeMap::new());
    let atom = PackageAtom::from("dev-lang/example");
    writer.record(&atom, &[TranslatedAssignment::new("CFLAGS", "-O2")]).unwrap();
    writer.record(&atom, &[TranslatedAssignment::new("CFLAGS", "-flto")]).unwrap();
    writer.record(&atom, &[TranslatedAssignment::new("CFLAGS", "-O2")]).unwrap();

    let stanzas = writer.finalize();
    assert_eq!(stanzas[0].get("CFLAGS"), Some("-O2 -flto"));
}

#[test]
fn test_last_wins_keeps_latest_value() {
    let policies = BTreeMap::from([("CC".to_string(), MergePolicy::LastWins)]);
    let mut writer = OverrideWriter::new(policies);
    let atom = PackageAtom::from("dev-lang/example");
    writer.record(&atom, &[TranslatedAssignment::new("CC", "a")]).unwrap();
    writer.record(&atom, &[TranslatedAssignment::new("CC", "b")]).unwrap();

    assert_eq!(writer.finalize()[0].get("CC"), Some("b"));
}

#[test]
fn test_finalized_writer_rejects_records() {
    let mut writer = OverrideWriter::new(BTreeMap::new());
    let atom = PackageAtom::from("dev-lang/example");
    writer.record(&atom, &[TranslatedAssignment::new("CFLAGS", "-O2")]).unwrap();
    let first = writer.finalize();
    assert!(writer.is_finalized());

    let result = writer.record(&atom, &[TranslatedAssignment::new("CFLAGS", "-O3")]);
    match result {
        Err(ClearportError::AlreadyFinalized { atom }) => assert_eq!(atom, "dev-lang/example"),
        other => panic!("expected AlreadyFinalized, got {:?}", other),
    }
    assert_eq!(writer.finalize(), first);
}

#[test]
fn test_unknown_options_are_reported_not_translated() {
    let rules = example_rules();
    let translator = OptionTranslator::new(&rules);
    let parsed = OptionsFileParser::new().parse("autoupdate\nenable_lto\n");

    let outcome = translator.translate_all(&parsed.directives);
    assert_eq!(outcome.unknown, vec!["autoupdate".to_string()]);
    assert_eq!(outcome.assignments, vec![TranslatedAssignment::new("CFLAGS", "-flto")]);
}

#[test]
fn test_run_reports_unmapped_and_translates_worked_example() {
    let mapping = PackageMapping::from_entries(vec![(
        PackageIdentity::from("example"),
        vec![PackageAtom::from("dev-lang/example")],
    )]);
    let rules = example_rules();
    let mut run = TranslationRun::new(&mapping, &rules);

    run.process(&PackageIdentity::from("example"), "enable_lto=true\ncflags=-march=native\n")
        .unwrap();
    run.process(&PackageIdentity::from("orphan"), "enable_lto\n").unwrap();

    let (stanzas, report) = run.finish();
    assert_eq!(stanzas.len(), 1);
    assert_eq!(stanzas[0].atom.as_str(), "dev-lang/example");
    assert_eq!(stanzas[0].get("CFLAGS"), Some("-flto -march=native"));
    assert!(report.is_unmapped(&PackageIdentity::from("orphan")));
    assert_eq!(report.counters.packages_seen, 2);
    assert_eq!(report.counters.stanzas, 1);
}

#[test]
fn test_one_identity_fans_out_to_every_atom() {
    let mapping = PackageMapping::from_entries(vec![(
        PackageIdentity::from("python3"),
        vec![
            PackageAtom::from("dev-lang/python"),
            PackageAtom::from("dev-python/python-exec"),
        ],
    )]);
    let rules = example_rules();
    let mut run = TranslationRun::new(&mapping, &rules);
    run.process(&PackageIdentity::from("python3"), "cc=clang\n").unwrap();

    let (stanzas, _) = run.finish();
    assert_eq!(stanzas.len(), 2);
    assert!(stanzas.iter().all(|s| s.get("CC") == Some("clang")));
}
