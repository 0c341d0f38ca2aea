use clearport::core::mapping::{MappingOptions, MatchRecord};
use clearport::core::matcher::PackageMatcher;
use clearport::core::{PackageAtom, PackageIdentity};
use clearport::PackageMapping;

const GENTOO: &str = "\
sys-libs/zlib
dev-python/six
dev-ruby/six
dev-perl/JSON
dev-python/zope-interface
media-fonts/dejavu
app-arch/xz-utils
";

#[test]
fn test_generated_table_loads_as_mapping() {
    let matcher = PackageMatcher::new(GENTOO.lines());
    let results = matcher.map_all("zlib\nsix\nperl-JSON\npypi-zope.interface\ndejavu\nclr-boot-manager\n".lines());

    assert_eq!(results["zlib"].gentoo_match.as_deref(), Some("sys-libs/zlib"));
    assert_eq!(results["six"].confidence, 0.5);
    assert_eq!(results["six"].all_matches.len(), 2);
    assert_eq!(results["perl-JSON"].gentoo_match.as_deref(), Some("dev-perl/JSON"));
    assert_eq!(
        results["pypi-zope.interface"].gentoo_match.as_deref(),
        Some("dev-python/zope-interface")
    );
    assert_eq!(results["dejavu"], MatchRecord::unmatched());
    assert_eq!(results["clr-boot-manager"], MatchRecord::unmatched());

    let json = serde_json::to_string_pretty(&results).unwrap();

    let best_only = PackageMapping::from_json_str(&json, &MappingOptions::default()).unwrap();
    assert_eq!(best_only.len(), 4);
    assert!(!best_only.contains(&PackageIdentity::from("dejavu")));
    assert_eq!(best_only.lookup(&PackageIdentity::from("six")).len(), 1);

    let alternates = PackageMapping::from_json_str(
        &json,
        &MappingOptions {
            include_alternates: true,
            min_confidence: 0.0,
        },
    )
    .unwrap();
    assert!(alternates
        .lookup(&PackageIdentity::from("six"))
        .contains(&PackageAtom::from("dev-ruby/six")));

    let confident = PackageMapping::from_json_str(
        &json,
        &MappingOptions {
            include_alternates: false,
            min_confidence: 0.75,
        },
    )
    .unwrap();
    assert!(!confident.contains(&PackageIdentity::from("six")));
    assert!(confident.contains(&PackageIdentity::from("zlib")));
}

#[test]
fn test_extra_overrides_win_over_automatic_match() {
    let matcher = PackageMatcher::new(GENTOO.lines())
        .with_overrides(vec![("xz".to_string(), "app-arch/xz-utils".to_string())]);
    let record = matcher.map_package("xz");
    assert_eq!(record.gentoo_match.as_deref(), Some("app-arch/xz-utils"));
    assert_eq!(record.confidence, 1.0);
}
