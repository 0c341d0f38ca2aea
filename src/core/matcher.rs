//! Offline name matching between Clear Linux package names and Gentoo atoms.
//!
//! The matcher works on two plain package lists and produces one
//! [`MatchRecord`] per source name. Matching is case-insensitive, honours a
//! table of manual overrides, and rewrites ecosystem prefixes (`perl-`,
//! `pypi-`, ...) into a pinned Gentoo category when the raw name finds
//! nothing.

use crate::core::mapping::MatchRecord;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Categories whose packages gain nothing from compiler flags.
pub const NON_OPTIMIZABLE_CATEGORIES: &[&str] = &[
    "acct-group",
    "acct-user",
    "app-alternatives",
    "app-dicts",
    "app-doc",
    "app-emacs",
    "app-vim",
    "app-voices",
    "app-xemacs",
    "media-fonts",
    "sec-keys",
    "virtual",
    "x11-themes",
];

/// Names whose automatic match would be wrong or missing.
pub const MANUAL_OVERRIDES: &[(&str, &str)] = &[
    ("SDL", "media-libs/libsdl"),
    ("fmt", "dev-libs/libfmt"),
    ("httpd", "www-servers/apache"),
    ("intel-media-driver", "media-libs/libva-intel-media-driver"),
    ("intel-hybrid-driver", "media-libs/intel-hybrid-codec-driver"),
    ("CGNS", "sci-libs/cgnslib"),
    ("Linux-PAM", "sys-libs/pam"),
    ("FreeRDP2", "net-misc/freerdp"),
    ("awesome-wm", "x11-wm/awesome"),
    ("bind-utils", "net-dns/bind-tools"),
    ("boinc-client", "net-misc/boinc"),
    ("ghostscript", "app-text/ghostscript-gpl"),
    ("gnome-tweak-tool", "gnome-extra/gnome-tweaks"),
    ("graphite", "dev-libs/graphite2"),
    ("gtk4", "gui-libs/gtk"),
    ("gtk3", "x11-libs/gtk+"),
    ("gtkspell3", "app-text/gtkspell"),
    ("lcms2", "media-libs/lcms"),
    ("taskwarrior", "app-misc/task"),
    ("thermal_daemon", "sys-power/thermald"),
    ("udisks2", "sys-fs/udisks"),
    ("v4l-utils", "media-libs/libv4l"),
    ("webkitgtk", "net-libs/webkit-gtk"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixRule {
    pub prefix: &'static str,
    pub category: &'static str,
    /// Replacement for the stripped prefix, if any.
    pub replacement: Option<&'static str>,
}

/// Ecosystem prefixes and the category they pin. When several prefixes
/// match, [`strip_known_prefix`] takes the longest one regardless of the
/// order listed here: `pypi-zope.` must win over `pypi-`.
pub const PREFIX_RULES: &[PrefixRule] = &[
    PrefixRule {
        prefix: "golang-",
        category: "dev-go",
        replacement: None,
    },
    PrefixRule {
        prefix: "jdk-",
        category: "dev-java",
        replacement: None,
    },
    PrefixRule {
        prefix: "mvn-",
        category: "dev-java",
        replacement: None,
    },
    PrefixRule {
        prefix: "perl-",
        category: "dev-perl",
        replacement: None,
    },
    PrefixRule {
        prefix: "php-",
        category: "dev-php",
        replacement: None,
    },
    PrefixRule {
        prefix: "pypi-",
        category: "dev-python",
        replacement: None,
    },
    PrefixRule {
        prefix: "python-",
        category: "dev-python",
        replacement: None,
    },
    PrefixRule {
        prefix: "rubygem-",
        category: "dev-ruby",
        replacement: None,
    },
    PrefixRule {
        prefix: "qt6",
        category: "dev-qt",
        replacement: Some("qt"),
    },
    PrefixRule {
        prefix: "zope.",
        category: "dev-python",
        replacement: Some("zope-"),
    },
    PrefixRule {
        prefix: "pypi-zope.",
        category: "dev-python",
        replacement: Some("zope-"),
    },
];

/// Rewrites a prefixed name into `(name, required category)`. The longest
/// matching prefix wins, so `pypi-zope.interface` becomes `zope-interface`.
pub fn strip_known_prefix(name: &str) -> Option<(String, &'static str)> {
    PREFIX_RULES
        .iter()
        .filter(|rule| name.starts_with(rule.prefix))
        .max_by_key(|rule| rule.prefix.len())
        .map(|rule| {
            let base = &name[rule.prefix.len()..];
            let transformed = match rule.replacement {
                Some(replacement) => format!("{}{}", replacement, base),
                None => base.to_string(),
            };
            (transformed, rule.category)
        })
}

pub fn confidence_for(candidate_count: usize) -> f64 {
    match candidate_count {
        0 => 0.0,
        1 => 0.8,
        n => ((1.0 / n as f64) * 1000.0).round() / 1000.0,
    }
}

/// Case-insensitive lookup tables over the Gentoo package list.
#[derive(Debug, Default)]
pub struct PackageMatcher {
    /// lowercase name -> category -> name as spelled in that category
    case_by_category: HashMap<String, BTreeMap<String, String>>,
    /// lowercase name -> categories that are worth optimizing
    eligible_categories: HashMap<String, BTreeSet<String>>,
    overrides: HashMap<String, String>,
}

impl PackageMatcher {
    pub fn new<'a, I>(atoms: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut matcher = Self {
            overrides: MANUAL_OVERRIDES
                .iter()
                .map(|(name, atom)| (name.to_string(), atom.to_string()))
                .collect(),
            ..Self::default()
        };

        for line in atoms {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((category, name)) = line.split_once('/') else {
                tracing::warn!("Skipping malformed Gentoo package entry: {}", line);
                continue;
            };
            let lowercase = name.to_lowercase();
            matcher
                .case_by_category
                .entry(lowercase.clone())
                .or_default()
                .insert(category.to_string(), name.to_string());
            if !NON_OPTIMIZABLE_CATEGORIES.contains(&category) {
                matcher
                    .eligible_categories
                    .entry(lowercase)
                    .or_default()
                    .insert(category.to_string());
            }
        }

        matcher
    }

    /// Adds or replaces manual overrides on top of the built-in table.
    pub fn with_overrides<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.overrides.extend(overrides);
        self
    }

    pub fn package_exists(&self, name: &str) -> bool {
        self.case_by_category.contains_key(&name.to_lowercase())
    }

    fn try_match(&self, name: &str, required_category: Option<&str>) -> Option<MatchRecord> {
        if let Some(atom) = self.overrides.get(name) {
            return Some(MatchRecord {
                gentoo_match: Some(atom.clone()),
                confidence: 1.0,
                all_matches: vec![atom.clone()],
            });
        }

        let lowercase = name.to_lowercase();
        let eligible = self.eligible_categories.get(&lowercase)?;
        let categories: Vec<&str> = match required_category {
            Some(required) if eligible.contains(required) => vec![required],
            Some(_) => return None,
            None => eligible.iter().map(String::as_str).collect(),
        };

        let spellings = self.case_by_category.get(&lowercase)?;
        let all_matches: Vec<String> = categories
            .iter()
            .filter_map(|category| {
                spellings
                    .get(*category)
                    .map(|spelled| format!("{}/{}", category, spelled))
            })
            .collect();

        // Categories are sorted, so the first candidate is the best one.
        let best = all_matches.first()?.clone();
        Some(MatchRecord {
            gentoo_match: Some(best),
            confidence: confidence_for(categories.len()),
            all_matches,
        })
    }

    pub fn map_package(&self, name: &str) -> MatchRecord {
        if let Some(record) = self.try_match(name, None) {
            return record;
        }

        if let Some((transformed, category)) = strip_known_prefix(name) {
            if let Some(record) = self.try_match(&transformed, Some(category)) {
                return record;
            }
        }

        MatchRecord::unmatched()
    }

    /// Maps every source name; the result is keyed and ordered by name.
    pub fn map_all<'a, I>(&self, names: I) -> BTreeMap<String, MatchRecord>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| (name.to_string(), self.map_package(name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PackageMatcher {
        PackageMatcher::new(vec![
            "sys-libs/zlib",
            "dev-python/six",
            "dev-ruby/six",
            "dev-perl/JSON",
            "dev-python/zope-interface",
            "dev-qt/qtbase",
            "virtual/editor",
            "app-editors/nano",
            "media-fonts/dejavu",
        ])
    }

    #[test]
    fn test_single_category_match() {
        let record = matcher().map_package("zlib");
        assert_eq!(record.gentoo_match.as_deref(), Some("sys-libs/zlib"));
        assert_eq!(record.confidence, 0.8);
    }

    #[test]
    fn test_multiple_categories_pick_first_sorted() {
        let record = matcher().map_package("six");
        assert_eq!(record.gentoo_match.as_deref(), Some("dev-python/six"));
        assert_eq!(record.all_matches, vec!["dev-python/six", "dev-ruby/six"]);
        assert_eq!(record.confidence, 0.5);
    }

    #[test]
    fn test_case_insensitive_keeps_target_spelling() {
        let record = matcher().map_package("perl-json");
        assert_eq!(record.gentoo_match.as_deref(), Some("dev-perl/JSON"));
    }

    #[test]
    fn test_manual_override_wins() {
        let record = matcher().map_package("gtk3");
        assert_eq!(record.gentoo_match.as_deref(), Some("x11-libs/gtk+"));
        assert_eq!(record.confidence, 1.0);
    }

    #[test]
    fn test_prefix_rules() {
        let m = matcher();
        assert_eq!(
            m.map_package("qt6base").gentoo_match.as_deref(),
            Some("dev-qt/qtbase")
        );
        assert_eq!(
            m.map_package("pypi-zope.interface").gentoo_match.as_deref(),
            Some("dev-python/zope-interface")
        );
        assert_eq!(
            m.map_package("pypi-six").gentoo_match.as_deref(),
            Some("dev-python/six")
        );
    }

    #[test]
    fn test_prefix_requires_category() {
        // rubygem- pins dev-ruby, python- pins dev-python
        assert!(matcher().map_package("rubygem-zlib").gentoo_match.is_none());
    }

    #[test]
    fn test_non_optimizable_categories_are_ignored() {
        let m = matcher();
        assert!(m.package_exists("dejavu"));
        assert!(m.map_package("dejavu").gentoo_match.is_none());
        assert!(m.map_package("editor").gentoo_match.is_none());
    }

    #[test]
    fn test_extra_overrides() {
        let m = matcher().with_overrides(vec![("nano-editor".to_string(), "app-editors/nano".to_string())]);
        assert_eq!(
            m.map_package("nano-editor").gentoo_match.as_deref(),
            Some("app-editors/nano")
        );
    }

    #[test]
    fn test_map_all_sorted_and_skips_blank() {
        let result = matcher().map_all(vec!["zlib", "", "  six  ", "unknown"]);
        let keys: Vec<&String> = result.keys().collect();
        assert_eq!(keys, vec!["six", "unknown", "zlib"]);
        assert!(result["unknown"].gentoo_match.is_none());
    }

    #[test]
    fn test_confidence_rounding() {
        assert_eq!(confidence_for(3), 0.333);
        assert_eq!(confidence_for(0), 0.0);
    }
}
