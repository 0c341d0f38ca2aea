use clearport::{CliConfig, ClearportEngine, LocalStorage, TomlConfig, TranslatePipeline};
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn cli_config(root: &Path) -> CliConfig {
    let path = |p: &str| root.join(p).to_str().unwrap().to_string();
    CliConfig {
        repos_dir: path("clearlinux-repos"),
        options_file: "options.conf".to_string(),
        mapping_file: path("data/pkg_mapping.json"),
        output_path: path("etc/portage"),
        report_dir: path("report"),
        report_formats: vec!["json".to_string(), "csv".to_string()],
        package_env_file: "package.env/clearport".to_string(),
        rules_file: None,
        include_alternates: false,
        min_confidence: 0.0,
        archive: None,
        literal_values: false,
        verbose: false,
        json_logs: false,
    }
}

fn seed_checkout(root: &Path) {
    write(
        root,
        "data/pkg_mapping.json",
        r#"{
  "zlib": {"gentoo_match": "sys-libs/zlib", "confidence": 0.8, "all_matches": ["sys-libs/zlib"]},
  "xz": {"gentoo_match": "app-arch/xz-utils", "confidence": 1.0, "all_matches": ["app-arch/xz-utils"]},
  "clr-boot-manager": {"gentoo_match": null, "confidence": 0.0, "all_matches": []},
  "nano": {"gentoo_match": "app-editors/nano", "confidence": 0.8, "all_matches": ["app-editors/nano"]}
}
"#,
    );
    write(
        root,
        "clearlinux-repos/zlib/options.conf",
        "[package]\nname = zlib\nurl = https://zlib.net/zlib-1.3.1.tar.gz\n\n[autospec]\n# optimize\nfunroll-loops = true\nuse_lto = true\nautoupdate = true\nfast-math = false\n",
    );
    write(
        root,
        "clearlinux-repos/xz/options.conf",
        "[package]\nname = xz\n\n[autospec]\nuse_lto = false\nsecurity_sensitive = true\nthis line is broken\n",
    );
    write(
        root,
        "clearlinux-repos/clr-boot-manager/options.conf",
        "[autospec]\nuse_lto = true\n",
    );
}

#[tokio::test]
async fn test_end_to_end_with_default_rules() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    seed_checkout(root);

    let config = cli_config(root);
    let pipeline = TranslatePipeline::new(LocalStorage::new(String::new()), config);
    let engine = ClearportEngine::new(pipeline);

    let output_path = engine.run().await.unwrap();
    assert!(output_path.ends_with("etc/portage"));

    let zlib = std::fs::read_to_string(root.join("etc/portage/env/sys-libs_zlib.conf")).unwrap();
    let expected = "\
# sys-libs/zlib
WARNING_FLAGS=\"-Werror=odr -Werror=lto-type-mismatch -Werror=strict-aliasing\"
CFLAGS=\"${CFLAGS} -falign-functions=32 -fno-semantic-interposition -O3 -flto=auto ${WARNING_FLAGS}\"
CXXFLAGS=\"${CXXFLAGS} -falign-functions=32 -fno-semantic-interposition -O3 -flto=auto ${WARNING_FLAGS}\"
FCFLAGS=\"${FCFLAGS} -falign-functions=32 -fno-semantic-interposition -O3 -flto=auto ${WARNING_FLAGS}\"
FFLAGS=\"${FFLAGS} -falign-functions=32 -fno-semantic-interposition -O3 -flto=auto ${WARNING_FLAGS}\"
";
    assert_eq!(zlib, expected);

    let xz = std::fs::read_to_string(root.join("etc/portage/env/app-arch_xz-utils.conf")).unwrap();
    assert!(xz.starts_with("# app-arch/xz-utils\nDISABLE_LTO_FLAGS=\"-Wno-error=odr"));
    assert!(xz.contains("CFLAGS=\"${CFLAGS} ${DISABLE_LTO_FLAGS} -fzero-call-used-regs=used\"\n"));

    let index = std::fs::read_to_string(root.join("etc/portage/package.env/clearport")).unwrap();
    let entries: Vec<&str> = index.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(
        entries,
        vec![
            "app-arch/xz-utils app-arch_xz-utils.conf",
            "sys-libs/zlib sys-libs_zlib.conf"
        ]
    );

    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(root.join("report/clearport-report.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report["unmapped_packages"], serde_json::json!(["clr-boot-manager"]));
    assert_eq!(report["missing_options"], serde_json::json!(["nano"]));
    assert_eq!(report["unknown_options"]["autoupdate"], serde_json::json!(["zlib"]));
    assert_eq!(report["malformed_lines"][0]["package"], "xz");
    assert_eq!(report["counters"]["stanzas"], 2);

    let csv = std::fs::read_to_string(root.join("report/clearport-report.csv")).unwrap();
    assert!(csv.starts_with("kind,package,detail\n"));
    assert!(csv.contains("unknown_option,zlib,autoupdate"));
}

#[tokio::test]
async fn test_worked_example_with_custom_rules() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "data/pkg_mapping.json", r#"{"example": ["dev-lang/example"]}"#);
    write(
        root,
        "clearlinux-repos/example/options.conf",
        "enable_lto=true\ncflags=-march=native\n",
    );
    write(
        root,
        "rules.toml",
        r#"
replace_defaults = true

[[options]]
option = "enable_lto"
[[options.assign]]
variable = "CFLAGS"
value = "-flto"

[[options]]
option = "cflags"
kind = "value"
[[options.assign]]
variable = "CFLAGS"
value = "{value}"
"#,
    );

    let mut config = cli_config(root);
    config.rules_file = Some(root.join("rules.toml").to_str().unwrap().to_string());
    config.literal_values = true;
    config.report_formats = vec!["csv".to_string()];

    let engine = ClearportEngine::new(TranslatePipeline::new(LocalStorage::new(String::new()), config));
    engine.run().await.unwrap();

    let env = std::fs::read_to_string(root.join("etc/portage/env/dev-lang_example.conf")).unwrap();
    assert_eq!(env, "# dev-lang/example\nCFLAGS=\"-flto -march=native\"\n");
    assert!(!root.join("report/clearport-report.json").exists());
}

#[tokio::test]
async fn test_missing_mapping_table_fails_run() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "clearlinux-repos/zlib/options.conf", "use_lto\n");

    let engine = ClearportEngine::new(TranslatePipeline::new(
        LocalStorage::new(String::new()),
        cli_config(root),
    ));
    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, clearport::ClearportError::MappingError { .. }));
    assert!(!root.join("etc/portage").exists());
}

#[tokio::test]
async fn test_toml_config_run_with_archive() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    seed_checkout(root);
    let root_str = root.to_str().unwrap().replace('\\', "/");

    let config_content = format!(
        r#"
[run]
name = "archive-test"

[source]
repos_dir = "{root}/clearlinux-repos"
mapping_file = "{root}/data/pkg_mapping.json"

[output]
output_path = "{root}/out"
report_dir = "{root}/out/report"
report_formats = ["json"]

[output.compression]
enabled = true
filename = "clearport.zip"
"#,
        root = root_str
    );
    write(root, "clearport.toml", &config_content);

    let config = TomlConfig::from_file(root.join("clearport.toml")).unwrap();
    let engine = ClearportEngine::new(TranslatePipeline::new(LocalStorage::new(String::new()), config));
    engine.run().await.unwrap();

    let zip_data = std::fs::read(root.join("out/clearport.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert!(names.contains(&"env/sys-libs_zlib.conf".to_string()));
    assert!(names.contains(&"package.env/clearport".to_string()));
    assert!(names.contains(&"report/clearport-report.json".to_string()));
}
