pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::mapping::MappingOptions;
#[cfg(feature = "cli")]
use crate::core::rules::RuleTable;
#[cfg(feature = "cli")]
use crate::core::writer::RenderOptions;
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

pub const REPORT_FORMATS: &[&str] = &["json", "csv"];

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "clearport")]
#[command(about = "Translate Clear Linux options.conf files into Gentoo package.env overrides")]
pub struct CliConfig {
    #[arg(long, default_value = "./clearlinux-repos")]
    pub repos_dir: String,

    #[arg(long, default_value = "options.conf")]
    pub options_file: String,

    #[arg(long, default_value = "./data/pkg_mapping.json")]
    pub mapping_file: String,

    #[arg(long, default_value = "./etc/portage")]
    pub output_path: String,

    #[arg(long, default_value = "./clearport-report")]
    pub report_dir: String,

    #[arg(long, value_delimiter = ',', default_value = "json,csv")]
    pub report_formats: Vec<String>,

    #[arg(long, default_value = "package.env/clearport")]
    pub package_env_file: String,

    #[arg(long, help = "TOML rule table extending or replacing the built-in rules")]
    pub rules_file: Option<String>,

    #[arg(long, help = "Map to every candidate atom, not only the best match")]
    pub include_alternates: bool,

    #[arg(long, default_value = "0.0")]
    pub min_confidence: f64,

    #[arg(long, help = "Also bundle the output tree into this zip file")]
    pub archive: Option<String>,

    #[arg(long, help = "Write plain values instead of extending global flags")]
    pub literal_values: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn repos_dir(&self) -> &str {
        &self.repos_dir
    }

    fn options_file_name(&self) -> &str {
        &self.options_file
    }

    fn mapping_file(&self) -> &str {
        &self.mapping_file
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn report_dir(&self) -> &str {
        &self.report_dir
    }

    fn report_formats(&self) -> &[String] {
        &self.report_formats
    }

    fn package_env_file(&self) -> &str {
        &self.package_env_file
    }

    fn archive_name(&self) -> Option<&str> {
        self.archive.as_deref()
    }

    fn mapping_options(&self) -> MappingOptions {
        MappingOptions {
            include_alternates: self.include_alternates,
            min_confidence: self.min_confidence,
        }
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            extend_globals: !self.literal_values,
        }
    }

    fn rule_table(&self) -> Result<RuleTable> {
        match &self.rules_file {
            Some(path) => RuleTable::from_file(path),
            None => Ok(RuleTable::default()),
        }
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("repos_dir", &self.repos_dir)?;
        validation::validate_file_name("options_file", &self.options_file)?;
        validation::validate_path("mapping_file", &self.mapping_file)?;
        validation::validate_file_extensions(
            "mapping_file",
            std::slice::from_ref(&self.mapping_file),
            &["json"],
        )?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_path("report_dir", &self.report_dir)?;
        validation::validate_one_of("report_formats", &self.report_formats, REPORT_FORMATS)?;
        validation::validate_path("package_env_file", &self.package_env_file)?;
        validation::validate_range("min_confidence", self.min_confidence, 0.0, 1.0)?;
        if let Some(rules_file) = &self.rules_file {
            validation::validate_file_extensions(
                "rules_file",
                std::slice::from_ref(rules_file),
                &["toml"],
            )?;
        }
        if let Some(archive) = &self.archive {
            validation::validate_file_name("archive", archive)?;
            validation::validate_file_extensions("archive", std::slice::from_ref(archive), &["zip"])?;
        }
        Ok(())
    }
}
