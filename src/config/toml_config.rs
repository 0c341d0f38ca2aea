use crate::config::REPORT_FORMATS;
use crate::core::mapping::MappingOptions;
use crate::core::rules::{RuleTable, RuleTableConfig};
use crate::core::writer::RenderOptions;
use crate::core::ConfigProvider;
use crate::utils::error::{ClearportError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub run: RunInfo,
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub rules: Option<RuleTableConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub repos_dir: String,
    pub mapping_file: String,
    pub options_file: Option<String>,
    pub include_alternates: Option<bool>,
    pub min_confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_path: String,
    pub report_dir: Option<String>,
    pub report_formats: Option<Vec<String>>,
    pub package_env_file: Option<String>,
    pub extend_globals: Option<bool>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

const DEFAULT_OPTIONS_FILE: &str = "options.conf";
const DEFAULT_REPORT_DIR: &str = "./clearport-report";
const DEFAULT_PACKAGE_ENV_FILE: &str = "package.env/clearport";

fn default_report_formats() -> &'static [String] {
    static FORMATS: OnceLock<Vec<String>> = OnceLock::new();
    FORMATS.get_or_init(|| REPORT_FORMATS.iter().map(|f| f.to_string()).collect())
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{env:([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env regex"))
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ClearportError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ClearportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${env:NAME}` with the environment value. Plain `${NAME}` is
    /// left alone: rule templates use it for portage variable references.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| {
                    tracing::warn!("Environment variable {} is not set", var_name);
                    String::new()
                })
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("run.name", &self.run.name)?;
        validation::validate_path("source.repos_dir", &self.source.repos_dir)?;
        validation::validate_file_extensions(
            "source.mapping_file",
            std::slice::from_ref(&self.source.mapping_file),
            &["json"],
        )?;
        validation::validate_file_name("source.options_file", self.options_file_name())?;
        if let Some(min_confidence) = self.source.min_confidence {
            validation::validate_range("source.min_confidence", min_confidence, 0.0, 1.0)?;
        }

        validation::validate_path("output.output_path", &self.output.output_path)?;
        validation::validate_path("output.report_dir", self.report_dir())?;
        validation::validate_path("output.package_env_file", self.package_env_file())?;
        validation::validate_one_of("output.report_formats", self.report_formats(), REPORT_FORMATS)?;

        if let Some(compression) = &self.output.compression {
            if compression.enabled {
                validation::validate_file_name("output.compression.filename", &compression.filename)?;
            }
        }

        if let Some(rules) = &self.rules {
            RuleTable::from_config(rules.clone())?;
        }

        Ok(())
    }

    pub fn verbose(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.verbose).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn repos_dir(&self) -> &str {
        &self.source.repos_dir
    }

    fn options_file_name(&self) -> &str {
        self.source
            .options_file
            .as_deref()
            .unwrap_or(DEFAULT_OPTIONS_FILE)
    }

    fn mapping_file(&self) -> &str {
        &self.source.mapping_file
    }

    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn report_dir(&self) -> &str {
        self.output.report_dir.as_deref().unwrap_or(DEFAULT_REPORT_DIR)
    }

    fn report_formats(&self) -> &[String] {
        self.output
            .report_formats
            .as_deref()
            .unwrap_or(default_report_formats())
    }

    fn package_env_file(&self) -> &str {
        self.output
            .package_env_file
            .as_deref()
            .unwrap_or(DEFAULT_PACKAGE_ENV_FILE)
    }

    fn archive_name(&self) -> Option<&str> {
        self.output
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_str())
    }

    fn mapping_options(&self) -> MappingOptions {
        MappingOptions {
            include_alternates: self.source.include_alternates.unwrap_or(false),
            min_confidence: self.source.min_confidence.unwrap_or(0.0),
        }
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            extend_globals: self.output.extend_globals.unwrap_or(true),
        }
    }

    fn rule_table(&self) -> Result<RuleTable> {
        match &self.rules {
            Some(rules) => RuleTable::from_config(rules.clone()),
            None => Ok(RuleTable::default()),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
