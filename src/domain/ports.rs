use crate::core::mapping::{MappingOptions, PackageMapping};
use crate::core::report::TranslationReport;
use crate::core::rules::RuleTable;
use crate::core::writer::RenderOptions;
use crate::domain::model::{MergePolicy, OverrideStanza, PackageIdentity};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
    /// Names of the direct subdirectories of `path`, sorted.
    fn list_dirs(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn repos_dir(&self) -> &str;
    fn options_file_name(&self) -> &str;
    fn mapping_file(&self) -> &str;
    fn output_path(&self) -> &str;
    fn report_dir(&self) -> &str;
    fn report_formats(&self) -> &[String];
    fn package_env_file(&self) -> &str;
    fn archive_name(&self) -> Option<&str>;
    fn mapping_options(&self) -> MappingOptions;
    fn render_options(&self) -> RenderOptions;
    fn rule_table(&self) -> Result<RuleTable>;
}

/// Options file text for one source package, as handed over by the checkout step.
#[derive(Debug, Clone)]
pub struct SourcePackage {
    pub identity: PackageIdentity,
    pub options_text: String,
}

#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub mapping: PackageMapping,
    pub packages: Vec<SourcePackage>,
    /// Mapped identities without an options file in the repos directory.
    pub missing_options: Vec<PackageIdentity>,
}

#[derive(Debug, Clone)]
pub struct TranslationOutput {
    pub stanzas: Vec<OverrideStanza>,
    pub report: TranslationReport,
    /// Merge policies the stanzas were built with; rendering uses the same.
    pub policies: BTreeMap<String, MergePolicy>,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SourceBatch>;
    async fn transform(&self, batch: SourceBatch) -> Result<TranslationOutput>;
    async fn load(&self, output: TranslationOutput) -> Result<String>;
}
