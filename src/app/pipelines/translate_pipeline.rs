use crate::core::mapping::PackageMapping;
use crate::core::run::TranslationRun;
use crate::core::writer::{assign_env_files, render_package_env};
use crate::core::{
    ConfigProvider, PackageIdentity, Pipeline, SourceBatch, SourcePackage, Storage,
    TranslationOutput,
};
use crate::utils::error::{ClearportError, Result};
use std::collections::BTreeSet;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Clear Linux checkout + mapping table in, portage env overrides out.
pub struct TranslatePipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

fn join(base: &str, path: &str) -> String {
    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path)
    }
}

impl<S: Storage, C: ConfigProvider> TranslatePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    async fn load_mapping(&self) -> Result<PackageMapping> {
        let path = self.config.mapping_file();
        let data = self
            .storage
            .read_file(path)
            .await
            .map_err(|e| ClearportError::MappingError {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        PackageMapping::from_json_bytes(path, &data, &self.config.mapping_options())
    }

    async fn read_options(&self, identity: &str) -> Result<Option<String>> {
        let path = join(
            &join(self.config.repos_dir(), identity),
            self.config.options_file_name(),
        );
        if !self.storage.exists(&path).await {
            return Ok(None);
        }
        let data = self.storage.read_file(&path).await?;
        Ok(Some(String::from_utf8_lossy(&data).into_owned()))
    }

    /// Every file the load stage produces, relative to the output root.
    fn render_files(&self, output: &TranslationOutput) -> Vec<(String, Vec<u8>)> {
        let render_options = self.config.render_options();
        let env_files = assign_env_files(&output.stanzas);
        let mut files = Vec::with_capacity(output.stanzas.len() + 1);

        for (stanza, file) in output.stanzas.iter().zip(&env_files) {
            files.push((
                format!("env/{}", file),
                stanza.render(&output.policies, &render_options).into_bytes(),
            ));
        }
        files.push((
            self.config.package_env_file().to_string(),
            render_package_env(&output.stanzas, &env_files).into_bytes(),
        ));
        files
    }

    fn render_reports(&self, output: &TranslationOutput) -> Result<Vec<(String, Vec<u8>)>> {
        let mut reports = Vec::new();
        for format in self.config.report_formats() {
            match format.as_str() {
                "json" => reports.push((
                    "clearport-report.json".to_string(),
                    output.report.to_json()?.into_bytes(),
                )),
                "csv" => reports.push(("clearport-report.csv".to_string(), output.report.to_csv()?)),
                other => {
                    return Err(ClearportError::InvalidConfigValueError {
                        field: "report_formats".to_string(),
                        value: other.to_string(),
                        reason: "Unsupported report format".to_string(),
                    })
                }
            }
        }
        Ok(reports)
    }

    fn build_archive(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, data) in files {
            zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
            zip.write_all(data)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for TranslatePipeline<S, C> {
    async fn extract(&self) -> Result<SourceBatch> {
        tracing::info!("🚀 Loading package mapping from: {}", self.config.mapping_file());
        let mapping = self.load_mapping().await?;
        tracing::info!(
            "📋 Mapping covers {} packages ({} atoms)",
            mapping.len(),
            mapping.atom_count()
        );

        let repos_dir = self.config.repos_dir();
        let checked_out: BTreeSet<String> = self.storage.list_dirs(repos_dir).await?.into_iter().collect();
        tracing::debug!("Found {} package repositories in {}", checked_out.len(), repos_dir);

        // Sorted union: mapped identities first decide merge order, unmapped
        // ones still have to be seen so they land in the report.
        let identities: BTreeSet<String> = mapping
            .all_mapped_identities()
            .map(|identity| identity.as_str().to_string())
            .chain(checked_out.iter().cloned())
            .collect();

        let mut packages = Vec::new();
        let mut missing_options = Vec::new();
        for identity in identities {
            match self.read_options(&identity).await? {
                Some(options_text) => packages.push(SourcePackage {
                    identity: PackageIdentity::new(identity),
                    options_text,
                }),
                None if mapping.contains(&PackageIdentity::new(identity.as_str())) => {
                    missing_options.push(PackageIdentity::new(identity));
                }
                None => tracing::debug!("{} has no options file and no mapping", identity),
            }
        }

        tracing::info!("📊 Extracted {} options files", packages.len());
        Ok(SourceBatch {
            mapping,
            packages,
            missing_options,
        })
    }

    async fn transform(&self, batch: SourceBatch) -> Result<TranslationOutput> {
        let rules = self.config.rule_table()?;
        tracing::info!(
            "🔧 Translating {} packages with {} rules",
            batch.packages.len(),
            rules.len()
        );

        let mut run = TranslationRun::new(&batch.mapping, &rules);
        for package in &batch.packages {
            run.process(&package.identity, &package.options_text)?;
        }
        for identity in &batch.missing_options {
            run.note_missing_options(identity);
        }

        let (stanzas, report) = run.finish();
        tracing::info!("✅ Translation complete: {} stanzas", stanzas.len());
        Ok(TranslationOutput {
            stanzas,
            report,
            policies: rules.policies().clone(),
        })
    }

    async fn load(&self, output: TranslationOutput) -> Result<String> {
        let output_path = self.config.output_path();
        let files = self.render_files(&output);

        for (name, data) in &files {
            self.storage.write_file(&join(output_path, name), data).await?;
        }
        tracing::info!("💾 Wrote {} files under {}", files.len(), output_path);

        let reports = self.render_reports(&output)?;
        for (name, data) in &reports {
            self.storage
                .write_file(&join(self.config.report_dir(), name), data)
                .await?;
        }

        if let Some(archive_name) = self.config.archive_name() {
            let mut bundled = files.clone();
            bundled.extend(reports.iter().map(|(name, data)| (format!("report/{}", name), data.clone())));
            let zip_data = Self::build_archive(&bundled)?;
            tracing::debug!("Writing archive ({} bytes)", zip_data.len());
            self.storage
                .write_file(&join(output_path, archive_name), &zip_data)
                .await?;
            tracing::info!("📦 Archive saved: {}", join(output_path, archive_name));
        }

        Ok(output_path.to_string())
    }
}
