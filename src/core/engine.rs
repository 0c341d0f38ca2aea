use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

/// Runs a pipeline's extract, transform and load stages in order.
pub struct ClearportEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ClearportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting translation run");

        tracing::info!("📥 Reading mapping table and options files...");
        let batch = self.pipeline.extract().await?;
        tracing::info!(
            "Read {} options files ({} mapped identities)",
            batch.packages.len(),
            batch.mapping.len()
        );

        tracing::info!("🔧 Translating directives...");
        let output = self.pipeline.transform(batch).await?;
        tracing::info!("Produced {} override stanzas", output.stanzas.len());
        output.report.log_summary();

        tracing::info!("💾 Writing overrides...");
        let output_path = self.pipeline.load(output).await?;
        tracing::info!(
            "Output saved to: {} (took {:?})",
            output_path,
            started.elapsed()
        );

        Ok(output_path)
    }
}
