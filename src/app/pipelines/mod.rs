pub mod translate_pipeline;

pub use translate_pipeline::TranslatePipeline;
