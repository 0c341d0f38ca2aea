pub mod engine;
pub mod mapping;
pub mod matcher;
pub mod parser;
pub mod report;
pub mod rules;
pub mod run;
pub mod translator;
pub mod writer;

pub use crate::domain::model::{
    DirectiveValue, MergePolicy, OptionDirective, OverrideStanza, PackageAtom, PackageIdentity,
    TranslatedAssignment,
};
pub use crate::domain::ports::{
    ConfigProvider, Pipeline, SourceBatch, SourcePackage, Storage, TranslationOutput,
};
pub use crate::utils::error::Result;
