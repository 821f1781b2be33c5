//! Atlas Pipeline: runs a project through intake, structure, content and
//! classification, recording progress as it goes

pub mod pipeline;
pub mod status;

#[cfg(test)]
pub mod tests;

pub use pipeline::{AnalysisSummary, Analyzer};
pub use status::ProjectProgress;
