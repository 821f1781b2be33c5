//! Project status state machine and stage reports

use std::sync::Arc;

use atlas_core::{ProjectStatus, ReportNode};
use atlas_store::StatusSink;

/// Report types attached to a project.
pub const STRUCTURE_REPORT: &str = "structure_analysis";
pub const CONTENT_REPORT: &str = "content_analysis";
pub const ANALYSIS_REPORT: &str = "analysis";
pub const ERROR_REPORT: &str = "error";

/// Drives one project through its status transitions.
///
/// Sink failures are logged and never abort the run; the recorded status is
/// always the last transition the sink accepted.
pub struct ProjectProgress {
    sink: Arc<dyn StatusSink>,
    project_id: String,
    current: Option<ProjectStatus>,
}

impl ProjectProgress {
    pub fn new(sink: Arc<dyn StatusSink>, project_id: impl Into<String>) -> Self {
        Self {
            sink,
            project_id: project_id.into(),
            current: None,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Last status the sink accepted.
    pub fn current(&self) -> Option<ProjectStatus> {
        self.current
    }

    fn is_next(&self, status: ProjectStatus) -> bool {
        match self.current {
            None => status == ProjectStatus::AnalyzingStructure,
            Some(current) => current.next() == Some(status),
        }
    }

    pub async fn advance(&mut self, status: ProjectStatus, step: &str) {
        if !self.is_next(status) {
            tracing::warn!(
                "Project {} jumps from {:?} to {}",
                self.project_id,
                self.current.map(|s| s.as_str()),
                status
            );
        }

        match self
            .sink
            .set_status(&self.project_id, status, status.progress(), step)
            .await
        {
            Ok(()) => {
                tracing::info!("Project {}: {} ({}%)", self.project_id, status, status.progress());
                self.current = Some(status);
            }
            Err(e) => tracing::error!(
                "Failed to record status {} for project {}: {}",
                status,
                self.project_id,
                e
            ),
        }
    }

    pub async fn report(&self, report: ReportNode) {
        if let Err(e) = self.sink.add_report(&report).await {
            tracing::error!(
                "Failed to attach {} report to project {}: {}",
                report.report_type,
                self.project_id,
                e
            );
        }
    }

    /// Attach an error report for a fatal failure. Status is left as is.
    pub async fn fail(&self, stage: &str, error: &dyn std::error::Error) {
        let report = ReportNode::new(&self.project_id, ERROR_REPORT, error.to_string())
            .with_detail("stage", stage)
            .with_detail(
                "last_status",
                self.current.map(|s| s.as_str()).unwrap_or("none"),
            );
        tracing::error!("Analysis of project {} failed during {}: {}", self.project_id, stage, error);
        self.report(report).await;
    }
}
