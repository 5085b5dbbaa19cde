//! Exported files derived from a finished run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::{WorkflowError, WorkflowResult};
use super::run::{RunStatus, StepRecord, WorkflowRun};
use crate::text::slugify;

/// Name of the per-step JSON trace.
pub const STEPS_FILE: &str = "workflow-steps.json";

/// Article, metadata report and step trace of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    pub slug: String,
    pub article: String,
    pub metadata: String,
    pub steps_json: String,
}

#[derive(Serialize)]
struct StepTrace<'a> {
    run_id: &'a str,
    title: &'a str,
    status: RunStatus,
    steps: &'a [StepRecord],
}

impl RunArtifacts {
    /// Derive the artifacts from run state. Only completed runs have any.
    pub fn from_run(run: &WorkflowRun) -> WorkflowResult<Self> {
        let final_output = run
            .final_output
            .as_ref()
            .filter(|_| run.status == RunStatus::Completed)
            .ok_or_else(|| WorkflowError::InvalidSnapshot {
                id: run.id.clone(),
                reason: format!("run is {} and has no final output", run.status),
            })?;

        let title = if final_output.article.title.trim().is_empty() {
            run.title()
        } else {
            final_output.article.title.as_str()
        };

        let trace = StepTrace { run_id: &run.id, title, status: run.status, steps: &run.steps };
        let steps_json = serde_json::to_string_pretty(&trace)
            .map_err(|e| WorkflowError::Storage(e.into()))?;

        Ok(Self {
            slug: slugify(title),
            article: final_output.article.article.clone(),
            metadata: final_output.metadata_report.clone(),
            steps_json,
        })
    }

    pub fn article_file(&self) -> String {
        format!("{}.md", self.slug)
    }

    pub fn metadata_file(&self) -> String {
        format!("{}-metadata.md", self.slug)
    }

    /// Write all three files into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> WorkflowResult<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| WorkflowError::Storage(e.into()))?;

        let files = [
            (self.article_file(), &self.article),
            (self.metadata_file(), &self.metadata),
            (STEPS_FILE.to_string(), &self.steps_json),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, contents) in files {
            let path = dir.join(name);
            fs::write(&path, contents).map_err(|e| WorkflowError::Storage(e.into()))?;
            tracing::debug!(path = %path.display(), "Wrote artifact");
            written.push(path);
        }

        Ok(written)
    }
}
