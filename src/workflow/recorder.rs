//! Session recording: per-step timings, model usage and quality figures,
//! rendered into the metadata report that ships with the article.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::run::{StepRecord, WorkflowRun};
use crate::agents::{AgentKind, BlogInputs, Stage, StepOutput};
use crate::text::{analyze_structure, format_duration, reading_time_minutes, word_count};

/// Timing and size of one completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTiming {
    pub stage: Stage,
    pub agent: AgentKind,
    pub model: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,

    /// Length of the serialized output, in characters
    pub output_size: usize,

    /// Words in the step's principal text
    pub word_count: usize,
}

/// How often one model served the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub times_used: usize,
    pub stages: Vec<Stage>,
    pub agents: Vec<AgentKind>,
}

/// Figures taken from the review and the final article.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub review_score: Option<f64>,
    pub publication_ready: Option<bool>,
    pub critical_issues: Option<usize>,
    pub revision_word_delta: Option<i64>,
}

/// Step duration statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub steps_completed: usize,
    pub total_ms: u64,
    pub average_ms: u64,
    pub fastest: Option<(Stage, u64)>,
    pub slowest: Option<(Stage, u64)>,
}

/// Collects what happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecorder {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepTiming>,
    pub quality: QualityMetrics,
}

impl SessionRecorder {
    pub fn new(run_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at,
            steps: Vec::new(),
            quality: QualityMetrics::default(),
        }
    }

    /// Rebuild the recording of a run's completed steps, used on resume.
    pub fn from_run(run: &WorkflowRun) -> Self {
        let mut recorder = Self::new(run.id.clone(), run.start_time);
        for step in run.steps.iter().filter(|s| s.is_completed()) {
            recorder.record_step(step);
        }
        recorder
    }

    /// Record a completed step. Steps without output or timestamps are ignored.
    pub fn record_step(&mut self, step: &StepRecord) {
        let (Some(output), Some(start_time), Some(end_time)) =
            (&step.output, step.start_time, step.end_time)
        else {
            tracing::debug!(stage = %step.stage, "Skipping unrecordable step");
            return;
        };

        match output {
            StepOutput::Review(review) => {
                self.quality.review_score = Some(review.overall_score);
                self.quality.publication_ready = Some(review.publication_ready);
                self.quality.critical_issues = Some(review.critical_issues.len());
            }
            StepOutput::Revision(revision) => {
                self.quality.revision_word_delta = Some(revision.change.delta);
            }
            _ => {}
        }

        let output_size =
            serde_json::to_string(output).map(|json| json.chars().count()).unwrap_or(0);

        self.steps.retain(|t| t.stage != step.stage);
        self.steps.push(StepTiming {
            stage: step.stage,
            agent: step.agent,
            model: step.model.clone(),
            start_time,
            end_time,
            duration_ms: step.duration_ms().unwrap_or(0),
            output_size,
            word_count: word_count(&output.principal_text()),
        });
        self.steps.sort_by_key(|t| t.stage);
    }

    /// Usage per model id.
    pub fn model_usage(&self) -> BTreeMap<String, ModelUsage> {
        let mut usage: BTreeMap<String, ModelUsage> = BTreeMap::new();

        for timing in &self.steps {
            let Some(model) = &timing.model else { continue };
            let entry = usage.entry(model.clone()).or_default();
            entry.times_used += 1;
            entry.stages.push(timing.stage);
            if !entry.agents.contains(&timing.agent) {
                entry.agents.push(timing.agent);
            }
        }

        usage
    }

    pub fn performance(&self) -> PerformanceMetrics {
        let total_ms: u64 = self.steps.iter().map(|t| t.duration_ms).sum();
        let steps_completed = self.steps.len();
        let entry = |t: &StepTiming| (t.stage, t.duration_ms);

        PerformanceMetrics {
            steps_completed,
            total_ms,
            average_ms: if steps_completed == 0 { 0 } else { total_ms / steps_completed as u64 },
            fastest: self.steps.iter().min_by_key(|t| t.duration_ms).map(entry),
            slowest: self.steps.iter().max_by_key(|t| t.duration_ms).map(entry),
        }
    }

    /// Markdown report covering inputs, steps, models, content and quality.
    pub fn render_markdown(
        &self,
        inputs: &BlogInputs,
        article: &str,
        ended_at: DateTime<Utc>,
    ) -> String {
        let or_missing = |value: &str| {
            if value.trim().is_empty() {
                "Not provided".to_string()
            } else {
                value.to_string()
            }
        };
        let total = u64::try_from((ended_at - self.started_at).num_milliseconds()).unwrap_or(0);

        let mut out = String::from("# Blog Workflow Metadata\n\n");

        out.push_str("## Session Information\n");
        out.push_str(&format!("- **Session ID**: {}\n", self.run_id));
        out.push_str(&format!("- **Started**: {}\n", self.started_at.to_rfc3339()));
        out.push_str(&format!("- **Completed**: {}\n", ended_at.to_rfc3339()));
        out.push_str(&format!("- **Total Duration**: {}\n\n", format_duration(total)));

        out.push_str("## Original Inputs\n");
        out.push_str(&format!("- **Title**: {}\n", or_missing(&inputs.title)));
        out.push_str(&format!("- **Keywords**: {}\n", or_missing(&inputs.keywords)));
        out.push_str(&format!("- **Context**: {}\n", or_missing(&inputs.context)));
        out.push_str(&format!(
            "- **Web Research Enabled**: {}\n\n",
            if inputs.allow_web { "Yes" } else { "No" }
        ));

        out.push_str("## Workflow Steps\n");
        for timing in &self.steps {
            out.push_str(&format!(
                "\n### {}. {} - {}\n",
                timing.stage.index() + 1,
                timing.stage,
                timing.agent.display_name()
            ));
            out.push_str(&format!(
                "- **Model Used**: {}\n",
                timing.model.as_deref().unwrap_or("n/a")
            ));
            out.push_str(&format!("- **Duration**: {}\n", format_duration(timing.duration_ms)));
            out.push_str(&format!("- **Output Size**: {} characters\n", timing.output_size));
            out.push_str(&format!("- **Word Count**: {} words\n", timing.word_count));
            out.push_str(&format!("- **Completed**: {}\n", timing.end_time.to_rfc3339()));
        }

        out.push_str("\n## Model Usage Analysis\n");
        for (model, usage) in self.model_usage() {
            let stages: Vec<String> = usage.stages.iter().map(|s| s.to_string()).collect();
            let agents: Vec<&str> = usage.agents.iter().map(|a| a.display_name()).collect();
            out.push_str(&format!("\n### {model}\n"));
            out.push_str(&format!("- **Times Used**: {}\n", usage.times_used));
            out.push_str(&format!("- **Steps**: {}\n", stages.join(", ")));
            out.push_str(&format!("- **Agent Types**: {}\n", agents.join(", ")));
        }

        let words = word_count(article);
        let structure = analyze_structure(article);
        out.push_str("\n## Content Metrics\n");
        out.push_str(&format!("- **Word Count**: {words}\n"));
        out.push_str(&format!("- **Reading Time**: {} minutes\n", reading_time_minutes(words)));
        out.push_str(&format!("- **H2 Headings**: {}\n", structure.h2_count));
        out.push_str(&format!("- **H3 Headings**: {}\n", structure.h3_count));
        out.push_str(&format!("- **Paragraphs**: {}\n", structure.paragraphs));
        out.push_str(&format!(
            "- **Avg Words/Paragraph**: {}\n\n",
            structure.avg_words_per_paragraph
        ));

        out.push_str("## Quality Metrics\n");
        if self.quality == QualityMetrics::default() {
            out.push_str("- No quality metrics recorded\n");
        }
        if let Some(score) = self.quality.review_score {
            out.push_str(&format!("- **Review Score**: {score}/10\n"));
        }
        if let Some(ready) = self.quality.publication_ready {
            out.push_str(&format!(
                "- **Publication Ready**: {}\n",
                if ready { "Yes" } else { "No" }
            ));
        }
        if let Some(issues) = self.quality.critical_issues {
            out.push_str(&format!("- **Critical Issues**: {issues}\n"));
        }
        if let Some(delta) = self.quality.revision_word_delta {
            out.push_str(&format!("- **Revision Word Change**: {delta:+}\n"));
        }

        let performance = self.performance();
        let stage_time = |entry: Option<(Stage, u64)>| match entry {
            Some((stage, ms)) => format!("{stage} ({})", format_duration(ms)),
            None => "n/a".to_string(),
        };
        out.push_str("\n## Performance Metrics\n");
        out.push_str(&format!(
            "- **Total Processing Time**: {}\n",
            format_duration(performance.total_ms)
        ));
        out.push_str(&format!(
            "- **Average Step Duration**: {}\n",
            format_duration(performance.average_ms)
        ));
        out.push_str(&format!("- **Fastest Step**: {}\n", stage_time(performance.fastest)));
        out.push_str(&format!("- **Slowest Step**: {}\n", stage_time(performance.slowest)));
        out.push_str(&format!("- **Steps Completed**: {}\n", performance.steps_completed));

        out
    }
}
