//! Structured results produced by each pipeline stage.
//!
//! Every stage stores exactly one [`StepOutput`] variant in its step record.
//! Later stages read these through the running context; nothing else flows
//! between stages.

use serde::{Deserialize, Serialize};

use super::{BlogInputs, InputField, Stage};
use crate::text::{KeywordDensity, StructureStats};

/// Inputs after the planning stage filled the gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub title: String,
    pub keywords: String,
    pub context: String,
    pub allow_web: bool,

    /// Fields the user supplied
    pub provided: Vec<InputField>,

    /// Fields synthesized by the model
    pub generated: Vec<InputField>,

    /// Model reply, absent when nothing had to be generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl PlanResult {
    /// The completed inputs every later stage works from.
    pub fn inputs(&self) -> BlogInputs {
        BlogInputs {
            title: self.title.clone(),
            keywords: self.keywords.clone(),
            context: self.context.clone(),
            allow_web: self.allow_web,
        }
    }
}

/// Project brief framing every later stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefResult {
    pub brief: String,
}

/// Heading and intro/conclusion candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainstormResult {
    pub h2_options: Vec<String>,
    pub intro_options: Vec<String>,
    pub conclusion_options: Vec<String>,

    /// Headings sharing their first three words with an earlier one
    #[serde(default)]
    pub near_duplicates: Vec<String>,

    pub raw_response: String,
}

/// Headings chosen for the article, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSelection {
    pub selected_h2s: Vec<String>,

    /// 1-based intro option number the model picked
    pub intro_choice: Option<usize>,

    /// 1-based conclusion option number the model picked
    pub conclusion_choice: Option<usize>,

    /// Text of the chosen intro approach
    pub selected_intro: String,

    /// Text of the chosen conclusion approach
    pub selected_conclusion: String,

    pub reasoning: String,

    /// The outline as written by the model
    pub raw_response: String,
}

/// Subheading recommendations for one heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingSubheadings {
    pub heading: String,
    pub subheadings: Vec<String>,

    /// What the model wrote about this heading
    pub notes: String,
}

/// Subheading recommendations for every selected heading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubheadingPlan {
    pub suggestions: Vec<HeadingSubheadings>,
    pub total: usize,
    pub raw_response: String,
}

/// One `##` section of the final outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub heading: String,
    pub subheadings: Vec<String>,
}

/// The outline the article is written from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalOutline {
    pub outline: String,
    pub h2_count: usize,
    pub h3_count: usize,
    pub estimated_words: usize,
    pub structure: Vec<OutlineSection>,
}

/// First full draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub content: String,
    pub word_count: usize,
    pub reading_time_minutes: usize,
    pub keyword_density: Vec<KeywordDensity>,
    pub structure: StructureStats,
}

/// Reviewer verdict on the draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    /// Score as parsed, `None` when the reply had none
    pub score: Option<f64>,

    /// Score used downstream (0 when none was found)
    pub overall_score: f64,

    /// `overall_score >= 8`
    pub publication_ready: bool,

    pub strengths: Vec<String>,
    pub critical_issues: Vec<String>,
    pub improvements: Vec<String>,
    pub seo_recommendations: Vec<String>,
    pub revision_priorities: Vec<String>,
    pub brand_alignment: String,

    /// Short human-readable verdict
    pub summary: String,

    /// Full feedback as written by the model
    pub raw_response: String,
}

/// Word count movement between draft and revision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordCountChange {
    pub original: usize,
    pub revised: usize,
    pub delta: i64,

    /// Change relative to the original, in percent (0 when the original is empty)
    pub percent: f64,
}

impl WordCountChange {
    pub fn between(original: usize, revised: usize) -> Self {
        let delta = revised as i64 - original as i64;
        let percent = if original == 0 { 0.0 } else { delta as f64 / original as f64 * 100.0 };
        Self { original, revised, delta, percent }
    }
}

/// Draft rewritten to address the review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionResult {
    pub content: String,
    pub word_count: usize,
    pub reading_time_minutes: usize,
    pub keyword_density: Vec<KeywordDensity>,
    pub structure: StructureStats,
    pub change: WordCountChange,
}

/// Headline numbers about the finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub h2_options: usize,
    pub h2_count: usize,
    pub h3_count: usize,
    pub final_word_count: usize,
    pub review_score: f64,
    pub publication_ready: bool,
}

/// The publishable article plus its accompanying notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledArticle {
    pub title: String,
    pub article: String,
    pub word_count: usize,
    pub reading_time_minutes: usize,

    /// Metadata block written by the model, when present
    pub metadata: Option<String>,

    pub checklist: Vec<String>,

    /// Engagement and search predictions, when present
    pub performance_notes: Option<String>,

    /// Whether the article came from the revision rather than the draft
    pub used_revision: bool,

    pub summary: WorkflowSummary,
    pub raw_response: String,
}

/// Output of one completed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StepOutput {
    Plan(PlanResult),
    Brief(BriefResult),
    Brainstorm(BrainstormResult),
    OutlineSelection(OutlineSelection),
    Subheadings(SubheadingPlan),
    FinalOutline(FinalOutline),
    Draft(Draft),
    Review(ReviewResult),
    Revision(RevisionResult),
    Compiled(CompiledArticle),
}

impl StepOutput {
    /// Stage that produces this kind of output.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Plan(_) => Stage::ContentPlanning,
            Self::Brief(_) => Stage::ProjectBrief,
            Self::Brainstorm(_) => Stage::Brainstorm,
            Self::OutlineSelection(_) => Stage::OutlineSelection,
            Self::Subheadings(_) => Stage::SubheadingSuggestions,
            Self::FinalOutline(_) => Stage::OutlineFinalization,
            Self::Draft(_) => Stage::Drafting,
            Self::Review(_) => Stage::Review,
            Self::Revision(_) => Stage::Revision,
            Self::Compiled(_) => Stage::Compilation,
        }
    }

    /// The main text a stage produced, used for word counts and previews.
    pub fn principal_text(&self) -> String {
        match self {
            Self::Plan(plan) => format!("{}\n{}\n{}", plan.title, plan.keywords, plan.context),
            Self::Brief(brief) => brief.brief.clone(),
            Self::Brainstorm(b) => b.h2_options.join("\n"),
            Self::OutlineSelection(s) => s.selected_h2s.join("\n"),
            Self::Subheadings(s) => s
                .suggestions
                .iter()
                .flat_map(|h| std::iter::once(&h.heading).chain(h.subheadings.iter()))
                .cloned()
                .collect::<Vec<_>>()
                .join("\n"),
            Self::FinalOutline(o) => o.outline.clone(),
            Self::Draft(d) => d.content.clone(),
            Self::Review(r) => r.raw_response.clone(),
            Self::Revision(r) => r.content.clone(),
            Self::Compiled(c) => c.article.clone(),
        }
    }

    /// Unparsed model reply, when the stage keeps one.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Self::Plan(plan) => plan.raw_response.as_deref(),
            Self::Brief(brief) => Some(&brief.brief),
            Self::Brainstorm(b) => Some(&b.raw_response),
            Self::OutlineSelection(s) => Some(&s.raw_response),
            Self::Subheadings(s) => Some(&s.raw_response),
            Self::FinalOutline(o) => Some(&o.outline),
            Self::Draft(d) => Some(&d.content),
            Self::Review(r) => Some(&r.raw_response),
            Self::Revision(r) => Some(&r.content),
            Self::Compiled(c) => Some(&c.raw_response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_change() {
        let change = WordCountChange::between(400, 450);
        assert_eq!(change.delta, 50);
        assert!((change.percent - 12.5).abs() < f64::EPSILON);

        let shrink = WordCountChange::between(200, 150);
        assert_eq!(shrink.delta, -50);

        assert_eq!(WordCountChange::between(0, 10).percent, 0.0);
    }

    #[test]
    fn test_step_output_is_tagged() {
        let output = StepOutput::Brief(BriefResult { brief: "Aim high".to_string() });
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["kind"], "brief");
        assert_eq!(json["data"]["brief"], "Aim high");

        let back: StepOutput = serde_json::from_value(json).unwrap();
        assert_eq!(back, output);
    }

    #[test]
    fn test_step_output_stage_mapping() {
        let review = StepOutput::Review(ReviewResult::default());
        assert_eq!(review.stage(), Stage::Review);
        assert_eq!(StepOutput::Subheadings(SubheadingPlan::default()).stage().index(), 4);
    }

    #[test]
    fn test_principal_text_for_subheadings() {
        let plan = SubheadingPlan {
            suggestions: vec![HeadingSubheadings {
                heading: "Listening".to_string(),
                subheadings: vec!["Pausing first".to_string()],
                notes: String::new(),
            }],
            total: 1,
            raw_response: String::new(),
        };
        assert_eq!(StepOutput::Subheadings(plan).principal_text(), "Listening\nPausing first");
    }
}
