//! Orchestrator: project brief at the start, compilation at the end.

use std::sync::Arc;

use super::{
    AgentError, AgentKind, BlogInputs, BrandProfile, BriefResult, Budget, CompiledArticle,
    Prompter, ReviewResult, RunningContext, WorkflowSummary,
};
use crate::completion::CompletionClient;
use crate::text::{extract_section, parse_numbered_list, reading_time_minutes, word_count};

const BRIEF_BUDGET: Budget = Budget::new(2000, 0.6);
const COMPILE_BUDGET: Budget = Budget::new(3000, 0.4);

const INSTRUCTIONS: &str = "\
You manage the complete blog creation workflow with strategic oversight and \
quality assurance.

QUALITY STANDARDS:
- Word count: 1,500-2,500 words for comprehensive posts
- Reading level: accessible to the target audience
- SEO: 1-2% keyword density, integrated naturally
- Engagement: clear structure, compelling hooks, strong conclusions
- Brand voice: consistent tone and style across all content";

const POST_HEADER: &str = "FINAL BLOG POST";
const METADATA_HEADER: &str = "METADATA SUMMARY";
const CHECKLIST_HEADER: &str = "PUBLICATION CHECKLIST";
const PREDICTIONS_HEADER: &str = "PERFORMANCE PREDICTIONS";

/// Writes the project brief (stage 1) and compiles the deliverable (stage 9).
pub struct Orchestrator {
    prompter: Prompter,
}

impl Orchestrator {
    pub fn new(client: Arc<CompletionClient>, brand: Arc<BrandProfile>) -> Self {
        Self { prompter: Prompter::new(client, brand, AgentKind::Orchestrator) }
    }

    /// Produce the project brief every later stage is framed by.
    pub async fn brief(&self, inputs: &BlogInputs) -> Result<BriefResult, AgentError> {
        let prompt = format!(
            "I'm setting up a blog creation workflow.\n\n\
             PROJECT INPUTS:\n\
             - Title: \"{title}\"\n\
             - Keywords: \"{keywords}\"\n\
             - Context: \"{context}\"\n\
             - Web Research: {web}\n\n\
             Please create a detailed PROJECT BRIEF that will guide every later stage. Include:\n\
             1. **Content Strategy**: how this post fits {brand}'s content goals\n\
             2. **Target Audience Analysis**: primary audience, their needs and pain points\n\
             3. **Content Goals**: what readers should learn, feel, and do\n\
             4. **SEO Strategy**: primary and secondary keywords, search intent\n\
             5. **Quality Standards**: word count, tone, structure requirements\n\
             6. **Success Metrics**: how the post's effectiveness will be measured\n\n\
             Format your response as a structured project brief.",
            title = inputs.title,
            keywords = inputs.keywords,
            context = inputs.context,
            web = if inputs.allow_web { "Enabled" } else { "Disabled" },
            brand = self.prompter.brand().name,
        );

        let brief = self.prompter.ask(INSTRUCTIONS, prompt, BRIEF_BUDGET).await?;
        Ok(BriefResult { brief })
    }

    /// Assemble the publishable article from the most final content available.
    ///
    /// Uses the revision when present, else the draft. The model's cleaned-up
    /// post replaces that content only when it is at least half as long, so a
    /// truncated reply cannot shrink the article.
    pub async fn compile(
        &self,
        context: &RunningContext,
        inputs: &BlogInputs,
    ) -> Result<CompiledArticle, AgentError> {
        let draft = context.draft()?;
        let review = context.review()?;
        let revision = context.revision();

        let (content, used_revision) = match revision {
            Some(revision) => (revision.content.as_str(), true),
            None => (draft.content.as_str(), false),
        };

        let h2_options = context.brainstorm().map(|b| b.h2_options.len()).unwrap_or(0);
        let selected = context.selection().map(|s| s.selected_h2s.len()).unwrap_or(0);
        let content_words = word_count(content);

        let prompt = format!(
            "I'm compiling the final deliverables for this blog post workflow.\n\n\
             WORKFLOW SUMMARY:\n\
             - Original inputs: Title \"{title}\", Keywords \"{keywords}\"\n\
             - Brainstorming generated {h2_options} H2 options\n\
             - Outline selected {selected} final H2s\n\
             - Content creation produced {content_words} words\n\
             - Review score: {score}/10\n\n\
             FINAL BLOG CONTENT:\n{content}\n\n\
             Please provide:\n\
             1. **{POST_HEADER}**: clean, formatted Markdown ready for publication\n\
             2. **{METADATA_HEADER}**: word count and reading time, SEO keyword optimization, \
             content quality assessment, target audience alignment\n\
             3. **{CHECKLIST_HEADER}**: items to verify before publishing\n\
             4. **{PREDICTIONS_HEADER}**: expected engagement and SEO performance\n\n\
             Format as a complete deliverable package.",
            title = inputs.title,
            keywords = inputs.keywords,
            score = review.overall_score,
        );

        let reply = self.prompter.ask(INSTRUCTIONS, prompt, COMPILE_BUDGET).await?;

        let article = extract_section(
            &reply,
            POST_HEADER,
            &[METADATA_HEADER, CHECKLIST_HEADER, PREDICTIONS_HEADER],
        )
        .filter(|post| word_count(post) * 2 >= content_words)
        .unwrap_or_else(|| {
            tracing::debug!("Compilation reply has no usable post, keeping final content");
            content.trim().to_string()
        });

        let metadata =
            extract_section(&reply, METADATA_HEADER, &[CHECKLIST_HEADER, PREDICTIONS_HEADER])
                .filter(|s| !s.is_empty());
        let performance_notes =
            extract_section(&reply, PREDICTIONS_HEADER, &[]).filter(|s| !s.is_empty());

        let mut checklist = extract_section(&reply, CHECKLIST_HEADER, &[PREDICTIONS_HEADER])
            .map(|section| parse_numbered_list(&section))
            .unwrap_or_default()
            .into_iter()
            .map(|item| strip_checkbox(&item))
            .collect::<Vec<_>>();
        if checklist.is_empty() {
            checklist = derived_checklist(review, &self.prompter.brand().name);
        }

        let outline = context.final_outline().ok();
        let final_word_count = word_count(&article);

        Ok(CompiledArticle {
            title: inputs.title.clone(),
            word_count: final_word_count,
            reading_time_minutes: reading_time_minutes(final_word_count),
            article,
            metadata,
            checklist,
            performance_notes,
            used_revision,
            summary: WorkflowSummary {
                h2_options,
                h2_count: outline.map(|o| o.h2_count).unwrap_or(selected),
                h3_count: outline.map(|o| o.h3_count).unwrap_or(0),
                final_word_count,
                review_score: review.overall_score,
                publication_ready: review.publication_ready,
            },
            raw_response: reply,
        })
    }
}

fn strip_checkbox(item: &str) -> String {
    ["[ ]", "[x]", "[X]"]
        .iter()
        .find_map(|box_| item.strip_prefix(box_))
        .unwrap_or(item)
        .trim()
        .to_string()
}

/// Checklist built from the review when the model supplies none.
fn derived_checklist(review: &ReviewResult, brand: &str) -> Vec<String> {
    let mut checklist = Vec::new();

    if review.publication_ready {
        checklist.push("Content quality meets publication standards".to_string());
    } else {
        checklist.push("Address quality issues before publication".to_string());
    }

    if review.critical_issues.is_empty() {
        checklist.push("No critical issues identified".to_string());
    } else {
        checklist.push(format!("Resolve {} critical issues", review.critical_issues.len()));
    }

    checklist.push("Verify keyword optimization".to_string());
    checklist.push(format!("Add internal links to relevant {brand} content"));
    checklist.push("Test mobile responsiveness".to_string());
    checklist.push("Confirm target audience alignment".to_string());
    checklist.push("Final proofread for grammar and style".to_string());

    checklist
}
