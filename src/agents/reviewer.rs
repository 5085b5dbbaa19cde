//! Draft review (stage 7).

use std::sync::Arc;

use super::{
    AgentError, AgentKind, BlogInputs, BrandProfile, Budget, Prompter, ReviewResult,
    RunningContext,
};
use crate::completion::CompletionClient;
use crate::text::{extract_score, extract_section, parse_numbered_list};

const BUDGET: Budget = Budget::new(3000, 0.5);

/// Score at or above which a draft is publication-ready.
pub const PUBLICATION_THRESHOLD: f64 = 8.0;

/// Revision priorities this short carry no actionable content.
const MIN_PRIORITY_LEN: usize = 10;

const STRENGTHS: &str = "STRENGTHS";
const CRITICAL: &str = "CRITICAL ISSUES";
const IMPROVEMENTS: &str = "IMPROVEMENT OPPORTUNITIES";
const SEO: &str = "SEO RECOMMENDATIONS";
const BRAND: &str = "BRAND ALIGNMENT";
const PRIORITIES: &str = "REVISION PRIORITIES";

/// Feedback sections in the order the reply is asked to present them.
const SECTIONS: [&str; 6] = [STRENGTHS, CRITICAL, IMPROVEMENTS, SEO, BRAND, PRIORITIES];

const INSTRUCTIONS: &str = "\
You provide thorough, constructive content reviews that raise quality while \
keeping the brand voice intact.

REVIEW CRITERIA:
- Accuracy and depth of the information
- Structure, flow and readability for the target audience
- SEO: keyword integration, headings, scannability
- Engagement: hooks, examples, calls to action
- Brand alignment in tone and values";

/// Scores the draft and collects structured feedback.
///
/// The review is advisory: a low score never stops the pipeline.
pub struct Reviewer {
    prompter: Prompter,
}

impl Reviewer {
    pub fn new(client: Arc<CompletionClient>, brand: Arc<BrandProfile>) -> Self {
        Self { prompter: Prompter::new(client, brand, AgentKind::Reviewer) }
    }

    /// Review the draft. A reply without a readable score yields 0.
    pub async fn review(
        &self,
        context: &RunningContext,
        inputs: &BlogInputs,
    ) -> Result<ReviewResult, AgentError> {
        let draft = context.draft()?;

        let prompt = format!(
            "Please review this blog post draft.\n\n\
             PROJECT CONTEXT:\n\
             - Title: \"{title}\"\n\
             - Keywords: \"{keywords}\"\n\
             - Target: {target}\n\
             - Word count: {words}\n\n\
             DRAFT:\n{content}\n\n\
             Provide your review in exactly this format:\n\n\
             OVERALL SCORE: [1-10]\n\n\
             {STRENGTHS}:\n1. ...\n\n\
             {CRITICAL}:\n1. ...\n\n\
             {IMPROVEMENTS}:\n1. ...\n\n\
             {SEO}:\n1. ...\n\n\
             {BRAND}:\n[how well the draft reflects {brand}'s voice and values]\n\n\
             {PRIORITIES}:\n1. [most important change first]\n\n\
             A score of {PUBLICATION_THRESHOLD} or higher means the post is ready to publish.",
            title = inputs.title,
            keywords = inputs.keywords,
            target = inputs.context,
            words = draft.word_count,
            content = draft.content,
            brand = self.prompter.brand().name,
        );

        let reply = self.prompter.ask(INSTRUCTIONS, prompt, BUDGET).await?;
        Ok(parse_review(reply))
    }
}

fn parse_review(reply: String) -> ReviewResult {
    let score = extract_score(&reply);
    if score.is_none() {
        tracing::warn!("Review reply has no readable score, using 0");
    }
    let overall_score = score.unwrap_or(0.0);
    let publication_ready = overall_score >= PUBLICATION_THRESHOLD;

    let section = |header: &str| {
        let ends: Vec<&str> = SECTIONS.iter().copied().filter(|h| *h != header).collect();
        extract_section(&reply, header, &ends).unwrap_or_default()
    };

    let strengths = parse_numbered_list(&section(STRENGTHS));
    let critical_issues = parse_numbered_list(&section(CRITICAL));
    let improvements = parse_numbered_list(&section(IMPROVEMENTS));
    let seo_recommendations = parse_numbered_list(&section(SEO));
    let brand_alignment = section(BRAND);
    let revision_priorities: Vec<String> = parse_numbered_list(&section(PRIORITIES))
        .into_iter()
        .filter(|item| item.chars().count() > MIN_PRIORITY_LEN)
        .collect();

    let summary = format!(
        "Review Score: {overall_score}/10 ({verdict}). {critical} critical issues, \
         {improve} improvements, {strong} strengths.",
        verdict = if publication_ready { "ready for publication" } else { "needs revision" },
        critical = critical_issues.len(),
        improve = improvements.len(),
        strong = strengths.len(),
    );

    tracing::info!(score = overall_score, ready = publication_ready, "Draft reviewed");

    ReviewResult {
        score,
        overall_score,
        publication_ready,
        strengths,
        critical_issues,
        improvements,
        seo_recommendations,
        revision_priorities,
        brand_alignment,
        summary,
        raw_response: reply,
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{client, CannedProvider};
    use super::super::{Draft, Stage, StepOutput};
    use super::*;

    const FULL_REPLY: &str = "**OVERALL SCORE:** 8/10\n\n\
        **STRENGTHS:**\n1. Clear structure throughout\n2. Practical exercises\n\n\
        **CRITICAL ISSUES:**\n1. Statistic in section two lacks a source\n\n\
        **IMPROVEMENT OPPORTUNITIES:**\n1. Tighten the introduction hook\n\n\
        **SEO RECOMMENDATIONS:**\n- Use the primary keyword in one more H2\n\n\
        **BRAND ALIGNMENT:**\nWarm and playful, on brand.\n\n\
        **REVISION PRIORITIES:**\n1. Source the statistic in section two\n2. Fix\n";

    #[test]
    fn test_score_of_eight_is_ready() {
        let review = parse_review(FULL_REPLY.to_string());

        assert_eq!(review.score, Some(8.0));
        assert!(review.publication_ready);
        assert_eq!(review.strengths.len(), 2);
        assert_eq!(review.critical_issues, vec!["Statistic in section two lacks a source"]);
        assert_eq!(review.improvements, vec!["Tighten the introduction hook"]);
        assert_eq!(review.seo_recommendations.len(), 1);
        assert_eq!(review.brand_alignment, "Warm and playful, on brand.");
        assert_eq!(review.revision_priorities, vec!["Source the statistic in section two"]);
        assert!(review.summary.starts_with("Review Score: 8/10 (ready for publication)"));
    }

    #[test]
    fn test_score_below_threshold_is_not_ready() {
        let review = parse_review("OVERALL SCORE: 7.9\nSolid but thin.".to_string());
        assert_eq!(review.overall_score, 7.9);
        assert!(!review.publication_ready);
        assert!(review.summary.contains("needs revision"));
    }

    #[test]
    fn test_missing_score_defaults_to_zero() {
        let review = parse_review("Nice work overall, a few tweaks needed.".to_string());
        assert_eq!(review.score, None);
        assert_eq!(review.overall_score, 0.0);
        assert!(!review.publication_ready);
        assert!(review.strengths.is_empty());
    }

    #[tokio::test]
    async fn test_review_prompt_includes_draft() {
        let provider = CannedProvider::new(&[FULL_REPLY]);
        let reviewer = Reviewer::new(client(provider.clone()), Arc::new(BrandProfile::default()));
        let draft = StepOutput::Draft(Draft {
            content: "# Listening\n\nBody of the draft.".into(),
            word_count: 6,
            reading_time_minutes: 1,
            keyword_density: Vec::new(),
            structure: Default::default(),
        });
        let context =
            RunningContext::from_outputs("run", Stage::Review, vec![(Stage::Drafting, &draft)]);

        let review = reviewer.review(&context, &BlogInputs::new("T", "a", "c")).await.unwrap();

        assert!(review.publication_ready);
        let prompt = provider.prompt(0);
        assert!(prompt.contains("Body of the draft."));
        assert!(prompt.contains("OVERALL SCORE: [1-10]"));
        assert_eq!(provider.requests.lock()[0].max_tokens, 3000);
    }
}
