//! Content writing: subheadings (stage 4), drafting (stage 6), revision (stage 8).

use std::sync::Arc;

use regex::RegexBuilder;

use super::{
    AgentError, AgentKind, BlogInputs, BrandProfile, Budget, Draft, HeadingSubheadings,
    Prompter, RevisionResult, RunningContext, SubheadingPlan, WordCountChange,
};
use crate::completion::CompletionClient;
use crate::text::{
    analyze_structure, extract_subheadings, keyword_density, reading_time_minutes, word_count,
};

const SUBHEADING_BUDGET: Budget = Budget::new(2000, 0.6);
const COMPOSE_BUDGET: Budget = Budget::new(4000, 0.7);
const REVISE_BUDGET: Budget = Budget::new(4000, 0.6);

/// Most subheadings kept under one heading.
const MAX_SUBHEADINGS: usize = 5;

const INSTRUCTIONS: &str = "\
You create engaging, informative blog content that resonates with the target \
audience.

WRITING PRINCIPLES:
- Hook readers immediately with relatable scenarios or compelling questions
- Include concrete examples, exercises, and actionable advice
- Write in a conversational yet professional tone
- Use clear, concise sentences and vary sentence length
- Integrate keywords naturally without forcing them";

/// Writes subheadings, the draft and the revision.
pub struct ContentWriter {
    prompter: Prompter,
}

impl ContentWriter {
    pub fn new(client: Arc<CompletionClient>, brand: Arc<BrandProfile>) -> Self {
        Self { prompter: Prompter::new(client, brand, AgentKind::ContentWriter) }
    }

    /// Recommend 0-5 subheadings for each selected heading.
    ///
    /// Zero is a valid answer for a self-contained section. Longer lists are
    /// cut to the first five.
    pub async fn suggest_subheadings(
        &self,
        context: &RunningContext,
        inputs: &BlogInputs,
    ) -> Result<SubheadingPlan, AgentError> {
        let selection = context.selection()?;

        let headings = selection
            .selected_h2s
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{}. {}", i + 1, h))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "I need H3 subheading recommendations for each H2 heading in this outline.\n\n\
             PROJECT CONTEXT:\n\
             - Title: \"{title}\"\n\
             - Keywords: \"{keywords}\"\n\
             - Target: {target}\n\n\
             SELECTED H2 HEADINGS:\n{headings}\n\n\
             H3 POLICY:\n\
             - Recommend 0-{MAX_SUBHEADINGS} H3s per H2, only where they add real value\n\
             - 0 H3s is expected and acceptable for self-contained sections\n\
             - Never add H3s just to fill space\n\n\
             FORMAT:\n\
             For each H2, repeat the heading exactly as given, then list its H3s as bullets. \
             If none are needed, write \"No H3s needed\" under the heading.",
            title = inputs.title,
            keywords = inputs.keywords,
            target = inputs.context,
        );

        let reply = self.prompter.ask(INSTRUCTIONS, prompt, SUBHEADING_BUDGET).await?;

        let sections = heading_sections(&reply, &selection.selected_h2s);
        let suggestions: Vec<HeadingSubheadings> = selection
            .selected_h2s
            .iter()
            .zip(sections)
            .map(|(heading, section)| {
                let mut subheadings = extract_subheadings(&section);
                if subheadings.len() > MAX_SUBHEADINGS {
                    tracing::debug!(
                        heading = %heading,
                        proposed = subheadings.len(),
                        "Capping subheadings"
                    );
                    subheadings.truncate(MAX_SUBHEADINGS);
                }
                HeadingSubheadings { heading: heading.clone(), subheadings, notes: section }
            })
            .collect();

        let total = suggestions.iter().map(|s| s.subheadings.len()).sum();
        tracing::info!(headings = suggestions.len(), subheadings = total, "Subheadings suggested");

        Ok(SubheadingPlan { suggestions, total, raw_response: reply })
    }

    /// Write the full article from the final outline.
    pub async fn compose(
        &self,
        context: &RunningContext,
        inputs: &BlogInputs,
    ) -> Result<Draft, AgentError> {
        let outline = context.final_outline()?;
        let selection = context.selection().ok();

        let prompt = format!(
            "I need you to write the complete blog post following the final outline.\n\n\
             PROJECT CONTEXT:\n\
             - Title: \"{title}\"\n\
             - Keywords: \"{keywords}\"\n\
             - Target: {target}\n\n\
             PROJECT BRIEF:\n{brief}\n\n\
             FINAL OUTLINE:\n{outline}\n\n\
             INTRODUCTION APPROACH: {intro}\n\
             CONCLUSION APPROACH: {conclusion}\n\n\
             WRITING ORDER:\n\
             1. Write every H2 body section first, following the outline exactly\n\
             2. Then write the introduction, previewing what the body delivers\n\
             3. Finally write the conclusion, drawing on the body sections\n\n\
             REQUIREMENTS:\n\
             - Target length: about {words} words\n\
             - Use `#` for the title, `##` for H2s and `###` for H3s\n\
             - Keep keyword density natural, around 1-2%\n\
             - Present the finished post in reading order (title, introduction, body, \
             conclusion)\n\n\
             Please provide only the complete blog post in Markdown.",
            title = inputs.title,
            keywords = inputs.keywords,
            target = inputs.context,
            brief = context.brief_text(),
            outline = outline.outline,
            intro = selection.map_or("", |s| s.selected_intro.as_str()),
            conclusion = selection.map_or("", |s| s.selected_conclusion.as_str()),
            words = outline.estimated_words,
        );

        let reply = self.prompter.ask(INSTRUCTIONS, prompt, COMPOSE_BUDGET).await?;
        let content = reply.trim().to_string();
        let words = word_count(&content);

        Ok(Draft {
            word_count: words,
            reading_time_minutes: reading_time_minutes(words),
            keyword_density: keyword_density(&content, &inputs.keyword_list()),
            structure: analyze_structure(&content),
            content,
        })
    }

    /// Rewrite the draft to address the review, keeping its structure.
    pub async fn revise(
        &self,
        context: &RunningContext,
        inputs: &BlogInputs,
    ) -> Result<RevisionResult, AgentError> {
        let draft = context.draft()?;
        let review = context.review()?;

        let priorities = if review.revision_priorities.is_empty() {
            "Address the feedback above in order of impact.".to_string()
        } else {
            review
                .revision_priorities
                .iter()
                .enumerate()
                .map(|(i, p)| format!("{}. {}", i + 1, p))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let prompt = format!(
            "I need you to revise this blog post based on the reviewer's feedback.\n\n\
             PROJECT CONTEXT:\n\
             - Title: \"{title}\"\n\
             - Keywords: \"{keywords}\"\n\n\
             ORIGINAL DRAFT:\n{draft}\n\n\
             REVIEW FEEDBACK (score {score}/10):\n{feedback}\n\n\
             REVISION PRIORITIES:\n{priorities}\n\n\
             REVISION RULES:\n\
             - Preserve the heading structure unless the feedback requires a change\n\
             - Fix every critical issue\n\
             - Keep the brand voice consistent\n\n\
             Please provide only the complete revised blog post in Markdown.",
            title = inputs.title,
            keywords = inputs.keywords,
            draft = draft.content,
            score = review.overall_score,
            feedback = review.raw_response,
        );

        let reply = self.prompter.ask(INSTRUCTIONS, prompt, REVISE_BUDGET).await?;
        let content = reply.trim().to_string();
        let words = word_count(&content);
        let change = WordCountChange::between(draft.word_count, words);

        tracing::info!(
            original = change.original,
            revised = change.revised,
            delta = change.delta,
            "Draft revised"
        );

        Ok(RevisionResult {
            word_count: words,
            reading_time_minutes: reading_time_minutes(words),
            keyword_density: keyword_density(&content, &inputs.keyword_list()),
            structure: analyze_structure(&content),
            change,
            content,
        })
    }
}

/// Text written under each heading, in heading order.
///
/// A section runs from the heading's first case-insensitive occurrence to the
/// next heading's occurrence. A heading the reply never mentions gets an
/// empty section.
fn heading_sections(reply: &str, headings: &[String]) -> Vec<String> {
    let spans: Vec<Option<(usize, usize)>> =
        headings.iter().map(|heading| find_ignore_case(reply, heading)).collect();

    spans
        .iter()
        .map(|span| {
            let Some((_, body_start)) = *span else {
                return String::new();
            };
            let body_end = spans
                .iter()
                .flatten()
                .map(|(start, _)| *start)
                .filter(|start| *start >= body_start)
                .min()
                .unwrap_or(reply.len());
            reply[body_start..body_end].trim().to_string()
        })
        .collect()
}

fn find_ignore_case(text: &str, needle: &str) -> Option<(usize, usize)> {
    let re = RegexBuilder::new(&regex::escape(needle.trim())).case_insensitive(true).build().ok()?;
    re.find(text).map(|m| (m.start(), m.end()))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{client, CannedProvider};
    use super::super::{FinalOutline, OutlineSelection, ReviewResult, Stage, StepOutput};
    use super::*;

    fn writer(provider: &Arc<CannedProvider>) -> ContentWriter {
        ContentWriter::new(client(provider.clone()), Arc::new(BrandProfile::default()))
    }

    fn selection(headings: &[&str]) -> StepOutput {
        StepOutput::OutlineSelection(OutlineSelection {
            selected_h2s: headings.iter().map(|h| h.to_string()).collect(),
            selected_intro: "Open with a story".into(),
            ..OutlineSelection::default()
        })
    }

    #[tokio::test]
    async fn test_subheadings_capped_at_five() {
        let reply = "## Listening First\n\
                     - Why silence matters\n- Reading the room\n- Mirroring phrases\n\
                     - Asking open questions\n- Pausing before replying\n\
                     - Taking short notes\n- Summarizing back\n- Following up later\n\n\
                     ## Saying Yes\nNo H3s needed, this section stands alone.";
        let provider = CannedProvider::new(&[reply]);
        let s = selection(&["Listening First", "Saying Yes"]);
        let context = RunningContext::from_outputs(
            "run",
            Stage::SubheadingSuggestions,
            vec![(Stage::OutlineSelection, &s)],
        );

        let plan = writer(&provider)
            .suggest_subheadings(&context, &BlogInputs::new("T", "a", "c"))
            .await
            .unwrap();

        assert_eq!(plan.suggestions.len(), 2);
        assert_eq!(plan.suggestions[0].subheadings.len(), 5);
        assert_eq!(plan.suggestions[0].subheadings[0], "Why silence matters");
        assert!(plan.suggestions[1].subheadings.is_empty());
        assert_eq!(plan.total, 5);
        assert!(provider.prompt(0).contains("2. Saying Yes"));
    }

    #[test]
    fn test_heading_sections_case_insensitive() {
        let reply = "LISTENING FIRST\n1. Silence in practice\nsaying yes\n- Building on offers";
        let headings = vec!["Listening First".to_string(), "Saying Yes".to_string(), "Gone".into()];

        let sections = heading_sections(reply, &headings);

        assert_eq!(sections[0], "1. Silence in practice");
        assert_eq!(sections[1], "- Building on offers");
        assert_eq!(sections[2], "");
    }

    fn outline_context(outline: &StepOutput) -> RunningContext {
        RunningContext::from_outputs(
            "run",
            Stage::Drafting,
            vec![(Stage::OutlineFinalization, outline)],
        )
    }

    #[tokio::test]
    async fn test_compose_reports_reading_time() {
        let body = format!("# Listening\n\n{}", "word ".repeat(398));
        let provider = CannedProvider::new(&[body.as_str()]);
        let outline = StepOutput::FinalOutline(FinalOutline {
            outline: "## Why it matters".into(),
            h2_count: 1,
            estimated_words: 700,
            ..FinalOutline::default()
        });

        let draft = writer(&provider)
            .compose(&outline_context(&outline), &BlogInputs::new("T", "listening, yes", "c"))
            .await
            .unwrap();

        assert_eq!(draft.word_count, 400);
        assert_eq!(draft.reading_time_minutes, 2);
        assert_eq!(draft.structure.h1_count, 1);
        assert_eq!(draft.keyword_density[0].keyword, "listening");
        assert_eq!(draft.keyword_density[0].count, 1);
        assert_eq!(draft.keyword_density[1].count, 0);
        let prompt = provider.prompt(0);
        assert!(prompt.contains("## Why it matters"));
        assert!(prompt.contains("about 700 words"));
        assert!(prompt.contains("Write every H2 body section first"));
    }

    #[tokio::test]
    async fn test_revise_reports_word_count_change() {
        let provider = CannedProvider::new(&["# T\n\none two three four five six"]);
        let draft = StepOutput::Draft(Draft {
            content: "# T\n\none two".into(),
            word_count: 4,
            reading_time_minutes: 1,
            keyword_density: Vec::new(),
            structure: Default::default(),
        });
        let review = StepOutput::Review(ReviewResult {
            overall_score: 6.5,
            raw_response: "Too short, expand the examples.".into(),
            revision_priorities: vec!["Expand the examples section".into()],
            ..ReviewResult::default()
        });
        let context = RunningContext::from_outputs(
            "run",
            Stage::Revision,
            vec![(Stage::Drafting, &draft), (Stage::Review, &review)],
        );

        let revision =
            writer(&provider).revise(&context, &BlogInputs::new("T", "a", "c")).await.unwrap();

        assert_eq!(revision.word_count, 8);
        assert_eq!(revision.change.delta, 4);
        assert!((revision.change.percent - 100.0).abs() < f64::EPSILON);
        let prompt = provider.prompt(0);
        assert!(prompt.contains("Too short, expand the examples."));
        assert!(prompt.contains("1. Expand the examples section"));
    }

    #[tokio::test]
    async fn test_revise_requires_review() {
        let provider = CannedProvider::new(&[]);
        let context = RunningContext::from_outputs("run", Stage::Revision, Vec::new());

        let err =
            writer(&provider).revise(&context, &BlogInputs::new("T", "a", "c")).await.unwrap_err();
        assert!(matches!(err, AgentError::MissingUpstream { needs: Stage::Drafting, .. }));
    }
}
