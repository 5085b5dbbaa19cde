//! Content planning: fill in missing subject inputs.

use std::sync::Arc;

use super::{
    AgentError, AgentKind, BlogInputs, BrandProfile, Budget, InputField, PlanResult, Prompter,
};
use crate::completion::CompletionClient;
use crate::text::extract_labeled_field;

const BUDGET: Budget = Budget::new(1500, 0.7);

const INSTRUCTIONS: &str = "\
You help complete the inputs of a blog post workflow. When generating missing \
fields, keep them aligned with the brand values and audiences above and favor \
practical, real-world angles.";

/// Completes title, keywords and context before the main pipeline starts.
pub struct ContentPlanner {
    prompter: Prompter,
}

impl ContentPlanner {
    pub fn new(client: Arc<CompletionClient>, brand: Arc<BrandProfile>) -> Self {
        Self { prompter: Prompter::new(client, brand, AgentKind::ContentPlanner) }
    }

    /// Fill the missing fields of `inputs`.
    ///
    /// Makes no request when every field is present. Provided fields are
    /// never overwritten; a missing field the reply does not cover stays empty.
    pub async fn plan(&self, inputs: &BlogInputs) -> Result<PlanResult, AgentError> {
        let missing = inputs.missing_fields();
        let provided: Vec<InputField> =
            InputField::ALL.into_iter().filter(|f| !missing.contains(f)).collect();

        let mut result = PlanResult {
            title: inputs.title.trim().to_string(),
            keywords: inputs.keywords.trim().to_string(),
            context: inputs.context.trim().to_string(),
            allow_web: inputs.allow_web,
            provided,
            generated: Vec::new(),
            raw_response: None,
        };

        if missing.is_empty() {
            tracing::debug!("All inputs provided, nothing to plan");
            return Ok(result);
        }

        let prompt = self.prompt(inputs, &missing);
        let reply = self.prompter.ask(INSTRUCTIONS, prompt, BUDGET).await?;

        for field in &missing {
            match extract_labeled_field(&reply, field.label()) {
                Some(value) => {
                    let slot = match field {
                        InputField::Title => &mut result.title,
                        InputField::Keywords => &mut result.keywords,
                        InputField::Context => &mut result.context,
                    };
                    *slot = value;
                    result.generated.push(*field);
                }
                None => tracing::warn!(field = %field, "Planner reply did not include field"),
            }
        }

        result.raw_response = Some(reply);
        Ok(result)
    }

    fn prompt(&self, inputs: &BlogInputs, missing: &[InputField]) -> String {
        let mut prompt = String::from(
            "I need help completing the inputs for a blog post creation workflow. \
             Here's what the user provided:\n\n",
        );

        for field in InputField::ALL {
            let value = inputs.field(field).trim();
            if !value.is_empty() {
                prompt.push_str(&format!("{}: \"{}\"\n", field.label(), value));
            }
        }

        let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
        prompt.push_str(&format!("\nMISSING FIELDS: {}\n\n", names.join(", ")));
        prompt.push_str(&format!(
            "Please generate the missing fields based on what was provided, for {}.\n\n",
            self.prompter.brand().name
        ));
        prompt.push_str("Generate ONLY the missing fields in this exact format:\n");

        for field in missing {
            let hint = match field {
                InputField::Title => "[a compelling blog post title]",
                InputField::Keywords => "[4-6 SEO keywords, comma-separated]",
                InputField::Context => "[audience, tone, and purpose description]",
            };
            prompt.push_str(&format!("{}: {}\n", field.label(), hint));
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{client, CannedProvider};
    use super::*;

    fn planner(provider: &Arc<CannedProvider>) -> ContentPlanner {
        ContentPlanner::new(client(provider.clone()), Arc::new(BrandProfile::default()))
    }

    #[tokio::test]
    async fn test_complete_inputs_skip_the_model() {
        let provider = CannedProvider::new(&[]);
        let inputs = BlogInputs::new("T", "a,b", "adults");

        let plan = planner(&provider).plan(&inputs).await.unwrap();

        assert_eq!(provider.request_count(), 0);
        assert_eq!(plan.inputs(), inputs);
        assert!(plan.generated.is_empty());
        assert_eq!(plan.provided.len(), 3);
    }

    #[tokio::test]
    async fn test_provided_title_is_never_overwritten() {
        let provider = CannedProvider::new(&[
            "TITLE: Something Else Entirely\nKEYWORDS: improv, listening\nCONTEXT: Team leads",
        ]);
        let inputs = BlogInputs::new("X", "", "");

        let plan = planner(&provider).plan(&inputs).await.unwrap();

        assert_eq!(plan.title, "X");
        assert_eq!(plan.keywords, "improv, listening");
        assert_eq!(plan.context, "Team leads");
        assert_eq!(plan.generated, vec![InputField::Keywords, InputField::Context]);
        assert_eq!(plan.provided, vec![InputField::Title]);
    }

    #[tokio::test]
    async fn test_prompt_asks_only_for_missing_fields() {
        let provider = CannedProvider::new(&["**KEYWORDS:** \"a, b\""]);
        let inputs = BlogInputs::new("Listening Well", "", "Managers");

        let plan = planner(&provider).plan(&inputs).await.unwrap();
        let prompt = provider.prompt(0);

        assert!(prompt.contains("TITLE: \"Listening Well\""));
        assert!(prompt.contains("MISSING FIELDS: keywords"));
        assert!(prompt.contains("KEYWORDS: [4-6 SEO keywords"));
        assert!(!prompt.contains("TITLE: [a compelling"));
        assert_eq!(plan.keywords, "a, b");
    }

    #[tokio::test]
    async fn test_unanswered_field_stays_empty() {
        let provider = CannedProvider::new(&["I am not sure what to suggest."]);
        let plan = planner(&provider).plan(&BlogInputs::new("", "k", "c")).await.unwrap();

        assert_eq!(plan.title, "");
        assert!(plan.generated.is_empty());
        assert!(plan.raw_response.is_some());
    }
}
