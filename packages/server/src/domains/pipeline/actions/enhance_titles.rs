use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::domains::jobs::{EnhancedTitle, JobPatch, JobStatus, VideoItem};
use crate::domains::pipeline::payloads::{
    EnhancedContentPayload, FetchedItemsPayload, StageErrorPayload,
};
use crate::domains::pipeline::stage::{Stage, StageOutcome};
use crate::domains::pipeline::topics;
use crate::kernel::ServerDeps;

pub const SYSTEM_PROMPT: &str = "You are an expert YouTube content strategist who helps improve video titles to increase viewer engagement and click-through rates.";

/// Asks the model for a better version of every fetched title.
pub struct EnhanceContent;

/// One suggestion as returned by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct TitleSuggestion {
    #[serde(default)]
    pub original: String,
    pub improved: String,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Deserialize)]
struct SuggestionList {
    titles: Vec<TitleSuggestion>,
}

/// User prompt listing every title as `N. "title"`.
pub fn build_prompt(channel_name: &str, items: &[VideoItem]) -> String {
    let titles = items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. \"{}\"", i + 1, item.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a YouTube title optimization expert. Your task is to enhance the titles of the following YouTube videos to maximize viewer engagement and click-through rates.
Below are {count} video titles from the channel "{channel_name}".

For each title, provide:
- An improved version that is more engaging, SEO-friendly, and likely to get more clicks.
- A brief rationale (1-2 sentences) explaining why the new title is better.

Guidelines:
- Keep the core topic and authenticity of each title intact.
- Use action words and verbs, numbers, emotional triggers, and curiosity elements.
- Make it curiosity-inducing without being clickbait.
- Optimize for relevant keywords without stuffing.
- Optimize for searchability and clarity.

Video Titles:
{titles}

Respond in JSON format:
{{
  "titles": [
    {{
      "original": "...",
      "improved": "...",
      "rationale": "..."
    }}
  ]
}}
"#,
        count = items.len(),
        channel_name = channel_name,
        titles = titles,
    )
}

/// Parse the model's `{"titles": [...]}` answer.
pub fn parse_suggestions(raw: &str) -> Result<Vec<TitleSuggestion>> {
    if raw.trim().is_empty() {
        bail!("Inference returned no content");
    }

    let list: SuggestionList =
        serde_json::from_str(raw).context("Inference returned invalid JSON")?;
    Ok(list.titles)
}

/// Pair suggestions with the fetched items by position and re-attach each
/// item's watch URL. A blank `original` falls back to the fetched title.
pub fn align(items: &[VideoItem], suggestions: Vec<TitleSuggestion>) -> Result<Vec<EnhancedTitle>> {
    if suggestions.len() != items.len() {
        bail!(
            "Inference returned {} titles for {} videos",
            suggestions.len(),
            items.len()
        );
    }

    Ok(items
        .iter()
        .zip(suggestions)
        .map(|(item, suggestion)| EnhancedTitle {
            original: if suggestion.original.trim().is_empty() {
                item.title.clone()
            } else {
                suggestion.original
            },
            improved: suggestion.improved,
            rationale: suggestion.rationale,
            url: item.url.clone(),
        })
        .collect())
}

#[async_trait]
impl Stage for EnhanceContent {
    const NAME: &'static str = "EnhanceContent";
    const INPUT_TOPIC: &'static str = topics::FETCHED_ITEMS;
    const SUCCESS_TOPIC: &'static str = topics::ENHANCED_CONTENT;
    const ERROR_TOPIC: Option<&'static str> = Some(topics::ENHANCED_CONTENT_ERROR);
    const IN_PROGRESS: JobStatus = JobStatus::EnhancingTitles;

    type Input = FetchedItemsPayload;

    fn job_id(input: &FetchedItemsPayload) -> &str {
        &input.job_id
    }

    fn failure_context(input: &FetchedItemsPayload) -> StageErrorPayload {
        StageErrorPayload::new(&input.job_id, &input.email)
            .channel_id(&input.channel_id)
            .channel_name(&input.channel_name)
    }

    async fn run(&self, input: &FetchedItemsPayload, deps: &ServerDeps) -> Result<StageOutcome> {
        let prompt = build_prompt(&input.channel_name, &input.items);
        let raw = deps.ai.complete_json(SYSTEM_PROMPT, &prompt).await?;
        let enhanced = align(&input.items, parse_suggestions(&raw)?)?;

        tracing::info!(
            job_id = %input.job_id,
            count = enhanced.len(),
            "Enhanced titles"
        );

        let patch = JobPatch::status(JobStatus::TitlesEnhanced).enhanced_items(&enhanced);
        let payload = EnhancedContentPayload {
            job_id: input.job_id.clone(),
            email: input.email.clone(),
            channel_name: Some(input.channel_name.clone()),
            enhanced_items: enhanced,
        };

        Ok(StageOutcome::Advance {
            patch,
            payload: serde_json::to_value(payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{mock_video, MockAI};
    use crate::kernel::TestDependencies;
    use serde_json::json;

    fn fetched(items: Vec<VideoItem>) -> FetchedItemsPayload {
        FetchedItemsPayload {
            job_id: "job-1".into(),
            email: "a@b.co".into(),
            channel_id: "UC1".into(),
            channel_name: "Chan".into(),
            items,
        }
    }

    #[test]
    fn test_prompt_numbers_every_title() {
        let prompt = build_prompt("Chan", &[mock_video("a", "First"), mock_video("b", "Second")]);

        assert!(prompt.contains("Below are 2 video titles from the channel \"Chan\"."));
        assert!(prompt.contains("Video Titles:\n1. \"First\"\n2. \"Second\"\n"));
        assert!(prompt.contains("\"titles\""));
    }

    #[test]
    fn test_align_keeps_model_original_and_reattaches_urls() {
        let items = vec![mock_video("a", "First"), mock_video("b", "Second")];
        let suggestions = vec![
            TitleSuggestion {
                original: "something else".into(),
                improved: "First, better".into(),
                rationale: "r1".into(),
            },
            TitleSuggestion {
                original: String::new(),
                improved: "Second, better".into(),
                rationale: "r2".into(),
            },
        ];

        let aligned = align(&items, suggestions).unwrap();

        assert_eq!(aligned[0].original, "something else");
        assert_eq!(aligned[0].improved, "First, better");
        assert_eq!(aligned[0].url, "https://www.youtube.com/watch?v=a");
        assert_eq!(aligned[1].original, "Second");
        assert_eq!(aligned[1].url, "https://www.youtube.com/watch?v=b");
    }

    #[test]
    fn test_count_mismatch_is_an_error() {
        let items = vec![mock_video("a", "First"), mock_video("b", "Second")];
        let suggestions = vec![TitleSuggestion {
            original: "First".into(),
            improved: "Better".into(),
            rationale: "r".into(),
        }];

        let err = align(&items, suggestions).unwrap_err();
        assert_eq!(err.to_string(), "Inference returned 1 titles for 2 videos");
    }

    #[test]
    fn test_parse_rejects_empty_and_invalid_content() {
        assert!(parse_suggestions("  ")
            .unwrap_err()
            .to_string()
            .contains("no content"));
        assert!(parse_suggestions("not json").is_err());
        assert!(parse_suggestions(r#"{"other": []}"#).is_err());
    }

    #[tokio::test]
    async fn test_run_sends_system_and_user_prompt() {
        let test_deps = TestDependencies::new();
        let ai = test_deps.ai.clone();
        let deps = test_deps.into_server_deps();

        let outcome = EnhanceContent
            .run(&fetched(vec![mock_video("a", "First")]), &deps)
            .await
            .unwrap();

        let calls = ai.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system_prompt, SYSTEM_PROMPT);
        assert!(calls[0].user_prompt.contains("1. \"First\""));

        let StageOutcome::Advance { payload, patch } = outcome else {
            panic!("expected advance");
        };
        assert_eq!(patch.target_status(), Some(JobStatus::TitlesEnhanced));
        assert_eq!(payload["channelName"], "Chan");
        assert_eq!(payload["enhancedItems"][0]["improved"], "First (Improved)");
    }

    #[tokio::test]
    async fn test_inference_failure_is_a_fault() {
        let deps = TestDependencies::new()
            .mock_ai(MockAI::new().with_error("model overloaded"))
            .into_server_deps();

        let err = EnhanceContent
            .run(&fetched(vec![mock_video("a", "First")]), &deps)
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_fault() {
        let deps = TestDependencies::new()
            .mock_ai(MockAI::new().with_json_response(&json!({"titles": "nope"})))
            .into_server_deps();

        let err = EnhanceContent
            .run(&fetched(vec![mock_video("a", "First")]), &deps)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid JSON"));
    }
}
