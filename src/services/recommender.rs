use crate::{
    error::{ApiError, Result},
    models::UserInterest,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};
use tracing::{debug, error};

/// Only the most recent interests go into the prompt.
const MAX_PROMPT_INTERESTS: usize = 50;

const SYSTEM_PROMPT: &str = "You recommend books. Answer with a single JSON object whose keys \
    are genre names and whose values are arrays of book titles. No other text.";

/// Genre name to suggested titles, as produced by a recommendation source.
pub type Suggestions = HashMap<String, Vec<String>>;

/// Whatever turns a user's interests into genre-bucketed title suggestions.
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn suggest(&self, interests: &[UserInterest], genres: &[String]) -> Result<Suggestions>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Recommendation source backed by an OpenAI-compatible chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiRecommender {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiRecommender {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

/// Build the user prompt from interest history and preferred genres.
pub fn build_prompt(interests: &[UserInterest], genres: &[String]) -> String {
    let recent = interests
        .iter()
        .rev()
        .take(MAX_PROMPT_INTERESTS)
        .rev()
        .map(|interest| format!("- {}", interest.query))
        .collect::<Vec<_>>()
        .join("\n");

    let genres = if genres.is_empty() {
        "none selected".to_string()
    } else {
        genres.join(", ")
    };

    format!(
        "Recent searches of the reader:\n{}\n\nPreferred genres: {}\n\n\
         Suggest books grouped by genre.",
        if recent.is_empty() { "- (none)" } else { recent.as_str() },
        genres
    )
}

/// Parse the model output, tolerating a surrounding markdown code fence.
pub fn parse_suggestions(content: &str) -> Result<Suggestions> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body).map_err(|e| {
        ApiError::SerializationError(format!("Unexpected recommendation payload: {}", e))
    })
}

#[async_trait]
impl RecommendationSource for OpenAiRecommender {
    async fn suggest(&self, interests: &[UserInterest], genres: &[String]) -> Result<Suggestions> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(interests, genres),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.7,
        };

        debug!("Requesting recommendations from {}", self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Recommendation API error: {}", error_text);
            return Err(ApiError::ExternalServiceError(format!(
                "Recommendation API error: {}",
                error_text
            )));
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ApiError::ExternalServiceError("Recommendation API returned no choices".to_string())
            })?;

        parse_suggestions(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn interest(query: &str) -> UserInterest {
        UserInterest {
            id: 1,
            user_id: Uuid::nil(),
            query: query.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_prompt_lists_interests_and_genres() {
        let prompt = build_prompt(
            &[interest("desert planets"), interest("sandworms")],
            &["SciFi".to_string(), "Fantasy".to_string()],
        );
        assert!(prompt.contains("- desert planets\n- sandworms"));
        assert!(prompt.contains("Preferred genres: SciFi, Fantasy"));
    }

    #[test]
    fn test_prompt_keeps_most_recent_interests() {
        let interests: Vec<UserInterest> = (0..60).map(|i| interest(&format!("q{}", i))).collect();
        let prompt = build_prompt(&interests, &[]);

        assert!(!prompt.contains("- q9\n"));
        assert!(prompt.contains("- q10\n"));
        assert!(prompt.contains("- q59"));
        assert!(prompt.contains("none selected"));
    }

    #[test]
    fn test_parse_plain_and_fenced() {
        let plain = parse_suggestions(r#"{"SciFi": ["Dune"], "Horror": ["It"]}"#).unwrap();
        assert_eq!(plain["SciFi"], vec!["Dune"]);
        assert_eq!(plain.len(), 2);

        let fenced = parse_suggestions("```json\n{\"Fantasy\": []}\n```").unwrap();
        assert!(fenced["Fantasy"].is_empty());

        assert!(parse_suggestions("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = parse_suggestions("I recommend Dune.").unwrap_err();
        assert!(matches!(err, ApiError::SerializationError(_)));
    }

    #[tokio::test]
    async fn test_unreachable_api_fails() {
        let recommender =
            OpenAiRecommender::new("http://127.0.0.1:9", "key", "model", Duration::from_secs(1))
                .unwrap();
        assert!(recommender.suggest(&[], &[]).await.is_err());
    }
}
