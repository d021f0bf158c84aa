use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use super::dto::{ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl, RawEstimate};
use super::{AnalysisFailure, MealEstimate, PhotoAnalyzer};
use crate::config::VisionConfig;

/// Bumped whenever the prompt text changes; logged with every analysis.
pub const PROMPT_VERSION: &str = "meal-kcal-v1";

const CONNECT_TIMEOUT_SECS: u64 = 10;

fn meal_prompt(region: &str) -> String {
    format!(
        "Analyze the meal in the image and respond with a JSON object containing two keys: \
         \"calories\" for the estimated total calorie count as an integer, \
         and \"description\" for a brief (10 words or less) description of the meal. \
         Base your estimation on the fact that I live in {region} and take that into account \
         when estimating package sizing.\n\
         Respond with only the JSON object, in the following format:\n\
         {{\n  \"calories\": 0,\n  \"description\": \"\"\n}}"
    )
}

/// Client for any OpenAI-compatible chat-completions endpoint with image input.
pub struct OpenAiVision {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    prompt: String,
}

impl OpenAiVision {
    pub fn new(config: &VisionConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build vision http client")?;

        info!(
            base_url = %config.base_url,
            model = %config.model,
            prompt_version = PROMPT_VERSION,
            "vision analyzer ready"
        );

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            prompt: meal_prompt(&config.region),
        })
    }

    async fn request_content(&self, image_url: &str) -> Result<String, AnalysisFailure> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: self.prompt.clone(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image_url },
                    },
                ],
            }],
            max_tokens: self.max_tokens,
        };

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            warn!(%status, body = %truncate(&text, 300), "vision provider error response");
            return Err(AnalysisFailure::Status(status.as_u16()));
        }

        let envelope: ChatResponse = res.json().await.map_err(|e| {
            if e.is_timeout() {
                AnalysisFailure::Timeout
            } else {
                AnalysisFailure::Envelope(e.to_string())
            }
        })?;

        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AnalysisFailure::Envelope("no message content".into()))
    }
}

#[async_trait]
impl PhotoAnalyzer for OpenAiVision {
    #[instrument(skip(self), fields(model = %self.model, prompt_version = PROMPT_VERSION))]
    async fn analyze(&self, image_url: &str) -> Result<MealEstimate, AnalysisFailure> {
        let outcome = match self.request_content(image_url).await {
            Ok(content) => {
                debug!(content = %content, "vision reply");
                parse_estimate(&content)
            }
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(est) => info!(calories = est.calories, description = %est.description, "meal estimated"),
            Err(e) => warn!(error = %e, "meal analysis failed"),
        }
        outcome
    }
}

fn from_reqwest(e: reqwest::Error) -> AnalysisFailure {
    if e.is_timeout() {
        AnalysisFailure::Timeout
    } else {
        AnalysisFailure::Transport(e.to_string())
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Pulls the `{calories, description}` object out of the model's reply,
/// tolerating surrounding prose or a Markdown fence. Each `{` is tried as the
/// start of a JSON object; the first one carrying `calories` wins, otherwise
/// the first complete object is checked and rejected.
pub(crate) fn parse_estimate(content: &str) -> Result<MealEstimate, AnalysisFailure> {
    let mut first_object = None;
    for (start, _) in content.match_indices('{') {
        let mut stream =
            serde_json::Deserializer::from_str(&content[start..]).into_iter::<Map<String, Value>>();
        if let Some(Ok(object)) = stream.next() {
            if object.contains_key("calories") {
                first_object = Some(object);
                break;
            }
            first_object.get_or_insert(object);
        }
    }
    let object = first_object.ok_or(AnalysisFailure::NoPayload)?;

    let raw: RawEstimate = serde_json::from_value(Value::Object(object))
        .map_err(|e| AnalysisFailure::Payload(e.to_string()))?;

    let calories = if raw.calories < 0 {
        warn!(calories = raw.calories, "negative calorie estimate clamped to 0");
        0
    } else {
        u32::try_from(raw.calories)
            .map_err(|_| AnalysisFailure::Payload(format!("calories out of range: {}", raw.calories)))?
    };

    Ok(MealEstimate {
        description: raw.description.trim().to_string(),
        calories,
    })
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn plain_object() {
        let est = parse_estimate(r#"{"calories": 650, "description": "Schnitzel with fries"}"#).unwrap();
        assert_eq!(
            est,
            MealEstimate {
                description: "Schnitzel with fries".into(),
                calories: 650,
            }
        );
    }

    #[test]
    fn fenced_object_with_prose() {
        let content = "Sure! Here is my estimate:\n```json\n{\n  \"calories\": 420,\n  \"description\": \"Bowl of muesli with milk\"\n}\n```";
        assert_eq!(parse_estimate(content).unwrap().calories, 420);
    }

    #[test]
    fn missing_calories_fails() {
        let err = parse_estimate(r#"{"description": "salad"}"#).unwrap_err();
        assert!(matches!(err, AnalysisFailure::Payload(_)));
    }

    #[test]
    fn non_integer_calories_fail() {
        for c in [r#"{"calories": 512.5}"#, r#"{"calories": "500"}"#, r#"{"calories": null}"#] {
            assert!(matches!(parse_estimate(c), Err(AnalysisFailure::Payload(_))), "{c}");
        }
    }

    #[test]
    fn no_json_fails() {
        assert!(matches!(
            parse_estimate("I cannot identify food in this image."),
            Err(AnalysisFailure::NoPayload)
        ));
        assert!(matches!(parse_estimate("} oops {"), Err(AnalysisFailure::NoPayload)));
    }

    #[test]
    fn braces_in_prose_around_object() {
        let after = "{\"calories\": 500, \"description\": \"pasta\"}\n(estimate assumes {standard} portion)";
        let est = parse_estimate(after).unwrap();
        assert_eq!((est.calories, est.description.as_str()), (500, "pasta"));

        let before = "Assuming a {regular} plate: {\"calories\": 320, \"description\": \"soup\"}";
        assert_eq!(parse_estimate(before).unwrap().calories, 320);

        let nested = r#"Note {"unit": "kcal"} then {"calories": 210, "description": "toast"}"#;
        assert_eq!(parse_estimate(nested).unwrap().calories, 210);
    }

    #[test]
    fn negative_calories_clamped() {
        let est = parse_estimate(r#"{"calories": -30, "description": "water"}"#).unwrap();
        assert_eq!(est.calories, 0);
    }

    #[test]
    fn missing_description_defaults_empty() {
        let est = parse_estimate(r#"{"calories": 90}"#).unwrap();
        assert_eq!(est.description, "");
    }

    #[test]
    fn prompt_mentions_region_and_format() {
        let p = meal_prompt("Germany");
        assert!(p.contains("live in Germany"));
        assert!(p.contains("\"calories\": 0"));
    }
}
