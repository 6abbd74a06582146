use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::model::{FallbackNeeded, ModelClient, ModelError};

/// What the model answered, before the category is resolved against the
/// catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCategorization {
    pub reasoning: String,
    pub category: String,
    pub confidence: f64,
}

/// The exact shape a structured completion must decode into.
#[derive(Debug, Deserialize)]
struct StructuredCategorization {
    reasoning: String,
    category: String,
    confidence: f64,
}

impl From<StructuredCategorization> for RawCategorization {
    fn from(s: StructuredCategorization) -> Self {
        RawCategorization {
            reasoning: s.reasoning,
            category: s.category,
            confidence: s.confidence,
        }
    }
}

/// Gets a categorization out of the model: structured decoding first,
/// falling back to pulling a JSON object out of free text.
pub struct ResponseExtractor {
    timeout: Duration,
}

impl ResponseExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn extract<M>(&self, model: &M, prompt: &str) -> Option<RawCategorization>
    where
        M: ModelClient + ?Sized,
    {
        match self.structured(model, prompt).await {
            Ok(raw) => Some(raw),
            Err(reason) => {
                debug!(%reason, "falling back to text completion");
                self.fallback(model, prompt).await
            }
        }
    }

    async fn structured<M>(&self, model: &M, prompt: &str) -> Result<RawCategorization, FallbackNeeded>
    where
        M: ModelClient + ?Sized,
    {
        let value = tokio::time::timeout(self.timeout, model.complete_structured(prompt))
            .await
            .map_err(|_| FallbackNeeded::Failed(ModelError::Timeout(self.timeout)))??;

        serde_json::from_value::<StructuredCategorization>(value)
            .map(RawCategorization::from)
            .map_err(|e| FallbackNeeded::Schema(e.to_string()))
    }

    async fn fallback<M>(&self, model: &M, prompt: &str) -> Option<RawCategorization>
    where
        M: ModelClient + ?Sized,
    {
        let text = match tokio::time::timeout(self.timeout, model.complete(prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                error!(error = %e, "Text completion failed");
                return None;
            }
            Err(_) => {
                error!(timeout = ?self.timeout, "Text completion timed out");
                return None;
            }
        };

        let value = find_json_object(&text).and_then(|span| serde_json::from_str::<Value>(span).ok());
        let Some(value) = value else {
            error!(response = %text, "Failed to parse LLM response as JSON");
            return None;
        };

        let raw = from_loose_value(value);
        if raw.is_none() {
            warn!(response = %text, "LLM response JSON has no category");
        }
        raw
    }
}

/// The span from the first `{` to the last `}`, if there is one.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Applies the lenient post-conditions to a hand-parsed model answer.
/// Returns `None` unless `value` is an object with a string `category`.
pub fn from_loose_value(value: Value) -> Option<RawCategorization> {
    let Value::Object(map) = value else {
        return None;
    };
    let category = map.get("category")?.as_str()?.to_string();

    let reasoning = match map.get("reasoning") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    Some(RawCategorization {
        reasoning,
        category,
        confidence: coerce_confidence(map.get("confidence")),
    })
}

/// Numbers, numeric strings and booleans become a finite `f64`; anything
/// else is `0.0`.
pub fn coerce_confidence(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|c| c.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MockModel;
    use serde_json::json;

    fn extractor() -> ResponseExtractor {
        ResponseExtractor::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn structured_answer_is_used_directly() {
        let model = MockModel::new()
            .with_structured(json!({"reasoning": "r", "category": "Food", "confidence": 8}))
            .with_text("{\"category\": \"Never asked\", \"confidence\": 1}");
        let raw = extractor().extract(&model, "prompt").await.unwrap();
        assert_eq!(raw.category, "Food");
        assert_eq!(raw.confidence, 8.0);
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn fallback_parses_embedded_object() {
        let model = MockModel::new().with_text(
            "noise {\"reasoning\":\"r\",\"category\":\"Food\",\"confidence\":7} trailing",
        );
        let raw = extractor().extract(&model, "prompt").await.unwrap();
        assert_eq!(
            raw,
            RawCategorization {
                reasoning: "r".to_string(),
                category: "Food".to_string(),
                confidence: 7.0,
            }
        );
    }

    #[tokio::test]
    async fn structured_error_falls_back_to_text() {
        let model = MockModel::new()
            .with_structured_error("json mode not implemented")
            .with_text("{\"category\":\"Rent\",\"confidence\":9}");
        let raw = extractor().extract(&model, "prompt").await.unwrap();
        assert_eq!(raw.category, "Rent");
        assert_eq!(raw.reasoning, "");
    }

    #[tokio::test]
    async fn structured_schema_mismatch_falls_back_to_text() {
        let model = MockModel::new()
            .with_structured(json!({"category": "Rent", "confidence": "high"}))
            .with_text("{\"category\":\"Utilities\",\"confidence\":6}");
        let raw = extractor().extract(&model, "prompt").await.unwrap();
        assert_eq!(raw.category, "Utilities");
    }

    #[tokio::test]
    async fn text_without_object_is_none() {
        let model = MockModel::new().with_text("I think this is groceries.");
        assert!(extractor().extract(&model, "prompt").await.is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_none() {
        let model = MockModel::new().with_text("{\"category\": \"Food\", }");
        assert!(extractor().extract(&model, "prompt").await.is_none());
    }

    #[tokio::test]
    async fn text_completion_error_is_none() {
        let model = MockModel::new().with_text_error("connection reset");
        assert!(extractor().extract(&model, "prompt").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_times_out_to_none() {
        struct Stalled;

        #[async_trait::async_trait]
        impl ModelClient for Stalled {
            async fn complete_structured(&self, _: &str) -> Result<Value, FallbackNeeded> {
                Err(FallbackNeeded::Unsupported)
            }

            async fn complete(&self, _: &str) -> Result<String, ModelError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("{\"category\":\"Late\"}".to_string())
            }
        }

        assert!(extractor().extract(&Stalled, "prompt").await.is_none());
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(from_loose_value(json!(["Food", 7])).is_none());
        assert!(from_loose_value(json!("Food")).is_none());
    }

    #[test]
    fn missing_or_non_string_category_is_rejected() {
        assert!(from_loose_value(json!({"reasoning": "r", "confidence": 7})).is_none());
        assert!(from_loose_value(json!({"category": 3, "confidence": 7})).is_none());
    }

    #[test]
    fn null_reasoning_defaults_to_empty() {
        let raw = from_loose_value(json!({"reasoning": null, "category": "Food"})).unwrap();
        assert_eq!(raw.reasoning, "");
    }

    #[test]
    fn unparseable_confidence_is_zero() {
        let raw = from_loose_value(json!({"category": "Food", "confidence": "not-a-number"})).unwrap();
        assert_eq!(raw.confidence, 0.0);
    }

    #[test]
    fn confidence_coercion() {
        assert_eq!(coerce_confidence(Some(&json!(7))), 7.0);
        assert_eq!(coerce_confidence(Some(&json!(" 8.5 "))), 8.5);
        assert_eq!(coerce_confidence(Some(&json!(true))), 1.0);
        assert_eq!(coerce_confidence(Some(&json!(null))), 0.0);
        assert_eq!(coerce_confidence(Some(&json!({"v": 9}))), 0.0);
        assert_eq!(coerce_confidence(Some(&json!("NaN"))), 0.0);
        assert_eq!(coerce_confidence(None), 0.0);
    }

    #[test]
    fn json_span_is_first_open_to_last_close() {
        assert_eq!(find_json_object("a {\"x\": {\"y\": 1}} b"), Some("{\"x\": {\"y\": 1}}"));
        assert_eq!(find_json_object("} backwards {"), None);
        assert_eq!(find_json_object("no braces"), None);
    }
}
