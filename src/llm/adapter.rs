use super::structured::{StructuredOutput, corrective_prompt, parse_structured, schema_prompt};
use super::traits::Provider;
use super::types::{ProviderMessage, ProviderResponse};
use crate::error::ModelError;
use crate::tools::ToolSpec;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Attempts allowed for a structured reply: the first plus one correction.
const STRUCTURED_ATTEMPTS: u32 = 2;

/// Timeout-bounded entry point to a model.
///
/// Built once at startup and shared by reference; workflows never construct
/// providers themselves.
#[derive(Clone)]
pub struct ModelAdapter {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl std::fmt::Debug for ModelAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAdapter")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelAdapter {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            timeout,
        }
    }

    /// Same provider and model at another temperature (writer vs. judge).
    pub fn with_temperature(&self, temperature: f64) -> Self {
        Self {
            temperature,
            ..self.clone()
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ModelError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(ModelError::Unavailable {
                provider: self.provider.name().to_string(),
                message: format!("{error:#}"),
            }),
            Err(_) => Err(ModelError::Unavailable {
                provider: self.provider.name().to_string(),
                message: format!("no reply within {:?}", self.timeout),
            }),
        }
    }

    pub async fn invoke_text(&self, prompt: &str) -> Result<String, ModelError> {
        self.bounded(
            self.provider
                .chat_with_system(None, prompt, &self.model, self.temperature),
        )
        .await
    }

    pub async fn invoke_messages(
        &self,
        system_prompt: Option<&str>,
        messages: &[ProviderMessage],
        tools: &[ToolSpec],
    ) -> Result<ProviderResponse, ModelError> {
        self.bounded(self.provider.chat_with_tools(
            system_prompt,
            messages,
            tools,
            &self.model,
            self.temperature,
        ))
        .await
    }

    /// Ask for a `T`, retrying once with the violation spelled out.
    pub async fn invoke_structured<T: StructuredOutput>(&self, prompt: &str) -> Result<T, ModelError> {
        let mut request = schema_prompt::<T>(prompt);
        let mut last_violation = String::new();

        for attempt in 1..=STRUCTURED_ATTEMPTS {
            let reply = self.invoke_text(&request).await?;
            match parse_structured::<T>(&reply) {
                Ok(value) => return Ok(value),
                Err(violation) => {
                    tracing::warn!(
                        attempt,
                        provider = self.provider.name(),
                        %violation,
                        "structured reply rejected"
                    );
                    request = corrective_prompt::<T>(prompt, &violation);
                    last_violation = violation;
                }
            }
        }

        Err(ModelError::SchemaValidation {
            attempts: STRUCTURED_ATTEMPTS,
            message: last_violation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::sync::Mutex;

    struct QueueProvider {
        replies: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
        delay: Duration,
    }

    impl QueueProvider {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(ToString::to_string).collect()),
                prompts: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }
    }

    impl Provider for QueueProvider {
        fn name(&self) -> &str {
            "queue"
        }

        fn chat_with_system<'a>(
            &'a self,
            _system_prompt: Option<&'a str>,
            message: &'a str,
            _model: &'a str,
            _temperature: f64,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                self.prompts.lock().unwrap().push(message.to_string());
                self.replies
                    .lock()
                    .unwrap()
                    .pop_front()
                    .ok_or_else(|| anyhow::anyhow!("connection refused"))
            })
        }
    }

    #[derive(Debug, Deserialize)]
    struct Verdict {
        score: f64,
    }

    impl StructuredOutput for Verdict {
        fn schema() -> Value {
            serde_json::json!({"type": "object", "required": ["score"]})
        }

        fn validate(&self) -> Result<(), String> {
            if (0.0..=10.0).contains(&self.score) {
                Ok(())
            } else {
                Err(format!("score {} is outside 0..=10", self.score))
            }
        }
    }

    fn adapter(provider: Arc<QueueProvider>, timeout: Duration) -> ModelAdapter {
        ModelAdapter::new(provider, "test-model", 0.0, timeout)
    }

    #[tokio::test]
    async fn structured_retries_once_with_violation() {
        let provider = Arc::new(QueueProvider::new(&[
            r#"{"score": 42}"#,
            r#"{"score": 6.5}"#,
        ]));
        let verdict: Verdict = adapter(provider.clone(), Duration::from_secs(5))
            .invoke_structured("Rate the blog.")
            .await
            .unwrap();

        assert!((verdict.score - 6.5).abs() < f64::EPSILON);
        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("score 42 is outside 0..=10"));
    }

    #[tokio::test]
    async fn structured_gives_up_after_second_failure() {
        let provider = Arc::new(QueueProvider::new(&["not json", "still not json"]));
        let err = adapter(provider, Duration::from_secs(5))
            .invoke_structured::<Verdict>("Rate the blog.")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ModelError::SchemaValidation { attempts: 2, .. }
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_unavailable() {
        let provider = Arc::new(QueueProvider::new(&[]));
        let err = adapter(provider, Duration::from_secs(5))
            .invoke_text("hello")
            .await
            .unwrap_err();
        match err {
            ModelError::Unavailable { provider, message } => {
                assert_eq!(provider, "queue");
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn slow_reply_times_out_as_unavailable() {
        let provider = Arc::new(QueueProvider {
            delay: Duration::from_millis(200),
            ..QueueProvider::new(&["late"])
        });
        let err = adapter(provider, Duration::from_millis(20))
            .invoke_text("hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Unavailable { .. }));
        assert!(err.to_string().contains("no reply within"));
    }

    #[test]
    fn with_temperature_keeps_model() {
        let provider = Arc::new(QueueProvider::new(&[]));
        let writer = adapter(provider, Duration::from_secs(1)).with_temperature(0.7);
        assert_eq!(writer.model(), "test-model");
        assert!((writer.temperature() - 0.7).abs() < f64::EPSILON);
    }
}
