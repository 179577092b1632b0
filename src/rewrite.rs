use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::observer::Observer;

/// System prompt for the paraphrasing model.
pub const REWRITE_SYSTEM_PROMPT: &str = r#"You rewrite text for a typing simulator.

Rewrite the user's text so it is unique while preserving the original meaning, tone, and key information.

Output rules (STRICT)
- Output ONLY the rewritten text.
- Do NOT add introductory phrases such as "Here is the paraphrased text:".
- Do NOT wrap the output in quotes or code fences.
- Keep paragraph breaks where the original has them.
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    #[default]
    Light,
    Moderate,
    Heavy,
}

impl Intensity {
    pub fn as_str(self) -> &'static str {
        match self {
            Intensity::Light => "light",
            Intensity::Moderate => "moderate",
            Intensity::Heavy => "heavy",
        }
    }
}

/// Alternative text source: paraphrases the input before it is typed.
pub trait Rewriter {
    fn rewrite(&self, text: &str, intensity: Intensity) -> Result<String>;
}

impl<F> Rewriter for F
where
    F: Fn(&str, Intensity) -> Result<String>,
{
    fn rewrite(&self, text: &str, intensity: Intensity) -> Result<String> {
        self(text, intensity)
    }
}

pub fn build_user_prompt(text: &str, intensity: Intensity) -> String {
    format!(
        "The desired intensity of the rewrite is '{intensity}'.\n\nORIGINAL TEXT:\n---\n{text}\n---",
        intensity = intensity.as_str(),
    )
}

/// Trim model output and reject empty rewrites.
pub fn clean_rewrite(output: &str) -> Result<String> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Err(Error::Service("rewrite returned empty text".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Rewrite `text`, falling back to the original on any service failure.
///
/// Failures are reported to the observer as non-fatal errors.
pub fn rewrite_or_original(
    rewriter: &dyn Rewriter,
    text: &str,
    intensity: Intensity,
    observer: &dyn Observer,
) -> String {
    observer.status("Sending text to the rewrite service...");
    match rewriter
        .rewrite(text, intensity)
        .and_then(|out| clean_rewrite(&out))
    {
        Ok(rewritten) => {
            observer.status("Rewrite complete.");
            rewritten
        }
        Err(err) => {
            tracing::warn!("rewrite failed, typing original text: {err}");
            observer.error(&err.to_string());
            text.to_string()
        }
    }
}

#[cfg(feature = "llm")]
pub mod openrouter {
    use super::*;

    use std::time::Duration;

    use async_openai::{
        config::OpenAIConfig,
        types::chat::{
            ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
            CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
        },
        Client,
    };
    use tokio::time::sleep;

    pub const DEFAULT_MODEL: &str = "google/gemini-3-flash-preview";

    const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
    const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

    /// One retry, after a pause.
    const RETRY_DELAYS: [Duration; 1] = [Duration::from_secs(10)];

    /// Run `op`, retrying once per entry in `delays` after sleeping for it.
    async fn with_retry<T, F, Fut>(delays: &[Duration], mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0usize;
        loop {
            match op().await {
                Ok(out) => return Ok(out),
                Err(err) => {
                    let Some(&delay) = delays.get(attempt) else {
                        return Err(err);
                    };
                    tracing::debug!(attempt, "rewrite request failed: {err}");
                    attempt += 1;
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }

    fn service<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Error + '_ {
        move |err| Error::Service(format!("{context}: {err}"))
    }

    #[derive(Debug, Clone)]
    pub struct OpenRouterRewriter {
        client: Client<OpenAIConfig>,
        model: String,
    }

    impl OpenRouterRewriter {
        pub fn from_env() -> Result<Self> {
            dotenvy::dotenv().ok();
            let api_key = std::env::var(OPENROUTER_API_KEY_ENV)
                .map_err(|_| Error::Service(format!("{OPENROUTER_API_KEY_ENV} is not set")))?;
            Self::new(api_key)
        }

        pub fn new(api_key: impl Into<String>) -> Result<Self> {
            let config = OpenAIConfig::new()
                .with_api_key(api_key.into())
                .with_api_base(OPENROUTER_API_BASE)
                .with_header("X-Title", "ghostwriter")
                .map_err(service("failed to set X-Title header"))?;

            Ok(Self {
                client: Client::with_config(config),
                model: DEFAULT_MODEL.to_string(),
            })
        }

        pub fn with_model(mut self, model: impl Into<String>) -> Self {
            self.model = model.into();
            self
        }

        pub async fn rewrite_async(&self, text: &str, intensity: Intensity) -> Result<String> {
            with_retry(&RETRY_DELAYS, || self.request_once(text, intensity)).await
        }

        async fn request_once(&self, text: &str, intensity: Intensity) -> Result<String> {
            let request = CreateChatCompletionRequestArgs::default()
                .model(self.model.as_str())
                .messages([
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(REWRITE_SYSTEM_PROMPT)
                        .build()
                        .map_err(service("failed to build system message"))?
                        .into(),
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(build_user_prompt(text, intensity))
                        .build()
                        .map_err(service("failed to build user message"))?
                        .into(),
                ])
                .build()
                .map_err(service("failed to build OpenRouter request"))?;

            let response = self
                .client
                .chat()
                .create(request)
                .await
                .map_err(service("OpenRouter chat completion request failed"))?;

            first_message(&response)
        }
    }

    fn first_message(response: &CreateChatCompletionResponse) -> Result<String> {
        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| Error::Service("missing choices[0].message.content".to_string()))
    }

    impl Rewriter for OpenRouterRewriter {
        fn rewrite(&self, text: &str, intensity: Intensity) -> Result<String> {
            let runtime = tokio::runtime::Runtime::new()
                .map_err(service("failed to start tokio runtime"))?;
            runtime.block_on(self.rewrite_async(text, intensity))
        }
    }

}

#[cfg(not(feature = "llm"))]
pub mod openrouter {
    use super::*;

    pub const DEFAULT_MODEL: &str = "google/gemini-3-flash-preview";

    fn disabled() -> Error {
        Error::Service("rewrite support is disabled (build with --features llm)".to_string())
    }

    #[derive(Debug, Clone)]
    pub struct OpenRouterRewriter;

    impl OpenRouterRewriter {
        pub fn from_env() -> Result<Self> {
            Err(disabled())
        }

        pub fn new(_api_key: impl Into<String>) -> Result<Self> {
            Err(disabled())
        }

        pub fn with_model(self, _model: impl Into<String>) -> Self {
            self
        }
    }

    impl Rewriter for OpenRouterRewriter {
        fn rewrite(&self, _text: &str, _intensity: Intensity) -> Result<String> {
            Err(disabled())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::observer::RunEvent;

    #[test]
    fn user_prompt_names_intensity_and_text() {
        let prompt = build_user_prompt("Hello there.", Intensity::Heavy);
        assert!(prompt.contains("'heavy'"));
        assert!(prompt.contains("Hello there."));
    }

    #[test]
    fn successful_rewrite_is_trimmed() {
        let (tx, _rx) = mpsc::channel::<RunEvent>();
        let rewriter = |text: &str, _: Intensity| -> Result<String> {
            Ok(format!("  {} again \n", text))
        };
        let out = rewrite_or_original(&rewriter, "said", Intensity::Light, &tx);
        assert_eq!(out, "said again");
    }

    #[test]
    fn empty_rewrite_falls_back_with_error_event() {
        let (tx, rx) = mpsc::channel::<RunEvent>();
        let rewriter = |_: &str, _: Intensity| -> Result<String> { Ok("   ".to_string()) };
        let out = rewrite_or_original(&rewriter, "keep me", Intensity::Moderate, &tx);
        drop(tx);

        assert_eq!(out, "keep me");
        let errors: Vec<RunEvent> = rx
            .iter()
            .filter(|e| matches!(e, RunEvent::Error(_)))
            .collect();
        assert_eq!(errors.len(), 1);
    }
}
