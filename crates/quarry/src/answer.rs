//! Answer synthesis over assembled context.
//!
//! Takes the retrieved context block plus prior conversation turns and
//! asks a chat model to answer the user's question grounded in that
//! context only. The `disabled` provider (the default) errors on use,
//! so `ask` requires a configured answer provider; `search` remains the
//! non-synthesizing path.
//!
//! Use [`create_synthesizer`] to instantiate the backend named in the
//! configuration.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use quarry_core::models::{ConversationTurn, Role};

use crate::config::AnswerConfig;

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the question using only the \
provided context. If the context does not contain the answer, say so rather than guessing.";

/// A backend that turns a question plus grounding context into an answer.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    fn model_name(&self) -> &str;

    async fn synthesize(
        &self,
        question: &str,
        context: &str,
        history: &[ConversationTurn],
    ) -> Result<String>;
}

/// Instantiate the synthesizer named in the configuration.
pub fn create_synthesizer(config: &AnswerConfig) -> Result<Box<dyn AnswerSynthesizer>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAISynthesizer::new(config)?)),
        "disabled" => Ok(Box::new(DisabledSynthesizer)),
        other => bail!("Unknown answer provider: {}", other),
    }
}

/// A no-op synthesizer that always errors; the configured default.
pub struct DisabledSynthesizer;

#[async_trait]
impl AnswerSynthesizer for DisabledSynthesizer {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn synthesize(&self, _: &str, _: &str, _: &[ConversationTurn]) -> Result<String> {
        bail!("Answer provider is disabled; set [answer] provider in config")
    }
}

/// Chat-completion synthesizer backed by the OpenAI API.
pub struct OpenAISynthesizer {
    config: AnswerConfig,
    model: String,
}

impl OpenAISynthesizer {
    pub fn new(config: &AnswerConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("answer.model required for OpenAI provider"))?;
        Ok(Self {
            config: config.clone(),
            model,
        })
    }
}

#[async_trait]
impl AnswerSynthesizer for OpenAISynthesizer {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn synthesize(
        &self,
        question: &str,
        context: &str,
        history: &[ConversationTurn],
    ) -> Result<String> {
        answer_openai(&self.config, &self.model, question, context, history).await
    }
}

/// Build the chat message list: system prompt with context, then prior
/// turns, then the current question.
fn build_messages(
    question: &str,
    context: &str,
    history: &[ConversationTurn],
) -> Vec<serde_json::Value> {
    let system = if context.trim().is_empty() {
        format!("{}\n\nContext: (no matching documents found)", SYSTEM_PROMPT)
    } else {
        format!("{}\n\nContext:\n{}", SYSTEM_PROMPT, context)
    };

    let mut messages = vec![serde_json::json!({"role": "system", "content": system})];
    for turn in history {
        let role = match turn.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        messages.push(serde_json::json!({"role": role, "content": turn.content}));
    }
    messages.push(serde_json::json!({"role": "user", "content": question}));
    messages
}

async fn answer_openai(
    config: &AnswerConfig,
    model: &str,
    question: &str,
    context: &str,
    history: &[ConversationTurn],
) -> Result<String> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": model,
        "messages": build_messages(question, context, history),
    });

    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("OpenAI API error {}: {}", status, body_text);
    }

    let json: serde_json::Value = response.json().await?;
    parse_chat_answer(&json)
}

/// Extract `choices[0].message.content` from the chat response.
fn parse_chat_answer(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_order_system_history_question() {
        let history = vec![
            ConversationTurn::user("first question"),
            ConversationTurn::assistant("first answer", vec![]),
        ];
        let messages = build_messages("second question", "some context", &history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert!(messages[0]["content"]
            .as_str()
            .unwrap()
            .contains("some context"));
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "first question");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[3]["content"], "second question");
    }

    #[test]
    fn empty_context_noted_in_system_prompt() {
        let messages = build_messages("anything?", "  ", &[]);
        assert!(messages[0]["content"]
            .as_str()
            .unwrap()
            .contains("no matching documents"));
    }

    #[test]
    fn parse_chat_shape() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "the answer"}}]
        });
        assert_eq!(parse_chat_answer(&json).unwrap(), "the answer");
    }

    #[test]
    fn parse_chat_rejects_empty_choices() {
        let json = serde_json::json!({"choices": []});
        assert!(parse_chat_answer(&json).is_err());
    }

    #[test]
    fn create_synthesizer_reports_configured_model() {
        let synthesizer = create_synthesizer(&AnswerConfig {
            provider: "openai".to_string(),
            model: Some("gpt-4o-mini".to_string()),
            ..AnswerConfig::default()
        })
        .unwrap();
        assert_eq!(synthesizer.model_name(), "gpt-4o-mini");

        assert!(create_synthesizer(&AnswerConfig {
            provider: "claude".to_string(),
            ..AnswerConfig::default()
        })
        .is_err());
    }

    #[test]
    fn disabled_synthesizer_errors() {
        let synthesizer = create_synthesizer(&AnswerConfig::default()).unwrap();
        assert_eq!(synthesizer.model_name(), "disabled");
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        assert!(rt
            .block_on(synthesizer.synthesize("q", "ctx", &[]))
            .is_err());
    }
}
