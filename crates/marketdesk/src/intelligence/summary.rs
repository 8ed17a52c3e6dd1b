use serde_json::Value;
use std::sync::Arc;

use super::llm::{ChatRequest, CompletionClient, LlmError};
use super::normalize::normalize_summary;
use super::pack::pack_insights;
use marketdesk_models::TaskInsights;

pub const TEMPERATURE: f64 = 0.2;

pub const SYSTEM_PROMPT: &str = "You are the Intelligence Desk, a marketing operations analyst \
reporting to the CMO. You read task and comment signals from the team's workspace and write a \
short, factual briefing. Only use facts present in the data. When something is unknown, say so \
instead of guessing. Reply with a single JSON object and nothing else.";

pub const USER_PROMPT: &str = r#"Write the briefing as JSON with exactly these keys:

{
  "headline": "one line, at most 90 characters",
  "snapshot": ["at most 3 short statements about the current state"],
  "blockers": ["at most 3 items; each a string or {\"task\": \"...\", \"reason\": \"...\", \"dependency\": \"...\"}"],
  "priorities": ["at most 3 short strings"],
  "risks": ["at most 3 short strings"],
  "next_actions": ["at most 3 short strings"],
  "what_im_noticing": ["at most 3 short observations"]
}

Null fields in the data mean the value is unknown.

DATA:
"#;

/// What one generation produced, ready to be stored.
#[derive(Debug, Clone)]
pub struct SummaryOutput {
    /// Normalized JSON text, or the raw reply when it could not be repaired.
    pub content: String,
    pub model: String,
    pub usage: Option<Value>,
    pub data_pack: String,
}

pub struct SummaryGenerator {
    client: Arc<dyn CompletionClient>,
    max_tokens: u32,
}

impl SummaryGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    pub fn request_for(&self, data_pack: &str) -> ChatRequest {
        ChatRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: format!("{USER_PROMPT}{data_pack}"),
            temperature: TEMPERATURE,
            max_tokens: self.max_tokens,
        }
    }

    pub async fn generate(&self, insights: &TaskInsights) -> Result<SummaryOutput, LlmError> {
        let data_pack = pack_insights(insights);
        let request = self.request_for(&data_pack);
        let completion = self.client.complete(&request).await?;
        Ok(SummaryOutput {
            content: normalize_summary(&completion.text),
            model: completion.model,
            usage: completion.usage,
            data_pack,
        })
    }
}
