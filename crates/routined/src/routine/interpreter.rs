//! Sentence interpretation via an external language-understanding service.
//!
//! The interpreter turns one routine sentence into the raw update structure
//! by sending a fixed, catalog-aware instruction prompt to a language model.
//! It never retries and never guesses: transport problems and unparseable
//! replies both surface as explicit failures.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog;
use crate::config::LanguageModelConfig;

use super::error::ParseFailure;
use super::update::RawParse;

/// Errors from a language model collaborator, classified at the seam so
/// nothing vendor-specific leaks past it.
#[derive(Debug, thiserror::Error)]
pub enum LanguageModelError {
    /// The service could not be reached or the request timed out.
    #[error("request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// A text-completion collaborator: one prompt in, one reply out.
///
/// Implementations must not retry internally; retry policy belongs to the
/// caller.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LanguageModelError>;
}

/// Language model client speaking the Anthropic messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(config: &LanguageModelConfig, api_key: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String, LanguageModelError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| LanguageModelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LanguageModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LanguageModelError::Shape(e.to_string()))?;

        reply["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LanguageModelError::Shape("missing content[0].text".to_string()))
    }
}

/// Extracts raw per-device intents from a routine sentence.
pub struct SentenceInterpreter {
    model: Arc<dyn LanguageModel>,
}

impl SentenceInterpreter {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Interpret one sentence into the raw update structure.
    ///
    /// The reply is decoded strictly: anything that does not match the
    /// expected `{"updates": [...]}` shape is rejected as malformed rather
    /// than patched up.
    pub async fn interpret(&self, text: &str) -> Result<RawParse, ParseFailure> {
        let prompt = build_prompt(text);

        let reply = self.model.complete(&prompt).await.map_err(classify)?;
        tracing::debug!(len = reply.len(), "received interpretation reply");

        let cleaned = strip_code_fences(&reply);
        serde_json::from_str(cleaned)
            .map_err(|e| ParseFailure::MalformedOutput(format!("invalid update JSON: {e}")))
    }
}

fn classify(err: LanguageModelError) -> ParseFailure {
    match err {
        LanguageModelError::Transport(msg) => ParseFailure::ServiceUnavailable(msg),
        LanguageModelError::Status { status, body } => {
            ParseFailure::ServiceUnavailable(format!("status {status}: {body}"))
        }
        LanguageModelError::Shape(msg) => ParseFailure::MalformedOutput(msg),
    }
}

/// Build the fixed instruction prompt for one sentence.
///
/// The prompt enumerates every catalog device with its id and recommended
/// states, states the extraction rules, and pins the output JSON shape.
pub fn build_prompt(text: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "당신은 자연어로 된 스마트홈 기기 제어 문장을 파싱하여 \
         각 기기의 상태를 JSON 형태로 변환하는 AI입니다.\n\n",
    );

    prompt.push_str("기기 ID 정보:\n");
    for device in catalog::all() {
        let _ = writeln!(prompt, "{}. {} id: {}", device.id, device.name, device.id);
    }

    prompt.push_str("\n각 기기별 권장 상태값:\n");
    for device in catalog::all() {
        let states = device
            .recommended_states
            .iter()
            .map(|s| format!("\"{s}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(prompt, "- {}: [{}]", device.name, states);
    }

    let _ = write!(
        prompt,
        r#"
다음 문장을 파싱해주세요: {text}

출력 형식:
{{
  "updates": [
    {{
      "appliance_id": 기기ID,
      "user_id": 1,
      "name": "기기명",
      "onoff": "ON"/"OFF",
      "state": "현재 상태",
      "is_active": true/false
    }}
  ]
}}

규칙:
1. 문장에서 언급된 기기만 포함할 것
2. appliance_id는 위 ID 목록에서 매핑
3. user_id는 항상 6로 설정
4. 기기를 켜는 동작의 경우: onoff="ON", is_active=true
5. 기기를 끄는 동작의 경우: onoff="OFF", is_active=false
6. state는 가능한 한 권장 상태값 중에서 선택하되, 적절한 값이 없는 경우 표현 그대로 사용
7. 각 기기별로 state는 1개만 설정할 것 (중복된 상태 업데이트 금지, 에어컨의 경우 온도와 모드를 함께 표현)
8. 명시적으로 끄라는 지시가 없는 경우 모든 기기는 "ON" 상태로 간주
"#
    );

    prompt
}

/// Strip a surrounding markdown code fence, if present.
///
/// Models often wrap JSON replies in ```json fences even when told not to.
fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
