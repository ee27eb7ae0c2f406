//! Routine text generation and the recommend flow.
//!
//! The text generator is an external black box: given a situation prompt it
//! returns one routine sentence. The flow here wraps it with a bounded
//! dedup cache (so back-to-back requests for the same situation don't get
//! the same sentence) and hands the sentence to the parsing pipeline.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::catalog;
use crate::config::GeneratorConfig;
use crate::routine::ParseFailure;
use crate::routine::RoutinePipeline;
use crate::routine::RoutineParseResult;

/// Errors from the routine text generator.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The generation service could not be reached or timed out.
    #[error("generation service unavailable: {0}")]
    Unavailable(String),

    /// The generation service responded with something unusable.
    #[error("generation service returned an unusable reply: {0}")]
    Malformed(String),
}

/// Failure modes of the full recommend flow.
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

/// A routine text generator: one situation prompt in, one sentence out.
#[async_trait]
pub trait RoutineGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    situation: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    routine: String,
}

/// HTTP client for the externally-served generation model.
pub struct HttpGenerator {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RoutineGenerator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let response = self
            .http
            .post(format!("{}/v1/generate", self.base_url))
            .json(&GenerateRequest { situation: prompt })
            .send()
            .await
            .map_err(|e| GenerateError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Unavailable(format!(
                "status {status}: {body}"
            )));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Malformed(e.to_string()))?;

        let routine = reply.routine.trim().to_string();
        if routine.is_empty() {
            return Err(GenerateError::Malformed("empty routine".to_string()));
        }
        Ok(routine)
    }
}

/// Build the situation instruction prompt for the generation model.
///
/// The instruction document lists the usable appliances and the response
/// rules, then interpolates the situation. Newlines are flattened to spaces
/// to match the single-line form the model was trained on.
pub fn build_situation_prompt(situation: &str) -> String {
    let mut doc = String::new();

    doc.push_str(
        "당신은 모든 종류의 상황에서 적절한 가전기기 제어 루틴을 추천하는 AI입니다.\n\
         일상적인 상황부터 매우 독특하고 예상치 못한 상황까지, 모든 순간에 맞는 \
         스마트홈 루틴을 제안해주세요.\n\
         사용자는 자신의 상황을 반말로 표현하며, 당신은 공감하며 친절하게 \
         \"~할게요\" 형식으로 루틴을 제안합니다.\n\n",
    );

    doc.push_str("사용 가능한 가전기기 목록 (이 기기들만 사용할 수 있음):\n");
    for device in catalog::all() {
        let _ = writeln!(doc, "- {}", device.name);
    }

    doc.push_str(
        "\n응답 시 지켜야 할 사항:\n\
         1. 가전기기가 직접 실행할 수 있는 동작만 포함할 것\n\
         2. 사람이 직접 해야 하는 행동은 제외할 것 (예: 빨래 널기, 식기 정리하기 등)\n\
         3. 각 기기의 설정값을 구체적으로 명시할 것\n\
         4. 목적이나 의도는 자유롭게 포함 가능\n\
         5. 위에 명시된 가전기기만 사용할 것 (창문, 커튼 등 다른 요소 언급 금지)\n\n",
    );

    doc.push_str(
        "좋은 예시:\n\
         - \"편안한 취침을 위해 에어컨을 26도로 설정하고 조명을 어둡게 하고 TV를 끌게요.\"\n\
         - \"상쾌한 아침을 위해 로봇청소기 청소를 시작하고 공기청정기를 강하게 켤게요.\"\n\n\
         나쁜 예시:\n\
         - \"정수기에서 온수를 받아서 라면을 끓일게요.\" (사람이 직접 하는 행동 포함)\n\
         - \"세탁기를 돌리고 빨래를 널어둘게요.\" (빨래 널기는 기기가 할 수 없는 동작)\n\n",
    );

    let _ = write!(doc, "현재 상황 정보 : {situation}");

    // The generation model was trained on single-line prompts.
    doc.replace('\n', " ").trim().to_string()
}

/// The recommend flow: situation text in, parsed routine out.
pub struct RecommendFlow {
    generator: Arc<dyn RoutineGenerator>,
    pipeline: RoutinePipeline,
    /// Bounded LRU of the last routine returned per situation, used to
    /// avoid recommending the identical sentence twice in a row.
    recent: moka::future::Cache<String, String>,
    max_attempts: u32,
}

impl RecommendFlow {
    pub fn new(
        generator: Arc<dyn RoutineGenerator>,
        pipeline: RoutinePipeline,
        cache_capacity: u64,
        max_attempts: u32,
    ) -> Self {
        Self {
            generator,
            pipeline,
            recent: moka::future::Cache::new(cache_capacity),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Recommend a routine for a situation and parse it into device updates.
    ///
    /// If the generator repeats the sentence it produced for this situation
    /// last time, generation is retried up to the configured attempt bound;
    /// on exhaustion the repeated sentence is accepted rather than failed.
    pub async fn recommend(&self, situation: &str) -> Result<RoutineParseResult, RecommendError> {
        let prompt = build_situation_prompt(situation);

        let mut routine = self.generator.generate(&prompt).await?;
        let mut attempts = 1;
        while attempts < self.max_attempts {
            match self.recent.get(situation).await {
                Some(previous) if previous == routine => {
                    tracing::debug!(attempts, "generator repeated itself, regenerating");
                    routine = self.generator.generate(&prompt).await?;
                    attempts += 1;
                }
                _ => break,
            }
        }
        self.recent
            .insert(situation.to_string(), routine.clone())
            .await;

        tracing::info!(%routine, "generated routine");
        Ok(self.pipeline.parse(&routine).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_situation_prompt_is_single_line() {
        let prompt = build_situation_prompt("너무 더워");
        assert!(!prompt.contains('\n'));
        assert!(prompt.ends_with("현재 상황 정보 : 너무 더워"));
    }

    #[test]
    fn test_situation_prompt_lists_only_catalog_appliances() {
        let prompt = build_situation_prompt("퇴근했어");
        for device in catalog::all() {
            assert!(prompt.contains(device.name), "{}", device.name);
        }
    }
}
