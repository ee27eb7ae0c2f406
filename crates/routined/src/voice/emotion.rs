//! Emotion analysis via an asynchronous batch-job collaborator.
//!
//! The provider exposes a submit/poll/fetch job model. Polling is an
//! explicit loop with a caller-supplied interval and deadline, so hosts can
//! bound the wait and cancellation is just dropping the future.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use super::VoiceError;

/// Opaque identifier for a submitted analysis job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle states of a batch analysis job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

/// One emotion label with its score, as ranked by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub name: String,
    pub score: f64,
}

/// An asynchronous emotion-analysis collaborator.
#[async_trait]
pub trait EmotionAnalyzer: Send + Sync {
    /// Submit a recording for analysis, returning the job identifier.
    async fn submit(&self, wav: &[u8]) -> Result<JobId, VoiceError>;

    /// Fetch the current status of a job.
    async fn status(&self, job: &JobId) -> Result<JobStatus, VoiceError>;

    /// Fetch the ranked emotion scores of a completed job.
    async fn predictions(&self, job: &JobId) -> Result<Vec<EmotionScore>, VoiceError>;
}

/// Poll a job until it completes, fails, or the deadline passes.
pub async fn poll_to_completion(
    analyzer: &dyn EmotionAnalyzer,
    job: &JobId,
    interval: Duration,
    max_wait: Duration,
) -> Result<Vec<EmotionScore>, VoiceError> {
    let deadline = tokio::time::Instant::now() + max_wait;

    loop {
        match analyzer.status(job).await? {
            JobStatus::Completed => return analyzer.predictions(job).await,
            JobStatus::Failed => {
                return Err(VoiceError::Emotion(format!("job {job} failed")));
            }
            status @ (JobStatus::Queued | JobStatus::InProgress) => {
                tracing::debug!(job = %job, %status, "waiting for emotion analysis");
            }
        }

        if tokio::time::Instant::now() + interval > deadline {
            return Err(VoiceError::EmotionTimeout(max_wait));
        }
        tokio::time::sleep(interval).await;
    }
}

/// The highest-scoring emotion, if any.
pub fn top_emotion(scores: &[EmotionScore]) -> Option<&EmotionScore> {
    scores.iter().max_by(|a, b| a.score.total_cmp(&b.score))
}

/// Hume batch-jobs API client (prosody model, utterance granularity).
pub struct HumeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HumeClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl EmotionAnalyzer for HumeClient {
    async fn submit(&self, wav: &[u8]) -> Result<JobId, VoiceError> {
        let models = serde_json::json!({
            "models": { "prosody": { "granularity": "utterance" } },
        });

        let file = reqwest::multipart::Part::bytes(wav.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Emotion(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("json", models.to_string());

        let response = self
            .http
            .post(&self.base_url)
            .header("X-Hume-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::Emotion(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Emotion(format!("status {status}: {body}")));
        }

        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VoiceError::Emotion(e.to_string()))?;

        reply["job_id"]
            .as_str()
            .map(|id| JobId(id.to_string()))
            .ok_or_else(|| VoiceError::Emotion("missing job_id".to_string()))
    }

    async fn status(&self, job: &JobId) -> Result<JobStatus, VoiceError> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, job))
            .header("X-Hume-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| VoiceError::Emotion(e.to_string()))?;

        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VoiceError::Emotion(e.to_string()))?;

        let status = reply["state"]["status"]
            .as_str()
            .ok_or_else(|| VoiceError::Emotion("missing state.status".to_string()))?;

        JobStatus::from_str(status)
            .map_err(|_| VoiceError::Emotion(format!("unknown job status: {status}")))
    }

    async fn predictions(&self, job: &JobId) -> Result<Vec<EmotionScore>, VoiceError> {
        let response = self
            .http
            .get(format!("{}/{}/predictions", self.base_url, job))
            .header("X-Hume-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| VoiceError::Emotion(e.to_string()))?;

        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VoiceError::Emotion(e.to_string()))?;

        // The prosody emotions sit deep inside the batch prediction tree.
        let emotions = &reply[0]["results"]["predictions"][0]["models"]["prosody"]
            ["grouped_predictions"][0]["predictions"][0]["emotions"];

        serde_json::from_value(emotions.clone())
            .map_err(|e| VoiceError::Emotion(format!("unexpected predictions shape: {e}")))
    }
}
