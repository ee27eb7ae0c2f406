//! Voice analysis: speech-to-text plus emotion enrichment.
//!
//! Both providers sit behind traits so the flow can be exercised without
//! network access. The transcript is mandatory; the emotion signal is
//! enrichment only and its failure never fails the flow.

mod emotion;
mod emotion_map;
mod stt;

use std::sync::Arc;
use std::time::Duration;

pub use emotion::poll_to_completion;
pub use emotion::top_emotion;
pub use emotion::EmotionAnalyzer;
pub use emotion::EmotionScore;
pub use emotion::HumeClient;
pub use emotion::JobId;
pub use emotion::JobStatus;
pub use emotion_map::map_emotion;
pub use stt::GoogleSttClient;
pub use stt::SpeechToText;

/// Errors from the voice analysis collaborators.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("speech-to-text failed: {0}")]
    Transcription(String),

    #[error("emotion analysis failed: {0}")]
    Emotion(String),

    #[error("emotion analysis did not complete within {0:?}")]
    EmotionTimeout(Duration),
}

/// Turns an audio recording into an enriched situation string.
pub struct VoiceFlow {
    stt: Arc<dyn SpeechToText>,
    emotion: Arc<dyn EmotionAnalyzer>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl VoiceFlow {
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        emotion: Arc<dyn EmotionAnalyzer>,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            stt,
            emotion,
            poll_interval,
            max_wait,
        }
    }

    /// Analyze a WAV recording into a situation string.
    ///
    /// Returns `"{transcript} ({emotion})"` when emotion analysis succeeds,
    /// or the bare transcript when it does not. A failed transcription is
    /// fatal; a failed emotion job only costs the enrichment.
    pub async fn analyze(&self, wav: &[u8]) -> Result<String, VoiceError> {
        let text = self.stt.transcribe(wav).await?;
        tracing::info!(%text, "transcribed recording");

        match self.top_emotion_label(wav).await {
            Ok(Some(label)) => {
                let mapped = emotion_map::map_emotion(&label);
                tracing::info!(emotion = %label, mapped = %mapped, "emotion enrichment");
                Ok(format!("{text} ({mapped})"))
            }
            Ok(None) => Ok(text),
            Err(e) => {
                tracing::warn!("emotion enrichment failed: {e}");
                Ok(text)
            }
        }
    }

    async fn top_emotion_label(&self, wav: &[u8]) -> Result<Option<String>, VoiceError> {
        let job = self.emotion.submit(wav).await?;
        tracing::debug!(job = %job, "submitted emotion analysis job");

        let scores = poll_to_completion(
            self.emotion.as_ref(),
            &job,
            self.poll_interval,
            self.max_wait,
        )
        .await?;

        Ok(top_emotion(&scores).map(|s| s.name.clone()))
    }
}
