//! Speech-to-text collaborator.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;

use super::VoiceError;

/// Transcribes a WAV recording into text.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, wav: &[u8]) -> Result<String, VoiceError>;
}

#[derive(Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognizeResult>,
}

#[derive(Deserialize)]
struct RecognizeResult {
    #[serde(default)]
    alternatives: Vec<RecognizeAlternative>,
}

#[derive(Deserialize)]
struct RecognizeAlternative {
    #[serde(default)]
    transcript: String,
}

/// Google Cloud Speech REST client.
///
/// Recordings are LINEAR16 WAV at 16 kHz, Korean, with automatic
/// punctuation. Transcripts of all results are concatenated, taking the top
/// alternative of each.
pub struct GoogleSttClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleSttClient {
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
impl SpeechToText for GoogleSttClient {
    async fn transcribe(&self, wav: &[u8]) -> Result<String, VoiceError> {
        let content = base64::engine::general_purpose::STANDARD.encode(wav);
        let body = serde_json::json!({
            "config": {
                "encoding": "LINEAR16",
                "sampleRateHertz": 16000,
                "languageCode": "ko-KR",
                "enableAutomaticPunctuation": true,
            },
            "audio": { "content": content },
        });

        let response = self
            .http
            .post(format!(
                "{}/v1/speech:recognize?key={}",
                self.base_url, self.api_key
            ))
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Transcription(format!(
                "status {status}: {body}"
            )));
        }

        let reply: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;

        let text: String = reply
            .results
            .iter()
            .filter_map(|r| r.alternatives.first())
            .map(|a| a.transcript.as_str())
            .collect();

        if text.is_empty() {
            return Err(VoiceError::Transcription(
                "empty transcript".to_string(),
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognize_response_concatenates_top_alternatives() {
        let body = r#"{"results": [
            {"alternatives": [{"transcript": "너무 더워서 "}, {"transcript": "ignored"}]},
            {"alternatives": [{"transcript": "땀이 난다"}]}
        ]}"#;
        let reply: RecognizeResponse = serde_json::from_str(body).unwrap();
        let text: String = reply
            .results
            .iter()
            .filter_map(|r| r.alternatives.first())
            .map(|a| a.transcript.as_str())
            .collect();
        assert_eq!(text, "너무 더워서 땀이 난다");
    }

    #[test]
    fn test_recognize_response_tolerates_missing_results() {
        let reply: RecognizeResponse = serde_json::from_str("{}").unwrap();
        assert!(reply.results.is_empty());
    }
}
