//! Injected speech capabilities. Speaking, listening-style dictation and
//! pronunciation scoring go through these traits; when no speech backend is
//! configured the evaluator surfaces `CapabilityUnavailable` instead of a
//! correctness verdict.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Transcription {
    pub transcript: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PronunciationScore {
    /// In [0, 1].
    pub accuracy: f64,
    /// In [0, 1].
    pub fluency: f64,
    #[serde(default)]
    pub word_level: Option<serde_json::Value>,
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(&self, audio_ref: &str, locale: &str) -> CoreResult<Transcription>;
}

#[async_trait]
pub trait PronunciationScorer: Send + Sync {
    async fn score(
        &self,
        audio_ref: &str,
        reference_text: &str,
        locale: &str,
    ) -> CoreResult<PronunciationScore>;
}

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    audio_url: &'a str,
    language: &'a str,
}

#[derive(Debug, Serialize)]
struct PronunciationRequest<'a> {
    audio_url: &'a str,
    reference_text: &'a str,
    language: &'a str,
}

/// HTTP client for the external speech service. The service enforces its own
/// latency bounds; anything other than a timely 2xx becomes
/// `CapabilityUnavailable`.
pub struct HttpSpeechGateway {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpSpeechGateway {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url,
        }
    }

    async fn post_json<Req: Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        payload: &Req,
    ) -> CoreResult<Resp> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .post(&url)
            .json(payload)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                CoreError::capability_unavailable(format!("Speech service unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(CoreError::capability_unavailable(format!(
                "Speech service returned {status}"
            )));
        }

        response.json().await.map_err(|e| {
            CoreError::capability_unavailable(format!("Speech service response malformed: {e}"))
        })
    }
}

#[async_trait]
impl SpeechRecognizer for HttpSpeechGateway {
    async fn transcribe(&self, audio_ref: &str, locale: &str) -> CoreResult<Transcription> {
        tracing::debug!("Transcribing audio via speech service: {}", audio_ref);
        self.post_json(
            "/v1/transcribe",
            &TranscribeRequest {
                audio_url: audio_ref,
                language: locale,
            },
        )
        .await
    }
}

#[async_trait]
impl PronunciationScorer for HttpSpeechGateway {
    async fn score(
        &self,
        audio_ref: &str,
        reference_text: &str,
        locale: &str,
    ) -> CoreResult<PronunciationScore> {
        tracing::debug!("Scoring pronunciation via speech service: {}", audio_ref);
        self.post_json(
            "/v1/pronunciation",
            &PronunciationRequest {
                audio_url: audio_ref,
                reference_text,
                language: locale,
            },
        )
        .await
    }
}
