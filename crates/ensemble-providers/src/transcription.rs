//! Speech-to-text via Whisper models.
//!
//! [`WhisperClient`] loads a model through a [`SpeechBackend`] the first time
//! it is asked to transcribe, times each transcription and can release the
//! model right afterwards (`auto_close`). The default backend talks to any
//! OpenAI-compatible `/audio/transcriptions` endpoint serving open Whisper
//! weights (faster-whisper-server, whisper.cpp server, LocalAI).

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use ensemble_core::config::schema::TranscriptionConfig;

// ─────────────────────────────────────────────
// Model presets
// ─────────────────────────────────────────────

/// One Whisper model size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: &'static str,
    /// `None` when the size has no English-only variant.
    pub english_only_name: Option<&'static str>,
    pub parameters: &'static str,
    /// Approximate memory needed to load the model.
    pub vram: &'static str,
}

impl ModelInfo {
    pub const TINY: ModelInfo = ModelInfo {
        name: "tiny",
        english_only_name: Some("tiny.en"),
        parameters: "39M",
        vram: "~1GB",
    };
    pub const BASE: ModelInfo = ModelInfo {
        name: "base",
        english_only_name: Some("base.en"),
        parameters: "74M",
        vram: "~1GB",
    };
    pub const SMALL: ModelInfo = ModelInfo {
        name: "small",
        english_only_name: Some("small.en"),
        parameters: "224M",
        vram: "~2GB",
    };
    pub const MEDIUM: ModelInfo = ModelInfo {
        name: "medium",
        english_only_name: Some("medium.en"),
        parameters: "769M",
        vram: "~5GB",
    };
    pub const LARGE: ModelInfo = ModelInfo {
        name: "large",
        english_only_name: None,
        parameters: "1550M",
        vram: "~12GB",
    };

    pub const ALL: [ModelInfo; 5] = [
        Self::TINY,
        Self::BASE,
        Self::SMALL,
        Self::MEDIUM,
        Self::LARGE,
    ];

    /// Preset by name. `"small.en"` resolves to `SMALL` with `english_only = true`.
    pub fn find(name: &str) -> Option<(ModelInfo, bool)> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find_map(|info| {
            if info.name == name {
                Some((info, false))
            } else if info.english_only_name == Some(name.as_str()) {
                Some((info, true))
            } else {
                None
            }
        })
    }

    /// Name to load; falls back to the multilingual model when no
    /// English-only variant exists.
    pub fn model_name(&self, english_only: bool) -> &'static str {
        match (english_only, self.english_only_name) {
            (true, Some(en)) => en,
            _ => self.name,
        }
    }
}

// ─────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────

/// One decoded segment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperSegment {
    pub id: u32,
    pub seek: u32,
    /// Seconds from the start of the audio.
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub tokens: Vec<u32>,
    pub temperature: f64,
    pub avg_logprob: f64,
    pub compression_ratio: f64,
    pub no_speech_prob: f64,
}

/// What a [`SpeechModel`] returns for one file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<WhisperSegment>,
    pub language: String,
}

/// A finished transcription plus the time it took.
#[derive(Clone, Debug)]
pub struct WhisperResponse {
    pub text: String,
    pub segments: Vec<WhisperSegment>,
    pub language: String,
    pub transcribe_time: Duration,
}

impl WhisperResponse {
    fn new(transcript: Transcript, transcribe_time: Duration) -> Self {
        Self {
            text: transcript.text.trim().to_string(),
            segments: transcript.segments,
            language: transcript.language,
            transcribe_time,
        }
    }

    /// Seconds of audio covered by the segments.
    pub fn duration(&self) -> f64 {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => (last.end - first.start).max(0.0),
            _ => 0.0,
        }
    }

    /// Transcription time per second of audio; `None` without segments.
    pub fn speed_factor(&self) -> Option<f64> {
        let duration = self.duration();
        if duration > 0.0 {
            Some(self.transcribe_time.as_secs_f64() / duration)
        } else {
            None
        }
    }
}

// ─────────────────────────────────────────────
// Backend traits
// ─────────────────────────────────────────────

/// A loaded speech model.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    async fn transcribe(&self, file_path: &Path) -> anyhow::Result<Transcript>;
}

/// Loads speech models by name.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn load(&self, model_name: &str) -> anyhow::Result<Box<dyn SpeechModel>>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

// ─────────────────────────────────────────────
// HTTP backend
// ─────────────────────────────────────────────

/// Backend for OpenAI-compatible transcription servers.
pub struct HttpWhisperBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl HttpWhisperBackend {
    /// An empty `api_key` falls back to `OPENAI_API_KEY`; requests go out
    /// without auth when both are empty.
    pub fn new(api_base: &str, api_key: &str) -> Self {
        let key = if api_key.is_empty() {
            std::env::var("OPENAI_API_KEY").unwrap_or_default()
        } else {
            api_key.to_string()
        };

        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.api_base)
    }
}

#[async_trait]
impl SpeechBackend for HttpWhisperBackend {
    async fn load(&self, model_name: &str) -> anyhow::Result<Box<dyn SpeechModel>> {
        Ok(Box::new(HttpWhisperModel {
            client: self.client.clone(),
            url: self.endpoint(),
            api_key: self.api_key.clone(),
            model: model_name.to_string(),
        }))
    }

    fn display_name(&self) -> &str {
        "Whisper HTTP"
    }
}

struct HttpWhisperModel {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

#[async_trait]
impl SpeechModel for HttpWhisperModel {
    async fn transcribe(&self, file_path: &Path) -> anyhow::Result<Transcript> {
        let file_name = file_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let file_bytes = tokio::fs::read(file_path)
            .await
            .with_context(|| format!("reading audio file {}", file_path.display()))?;

        debug!(
            path = %file_path.display(),
            model = %self.model,
            bytes = file_bytes.len(),
            "uploading audio for transcription"
        );

        let file_part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        let mut request = self
            .client
            .post(&self.url)
            .multipart(form)
            .timeout(Duration::from_secs(300));
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "transcription API error");
            return Err(anyhow::anyhow!(
                "transcription API returned {}: {}",
                status,
                body
            ));
        }

        Ok(response.json::<Transcript>().await?)
    }
}

// ─────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────

/// Transcribes audio files with one Whisper preset, loading it on demand.
pub struct WhisperClient {
    model_info: ModelInfo,
    english_only: bool,
    auto_close: bool,
    backend: Box<dyn SpeechBackend>,
    model: Option<Box<dyn SpeechModel>>,
}

impl WhisperClient {
    pub fn new(model_info: ModelInfo, backend: Box<dyn SpeechBackend>) -> Self {
        Self {
            model_info,
            english_only: false,
            auto_close: true,
            backend,
            model: None,
        }
    }

    /// Client for the `transcription` config section.
    pub fn from_config(config: &TranscriptionConfig) -> anyhow::Result<Self> {
        let (info, english_only) = ModelInfo::find(&config.model)
            .with_context(|| format!("unknown Whisper model '{}'", config.model))?;
        let backend = HttpWhisperBackend::new(&config.api_base, &config.api_key);
        Ok(Self::new(info, Box::new(backend))
            .with_english_only(english_only)
            .with_auto_close(config.auto_close))
    }

    pub fn with_english_only(mut self, english_only: bool) -> Self {
        self.english_only = english_only;
        self
    }

    /// Release the model after every transcription.
    pub fn with_auto_close(mut self, auto_close: bool) -> Self {
        self.auto_close = auto_close;
        self
    }

    pub fn model_info(&self) -> ModelInfo {
        self.model_info
    }

    /// Name passed to the backend.
    pub fn model_name(&self) -> &'static str {
        self.model_info.model_name(self.english_only)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Transcribe one file. Loading time is not part of `transcribe_time`.
    pub async fn transcribe(&mut self, file_path: &Path) -> anyhow::Result<WhisperResponse> {
        if !file_path.exists() {
            anyhow::bail!("audio file not found: {}", file_path.display());
        }

        if self.model.is_none() {
            info!(
                model = self.model_name(),
                backend = self.backend.display_name(),
                vram = self.model_info.vram,
                "loading speech model"
            );
            self.model = Some(self.backend.load(self.model_name()).await?);
        }
        let model = self
            .model
            .as_ref()
            .context("speech model unavailable after load")?;

        let started = Instant::now();
        let result = model.transcribe(file_path).await;
        let elapsed = started.elapsed();

        if self.auto_close {
            self.close();
        }

        let response = WhisperResponse::new(result?, elapsed);
        debug!(
            chars = response.text.len(),
            language = %response.language,
            elapsed_ms = elapsed.as_millis() as u64,
            "transcription complete"
        );
        Ok(response)
    }

    /// Drop the loaded model, if any.
    pub fn close(&mut self) {
        if self.model.take().is_some() {
            debug!(model = self.model_name(), "speech model released");
        }
    }
}

// ─────────────────────────────────────────────
// Helper
// ─────────────────────────────────────────────

/// Check if a file path looks like an audio file.
pub fn is_audio_file(path: &str) -> bool {
    const EXTENSIONS: [&str; 10] = [
        ".ogg", ".oga", ".opus", ".mp3", ".m4a", ".wav", ".flac", ".aac", ".wma", ".webm",
    ];
    let lower = path.to_lowercase();
    EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Backend that counts loads and returns a fixed transcript.
    struct CountingBackend {
        loads: Arc<AtomicUsize>,
        loaded_names: Arc<std::sync::Mutex<Vec<String>>>,
    }

    struct FixedModel;

    #[async_trait]
    impl SpeechModel for FixedModel {
        async fn transcribe(&self, _file_path: &Path) -> anyhow::Result<Transcript> {
            Ok(Transcript {
                text: " hello there ".into(),
                segments: vec![
                    WhisperSegment {
                        id: 0,
                        start: 0.5,
                        end: 2.0,
                        text: " hello".into(),
                        ..Default::default()
                    },
                    WhisperSegment {
                        id: 1,
                        start: 2.0,
                        end: 4.5,
                        text: " there".into(),
                        ..Default::default()
                    },
                ],
                language: "en".into(),
            })
        }
    }

    #[async_trait]
    impl SpeechBackend for CountingBackend {
        async fn load(&self, model_name: &str) -> anyhow::Result<Box<dyn SpeechModel>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.loaded_names.lock().unwrap().push(model_name.to_string());
            Ok(Box::new(FixedModel))
        }

        fn display_name(&self) -> &str {
            "counting"
        }
    }

    fn counting_client(
        info: ModelInfo,
    ) -> (WhisperClient, Arc<AtomicUsize>, Arc<std::sync::Mutex<Vec<String>>>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let names = Arc::new(std::sync::Mutex::new(Vec::new()));
        let backend = CountingBackend {
            loads: loads.clone(),
            loaded_names: names.clone(),
        };
        (WhisperClient::new(info, Box::new(backend)), loads, names)
    }

    fn audio_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(b"RIFF....WAVEfmt ").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file("voice.ogg"));
        assert!(is_audio_file("song.MP3"));
        assert!(is_audio_file("/tmp/media/audio.m4a"));
        assert!(is_audio_file("recording.wav"));
        assert!(!is_audio_file("photo.jpg"));
        assert!(!is_audio_file("video.mp4"));
    }

    #[test]
    fn test_model_presets() {
        assert_eq!(ModelInfo::find("base"), Some((ModelInfo::BASE, false)));
        assert_eq!(ModelInfo::find("Small.EN"), Some((ModelInfo::SMALL, true)));
        assert_eq!(ModelInfo::find("large.en"), None);
        assert_eq!(ModelInfo::find("huge"), None);
        assert_eq!(ModelInfo::LARGE.model_name(true), "large");
        assert_eq!(ModelInfo::TINY.model_name(true), "tiny.en");
        assert_eq!(ModelInfo::MEDIUM.parameters, "769M");
        assert_eq!(ModelInfo::SMALL.parameters, "224M");
        assert_eq!(ModelInfo::LARGE.vram, "~12GB");
    }

    #[test]
    fn test_response_duration_and_speed() {
        let response = WhisperResponse {
            text: String::new(),
            segments: vec![
                WhisperSegment {
                    start: 1.0,
                    end: 3.0,
                    ..Default::default()
                },
                WhisperSegment {
                    start: 3.0,
                    end: 5.0,
                    ..Default::default()
                },
            ],
            language: "en".into(),
            transcribe_time: Duration::from_secs(2),
        };
        assert_eq!(response.duration(), 4.0);
        assert_eq!(response.speed_factor(), Some(0.5));
    }

    #[test]
    fn test_response_without_segments() {
        let response = WhisperResponse::new(Transcript::default(), Duration::from_millis(10));
        assert_eq!(response.duration(), 0.0);
        assert!(response.speed_factor().is_none());
    }

    #[tokio::test]
    async fn test_lazy_load_and_auto_close() {
        let (client, loads, _) = counting_client(ModelInfo::TINY);
        let mut client = client.with_auto_close(true);
        let file = audio_file();

        assert!(!client.is_loaded());
        let response = client.transcribe(file.path()).await.unwrap();
        assert_eq!(response.text, "hello there");
        assert_eq!(response.duration(), 4.0);
        assert!(!client.is_loaded());

        client.transcribe(file.path()).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_keep_loaded_reuses_model() {
        let (client, loads, names) = counting_client(ModelInfo::SMALL);
        let mut client = client.with_auto_close(false).with_english_only(true);
        let file = audio_file();

        client.transcribe(file.path()).await.unwrap();
        client.transcribe(file.path()).await.unwrap();
        assert!(client.is_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(names.lock().unwrap().as_slice(), ["small.en"]);

        client.close();
        assert!(!client.is_loaded());
    }

    #[tokio::test]
    async fn test_missing_file_does_not_load() {
        let (mut client, loads, _) = counting_client(ModelInfo::BASE);
        let err = client
            .transcribe(Path::new("/nonexistent/audio.ogg"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_http_backend_verbose_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer whisper-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "task": "transcribe",
                "language": "bulgarian",
                "duration": 3.0,
                "text": "Здравей, свят",
                "segments": [{
                    "id": 0, "seek": 0, "start": 0.0, "end": 3.0, "text": "Здравей, свят",
                    "tokens": [50364, 3401], "temperature": 0.0, "avg_logprob": -0.25,
                    "compression_ratio": 0.9, "no_speech_prob": 0.01
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpWhisperBackend::new(&format!("{}/v1/", server.uri()), "whisper-key");
        let mut client = WhisperClient::new(ModelInfo::BASE, Box::new(backend));
        let file = audio_file();

        let response = client.transcribe(file.path()).await.unwrap();
        assert_eq!(response.text, "Здравей, свят");
        assert_eq!(response.language, "bulgarian");
        assert_eq!(response.segments[0].tokens, vec![50364, 3401]);
        assert_eq!(response.duration(), 3.0);
    }

    #[tokio::test]
    async fn test_http_backend_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let backend = HttpWhisperBackend::new(&server.uri(), "key");
        let mut client = WhisperClient::new(ModelInfo::TINY, Box::new(backend));
        let file = audio_file();

        let err = client.transcribe(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("model crashed"));
        assert!(!client.is_loaded());
    }

    #[test]
    fn test_from_config() {
        let config = TranscriptionConfig {
            model: "medium.en".into(),
            auto_close: false,
            ..Default::default()
        };
        let client = WhisperClient::from_config(&config).unwrap();
        assert_eq!(client.model_name(), "medium.en");
        assert_eq!(client.model_info(), ModelInfo::MEDIUM);

        let bad = TranscriptionConfig {
            model: "gigantic".into(),
            ..Default::default()
        };
        assert!(WhisperClient::from_config(&bad).is_err());
    }
}
