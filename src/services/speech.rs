//! Summary narration through a text-to-speech service.

use crate::{
    error::{ApiError, Result},
    models::{AudioResponse, Book},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info};

/// Subdirectory of the media root holding synthesized audio.
pub const AUDIO_SUBDIR: &str = "text-to-speech";

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|]"#).expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Make a title usable as a file name.
pub fn sanitize_filename(name: &str) -> String {
    let safe = UNSAFE_CHARS.replace_all(name, "_");
    WHITESPACE.replace_all(&safe, "_").into_owned()
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` with `voice` into `filename` and return the written path.
    async fn synthesize(&self, text: &str, filename: &str, voice: &str) -> Result<PathBuf>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Language code prefix of a voice name, `en-US-Wavenet-D` -> `en-US`.
fn language_code(voice: &str) -> &str {
    let mut dashes = voice.match_indices('-').map(|(i, _)| i);
    match (dashes.next(), dashes.next()) {
        (Some(_), Some(end)) => &voice[..end],
        _ => "en-US",
    }
}

/// Google Cloud Text-to-Speech REST client writing MP3 files into `output_dir`.
#[derive(Debug, Clone)]
pub struct GoogleSpeech {
    client: Client,
    base_url: String,
    api_key: String,
    output_dir: PathBuf,
}

impl GoogleSpeech {
    pub fn new(
        base_url: &str,
        api_key: &str,
        output_dir: &Path,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            output_dir: output_dir.to_path_buf(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeech {
    async fn synthesize(&self, text: &str, filename: &str, voice: &str) -> Result<PathBuf> {
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: language_code(voice),
                name: voice,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let response = self
            .client
            .post(format!("{}/text:synthesize", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::ExternalServiceError(format!(
                "Speech synthesis failed: {}",
                error_text
            )));
        }

        let body: SynthesizeResponse = response.json().await?;
        let audio = STANDARD.decode(body.audio_content).map_err(|e| {
            ApiError::SerializationError(format!("Invalid audio payload: {}", e))
        })?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(filename);
        tokio::fs::write(&path, &audio).await?;

        info!("Synthesized {} bytes of audio to {}", audio.len(), path.display());
        Ok(path)
    }
}

/// Decides file names and public URLs for summary audio.
#[derive(Clone)]
pub struct SpeechService {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    audio_dir: PathBuf,
    media_url: String,
    default_voice: String,
}

impl SpeechService {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        audio_dir: PathBuf,
        media_url: &str,
        default_voice: &str,
    ) -> Self {
        Self {
            synthesizer,
            audio_dir,
            media_url: media_url.to_string(),
            default_voice: default_voice.to_string(),
        }
    }

    pub fn public_url(&self, filename: &str) -> String {
        format!("{}{}/{}", self.media_url, AUDIO_SUBDIR, filename)
    }

    /// Narration of the book summary in the default voice, synthesized only if
    /// the file is not there yet.
    pub async fn summary_audio(&self, book: &Book) -> Result<String> {
        let filename = format!("{}.mp3", sanitize_filename(&book.title));

        if tokio::fs::try_exists(self.audio_dir.join(&filename)).await? {
            debug!("Reusing summary audio {}", filename);
        } else {
            self.render(book, &filename, &self.default_voice).await?;
        }

        Ok(self.public_url(&filename))
    }

    /// Always re-render the summary with the requested voice.
    pub async fn generate_audio(&self, book: &Book, voice: Option<&str>) -> Result<AudioResponse> {
        let voice = voice
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.default_voice)
            .to_string();
        let filename = format!("{}_summary_{}.mp3", book.id, sanitize_filename(&voice));

        self.render(book, &filename, &voice).await?;

        Ok(AudioResponse {
            audio_file_url: self.public_url(&filename),
            voice,
        })
    }

    async fn render(&self, book: &Book, filename: &str, voice: &str) -> Result<PathBuf> {
        if book.summary.trim().is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "Book {} has no summary to narrate",
                book.id
            )));
        }
        self.synthesizer
            .synthesize(&book.summary, filename, voice)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Writes the text itself as "audio" and logs each call.
    struct EchoSynthesizer {
        dir: PathBuf,
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SpeechSynthesizer for EchoSynthesizer {
        async fn synthesize(&self, text: &str, filename: &str, voice: &str) -> Result<PathBuf> {
            self.calls
                .lock()
                .unwrap()
                .push((filename.to_string(), voice.to_string()));
            let path = self.dir.join(filename);
            tokio::fs::write(&path, text).await?;
            Ok(path)
        }
    }

    fn book(summary: &str) -> Book {
        Book {
            id: 7,
            title: "What If? Serious: Answers".to_string(),
            author: "Randall Munroe".to_string(),
            isbn: String::new(),
            genre_id: None,
            genre_name: None,
            summary: summary.to_string(),
            bio: String::new(),
        }
    }

    fn service(dir: &Path) -> (SpeechService, Arc<EchoSynthesizer>) {
        let synth = Arc::new(EchoSynthesizer {
            dir: dir.to_path_buf(),
            calls: Mutex::new(Vec::new()),
        });
        let service = SpeechService::new(
            synth.clone(),
            dir.to_path_buf(),
            "/media/",
            "en-US-Wavenet-D",
        );
        (service, synth)
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("What If? Serious: Answers"), "What_If__Serious__Answers");
        assert_eq!(sanitize_filename("a/b\\c <d>|e\t\tf"), "a_b_c__d__e_f");
    }

    #[test]
    fn test_language_code() {
        assert_eq!(language_code("en-US-Wavenet-D"), "en-US");
        assert_eq!(language_code("de-DE-Neural2-B"), "de-DE");
        assert_eq!(language_code("narrator"), "en-US");
    }

    #[tokio::test]
    async fn test_summary_audio_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let (service, synth) = service(dir.path());

        let url = service.summary_audio(&book("A book of questions.")).await.unwrap();
        assert_eq!(url, "/media/text-to-speech/What_If__Serious__Answers.mp3");
        service.summary_audio(&book("A book of questions.")).await.unwrap();

        assert_eq!(synth.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_audio_uses_requested_voice() {
        let dir = tempfile::tempdir().unwrap();
        let (service, synth) = service(dir.path());

        let audio = service
            .generate_audio(&book("Questions."), Some("en-GB-Wavenet-A"))
            .await
            .unwrap();
        assert_eq!(audio.voice, "en-GB-Wavenet-A");
        assert_eq!(
            audio.audio_file_url,
            "/media/text-to-speech/7_summary_en-GB-Wavenet-A.mp3"
        );

        let audio = service.generate_audio(&book("Questions."), None).await.unwrap();
        assert_eq!(audio.voice, "en-US-Wavenet-D");
        assert_eq!(synth.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_summary_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (service, synth) = service(dir.path());

        let err = service.summary_audio(&book("  ")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert!(synth.calls.lock().unwrap().is_empty());
    }
}
