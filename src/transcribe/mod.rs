use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use crate::model::{self, SubtitleResult, SubtitleToken};
use crate::utils::truncate_diagnostic;
use crate::PipelineError;

/// Audio containers yt-dlp is likely to hand us, mapped to the MIME types the
/// Whisper API expects alongside the upload.
#[derive(Debug, Clone, Copy)]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
    Webm,
}

impl AudioFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("mp3") => Some(AudioFormat::Mp3),
            Some("m4a") | Some("aac") | Some("mp4") => Some(AudioFormat::M4a),
            Some("wav") => Some(AudioFormat::Wav),
            Some("flac") => Some(AudioFormat::Flac),
            Some("ogg") | Some("opus") => Some(AudioFormat::Ogg),
            Some("webm") => Some(AudioFormat::Webm),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Webm => "audio/webm",
        }
    }
}

/// One span of transcribed audio as reported by the backend. Untrusted input;
/// every field is optional or defaulted.
#[derive(Debug, Clone, Deserialize)]
pub struct WhisperSegment {
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    pub text: Option<String>,
    pub confidence: Option<f64>,
}

/// The subset of a `verbose_json` transcription response we consume.
#[derive(Debug, Deserialize)]
pub struct WhisperResponse {
    #[serde(default)]
    pub segments: Vec<WhisperSegment>,
}

/// Map backend segments into subtitle tokens: 1-based ids in segment order,
/// trimmed text, second-to-millisecond timestamps rounded to the nearest
/// integer and floored at zero.
///
/// When the backend reports no confidence, the score defaults to 1.0. That is
/// "no information, assume nominal", not a measurement; callers who care must
/// treat a score of exactly 1.0 with suspicion.
pub fn map_segments(segments: &[WhisperSegment]) -> SubtitleResult {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| SubtitleToken {
            id: i as u32 + 1,
            value: segment
                .text
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_string(),
            start_time_ms: to_millis(segment.start),
            end_time_ms: to_millis(segment.end),
            score: segment.confidence.unwrap_or(1.0),
        })
        .collect()
}

fn to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round().max(0.0) as i64
}

/// Seam between the pipeline and the transcription backend; mocked in
/// pipeline tests, implemented for real by [`WhisperClient`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    async fn transcribe(&self, path: &Path) -> Result<SubtitleResult, PipelineError>;
}

/// HTTP client for the OpenAI Whisper transcription endpoint.
pub struct WhisperClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl WhisperClient {
    pub fn new(api_key: String, endpoint: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            endpoint,
            model,
        }
    }

    async fn build_form(&self, path: &Path) -> Result<reqwest::multipart::Form, PipelineError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PipelineError::Transcription(format!(
                "could not read audio file {}: {e}",
                path.display()
            ))
        })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let mime = AudioFormat::from_path(path)
            .map(|format| format.mime_type())
            .unwrap_or("application/octet-stream");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| PipelineError::Transcription(format!("invalid MIME type: {e}")))?;

        Ok(reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json"))
    }
}

#[async_trait]
impl TranscriptionBackend for WhisperClient {
    /// Submit the file requesting segment-level output, map segments into
    /// tokens and validate the sequence before returning it. Transport
    /// failures and malformed bodies are converted here; nothing untyped
    /// escapes this call.
    async fn transcribe(&self, path: &Path) -> Result<SubtitleResult, PipelineError> {
        tracing::info!(path = %path.display(), model = %self.model, "submitting audio for transcription");

        let form = self.build_form(path).await?;
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::Transcription(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Transcription(format!(
                "backend returned {status}: {}",
                truncate_diagnostic(&body, 400)
            )));
        }

        let parsed: WhisperResponse = response.json().await.map_err(|e| {
            PipelineError::Transcription(format!("malformed response body: {e}"))
        })?;

        let tokens = map_segments(&parsed.segments);

        // The backend response is untrusted; a sequence that fails the token
        // schema is a transcription failure, never a silent pass-through.
        model::decode_result(&tokens).map_err(|e| {
            PipelineError::Transcription(format!("backend returned invalid segments: {e}"))
        })?;

        tracing::info!(tokens = tokens.len(), "transcription complete");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> WhisperSegment {
        WhisperSegment {
            start,
            end,
            text: Some(text.to_string()),
            confidence: None,
        }
    }

    #[test]
    fn maps_segments_to_tokens() {
        let tokens = map_segments(&[segment(0.0, 1.5, " hi "), segment(1.5, 3.0, "there")]);

        assert_eq!(
            tokens,
            vec![
                SubtitleToken {
                    id: 1,
                    value: "hi".to_string(),
                    start_time_ms: 0,
                    end_time_ms: 1500,
                    score: 1.0,
                },
                SubtitleToken {
                    id: 2,
                    value: "there".to_string(),
                    start_time_ms: 1500,
                    end_time_ms: 3000,
                    score: 1.0,
                },
            ]
        );
    }

    #[test]
    fn missing_text_becomes_empty_string() {
        let tokens = map_segments(&[WhisperSegment {
            start: 0.0,
            end: 1.0,
            text: None,
            confidence: None,
        }]);
        assert_eq!(tokens[0].value, "");
    }

    #[test]
    fn timestamps_round_to_nearest_millisecond_and_floor_at_zero() {
        let tokens = map_segments(&[segment(1.2345, 1.2356, "x"), segment(-0.5, 0.0, "y")]);
        assert_eq!(tokens[0].start_time_ms, 1235);
        assert_eq!(tokens[0].end_time_ms, 1236);
        assert_eq!(tokens[1].start_time_ms, 0);
        assert_eq!(tokens[1].end_time_ms, 0);
    }

    #[test]
    fn backend_confidence_is_preserved_when_present() {
        let tokens = map_segments(&[WhisperSegment {
            start: 0.0,
            end: 1.0,
            text: Some("sure".to_string()),
            confidence: Some(0.42),
        }]);
        assert_eq!(tokens[0].score, 0.42);
    }

    #[test]
    fn verbose_json_response_deserializes() {
        let raw = r#"{
            "task": "transcribe",
            "text": "hi there",
            "segments": [
                {"id": 0, "start": 0.0, "end": 1.5, "text": " hi "},
                {"id": 1, "start": 1.5, "end": 3.0, "text": "there"}
            ]
        }"#;
        let parsed: WhisperResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[1].text.as_deref(), Some("there"));
    }

    #[test]
    fn response_without_segments_maps_to_empty_result() {
        let parsed: WhisperResponse = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert!(map_segments(&parsed.segments).is_empty());
    }

    #[test]
    fn format_detection_covers_common_containers() {
        assert!(matches!(
            AudioFormat::from_path(Path::new("a.webm")),
            Some(AudioFormat::Webm)
        ));
        assert!(matches!(
            AudioFormat::from_path(Path::new("a.M4A")),
            Some(AudioFormat::M4a)
        ));
        assert!(AudioFormat::from_path(Path::new("a.xyz")).is_none());
    }
}
