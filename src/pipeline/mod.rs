use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::config::Config;
use crate::extract::{AudioExtractor, YtDlpRunner};
use crate::model::{self, SourceReference, SubtitleResult};
use crate::retry::RetryPolicy;
use crate::transcribe::{TranscriptionBackend, WhisperClient};
use crate::PipelineError;

/// Sequences validation, extraction and transcription for one run.
///
/// Stateless between invocations: the only resource held is the temporary
/// directory downloaded audio lands in, dropped with the pipeline.
pub struct Pipeline {
    extractor: AudioExtractor,
    backend: Box<dyn TranscriptionBackend>,
    retry: RetryPolicy,
    // Keeps downloaded audio alive for the duration of the run.
    _temp_dir: Option<TempDir>,
}

impl Pipeline {
    /// Build the production pipeline: yt-dlp extraction into a temp dir, the
    /// Whisper API as backend, default retry policy.
    pub fn new(config: &Config) -> Result<Self> {
        let temp_dir = TempDir::new().context("failed to create temporary download directory")?;

        let runner = YtDlpRunner::new(config.yt_dlp_path.clone(), temp_dir.path().to_path_buf());
        let backend = WhisperClient::new(
            config.api_key.clone(),
            config.endpoint.clone(),
            config.model.clone(),
        );

        Ok(Self {
            extractor: AudioExtractor::new(Box::new(runner)),
            backend: Box::new(backend),
            retry: RetryPolicy::default(),
            _temp_dir: Some(temp_dir),
        })
    }

    /// Assemble a pipeline from parts; used by tests to substitute mocks.
    pub fn from_parts(
        extractor: AudioExtractor,
        backend: Box<dyn TranscriptionBackend>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            extractor,
            backend,
            retry,
            _temp_dir: None,
        }
    }

    /// Run the pipeline to a terminal state.
    ///
    /// File mode skips extraction entirely. Each stage halts the run with its
    /// own error kind; the orchestrator never retries a stage itself (the
    /// retry policy inside the transcription stage is the only exception).
    pub async fn run(&self, source: SourceReference) -> Result<SubtitleResult, PipelineError> {
        let audio_path = match source {
            SourceReference::File(path) => {
                validate_local_file(&path)?;
                tracing::info!(path = %path.display(), "using local audio file");
                path
            }
            SourceReference::Url(url) => self.extractor.extract_audio(&url).await?,
        };

        let tokens = self
            .retry
            .run(|| self.backend.transcribe(&audio_path))
            .await?;

        // Boundary check before the result reaches the caller. The backend
        // client already validated its own output, so a failure here is
        // reported as a validation error, not re-classified.
        model::decode_result(&tokens)?;

        Ok(tokens)
    }
}

/// File-mode input skips extraction, so the existence and non-emptiness
/// checks the extraction engine would have done happen here instead.
fn validate_local_file(path: &std::path::Path) -> Result<(), PipelineError> {
    let metadata = fs_err::metadata(path)
        .map_err(|e| PipelineError::Validation(format!("cannot access audio file: {e}")))?;
    if !metadata.is_file() {
        return Err(PipelineError::Validation(format!(
            "'{}' is not a file",
            path.display()
        )));
    }
    if metadata.len() == 0 {
        return Err(PipelineError::Validation(format!(
            "audio file '{}' is empty",
            path.display()
        )));
    }
    Ok(())
}
