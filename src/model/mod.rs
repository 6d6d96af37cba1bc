use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::PipelineError;

/// Hosts accepted for URL-mode input.
const ALLOWED_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "youtu.be"];

/// The single media source for one pipeline run.
///
/// Exactly one variant is active per run; constructed once by [`decode_args`]
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceReference {
    /// Local audio file, handed straight to transcription.
    File(PathBuf),
    /// Remote video URL, resolved to a local file by the extraction engine.
    Url(String),
}

/// One time-aligned transcript token.
///
/// `id` is 1-based segment order. Tokens are kept in transcription-segment
/// order; timestamps are expected to be monotonic but that is not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleToken {
    pub id: u32,
    pub value: String,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub score: f64,
}

/// The pipeline's sole output artifact.
pub type SubtitleResult = Vec<SubtitleToken>;

/// Validate raw CLI input into a [`SourceReference`].
///
/// URL-mode input is accepted only for the allow-listed YouTube hosts;
/// everything else is rejected with a reason naming the URL and the accepted
/// hosts.
pub fn decode_args(
    url: Option<String>,
    file: Option<PathBuf>,
) -> Result<SourceReference, PipelineError> {
    match (url, file) {
        (Some(url), None) => {
            validate_source_url(&url)?;
            Ok(SourceReference::Url(url))
        }
        (None, Some(path)) => Ok(SourceReference::File(path)),
        _ => Err(PipelineError::Validation(
            "exactly one of a URL or a local file path must be supplied".to_string(),
        )),
    }
}

/// Accepts URLs matching `^https?://(www\.)?(youtube\.com|youtu\.be)/`.
fn validate_source_url(raw: &str) -> Result<(), PipelineError> {
    let parsed = Url::parse(raw).map_err(|e| {
        PipelineError::Validation(format!("'{raw}' is not a valid URL: {e}"))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PipelineError::Validation(format!(
            "'{raw}' must use http or https, got '{}'",
            parsed.scheme()
        )));
    }

    let host = parsed.host_str().unwrap_or("");
    if !ALLOWED_HOSTS.contains(&host) {
        return Err(PipelineError::Validation(format!(
            "'{raw}' is not a supported video URL; accepted hosts are youtube.com, www.youtube.com and youtu.be"
        )));
    }

    Ok(())
}

/// Validate a full token sequence before it crosses a trust boundary.
///
/// All-or-nothing: the first violating token rejects the whole sequence. Runs
/// twice per pipeline run, once on the mapped backend response and once
/// defensively before the result is handed to the caller.
pub fn decode_result(tokens: &[SubtitleToken]) -> Result<(), PipelineError> {
    for (index, token) in tokens.iter().enumerate() {
        if token.id == 0 {
            return Err(PipelineError::Validation(format!(
                "token {index}: id must be a positive integer"
            )));
        }
        if token.start_time_ms < 0 {
            return Err(PipelineError::Validation(format!(
                "token {index}: startTimeMs must be non-negative, got {}",
                token.start_time_ms
            )));
        }
        if token.end_time_ms < token.start_time_ms {
            return Err(PipelineError::Validation(format!(
                "token {index}: endTimeMs {} precedes startTimeMs {}",
                token.end_time_ms, token.start_time_ms
            )));
        }
        if !token.score.is_finite() {
            return Err(PipelineError::Validation(format!(
                "token {index}: score must be a finite number"
            )));
        }
    }
    Ok(())
}
