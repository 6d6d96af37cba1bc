//! Subgen - generate time-aligned subtitles from YouTube videos or local audio
//!
//! This library wires a resilient acquisition-and-transcription pipeline: audio
//! is pulled from an unreliable upstream via an ordered list of yt-dlp fallback
//! strategies, transcribed through the OpenAI Whisper API under a jittered
//! retry policy, and validated into subtitle tokens before anything reaches the
//! caller.

pub mod cli;
pub mod config;
pub mod extract;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod retry;
pub mod transcribe;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use extract::{AudioExtractor, Strategy};
pub use model::{SourceReference, SubtitleResult, SubtitleToken};
pub use pipeline::Pipeline;
pub use retry::RetryPolicy;

/// Every failure the pipeline can surface, flattened to three kinds.
///
/// Lower layers convert external failures (process exits, network errors,
/// schema mismatches) into one of these at the point of origin; nothing
/// untyped crosses into the orchestrator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("audio extraction failed: {0}")]
    Extraction(String),

    #[error("transcription failed: {0}")]
    Transcription(String),
}
