use anyhow::{bail, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";
pub const DEFAULT_MODEL: &str = "whisper-1";
pub const DEFAULT_YT_DLP: &str = "yt-dlp";

/// Runtime configuration, read from the process environment.
///
/// The API key is the only required value; its absence is reported before any
/// pipeline stage runs. Endpoint, model and the yt-dlp binary are overridable
/// mainly for tests and self-hosted backends.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub yt_dlp_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let Some(api_key) = lookup("OPENAI_API_KEY") else {
            bail!("OPENAI_API_KEY is not set; the transcription backend requires an API key");
        };
        if api_key.trim().is_empty() {
            bail!("OPENAI_API_KEY is set but empty");
        }

        Ok(Self {
            api_key,
            endpoint: lookup("SUBGEN_WHISPER_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: lookup("SUBGEN_WHISPER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            yt_dlp_path: lookup("SUBGEN_YTDLP_PATH")
                .unwrap_or_else(|| DEFAULT_YT_DLP.to_string()),
        })
    }
}
