use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use uuid::Uuid;

use crate::utils::truncate_diagnostic;
use crate::PipelineError;

/// One way of asking yt-dlp for audio: a strategy name plus the extra
/// arguments that distinguish it from the base invocation.
///
/// Strategies are pure data constructed ahead of time; the fallback loop in
/// [`AudioExtractor::extract_audio`] never inspects anything but this.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: &'static str,
    pub extra_args: &'static [&'static str],
}

/// Fallback order matters: client impersonation modes first (most reliable
/// against current YouTube blocking), then browser cookies, then the plain
/// invocation as a last resort.
pub const DEFAULT_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "web",
        extra_args: &["--extractor-args", "youtube:player_client=web"],
    },
    Strategy {
        name: "chrome-cookies",
        extra_args: &["--cookies-from-browser", "chrome"],
    },
    Strategy {
        name: "firefox-cookies",
        extra_args: &["--cookies-from-browser", "firefox"],
    },
    Strategy {
        name: "ios",
        extra_args: &["--extractor-args", "youtube:player_client=ios"],
    },
    Strategy {
        name: "android",
        extra_args: &["--extractor-args", "youtube:player_client=android"],
    },
    Strategy {
        name: "tv",
        extra_args: &["--extractor-args", "youtube:player_client=tv"],
    },
    Strategy {
        name: "default",
        extra_args: &[],
    },
];

/// Runs a single extraction attempt. Split out as a trait so the ordered
/// fallback loop can be exercised against a mock runner.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StrategyRunner: Send + Sync {
    /// Apply one strategy to one URL. The error string carries the exit code
    /// and captured stderr of the failed attempt.
    async fn run(&self, url: &str, strategy: &Strategy) -> Result<PathBuf, String>;
}

/// Real runner: spawns yt-dlp with an audio-only format selector and a unique
/// output template, then resolves the produced file.
pub struct YtDlpRunner {
    yt_dlp_path: String,
    output_dir: PathBuf,
}

impl YtDlpRunner {
    pub fn new(yt_dlp_path: String, output_dir: PathBuf) -> Self {
        Self {
            yt_dlp_path,
            output_dir,
        }
    }

    /// Find the attempt's output file. yt-dlp substitutes the real container
    /// extension for `%(ext)s`, so we match on the template stem. If several
    /// files match, the lexicographically first one wins; this is a
    /// best-effort tie-break and is all the determinism we promise.
    async fn resolve_output(&self, stem: &str) -> std::io::Result<Option<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.output_dir).await?;
        let mut matches = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(stem) {
                matches.push(name);
            }
        }
        matches.sort();

        match matches.first() {
            Some(name) => {
                let path = self.output_dir.join(name);
                let metadata = tokio::fs::metadata(&path).await?;
                if metadata.len() > 0 {
                    Ok(Some(path))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StrategyRunner for YtDlpRunner {
    async fn run(&self, url: &str, strategy: &Strategy) -> Result<PathBuf, String> {
        // Unique stem per attempt so a failed attempt's partial files can
        // never satisfy a later attempt's output check.
        let stem = format!("yt-audio-{}.", &Uuid::new_v4().to_string()[..8]);
        let template = self.output_dir.join(format!("{stem}%(ext)s"));

        tracing::debug!(
            strategy = strategy.name,
            template = %template.display(),
            "spawning yt-dlp"
        );

        let output = Command::new(&self.yt_dlp_path)
            .arg(url)
            .args(["-f", "bestaudio", "-o"])
            .arg(&template)
            .args(strategy.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| format!("failed to spawn '{}': {e}", self.yt_dlp_path))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostic = truncate_diagnostic(&stderr, 400);

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(format!("yt-dlp exited with code {code}: {diagnostic}"));
        }

        match self.resolve_output(&stem).await {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(format!("yt-dlp produced no usable file: {diagnostic}")),
            Err(e) => Err(format!("could not inspect yt-dlp output: {e}")),
        }
    }
}

/// Ordered first-success-wins extraction over an external downloader.
pub struct AudioExtractor {
    runner: Box<dyn StrategyRunner>,
    strategies: Vec<Strategy>,
}

impl AudioExtractor {
    pub fn new(runner: Box<dyn StrategyRunner>) -> Self {
        Self::with_strategies(runner, DEFAULT_STRATEGIES.to_vec())
    }

    pub fn with_strategies(runner: Box<dyn StrategyRunner>, strategies: Vec<Strategy>) -> Self {
        Self { runner, strategies }
    }

    /// Try each strategy strictly in order and return the first produced
    /// audio file. Attempts are isolated: a failure is logged, recorded as
    /// the latest diagnostic, and the next strategy runs untouched. When
    /// every strategy fails, one aggregated error reports how many were
    /// tried and the last failure's diagnostic.
    pub async fn extract_audio(&self, url: &str) -> Result<PathBuf, PipelineError> {
        if self.strategies.is_empty() {
            return Err(PipelineError::Extraction(
                "no extraction strategies configured".to_string(),
            ));
        }

        let mut last_failure = String::new();
        let mut last_strategy = "";

        for strategy in &self.strategies {
            tracing::info!(strategy = strategy.name, url, "attempting audio extraction");
            match self.runner.run(url, strategy).await {
                Ok(path) => {
                    tracing::info!(
                        strategy = strategy.name,
                        path = %path.display(),
                        "audio extraction succeeded"
                    );
                    return Ok(path);
                }
                Err(reason) => {
                    tracing::warn!(
                        strategy = strategy.name,
                        %reason,
                        "extraction attempt failed, falling through"
                    );
                    last_failure = reason;
                    last_strategy = strategy.name;
                }
            }
        }

        Err(PipelineError::Extraction(format!(
            "all {} strategies failed; last attempt ({last_strategy}): {last_failure}",
            self.strategies.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    const WEB: Strategy = Strategy {
        name: "web",
        extra_args: &["--extractor-args", "youtube:player_client=web"],
    };
    const IOS: Strategy = Strategy {
        name: "ios",
        extra_args: &["--extractor-args", "youtube:player_client=ios"],
    };
    const PLAIN: Strategy = Strategy {
        name: "default",
        extra_args: &[],
    };

    const URL: &str = "https://www.youtube.com/watch?v=abc";

    #[tokio::test]
    async fn returns_first_successful_strategy_and_stops() {
        let mut seq = Sequence::new();
        let mut runner = MockStrategyRunner::new();
        runner
            .expect_run()
            .withf(|_, s| s.name == "web")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err("HTTP Error 403".to_string()));
        runner
            .expect_run()
            .withf(|_, s| s.name == "ios")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(PathBuf::from("/tmp/yt-audio-1234.m4a")));
        // "default" must never run once "ios" succeeds
        runner
            .expect_run()
            .withf(|_, s| s.name == "default")
            .times(0);

        let extractor =
            AudioExtractor::with_strategies(Box::new(runner), vec![WEB, IOS, PLAIN]);
        let path = extractor.extract_audio(URL).await.unwrap();
        assert_eq!(path, PathBuf::from("/tmp/yt-audio-1234.m4a"));
    }

    #[tokio::test]
    async fn tries_every_strategy_once_in_order_when_all_fail() {
        let mut seq = Sequence::new();
        let mut runner = MockStrategyRunner::new();
        for name in ["web", "ios", "default"] {
            runner
                .expect_run()
                .withf(move |_, s| s.name == name)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, s| Err(format!("{} blocked", s.name)));
        }

        let extractor =
            AudioExtractor::with_strategies(Box::new(runner), vec![WEB, IOS, PLAIN]);
        let err = extractor.extract_audio(URL).await.unwrap_err();

        let PipelineError::Extraction(reason) = err else {
            panic!("expected extraction error");
        };
        assert!(reason.contains("all 3 strategies failed"), "{reason}");
        assert!(reason.contains("default blocked"), "{reason}");
    }

    #[tokio::test]
    async fn zero_strategies_is_an_immediate_error() {
        let mut runner = MockStrategyRunner::new();
        runner.expect_run().times(0);

        let extractor = AudioExtractor::with_strategies(Box::new(runner), Vec::new());
        let err = extractor.extract_audio(URL).await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(_)));
    }

    #[tokio::test]
    async fn spawn_failure_is_an_attempt_failure_not_fatal() {
        let mut seq = Sequence::new();
        let mut runner = MockStrategyRunner::new();
        runner
            .expect_run()
            .withf(|_, s| s.name == "web")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err("failed to spawn 'yt-dlp': No such file".to_string()));
        runner
            .expect_run()
            .withf(|_, s| s.name == "ios")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(PathBuf::from("/tmp/yt-audio-9999.webm")));

        let extractor = AudioExtractor::with_strategies(Box::new(runner), vec![WEB, IOS]);
        assert!(extractor.extract_audio(URL).await.is_ok());
    }

    #[test]
    fn default_chain_ends_with_the_plain_invocation() {
        let names: Vec<_> = DEFAULT_STRATEGIES.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            [
                "web",
                "chrome-cookies",
                "firefox-cookies",
                "ios",
                "android",
                "tv",
                "default"
            ]
        );
        assert!(DEFAULT_STRATEGIES.last().unwrap().extra_args.is_empty());
    }

    #[tokio::test]
    async fn resolve_output_picks_first_lexicographic_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("yt-audio-abcd.webm"), b"data").unwrap();
        std::fs::write(dir.path().join("yt-audio-abcd.m4a"), b"data").unwrap();
        std::fs::write(dir.path().join("unrelated.m4a"), b"data").unwrap();

        let runner = YtDlpRunner::new("yt-dlp".to_string(), dir.path().to_path_buf());
        let resolved = runner.resolve_output("yt-audio-abcd.").await.unwrap();
        assert_eq!(
            resolved,
            Some(dir.path().join("yt-audio-abcd.m4a")),
            "m4a sorts before webm"
        );
    }

    #[tokio::test]
    async fn resolve_output_rejects_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("yt-audio-abcd.m4a"), b"").unwrap();

        let runner = YtDlpRunner::new("yt-dlp".to_string(), dir.path().to_path_buf());
        let resolved = runner.resolve_output("yt-audio-abcd.").await.unwrap();
        assert_eq!(resolved, None);
    }
}
