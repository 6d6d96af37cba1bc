use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "subgen",
    about = "Generate time-aligned subtitles from a YouTube video or a local audio file",
    version,
    group(ArgGroup::new("source").required(true).args(["url", "file"]))
)]
pub struct Cli {
    /// YouTube URL to download and transcribe
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Local audio file to transcribe directly (skips extraction)
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn url_and_file_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["subgen", "--url", "u", "--file", "f"]).is_err());
        assert!(Cli::try_parse_from(["subgen"]).is_err());
        assert!(Cli::try_parse_from(["subgen", "--url", "https://youtu.be/x"]).is_ok());
        assert!(Cli::try_parse_from(["subgen", "--file", "clip.mp3"]).is_ok());
    }
}
