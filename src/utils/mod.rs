use tokio::process::Command;

/// Cap a captured diagnostic (stderr, response body) for inclusion in an
/// error reason. Keeps the tail, where yt-dlp and HTTP backends put the
/// actionable part.
pub fn truncate_diagnostic(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    let tail: String = trimmed
        .chars()
        .skip(count - max_chars)
        .collect();
    format!("...{tail}")
}

/// Warn up front about missing external tools. Non-fatal: a missing binary
/// also surfaces as a per-strategy attempt failure later.
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();
    if !check_command_available(yt_dlp_path).await {
        missing.push(format!(
            "{yt_dlp_path} - required for URL-mode extraction (https://github.com/yt-dlp/yt-dlp)"
        ));
    }
    missing
}

async fn check_command_available(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
