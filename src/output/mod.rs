use anyhow::Result;

use crate::model::SubtitleResult;

/// Render the result as pretty-printed JSON, the pipeline's published shape.
pub fn render_json(result: &SubtitleResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Print the result to stdout. Stdout carries only the result; diagnostics go
/// to stderr.
pub fn print_result(result: &SubtitleResult) -> Result<()> {
    println!("{}", render_json(result)?);
    Ok(())
}
