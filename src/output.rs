//! Result reporting: console, JSON summary and CI step outputs

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::upload::UploadResult;

/// Print every message URL, one per line.
pub fn print_urls(result: &UploadResult) {
    for url in &result.message_urls {
        println!("Message URL: {}", url);
    }
}

pub fn to_json(result: &UploadResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Lines in GitHub Actions `key=value` output format.
pub fn github_output_lines(result: &UploadResult) -> Vec<String> {
    let ids: Vec<String> = result.message_ids.iter().map(i32::to_string).collect();
    let mut lines = vec![
        format!("message_urls={}", result.message_urls.join(",")),
        format!("message_ids={}", ids.join(",")),
    ];
    if let (Some(url), Some(id)) = (result.message_urls.first(), ids.first()) {
        lines.push(format!("message_url={}", url));
        lines.push(format!("message_id={}", id));
    }
    lines
}

/// Append the step outputs to the file at `path`.
pub fn write_github_output(path: &Path, result: &UploadResult) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for line in github_output_lines(result) {
        writeln!(file, "{}", line)?;
    }
    tracing::debug!(path = %path.display(), "wrote CI outputs");
    Ok(())
}
