//! Output module for job reports
//!
//! This module handles:
//! - Aggregating per-task results into a `JobReport`
//! - Printing statistics to the console
//! - Writing the markdown summary and the JSON-lines result file

mod markdown;
mod report;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use report::{JobReport, OutputError, OutputResult, TaskFailure};
pub use stats::print_report;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the de-duplicated processed results of a job, one JSON object per line
///
/// # Arguments
///
/// * `report` - The job report holding the results
/// * `output_path` - Path of the JSON-lines file
///
/// # Returns
///
/// * `Ok(usize)` - Number of results written
/// * `Err(OutputError)` - Failed to serialize or write
pub fn write_results_jsonl(report: &JobReport, output_path: &Path) -> OutputResult<usize> {
    let mut writer = BufWriter::new(File::create(output_path)?);

    for result in report.results() {
        serde_json::to_writer(&mut writer, result)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    Ok(report.results().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlResult, JobId};
    use tempfile::TempDir;

    #[test]
    fn test_write_results_jsonl() {
        let mut report = JobReport::new(JobId::new("job"), false);
        for url in ["https://example.com", "https://example.com/a"] {
            report.record_result(CrawlResult {
                url: url.to_string(),
                depth: 0,
                content: None,
                links_found: 0,
                links_queued: 0,
                attachments: Vec::new(),
                skipped: false,
                skip_reason: None,
            });
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.jsonl");
        assert_eq!(write_results_jsonl(&report, &path).unwrap(), 2);

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: CrawlResult = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.url, "https://example.com");
    }
}
