//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of a job, including outcome
//! counts, the per-depth breakdown, failures and the list of processed pages.

use crate::output::report::{JobReport, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of a job
///
/// # Arguments
///
/// * `report` - The job report
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn write_markdown_report(report: &JobReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a job report as markdown
pub fn format_markdown_report(report: &JobReport) -> String {
    let mut md = String::new();

    md.push_str("# Fanout Crawl Summary\n\n");

    md.push_str("## Job Information\n\n");
    md.push_str(&format!("- **Job ID**: {}\n", report.job_id));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = &report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    let status = if report.is_clean() {
        "finished cleanly"
    } else {
        "finished with errors"
    };
    md.push_str(&format!("- **Status**: {}\n\n", status));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Processed**: {}\n", report.pages_processed));
    md.push_str(&format!(
        "- **Skipped (already visited)**: {}\n",
        report.skipped_duplicate
    ));
    md.push_str(&format!(
        "- **Skipped (over budget)**: {}\n",
        report.skipped_over_budget
    ));
    md.push_str(&format!(
        "- **Skipped (job aborted)**: {}\n",
        report.skipped_aborted
    ));
    md.push_str(&format!(
        "- **Duplicate Results Dropped**: {}\n",
        report.duplicates_dropped
    ));
    md.push_str(&format!("- **Failures**: {}\n", report.failures.len()));
    md.push_str(&format!("- **Links Found**: {}\n", report.links_found));
    md.push_str(&format!("- **Links Queued**: {}\n", report.links_queued));
    md.push_str(&format!("- **Attachments**: {}\n", report.attachments));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    if !report.depth_breakdown.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in &report.depth_breakdown {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    if !report.failures.is_empty() {
        md.push_str("## Failures\n\n");
        md.push_str("| URL | Depth | Error |\n");
        md.push_str("|-----|-------|-------|\n");
        for failure in &report.failures {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                failure.url,
                failure.depth,
                failure.message.replace('|', "\\|")
            ));
        }
        md.push('\n');
    }

    if !report.results().is_empty() {
        md.push_str("## Pages\n\n");
        for result in report.results() {
            let title = result
                .content
                .as_ref()
                .and_then(|c| c.title())
                .unwrap_or("(untitled)");
            md.push_str(&format!(
                "- [{}]({}) (depth {}, {} links)\n",
                title, result.url, result.depth, result.links_found
            ));
        }
        md.push('\n');
    }

    md
}
