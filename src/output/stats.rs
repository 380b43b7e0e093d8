//! Console statistics for a finished job

use crate::output::report::JobReport;

/// Prints a job report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &JobReport) {
    println!("=== Crawl Statistics ===\n");

    println!("Job: {}", report.job_id);
    if let Some(duration) = report.duration_seconds() {
        println!("Duration: {} seconds", duration);
    }
    println!();

    println!("Overview:");
    println!("  Tasks reported: {}", report.tasks_total());
    println!("  Pages processed: {}", report.pages_processed);
    println!("  Skipped (already visited): {}", report.skipped_duplicate);
    println!("  Skipped (over budget): {}", report.skipped_over_budget);
    if report.skipped_aborted > 0 {
        println!("  Skipped (job aborted): {}", report.skipped_aborted);
    }
    if report.duplicates_dropped > 0 {
        println!("  Duplicate results dropped: {}", report.duplicates_dropped);
    }
    println!("  Links found: {}", report.links_found);
    println!("  Links queued: {}", report.links_queued);
    println!("  Attachments stored: {}", report.attachments);
    println!();

    if !report.depth_breakdown.is_empty() {
        println!("Pages by Depth:");
        for (depth, count) in &report.depth_breakdown {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    if !report.failures.is_empty() {
        println!("Failures ({}):", report.failures.len());
        for failure in &report.failures {
            println!("  - {} (depth {}): {}", failure.url, failure.depth, failure.message);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} processed, {} failed)",
        report.success_rate(),
        report.pages_processed,
        report.failures.len()
    );

    if report.is_clean() {
        println!("Crawl finished cleanly");
    } else {
        println!("Crawl finished with errors");
    }
}
