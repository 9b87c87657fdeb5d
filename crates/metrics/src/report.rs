//! Report rendering. Every function here is a pure view over a snapshot:
//! rendering twice against the same sealed state yields identical output.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::collector::{PhaseSnapshot, RunSnapshot};

fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

/// Console block printed when a phase is sealed.
pub fn render_phase_report(phase: &PhaseSnapshot) -> String {
    let mut out = String::new();
    let rule = "-".repeat(80);
    writeln!(out, "{rule}").unwrap();
    writeln!(out, "PHASE COMPLETED: {}", phase.phase).unwrap();
    writeln!(out, "{rule}").unwrap();
    let duration = phase.duration().unwrap_or_else(chrono::Duration::zero);
    writeln!(out, "  Duration: {}", format_duration(duration)).unwrap();
    writeln!(out, "  Concurrent Users: {}", phase.user_count).unwrap();
    writeln!(out, "  Total Requests: {}", phase.total_requests()).unwrap();
    writeln!(
        out,
        "  Successful: {} ({:.2}%)",
        phase.successful_requests(),
        phase.success_rate()
    )
    .unwrap();
    writeln!(out, "  Failed: {}", phase.failed_requests()).unwrap();
    writeln!(out, "  Avg Latency: {:.2}ms", phase.avg_latency_ms()).unwrap();
    writeln!(out, "  Min Latency: {}ms", phase.min_latency_ms()).unwrap();
    writeln!(out, "  Max Latency: {}ms", phase.max_latency_ms()).unwrap();
    writeln!(out, "  P50 Latency: {}ms", phase.percentile_latency_ms(50.0)).unwrap();
    writeln!(out, "  P95 Latency: {}ms", phase.percentile_latency_ms(95.0)).unwrap();
    writeln!(out, "  P99 Latency: {}ms", phase.percentile_latency_ms(99.0)).unwrap();
    writeln!(out, "  Requests/sec: {:.2}", phase.requests_per_second()).unwrap();
    writeln!(out).unwrap();
    writeln!(out, "  Breakdown by Endpoint:").unwrap();
    for (endpoint, stats) in phase.endpoint_breakdown() {
        writeln!(
            out,
            "    {}: {} requests, {:.1}% success, avg {:.0}ms",
            endpoint,
            stats.total,
            stats.success_rate(),
            stats.avg_latency_ms()
        )
        .unwrap();
    }
    writeln!(out, "{rule}").unwrap();
    out
}

/// Console block printed once at run end.
pub fn render_final_summary(run: &RunSnapshot) -> String {
    let mut out = String::new();
    let rule = "*".repeat(80);
    writeln!(out, "{rule}").unwrap();
    writeln!(out, "FINAL LOAD TEST REPORT").unwrap();
    writeln!(out, "{rule}").unwrap();
    writeln!(out, "  Test Duration: {}", format_duration(run.duration())).unwrap();
    writeln!(out, "  Total Requests: {}", run.total_requests()).unwrap();
    writeln!(out, "  Total Successful: {}", run.successful_requests()).unwrap();
    writeln!(out, "  Total Failed: {}", run.failed_requests()).unwrap();
    writeln!(out, "  Overall Success Rate: {:.2}%", run.success_rate()).unwrap();
    if run.total_requests() > 0 {
        writeln!(out, "  Overall Avg Latency: {:.2}ms", run.avg_latency_ms()).unwrap();
        writeln!(
            out,
            "  Overall P95 Latency: {}ms",
            run.percentile_latency_ms(95.0)
        )
        .unwrap();
        writeln!(
            out,
            "  Overall P99 Latency: {}ms",
            run.percentile_latency_ms(99.0)
        )
        .unwrap();
    }
    writeln!(out).unwrap();
    writeln!(out, "Phase Summary:").unwrap();
    for phase in &run.phases {
        writeln!(
            out,
            "  {}: {} requests, {:.1}% success, {:.1} req/s",
            phase.phase,
            phase.total_requests(),
            phase.success_rate(),
            phase.requests_per_second()
        )
        .unwrap();
    }
    writeln!(out, "{rule}").unwrap();
    out
}

/// Durable Markdown document with the full per-phase and error detail.
pub fn render_detailed_report(run: &RunSnapshot) -> String {
    let mut out = String::new();
    writeln!(out, "# API Load Test Report").unwrap();
    writeln!(
        out,
        "Generated: {} UTC",
        run.taken.format("%Y-%m-%d %H:%M:%S")
    )
    .unwrap();
    writeln!(out).unwrap();
    writeln!(out, "## Summary").unwrap();
    writeln!(
        out,
        "- **Test Duration**: {}",
        format_duration(run.duration())
    )
    .unwrap();
    writeln!(out, "- **Total Requests**: {}", run.total_requests()).unwrap();
    writeln!(
        out,
        "- **Successful Requests**: {}",
        run.successful_requests()
    )
    .unwrap();
    writeln!(out, "- **Failed Requests**: {}", run.failed_requests()).unwrap();
    writeln!(out, "- **Success Rate**: {:.2}%", run.success_rate()).unwrap();

    if run.total_requests() > 0 {
        writeln!(out).unwrap();
        writeln!(out, "## Latency Statistics").unwrap();
        writeln!(out, "- **Average**: {:.2}ms", run.avg_latency_ms()).unwrap();
        writeln!(out, "- **Minimum**: {}ms", run.min_latency_ms()).unwrap();
        writeln!(out, "- **Maximum**: {}ms", run.max_latency_ms()).unwrap();
        writeln!(out, "- **P50**: {}ms", run.percentile_latency_ms(50.0)).unwrap();
        writeln!(out, "- **P90**: {}ms", run.percentile_latency_ms(90.0)).unwrap();
        writeln!(out, "- **P95**: {}ms", run.percentile_latency_ms(95.0)).unwrap();
        writeln!(out, "- **P99**: {}ms", run.percentile_latency_ms(99.0)).unwrap();
    }

    writeln!(out).unwrap();
    writeln!(out, "## Phase Details").unwrap();
    for phase in &run.phases {
        let duration = phase.duration().unwrap_or_else(chrono::Duration::zero);
        writeln!(out, "### {}", phase.phase).unwrap();
        writeln!(out, "- **Concurrent Users**: {}", phase.user_count).unwrap();
        writeln!(out, "- **Duration**: {}", format_duration(duration)).unwrap();
        writeln!(out, "- **Total Requests**: {}", phase.total_requests()).unwrap();
        writeln!(out, "- **Success Rate**: {:.2}%", phase.success_rate()).unwrap();
        writeln!(
            out,
            "- **Requests/sec**: {:.2}",
            phase.requests_per_second()
        )
        .unwrap();
        writeln!(out, "- **Avg Latency**: {:.2}ms", phase.avg_latency_ms()).unwrap();
        writeln!(
            out,
            "- **P95 Latency**: {}ms",
            phase.percentile_latency_ms(95.0)
        )
        .unwrap();
        writeln!(out).unwrap();
        writeln!(out, "| Endpoint | Requests | Success % | Avg Latency |").unwrap();
        writeln!(out, "|----------|----------|-----------|-------------|").unwrap();
        for (endpoint, stats) in phase.endpoint_breakdown() {
            writeln!(
                out,
                "| {} | {} | {:.1}% | {:.0}ms |",
                endpoint,
                stats.total,
                stats.success_rate(),
                stats.avg_latency_ms()
            )
            .unwrap();
        }
        writeln!(out).unwrap();
    }

    let errors = run.error_frequencies();
    if !errors.is_empty() {
        writeln!(out, "## Error Summary").unwrap();
        for (message, count) in errors {
            writeln!(out, "- **{message}**: {count} occurrences").unwrap();
        }
    }

    out
}

/// Write the detailed report next to `report_dir`, stamped with the
/// current UTC time so successive runs never collide.
pub fn save_detailed_report(run: &RunSnapshot, report_dir: &Path) -> Result<PathBuf> {
    let filename = format!(
        "load-test-report-{}.md",
        Utc::now().format("%Y%m%d-%H%M%S")
    );
    let path = report_dir.join(filename);
    std::fs::write(&path, render_detailed_report(run))
        .with_context(|| format!("write report to {}", path.display()))?;
    info!(path = %path.display(), "detailed report saved");
    Ok(path)
}
