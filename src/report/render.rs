/*!
 * Report Rendering
 * Human-readable and JSON forms of a session report
 */

use super::types::SessionReport;
use crate::orchestrator::Outcome;
use std::fmt::Write;

/// Multi-line text explaining, attempt by attempt, what was tried
pub fn render_text(report: &SessionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({}, {} bytes in {} entries)",
        report.target.display(),
        report.kind,
        report.size_bytes,
        report.entries
    );

    if report.attempts.is_empty() && report.is_deleted() {
        let _ = writeln!(out, "  already absent; nothing to do");
    }

    for (index, attempt) in report.attempts.iter().enumerate() {
        let mark = if attempt.succeeded { "ok" } else { "failed" };
        let _ = writeln!(
            out,
            "  {}. {:<20} {:<6} {:>6}ms  {}",
            index + 1,
            attempt.strategy,
            mark,
            attempt.duration.as_millis(),
            attempt.diagnostic
        );
    }

    for termination in &report.terminated {
        let _ = writeln!(
            out,
            "  terminated {} ({}) via root {}: {:?}",
            termination.pid, termination.name, termination.root, termination.outcome
        );
    }
    if report.escalated {
        let _ = writeln!(out, "  ownership and access were escalated");
    }
    if let Some(residue) = &report.residue_path {
        let _ = writeln!(out, "  residue left at {}", residue.display());
    }
    if let Some(entries) = report.residual_entries {
        let _ = writeln!(out, "  {} entries remain", entries);
    }
    if report.cancelled {
        let _ = writeln!(out, "  cancelled before completion");
    }

    let _ = write!(
        out,
        "  outcome: {} after {}ms",
        report.outcome,
        report.elapsed.as_millis()
    );
    if report.outcome == Outcome::ScheduledForDeferredDeletion {
        out.push_str(" (restart required to finish)");
    }
    out
}

pub fn render_json(report: &SessionReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// One-line summary over several reports
pub fn render_summary(reports: &[SessionReport]) -> String {
    let count = |outcome: Outcome| reports.iter().filter(|r| r.outcome == outcome).count();
    format!(
        "{} deleted, {} scheduled for restart, {} failed",
        count(Outcome::Deleted),
        count(Outcome::ScheduledForDeferredDeletion),
        count(Outcome::Failed)
    )
}
