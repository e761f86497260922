use crate::batch::BatchReport;
use std::io::Write;

pub const SUCCESS_GLYPH: &str = "✓";
pub const FAILURE_GLYPH: &str = "✗";

/// One line per requested repository, in request order, then a totals line.
pub fn format_summary(report: &BatchReport) -> String {
    let width = report
        .outcomes
        .iter()
        .map(|outcome| outcome.repo_id.to_string().len())
        .max()
        .unwrap_or(0);

    let mut lines: Vec<String> = report
        .outcomes
        .iter()
        .map(|outcome| {
            let glyph = if outcome.success { SUCCESS_GLYPH } else { FAILURE_GLYPH };
            format!(
                "{glyph} {:<width$}  {}",
                outcome.repo_id.to_string(),
                outcome.message
            )
        })
        .collect();
    lines.push(format!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    ));

    lines.join("\n")
}

pub fn print_summary(report: &BatchReport, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{}", format_summary(report))
}
