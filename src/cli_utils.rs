/// CLI utilities for consistent output formatting
use std::io::IsTerminal;

use crate::regenerate::Report;

/// Get a colored prefix
///
/// Returns bright cyan if stderr is a TTY, plain text otherwise.
pub fn prepare_prefix() -> &'static str {
    if std::io::stderr().is_terminal() {
        "\x1b[96m[sqlx-prepare]\x1b[0m"
    } else {
        "[sqlx-prepare]"
    }
}

fn exit_label(code: Option<i32>, spawned: bool) -> String {
    match (spawned, code) {
        (false, _) => "not run".to_string(),
        (true, Some(0)) => "ok".to_string(),
        (true, Some(code)) => format!("exit {}", code),
        (true, None) => "killed".to_string(),
    }
}

/// One-line summary lines printed after a run
pub fn summary_lines(report: &Report) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{}: {}",
            report.clean.command,
            exit_label(report.clean.exit_code, report.clean.spawned)
        ),
        format!(
            "{}: {}",
            report.check.command,
            exit_label(report.check.exit_code, report.check.spawned)
        ),
    ];

    if let Some(stats) = &report.copied {
        lines.push(format!(
            "Wrote {} query file(s) ({} bytes) to {}",
            stats.file_count,
            stats.size_bytes,
            report.layout.prepare_dir.display()
        ));
    }

    if let Some(diff) = &report.diff {
        if diff.is_empty() {
            lines.push(format!(
                "{} is up to date ({} query file(s))",
                report.layout.prepare_dir.display(),
                report.digest.files.len()
            ));
        } else {
            for path in &diff.added {
                lines.push(format!("  + {}", path));
            }
            for path in &diff.removed {
                lines.push(format!("  - {}", path));
            }
            for path in &diff.changed {
                lines.push(format!("  ~ {}", path));
            }
        }
    }

    lines.push(format!("Digest: {}", &report.digest.hash[..16.min(report.digest.hash.len())]));
    lines
}
