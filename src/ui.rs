use colored::Colorize;
use declarative::{Outcome, OutcomeStatus, PlanReport, ResourceDiff, Summary};

// Status messages go to stderr; stdout carries the report (and `--json`)

/// Print an info message
pub fn info(msg: &str) {
    eprintln!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    eprintln!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// One colored report line for an outcome
pub fn outcome_line(outcome: &Outcome) -> String {
    let id = format!("{}:{}", outcome.kind.dimmed(), outcome.key);
    match &outcome.status {
        OutcomeStatus::AlreadySatisfied => format!("  {} {}", "○".dimmed(), id),
        OutcomeStatus::Applied => format!(
            "  {} {} {}",
            "✓".green(),
            id,
            format!("({})", outcome.note).dimmed()
        ),
        OutcomeStatus::Skipped { reason } => {
            format!("  {} {} {}", "⊘".dimmed(), id, reason.dimmed())
        }
        OutcomeStatus::Failed { stage, error } => format!(
            "  {} {} {} {}",
            "✗".red(),
            id,
            format!("[{stage}]").red(),
            error
        ),
    }
}

/// Print every outcome in order, then the summary
pub fn print_report(report: &PlanReport) {
    header("Plan report");
    for outcome in report.outcomes() {
        println!("{}", outcome_line(outcome));
    }
    print_summary(report.summary());
}

/// Print final summary
pub fn print_summary(summary: Summary) {
    println!();
    if summary.failed == 0 {
        println!("  {} Host matches the profile", "✓".green().bold());
    } else {
        println!(
            "  {} {} resource(s) not satisfied",
            "⚠".yellow().bold(),
            summary.failed
        );
    }
    if summary.applied > 0 {
        println!("    • {} applied", summary.applied);
    }
    if summary.already_satisfied > 0 {
        println!("    • {} already satisfied", summary.already_satisfied);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} failed", summary.failed.to_string().red());
    }
}

/// One line describing a pending change
pub fn diff_line(diff: &ResourceDiff) -> String {
    let marker = if diff.is_addition() {
        "+".green()
    } else if diff.is_removal() {
        "-".red()
    } else {
        "~".yellow()
    };
    let sudo = if diff.requires_sudo {
        format!(" {}", "[sudo]".yellow())
    } else {
        String::new()
    };
    format!(
        "  {} {}{} {}",
        marker,
        diff.description,
        sudo,
        format!("({} -> {})", diff.current, diff.desired).dimmed()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::FailureStage;

    #[test]
    fn test_outcome_line_mentions_stage() {
        colored::control::set_override(false);
        let outcome = Outcome::failed(
            "package",
            "docker-ce",
            "Install docker-ce",
            FailureStage::Apply,
            "apt-get exited with status 100",
        );
        assert_eq!(
            outcome_line(&outcome),
            "  ✗ package:docker-ce [apply] apt-get exited with status 100"
        );
    }

    #[test]
    fn test_outcome_line_applied() {
        colored::control::set_override(false);
        let outcome = Outcome::applied(
            "permission",
            "~/.ssh/config",
            "0644 (want 0600) -> present (0600)",
        );
        assert_eq!(
            outcome_line(&outcome),
            "  ✓ permission:~/.ssh/config (0644 (want 0600) -> present (0600))"
        );
    }
}
