//! Diff display

use colored::Colorize;
use declarative::{DiffSet, DiffSummary, ResourceDiff, group_by_kind};

use crate::ui;

/// Section title for a resource kind
fn kind_title(kind: &str) -> &str {
    match kind {
        "package" => "Packages",
        "line-in-file" => "Lines in files",
        "permission" => "Permissions",
        "symlink" => "Symlinks",
        "git-clone" => "Repositories",
        "download" => "Downloads",
        "archive" => "Archives",
        "login-shell" => "Login shell",
        "group-membership" => "Groups",
        _ => kind,
    }
}

/// Display pending changes grouped by kind
pub fn display_diff(set: &DiffSet) {
    for failure in &set.failures {
        ui::warn(&format!(
            "Could not inspect {}:{}: {}",
            failure.kind, failure.key, failure.error
        ));
    }

    if set.changes.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Pending changes".bold()
    );
    println!("│");

    for (kind, diffs) in group_by_kind(&set.changes) {
        println!("│ {}", kind_title(kind).bold());
        for diff in diffs {
            println!("│ {}", ui::diff_line(diff));
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(&set.changes);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} unprivileged, {} require sudo)",
        summary.total().to_string().bold(),
        (summary.total() - summary.sudo_required).to_string().green(),
        summary.sudo_required.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Display the sudo boundary warning
pub fn display_sudo_boundary(privileged: &[&ResourceDiff]) {
    println!();
    println!(
        "  {} {} change(s) need elevated privileges:",
        "⚠".yellow(),
        privileged.len()
    );
    for diff in privileged {
        ui::dim(&format!("  • {}", diff.description));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_titles() {
        assert_eq!(kind_title("package"), "Packages");
        assert_eq!(kind_title("group-membership"), "Groups");
        assert_eq!(kind_title("custom"), "custom");
    }
}
