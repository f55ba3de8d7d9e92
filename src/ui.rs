use colored::{ColoredString, Colorize};
use reconcile::{Action, DiffSummary, ExecuteSummary, ObjectDiff, group_by_type};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
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

fn colored_symbol(action: &Action) -> ColoredString {
    match action {
        Action::NoChange => " ".normal(),
        Action::Create | Action::Recreate => action.symbol().green(),
        Action::Update { .. } => action.symbol().yellow(),
        Action::Replace { .. } => action.symbol().magenta(),
        Action::Delete => action.symbol().red(),
    }
}

/// Detail printed after the object name
fn action_detail(action: &Action) -> String {
    match action {
        Action::Update { changes } => {
            let keys: Vec<&str> = changes.iter().map(|c| c.attribute.as_str()).collect();
            format!("{} ({})", action.verb(), keys.join(", "))
        }
        Action::Replace { attributes } => {
            format!("{} (forced by {})", action.verb(), attributes.join(", "))
        }
        _ => action.verb().to_string(),
    }
}

/// Display a plan grouped by object type
pub fn display_plan(diffs: &[ObjectDiff], verbose: bool) {
    let summary = DiffSummary::from_diffs(diffs);
    if summary.is_empty() {
        println!();
        println!("  {} No changes. The catalog matches the manifest.", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    for (object_type, type_diffs) in group_by_type(diffs) {
        let changed: Vec<_> = type_diffs.iter().filter(|d| d.action.is_change()).collect();
        if changed.is_empty() {
            continue;
        }
        println!("│ {}", object_type.keyword().to_lowercase().bold());
        for diff in changed {
            println!(
                "│   {:<3} {:<40} {}",
                colored_symbol(&diff.action),
                diff.address,
                action_detail(&diff.action).dimmed()
            );
            if verbose && let Action::Update { changes } = &diff.action {
                for change in changes {
                    println!("│         {}", change.display_statement().dimmed());
                }
            }
        }
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Plan: {} to add, {} to change, {} to replace, {} to destroy",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.replacements.to_string().magenta(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} objects created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} objects modified", summary.modified);
    }
    if summary.replaced > 0 {
        println!("    • {} objects replaced", summary.replaced);
    }
    if summary.removed > 0 {
        println!("    • {} objects removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} objects skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "objects".red());
    }
}
