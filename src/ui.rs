use colored::Colorize;
use declarative::{ApplyResult, ResourceState};

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

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{num}/{total}]").blue().bold(), msg);
}

/// Short label for a step outcome
pub fn result_label(result: &ApplyResult) -> String {
    match result {
        ApplyResult::NoChange => "unchanged".to_string(),
        ApplyResult::Created => "created".to_string(),
        ApplyResult::Modified => "updated".to_string(),
        ApplyResult::Skipped { reason } => format!("skipped ({reason})"),
        ApplyResult::Failed { error } => format!("failed: {error}"),
    }
}

/// Print a resource state line
pub fn state(id: &str, state: &ResourceState) {
    let label = match state {
        ResourceState::Present { details: Some(d) } => format!("{} ({d})", state.label()),
        ResourceState::Modified { from, to } => format!("{} ({from} -> {to})", state.label()),
        _ => state.label().to_string(),
    };
    let colored = match state {
        ResourceState::Present { .. } => label.green(),
        ResourceState::Absent => label.red(),
        ResourceState::Modified { .. } => label.yellow(),
        ResourceState::Unknown => label.dimmed(),
    };
    println!("  {:<40} {}", id, colored);
}

/// Print the tubestrap banner
pub fn banner() {
    println!(
        "{}",
        r"
  ▀█▀ █ █ █▄▄ █▀▀ █▀ ▀█▀ █▀█ ▄▀█ █▀█
   █  █▄█ █▄█ ██▄ ▄█  █  █▀▄ █▀█ █▀▀
"
        .cyan()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_label() {
        assert_eq!(result_label(&ApplyResult::NoChange), "unchanged");
        assert_eq!(result_label(&ApplyResult::Modified), "updated");
        assert_eq!(
            result_label(&ApplyResult::Skipped {
                reason: "Dry run".to_string()
            }),
            "skipped (Dry run)"
        );
        assert_eq!(
            result_label(&ApplyResult::Failed {
                error: "nginx -t".to_string()
            }),
            "failed: nginx -t"
        );
    }
}
