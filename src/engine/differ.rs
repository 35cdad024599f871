//! Diff display for reconciliation reports

use colored::Colorize;
use declarative::{DiffFragment, DiffSummary, JobResult, RequestSummary};
use serde_json::Value;

use crate::ui::{format_value, truncate};

/// Kind of a rendered diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Add,
    Remove,
    Change,
    Detail,
}

impl Marker {
    fn symbol(self) -> colored::ColoredString {
        match self {
            Marker::Add => "+".green(),
            Marker::Remove => "-".red(),
            Marker::Change => "~".yellow(),
            Marker::Detail => " ".normal(),
        }
    }
}

const VALUE_WIDTH: usize = 60;

/// Lines describing one fragment
pub fn fragment_lines(fragment: &DiffFragment) -> Vec<(Marker, String)> {
    match fragment {
        DiffFragment::Created { state, attributes } => {
            let mut lines = vec![(Marker::Add, state.clone())];
            lines.extend(attribute_lines(attributes));
            lines
        }
        DiffFragment::Updated { updated_attributes } => updated_attributes
            .iter()
            .map(|change| {
                (
                    Marker::Change,
                    format!(
                        "{}: {} → {}",
                        change.param,
                        truncate(&format_value(&change.old), VALUE_WIDTH),
                        truncate(&format_value(&change.new), VALUE_WIDTH)
                    ),
                )
            })
            .collect(),
        DiffFragment::Action { action, old, new } => {
            let mut lines = vec![(Marker::Change, action.clone())];
            lines.extend(value_diff(old, new));
            lines
        }
        DiffFragment::Deleted {
            state,
            attributes,
            termination_options,
        } => {
            let mut lines = vec![(Marker::Remove, state.clone())];
            lines.extend(attribute_lines(attributes));
            if let Some(options) = termination_options {
                lines.push((Marker::Detail, "termination options:".to_string()));
                lines.extend(attribute_lines(options));
            }
            lines
        }
    }
}

fn attribute_lines(attributes: &Value) -> Vec<(Marker, String)> {
    match attributes {
        Value::Object(map) => map
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| {
                (
                    Marker::Detail,
                    format!("{key}: {}", truncate(&format_value(value), VALUE_WIDTH)),
                )
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![(Marker::Detail, format_value(other))],
    }
}

/// Line diff of the pretty-printed values
pub fn value_diff(old: &Value, new: &Value) -> Vec<(Marker, String)> {
    if old.is_null() && new.is_null() {
        return Vec::new();
    }
    let old_text = pretty(old);
    let new_text = pretty(new);
    let diff = similar::TextDiff::from_lines(&old_text, &new_text);

    diff.iter_all_changes()
        .filter_map(|change| {
            let line = change.value().trim_end().to_string();
            match change.tag() {
                similar::ChangeTag::Delete => Some((Marker::Remove, line)),
                similar::ChangeTag::Insert => Some((Marker::Add, line)),
                similar::ChangeTag::Equal => None,
            }
        })
        .collect()
}

fn pretty(value: &Value) -> String {
    if value.is_null() {
        return String::new();
    }
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    text.push('\n');
    text
}

/// Display the planned or applied changes of every resource
pub fn display_reports(title: &str, results: &[JobResult], show_commands: bool) {
    let mut summary = DiffSummary::default();
    let mut failed = 0;
    for result in results {
        match &result.result {
            Ok(report) => summary.merge(&report.summary()),
            Err(_) => failed += 1,
        }
    }

    if !summary.has_changes() && failed == 0 {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        title.bold()
    );
    println!("│");

    for result in results {
        match &result.result {
            Ok(report) if report.diff.is_empty() => {}
            Ok(report) => {
                println!("│ {}", result.label.bold());
                for fragment in &report.diff {
                    for (marker, line) in fragment_lines(fragment) {
                        print_line(marker, &line);
                    }
                }
                if show_commands {
                    for command in &report.commands {
                        print_command(command);
                    }
                }
                println!("│");
            }
            Err(err) => {
                println!("│ {} {}", result.label.bold(), "(failed)".red());
                println!("│   {}", err.to_string().red());
                println!("│");
            }
        }
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!("│ Summary: {}", summary_line(&summary, failed));
    println!("└─────────────────────────────────────────────────────┘");
}

fn print_line(marker: Marker, line: &str) {
    match marker {
        Marker::Detail => println!("│       {}", line.dimmed()),
        _ => println!("│   {} {}", marker.symbol(), line),
    }
}

fn print_command(command: &RequestSummary) {
    println!(
        "│     {} {} {}",
        "→".cyan(),
        command.method.to_string().bold(),
        command.url.dimmed()
    );
}

/// "3 changes (1 to create, 2 to update)"
pub fn summary_line(summary: &DiffSummary, failed: usize) -> String {
    let mut parts = Vec::new();
    if summary.creations > 0 {
        parts.push(format!("{} to create", summary.creations));
    }
    if summary.updates > 0 {
        parts.push(format!("{} to update", summary.updates));
    }
    if summary.actions > 0 {
        parts.push(format!("{} action(s)", summary.actions));
    }
    if summary.deletions > 0 {
        parts.push(format!("{} to delete", summary.deletions));
    }
    if failed > 0 {
        parts.push(format!("{failed} failed"));
    }
    if parts.is_empty() {
        format!("{} changes", summary.total())
    } else {
        format!("{} changes ({})", summary.total(), parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Change;
    use serde_json::json;

    #[test]
    fn test_created_lines_skip_nulls() {
        let fragment = DiffFragment::created(json!({"name": "alpha", "description": null}));
        assert_eq!(
            fragment_lines(&fragment),
            vec![
                (Marker::Add, "will be created".to_string()),
                (Marker::Detail, "name: alpha".to_string()),
            ]
        );
    }

    #[test]
    fn test_updated_lines() {
        let fragment = DiffFragment::Updated {
            updated_attributes: vec![Change {
                param: "description".to_string(),
                old: json!("old"),
                new: json!("new"),
            }],
        };
        assert_eq!(
            fragment_lines(&fragment),
            vec![(Marker::Change, "description: old → new".to_string())]
        );
    }

    #[test]
    fn test_action_lines_show_list_diff() {
        let fragment = DiffFragment::Action {
            action: "security_groups".to_string(),
            old: json!(["sg-a"]),
            new: json!(["sg-a", "sg-b"]),
        };
        let lines = fragment_lines(&fragment);
        assert_eq!(lines[0], (Marker::Change, "security_groups".to_string()));
        assert!(lines.contains(&(Marker::Add, r#"  "sg-b""#.to_string())));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_value_diff_of_nulls_is_empty() {
        assert!(value_diff(&Value::Null, &Value::Null).is_empty());
        assert_eq!(
            value_diff(&Value::Null, &json!("on")),
            vec![(Marker::Add, r#""on""#.to_string())]
        );
    }

    #[test]
    fn test_deleted_lines_with_termination_options() {
        let fragment =
            DiffFragment::deleted(json!({"name": "vm1"}), Some(json!({"action": "force_destroy"})));
        assert_eq!(
            fragment_lines(&fragment),
            vec![
                (Marker::Remove, "will be deleted".to_string()),
                (Marker::Detail, "name: vm1".to_string()),
                (Marker::Detail, "termination options:".to_string()),
                (Marker::Detail, "action: force_destroy".to_string()),
            ]
        );
    }

    #[test]
    fn test_summary_line() {
        let summary = DiffSummary {
            creations: 1,
            updates: 2,
            actions: 0,
            deletions: 0,
        };
        assert_eq!(summary_line(&summary, 0), "3 changes (1 to create, 2 to update)");
        assert_eq!(
            summary_line(&DiffSummary::default(), 1),
            "0 changes (1 failed)"
        );
    }
}
