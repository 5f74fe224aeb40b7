//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use kinocheck_e2e::{CheckResult, CheckSpec, SuiteResult};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for CheckResult {
    fn headers() -> Vec<&'static str> {
        vec!["Check", "Status", "Duration", "Details"]
    }

    fn row(&self) -> Vec<String> {
        let details = match (&self.error_kind, &self.error) {
            (Some(kind), Some(error)) => format!("{}: {}", kind, truncate(error, 120)),
            _ => {
                let warnings = self.notes.iter().filter(|n| n.starts_with("warning:")).count();
                if warnings > 0 {
                    format!("{} warning(s)", warnings)
                } else {
                    String::new()
                }
            }
        };

        vec![
            self.name.clone(),
            if self.success { "✓" } else { "✗" }.to_string(),
            format!("{}ms", self.duration_ms),
            details,
        ]
    }
}

/// One row of `kinocheck list`
#[derive(Debug, Serialize)]
pub struct SpecDisplay {
    pub name: String,
    pub flow: String,
    pub tags: Vec<String>,
    pub description: String,
}

impl From<&CheckSpec> for SpecDisplay {
    fn from(spec: &CheckSpec) -> Self {
        Self {
            name: spec.name.clone(),
            flow: spec.target.flow_name().to_string(),
            tags: spec.tags.clone(),
            description: spec.description.clone(),
        }
    }
}

impl TableDisplay for SpecDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Flow", "Tags", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.flow.clone(),
            self.tags.join(", "),
            self.description.clone(),
        ]
    }
}

/// Render items as a table
pub fn render_table<T: TableDisplay>(items: &[T]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(T::headers());
    for item in items {
        table.add_row(item.row());
    }

    table.to_string()
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No items found.");
            } else {
                println!("{}", render_table(items));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
    }
}

/// One-line verdict for a whole run
pub fn summary_line(result: &SuiteResult) -> String {
    let counts = format!(
        "{} passed, {} failed, {} total in {:.1}s",
        result.passed,
        result.failed,
        result.total,
        result.duration_ms as f64 / 1000.0
    );
    if result.all_passed() {
        format!("{} {}", "PASSED".green().bold(), counts)
    } else {
        format!("{} {}", "FAILED".red().bold(), counts)
    }
}

/// Print the results of a run
pub fn print_suite(result: &SuiteResult, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{}", render_table(&result.results));
            println!("{}", summary_line(result));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
        }
    }
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}…", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinocheck_e2e::default_suite;

    fn result(name: &str, success: bool) -> CheckResult {
        CheckResult {
            name: name.to_string(),
            tags: vec!["api".to_string()],
            success,
            duration_ms: 42,
            notes: vec!["warning: skipped record #1".to_string()],
            error_kind: (!success).then(|| "business_predicate_failure".to_string()),
            error: (!success).then(|| "year 2004 != 2001".to_string()),
        }
    }

    #[test]
    fn test_check_rows() {
        let passed = result("api_age_rating", true).row();
        assert_eq!(passed[1], "✓");
        assert_eq!(passed[2], "42ms");
        assert_eq!(passed[3], "1 warning(s)");

        let failed = result("api_year", false).row();
        assert_eq!(failed[1], "✗");
        assert_eq!(failed[3], "business_predicate_failure: year 2004 != 2001");
    }

    #[test]
    fn test_spec_table_lists_every_check() {
        let rows: Vec<SpecDisplay> = default_suite().iter().map(SpecDisplay::from).collect();
        let table = render_table(&rows);
        assert!(table.contains("api_key_valid"));
        assert!(table.contains("ui/listing_page"));
        assert_eq!(rows[2].tags, vec!["api", "filtering"]);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Шрэк", 10), "Шрэк");
        assert_eq!(truncate("Шрэк навсегда", 4), "Шрэк…");
    }
}
