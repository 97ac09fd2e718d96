//! Output and Reporting
//!
//! Formats batch results as a human report, JSON, or a one-line summary.

use std::time::Duration;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::error::Result;
use crate::validator::{FileValidationResult, PerformanceMetrics, ValidationResults, ValidationStatus};

pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn without_colors(mut self) -> Self {
        self.show_colors = false;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, results: &ValidationResults, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Human => Ok(self.format_results(results)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(results)?),
            OutputFormat::Summary => Ok(format_summary_line(results)),
        }
    }

    pub fn format_results(&self, results: &ValidationResults) -> String {
        let mut output = String::new();

        match self.verbosity {
            VerbosityLevel::Quiet => {
                if results.has_errors() {
                    output.push_str(&format!(
                        "Errors: {} Invalid: {}\n",
                        results.error_files, results.invalid_files
                    ));
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose | VerbosityLevel::Debug => {
                output.push_str(&self.format_summary(results));
                output.push('\n');

                if self.verbosity >= VerbosityLevel::Verbose {
                    for file_result in &results.file_results {
                        let shown = !file_result.status.is_valid()
                            || (self.verbosity == VerbosityLevel::Debug && !file_result.warnings.is_empty());
                        if shown {
                            output.push_str(&self.format_file_result(file_result));
                            output.push('\n');
                        }
                    }
                }
            }
        }

        output
    }

    pub fn format_file_result(&self, result: &FileValidationResult) -> String {
        let path_display = result.path.display();
        let duration_str = format_duration(result.duration);
        let version = result
            .version
            .as_deref()
            .map(|v| format!(" [DDMS {}]", v))
            .unwrap_or_default();

        let mut output = match &result.status {
            ValidationStatus::Valid => format!(
                "{}  {}{} ({})",
                self.colorize("✓ VALID", "32"),
                path_display,
                version,
                duration_str
            ),
            ValidationStatus::Invalid { error_count } => {
                let mut output = format!(
                    "{}  {}{} ({}) - {} error{}",
                    self.colorize("✗ INVALID", "31"),
                    path_display,
                    version,
                    duration_str,
                    error_count,
                    if *error_count == 1 { "" } else { "s" }
                );
                for error_detail in &result.error_details {
                    output.push_str(&format!("\n    {}", error_detail));
                }
                output
            }
            ValidationStatus::Error { message } => format!(
                "{}  {} ({}) - {}",
                self.colorize("⚠ ERROR", "33"),
                path_display,
                duration_str,
                message
            ),
            ValidationStatus::Skipped { reason } => format!(
                "{}  {} ({}) - {}",
                self.colorize("- SKIPPED", "36"),
                path_display,
                duration_str,
                reason
            ),
        };

        if self.verbosity == VerbosityLevel::Debug {
            for warning in &result.warnings {
                output.push_str(&format!("\n    {}", self.colorize(warning, "33")));
            }
        }
        output
    }

    fn format_summary(&self, results: &ValidationResults) -> String {
        let mut output = String::new();
        output.push_str("Validation Summary:\n");
        output.push_str(&format!("  Total records: {}\n", results.total_files));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Valid:", "32"),
            results.valid_files
        ));

        if results.invalid_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Invalid:", "31"),
                results.invalid_files
            ));
        }
        if results.error_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Errors:", "33"),
                results.error_files
            ));
        }
        if results.skipped_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Skipped:", "36"),
                results.skipped_files
            ));
        }
        if results.total_warnings > 0 {
            output.push_str(&format!("  Warnings: {}\n", results.total_warnings));
        }
        if !results.versions_seen.is_empty() {
            output.push_str(&format!(
                "  DDMS versions: {}\n",
                results.versions_seen.join(", ")
            ));
        }

        output.push_str(&format!("  Success rate: {:.1}%\n", results.success_rate()));
        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(results.total_duration)
        ));

        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&format_performance_metrics(&results.performance_metrics));
        }

        output
    }
}

fn format_performance_metrics(metrics: &PerformanceMetrics) -> String {
    let mut output = String::new();
    output.push_str("\nPerformance Metrics:\n");
    output.push_str(&format!(
        "  Throughput: {:.1} records/sec\n",
        metrics.throughput_files_per_second
    ));
    output.push_str(&format!("  Threads: {}\n", metrics.threads));
    output.push_str(&format!(
        "  Discovery: {}\n",
        format_duration(metrics.discovery_duration)
    ));
    output
}

fn format_summary_line(results: &ValidationResults) -> String {
    format!(
        "{} records: {} valid, {} invalid, {} errors, {} skipped, {} warnings\n",
        results.total_files,
        results.valid_files,
        results.invalid_files,
        results.error_files,
        results.skipped_files,
        results.total_warnings
    )
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn create_test_results() -> ValidationResults {
        let invalid = FileValidationResult::invalid(
            PathBuf::from("bad.json"),
            Some("4.1".to_string()),
            vec!["[error] /ddms:resource: At least 1 ddms:title element must exist.".to_string()],
            Vec::new(),
            Duration::from_millis(3),
        );
        let valid = FileValidationResult::valid(
            PathBuf::from("good.json"),
            "5.0".to_string(),
            vec!["[warning] /ddms:resource/ddms:dates: empty".to_string()],
            Duration::from_millis(2),
        );
        ValidationResults::aggregate(vec![valid, invalid])
    }

    #[test]
    fn test_output_summary() {
        let output = Output::new(VerbosityLevel::Normal).without_colors();
        let formatted = output.format_results(&create_test_results());
        assert!(formatted.contains("Validation Summary:"));
        assert!(formatted.contains("Invalid: 1"));
        assert!(formatted.contains("DDMS versions: 5.0, 4.1"));
        assert!(!formatted.contains("bad.json"));
    }

    #[test]
    fn test_verbose_lists_invalid_records() {
        let output = Output::new(VerbosityLevel::Verbose).without_colors();
        let formatted = output.format_results(&create_test_results());
        assert!(formatted.contains("✗ INVALID  bad.json [DDMS 4.1]"));
        assert!(formatted.contains("At least 1 ddms:title element must exist."));
        assert!(!formatted.contains("good.json"));
    }

    #[test]
    fn test_debug_shows_warnings() {
        let output = Output::new(VerbosityLevel::Debug).without_colors();
        let formatted = output.format_results(&create_test_results());
        assert!(formatted.contains("✓ VALID  good.json [DDMS 5.0]"));
        assert!(formatted.contains("/ddms:resource/ddms:dates: empty"));
    }

    #[test]
    fn test_summary_and_json_formats() {
        let output = Output::new(VerbosityLevel::Normal).without_colors();
        let results = create_test_results();
        assert_eq!(
            output.render(&results, OutputFormat::Summary).unwrap(),
            "2 records: 1 valid, 1 invalid, 0 errors, 0 skipped, 1 warnings\n"
        );
        let json = output.render(&results, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["valid_files"], 1);
    }

    #[test]
    fn test_quiet_only_reports_failures() {
        let output = Output::new(VerbosityLevel::Quiet).without_colors();
        assert_eq!(
            output.format_results(&create_test_results()),
            "Errors: 0 Invalid: 1\n"
        );
    }
}
