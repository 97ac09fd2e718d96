//! Batch Validation Engine
//!
//! Validates many record documents in parallel. Each document is a JSON
//! serialization of a `ddms:resource` element tree; it is read, parsed into an
//! [`Element`] and wrapped as a [`Record`] under the engine's [`Session`].
//! Records share nothing mutable, so the rayon pool needs no locking beyond
//! the progress counter and the fail-fast flag.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cli::RenderFormat;
use crate::element::Element;
use crate::error::{DdmsError, Result};
use crate::file_discovery::FileDiscovery;
use crate::message::ValidationMessage;
use crate::record::Record;
use crate::session::Session;

/// Validation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    /// Number of worker threads
    pub threads: usize,
    /// Skip remaining files after the first invalid record
    pub fail_fast: bool,
    /// Count a record with warnings as invalid
    pub warnings_as_errors: bool,
    /// Rendering captured for every valid record
    pub render: Option<RenderFormat>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            fail_fast: false,
            warnings_as_errors: false,
            render: None,
        }
    }
}

/// Status of a single file validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    /// The record is valid
    Valid,
    /// The record broke a DDMS rule, or had warnings under warnings-as-errors
    Invalid { error_count: usize },
    /// The document could not be read or decoded
    Error { message: String },
    /// The document was not validated
    Skipped { reason: String },
}

impl ValidationStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationStatus::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationStatus::Invalid { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationStatus::Error { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ValidationStatus::Skipped { .. })
    }
}

/// Result of validating a single file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileValidationResult {
    pub path: PathBuf,
    pub status: ValidationStatus,
    /// DDMS version the record was validated under
    pub version: Option<String>,
    pub duration: Duration,
    /// Error messages, each with its locator
    pub error_details: Vec<String>,
    pub warnings: Vec<String>,
    /// Rendering of a valid record, when one was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering: Option<String>,
}

impl FileValidationResult {
    pub fn valid(path: PathBuf, version: String, warnings: Vec<String>, duration: Duration) -> Self {
        Self {
            path,
            status: ValidationStatus::Valid,
            version: Some(version),
            duration,
            error_details: Vec::new(),
            warnings,
            rendering: None,
        }
    }

    pub fn invalid(
        path: PathBuf,
        version: Option<String>,
        error_details: Vec<String>,
        warnings: Vec<String>,
        duration: Duration,
    ) -> Self {
        Self {
            path,
            status: ValidationStatus::Invalid {
                error_count: error_details.len(),
            },
            version,
            duration,
            error_details,
            warnings,
            rendering: None,
        }
    }

    pub fn error(path: PathBuf, error: DdmsError, duration: Duration) -> Self {
        Self {
            path,
            status: ValidationStatus::Error {
                message: error.to_string(),
            },
            version: None,
            duration,
            error_details: vec![error.to_string()],
            warnings: Vec::new(),
            rendering: None,
        }
    }

    pub fn skipped(path: PathBuf, reason: String, duration: Duration) -> Self {
        Self {
            path,
            status: ValidationStatus::Skipped {
                reason: reason.clone(),
            },
            version: None,
            duration,
            error_details: vec![reason],
            warnings: Vec::new(),
            rendering: None,
        }
    }
}

/// Progress update for validation
#[derive(Debug, Clone)]
pub struct ValidationProgress {
    pub current_file: Option<PathBuf>,
    pub completed: usize,
    pub total: usize,
    pub phase: ValidationPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPhase {
    Discovery,
    Validation,
    Complete,
}

/// Performance metrics for validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_duration: Duration,
    pub discovery_duration: Duration,
    pub validation_duration: Duration,
    pub average_time_per_file: Duration,
    pub throughput_files_per_second: f64,
    pub threads: usize,
}

/// Aggregated results of validating multiple files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResults {
    pub total_files: usize,
    pub valid_files: usize,
    pub invalid_files: usize,
    pub error_files: usize,
    pub skipped_files: usize,
    /// Warnings across all records
    pub total_warnings: usize,
    pub total_duration: Duration,
    pub average_duration: Duration,
    pub file_results: Vec<FileValidationResult>,
    /// DDMS versions seen, in first-seen order
    pub versions_seen: Vec<String>,
    pub performance_metrics: PerformanceMetrics,
}

impl ValidationResults {
    /// Aggregate individual file results into summary
    pub fn aggregate(file_results: Vec<FileValidationResult>) -> Self {
        let total_files = file_results.len();
        let mut valid_files = 0;
        let mut invalid_files = 0;
        let mut error_files = 0;
        let mut skipped_files = 0;
        let mut total_warnings = 0;
        let mut total_duration = Duration::ZERO;
        let mut versions_seen: Vec<String> = Vec::new();

        for result in &file_results {
            match result.status {
                ValidationStatus::Valid => valid_files += 1,
                ValidationStatus::Invalid { .. } => invalid_files += 1,
                ValidationStatus::Error { .. } => error_files += 1,
                ValidationStatus::Skipped { .. } => skipped_files += 1,
            }
            total_warnings += result.warnings.len();
            total_duration += result.duration;

            if let Some(version) = &result.version
                && !versions_seen.contains(version)
            {
                versions_seen.push(version.clone());
            }
        }

        let average_duration = if total_files > 0 {
            total_duration / total_files as u32
        } else {
            Duration::ZERO
        };

        let performance_metrics = PerformanceMetrics {
            total_duration,
            discovery_duration: Duration::ZERO,
            validation_duration: total_duration,
            average_time_per_file: average_duration,
            throughput_files_per_second: if total_duration.as_secs_f64() > 0.0 {
                total_files as f64 / total_duration.as_secs_f64()
            } else {
                0.0
            },
            threads: 1,
        };

        Self {
            total_files,
            valid_files,
            invalid_files,
            error_files,
            skipped_files,
            total_warnings,
            total_duration,
            average_duration,
            file_results,
            versions_seen,
            performance_metrics,
        }
    }

    pub fn with_metrics(
        file_results: Vec<FileValidationResult>,
        performance_metrics: PerformanceMetrics,
    ) -> Self {
        let mut results = Self::aggregate(file_results);
        results.total_duration = performance_metrics.total_duration;
        results.performance_metrics = performance_metrics;
        results
    }

    /// Check if all files validated successfully
    pub fn all_valid(&self) -> bool {
        self.valid_files == self.total_files && self.total_files > 0
    }

    /// Check if any files had validation errors
    pub fn has_errors(&self) -> bool {
        self.error_files > 0 || self.invalid_files > 0
    }

    /// Get success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.valid_files as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Progress callback type for validation updates
pub type ProgressCallback = Arc<dyn Fn(ValidationProgress) + Send + Sync>;

/// Parallel record validation engine
pub struct ValidationEngine {
    session: Session,
    config: ValidationConfig,
}

impl ValidationEngine {
    pub fn new(session: Session, config: ValidationConfig) -> Self {
        Self { session, config }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate record documents at a path
    pub fn validate_path(&self, path: &Path, file_discovery: &FileDiscovery) -> Result<ValidationResults> {
        self.validate_path_with_progress(path, file_discovery, None)
    }

    /// Validate record documents at a path (directory or file) with progress tracking
    pub fn validate_path_with_progress(
        &self,
        path: &Path,
        file_discovery: &FileDiscovery,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ValidationResults> {
        let workflow_start = Instant::now();
        let mut metrics = PerformanceMetrics {
            threads: self.config.threads,
            ..PerformanceMetrics::default()
        };

        if let Some(callback) = &progress_callback {
            callback(ValidationProgress {
                current_file: None,
                completed: 0,
                total: 0,
                phase: ValidationPhase::Discovery,
            });
        }
        let discovery_start = Instant::now();
        let files = file_discovery.discover_files(path)?;
        metrics.discovery_duration = discovery_start.elapsed();
        info!("Discovered {} record document(s) under {}", files.len(), path.display());

        let validation_start = Instant::now();
        let results = self.validate_files_with_progress(files, progress_callback.clone())?;
        metrics.validation_duration = validation_start.elapsed();

        metrics.total_duration = workflow_start.elapsed();
        if !results.is_empty() {
            metrics.average_time_per_file = metrics.validation_duration / results.len() as u32;
        }
        if metrics.total_duration.as_secs_f64() > 0.0 {
            metrics.throughput_files_per_second =
                results.len() as f64 / metrics.total_duration.as_secs_f64();
        }

        let final_results = ValidationResults::with_metrics(results, metrics);
        if let Some(callback) = &progress_callback {
            callback(ValidationProgress {
                current_file: None,
                completed: final_results.total_files,
                total: final_results.total_files,
                phase: ValidationPhase::Complete,
            });
        }
        Ok(final_results)
    }

    pub fn validate_files(&self, files: Vec<PathBuf>) -> Result<Vec<FileValidationResult>> {
        self.validate_files_with_progress(files, None)
    }

    /// Validate files on a dedicated pool, keeping the input order in the output
    pub fn validate_files_with_progress(
        &self,
        files: Vec<PathBuf>,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<Vec<FileValidationResult>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let total = files.len();
        let completed = AtomicUsize::new(0);
        let stopped = AtomicBool::new(false);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| DdmsError::Concurrency {
                details: format!("Failed to build validation pool: {}", e),
            })?;

        let results = pool.install(|| {
            files
                .into_par_iter()
                .map(|file_path| {
                    let result = if self.config.fail_fast && stopped.load(Ordering::SeqCst) {
                        FileValidationResult::skipped(
                            file_path.clone(),
                            "Skipped after an earlier failure (fail-fast)".to_string(),
                            Duration::ZERO,
                        )
                    } else {
                        self.validate_single_file(&file_path)
                    };
                    if !result.status.is_valid() && !result.status.is_skipped() {
                        stopped.store(true, Ordering::SeqCst);
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(callback) = &progress_callback {
                        callback(ValidationProgress {
                            current_file: Some(file_path),
                            completed: done,
                            total,
                            phase: ValidationPhase::Validation,
                        });
                    }
                    result
                })
                .collect()
        });
        Ok(results)
    }

    /// Read, decode and validate one record document
    pub fn validate_single_file(&self, file_path: &Path) -> FileValidationResult {
        let start_time = Instant::now();
        let content = match std::fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(e) => return FileValidationResult::error(file_path.to_path_buf(), e.into(), start_time.elapsed()),
        };
        if content.trim().is_empty() {
            return FileValidationResult::skipped(
                file_path.to_path_buf(),
                "Empty document".to_string(),
                start_time.elapsed(),
            );
        }

        let element = match parse_document(&content) {
            Ok(element) => element,
            Err(details) => {
                let error = DdmsError::Document {
                    file: file_path.to_path_buf(),
                    details,
                };
                return FileValidationResult::error(file_path.to_path_buf(), error, start_time.elapsed());
            }
        };

        let mut result = self.validate_element(file_path, element);
        result.duration = start_time.elapsed();
        debug!("{} validated as {:?}", file_path.display(), result.status);
        result
    }

    fn validate_element(&self, file_path: &Path, element: Element) -> FileValidationResult {
        let path = file_path.to_path_buf();
        match self.session.parse_record(element) {
            Ok(record) => {
                let version = record.version().token().to_string();
                let warnings: Vec<String> = record.warnings().iter().map(ToString::to_string).collect();
                if self.config.warnings_as_errors && !warnings.is_empty() {
                    return FileValidationResult::invalid(path, Some(version), warnings, Vec::new(), Duration::ZERO);
                }
                let mut result = FileValidationResult::valid(path, version, warnings, Duration::ZERO);
                result.rendering = self.config.render.map(|format| render(&record, format));
                result
            }
            Err(error) if error.is_invalid() => {
                let detail = ValidationMessage::from(&error).to_string();
                FileValidationResult::invalid(path, None, vec![detail], Vec::new(), Duration::ZERO)
            }
            Err(error) => FileValidationResult::error(path, error, Duration::ZERO),
        }
    }
}

/// Decodes a JSON record document into its root element.
pub fn parse_document(content: &str) -> std::result::Result<Element, String> {
    serde_json::from_str(content).map_err(|e| e.to_string())
}

pub fn render(record: &Record, format: RenderFormat) -> String {
    match format {
        RenderFormat::Html => record.to_html(),
        RenderFormat::Text => record.to_text(),
        RenderFormat::Xml => record.to_xml(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: ValidationStatus, version: Option<&str>, warnings: usize) -> FileValidationResult {
        FileValidationResult {
            path: PathBuf::from("record.json"),
            status,
            version: version.map(str::to_string),
            duration: Duration::from_millis(10),
            error_details: Vec::new(),
            warnings: vec!["[warning] text".to_string(); warnings],
            rendering: None,
        }
    }

    #[test]
    fn test_aggregate_counts() {
        let results = ValidationResults::aggregate(vec![
            result(ValidationStatus::Valid, Some("4.1"), 2),
            result(ValidationStatus::Valid, Some("5.0"), 0),
            result(ValidationStatus::Invalid { error_count: 1 }, Some("4.1"), 0),
            result(
                ValidationStatus::Error {
                    message: "bad".to_string(),
                },
                None,
                0,
            ),
        ]);

        assert_eq!(results.total_files, 4);
        assert_eq!(results.valid_files, 2);
        assert_eq!(results.invalid_files, 1);
        assert_eq!(results.error_files, 1);
        assert_eq!(results.total_warnings, 2);
        assert_eq!(results.versions_seen, vec!["4.1", "5.0"]);
        assert!(results.has_errors());
        assert!(!results.all_valid());
        assert_eq!(results.success_rate(), 50.0);
    }

    #[test]
    fn test_empty_results() {
        let results = ValidationResults::aggregate(Vec::new());
        assert!(!results.all_valid());
        assert_eq!(results.success_rate(), 0.0);
        assert_eq!(results.average_duration, Duration::ZERO);
    }

    #[test]
    fn test_status_predicates() {
        assert!(ValidationStatus::Valid.is_valid());
        assert!(ValidationStatus::Invalid { error_count: 1 }.is_invalid());
        assert!(
            ValidationStatus::Skipped {
                reason: String::new()
            }
            .is_skipped()
        );
    }

    #[test]
    fn test_parse_document_rejects_non_elements() {
        assert!(parse_document("[1, 2]").is_err());
        let element = parse_document(r#"{"prefix": "ddms", "name": "title", "namespace": "urn:x"}"#).unwrap();
        assert_eq!(element.qualified_name(), "ddms:title");
    }
}
