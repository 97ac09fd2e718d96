use crate::error::{DdmsError, Result};
use globset::{GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Finds record documents under a path, filtered by extension and glob patterns
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// File extensions to include (e.g., ["json"])
    extensions: Vec<String>,
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
    /// Maximum depth below the root (None = unlimited)
    max_depth: Option<usize>,
    follow_symlinks: bool,
}

impl FileDiscovery {
    pub fn new() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            include_set: None,
            exclude_set: None,
            max_depth: None,
            follow_symlinks: false,
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.include_set = build_glob_set(&patterns, "include")?;
        Ok(self)
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.exclude_set = build_glob_set(&patterns, "exclude")?;
        Ok(self)
    }

    /// Set maximum traversal depth; files directly in the root are at depth 0
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Descend into symlinked directories and accept symlinked files
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Discover files in the given path (file or directory), sorted by path
    pub fn discover_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let metadata = std::fs::metadata(path)?;
        if metadata.is_file() {
            return Ok(if self.should_process(path) {
                vec![path.to_path_buf()]
            } else {
                Vec::new()
            });
        }

        let mut files = Vec::new();
        let walker = WalkBuilder::new(path)
            .standard_filters(false)
            .follow_links(self.follow_symlinks)
            .max_depth(self.max_depth.map(|depth| depth + 1))
            .build();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    let is_file = entry.file_type().is_some_and(|t| t.is_file());
                    if is_file && self.should_process(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => warn!("Error while discovering files: {}", e),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Check if a file should be processed based on extensions and patterns
    pub fn should_process(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        if !self.extensions.contains(&extension.to_lowercase()) {
            return false;
        }

        if let Some(exclude_set) = &self.exclude_set
            && exclude_set.is_match(path)
        {
            return false;
        }

        // If any include patterns are given, at least one must match
        if let Some(include_set) = &self.include_set {
            return include_set.is_match(path);
        }

        true
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

fn build_glob_set(patterns: &[String], label: &str) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| DdmsError::Config(format!("Invalid glob pattern '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| DdmsError::Config(format!("Failed to build {} glob set: {}", label, e)))?;
    Ok(Some(set))
}
