//! Janitor configuration: category table, collision policy and file filters.
//!
//! Configuration is read from a TOML file. Every section is optional; an
//! empty file yields the built-in category table, the `fail` collision policy
//! and no exclusions.
//!
//! # Configuration File Format
//!
//! ```toml
//! on_collision = "rename"
//!
//! [[categories]]
//! name = "Images"
//! extensions = [".jpg", ".jpeg", ".png", ".gif"]
//!
//! [[categories]]
//! name = "Archives"
//! extensions = ["zip", "7z"]
//!
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = ["desktop.ini"]
//! patterns = ["*.part"]
//! extensions = ["crdownload"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use crate::category::{Category, CategoryTable};
use crate::organizer::CollisionPolicy;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".nexusrc.toml";

/// Errors that can occur while loading or compiling configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    #[error("Invalid category '{name}': {reason}")]
    InvalidCategory { name: String, reason: String },
    #[error("IO error reading configuration: {0}")]
    Io(String),
}

/// Top-level janitor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JanitorConfig {
    /// What to do when the destination file name is already taken.
    #[serde(default)]
    pub on_collision: CollisionPolicy,

    /// Categories in priority order. Empty means the built-in table.
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,

    #[serde(default)]
    pub filters: FilterRules,
}

/// One `[[categories]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Rules deciding which files the janitor may touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether files starting with "." are eligible. Defaults to true.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_enable_hidden_files() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for excluding files from organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., "desktop.ini", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the file name (e.g., "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, with or without the dot.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Glob patterns that override every exclude rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl JanitorConfig {
    /// Load configuration, falling back to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if given
    /// 2. `.nexusrc.toml` in the current directory
    /// 3. `$HOME/.config/nexus/config.toml`
    /// 4. built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// missing, or if any file that is found cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("nexus")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        debug!(path = %path.display(), "loading configuration");
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Builds the category table, or the default table if none is configured.
    ///
    /// Extensions listed under more than one category are logged as warnings;
    /// the earlier category keeps them.
    pub fn category_table(&self) -> Result<CategoryTable, ConfigError> {
        if self.categories.is_empty() {
            return Ok(CategoryTable::default());
        }

        let table = CategoryTable::new(
            self.categories
                .iter()
                .map(|c| Category::new(c.name.clone(), &c.extensions))
                .collect(),
        )?;

        for shadow in table.shadowed_extensions() {
            warn!(
                extension = %shadow.extension,
                winner = %shadow.winner,
                shadowed = %shadow.shadowed,
                "extension listed in several categories; the first one wins"
            );
        }

        Ok(table)
    }

    /// Compile filter rules into matchers.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Filter rules with every pattern pre-compiled.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Create compiled filters from filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern)
                        .map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Filters that let every file through.
    pub fn allow_all() -> Self {
        Self {
            enable_hidden_files: true,
            exclude_filenames: HashSet::new(),
            exclude_extensions: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
        }
    }

    /// Check if a file may be organized.
    ///
    /// `file_path` is the path relative to the scan root, which for the
    /// janitor is just the file name. Checks run in order, first decision
    /// wins:
    /// 1. Include patterns: always include
    /// 2. Hidden file filter
    /// 3. Exact filename
    /// 4. Extension (case-insensitive)
    /// 5. Glob patterns
    /// 6. Regex patterns
    /// 7. Default: include
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self
            .include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
        {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
        {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }
}

impl Default for CompiledFilters {
    fn default() -> Self {
        Self::allow_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(rules: FilterRules) -> CompiledFilters {
        CompiledFilters::new(&rules).unwrap()
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = JanitorConfig::from_toml("").unwrap();
        assert_eq!(config.on_collision, CollisionPolicy::Fail);
        assert!(config.filters.enable_hidden_files);
        assert_eq!(config.category_table().unwrap(), CategoryTable::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config = JanitorConfig::from_toml(
            r#"
            on_collision = "rename"

            [[categories]]
            name = "Pictures"
            extensions = ["JPG", ".png"]

            [[categories]]
            name = "Archives"
            extensions = ["zip"]

            [filters]
            enable_hidden_files = false

            [filters.exclude]
            extensions = ["part"]
            "#,
        )
        .unwrap();

        assert_eq!(config.on_collision, CollisionPolicy::Rename);
        let table = config.category_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.classify(".jpg").map(|c| c.name()),
            Some("Pictures")
        );
        assert_eq!(table.classify(".ZIP").map(|c| c.name()), Some("Archives"));
        assert!(table.classify(".pdf").is_none());

        let filters = config.compile_filters().unwrap();
        assert!(!filters.should_include(Path::new(".hidden.png")));
        assert!(!filters.should_include(Path::new("movie.PART")));
        assert!(filters.should_include(Path::new("photo.jpg")));
    }

    #[test]
    fn test_unknown_collision_policy_is_invalid() {
        let result = JanitorConfig::from_toml(r#"on_collision = "overwrite""#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_top_level_key_is_invalid() {
        let result = JanitorConfig::from_toml("colour = true");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_category_name_in_config() {
        let config = JanitorConfig::from_toml(
            r#"
            [[categories]]
            name = "../escape"
            extensions = ["txt"]
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.category_table(),
            Err(ConfigError::InvalidCategory { .. })
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = JanitorConfig::load(Some(Path::new("/non/existent/nexus.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nexus.toml");
        fs::write(&path, "on_collision = \"skip\"\n").unwrap();

        let config = JanitorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.on_collision, CollisionPolicy::Skip);
    }

    #[test]
    fn test_hidden_files_included_by_default() {
        let filters = compile(FilterRules::default());
        assert!(filters.should_include(Path::new(".photo.jpg")));
    }

    #[test]
    fn test_hidden_files_excluded_when_disabled() {
        let filters = compile(FilterRules {
            enable_hidden_files: false,
            ..Default::default()
        });
        assert!(!filters.should_include(Path::new(".DS_Store")));
        assert!(filters.should_include(Path::new("photo.jpg")));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let filters = compile(FilterRules {
            exclude: ExcludeRules {
                filenames: vec!["Thumbs.db".to_string(), "desktop.ini".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!filters.should_include(Path::new("Thumbs.db")));
        assert!(!filters.should_include(Path::new("desktop.ini")));
        assert!(filters.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn test_exclude_extensions_with_or_without_dot() {
        let filters = compile(FilterRules {
            exclude: ExcludeRules {
                extensions: vec!["bak".to_string(), ".TMP".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!filters.should_include(Path::new("file.bak")));
        assert!(!filters.should_include(Path::new("file.tmp")));
        assert!(!filters.should_include(Path::new("file.BAK")));
        assert!(filters.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_exclude_glob_patterns() {
        let filters = compile(FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["*.part".to_string(), "[0-9]*.tmp".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!filters.should_include(Path::new("movie.mp4.part")));
        assert!(!filters.should_include(Path::new("1cache.tmp")));
        assert!(filters.should_include(Path::new("cache.tmp")));
        assert!(filters.should_include(Path::new("movie.mp4")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let filters = compile(FilterRules {
            enable_hidden_files: false,
            exclude: ExcludeRules {
                extensions: vec!["pdf".to_string()],
                ..Default::default()
            },
            include: IncludeRules {
                patterns: vec![".keep.jpg".to_string(), "invoice-*.pdf".to_string()],
            },
        });

        assert!(filters.should_include(Path::new(".keep.jpg")));
        assert!(!filters.should_include(Path::new(".other.jpg")));
        assert!(filters.should_include(Path::new("invoice-2024.pdf")));
        assert!(!filters.should_include(Path::new("manual.pdf")));
    }

    #[test]
    fn test_exclude_regex() {
        let filters = compile(FilterRules {
            exclude: ExcludeRules {
                regex: vec![r"^~\$.*".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!filters.should_include(Path::new("~$report.docx")));
        assert!(filters.should_include(Path::new("report.docx")));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let bad_regex = FilterRules {
            exclude: ExcludeRules {
                regex: vec!["[invalid(".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            CompiledFilters::new(&bad_regex),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let bad_glob = FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["[invalid".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            CompiledFilters::new(&bad_glob),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }
}
