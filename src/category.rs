//! Extension-based file categorisation.
//!
//! A [`CategoryTable`] is an ordered list of named categories, each owning a
//! set of file extensions. Lookups walk the table in order and the first
//! category listing the extension wins, so an extension that appears under two
//! categories always resolves to the earlier one.
//!
//! # Examples
//!
//! ```
//! use nexus_toolkit::category::{CategoryTable, extension_of};
//!
//! let table = CategoryTable::default();
//! assert_eq!(table.classify(".png").map(|c| c.name()), Some("Images"));
//! assert_eq!(extension_of("REPORT.PDF").as_deref(), Some(".pdf"));
//! assert!(table.classify(".xyz").is_none());
//! ```

use crate::config::ConfigError;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Component, Path};

/// Categories and extensions shipped with the janitor.
const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("Images", &[".jpg", ".jpeg", ".png", ".gif"]),
    ("Docs", &[".pdf", ".docx", ".txt", ".xlsx"]),
    ("Media", &[".mp4", ".mp3", ".wav"]),
    ("Apps", &[".exe", ".msi"]),
];

/// A named bucket of file extensions sharing one destination folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    extensions: BTreeSet<String>,
}

impl Category {
    /// Creates a category, normalising every extension.
    ///
    /// Extensions may be given with or without the leading dot and in any
    /// case: `"JPG"`, `"jpg"` and `".jpg"` are the same extension. Blank
    /// entries are dropped.
    pub fn new<I, S>(name: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            extensions: extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        }
    }

    /// The category name, which doubles as the destination folder name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalised extensions of this category, in sorted order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

}

/// An extension listed under more than one category.
///
/// Only `winner` can ever be selected for it; `shadowed` is unreachable for
/// this extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedExtension {
    pub extension: String,
    pub winner: String,
    pub shadowed: String,
}

/// Ordered mapping from category name to extension set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl CategoryTable {
    /// Builds a table from categories in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCategory`] if a name cannot be used as a
    /// single folder name directly under the scan root, or if two categories
    /// share a name.
    pub fn new(categories: Vec<Category>) -> Result<Self, ConfigError> {
        let mut seen = BTreeSet::new();
        for category in &categories {
            validate_category_name(&category.name)?;
            if !seen.insert(category.name.as_str()) {
                return Err(ConfigError::InvalidCategory {
                    name: category.name.clone(),
                    reason: "duplicate category name".to_string(),
                });
            }
        }
        Ok(Self { categories })
    }

    /// Returns the first category, in table order, that lists `ext`.
    pub fn classify(&self, ext: &str) -> Option<&Category> {
        let ext = normalize_extension(ext)?;
        self.categories
            .iter()
            .find(|category| category.extensions.contains(&ext))
    }

    /// Classifies a file by name. Files without an extension match nothing.
    pub fn classify_file_name(&self, file_name: impl AsRef<OsStr>) -> Option<&Category> {
        extension_of(file_name).and_then(|ext| self.classify(&ext))
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Lists every extension that appears under more than one category.
    pub fn shadowed_extensions(&self) -> Vec<ShadowedExtension> {
        let mut shadowed = Vec::new();
        for (index, later) in self.categories.iter().enumerate() {
            for ext in &later.extensions {
                if let Some(winner) = self.categories[..index]
                    .iter()
                    .find(|earlier| earlier.extensions.contains(ext))
                {
                    shadowed.push(ShadowedExtension {
                        extension: ext.clone(),
                        winner: winner.name.clone(),
                        shadowed: later.name.clone(),
                    });
                }
            }
        }
        shadowed
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|(name, exts)| Category::new(*name, exts.iter()))
                .collect(),
        }
    }
}

/// Returns the lower-cased extension of `file_name`, including the leading dot.
///
/// Follows [`Path::extension`]: only the last dot counts (`a.tar.gz` gives
/// `.gz`), and a leading dot alone does not start an extension (`.bashrc` has
/// none).
pub fn extension_of(file_name: impl AsRef<OsStr>) -> Option<String> {
    Path::new(file_name.as_ref())
        .extension()
        .and_then(|ext| normalize_extension(&ext.to_string_lossy()))
}

/// Lower-cases `ext` and ensures a single leading dot. Blank input yields `None`.
fn normalize_extension(ext: &str) -> Option<String> {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!(".{}", trimmed.to_lowercase()))
    }
}

fn validate_category_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidCategory {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("name must not contain path separators"));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("name must be a plain folder name")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_order() {
        let table = CategoryTable::default();
        let names: Vec<_> = table.categories().iter().map(Category::name).collect();
        assert_eq!(names, vec!["Images", "Docs", "Media", "Apps"]);
    }

    #[test]
    fn test_default_table_classification() {
        let table = CategoryTable::default();
        assert_eq!(table.classify(".jpeg").map(Category::name), Some("Images"));
        assert_eq!(table.classify(".xlsx").map(Category::name), Some("Docs"));
        assert_eq!(table.classify(".wav").map(Category::name), Some("Media"));
        assert_eq!(table.classify(".msi").map(Category::name), Some("Apps"));
        assert_eq!(table.classify(".zip"), None);
    }

    #[test]
    fn test_classify_case_insensitive() {
        let table = CategoryTable::default();
        assert_eq!(table.classify(".JPG"), table.classify(".jpg"));
        assert_eq!(table.classify("Pdf").map(Category::name), Some("Docs"));
    }

    #[test]
    fn test_extension_normalisation() {
        let category = Category::new("Pics", ["JPG", ".Png", "  .gif ", "", "."]);
        let exts: Vec<_> = category.extensions().collect();
        assert_eq!(exts, vec![".gif", ".jpg", ".png"]);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.JPG").as_deref(), Some(".jpg"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some(".gz"));
        assert_eq!(extension_of(".bashrc"), None);
        assert_eq!(extension_of("Makefile"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let table = CategoryTable::new(vec![
            Category::new("Screenshots", [".png"]),
            Category::new("Images", [".png", ".jpg"]),
        ])
        .unwrap();

        assert_eq!(
            table.classify(".png").map(Category::name),
            Some("Screenshots")
        );
        assert_eq!(table.classify(".jpg").map(Category::name), Some("Images"));

        let shadowed = table.shadowed_extensions();
        assert_eq!(
            shadowed,
            vec![ShadowedExtension {
                extension: ".png".to_string(),
                winner: "Screenshots".to_string(),
                shadowed: "Images".to_string(),
            }]
        );
    }

    #[test]
    fn test_default_table_has_no_shadowed_extensions() {
        assert!(CategoryTable::default().shadowed_extensions().is_empty());
    }

    #[test]
    fn test_invalid_category_names_rejected() {
        for name in ["", "  ", "a/b", "..", ".", "a\\b"] {
            let result = CategoryTable::new(vec![Category::new(name, [".txt"])]);
            assert!(result.is_err(), "name {:?} should be rejected", name);
        }
    }

    #[test]
    fn test_duplicate_category_names_rejected() {
        let result = CategoryTable::new(vec![
            Category::new("Docs", [".txt"]),
            Category::new("Docs", [".pdf"]),
        ]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidCategory { .. })
        ));
    }

    #[test]
    fn test_classify_file_name() {
        let table = CategoryTable::default();
        assert_eq!(
            table.classify_file_name("b.PDF").map(Category::name),
            Some("Docs")
        );
        assert_eq!(table.classify_file_name("d.xyz"), None);
        assert_eq!(table.classify_file_name("README"), None);
    }
}
