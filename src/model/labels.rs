//! Label list loading.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Class labels addressed by their 0-based line number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Read one label per line from a UTF-8 file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid UTF-8.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::InputRead {
            path: path.to_path_buf(),
            source,
        })?;

        let table: Self = text.lines().collect();
        tracing::debug!("Loaded {} labels from {}", table.len(), path.display());
        Ok(table)
    }

    /// Label on line `index` (0-based).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the table has no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in file order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for LabelTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_one_label_per_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "dummy\nkitty cat\n\nlakeside\n").unwrap();

        let labels = LabelTable::load(file.path()).unwrap();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels.get(1), Some("kitty cat"));
        assert_eq!(labels.get(2), Some(""));
        assert_eq!(labels.get(3), Some("lakeside"));
        assert_eq!(labels.get(4), None);
    }

    #[test]
    fn test_load_crlf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "cat\r\ndog").unwrap();

        let labels = LabelTable::load(file.path()).unwrap();
        assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["cat", "dog"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = LabelTable::load("/nonexistent/labels.txt").unwrap_err();
        assert!(matches!(err, Error::InputRead { .. }));
    }
}
