// ⚙️ Planner Configuration
// Ingestion conventions and the transcript's fixed cell layout.
//
// Loaded from JSON (all fields optional), then overridden by CLI flags.

use crate::entities::DEFAULT_ELECTIVE_CODE;
use crate::error::{PlannerError, PlannerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What a blank transcript cell (or the literal "00") means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingConvention {
    /// No grade: the value is dropped
    #[default]
    NoGrade,

    /// Currently registered, grade pending
    Registered,
}

/// What happens to transcript courses missing from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    Drop,

    /// Append their attempts into this bucket course's free slots
    FoldIntoElective { code: String },
}

impl Default for UnmatchedPolicy {
    fn default() -> Self {
        UnmatchedPolicy::FoldIntoElective {
            code: DEFAULT_ELECTIVE_CODE.to_string(),
        }
    }
}

/// Cell coordinates, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptLayout {
    /// Rows before the course listing starts
    pub header_rows: usize,
    pub name_cell: CellRef,
    pub id_cell: CellRef,
    pub code_column: usize,
    pub grade_column: usize,
}

impl Default for TranscriptLayout {
    fn default() -> Self {
        TranscriptLayout {
            header_rows: 5,
            name_cell: CellRef { row: 1, column: 1 },
            id_cell: CellRef { row: 2, column: 1 },
            code_column: 0,
            grade_column: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub pending: PendingConvention,
    pub unmatched: UnmatchedPolicy,
    pub layout: TranscriptLayout,
}

impl PlannerConfig {
    /// Load config from a JSON file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| PlannerError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| PlannerError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_pending(mut self, pending: PendingConvention) -> Self {
        self.pending = pending;
        self
    }

    pub fn with_unmatched(mut self, unmatched: UnmatchedPolicy) -> Self {
        self.unmatched = unmatched;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.pending, PendingConvention::NoGrade);
        assert_eq!(
            config.unmatched,
            UnmatchedPolicy::FoldIntoElective { code: "ELECTIVE".to_string() }
        );
        assert_eq!(config.layout.header_rows, 5);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"pending": "registered", "unmatched": {{"policy": "drop"}}, "layout": {{"grade_column": 5}}}}"#
        )
        .unwrap();

        let config = PlannerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pending, PendingConvention::Registered);
        assert_eq!(config.unmatched, UnmatchedPolicy::Drop);
        assert_eq!(config.layout.grade_column, 5);
        assert_eq!(config.layout.code_column, 0);
        assert_eq!(config.layout.name_cell, CellRef { row: 1, column: 1 });
    }

    #[test]
    fn test_bad_json_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            PlannerConfig::from_file(file.path()),
            Err(PlannerError::Json { .. })
        ));
    }
}
