// ⚖️ Edit Reconciliation - merge grid edits back into the sheet
//
// The editor sends only the cells it touched:
//   row index → { "Attempt N" → new raw value }
//
// Each value is normalized and compared with the stored slot; only real
// changes are written. Touched ledgers are re-packed so no gap precedes a
// filled slot. One full recompute runs afterwards, and only if something
// changed: a prerequisite edit can flip the status of rows nobody touched.

use crate::ledger::{AttemptSlot, MAX_ATTEMPTS};
use crate::sheet::GradeSheet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Sparse edited-cells delta: row index → column name → raw value
pub type EditDelta = BTreeMap<usize, BTreeMap<String, String>>;

/// Display name of an attempt column (0-based slot index).
pub fn slot_column(index: usize) -> String {
    format!("Attempt {}", index + 1)
}

/// Slot index for a column name such as "Attempt 2" or "ATTEMPT_2".
pub fn slot_index(column: &str) -> Option<usize> {
    let normalized: String = column
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect();

    let number: usize = normalized.strip_prefix("ATTEMPT")?.parse().ok()?;
    (1..=MAX_ATTEMPTS).contains(&number).then(|| number - 1)
}

// ============================================================================
// EDIT REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    UnknownRow,
    UnknownColumn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEdit {
    pub row: usize,
    pub column: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditReport {
    /// Cells whose stored value actually changed
    pub applied: usize,
    pub skipped: Vec<SkippedEdit>,
}

impl EditReport {
    /// Whether any change was applied (and a recompute ran)
    pub fn changed(&self) -> bool {
        self.applied > 0
    }
}

// ============================================================================
// RECONCILIATION
// ============================================================================

impl GradeSheet {
    /// Apply an edit delta, recomputing the whole sheet if anything changed
    pub fn apply_edits(&mut self, edits: &EditDelta) -> EditReport {
        let mut report = EditReport::default();
        let mut touched = BTreeSet::new();

        for (&row, cells) in edits {
            for (column, raw) in cells {
                let Some(slot) = slot_index(column) else {
                    warn!(row, column = %column, "Skipping edit to unknown column");
                    report.skipped.push(SkippedEdit {
                        row,
                        column: column.clone(),
                        reason: SkipReason::UnknownColumn,
                    });
                    continue;
                };

                let Some(ledger) = self.ledger_mut(row) else {
                    warn!(row, column = %column, "Skipping edit to unknown row");
                    report.skipped.push(SkippedEdit {
                        row,
                        column: column.clone(),
                        reason: SkipReason::UnknownRow,
                    });
                    continue;
                };

                if ledger.set(slot, AttemptSlot::parse(raw)) {
                    report.applied += 1;
                    touched.insert(row);
                }
            }
        }

        if !report.changed() {
            debug!("Edit delta changed nothing, skipping recompute");
            return report;
        }

        for row in touched {
            if let Some(ledger) = self.ledger_mut(row) {
                ledger.compact();
            }
        }

        self.recompute();
        debug!(applied = report.applied, "Edits reconciled");
        report
    }

    /// Convenience for a single-cell edit
    pub fn edit_cell(&mut self, row: usize, slot: usize, raw: &str) -> EditReport {
        let mut delta = EditDelta::new();
        delta
            .entry(row)
            .or_default()
            .insert(slot_column(slot), raw.to_string());
        self.apply_edits(&delta)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::entities::{Course, CourseRegistry};
    use crate::parser::Transcript;
    use crate::status::RegistrationStatus;
    use pretty_assertions::assert_eq;

    fn catalog() -> CourseRegistry {
        CourseRegistry::from_courses(vec![
            Course::new("Y", "Prerequisite", 3),
            Course::new("X", "Dependent", 3).with_prerequisite("Y"),
        ])
        .unwrap()
    }

    fn delta(entries: &[(usize, &str, &str)]) -> EditDelta {
        let mut delta = EditDelta::new();
        for (row, column, value) in entries {
            delta
                .entry(*row)
                .or_default()
                .insert(column.to_string(), value.to_string());
        }
        delta
    }

    #[test]
    fn test_slot_index_parsing() {
        assert_eq!(slot_index("Attempt 1"), Some(0));
        assert_eq!(slot_index("attempt_5"), Some(4));
        assert_eq!(slot_index(" ATTEMPT 3 "), Some(2));
        assert_eq!(slot_index("Attempt 0"), None);
        assert_eq!(slot_index("Attempt 6"), None);
        assert_eq!(slot_index("Grade"), None);
        assert_eq!(slot_column(1), "Attempt 2");
    }

    #[test]
    fn test_prerequisite_edit_unblocks_dependent() {
        let mut sheet = GradeSheet::new(&catalog(), PlannerConfig::default());
        assert_eq!(
            sheet.record("X").unwrap().status,
            RegistrationStatus::BlockedByPrerequisite("Y".to_string())
        );

        let report = sheet.apply_edits(&delta(&[(0, "Attempt 1", "b")]));

        assert!(report.changed());
        assert_eq!(sheet.record("Y").unwrap().status, RegistrationStatus::Passed);
        assert_eq!(sheet.record("X").unwrap().status, RegistrationStatus::EligibleToRegister);
    }

    #[test]
    fn test_empty_delta_is_idempotent() {
        let mut sheet = GradeSheet::new(&catalog(), PlannerConfig::default());
        sheet.ingest(&Transcript::new("a", "b").with_course("Y", &["F", "C"]));
        let before = sheet.records().to_vec();
        let aggregate = *sheet.aggregate();
        let revision = sheet.revision();

        let report = sheet.apply_edits(&EditDelta::new());

        assert!(!report.changed());
        assert_eq!(sheet.records(), before.as_slice());
        assert_eq!(*sheet.aggregate(), aggregate);
        assert_eq!(sheet.revision(), revision);
    }

    #[test]
    fn test_same_value_edit_reports_no_change() {
        let mut sheet = GradeSheet::new(&catalog(), PlannerConfig::default());
        sheet.ingest(&Transcript::new("a", "b").with_course("Y", &["B+"]));
        let revision = sheet.revision();

        let report = sheet.apply_edits(&delta(&[(0, "Attempt 1", "  b+ ")]));

        assert!(!report.changed());
        assert_eq!(sheet.revision(), revision);
    }

    #[test]
    fn test_clearing_middle_slot_repacks() {
        let mut sheet = GradeSheet::new(&catalog(), PlannerConfig::default());
        sheet.ingest(&Transcript::new("a", "b").with_course("Y", &["F", "D", "C"]));

        sheet.apply_edits(&delta(&[(0, "Attempt 2", "")]));

        let ledger = &sheet.record("Y").unwrap().attempts;
        assert!(ledger.is_packed());
        assert_eq!(ledger.filled_count(), 2);
        assert_eq!(ledger.most_recent(), Some(&AttemptSlot::grade("C")));
        assert_eq!(sheet.record("Y").unwrap().adjusted_load, 3.0);
    }

    #[test]
    fn test_registered_edit() {
        let mut sheet = GradeSheet::new(&catalog(), PlannerConfig::default());
        sheet.edit_cell(1, 0, "reg");

        assert_eq!(sheet.record("X").unwrap().status, RegistrationStatus::CurrentlyRegistered);
        assert!(sheet.aggregate().provisional);
    }

    #[test]
    fn test_unknown_targets_are_skipped() {
        let mut sheet = GradeSheet::new(&catalog(), PlannerConfig::default());
        let report = sheet.apply_edits(&delta(&[
            (9, "Attempt 1", "A"),
            (0, "Grade", "A"),
            (1, "Attempt 1", "A"),
        ]));

        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].reason, SkipReason::UnknownColumn);
        assert_eq!(report.skipped[1].reason, SkipReason::UnknownRow);
        assert_eq!(sheet.record("X").unwrap().status, RegistrationStatus::Passed);
    }

    #[test]
    fn test_delta_from_json() {
        let delta: EditDelta = serde_json::from_str(r#"{"1": {"Attempt 1": "C"}}"#).unwrap();
        let mut sheet = GradeSheet::new(&catalog(), PlannerConfig::default());

        assert!(sheet.apply_edits(&delta).changed());
        assert_eq!(sheet.record("X").unwrap().subject_effort, 6.0);
    }
}
