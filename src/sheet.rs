// 📋 Grade Sheet - the session's working table
//
// One CourseRecord per catalog course, created blank at session start.
// Every mutation (ingest, reset, edits) ends in a full recompute:
//   1. load & effort for every record
//   2. session aggregate
//   3. registration status for every record
// Dependents are not tracked, so partial recomputes are never attempted.

use crate::calculator::{course_load, CourseLoad, SessionAggregate};
use crate::config::{PendingConvention, PlannerConfig, UnmatchedPolicy};
use crate::entities::{normalize_code, Course, CourseRegistry};
use crate::ledger::{AttemptLedger, AttemptSlot, MAX_ATTEMPTS};
use crate::parser::Transcript;
use crate::status::{self, RegistrationStatus, StatusKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Raw transcript value meaning "no grade recorded yet".
pub const NO_GRADE_MARKER: &str = "00";

// ============================================================================
// COURSE RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    #[serde(flatten)]
    pub course: Course,
    pub attempts: AttemptLedger,
    pub adjusted_load: f64,
    pub subject_effort: f64,
    pub status: RegistrationStatus,
}

impl CourseRecord {
    fn blank(course: Course) -> Self {
        CourseRecord {
            course,
            attempts: AttemptLedger::new(),
            adjusted_load: 0.0,
            subject_effort: 0.0,
            status: RegistrationStatus::default(),
        }
    }

    pub fn code(&self) -> &str {
        &self.course.code
    }

    pub fn load(&self) -> CourseLoad {
        CourseLoad {
            adjusted_load: self.adjusted_load,
            subject_effort: self.subject_effort,
        }
    }

    /// Grade pending: this row's contribution to the GPA is a placeholder
    pub fn is_provisional(&self) -> bool {
        self.attempts.has_pending_registration()
    }
}

// ============================================================================
// INGEST REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Catalog courses whose slots were replaced
    pub matched: Vec<String>,

    /// Unmatched courses folded into the elective bucket
    pub folded: Vec<String>,

    /// Unmatched courses ignored
    pub dropped: Vec<String>,

    /// Folded attempts discarded because the bucket was full
    pub overflow: usize,
}

impl IngestReport {
    pub fn summary(&self) -> String {
        format!(
            "{} matched, {} folded into elective, {} dropped, {} overflow attempt(s)",
            self.matched.len(),
            self.folded.len(),
            self.dropped.len(),
            self.overflow
        )
    }
}

// ============================================================================
// GRADE SHEET
// ============================================================================

#[derive(Debug, Clone)]
pub struct GradeSheet {
    config: PlannerConfig,
    student_name: String,
    student_id: String,
    records: Vec<CourseRecord>,
    index: HashMap<String, usize>,
    aggregate: SessionAggregate,
    revision: u64,
}

impl GradeSheet {
    /// Blank sheet: one empty row per catalog course, in catalog order
    pub fn new(catalog: &CourseRegistry, config: PlannerConfig) -> Self {
        let records: Vec<CourseRecord> = catalog
            .all_courses()
            .iter()
            .cloned()
            .map(CourseRecord::blank)
            .collect();
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.course.code.clone(), i))
            .collect();

        let mut sheet = GradeSheet {
            config,
            student_name: String::new(),
            student_id: String::new(),
            records,
            index,
            aggregate: SessionAggregate::default(),
            revision: 0,
        };
        sheet.recompute();
        sheet
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn records(&self) -> &[CourseRecord] {
        &self.records
    }

    pub fn record(&self, code: &str) -> Option<&CourseRecord> {
        self.position(code).map(|i| &self.records[i])
    }

    pub fn record_at(&self, row: usize) -> Option<&CourseRecord> {
        self.records.get(row)
    }

    pub fn position(&self, code: &str) -> Option<usize> {
        self.index.get(&normalize_code(code)).copied()
    }

    pub fn aggregate(&self) -> &SessionAggregate {
        &self.aggregate
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of recomputes run so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn ledger_mut(&mut self, row: usize) -> Option<&mut AttemptLedger> {
        self.records.get_mut(row).map(|r| &mut r.attempts)
    }

    /// Normalize one raw transcript value under the configured convention
    pub fn normalize_raw(&self, raw: &str) -> AttemptSlot {
        let value = raw.trim();
        if value.is_empty() || value == NO_GRADE_MARKER {
            return match self.config.pending {
                PendingConvention::NoGrade => AttemptSlot::Empty,
                PendingConvention::Registered => AttemptSlot::Registered,
            };
        }
        AttemptSlot::parse(value)
    }

    fn ledger_from_raw(&self, raw: &[String]) -> AttemptLedger {
        AttemptLedger::from_attempts(
            raw.iter()
                .take(MAX_ATTEMPTS)
                .map(|value| self.normalize_raw(value)),
        )
    }

    // ========================================================================
    // INGESTION
    // ========================================================================

    /// Bulk-load a transcript, then recompute.
    ///
    /// Matched courses have their slots replaced. Unmatched courses are
    /// dropped or folded into the elective bucket per config; folding
    /// happens after every matched course is written, in encounter order.
    pub fn ingest(&mut self, transcript: &Transcript) -> IngestReport {
        let mut report = IngestReport::default();
        let mut unmatched = Vec::new();

        self.student_name = transcript.student_name.clone();
        self.student_id = transcript.student_id.clone();

        for entry in &transcript.courses {
            let ledger = self.ledger_from_raw(&entry.attempts);
            match self.position(&entry.code) {
                Some(row) => {
                    debug!(course = %entry.code, attempts = ledger.filled_count(), "Matched course");
                    self.records[row].attempts = ledger;
                    report.matched.push(normalize_code(&entry.code));
                }
                None => unmatched.push((entry.code.clone(), ledger)),
            }
        }

        if !unmatched.is_empty() {
            self.place_unmatched(unmatched, &mut report);
        }

        self.recompute();
        info!(
            student = %self.student_name,
            gpa = self.aggregate.final_gpa,
            "Transcript ingested: {}",
            report.summary()
        );
        report
    }

    fn place_unmatched(&mut self, unmatched: Vec<(String, AttemptLedger)>, report: &mut IngestReport) {
        let bucket = match &self.config.unmatched {
            UnmatchedPolicy::Drop => None,
            UnmatchedPolicy::FoldIntoElective { code } => {
                let row = self.position(code);
                if row.is_none() {
                    warn!(elective = %code, "Elective bucket not in catalog, dropping unmatched courses");
                }
                row
            }
        };

        let Some(row) = bucket else {
            for (code, _) in unmatched {
                debug!(course = %code, "Dropped course outside the catalog");
                report.dropped.push(code);
            }
            return;
        };

        // A bucket the transcript names directly keeps those attempts;
        // otherwise it starts fresh so re-ingesting is idempotent.
        let bucket_code = self.records[row].course.code.clone();
        if !report.matched.contains(&bucket_code) {
            self.records[row].attempts.clear();
        }

        for (code, ledger) in unmatched {
            let bucket = &mut self.records[row].attempts;
            for slot in ledger.filled() {
                if !bucket.push(slot.clone()) {
                    report.overflow += 1;
                }
            }
            debug!(course = %code, elective = %bucket_code, "Folded course into elective");
            report.folded.push(code);
        }

        if report.overflow > 0 {
            warn!(
                elective = %bucket_code,
                discarded = report.overflow,
                "Elective bucket full, extra attempts discarded"
            );
        }
    }

    /// Empty every ledger and forget the student
    pub fn reset(&mut self) {
        self.student_name.clear();
        self.student_id.clear();
        for record in &mut self.records {
            record.attempts.clear();
        }
        self.recompute();
    }

    // ========================================================================
    // RECOMPUTE
    // ========================================================================

    /// Re-derive every record, the aggregate and every status
    pub fn recompute(&mut self) {
        for record in &mut self.records {
            let load = course_load(&record.attempts, record.course.credit_hours);
            record.adjusted_load = load.adjusted_load;
            record.subject_effort = load.subject_effort;
        }

        let pending = self.records.iter().filter(|r| r.is_provisional()).count();
        self.aggregate = SessionAggregate::from_loads(self.records.iter().map(CourseRecord::load), pending);

        let statuses: Vec<RegistrationStatus> = self
            .records
            .iter()
            .map(|r| {
                status::resolve(&r.course, &r.attempts, |code| {
                    self.index.get(&normalize_code(code)).map(|&i| &self.records[i].attempts)
                })
            })
            .collect();

        for (record, status) in self.records.iter_mut().zip(statuses) {
            record.status = status;
        }

        self.revision += 1;
        debug!(revision = self.revision, gpa = self.aggregate.final_gpa, "Sheet recomputed");
    }

    /// Course count per status, every status present (possibly 0)
    pub fn status_counts(&self) -> BTreeMap<StatusKind, usize> {
        let mut counts: BTreeMap<StatusKind, usize> =
            StatusKind::ALL.iter().map(|k| (*k, 0)).collect();
        for record in &self.records {
            *counts.entry(record.status.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Rows with a given status
    pub fn with_status(&self, kind: StatusKind) -> Vec<&CourseRecord> {
        self.records
            .iter()
            .filter(|r| r.status.kind() == kind)
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::DEFAULT_ELECTIVE_CODE;
    use pretty_assertions::assert_eq;

    fn small_catalog() -> CourseRegistry {
        CourseRegistry::from_courses(vec![
            Course::new("MATH100", "Pre-Calculus", 3),
            Course::new("MATH101", "Calculus I", 3).with_prerequisite("MATH100"),
            Course::new(DEFAULT_ELECTIVE_CODE, "Free Elective", 3),
        ])
        .unwrap()
    }

    fn sheet() -> GradeSheet {
        GradeSheet::new(&small_catalog(), PlannerConfig::default())
    }

    fn slots(sheet: &GradeSheet, code: &str) -> Vec<String> {
        sheet
            .record(code)
            .unwrap()
            .attempts
            .filled()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_new_sheet_is_blank() {
        let sheet = sheet();
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.aggregate().final_gpa, 0.0);
        assert_eq!(
            sheet.record("MATH101").unwrap().status,
            RegistrationStatus::BlockedByPrerequisite("MATH100".to_string())
        );
        assert_eq!(sheet.record("MATH100").unwrap().status, RegistrationStatus::EligibleToRegister);
    }

    #[test]
    fn test_end_to_end_example() {
        let mut sheet = sheet();
        let transcript = Transcript::new("Jane", "42")
            .with_course("MATH100", &["C"])
            .with_course("MATH101", &[]);
        sheet.ingest(&transcript);

        let math100 = sheet.record("MATH100").unwrap();
        assert_eq!(math100.adjusted_load, 3.0);
        assert_eq!(math100.subject_effort, 6.0);
        assert_eq!(math100.status, RegistrationStatus::Passed);

        let math101 = sheet.record("MATH101").unwrap();
        assert_eq!(math101.adjusted_load, 0.0);
        assert_eq!(math101.status, RegistrationStatus::EligibleToRegister);

        assert_eq!(sheet.aggregate().final_gpa, 2.0);
        assert_eq!(sheet.student_name(), "Jane");
    }

    #[test]
    fn test_ingest_truncates_to_five_raw_values() {
        let mut sheet = sheet();
        let transcript = Transcript::new("a", "b")
            .with_course("MATH100", &["F", "F", "F", "F", "D", "A"]);
        sheet.ingest(&transcript);

        assert_eq!(slots(&sheet, "MATH100"), vec!["F", "F", "F", "F", "D"]);
    }

    #[test]
    fn test_no_grade_convention_drops_blanks() {
        let mut sheet = sheet();
        sheet.ingest(&Transcript::new("a", "b").with_course("MATH100", &["F", "", "00", "C"]));

        assert_eq!(slots(&sheet, "MATH100"), vec!["F", "C"]);
        assert!(sheet.record("MATH100").unwrap().attempts.is_packed());
    }

    #[test]
    fn test_no_grade_marker_follows_convention() {
        let config = PlannerConfig::default().with_pending(PendingConvention::Registered);
        let mut sheet = GradeSheet::new(&small_catalog(), config);
        sheet.ingest(&Transcript::new("a", "b").with_course("MATH100", &["D", "00"]));

        assert_eq!(slots(&sheet, "MATH100"), vec!["D", "REG"]);
        assert_eq!(sheet.record("MATH100").unwrap().status, RegistrationStatus::CurrentlyRegistered);
        assert_eq!(self::sheet().normalize_raw("00"), AttemptSlot::Empty);
    }

    #[test]
    fn test_registered_convention_marks_blanks() {
        let config = PlannerConfig::default().with_pending(PendingConvention::Registered);
        let mut sheet = GradeSheet::new(&small_catalog(), config);
        sheet.ingest(&Transcript::new("a", "b").with_course("MATH100", &["F", ""]));

        let record = sheet.record("MATH100").unwrap();
        assert_eq!(record.status, RegistrationStatus::CurrentlyRegistered);
        assert_eq!(sheet.normalize_raw(" 00 "), AttemptSlot::Registered);
        assert!(sheet.aggregate().provisional);
        assert_eq!(sheet.aggregate().pending_courses, 1);
    }

    #[test]
    fn test_unmatched_fold_into_elective_in_order() {
        let mut sheet = sheet();
        let transcript = Transcript::new("a", "b")
            .with_course("HIST300", &["B", "A"])
            .with_course("MATH100", &["C"])
            .with_course("ART110", &["C+", "", "D", "A-", "B-"]);
        let report = sheet.ingest(&transcript);

        assert_eq!(report.folded, vec!["HIST300".to_string(), "ART110".to_string()]);
        assert_eq!(report.overflow, 1);
        assert_eq!(slots(&sheet, DEFAULT_ELECTIVE_CODE), vec!["B", "A", "C+", "D", "A-"]);
    }

    #[test]
    fn test_fold_appends_after_direct_elective_attempts() {
        let mut sheet = sheet();
        let transcript = Transcript::new("a", "b")
            .with_course("HIST300", &["B"])
            .with_course("elective", &["F"]);
        sheet.ingest(&transcript);

        assert_eq!(slots(&sheet, DEFAULT_ELECTIVE_CODE), vec!["F", "B"]);
    }

    #[test]
    fn test_lowercase_bucket_code_keeps_direct_attempts() {
        let mut sheet = sheet();
        let transcript: Transcript = serde_json::from_str(
            r#"{"student_name": "a", "student_id": "b", "courses": [
                {"code": "elective", "attempts": ["F"]},
                {"code": "HIST300", "attempts": ["B"]}
            ]}"#,
        )
        .unwrap();
        let report = sheet.ingest(&transcript);

        assert_eq!(report.matched, vec![DEFAULT_ELECTIVE_CODE.to_string()]);
        assert_eq!(slots(&sheet, DEFAULT_ELECTIVE_CODE), vec!["F", "B"]);
    }

    #[test]
    fn test_reingest_is_idempotent() {
        let mut sheet = sheet();
        let transcript = Transcript::new("a", "b").with_course("HIST300", &["B"]);
        sheet.ingest(&transcript);
        sheet.ingest(&transcript);

        assert_eq!(slots(&sheet, DEFAULT_ELECTIVE_CODE), vec!["B"]);
    }

    #[test]
    fn test_drop_policy() {
        let config = PlannerConfig::default().with_unmatched(UnmatchedPolicy::Drop);
        let mut sheet = GradeSheet::new(&small_catalog(), config);
        let report = sheet.ingest(&Transcript::new("a", "b").with_course("HIST300", &["B"]));

        assert_eq!(report.dropped, vec!["HIST300".to_string()]);
        assert!(sheet.record(DEFAULT_ELECTIVE_CODE).unwrap().attempts.is_empty());
    }

    #[test]
    fn test_fold_without_bucket_drops() {
        let config = PlannerConfig::default().with_unmatched(UnmatchedPolicy::FoldIntoElective {
            code: "NOPE".to_string(),
        });
        let mut sheet = GradeSheet::new(&small_catalog(), config);
        let report = sheet.ingest(&Transcript::new("a", "b").with_course("HIST300", &["B"]));

        assert_eq!(report.dropped, vec!["HIST300".to_string()]);
        assert!(report.folded.is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut sheet = sheet();
        sheet.ingest(&Transcript::new("a", "b").with_course("MATH100", &["A"]));
        sheet.reset();

        assert_eq!(sheet.aggregate().final_gpa, 0.0);
        assert_eq!(sheet.student_name(), "");
        assert!(sheet.records().iter().all(|r| r.attempts.is_empty()));
    }

    #[test]
    fn test_status_counts() {
        let mut sheet = sheet();
        sheet.ingest(&Transcript::new("a", "b").with_course("MATH100", &["F"]));
        let counts = sheet.status_counts();

        assert_eq!(counts[&StatusKind::FailedRetakeable], 1);
        assert_eq!(counts[&StatusKind::BlockedByPrerequisite], 1);
        assert_eq!(counts[&StatusKind::EligibleToRegister], 1);
        assert_eq!(counts[&StatusKind::Passed], 0);
        assert_eq!(counts.values().sum::<usize>(), sheet.len());
    }

    #[test]
    fn test_record_serializes_flat() {
        let sheet = sheet();
        let json = serde_json::to_value(sheet.record("MATH101").unwrap()).unwrap();

        assert_eq!(json["code"], "MATH101");
        assert_eq!(json["credit_hours"], 3);
        assert_eq!(json["attempts"].as_array().unwrap().len(), 5);
        assert_eq!(json["status"]["status"], "BlockedByPrerequisite");
        assert_eq!(json["status"]["prerequisite"], "MATH100");
    }
}
