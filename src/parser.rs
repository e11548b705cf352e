// 🏗️ Transcript Readers
// Turn an exported transcript file into per-course raw attempt lists.
//
// Readers only collect raw strings in file order. Normalization, the
// 5-attempt cap and catalog matching happen when the grade sheet ingests
// the transcript.

use crate::config::{CellRef, TranscriptLayout};
use crate::entities::normalize_code;
use crate::error::{PlannerError, PlannerResult};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Raw attempts of one course, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptCourse {
    pub code: String,
    pub attempts: Vec<String>,
}

/// Output of a reader: the student plus their courses in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub student_name: String,
    pub student_id: String,
    #[serde(default)]
    pub courses: Vec<TranscriptCourse>,
}

impl Transcript {
    pub fn new(student_name: &str, student_id: &str) -> Self {
        Transcript {
            student_name: student_name.trim().to_string(),
            student_id: student_id.trim().to_string(),
            courses: Vec::new(),
        }
    }

    /// Record one attempt; repeated codes accumulate in order
    pub fn add_attempt(&mut self, code: &str, raw: &str) {
        let code = normalize_code(code);
        match self.courses.iter_mut().find(|c| c.code == code) {
            Some(course) => course.attempts.push(raw.to_string()),
            None => self.courses.push(TranscriptCourse {
                code,
                attempts: vec![raw.to_string()],
            }),
        }
    }

    /// Append a course's attempts, merging with any entry for the same code
    pub fn merge_course(&mut self, code: &str, attempts: &[String]) {
        let code = normalize_code(code);
        match self.courses.iter_mut().find(|c| c.code == code) {
            Some(course) => course.attempts.extend_from_slice(attempts),
            None => self.courses.push(TranscriptCourse {
                code,
                attempts: attempts.to_vec(),
            }),
        }
    }

    /// Re-key courses by normalized code, merging duplicates in order
    pub fn normalized(self) -> Self {
        let mut transcript = Transcript::new(&self.student_name, &self.student_id);
        for course in &self.courses {
            transcript.merge_course(&course.code, &course.attempts);
        }
        transcript
    }

    /// Builder: add a whole course at once (may be empty)
    pub fn with_course(mut self, code: &str, attempts: &[&str]) -> Self {
        self.courses.push(TranscriptCourse {
            code: normalize_code(code),
            attempts: attempts.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    pub fn attempts_for(&self, code: &str) -> Option<&[String]> {
        let code = normalize_code(code);
        self.courses
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.attempts.as_slice())
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }
}

// ============================================================================
// READER TRAIT
// ============================================================================

/// TranscriptReader - one implementation per export format
pub trait TranscriptReader {
    /// Parse a file into a transcript
    fn read(&self, path: &Path) -> PlannerResult<Transcript>;

    /// Short format name for logs
    fn format(&self) -> &str;

    fn version(&self) -> &str {
        "1.0.0"
    }
}

/// Pick a reader from the file extension (`.json`, anything else is CSV)
pub fn reader_for(path: &Path, layout: &TranscriptLayout) -> Box<dyn TranscriptReader> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        Box::new(JsonTranscriptReader)
    } else {
        Box::new(CsvTranscriptReader::new(layout.clone()))
    }
}

// ============================================================================
// CSV READER
// ============================================================================

/// Registrar export: a header block, then one row per graded attempt.
///
/// ```text
/// row 0  | Academic Transcript |
/// row 1  | Name     | Jane Doe |
/// row 2  | ID       | 2021-0042 |
/// ...
/// row 5+ | CS101 | Intro to Programming | 3 | B+ |
/// ```
pub struct CsvTranscriptReader {
    layout: TranscriptLayout,
}

impl CsvTranscriptReader {
    pub fn new(layout: TranscriptLayout) -> Self {
        CsvTranscriptReader { layout }
    }

    /// Parse from any reader; `source` names it in errors
    pub fn read_from<R: Read>(&self, input: R, source: &Path) -> PlannerResult<Transcript> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let mut header: Vec<StringRecord> = Vec::with_capacity(self.layout.header_rows);
        let mut transcript: Option<Transcript> = None;
        let mut skipped = 0usize;

        for result in reader.records() {
            let record = result.map_err(|source_err| PlannerError::Csv {
                path: source.to_path_buf(),
                source: source_err,
            })?;

            if header.len() < self.layout.header_rows {
                header.push(record);
                continue;
            }

            let transcript = transcript.get_or_insert_with(|| self.student_from(&header));

            let code = record.get(self.layout.code_column).unwrap_or("").trim();
            if code.is_empty() {
                skipped += 1;
                continue;
            }
            let raw = record.get(self.layout.grade_column).unwrap_or("");
            transcript.add_attempt(code, raw);
        }

        if header.len() < self.layout.header_rows {
            return Err(PlannerError::TruncatedHeader {
                path: source.to_path_buf(),
                rows: header.len(),
                expected: self.layout.header_rows,
            });
        }

        let transcript = transcript.unwrap_or_else(|| self.student_from(&header));
        debug!(
            file = %source.display(),
            courses = transcript.course_count(),
            skipped_rows = skipped,
            "Transcript parsed"
        );
        Ok(transcript)
    }

    fn student_from(&self, header: &[StringRecord]) -> Transcript {
        Transcript::new(
            cell(header, self.layout.name_cell),
            cell(header, self.layout.id_cell),
        )
    }
}

fn cell(rows: &[StringRecord], at: CellRef) -> &str {
    rows.get(at.row)
        .and_then(|r| r.get(at.column))
        .unwrap_or("")
}

impl TranscriptReader for CsvTranscriptReader {
    fn read(&self, path: &Path) -> PlannerResult<Transcript> {
        let file = File::open(path).map_err(|source| PlannerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.read_from(BufReader::new(file), path)
    }

    fn format(&self) -> &str {
        "csv"
    }
}

// ============================================================================
// JSON READER
// ============================================================================

/// A serialized [`Transcript`], as produced by `report --json` tooling
pub struct JsonTranscriptReader;

impl TranscriptReader for JsonTranscriptReader {
    fn read(&self, path: &Path) -> PlannerResult<Transcript> {
        let file = File::open(path).map_err(|source| PlannerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let transcript: Transcript =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| PlannerError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(transcript.normalized())
    }

    fn format(&self) -> &str {
        "json"
    }
}

// ============================================================================
// TESTS
// ============================================================================
