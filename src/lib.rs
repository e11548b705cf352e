// GPA Planner - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod calculator;
pub mod config;
pub mod entities;
pub mod error;
pub mod grade_scale;
pub mod ledger;
pub mod parser;
pub mod reconciliation;
pub mod schedule;
pub mod sheet;
pub mod status;

// Re-export commonly used types
pub use calculator::{adjusted_load, subject_effort, CourseLoad, SessionAggregate};
pub use config::{CellRef, PendingConvention, PlannerConfig, TranscriptLayout, UnmatchedPolicy};
pub use entities::{Course, CourseRegistry, DEFAULT_ELECTIVE_CODE};
pub use error::{PlannerError, PlannerResult};
pub use ledger::{AttemptLedger, AttemptSlot, MAX_ATTEMPTS, REGISTERED_MARKER};
pub use parser::{
    reader_for, CsvTranscriptReader, JsonTranscriptReader, Transcript, TranscriptCourse,
    TranscriptReader,
};
pub use reconciliation::{slot_column, slot_index, EditDelta, EditReport, SkipReason, SkippedEdit};
pub use schedule::{parse_timeslots, MeetingSlot, Section, SectionListing, Timetable};
pub use sheet::{CourseRecord, GradeSheet, IngestReport};
pub use status::{RegistrationStatus, StatusKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
