// Entity Models
// The course catalog is the only entity: a fixed registry keyed by code.

pub mod course;

pub use course::{
    normalize_code, Course, CourseRegistry, DEFAULT_ELECTIVE_CODE, MAX_PREREQUISITES,
};
