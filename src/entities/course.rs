// 📚 Course Entity - the static catalog
//
// "Course code is IDENTITY, everything else is a VALUE fixed for the session"
//
// Problem solved:
// - Transcript rows only carry a code; credits and prerequisites live here
// - Codes like " cs101" and "CS101" resolve to the same course
// - Courses missing from the transcript still get a (blank) row

use crate::error::{PlannerError, PlannerResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// A course may declare at most this many prerequisites.
pub const MAX_PREREQUISITES: usize = 3;

/// Code of the bucket course that absorbs unmatched transcript courses.
pub const DEFAULT_ELECTIVE_CODE: &str = "ELECTIVE";

/// Normalize a course code for lookups.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

// ============================================================================
// COURSE ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Unique catalog code (e.g. "CS201")
    pub code: String,

    /// Display name
    pub name: String,

    /// Weight used for both load and effort
    pub credit_hours: u32,

    /// PREREQ_1..PREREQ_3, in declaration order
    #[serde(default)]
    pub prerequisites: Vec<String>,

    /// Stored for display only; registration status ignores it
    #[serde(default)]
    pub corequisite: Option<String>,
}

impl Course {
    pub fn new(code: &str, name: &str, credit_hours: u32) -> Self {
        Course {
            code: normalize_code(code),
            name: name.to_string(),
            credit_hours,
            prerequisites: Vec::new(),
            corequisite: None,
        }
    }

    /// Builder: declare the next prerequisite (blank codes are ignored)
    pub fn with_prerequisite(mut self, code: &str) -> Self {
        let code = normalize_code(code);
        if !code.is_empty() {
            self.prerequisites.push(code);
        }
        self
    }

    /// Builder: declare the co-requisite
    pub fn with_corequisite(mut self, code: &str) -> Self {
        let code = normalize_code(code);
        self.corequisite = (!code.is_empty()).then_some(code);
        self
    }

    /// Non-empty prerequisite codes in declaration order.
    pub fn prerequisite_codes(&self) -> impl Iterator<Item = &str> {
        self.prerequisites
            .iter()
            .map(String::as_str)
            .filter(|code| !code.trim().is_empty())
    }

    fn validate(&self) -> PlannerResult<()> {
        if self.code.is_empty() {
            return Err(PlannerError::InvalidCatalog(format!(
                "course '{}' has an empty code",
                self.name
            )));
        }
        if self.credit_hours == 0 {
            return Err(PlannerError::InvalidCatalog(format!(
                "{} must carry at least one credit hour",
                self.code
            )));
        }
        if self.prerequisites.len() > MAX_PREREQUISITES {
            return Err(PlannerError::InvalidCatalog(format!(
                "{} declares {} prerequisites (max {})",
                self.code,
                self.prerequisites.len(),
                MAX_PREREQUISITES
            )));
        }
        Ok(())
    }
}

// ============================================================================
// COURSE REGISTRY
// ============================================================================

/// The catalog: every known course, in declaration order.
#[derive(Debug, Clone)]
pub struct CourseRegistry {
    courses: Vec<Course>,
    index: HashMap<String, usize>,
}

impl CourseRegistry {
    /// Registry preloaded with the default program catalog
    pub fn new() -> Self {
        let mut registry = CourseRegistry::empty();
        registry.register_default_courses();
        registry
    }

    pub fn empty() -> Self {
        CourseRegistry {
            courses: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Load a catalog from a JSON array of courses
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| PlannerError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let courses: Vec<Course> =
            serde_json::from_str(&content).map_err(|source| PlannerError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let registry = CourseRegistry::from_courses(courses)?;
        info!(
            file = %path.display(),
            courses = registry.count(),
            "Catalog loaded"
        );
        Ok(registry)
    }

    /// Build a registry, rejecting invalid or duplicate courses
    pub fn from_courses(courses: Vec<Course>) -> PlannerResult<Self> {
        let mut registry = CourseRegistry::empty();
        for course in courses {
            registry.try_register(course)?;
        }
        Ok(registry)
    }

    /// Register a course; codes and references are normalized first
    pub fn try_register(&mut self, mut course: Course) -> PlannerResult<()> {
        course.code = normalize_code(&course.code);
        course.prerequisites = course
            .prerequisites
            .iter()
            .map(|code| normalize_code(code))
            .filter(|code| !code.is_empty())
            .collect();
        course.corequisite = course
            .corequisite
            .as_deref()
            .map(normalize_code)
            .filter(|code| !code.is_empty());

        course.validate()?;

        if self.index.contains_key(&course.code) {
            return Err(PlannerError::InvalidCatalog(format!(
                "duplicate course code {}",
                course.code
            )));
        }

        self.index.insert(course.code.clone(), self.courses.len());
        self.courses.push(course);
        Ok(())
    }

    fn register_default_courses(&mut self) {
        let defaults = vec![
            // Mathematics
            Course::new("MATH100", "Pre-Calculus", 3),
            Course::new("MATH101", "Calculus I", 3).with_prerequisite("MATH100"),
            Course::new("MATH102", "Calculus II", 3).with_prerequisite("MATH101"),
            Course::new("MATH201", "Linear Algebra", 3).with_prerequisite("MATH101"),
            Course::new("MATH202", "Differential Equations", 3)
                .with_prerequisite("MATH102")
                .with_prerequisite("MATH201"),
            // Physics
            Course::new("PHYS101", "Physics I", 3)
                .with_prerequisite("MATH101")
                .with_corequisite("PHYS101L"),
            Course::new("PHYS101L", "Physics I Lab", 1).with_corequisite("PHYS101"),
            Course::new("PHYS102", "Physics II", 3)
                .with_prerequisite("PHYS101")
                .with_prerequisite("MATH102")
                .with_corequisite("PHYS102L"),
            Course::new("PHYS102L", "Physics II Lab", 1)
                .with_prerequisite("PHYS101L")
                .with_corequisite("PHYS102"),
            // Language
            Course::new("ENGL101", "English Composition", 3),
            Course::new("ENGL102", "Technical Writing", 3).with_prerequisite("ENGL101"),
            // Computing
            Course::new("CS101", "Introduction to Programming", 3),
            Course::new("CS102", "Object-Oriented Programming", 3).with_prerequisite("CS101"),
            Course::new("CS201", "Data Structures", 3)
                .with_prerequisite("CS102")
                .with_prerequisite("MATH101"),
            Course::new("CS202", "Algorithms", 3)
                .with_prerequisite("CS201")
                .with_prerequisite("MATH201"),
            Course::new("CS210", "Discrete Mathematics", 3).with_prerequisite("MATH101"),
            Course::new("CS301", "Operating Systems", 3)
                .with_prerequisite("CS201")
                .with_prerequisite("CE210"),
            Course::new("CS302", "Databases", 3).with_prerequisite("CS201"),
            // Computer engineering
            Course::new("CE210", "Digital Logic", 3)
                .with_prerequisite("CS101")
                .with_corequisite("CE210L"),
            Course::new("CE210L", "Digital Logic Lab", 1).with_corequisite("CE210"),
            Course::new("CE310", "Computer Architecture", 3)
                .with_prerequisite("CE210")
                .with_prerequisite("CS201"),
            Course::new("CE320", "Embedded Systems", 3)
                .with_prerequisite("CE310")
                .with_prerequisite("PHYS102"),
            Course::new("CE490", "Graduation Project", 3)
                .with_prerequisite("CS301")
                .with_prerequisite("CE320")
                .with_prerequisite("ENGL102"),
            // Catch-all for transcript courses outside the plan
            Course::new(DEFAULT_ELECTIVE_CODE, "Free Elective", 3),
        ];

        for course in defaults {
            let code = course.code.clone();
            if let Err(err) = self.try_register(course) {
                warn!(course = %code, error = %err, "Skipping invalid built-in course");
            }
        }
    }

    /// Find a course by code (case/whitespace-insensitive)
    pub fn find(&self, code: &str) -> Option<&Course> {
        self.position(code).map(|i| &self.courses[i])
    }

    /// Declaration-order position of a course
    pub fn position(&self, code: &str) -> Option<usize> {
        self.index.get(&normalize_code(code)).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.position(code).is_some()
    }

    pub fn all_courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn count(&self) -> usize {
        self.courses.len()
    }

    pub fn total_credit_hours(&self) -> u32 {
        self.courses.iter().map(|c| c.credit_hours).sum()
    }

    /// Courses that list `code` as a direct prerequisite
    pub fn dependents_of(&self, code: &str) -> Vec<&Course> {
        let code = normalize_code(code);
        self.courses
            .iter()
            .filter(|c| c.prerequisite_codes().any(|p| p == code))
            .collect()
    }
}

impl Default for CourseRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_course_builder_normalizes() {
        let course = Course::new(" math101 ", "Calculus I", 3)
            .with_prerequisite("math100")
            .with_prerequisite("  ")
            .with_corequisite("");

        assert_eq!(course.code, "MATH101");
        assert_eq!(course.prerequisites, vec!["MATH100".to_string()]);
        assert_eq!(course.corequisite, None);
    }

    #[test]
    fn test_default_entries_reregister_cleanly() {
        let defaults = CourseRegistry::new().all_courses().to_vec();
        let rebuilt = CourseRegistry::from_courses(defaults).unwrap();
        assert_eq!(rebuilt.count(), 24);
    }

    #[test]
    fn test_default_catalog() {
        let registry = CourseRegistry::new();

        assert_eq!(registry.count(), 24);
        assert!(registry.contains(DEFAULT_ELECTIVE_CODE));
        assert!(registry.all_courses().iter().all(|c| c.prerequisites.len() <= MAX_PREREQUISITES));

        let phys = registry.find("phys101").unwrap();
        assert_eq!(phys.corequisite.as_deref(), Some("PHYS101L"));
    }

    #[test]
    fn test_default_catalog_references_resolve() {
        let registry = CourseRegistry::new();
        for course in registry.all_courses() {
            for prereq in course.prerequisite_codes() {
                assert!(registry.contains(prereq), "{} -> {}", course.code, prereq);
            }
        }
    }

    #[test]
    fn test_rejects_duplicates_and_bad_courses() {
        let dup = CourseRegistry::from_courses(vec![
            Course::new("CS101", "A", 3),
            Course::new("cs101", "B", 3),
        ]);
        assert!(matches!(dup, Err(PlannerError::InvalidCatalog(_))));

        let zero = CourseRegistry::from_courses(vec![Course::new("CS101", "A", 0)]);
        assert!(zero.is_err());

        let mut many = Course::new("X", "X", 3);
        many.prerequisites = vec!["A".into(), "B".into(), "C".into(), "D".into()];
        assert!(CourseRegistry::from_courses(vec![many]).is_err());
    }

    #[test]
    fn test_dependents_of() {
        let registry = CourseRegistry::new();
        let codes: Vec<&str> = registry
            .dependents_of("CS201")
            .iter()
            .map(|c| c.code.as_str())
            .collect();

        assert_eq!(codes, vec!["CS202", "CS301", "CS302", "CE310"]);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"code": "math100", "name": "Pre-Calculus", "credit_hours": 3}},
                {{"code": "MATH101", "name": "Calculus I", "credit_hours": 3,
                  "prerequisites": ["math100"], "corequisite": null}}
            ]"#
        )
        .unwrap();

        let registry = CourseRegistry::from_file(file.path()).unwrap();
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.position("MATH101"), Some(1));
        assert_eq!(registry.find("math101").unwrap().prerequisites, vec!["MATH100".to_string()]);
    }
}
