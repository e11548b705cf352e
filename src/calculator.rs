// 🧮 Load & Effort Calculator
//
// Per course:
//   adjusted_load  = credit × (1 + (attempts - 2))   for 2+ attempts
//   subject_effort = Σ credit × points(attempt i)    for attempts after the first
//
// Session:
//   gpa = Σ effort / Σ load   (0 when Σ load = 0)

use crate::ledger::AttemptLedger;
use serde::{Deserialize, Serialize};

/// Derived per-course figures.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CourseLoad {
    pub adjusted_load: f64,
    pub subject_effort: f64,
}

/// Adjusted load of a course.
///
/// One or two attempts both weigh a single credit multiple; each attempt
/// beyond the second adds another one.
pub fn adjusted_load(ledger: &AttemptLedger, credit_hours: u32) -> f64 {
    let credit = f64::from(credit_hours);
    match ledger.filled_count() {
        0 => 0.0,
        1 => credit,
        n => credit * (1 + (n - 2)) as f64,
    }
}

/// Subject effort of a course.
///
/// A single attempt counts in full. Once a retake exists the first attempt
/// is dropped and every later attempt counts.
pub fn subject_effort(ledger: &AttemptLedger, credit_hours: u32) -> f64 {
    let credit = f64::from(credit_hours);
    let filled: Vec<_> = ledger.filled().collect();
    match filled.as_slice() {
        [] => 0.0,
        [only] => credit * only.points(),
        [_, retakes @ ..] => retakes.iter().map(|slot| credit * slot.points()).sum(),
    }
}

pub fn course_load(ledger: &AttemptLedger, credit_hours: u32) -> CourseLoad {
    CourseLoad {
        adjusted_load: adjusted_load(ledger, credit_hours),
        subject_effort: subject_effort(ledger, credit_hours),
    }
}

// ============================================================================
// SESSION AGGREGATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionAggregate {
    pub total_subject_effort: f64,
    pub total_adjusted_load: f64,
    pub final_gpa: f64,

    /// Courses whose latest attempt is still pending
    pub pending_courses: usize,

    /// True when pending courses hold the GPA at a 0-point placeholder
    pub provisional: bool,
}

impl SessionAggregate {
    /// Fold per-course figures into totals.
    ///
    /// `pending` is the number of courses currently registered.
    pub fn from_loads<I>(loads: I, pending: usize) -> Self
    where
        I: IntoIterator<Item = CourseLoad>,
    {
        let (effort, load) = loads
            .into_iter()
            .fold((0.0, 0.0), |(effort, load), l| {
                (effort + l.subject_effort, load + l.adjusted_load)
            });

        SessionAggregate {
            total_subject_effort: effort,
            total_adjusted_load: load,
            final_gpa: gpa(effort, load),
            pending_courses: pending,
            provisional: pending > 0,
        }
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "GPA {:.2} (effort {:.2} / load {:.2})",
            self.final_gpa, self.total_subject_effort, self.total_adjusted_load
        );
        if self.provisional {
            summary.push_str(&format!(
                " - provisional, {} course(s) still pending",
                self.pending_courses
            ));
        }
        summary
    }
}

pub fn gpa(total_effort: f64, total_load: f64) -> f64 {
    if total_load == 0.0 {
        0.0
    } else {
        total_effort / total_load
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade_scale::points;
    use crate::ledger::AttemptSlot;

    fn ledger(values: &[&str]) -> AttemptLedger {
        AttemptLedger::from_attempts(values.iter().map(|v| AttemptSlot::parse(v)))
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_no_attempts() {
        let l = ledger(&[]);
        assert_eq!(course_load(&l, 3), CourseLoad::default());
    }

    #[test]
    fn test_single_attempt() {
        let l = ledger(&["B+"]);
        assert_eq!(adjusted_load(&l, 3), 3.0);
        assert!(approx(subject_effort(&l, 3), 3.0 * 3.33));
    }

    #[test]
    fn test_two_attempts_same_load_as_one() {
        let l = ledger(&["F", "B"]);
        assert_eq!(adjusted_load(&l, 3), 3.0);
        assert_eq!(subject_effort(&l, 3), 9.0);
    }

    #[test]
    fn test_three_attempts_drop_first() {
        let l = ledger(&["F", "D", "C"]);
        assert_eq!(adjusted_load(&l, 4), 8.0);
        assert!(approx(subject_effort(&l, 4), 4.0 * (points("D") + points("C"))));
    }

    #[test]
    fn test_load_multiplier_per_attempt_count() {
        let expected = [0.0, 3.0, 3.0, 6.0, 9.0, 12.0];
        for (n, want) in expected.iter().enumerate() {
            let l = ledger(&vec!["F"; n]);
            assert_eq!(adjusted_load(&l, 3), *want, "{} attempts", n);
        }
    }

    #[test]
    fn test_registered_and_unknown_count_as_filled() {
        let l = ledger(&["C", "REG"]);
        assert_eq!(adjusted_load(&l, 3), 3.0);
        assert_eq!(subject_effort(&l, 3), 0.0);

        let l = ledger(&["W"]);
        assert_eq!(adjusted_load(&l, 3), 3.0);
        assert_eq!(subject_effort(&l, 3), 0.0);
    }

    #[test]
    fn test_aggregate() {
        let loads = vec![
            course_load(&ledger(&["C"]), 3),
            course_load(&ledger(&["A"]), 3),
            course_load(&ledger(&[]), 3),
        ];
        let agg = SessionAggregate::from_loads(loads, 0);

        assert_eq!(agg.total_adjusted_load, 6.0);
        assert_eq!(agg.total_subject_effort, 18.0);
        assert_eq!(agg.final_gpa, 3.0);
        assert!(!agg.provisional);
    }

    #[test]
    fn test_empty_aggregate_is_zero() {
        let agg = SessionAggregate::from_loads(Vec::new(), 0);
        assert_eq!(agg.final_gpa, 0.0);
        assert_eq!(gpa(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_provisional_flag() {
        let agg = SessionAggregate::from_loads(vec![course_load(&ledger(&["REG"]), 3)], 1);
        assert!(agg.provisional);
        assert!(agg.summary().contains("provisional"));
    }
}
