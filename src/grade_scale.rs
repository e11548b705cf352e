// 🎓 Grade Scale - letter grade → grade points
// Fixed table, compared upper-cased. Unknown letters are worth nothing
// but still count as an attempt.

/// Minimum points for an attempt to count as passed.
pub const PASSING_POINTS: f64 = 1.00;

/// Every letter the scale recognizes, best first.
pub const KNOWN_GRADES: [&str; 12] = [
    "A", "A-", "B+", "B", "B-", "C+", "C", "C-", "D+", "D", "F", "I",
];

/// Grade points for a letter grade.
///
/// Case-insensitive and whitespace-tolerant. Empty and unrecognized
/// values resolve to 0.00.
pub fn points(letter: &str) -> f64 {
    lookup(&letter.trim().to_uppercase()).unwrap_or(0.0)
}

/// Whether the letter is on the scale (the empty string is not).
pub fn is_known(letter: &str) -> bool {
    lookup(&letter.trim().to_uppercase()).is_some()
}

fn lookup(upper: &str) -> Option<f64> {
    let value = match upper {
        "A" => 4.00,
        "A-" => 3.67,
        "B+" => 3.33,
        "B" => 3.00,
        "B-" => 2.67,
        "C+" => 2.33,
        "C" => 2.00,
        "C-" => 1.67,
        "D+" => 1.33,
        "D" => 1.00,
        "F" | "I" => 0.00,
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_values() {
        assert_eq!(points("A"), 4.00);
        assert_eq!(points("A-"), 3.67);
        assert_eq!(points("B+"), 3.33);
        assert_eq!(points("B"), 3.00);
        assert_eq!(points("B-"), 2.67);
        assert_eq!(points("C+"), 2.33);
        assert_eq!(points("C"), 2.00);
        assert_eq!(points("C-"), 1.67);
        assert_eq!(points("D+"), 1.33);
        assert_eq!(points("D"), 1.00);
        assert_eq!(points("F"), 0.00);
        assert_eq!(points("I"), 0.00);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(points("b+"), 3.33);
        assert_eq!(points(" a- "), 3.67);
    }

    #[test]
    fn test_unknown_and_empty_are_zero() {
        assert_eq!(points(""), 0.0);
        assert_eq!(points("W"), 0.0);
        assert_eq!(points("A+"), 0.0);
        assert!(!is_known("W"));
        assert!(!is_known(""));
        assert!(is_known("i"));
    }

    #[test]
    fn test_known_grades_all_resolve() {
        assert!(KNOWN_GRADES.iter().all(|g| is_known(g)));
        assert!(points("D") >= PASSING_POINTS);
        assert!(points("F") < PASSING_POINTS);
    }
}
