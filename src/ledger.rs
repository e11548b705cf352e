// 📒 Attempt Ledger - five chronological attempt slots per course
//
// Slot 1 is the earliest attempt. Filled slots are always packed to the
// left so "most recent" is simply the last filled slot.

use crate::grade_scale;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of attempt slots tracked per course.
pub const MAX_ATTEMPTS: usize = 5;

/// Canonical text of the "currently registered, grade pending" marker.
pub const REGISTERED_MARKER: &str = "REG";

// ============================================================================
// ATTEMPT SLOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttemptSlot {
    /// Never attempted
    #[default]
    Empty,

    /// A letter grade, stored upper-cased. Need not be on the grade scale.
    Grade(String),

    /// Enrolled, outcome pending
    Registered,
}

impl AttemptSlot {
    /// Normalize a raw cell value: trim, upper-case, empty → `Empty`.
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim().to_uppercase();
        match value.as_str() {
            "" => AttemptSlot::Empty,
            REGISTERED_MARKER | "REGISTERED" => AttemptSlot::Registered,
            _ => AttemptSlot::Grade(value),
        }
    }

    pub fn grade(letter: &str) -> Self {
        AttemptSlot::parse(letter)
    }

    pub fn is_filled(&self) -> bool {
        !matches!(self, AttemptSlot::Empty)
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, AttemptSlot::Registered)
    }

    /// Grade points; the registered marker and empty slots are worth 0.
    pub fn points(&self) -> f64 {
        match self {
            AttemptSlot::Grade(letter) => grade_scale::points(letter),
            AttemptSlot::Empty | AttemptSlot::Registered => 0.0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AttemptSlot::Empty => "",
            AttemptSlot::Grade(letter) => letter,
            AttemptSlot::Registered => REGISTERED_MARKER,
        }
    }
}

impl fmt::Display for AttemptSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AttemptSlot {
    fn from(raw: String) -> Self {
        AttemptSlot::parse(&raw)
    }
}

impl From<AttemptSlot> for String {
    fn from(slot: AttemptSlot) -> Self {
        slot.as_str().to_string()
    }
}

// ============================================================================
// ATTEMPT LEDGER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptLedger {
    slots: [AttemptSlot; MAX_ATTEMPTS],
}

impl AttemptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from attempts in chronological order.
    ///
    /// Empty values are skipped so the result has no gaps; anything past
    /// the fifth filled attempt is ignored.
    pub fn from_attempts<I>(attempts: I) -> Self
    where
        I: IntoIterator<Item = AttemptSlot>,
    {
        let mut ledger = Self::new();
        for slot in attempts.into_iter().filter(AttemptSlot::is_filled) {
            if !ledger.push(slot) {
                break;
            }
        }
        ledger
    }

    pub fn slots(&self) -> &[AttemptSlot; MAX_ATTEMPTS] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&AttemptSlot> {
        self.slots.get(index)
    }

    /// Overwrite one slot. Returns true when the stored value changed.
    ///
    /// Writing can leave a gap; callers restore the invariant with
    /// [`AttemptLedger::compact`].
    pub fn set(&mut self, index: usize, slot: AttemptSlot) -> bool {
        match self.slots.get_mut(index) {
            Some(current) if *current != slot => {
                *current = slot;
                true
            }
            _ => false,
        }
    }

    /// Append into the first empty slot. False when all slots are taken.
    pub fn push(&mut self, slot: AttemptSlot) -> bool {
        match self.slots.iter_mut().find(|s| !s.is_filled()) {
            Some(empty) => {
                *empty = slot;
                true
            }
            None => false,
        }
    }

    /// Shift filled slots left, keeping their order.
    pub fn compact(&mut self) {
        let filled: Vec<AttemptSlot> = self.filled().cloned().collect();
        *self = Self::from_attempts(filled);
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }

    pub fn filled(&self) -> impl Iterator<Item = &AttemptSlot> {
        self.slots.iter().filter(|s| s.is_filled())
    }

    pub fn filled_count(&self) -> usize {
        self.filled().count()
    }

    pub fn is_empty(&self) -> bool {
        self.filled_count() == 0
    }

    pub fn free_slots(&self) -> usize {
        MAX_ATTEMPTS - self.filled_count()
    }

    /// The latest attempt, scanning from slot 5 back to slot 1.
    pub fn most_recent(&self) -> Option<&AttemptSlot> {
        self.slots.iter().rev().find(|s| s.is_filled())
    }

    /// Points of the latest attempt, `None` when never attempted.
    pub fn most_recent_points(&self) -> Option<f64> {
        self.most_recent().map(AttemptSlot::points)
    }

    pub fn has_pending_registration(&self) -> bool {
        self.most_recent().is_some_and(AttemptSlot::is_registered)
    }

    /// True when no empty slot precedes a filled one.
    pub fn is_packed(&self) -> bool {
        let filled = self.filled_count();
        self.slots[..filled].iter().all(AttemptSlot::is_filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(values: &[&str]) -> AttemptLedger {
        AttemptLedger::from_attempts(values.iter().map(|v| AttemptSlot::parse(v)))
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(AttemptSlot::parse("  b+ "), AttemptSlot::Grade("B+".to_string()));
        assert_eq!(AttemptSlot::parse(""), AttemptSlot::Empty);
        assert_eq!(AttemptSlot::parse("   "), AttemptSlot::Empty);
        assert_eq!(AttemptSlot::parse("reg"), AttemptSlot::Registered);
        assert_eq!(AttemptSlot::parse("Registered"), AttemptSlot::Registered);
    }

    #[test]
    fn test_unknown_letter_still_filled() {
        let slot = AttemptSlot::parse("W");
        assert!(slot.is_filled());
        assert_eq!(slot.points(), 0.0);
    }

    #[test]
    fn test_from_attempts_packs_and_truncates() {
        let l = ledger(&["F", "", "D", "C", "B", "A", "A"]);
        assert_eq!(l.filled_count(), 5);
        assert!(l.is_packed());
        assert_eq!(l.get(1), Some(&AttemptSlot::grade("D")));
        assert_eq!(l.most_recent(), Some(&AttemptSlot::grade("A")));
    }

    #[test]
    fn test_most_recent_points() {
        assert_eq!(ledger(&[]).most_recent_points(), None);
        assert_eq!(ledger(&["F", "C"]).most_recent_points(), Some(2.0));
        assert_eq!(ledger(&["A", "REG"]).most_recent_points(), Some(0.0));
        assert!(ledger(&["A", "REG"]).has_pending_registration());
        assert!(!ledger(&["REG", "A"]).has_pending_registration());
    }

    #[test]
    fn test_set_reports_change() {
        let mut l = ledger(&["F"]);
        assert!(!l.set(0, AttemptSlot::grade("f")));
        assert!(l.set(0, AttemptSlot::grade("D")));
        assert!(!l.set(MAX_ATTEMPTS, AttemptSlot::grade("A")));
    }

    #[test]
    fn test_compact_closes_gaps() {
        let mut l = ledger(&["F", "D", "C"]);
        l.set(1, AttemptSlot::Empty);
        assert!(!l.is_packed());
        l.compact();
        assert!(l.is_packed());
        assert_eq!(l.slots()[..2], [AttemptSlot::grade("F"), AttemptSlot::grade("C")]);
    }

    #[test]
    fn test_push_until_full() {
        let mut l = AttemptLedger::new();
        for _ in 0..MAX_ATTEMPTS {
            assert!(l.push(AttemptSlot::grade("F")));
        }
        assert!(!l.push(AttemptSlot::grade("A")));
        assert_eq!(l.free_slots(), 0);
    }

    #[test]
    fn test_serializes_as_strings() {
        let l = ledger(&["F", "REG"]);
        let json = serde_json::to_string(&l).unwrap();
        assert_eq!(json, r#"["F","REG","","",""]"#);
        let back: AttemptLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, l);
    }
}
