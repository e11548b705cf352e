// 🚦 Registration Status Resolver
//
// Evaluated from scratch for every course on every recompute:
//   1. latest attempt is REG           → CurrentlyRegistered
//   2. latest grade ≥ 1.00             → Passed
//   3. a direct prerequisite not passed → BlockedByPrerequisite(first one)
//   4. attempted but not passed        → FailedRetakeable
//   5. otherwise                       → EligibleToRegister
//
// Prerequisites are looked up one level deep only. Co-requisites are
// never consulted.

use crate::entities::Course;
use crate::grade_scale::PASSING_POINTS;
use crate::ledger::AttemptLedger;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "prerequisite")]
pub enum RegistrationStatus {
    /// Enrolled now; any GPA figure involving it is provisional
    CurrentlyRegistered,
    Passed,
    BlockedByPrerequisite(String),
    FailedRetakeable,
    #[default]
    EligibleToRegister,
}

/// Payload-free status key, used for grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    CurrentlyRegistered,
    Passed,
    BlockedByPrerequisite,
    FailedRetakeable,
    EligibleToRegister,
}

impl StatusKind {
    pub const ALL: [StatusKind; 5] = [
        StatusKind::Passed,
        StatusKind::CurrentlyRegistered,
        StatusKind::EligibleToRegister,
        StatusKind::FailedRetakeable,
        StatusKind::BlockedByPrerequisite,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatusKind::CurrentlyRegistered => "Currently registered",
            StatusKind::Passed => "Passed",
            StatusKind::BlockedByPrerequisite => "Blocked by prerequisite",
            StatusKind::FailedRetakeable => "Failed, can retake",
            StatusKind::EligibleToRegister => "Eligible to register",
        }
    }
}

impl RegistrationStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            RegistrationStatus::CurrentlyRegistered => StatusKind::CurrentlyRegistered,
            RegistrationStatus::Passed => StatusKind::Passed,
            RegistrationStatus::BlockedByPrerequisite(_) => StatusKind::BlockedByPrerequisite,
            RegistrationStatus::FailedRetakeable => StatusKind::FailedRetakeable,
            RegistrationStatus::EligibleToRegister => StatusKind::EligibleToRegister,
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, RegistrationStatus::CurrentlyRegistered)
    }

    pub fn can_register(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::EligibleToRegister | RegistrationStatus::FailedRetakeable
        )
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationStatus::BlockedByPrerequisite(code) => write!(f, "Blocked by {}", code),
            other => f.write_str(other.kind().label()),
        }
    }
}

/// Resolve a course's status.
///
/// `lookup` returns the attempt ledger of another course by code, or `None`
/// when that course is not in the table (such prerequisites are skipped).
pub fn resolve<'a, F>(course: &Course, ledger: &AttemptLedger, lookup: F) -> RegistrationStatus
where
    F: Fn(&str) -> Option<&'a AttemptLedger>,
{
    if ledger.has_pending_registration() {
        return RegistrationStatus::CurrentlyRegistered;
    }

    if ledger
        .most_recent_points()
        .is_some_and(|p| p >= PASSING_POINTS)
    {
        return RegistrationStatus::Passed;
    }

    for prereq in course.prerequisite_codes() {
        let Some(prereq_ledger) = lookup(prereq) else {
            continue;
        };
        let passed = prereq_ledger
            .most_recent_points()
            .is_some_and(|p| p >= PASSING_POINTS);
        if !passed {
            return RegistrationStatus::BlockedByPrerequisite(prereq.to_string());
        }
    }

    if ledger.is_empty() {
        RegistrationStatus::EligibleToRegister
    } else {
        RegistrationStatus::FailedRetakeable
    }
}
