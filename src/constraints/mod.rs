//! Constraint catalogue.
//!
//! Constraints are a closed sum type: each variant stores the
//! activities or participants it observes, and every constraint
//! instance carries a [`Weight`]. Hard constraints forbid any
//! breakage (infinite penalty); soft constraints cost
//! `10^weight` per breakage; disabled constraints are skipped.
//!
//! Evaluation lives in [`evaluate`]; penalty accumulation and
//! incremental re-scoring in [`evaluator`].

mod evaluate;
mod evaluator;

pub use evaluate::EvalContext;
pub use evaluator::{Breakage, Evaluation, Evaluator};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{Activity, ActivityId, AtomicId, TeacherId, Timeslot};

/// Penalty value signalling a broken hard constraint.
pub const INFINITE_PENALTY: u64 = u64::MAX;

/// Constraint weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weight {
    /// Any breakage forbids the configuration.
    Hard,
    /// Soft weight 1–10; each breakage costs `10^weight`.
    Soft(u8),
    /// Skipped by the evaluator.
    Disabled,
}

impl Weight {
    /// Penalty for a breakage count under this weight.
    pub fn penalty(self, breakages: u64) -> u64 {
        match self {
            Weight::Hard => {
                if breakages > 0 {
                    INFINITE_PENALTY
                } else {
                    0
                }
            }
            Weight::Soft(w) => breakages.saturating_mul(10u64.pow(u32::from(w))),
            Weight::Disabled => 0,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Weight::Disabled
    }
}

/// A resource whose weekly pattern a constraint observes: either a
/// teacher or one atomic pupil group. Both are scanned with the same
/// algorithms against the matching occupancy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Participant {
    Teacher(TeacherId),
    Group(AtomicId),
}

/// The closed set of constraint variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// The activity must be the first lesson of its day for every
    /// atomic group it occupies.
    StartsDay { activity: ActivityId },
    /// The activity must be the last lesson of its day for every
    /// atomic group it occupies.
    EndsDay { activity: ActivityId },
    /// All listed activities fall on distinct days.
    NotSameDay { activities: Vec<ActivityId> },
    /// At least `min_days` days between the two activities.
    MinDaysBetween {
        a: ActivityId,
        b: ActivityId,
        min_days: usize,
    },
    /// On a shared day, `earlier` must not start after `later`.
    NotAfter {
        earlier: ActivityId,
        later: ActivityId,
    },
    /// When on the same day, the gap between the two activities is at
    /// least `min_gap` periods.
    MinGap {
        a: ActivityId,
        b: ActivityId,
        min_gap: usize,
    },
    /// The activity starts in one of the given day-periods.
    PreferredStartingPeriods {
        activity: ActivityId,
        periods: BTreeSet<usize>,
    },
    /// All listed activities start at the same timeslot (the
    /// parallel-tag realisation).
    SameStartingTime { activities: Vec<ActivityId> },
    /// Gap limits per day and/or per week.
    MaxGaps {
        participant: Participant,
        daily: Option<u32>,
        weekly: Option<u32>,
    },
    /// On days with lessons, at least `n` of them.
    MinLessonsPerDay { participant: Participant, n: u32 },
    /// At most `n` lessons on any day.
    MaxLessonsPerDay { participant: Participant, n: u32 },
    /// At most `n` lessons in a row; an unavailable slot counts as a
    /// break.
    MaxConsecutiveLessons { participant: Participant, n: u32 },
    /// Lessons on at most `n` distinct days.
    MaxDaysPerWeek { participant: Participant, n: u32 },
    /// Every day, at least one candidate period is free or
    /// unavailable.
    LunchBreak {
        participant: Participant,
        periods: BTreeSet<usize>,
    },
    /// The participant must not teach/attend in the given timeslots.
    /// At hard weight this is applied structurally (the occupancy
    /// tables are pre-seeded) and never reaches the evaluator.
    Unavailable {
        participant: Participant,
        slots: BTreeSet<Timeslot>,
    },
}

impl ConstraintKind {
    /// Whether re-placing `activity` can change this constraint's
    /// score. Drives incremental re-evaluation. `arena` is the
    /// engine's activity arena (index = id - 1): day-position variants
    /// scan the group rows of the activity they observe, so any move
    /// within a shared atomic group can change their score.
    pub fn depends_on(&self, activity: &Activity, arena: &[Activity]) -> bool {
        match self {
            Self::StartsDay { activity: a } | Self::EndsDay { activity: a } => {
                *a == activity.id
                    || usize::try_from(*a - 1)
                        .ok()
                        .and_then(|i| arena.get(i))
                        .is_some_and(|observed| {
                            observed.atomics.iter().any(|g| activity.atomics.contains(g))
                        })
            }
            Self::PreferredStartingPeriods { activity: a, .. } => *a == activity.id,
            Self::NotSameDay { activities } | Self::SameStartingTime { activities } => {
                activities.contains(&activity.id)
            }
            Self::MinDaysBetween { a, b, .. }
            | Self::NotAfter {
                earlier: a,
                later: b,
            }
            | Self::MinGap { a, b, .. } => *a == activity.id || *b == activity.id,
            Self::MaxGaps { participant, .. }
            | Self::MinLessonsPerDay { participant, .. }
            | Self::MaxLessonsPerDay { participant, .. }
            | Self::MaxConsecutiveLessons { participant, .. }
            | Self::MaxDaysPerWeek { participant, .. }
            | Self::LunchBreak { participant, .. }
            | Self::Unavailable { participant, .. } => match participant {
                Participant::Teacher(t) => activity.teachers.contains(t),
                Participant::Group(g) => activity.atomics.contains(g),
            },
        }
    }

    /// Short label for breakage reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::StartsDay { .. } => "StartsDay",
            Self::EndsDay { .. } => "EndsDay",
            Self::NotSameDay { .. } => "NotSameDay",
            Self::MinDaysBetween { .. } => "MinDaysBetween",
            Self::NotAfter { .. } => "NotAfter",
            Self::MinGap { .. } => "MinGap",
            Self::PreferredStartingPeriods { .. } => "PreferredStartingPeriods",
            Self::SameStartingTime { .. } => "SameStartingTime",
            Self::MaxGaps { .. } => "MaxGaps",
            Self::MinLessonsPerDay { .. } => "MinLessonsPerDay",
            Self::MaxLessonsPerDay { .. } => "MaxLessonsPerDay",
            Self::MaxConsecutiveLessons { .. } => "MaxConsecutiveLessons",
            Self::MaxDaysPerWeek { .. } => "MaxDaysPerWeek",
            Self::LunchBreak { .. } => "LunchBreak",
            Self::Unavailable { .. } => "Unavailable",
        }
    }

    /// Gap limit per day only.
    pub fn max_gaps_per_day(participant: Participant, n: u32) -> Self {
        Self::MaxGaps {
            participant,
            daily: Some(n),
            weekly: None,
        }
    }

    /// Gap limit per week only.
    pub fn max_gaps_per_week(participant: Participant, n: u32) -> Self {
        Self::MaxGaps {
            participant,
            daily: None,
            weekly: Some(n),
        }
    }
}

/// A constraint instance: variant plus weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Position in the engine's catalogue.
    pub id: usize,
    pub weight: Weight,
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn new(id: usize, weight: Weight, kind: ConstraintKind) -> Self {
        Self { id, weight, kind }
    }
}
