//! Breakage counting for each constraint variant.
//!
//! Everything reads the occupancy tables; nothing here mutates. An
//! unplaced activity contributes no breakages — penalties speak only
//! about what is actually on the board. Participant scans treat a
//! cell as a lesson iff it holds a positive activity id; [`FREE`] and
//! [`BLOCKED`] are both non-lessons.

use crate::constraints::{ConstraintKind, Participant};
use crate::engine::{OccupancyStore, FREE};
use crate::models::{Activity, ActivityId, Timeslot, WeekGrid};

/// Borrowed view of everything evaluation reads.
pub struct EvalContext<'a> {
    pub grid: &'a WeekGrid,
    pub store: &'a OccupancyStore,
    /// All activities, index = id − 1.
    pub activities: &'a [Activity],
}

impl EvalContext<'_> {
    fn activity(&self, id: ActivityId) -> &Activity {
        &self.activities[id as usize - 1]
    }

    /// Start timeslot of an activity; 0 = unplaced.
    fn start(&self, id: ActivityId) -> Timeslot {
        self.store.state(id).timeslot
    }

    fn cell(&self, participant: Participant, timeslot: Timeslot) -> i32 {
        match participant {
            Participant::Teacher(t) => self.store.teacher_at(timeslot, t),
            Participant::Group(g) => self.store.group_at(timeslot, g),
        }
    }
}

impl ConstraintKind {
    /// Counts this constraint's breakages against the current board.
    pub fn breakages(&self, ctx: &EvalContext) -> u64 {
        match self {
            Self::StartsDay { activity } => starts_day(ctx, *activity),
            Self::EndsDay { activity } => ends_day(ctx, *activity),
            Self::NotSameDay { activities } => not_same_day(ctx, activities),
            Self::MinDaysBetween { a, b, min_days } => min_days_between(ctx, *a, *b, *min_days),
            Self::NotAfter { earlier, later } => not_after(ctx, *earlier, *later),
            Self::MinGap { a, b, min_gap: gap } => min_gap(ctx, *a, *b, *gap),
            Self::PreferredStartingPeriods { activity, periods } => {
                let start = ctx.start(*activity);
                if start != 0 && !periods.contains(&ctx.grid.decompose(start).1) {
                    1
                } else {
                    0
                }
            }
            Self::SameStartingTime { activities } => same_starting_time(ctx, activities),
            Self::MaxGaps {
                participant,
                daily,
                weekly,
            } => max_gaps(ctx, *participant, *daily, *weekly),
            Self::MinLessonsPerDay { participant, n } => {
                per_day_lessons(ctx, *participant, |count| count > 0 && count < *n)
            }
            Self::MaxLessonsPerDay { participant, n } => {
                per_day_lessons(ctx, *participant, |count| count > *n)
            }
            Self::MaxConsecutiveLessons { participant, n } => {
                max_consecutive(ctx, *participant, *n)
            }
            Self::MaxDaysPerWeek { participant, n } => {
                let days = (0..ctx.grid.day_count())
                    .filter(|&day| day_has_lesson(ctx, *participant, day))
                    .count() as u32;
                if days > *n {
                    1
                } else {
                    0
                }
            }
            Self::LunchBreak {
                participant,
                periods,
            } => lunch_break(ctx, *participant, periods),
            Self::Unavailable { participant, slots } => slots
                .iter()
                .filter(|&&t| ctx.cell(*participant, t) > 0)
                .count() as u64,
        }
    }
}

/// One breakage per atomic group with an earlier lesson that day.
fn starts_day(ctx: &EvalContext, id: ActivityId) -> u64 {
    let start = ctx.start(id);
    if start == 0 {
        return 0;
    }
    let activity = ctx.activity(id);
    let day_start = ctx.grid.day_start(start);
    activity
        .atomics
        .iter()
        .filter(|&&g| (day_start..start).any(|t| ctx.store.group_at(t, g) > 0))
        .count() as u64
}

/// One breakage per atomic group with a later lesson that day.
fn ends_day(ctx: &EvalContext, id: ActivityId) -> u64 {
    let start = ctx.start(id);
    if start == 0 {
        return 0;
    }
    let activity = ctx.activity(id);
    let day_end = ctx.grid.day_start(start) + ctx.grid.periods_per_day();
    activity
        .atomics
        .iter()
        .filter(|&&g| (start + activity.length..day_end).any(|t| ctx.store.group_at(t, g) > 0))
        .count() as u64
}

/// One breakage per placed pair sharing a day.
fn not_same_day(ctx: &EvalContext, activities: &[ActivityId]) -> u64 {
    let days: Vec<usize> = activities
        .iter()
        .map(|&id| ctx.start(id))
        .filter(|&t| t != 0)
        .map(|t| ctx.grid.decompose(t).0)
        .collect();
    let mut breakages = 0;
    for i in 0..days.len() {
        for j in i + 1..days.len() {
            if days[i] == days[j] {
                breakages += 1;
            }
        }
    }
    breakages
}

fn min_days_between(ctx: &EvalContext, a: ActivityId, b: ActivityId, min_days: usize) -> u64 {
    let (ta, tb) = (ctx.start(a), ctx.start(b));
    if ta == 0 || tb == 0 {
        return 0;
    }
    let da = ctx.grid.decompose(ta).0;
    let db = ctx.grid.decompose(tb).0;
    u64::from(da.abs_diff(db) < min_days)
}

fn not_after(ctx: &EvalContext, earlier: ActivityId, later: ActivityId) -> u64 {
    let (te, tl) = (ctx.start(earlier), ctx.start(later));
    if te == 0 || tl == 0 || !ctx.grid.same_day(te, tl) {
        return 0;
    }
    u64::from(te > tl)
}

fn min_gap(ctx: &EvalContext, a: ActivityId, b: ActivityId, min_gap: usize) -> u64 {
    let (ta, tb) = (ctx.start(a), ctx.start(b));
    if ta == 0 || tb == 0 || !ctx.grid.same_day(ta, tb) {
        return 0;
    }
    // Order by start, then measure first-end to second-start.
    let (first, second) = if ta <= tb { (a, b) } else { (b, a) };
    let end = ctx.start(first) + ctx.activity(first).length;
    let gap = ctx.start(second) as i64 - end as i64;
    u64::from(gap < min_gap as i64)
}

/// Every placed member must share the first placed member's start.
fn same_starting_time(ctx: &EvalContext, activities: &[ActivityId]) -> u64 {
    let mut anchor = 0;
    let mut breakages = 0;
    for &id in activities {
        let start = ctx.start(id);
        if start == 0 {
            continue;
        }
        if anchor == 0 {
            anchor = start;
        } else if start != anchor {
            breakages += 1;
        }
    }
    breakages
}

/// Gap accounting: a run of `n` free periods strictly between two
/// lessons of the same day costs `n + 1`. Leading and trailing free
/// periods cost nothing.
fn day_gaps(ctx: &EvalContext, participant: Participant, day: usize) -> u32 {
    let mut gaps = 0;
    // −1 until the first lesson of the day is seen.
    let mut pending: i64 = -1;
    for period in 0..ctx.grid.periods_per_day() {
        let t = ctx.grid.timeslot(day, period);
        if ctx.cell(participant, t) > 0 {
            if pending > 0 {
                gaps += pending as u32 + 1;
            }
            pending = 0;
        } else if pending >= 0 {
            pending += 1;
        }
    }
    gaps
}

fn max_gaps(
    ctx: &EvalContext,
    participant: Participant,
    daily: Option<u32>,
    weekly: Option<u32>,
) -> u64 {
    let mut breakages = 0;
    let mut week_total = 0;
    for day in 0..ctx.grid.day_count() {
        let gaps = day_gaps(ctx, participant, day);
        week_total += gaps;
        if matches!(daily, Some(limit) if gaps > limit) {
            breakages += 1;
        }
    }
    if matches!(weekly, Some(limit) if week_total > limit) {
        breakages += 1;
    }
    breakages
}

/// One breakage per day whose lesson count fails `violated`.
fn per_day_lessons(
    ctx: &EvalContext,
    participant: Participant,
    violated: impl Fn(u32) -> bool,
) -> u64 {
    (0..ctx.grid.day_count())
        .filter(|&day| {
            let count = (0..ctx.grid.periods_per_day())
                .filter(|&p| ctx.cell(participant, ctx.grid.timeslot(day, p)) > 0)
                .count() as u32;
            violated(count)
        })
        .count() as u64
}

/// One breakage per run of more than `n` consecutive lessons. A free
/// or blocked period ends a run.
fn max_consecutive(ctx: &EvalContext, participant: Participant, n: u32) -> u64 {
    let mut breakages = 0;
    for day in 0..ctx.grid.day_count() {
        let mut run = 0;
        for period in 0..ctx.grid.periods_per_day() {
            let t = ctx.grid.timeslot(day, period);
            if ctx.cell(participant, t) > 0 {
                run += 1;
                if run == n + 1 {
                    breakages += 1;
                }
            } else {
                run = 0;
            }
        }
    }
    breakages
}

fn day_has_lesson(ctx: &EvalContext, participant: Participant, day: usize) -> bool {
    (0..ctx.grid.periods_per_day())
        .any(|p| ctx.cell(participant, ctx.grid.timeslot(day, p)) > 0)
}

/// One breakage per day where every candidate period holds a lesson.
/// A [`FREE`] or blocked candidate both count as an eating
/// opportunity.
fn lunch_break(
    ctx: &EvalContext,
    participant: Participant,
    periods: &std::collections::BTreeSet<usize>,
) -> u64 {
    if periods.is_empty() {
        return 0;
    }
    (0..ctx.grid.day_count())
        .filter(|&day| {
            periods
                .iter()
                .all(|&p| ctx.cell(participant, ctx.grid.timeslot(day, p)) > FREE)
        })
        .count() as u64
}
