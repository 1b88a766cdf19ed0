//! Week grid: day and period tables plus timeslot arithmetic.
//!
//! A timeslot is a 1-based index over the whole week,
//! `day * periods_per_day + period + 1`, with 0 reserved for
//! "unplaced". Lessons never cross a day boundary, so placement
//! combines [`WeekGrid::decompose`] with a bounds check against
//! [`WeekGrid::periods_per_day`].
//!
//! The boundary text form is `<day_tag>.<period_tag>`, e.g. `Mo.3`.

use serde::{Deserialize, Serialize};

use crate::models::Timeslot;

/// A school day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Day {
    /// Short tag used in timeslot text forms (e.g. "Mo").
    pub tag: String,
    /// Full display name (e.g. "Monday").
    pub name: String,
}

impl Day {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
        }
    }
}

/// A teaching period within a day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    /// Short tag used in timeslot text forms (e.g. "3").
    pub tag: String,
    /// Full display name (e.g. "3rd period").
    pub name: String,
    /// Clock time the period starts at, free-form (e.g. "09:45").
    pub start_time: Option<String>,
    /// Clock time the period ends at, free-form.
    pub end_time: Option<String>,
}

impl Period {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
            start_time: None,
            end_time: None,
        }
    }

    /// Sets the clock times.
    pub fn with_times(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_time = Some(start.into());
        self.end_time = Some(end.into());
        self
    }
}

/// Day/period indexing for one school week.
///
/// All days share the same period table. Bounds violations in the
/// arithmetic methods are programming errors and trip debug
/// assertions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekGrid {
    days: Vec<Day>,
    periods: Vec<Period>,
}

impl WeekGrid {
    pub fn new(days: Vec<Day>, periods: Vec<Period>) -> Self {
        debug_assert!(!days.is_empty() && !periods.is_empty());
        Self { days, periods }
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn periods_per_day(&self) -> usize {
        self.periods.len()
    }

    /// Number of timeslots in the week. Valid timeslots are
    /// `1..=week_length()`.
    pub fn week_length(&self) -> usize {
        self.days.len() * self.periods.len()
    }

    pub fn day(&self, index: usize) -> &Day {
        &self.days[index]
    }

    pub fn period(&self, index: usize) -> &Period {
        &self.periods[index]
    }

    /// Encodes a (day, period) pair as a timeslot.
    pub fn timeslot(&self, day: usize, period: usize) -> Timeslot {
        debug_assert!(day < self.days.len() && period < self.periods.len());
        day * self.periods.len() + period + 1
    }

    /// Decodes a timeslot into its (day, period) pair.
    pub fn decompose(&self, timeslot: Timeslot) -> (usize, usize) {
        debug_assert!(timeslot >= 1 && timeslot <= self.week_length());
        let zero_based = timeslot - 1;
        (
            zero_based / self.periods.len(),
            zero_based % self.periods.len(),
        )
    }

    /// Whether two timeslots fall on the same day.
    pub fn same_day(&self, a: Timeslot, b: Timeslot) -> bool {
        self.decompose(a).0 == self.decompose(b).0
    }

    /// First timeslot of the day that `timeslot` falls on.
    pub fn day_start(&self, timeslot: Timeslot) -> Timeslot {
        let (day, _) = self.decompose(timeslot);
        self.timeslot(day, 0)
    }

    /// Text form of a timeslot, `Mo.3`; `-` for unplaced (0).
    pub fn format_timeslot(&self, timeslot: Timeslot) -> String {
        if timeslot == 0 {
            return "-".to_string();
        }
        let (day, period) = self.decompose(timeslot);
        format!("{}.{}", self.days[day].tag, self.periods[period].tag)
    }

    /// Parses the `Mo.3` text form. Returns `None` for unknown tags
    /// or malformed input; `-` parses as 0 (unplaced).
    pub fn parse_timeslot(&self, text: &str) -> Option<Timeslot> {
        let text = text.trim();
        if text == "-" {
            return Some(0);
        }
        let (day_tag, period_tag) = text.split_once('.')?;
        let day = self.days.iter().position(|d| d.tag == day_tag)?;
        let period = self.periods.iter().position(|p| p.tag == period_tag)?;
        Some(self.timeslot(day, period))
    }
}
