//! Error types for the timetable core.
//!
//! Recoverable conditions are ordinary `Result` values: placement
//! failures carry the blocking activities, division parsing reports
//! what was wrong with the division text. Domain errors found while
//! building the models are reported as diagnostics instead (the
//! offending entity is skipped), see [`crate::diagnostics`].

use std::collections::BTreeSet;

use thiserror::Error;

use crate::models::ActivityId;

/// Errors raised while parsing a class's division specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DivisionError {
    /// The text does not follow the `P1+P2/C=P1+P2;...` grammar.
    #[error("division syntax error: {0}")]
    Syntax(String),
    /// A group name appears more than once within the class.
    #[error("duplicate group name '{0}'")]
    Duplicate(String),
    /// A compound group references a non-primary, covers fewer than
    /// two primaries, or covers all primaries of its division.
    #[error("invalid compound group '{0}'")]
    CompoundInvalid(String),
    /// A division declares fewer than two primary groups.
    #[error("division '{0}' needs at least two primary groups")]
    TooFew(String),
}

/// Outcomes of a rejected placement operation.
///
/// A failed placement never mutates the occupancy store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// One or more resources of the activity are taken at the
    /// requested timeslot. The set names the occupying activities;
    /// it is empty when only structurally unavailable slots block.
    #[error("blocked by activities {0:?}")]
    Blocked(BTreeSet<ActivityId>),
    /// The activity's last period would fall on the next day.
    #[error("lesson would cross a day boundary")]
    DayBoundaryCrossed,
    /// The activity already occupies a timeslot.
    #[error("activity is already placed")]
    AlreadyPlaced,
    /// The activity occupies no timeslot.
    #[error("activity is not placed")]
    NotPlaced,
}

/// A lesson block demands the same room twice at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("block requires the same room twice concurrently")]
pub struct RoomConflict;
