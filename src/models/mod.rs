//! Timetable domain models.
//!
//! The immutable side of the engine: the week grid, class divisions
//! and atomic groups, rooms and room requirements, repository record
//! types, and the derived placeable activity. All mutable state lives
//! in [`crate::engine`].
//!
//! Entities are addressed by integer ids into arenas; id 0 is the
//! "none" sentinel throughout (no teacher, placeholder room,
//! unplaced timeslot).

pub mod activity;
pub mod groups;
pub mod records;
pub mod rooms;
pub mod week;

pub use activity::Activity;
pub use groups::{ClassGroups, Division};
pub use records::{
    BlockRecord, ClassRecord, ConstraintRecord, CourseRecord, LessonUnitRecord,
    ParallelTagRecord, PeriodRecord, RoomGroupRecord, RoomRecord, SubjectRecord, TeacherRecord,
    TimetableData,
};
pub use rooms::{Room, RoomModel, RoomWish, SimplifiedRooms};
pub use week::{Day, Period, WeekGrid};

/// A (day, period) pair encoded 1-based over the week; 0 = unplaced.
pub type Timeslot = usize;

/// 1-based activity id; 0 = none. Occupancy cells store these as
/// `i32`, with −1 marking structural unavailability.
pub type ActivityId = i32;

/// 1-based teacher id; 0 = the "no teacher" sentinel.
pub type TeacherId = usize;

/// 1-based global atomic-group id; 0 = sentinel.
pub type AtomicId = usize;

/// 1-based room id; 0 = the placeholder room.
pub type RoomId = usize;
