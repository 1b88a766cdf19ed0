//! School timetable engine core.
//!
//! Models a school week (days × periods), classes with their pupil
//! divisions, teachers, rooms, and lesson blocks; places lessons into
//! timeslots with hard-conflict detection; and scores the board
//! against a weighted constraint catalogue.
//!
//! # Modules
//!
//! - **`models`**: immutable domain types — week grid, class
//!   divisions and atomic groups, rooms and room wishes, repository
//!   records, the derived [`Activity`](models::Activity)
//! - **`engine`**: the mutable side — occupancy tables, the
//!   placement API, placement persistence
//! - **`constraints`**: the constraint catalogue and the weighted
//!   evaluator
//! - **`diagnostics`**: structured problem reports; domain errors
//!   skip the offending entity instead of aborting
//!
//! # Usage
//!
//! Load a [`TimetableData`](models::TimetableData) snapshot, build an
//! [`Engine`], pin the fixed lessons, and drive placement manually or
//! from an outer search:
//!
//! ```
//! use timetable_core::models::{
//!     BlockRecord, ClassRecord, CourseRecord, LessonUnitRecord, RoomRecord, SubjectRecord,
//!     TeacherRecord, TimetableData,
//! };
//! use timetable_core::Engine;
//!
//! let mut data = TimetableData::new()
//!     .with_day("Mo", "Monday")
//!     .with_period("1", "1st period")
//!     .with_period("2", "2nd period")
//!     .with_class(ClassRecord::new("10A", "Class 10A").with_classroom("R1"))
//!     .with_teacher(TeacherRecord::new("MEi", "Meier"))
//!     .with_room(RoomRecord::new("R1", "Room 1"))
//!     .with_subject(SubjectRecord::new("Ma", "Mathematics"));
//! let block = data.add_block(BlockRecord::anonymous());
//! let data = data
//!     .with_course(CourseRecord::new("10A", "*", "Ma", "MEi", block).with_room_wish("$"))
//!     .with_unit(LessonUnitRecord::new(block, 1));
//!
//! let mut engine = Engine::build(&data);
//! engine.load_fixed_times();
//! engine.try_place(1, 1).unwrap();
//! engine.resolve_room_choices();
//! assert_eq!(engine.full_evaluate().penalty, 0);
//! ```

pub mod constraints;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod models;

pub use engine::Engine;
