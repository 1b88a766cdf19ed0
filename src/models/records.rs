//! Repository record types and the engine input container.
//!
//! The core never talks to a store itself: the embedder loads its
//! repository into a [`TimetableData`] value and hands it to
//! [`Engine::build`](crate::engine::Engine::build). Cross-references
//! between records use short tags (the repository's text keys);
//! integer ids are assigned during the build.

use serde::{Deserialize, Serialize};

use crate::constraints::Weight;

/// A class with its division specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassRecord {
    pub tag: String,
    pub name: String,
    /// Tag of the class's own classroom, resolved by the `$` wish token.
    pub classroom: Option<String>,
    /// Division text form, see [`crate::models::groups`]. Empty =
    /// undivided.
    pub divisions: String,
}

impl ClassRecord {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
            classroom: None,
            divisions: String::new(),
        }
    }

    pub fn with_classroom(mut self, room_tag: impl Into<String>) -> Self {
        self.classroom = Some(room_tag.into());
        self
    }

    pub fn with_divisions(mut self, text: impl Into<String>) -> Self {
        self.divisions = text.into();
        self
    }
}

/// A teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherRecord {
    pub tag: String,
    pub name: String,
    pub sortname: String,
}

impl TeacherRecord {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            tag: tag.into(),
            sortname: name.clone(),
            name,
        }
    }

    pub fn with_sortname(mut self, sortname: impl Into<String>) -> Self {
        self.sortname = sortname.into();
        self
    }
}

/// A room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRecord {
    pub tag: String,
    pub name: String,
}

impl RoomRecord {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
        }
    }
}

/// A named list of rooms usable as one wish token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomGroupRecord {
    pub name: String,
    /// Member room tags, in preference order.
    pub rooms: Vec<String>,
}

impl RoomGroupRecord {
    pub fn new(name: impl Into<String>, rooms: Vec<String>) -> Self {
        Self {
            name: name.into(),
            rooms,
        }
    }
}

/// A subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub tag: String,
    pub name: String,
}

impl SubjectRecord {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
        }
    }
}

/// A lesson block. Blocks are referenced by courses and lesson units
/// via their index + 1 in [`TimetableData::blocks`]. A simple course
/// owns an anonymous block (empty subject and tag) shared by nobody.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Subject tag identifying a named block; empty for anonymous.
    pub subject: String,
    /// Discriminating tag of a named block; may be empty.
    pub tag: String,
}

impl BlockRecord {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn named(subject: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            tag: tag.into(),
        }
    }
}

/// A course: one class-group taught one subject by one teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Class tag; empty for the sentinel "no class".
    pub class: String,
    /// `*` or a group of that class.
    pub group: String,
    pub subject: String,
    /// Teacher tag; empty for the sentinel "no teacher".
    pub teacher: String,
    /// Room wish text, see [`crate::models::rooms`]. Empty = none.
    pub room_wish: String,
    /// 1-based block id into [`TimetableData::blocks`].
    pub block: usize,
}

impl CourseRecord {
    pub fn new(
        class: impl Into<String>,
        group: impl Into<String>,
        subject: impl Into<String>,
        teacher: impl Into<String>,
        block: usize,
    ) -> Self {
        Self {
            class: class.into(),
            group: group.into(),
            subject: subject.into(),
            teacher: teacher.into(),
            room_wish: String::new(),
            block,
        }
    }

    pub fn with_room_wish(mut self, wish: impl Into<String>) -> Self {
        self.room_wish = wish.into();
        self
    }
}

/// One lesson of a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonUnitRecord {
    /// 1-based block id into [`TimetableData::blocks`].
    pub block: usize,
    /// Length in consecutive periods (>= 1).
    pub length: usize,
    /// Timeslot text form (`Mo.3`) the unit is pinned to, if any.
    pub fixed_time: Option<String>,
    /// Previously persisted timeslot text, if any.
    pub placed_time: Option<String>,
    /// Previously persisted room tags, `|`-separated.
    pub placed_rooms: String,
    /// Parallel-tag name, if the unit is linked.
    pub parallel: Option<String>,
}

impl LessonUnitRecord {
    pub fn new(block: usize, length: usize) -> Self {
        Self {
            block,
            length,
            fixed_time: None,
            placed_time: None,
            placed_rooms: String::new(),
            parallel: None,
        }
    }

    pub fn with_fixed_time(mut self, time: impl Into<String>) -> Self {
        self.fixed_time = Some(time.into());
        self
    }

    pub fn with_placement(mut self, time: impl Into<String>, rooms: impl Into<String>) -> Self {
        self.placed_time = Some(time.into());
        self.placed_rooms = rooms.into();
        self
    }

    pub fn with_parallel(mut self, tag: impl Into<String>) -> Self {
        self.parallel = Some(tag.into());
        self
    }
}

/// A parallel-link tag: all lesson units carrying it should start at
/// the same timeslot, enforced at the given weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelTagRecord {
    pub tag: String,
    /// Free-form category for the embedder's bookkeeping.
    pub category: String,
    pub weight: Weight,
}

impl ParallelTagRecord {
    pub fn new(tag: impl Into<String>, weight: Weight) -> Self {
        Self {
            tag: tag.into(),
            category: String::new(),
            weight,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// A textual participant-constraint record.
///
/// `target` selects the participant: `T:<teacher_tag>` or
/// `G:<class_tag>:<group>` (group targets expand to one constraint
/// per atomic group). Argument layout depends on `kind`:
///
/// | kind | args |
/// |---|---|
/// | `MAXGAPSPERDAY`, `MAXGAPSPERWEEK`, `MINLESSONSPERDAY`, `MAXLESSONSPERDAY`, `MAXCONSECUTIVELESSONS`, `MAXDAYSPERWEEK` | one number |
/// | `LUNCHBREAK` | period tags |
/// | `UNAVAILABLE` | timeslot texts (`Mo.3`) |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintRecord {
    pub kind: String,
    pub weight: Weight,
    pub target: String,
    pub args: Vec<String>,
}

impl ConstraintRecord {
    pub fn new(kind: impl Into<String>, weight: Weight, target: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            weight,
            target: target.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// Everything the engine needs, in repository form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimetableData {
    /// Week days in order; tags used by timeslot texts.
    pub days: Vec<(String, String)>,
    /// Periods in order; (tag, name, start, end).
    pub periods: Vec<PeriodRecord>,
    pub classes: Vec<ClassRecord>,
    pub teachers: Vec<TeacherRecord>,
    pub rooms: Vec<RoomRecord>,
    pub room_groups: Vec<RoomGroupRecord>,
    pub subjects: Vec<SubjectRecord>,
    pub blocks: Vec<BlockRecord>,
    pub courses: Vec<CourseRecord>,
    pub units: Vec<LessonUnitRecord>,
    pub parallel_tags: Vec<ParallelTagRecord>,
    pub constraints: Vec<ConstraintRecord>,
}

/// A period row of the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub tag: String,
    pub name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl PeriodRecord {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
            start_time: None,
            end_time: None,
        }
    }
}

impl TimetableData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day(mut self, tag: impl Into<String>, name: impl Into<String>) -> Self {
        self.days.push((tag.into(), name.into()));
        self
    }

    pub fn with_period(mut self, tag: impl Into<String>, name: impl Into<String>) -> Self {
        self.periods.push(PeriodRecord::new(tag, name));
        self
    }

    pub fn with_class(mut self, class: ClassRecord) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_teacher(mut self, teacher: TeacherRecord) -> Self {
        self.teachers.push(teacher);
        self
    }

    pub fn with_room(mut self, room: RoomRecord) -> Self {
        self.rooms.push(room);
        self
    }

    pub fn with_room_group(mut self, group: RoomGroupRecord) -> Self {
        self.room_groups.push(group);
        self
    }

    pub fn with_subject(mut self, subject: SubjectRecord) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Appends a block and returns its 1-based id.
    pub fn add_block(&mut self, block: BlockRecord) -> usize {
        self.blocks.push(block);
        self.blocks.len()
    }

    pub fn with_course(mut self, course: CourseRecord) -> Self {
        self.courses.push(course);
        self
    }

    pub fn with_unit(mut self, unit: LessonUnitRecord) -> Self {
        self.units.push(unit);
        self
    }

    pub fn with_parallel_tag(mut self, tag: ParallelTagRecord) -> Self {
        self.parallel_tags.push(tag);
        self
    }

    pub fn with_constraint(mut self, constraint: ConstraintRecord) -> Self {
        self.constraints.push(constraint);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let mut data = TimetableData::new()
            .with_day("Mo", "Monday")
            .with_period("1", "1st")
            .with_class(
                ClassRecord::new("10A", "Class 10A")
                    .with_classroom("R1")
                    .with_divisions("A+B"),
            )
            .with_teacher(TeacherRecord::new("MEi", "Meier").with_sortname("Meier, A"))
            .with_room(RoomRecord::new("R1", "Room 1"))
            .with_subject(SubjectRecord::new("Ma", "Mathematics"));

        let block = data.add_block(BlockRecord::anonymous());
        let data = data
            .with_course(CourseRecord::new("10A", "*", "Ma", "MEi", block))
            .with_unit(LessonUnitRecord::new(block, 2).with_fixed_time("Mo.1"));

        assert_eq!(data.blocks.len(), 1);
        assert_eq!(data.courses[0].block, 1);
        assert_eq!(data.units[0].fixed_time.as_deref(), Some("Mo.1"));
        assert_eq!(data.classes[0].classroom.as_deref(), Some("R1"));
    }

    #[test]
    fn test_constraint_record() {
        let rec = ConstraintRecord::new("MAXGAPSPERDAY", Weight::Soft(5), "T:MEi").with_arg("2");
        assert_eq!(rec.args, vec!["2"]);
        assert_eq!(rec.target, "T:MEi");
    }

    #[test]
    fn test_records_serialize() {
        let rec = ParallelTagRecord::new("P1", Weight::Hard).with_category("sport");
        let json = serde_json::to_string(&rec).unwrap();
        let back: ParallelTagRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tag, "P1");
        assert_eq!(back.weight, Weight::Hard);
    }
}
