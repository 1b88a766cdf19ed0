//! The timetable engine.
//!
//! [`Engine`] owns everything mutable: the occupancy store, the
//! per-activity placement state, the constraint catalogue and the
//! diagnostic log. The immutable models (week grid, class groups,
//! rooms, activities) are built once from a
//! [`TimetableData`] snapshot of the repository.
//!
//! One engine instance is single-threaded and non-reentrant; separate
//! instances share nothing mutable, so parallel explorations each
//! build (or clone) their own engine.
//!
//! Entities that fail validation are skipped with a diagnostic, and
//! everything depending on them is skipped with a referenced-cause
//! diagnostic; building never aborts.

pub mod occupancy;
mod placement;
mod state;

pub use occupancy::{ActivityState, OccupancyStore, BLOCKED, FREE};
pub use state::PlacementRecord;

use std::collections::{BTreeSet, HashMap};

use crate::constraints::{
    Constraint, ConstraintKind, EvalContext, Evaluation, Evaluator, Participant, Weight,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog};
use crate::models::rooms::WishError;
use crate::models::{
    Activity, ActivityId, AtomicId, ClassGroups, ConstraintRecord, Day, Period, RoomId, RoomModel,
    TeacherId, TimetableData, Timeslot, WeekGrid,
};

/// A teacher arena entry.
#[derive(Debug, Clone)]
pub struct TeacherInfo {
    pub tag: String,
    pub name: String,
    pub sortname: String,
}

/// A class arena entry.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub tag: String,
    pub name: String,
    /// The class's own classroom; 0 = none.
    pub classroom: RoomId,
    pub groups: ClassGroups,
    /// Global id of this class's first atomic group.
    pub atomic_base: AtomicId,
}

/// Per-block aggregate collected from its courses during build.
#[derive(Debug, Clone, Default)]
struct BlockAgg {
    teachers: BTreeSet<TeacherId>,
    atomics: BTreeSet<AtomicId>,
    group_names: Vec<String>,
    subject: String,
    wish_lists: Vec<Vec<RoomId>>,
    /// Room the `$` token resolved to, once seen.
    classroom_subst: Option<RoomId>,
    conflicted: bool,
}

/// The timetable engine core.
#[derive(Debug, Clone)]
pub struct Engine {
    grid: WeekGrid,
    teachers: Vec<TeacherInfo>,
    teacher_ids: HashMap<String, TeacherId>,
    rooms: RoomModel,
    classes: Vec<ClassInfo>,
    class_ids: HashMap<String, usize>,
    /// Global atomic display names, index = atomic id (0 unused).
    atomic_names: Vec<String>,
    activities: Vec<Activity>,
    /// Lesson-unit index (0-based) → activity id; 0 = unit skipped.
    unit_activity: Vec<ActivityId>,
    /// Teacher id → ids of the activities they teach.
    teacher_activities: Vec<Vec<ActivityId>>,
    /// Atomic-group id → ids of the activities it attends.
    atomic_activities: Vec<Vec<ActivityId>>,
    constraints: Vec<Constraint>,
    store: OccupancyStore,
    evaluator: Evaluator,
    diagnostics: DiagnosticLog,
}

impl Engine {
    /// Builds an engine from repository records.
    ///
    /// Never fails: domain errors become diagnostics and the
    /// offending entities are skipped.
    pub fn build(data: &TimetableData) -> Self {
        let grid = WeekGrid::new(
            data.days
                .iter()
                .map(|(tag, name)| Day::new(tag.clone(), name.clone()))
                .collect(),
            data.periods
                .iter()
                .map(|p| {
                    let mut period = Period::new(p.tag.clone(), p.name.clone());
                    period.start_time = p.start_time.clone();
                    period.end_time = p.end_time.clone();
                    period
                })
                .collect(),
        );

        let mut diagnostics = DiagnosticLog::new();

        // Teacher arena; index 0 is the "no teacher" sentinel.
        let mut teachers = vec![TeacherInfo {
            tag: String::new(),
            name: String::new(),
            sortname: String::new(),
        }];
        let mut teacher_ids = HashMap::new();
        for rec in &data.teachers {
            teacher_ids.insert(rec.tag.clone(), teachers.len());
            teachers.push(TeacherInfo {
                tag: rec.tag.clone(),
                name: rec.name.clone(),
                sortname: rec.sortname.clone(),
            });
        }

        // Room arena and groups.
        let mut rooms = RoomModel::new();
        for rec in &data.rooms {
            rooms.add_room(rec.tag.clone(), rec.name.clone());
        }
        for rec in &data.room_groups {
            let mut members = Vec::new();
            for tag in &rec.rooms {
                match rooms.lookup(tag) {
                    Some(id) => members.push(id),
                    None => diagnostics.report(Diagnostic::error(
                        DiagnosticKind::InvalidRoomId,
                        format!("room group '{}' references unknown room '{tag}'", rec.name),
                    )),
                }
            }
            rooms.add_group(rec.name.clone(), members);
        }

        // Class arena with parsed divisions and global atomic ids.
        let mut classes: Vec<ClassInfo> = Vec::new();
        let mut class_ids = HashMap::new();
        let mut atomic_names = vec![String::new()];
        for rec in &data.classes {
            let groups = match ClassGroups::parse(&rec.divisions) {
                Ok(groups) => groups,
                Err(e) => {
                    diagnostics.report(Diagnostic::error(
                        DiagnosticKind::DivisionSyntax,
                        format!("class '{}': {e}", rec.tag),
                    ));
                    continue;
                }
            };
            let classroom = rec
                .classroom
                .as_deref()
                .and_then(|tag| {
                    let id = rooms.lookup(tag);
                    if id.is_none() {
                        diagnostics.report(Diagnostic::error(
                            DiagnosticKind::InvalidRoomId,
                            format!("class '{}' names unknown classroom '{tag}'", rec.tag),
                        ));
                    }
                    id
                })
                .unwrap_or(0);

            let atomic_base = atomic_names.len();
            for i in 0..groups.atomic_count() {
                let atom = groups.atomic_name(i);
                atomic_names.push(if atom == "*" {
                    rec.tag.clone()
                } else {
                    format!("{}.{atom}", rec.tag)
                });
            }
            class_ids.insert(rec.tag.clone(), classes.len());
            classes.push(ClassInfo {
                tag: rec.tag.clone(),
                name: rec.name.clone(),
                classroom,
                groups,
                atomic_base,
            });
        }

        let subjects: HashMap<&str, &str> = data
            .subjects
            .iter()
            .map(|s| (s.tag.as_str(), s.name.as_str()))
            .collect();

        // Fold courses into their blocks.
        let mut blocks: Vec<BlockAgg> = vec![BlockAgg::default(); data.blocks.len() + 1];
        for (course_index, course) in data.courses.iter().enumerate() {
            if course.block == 0 || course.block > data.blocks.len() {
                diagnostics.report(Diagnostic::error(
                    DiagnosticKind::SkippedEntity,
                    format!("course #{course_index} references unknown block {}", course.block),
                ));
                continue;
            }

            let teacher = if course.teacher.is_empty() {
                0
            } else {
                match teacher_ids.get(course.teacher.as_str()) {
                    Some(&id) => id,
                    None => {
                        diagnostics.report(Diagnostic::error(
                            DiagnosticKind::SkippedEntity,
                            format!(
                                "course #{course_index} references unknown teacher '{}'",
                                course.teacher
                            ),
                        ));
                        continue;
                    }
                }
            };

            let mut atomics: BTreeSet<AtomicId> = BTreeSet::new();
            let mut group_name = None;
            let mut classroom = None;
            if !course.class.is_empty() {
                let Some(&class_index) = class_ids.get(course.class.as_str()) else {
                    diagnostics.report(Diagnostic::error(
                        DiagnosticKind::SkippedEntity,
                        format!(
                            "course #{course_index} references unknown class '{}'",
                            course.class
                        ),
                    ));
                    continue;
                };
                let class = &classes[class_index];
                let Some(atoms) = class.groups.atomic_indices(&course.group) else {
                    diagnostics.report(Diagnostic::error(
                        DiagnosticKind::SkippedEntity,
                        format!(
                            "course #{course_index} references unknown group '{}.{}'",
                            course.class, course.group
                        ),
                    ));
                    continue;
                };
                atomics.extend(atoms.iter().map(|&a| class.atomic_base + a));
                group_name = Some(if course.group == "*" {
                    class.tag.clone()
                } else {
                    format!("{}.{}", class.tag, course.group)
                });
                if class.classroom != 0 {
                    classroom = Some(class.classroom);
                }
            }

            if !subjects.contains_key(course.subject.as_str()) {
                diagnostics.report(Diagnostic::warning(
                    DiagnosticKind::SkippedEntity,
                    format!(
                        "course #{course_index} names unknown subject '{}'",
                        course.subject
                    ),
                ));
            }

            let agg = &mut blocks[course.block];
            agg.teachers.insert(teacher);
            agg.teachers.remove(&0);
            agg.atomics.extend(atomics);
            if let Some(name) = group_name {
                if !agg.group_names.contains(&name) {
                    agg.group_names.push(name);
                }
            }
            if agg.subject.is_empty() {
                let block_rec = &data.blocks[course.block - 1];
                agg.subject = if block_rec.subject.is_empty() {
                    course.subject.clone()
                } else {
                    block_rec.subject.clone()
                };
            }

            if !course.room_wish.is_empty() {
                match rooms.parse_wish(&course.room_wish, classroom) {
                    Ok(wish) => {
                        if course.room_wish.contains('$') {
                            // Two classes substituting different
                            // classrooms cannot share one block.
                            let subst = classroom.unwrap_or(0);
                            match agg.classroom_subst {
                                Some(prev) if prev != subst => {
                                    agg.conflicted = true;
                                    diagnostics.report(Diagnostic::error(
                                        DiagnosticKind::RoomConflictInBlock,
                                        format!(
                                            "block {} substitutes '$' with different classrooms",
                                            course.block
                                        ),
                                    ));
                                }
                                _ => agg.classroom_subst = Some(subst),
                            }
                        }
                        if wish.flexible {
                            diagnostics.report(Diagnostic::warning(
                                DiagnosticKind::FlexibleRoomChoice,
                                format!(
                                    "course #{course_index} wish '{}' requests an extra room",
                                    course.room_wish
                                ),
                            ));
                            agg.wish_lists.push(rooms.all_room_ids());
                        }
                        if !wish.choices.is_empty() {
                            agg.wish_lists.push(wish.choices);
                        }
                    }
                    Err(e @ (WishError::UnknownRoom(_) | WishError::NoClassroom)) => {
                        diagnostics.report(Diagnostic::error(
                            DiagnosticKind::InvalidRoomId,
                            format!("course #{course_index} wish '{}': {e}", course.room_wish),
                        ));
                    }
                }
            }
        }

        // Simplify each block's room requirement.
        let mut block_rooms: Vec<Option<crate::models::SimplifiedRooms>> =
            Vec::with_capacity(blocks.len());
        for (block_id, agg) in blocks.iter().enumerate() {
            if block_id == 0 {
                block_rooms.push(None);
                continue;
            }
            if agg.conflicted {
                block_rooms.push(None);
                continue;
            }
            match crate::models::rooms::simplify_room_lists(&agg.wish_lists) {
                Ok(simplified) => block_rooms.push(Some(simplified)),
                Err(_) => {
                    diagnostics.report(Diagnostic::error(
                        DiagnosticKind::RoomConflictInBlock,
                        format!("block {block_id} requires the same room twice"),
                    ));
                    block_rooms.push(None);
                }
            }
        }

        // Materialise activities from lesson units.
        let parallel_index: HashMap<&str, usize> = data
            .parallel_tags
            .iter()
            .enumerate()
            .map(|(i, tag)| (tag.tag.as_str(), i))
            .collect();

        let mut activities: Vec<Activity> = Vec::new();
        let mut unit_activity = vec![0; data.units.len()];
        for (unit_index, unit) in data.units.iter().enumerate() {
            let unit_id = unit_index + 1;
            if unit.block == 0 || unit.block > data.blocks.len() {
                diagnostics.report(Diagnostic::error(
                    DiagnosticKind::SkippedEntity,
                    format!("lesson unit {unit_id} references unknown block {}", unit.block),
                ));
                continue;
            }
            let Some(rooms_simplified) = &block_rooms[unit.block] else {
                diagnostics.report(Diagnostic::error(
                    DiagnosticKind::SkippedEntity,
                    format!(
                        "lesson unit {unit_id} skipped: block {} has conflicting rooms",
                        unit.block
                    ),
                ));
                continue;
            };
            if unit.length == 0 {
                diagnostics.report(Diagnostic::error(
                    DiagnosticKind::SkippedEntity,
                    format!("lesson unit {unit_id} has zero length"),
                ));
                continue;
            }

            let fixed_time = unit.fixed_time.as_deref().and_then(|text| {
                match grid.parse_timeslot(text) {
                    None => {
                        diagnostics.report(Diagnostic::warning(
                            DiagnosticKind::SkippedEntity,
                            format!("lesson unit {unit_id}: bad fixed time '{text}'"),
                        ));
                        None
                    }
                    // `-` means explicitly unpinned.
                    Some(0) => None,
                    t => t,
                }
            });

            let parallel = unit.parallel.as_deref().and_then(|tag| {
                let index = parallel_index.get(tag).copied();
                if index.is_none() {
                    diagnostics.report(Diagnostic::warning(
                        DiagnosticKind::SkippedEntity,
                        format!("lesson unit {unit_id}: unknown parallel tag '{tag}'"),
                    ));
                }
                index
            });

            let agg = &blocks[unit.block];
            let id = activities.len() as ActivityId + 1;
            unit_activity[unit_index] = id;
            activities.push(Activity {
                id,
                unit: unit_id,
                length: unit.length,
                teachers: agg.teachers.iter().copied().collect(),
                atomics: agg.atomics.iter().copied().collect(),
                rooms: rooms_simplified.clone(),
                subject: agg.subject.clone(),
                group_names: agg.group_names.clone(),
                parallel,
                fixed_time,
            });
        }

        let mut teacher_activities = vec![Vec::new(); teachers.len()];
        let mut atomic_activities = vec![Vec::new(); atomic_names.len()];
        for activity in &activities {
            for &t in &activity.teachers {
                teacher_activities[t].push(activity.id);
            }
            for &g in &activity.atomics {
                atomic_activities[g].push(activity.id);
            }
        }

        let mut store = OccupancyStore::new(
            grid.week_length(),
            teachers.len() - 1,
            atomic_names.len() - 1,
            rooms.len() - 1,
            activities.len(),
        );
        for activity in &activities {
            store.init_state(activity);
        }

        let mut engine = Self {
            grid,
            teachers,
            teacher_ids,
            rooms,
            classes,
            class_ids,
            atomic_names,
            activities,
            unit_activity,
            teacher_activities,
            atomic_activities,
            constraints: Vec::new(),
            store,
            evaluator: Evaluator::new(),
            diagnostics,
        };

        // Parallel tags become SameStartingTime constraints.
        for (index, tag) in data.parallel_tags.iter().enumerate() {
            let linked: Vec<ActivityId> = engine
                .activities
                .iter()
                .filter(|a| a.parallel == Some(index))
                .map(|a| a.id)
                .collect();
            if linked.len() >= 2 {
                engine.add_constraint(
                    tag.weight,
                    ConstraintKind::SameStartingTime { activities: linked },
                );
            }
        }

        for record in &data.constraints {
            engine.load_constraint(record);
        }

        engine
    }

    /// Appends a constraint to the catalogue and returns its id.
    pub fn add_constraint(&mut self, weight: Weight, kind: ConstraintKind) -> usize {
        let id = self.constraints.len();
        self.constraints.push(Constraint::new(id, weight, kind));
        self.evaluator.invalidate();
        id
    }

    /// Loads one textual constraint record, expanding group targets
    /// to one constraint per atomic group. Hard `Unavailable`
    /// constraints are applied structurally instead.
    pub fn load_constraint(&mut self, record: &ConstraintRecord) {
        if let Weight::Soft(w) = record.weight {
            if !(1..=10).contains(&w) {
                self.diagnostics.report(Diagnostic::error(
                    DiagnosticKind::ConstraintArgOutOfRange,
                    format!("constraint '{}': soft weight {w} not in 1..=10", record.kind),
                ));
                return;
            }
        }

        let Some(participants) = self.resolve_target(&record.target) else {
            self.diagnostics.report(Diagnostic::error(
                DiagnosticKind::SkippedEntity,
                format!(
                    "constraint '{}' has unknown target '{}'",
                    record.kind, record.target
                ),
            ));
            return;
        };

        // Arguments are parsed once, before the target expansion, so
        // a malformed record yields a single diagnostic regardless of
        // how many atomic groups the target covers.
        let ppd = self.grid.periods_per_day() as u32;
        let kinds: Option<Vec<ConstraintKind>> = match record.kind.to_uppercase().as_str() {
            "MAXGAPSPERDAY" => self.numeric_arg(record, 0, u32::MAX).map(|n| {
                participants
                    .iter()
                    .map(|&p| ConstraintKind::max_gaps_per_day(p, n))
                    .collect()
            }),
            "MAXGAPSPERWEEK" => self.numeric_arg(record, 0, u32::MAX).map(|n| {
                participants
                    .iter()
                    .map(|&p| ConstraintKind::max_gaps_per_week(p, n))
                    .collect()
            }),
            "MINLESSONSPERDAY" => self.numeric_arg(record, 1, ppd).map(|n| {
                participants
                    .iter()
                    .map(|&participant| ConstraintKind::MinLessonsPerDay { participant, n })
                    .collect()
            }),
            "MAXLESSONSPERDAY" => self.numeric_arg(record, 1, ppd).map(|n| {
                participants
                    .iter()
                    .map(|&participant| ConstraintKind::MaxLessonsPerDay { participant, n })
                    .collect()
            }),
            "MAXCONSECUTIVELESSONS" => self.numeric_arg(record, 1, ppd).map(|n| {
                participants
                    .iter()
                    .map(|&participant| ConstraintKind::MaxConsecutiveLessons { participant, n })
                    .collect()
            }),
            "MAXDAYSPERWEEK" => self
                .numeric_arg(record, 1, self.grid.day_count() as u32)
                .map(|n| {
                    participants
                        .iter()
                        .map(|&participant| ConstraintKind::MaxDaysPerWeek { participant, n })
                        .collect()
                }),
            "LUNCHBREAK" => self.period_args(record).map(|periods| {
                participants
                    .iter()
                    .map(|&participant| ConstraintKind::LunchBreak {
                        participant,
                        periods: periods.clone(),
                    })
                    .collect()
            }),
            "UNAVAILABLE" => self.timeslot_args(record).map(|slots| {
                participants
                    .iter()
                    .map(|&participant| ConstraintKind::Unavailable {
                        participant,
                        slots: slots.clone(),
                    })
                    .collect()
            }),
            _ => {
                self.diagnostics.report(Diagnostic::error(
                    DiagnosticKind::UnknownConstraint,
                    format!("unknown constraint kind '{}'", record.kind),
                ));
                return;
            }
        };
        let Some(kinds) = kinds else { return };

        for kind in kinds {
            // Hard unavailability is pre-seeded into the occupancy
            // tables so that try_place rejects without evaluation.
            if record.weight == Weight::Hard {
                if let ConstraintKind::Unavailable { participant, slots } = &kind {
                    match participant {
                        Participant::Teacher(t) => {
                            self.store.seed_teacher_unavailable(*t, slots)
                        }
                        Participant::Group(g) => self.store.seed_group_unavailable(*g, slots),
                    }
                    continue;
                }
            }
            self.add_constraint(record.weight, kind);
        }
    }

    /// Resolves a `T:<teacher>` or `G:<class>[:<group>]` target.
    fn resolve_target(&self, target: &str) -> Option<Vec<Participant>> {
        let (prefix, rest) = target.split_once(':')?;
        match prefix {
            "T" => {
                let id = *self.teacher_ids.get(rest)?;
                Some(vec![Participant::Teacher(id)])
            }
            "G" => {
                let (class_tag, group) = match rest.split_once(':') {
                    Some((c, g)) => (c, g),
                    None => (rest, "*"),
                };
                let class = &self.classes[*self.class_ids.get(class_tag)?];
                let atoms = class.groups.atomic_indices(group)?;
                Some(
                    atoms
                        .iter()
                        .map(|&a| Participant::Group(class.atomic_base + a))
                        .collect(),
                )
            }
            _ => None,
        }
    }

    fn numeric_arg(&mut self, record: &ConstraintRecord, min: u32, max: u32) -> Option<u32> {
        let parsed = record.args.first().and_then(|a| a.parse::<u32>().ok());
        match parsed {
            Some(n) if (min..=max).contains(&n) => Some(n),
            _ => {
                self.diagnostics.report(Diagnostic::error(
                    DiagnosticKind::ConstraintArgOutOfRange,
                    format!(
                        "constraint '{}': argument {:?} not in {min}..={max}",
                        record.kind,
                        record.args.first()
                    ),
                ));
                None
            }
        }
    }

    fn period_args(&mut self, record: &ConstraintRecord) -> Option<BTreeSet<usize>> {
        let mut periods = BTreeSet::new();
        for arg in &record.args {
            match (0..self.grid.periods_per_day()).find(|&p| self.grid.period(p).tag == *arg) {
                Some(p) => {
                    periods.insert(p);
                }
                None => {
                    self.diagnostics.report(Diagnostic::error(
                        DiagnosticKind::ConstraintArgOutOfRange,
                        format!("constraint '{}': unknown period '{arg}'", record.kind),
                    ));
                    return None;
                }
            }
        }
        if periods.is_empty() {
            self.diagnostics.report(Diagnostic::error(
                DiagnosticKind::ConstraintArgOutOfRange,
                format!("constraint '{}': no periods given", record.kind),
            ));
            return None;
        }
        Some(periods)
    }

    fn timeslot_args(&mut self, record: &ConstraintRecord) -> Option<BTreeSet<Timeslot>> {
        let mut slots = BTreeSet::new();
        for arg in &record.args {
            match self.grid.parse_timeslot(arg) {
                Some(t) if t > 0 => {
                    slots.insert(t);
                }
                _ => {
                    self.diagnostics.report(Diagnostic::error(
                        DiagnosticKind::ConstraintArgOutOfRange,
                        format!("constraint '{}': bad timeslot '{arg}'", record.kind),
                    ));
                    return None;
                }
            }
        }
        if slots.is_empty() {
            return None;
        }
        Some(slots)
    }

    // --- accessors -----------------------------------------------------

    pub fn grid(&self) -> &WeekGrid {
        &self.grid
    }

    pub fn rooms(&self) -> &RoomModel {
        &self.rooms
    }

    pub fn store(&self) -> &OccupancyStore {
        &self.store
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    /// Looks up an activity by id. Unknown ids are bugs.
    pub fn activity(&self, id: ActivityId) -> Option<&Activity> {
        debug_assert!(id >= 1 && (id as usize) <= self.activities.len());
        self.activities.get(id as usize - 1)
    }

    /// Activity built for a 1-based lesson-unit id; `None` if the
    /// unit was skipped.
    pub fn activity_for_unit(&self, unit: usize) -> Option<ActivityId> {
        match self.unit_activity.get(unit.checked_sub(1)?) {
            Some(&id) if id != 0 => Some(id),
            _ => None,
        }
    }

    pub fn teacher(&self, id: TeacherId) -> &TeacherInfo {
        &self.teachers[id]
    }

    /// Activities taught by a teacher, ascending by id.
    pub fn activities_of_teacher(&self, id: TeacherId) -> &[ActivityId] {
        &self.teacher_activities[id]
    }

    /// Activities attended by an atomic group, ascending by id.
    pub fn activities_of_group(&self, id: AtomicId) -> &[ActivityId] {
        &self.atomic_activities[id]
    }

    pub fn teacher_count(&self) -> usize {
        self.teachers.len() - 1
    }

    pub fn classes(&self) -> &[ClassInfo] {
        &self.classes
    }

    pub fn class_by_tag(&self, tag: &str) -> Option<&ClassInfo> {
        self.class_ids.get(tag).map(|&i| &self.classes[i])
    }

    /// Display name of a global atomic group id.
    pub fn atomic_name(&self, id: AtomicId) -> &str {
        &self.atomic_names[id]
    }

    pub fn atomic_count(&self) -> usize {
        self.atomic_names.len() - 1
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// Removes and returns all diagnostics recorded so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.drain()
    }

    /// Pretty display name of an activity's tile, e.g.
    /// `Ma 10A.G+10B (MEi,SuA)`.
    pub fn tile_label(&self, id: ActivityId) -> String {
        let Some(activity) = self.activity(id) else {
            return format!("#{id}");
        };
        let mut label = activity.subject.clone();
        if !activity.group_names.is_empty() {
            label.push(' ');
            label.push_str(&activity.group_names.join("+"));
        }
        if !activity.teachers.is_empty() {
            let tags: Vec<&str> = activity
                .teachers
                .iter()
                .map(|&t| self.teachers[t].tag.as_str())
                .collect();
            label.push_str(&format!(" ({})", tags.join(",")));
        }
        label
    }

    // --- evaluation ----------------------------------------------------

    /// Scores every enabled constraint. Returns `u64::MAX` as the
    /// penalty when a hard constraint is broken.
    pub fn full_evaluate(&mut self) -> Evaluation {
        let ctx = EvalContext {
            grid: &self.grid,
            store: &self.store,
            activities: &self.activities,
        };
        self.evaluator.full(&self.constraints, &ctx)
    }

    /// Re-scores only the constraints that observe `activity`,
    /// combining with the cached residual. Call after each placement
    /// change affecting that activity.
    pub fn delta_evaluate(&mut self, activity: ActivityId) -> Evaluation {
        let ctx = EvalContext {
            grid: &self.grid,
            store: &self.store,
            activities: &self.activities,
        };
        let act = usize::try_from(activity - 1)
            .ok()
            .and_then(|i| self.activities.get(i));
        match act {
            Some(act) => self.evaluator.delta(&self.constraints, &ctx, act),
            None => {
                debug_assert!(false, "unknown activity id {activity}");
                self.evaluator.full(&self.constraints, &ctx)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BlockRecord, ClassRecord, CourseRecord, LessonUnitRecord, ParallelTagRecord, RoomRecord,
        SubjectRecord, TeacherRecord,
    };

    /// 10A divided A+B, 10B undivided; a split block (two courses,
    /// one per group of 10A) and a plain 10B course.
    fn school() -> TimetableData {
        let mut data = TimetableData::new()
            .with_day("Mo", "Monday")
            .with_day("Di", "Tuesday")
            .with_day("Mi", "Wednesday")
            .with_period("1", "")
            .with_period("2", "")
            .with_period("3", "")
            .with_period("4", "")
            .with_class(
                ClassRecord::new("10A", "10A")
                    .with_classroom("R1")
                    .with_divisions("A+B"),
            )
            .with_class(ClassRecord::new("10B", "10B").with_classroom("R2"))
            .with_teacher(TeacherRecord::new("MEi", "Meier"))
            .with_teacher(TeacherRecord::new("SuA", "Suarez"))
            .with_room(RoomRecord::new("R1", ""))
            .with_room(RoomRecord::new("R2", ""))
            .with_room(RoomRecord::new("R3", ""))
            .with_subject(SubjectRecord::new("Eth", "Ethics"))
            .with_subject(SubjectRecord::new("Ma", "Maths"));
        let split = data.add_block(BlockRecord::named("Eth", "b1"));
        let plain = data.add_block(BlockRecord::anonymous());
        data.with_course(CourseRecord::new("10A", "A", "Eth", "MEi", split).with_room_wish("$"))
            .with_course(CourseRecord::new("10A", "B", "Eth", "SuA", split).with_room_wish("R3"))
            .with_course(CourseRecord::new("10B", "*", "Ma", "MEi", plain).with_room_wish("$"))
            .with_unit(LessonUnitRecord::new(split, 1))
            .with_unit(LessonUnitRecord::new(plain, 1))
    }

    #[test]
    fn test_build_arenas_and_atomics() {
        let engine = Engine::build(&school());
        assert!(engine.diagnostics().is_empty());

        assert_eq!(engine.teacher_count(), 2);
        assert_eq!(engine.teacher(1).tag, "MEi");

        // 10A.A, 10A.B, 10B.
        assert_eq!(engine.atomic_count(), 3);
        assert_eq!(engine.atomic_name(1), "10A.A");
        assert_eq!(engine.atomic_name(2), "10A.B");
        assert_eq!(engine.atomic_name(3), "10B");
        let class = engine.class_by_tag("10B").unwrap();
        assert_eq!(class.atomic_base, 3);
        assert!(!class.groups.is_divided());
    }

    #[test]
    fn test_build_block_union() {
        let engine = Engine::build(&school());
        let split = engine.activity(1).unwrap();

        // Both courses of the block pool their resources.
        assert_eq!(split.teachers, vec![1, 2]);
        assert_eq!(split.atomics, vec![1, 2]);
        assert_eq!(split.subject, "Eth");
        assert_eq!(split.group_names, vec!["10A.A", "10A.B"]);
        // `$` resolved to R1, plus the compulsory R3.
        assert_eq!(split.rooms.singles, vec![1, 3]);

        let plain = engine.activity(2).unwrap();
        assert_eq!(plain.teachers, vec![1]);
        assert_eq!(plain.atomics, vec![3]);
        assert_eq!(plain.rooms.singles, vec![2]);

        assert_eq!(engine.activity_for_unit(1), Some(1));
        assert_eq!(engine.activity_for_unit(9), None);

        // MEi teaches both units; 10A.A only the split block.
        assert_eq!(engine.activities_of_teacher(1), &[1, 2]);
        assert_eq!(engine.activities_of_group(1), &[1]);
        assert_eq!(engine.activities_of_group(3), &[2]);
    }

    #[test]
    fn test_half_group_lessons_can_overlap_but_not_with_whole_class() {
        let mut data = school();
        // A 10A.A-only course in its own block.
        let solo = data.add_block(BlockRecord::anonymous());
        let data = data
            .with_course(CourseRecord::new("10A", "A", "Ma", "SuA", solo))
            .with_unit(LessonUnitRecord::new(solo, 1));
        let mut engine = Engine::build(&data);

        // Unit 2 (10B) and unit 3 (10A.A) share nothing.
        engine.try_place(2, 1).unwrap();
        engine.try_place(3, 1).unwrap();
        // The split block touches 10A.A, so it cannot join them.
        assert!(engine.try_place(1, 1).is_err());
    }

    #[test]
    fn test_tile_label() {
        let engine = Engine::build(&school());
        assert_eq!(engine.tile_label(1), "Eth 10A.A+10A.B (MEi,SuA)");
        assert_eq!(engine.tile_label(2), "Ma 10B (MEi)");
    }

    #[test]
    fn test_parallel_tag_becomes_same_starting_time() {
        let mut data = school();
        data.units[0].parallel = Some("P1".into());
        data.units[1].parallel = Some("P1".into());
        let data = data.with_parallel_tag(ParallelTagRecord::new("P1", Weight::Soft(5)));
        let engine = Engine::build(&data);

        assert_eq!(engine.constraints().len(), 1);
        let constraint = &engine.constraints()[0];
        assert_eq!(constraint.weight, Weight::Soft(5));
        assert_eq!(
            constraint.kind,
            ConstraintKind::SameStartingTime {
                activities: vec![1, 2]
            }
        );
    }

    #[test]
    fn test_group_target_expands_per_atomic() {
        let data = school().with_constraint(
            ConstraintRecord::new("MAXLESSONSPERDAY", Weight::Soft(3), "G:10A").with_arg("3"),
        );
        let engine = Engine::build(&data);

        // One constraint per atomic group of 10A.
        assert_eq!(engine.constraints().len(), 2);
        for (constraint, atomic) in engine.constraints().iter().zip([1, 2]) {
            assert_eq!(
                constraint.kind,
                ConstraintKind::MaxLessonsPerDay {
                    participant: Participant::Group(atomic),
                    n: 3,
                }
            );
        }
    }

    #[test]
    fn test_hard_unavailable_is_seeded_not_catalogued() {
        let data = school().with_constraint(
            ConstraintRecord::new("UNAVAILABLE", Weight::Hard, "T:MEi")
                .with_args(vec!["Mo.1".into(), "Di.2".into()]),
        );
        let engine = Engine::build(&data);

        assert!(engine.constraints().is_empty());
        assert_eq!(engine.store().teacher_at(1, 1), BLOCKED);
        assert_eq!(engine.store().teacher_at(6, 1), BLOCKED);
        assert_eq!(engine.store().teacher_at(2, 1), FREE);
    }

    #[test]
    fn test_soft_unavailable_is_catalogued() {
        let data = school().with_constraint(
            ConstraintRecord::new("UNAVAILABLE", Weight::Soft(4), "T:MEi").with_arg("Mo.1"),
        );
        let mut engine = Engine::build(&data);

        assert_eq!(engine.constraints().len(), 1);
        assert_eq!(engine.store().teacher_at(1, 1), FREE);

        engine.try_place(2, 1).unwrap();
        let eval = engine.full_evaluate();
        assert_eq!(eval.penalty, 10_000);
    }

    #[test]
    fn test_bad_records_become_diagnostics() {
        let mut data = school();
        data.classes[0].divisions = "A+".into();
        let data = data
            .with_constraint(ConstraintRecord::new(
                "NOSUCHRULE",
                Weight::Soft(2),
                "T:MEi",
            ))
            .with_constraint(
                ConstraintRecord::new("MAXLESSONSPERDAY", Weight::Soft(2), "T:MEi").with_arg("9"),
            )
            .with_constraint(
                ConstraintRecord::new("MAXGAPSPERDAY", Weight::Soft(2), "T:Zzz").with_arg("1"),
            );
        let engine = Engine::build(&data);

        let log = engine.diagnostics();
        assert_eq!(log.count_of(DiagnosticKind::DivisionSyntax), 1);
        assert_eq!(log.count_of(DiagnosticKind::UnknownConstraint), 1);
        assert_eq!(log.count_of(DiagnosticKind::ConstraintArgOutOfRange), 1);
        // Two courses of the dropped class, plus the bad target.
        assert_eq!(log.count_of(DiagnosticKind::SkippedEntity), 3);
        assert!(engine.constraints().is_empty());
    }

    #[test]
    fn test_bad_arg_on_group_target_reported_once() {
        // 10A has two atomic groups; a malformed argument must still
        // yield a single diagnostic, not one per atomic.
        let data = school().with_constraint(
            ConstraintRecord::new("MAXLESSONSPERDAY", Weight::Soft(2), "G:10A").with_arg("9"),
        );
        let engine = Engine::build(&data);

        let log = engine.diagnostics();
        assert_eq!(log.count_of(DiagnosticKind::ConstraintArgOutOfRange), 1);
        assert!(engine.constraints().is_empty());
    }

    #[test]
    fn test_evaluate_through_engine() {
        let data = school().with_constraint(
            ConstraintRecord::new("MAXGAPSPERDAY", Weight::Soft(2), "T:MEi").with_arg("0"),
        );
        let mut engine = Engine::build(&data);

        // MEi teaches units 1 and 2; a one-period gap on Monday.
        engine.try_place(1, 1).unwrap();
        engine.try_place(2, 3).unwrap();
        assert_eq!(engine.full_evaluate().penalty, 100);

        engine.unplace(2).unwrap();
        engine.try_place(2, 2).unwrap();
        let eval = engine.delta_evaluate(2);
        assert_eq!(eval.penalty, 0);
    }

    #[test]
    fn test_flexible_wish_adds_extra_choice() {
        let mut data = school();
        data.courses[2].room_wish = "$+".into();
        let engine = Engine::build(&data);

        assert_eq!(
            engine
                .diagnostics()
                .count_of(DiagnosticKind::FlexibleRoomChoice),
            1
        );
        let plain = engine.activity(2).unwrap();
        assert_eq!(plain.rooms.singles, vec![2]);
        // The `+` adds one list over all rooms; the required R2 is
        // struck from it.
        assert_eq!(plain.rooms.choices, vec![vec![1, 3]]);
        assert_eq!(plain.required_rooms(), 2);
    }

    #[test]
    fn test_conflicting_block_rooms_skip_its_units() {
        let mut data = school();
        // Both courses of the split block demand R3 outright.
        data.courses[0].room_wish = "R3".into();
        let engine = Engine::build(&data);

        assert_eq!(
            engine
                .diagnostics()
                .count_of(DiagnosticKind::RoomConflictInBlock),
            1
        );
        // Unit 1 is gone; unit 2 still built.
        assert_eq!(engine.activity_for_unit(1), None);
        assert_eq!(engine.activities().len(), 1);
        assert_eq!(engine.activity_for_unit(2), Some(1));
    }
}
