//! Placing, unplacing, and the bulk loaders.
//!
//! `try_place` is check-then-commit: a rejected attempt leaves the
//! store bit-identical. Room choice lists are not resolved here; the
//! greedy [`resolve_room_choices`](super::Engine::resolve_room_choices)
//! pass runs once the board is stable.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::PlacementError;
use crate::models::{ActivityId, Timeslot};

use super::Engine;

impl Engine {
    /// Attempts to place an activity at `timeslot`.
    ///
    /// Checks the day boundary and scans every compulsory resource
    /// over the span; on success the occupancy tables are committed.
    /// On failure nothing changes and the error carries the ids of
    /// the occupying activities.
    pub fn try_place(
        &mut self,
        activity: ActivityId,
        timeslot: Timeslot,
    ) -> Result<(), PlacementError> {
        debug_assert!(activity >= 1 && (activity as usize) <= self.activities.len());
        let Some(act) = self.activities.get(activity as usize - 1) else {
            return Err(PlacementError::NotPlaced);
        };

        if self.store.is_placed(activity) {
            return Err(PlacementError::AlreadyPlaced);
        }
        if timeslot < 1 || timeslot + act.length - 1 > self.grid.week_length() {
            return Err(PlacementError::DayBoundaryCrossed);
        }
        let (_, period) = self.grid.decompose(timeslot);
        if period + act.length > self.grid.periods_per_day() {
            return Err(PlacementError::DayBoundaryCrossed);
        }

        let (blockers, blocked) = self.store.scan(act, timeslot);
        if !blockers.is_empty() || blocked {
            return Err(PlacementError::Blocked(blockers));
        }

        self.store.write(act, timeslot);
        Ok(())
    }

    /// Places an activity the caller knows fits. A conflict here is a
    /// programming error; in release builds the error is returned.
    pub fn place(
        &mut self,
        activity: ActivityId,
        timeslot: Timeslot,
    ) -> Result<(), PlacementError> {
        let result = self.try_place(activity, timeslot);
        debug_assert!(result.is_ok(), "place() conflict: {result:?}");
        result
    }

    /// Removes a placed activity from the board, releasing its
    /// compulsory rooms and any resolved choice rooms.
    pub fn unplace(&mut self, activity: ActivityId) -> Result<(), PlacementError> {
        debug_assert!(activity >= 1 && (activity as usize) <= self.activities.len());
        let Some(act) = self.activities.get(activity as usize - 1) else {
            return Err(PlacementError::NotPlaced);
        };
        if !self.store.is_placed(activity) {
            return Err(PlacementError::NotPlaced);
        }
        self.store.clear(act);
        Ok(())
    }

    /// Places every activity with a pinned timeslot, ascending by
    /// (timeslot, activity id) so clash reports are deterministic. A
    /// pinned activity that no longer fits stays unplaced with a
    /// [`DiagnosticKind::FixedTimeClash`] naming both sides.
    pub fn load_fixed_times(&mut self) {
        let mut pinned: Vec<(Timeslot, ActivityId)> = self
            .activities
            .iter()
            .filter(|a| !self.store.is_placed(a.id))
            .filter_map(|a| a.fixed_time.map(|t| (t, a.id)))
            .collect();
        pinned.sort_unstable();

        for (timeslot, id) in pinned {
            match self.try_place(id, timeslot) {
                Ok(()) => {}
                Err(PlacementError::Blocked(blockers)) => {
                    let others: Vec<String> =
                        blockers.iter().map(|&b| self.tile_label(b)).collect();
                    let against = if others.is_empty() {
                        "an unavailable slot".to_string()
                    } else {
                        others.join(", ")
                    };
                    self.diagnostics.report(Diagnostic::error(
                        DiagnosticKind::FixedTimeClash,
                        format!(
                            "'{}' pinned to {} clashes with {}",
                            self.tile_label(id),
                            self.grid.format_timeslot(timeslot),
                            against
                        ),
                    ));
                }
                Err(e) => {
                    self.diagnostics.report(Diagnostic::error(
                        DiagnosticKind::FixedTimeClash,
                        format!(
                            "'{}' cannot sit at its pinned time {}: {e}",
                            self.tile_label(id),
                            self.grid.format_timeslot(timeslot)
                        ),
                    ));
                }
            }
        }
    }

    /// Greedily allocates the unresolved choice-list rooms of every
    /// placed activity, in activity-id order (choice lists per
    /// activity are already shortest-first). A list with no free
    /// candidate leaves its slot at 0 and records a
    /// [`DiagnosticKind::UnassignedChoiceRoom`] warning.
    pub fn resolve_room_choices(&mut self) {
        for index in 0..self.activities.len() {
            let id = self.activities[index].id;
            if !self.store.is_placed(id) {
                continue;
            }
            let singles = self.activities[index].rooms.singles.len();
            for (choice, list) in self.activities[index].rooms.choices.iter().enumerate() {
                let slot = singles + choice;
                if self.store.state(id).rooms[slot] != 0 {
                    continue;
                }
                let act = &self.activities[index];
                let start = self.store.state(id).timeslot;
                match list
                    .iter()
                    .copied()
                    .find(|&room| self.store.room_free(room, start, act.length))
                {
                    Some(room) => self.store.claim_room(act, slot, room),
                    None => {
                        let tags: Vec<&str> = list
                            .iter()
                            .map(|&r| self.rooms.room(r).tag.as_str())
                            .collect();
                        self.diagnostics.report(Diagnostic::warning(
                            DiagnosticKind::UnassignedChoiceRoom,
                            format!(
                                "no free room among [{}] for '{}' at {}",
                                tags.join(", "),
                                self.tile_label(id),
                                self.grid.format_timeslot(start)
                            ),
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Weight;
    use crate::models::{
        BlockRecord, ClassRecord, ConstraintRecord, CourseRecord, LessonUnitRecord, RoomRecord,
        SubjectRecord, TeacherRecord, TimetableData,
    };

    /// Two classes, two teachers, three rooms, one subject; one
    /// course per class in its own block, two single lessons each.
    fn small_data() -> TimetableData {
        let mut data = TimetableData::new()
            .with_day("Mo", "Monday")
            .with_day("Di", "Tuesday")
            .with_period("1", "")
            .with_period("2", "")
            .with_period("3", "")
            .with_period("4", "")
            .with_class(ClassRecord::new("10A", "10A").with_classroom("R1"))
            .with_class(ClassRecord::new("10B", "10B").with_classroom("R2"))
            .with_teacher(TeacherRecord::new("MEi", "Meier"))
            .with_teacher(TeacherRecord::new("SuA", "Suarez"))
            .with_room(RoomRecord::new("R1", ""))
            .with_room(RoomRecord::new("R2", ""))
            .with_room(RoomRecord::new("R3", ""))
            .with_subject(SubjectRecord::new("Ma", "Maths"));
        let b1 = data.add_block(BlockRecord::anonymous());
        let b2 = data.add_block(BlockRecord::anonymous());
        data.with_course(CourseRecord::new("10A", "*", "Ma", "MEi", b1).with_room_wish("$"))
            .with_course(CourseRecord::new("10B", "*", "Ma", "SuA", b2).with_room_wish("$"))
            .with_unit(LessonUnitRecord::new(b1, 1))
            .with_unit(LessonUnitRecord::new(b1, 1))
            .with_unit(LessonUnitRecord::new(b2, 1))
            .with_unit(LessonUnitRecord::new(b2, 1))
    }

    #[test]
    fn test_try_place_and_conflict() {
        let mut engine = Engine::build(&small_data());
        assert!(!engine.diagnostics().has_errors());

        engine.try_place(1, 1).unwrap();
        // Activity 2 shares teacher, class, and room R1.
        match engine.try_place(2, 1) {
            Err(PlacementError::Blocked(blockers)) => {
                assert_eq!(blockers, std::collections::BTreeSet::from([1]));
            }
            other => panic!("expected Blocked, got {other:?}"),
        }
        // Same slot, disjoint resources: fine.
        engine.try_place(3, 1).unwrap();
        assert_eq!(engine.store().state(1).rooms, vec![1]);
    }

    #[test]
    fn test_failed_try_place_changes_nothing() {
        let mut engine = Engine::build(&small_data());
        engine.try_place(1, 1).unwrap();
        let before = engine.store().clone();
        assert!(engine.try_place(2, 1).is_err());
        assert_eq!(*engine.store(), before);
    }

    #[test]
    fn test_day_boundary() {
        let mut data = small_data();
        data.units[0].length = 3;
        let mut engine = Engine::build(&data);

        // Periods 2..5 of a 4-period day.
        assert_eq!(
            engine.try_place(1, 3),
            Err(PlacementError::DayBoundaryCrossed)
        );
        engine.try_place(1, 2).unwrap();
    }

    #[test]
    fn test_activity_longer_than_day_never_fits() {
        let mut data = small_data();
        data.units[0].length = 5;
        let mut engine = Engine::build(&data);

        // Five periods never fit a 4-period day, at any timeslot.
        for timeslot in 1..=engine.grid().week_length() {
            assert_eq!(
                engine.try_place(1, timeslot),
                Err(PlacementError::DayBoundaryCrossed),
                "timeslot {timeslot}"
            );
        }
    }

    #[test]
    fn test_unplace_releases_everything() {
        let mut engine = Engine::build(&small_data());
        let pristine = engine.store().clone();
        engine.try_place(1, 2).unwrap();
        assert_eq!(engine.unplace(1), Ok(()));
        assert_eq!(*engine.store(), pristine);
        assert_eq!(engine.unplace(1), Err(PlacementError::NotPlaced));
    }

    #[test]
    fn test_already_placed() {
        let mut engine = Engine::build(&small_data());
        engine.try_place(1, 1).unwrap();
        assert_eq!(engine.try_place(1, 2), Err(PlacementError::AlreadyPlaced));
    }

    #[test]
    fn test_load_fixed_times_reports_clashes() {
        let mut data = small_data();
        // Both 10A units pinned to Mo.1; the second must lose.
        data.units[0].fixed_time = Some("Mo.1".into());
        data.units[1].fixed_time = Some("Mo.1".into());
        let mut engine = Engine::build(&data);

        engine.load_fixed_times();
        assert!(engine.store().is_placed(1));
        assert!(!engine.store().is_placed(2));
        assert_eq!(
            engine.diagnostics().count_of(DiagnosticKind::FixedTimeClash),
            1
        );
    }

    #[test]
    fn test_fixed_time_against_unavailable_slot() {
        let mut data = small_data();
        data.units[0].fixed_time = Some("Mo.1".into());
        data = data.with_constraint(
            ConstraintRecord::new("UNAVAILABLE", Weight::Hard, "T:MEi").with_arg("Mo.1"),
        );
        let mut engine = Engine::build(&data);

        engine.load_fixed_times();
        assert!(!engine.store().is_placed(1));
        assert_eq!(
            engine.diagnostics().count_of(DiagnosticKind::FixedTimeClash),
            1
        );
    }

    #[test]
    fn test_resolve_room_choices_greedy() {
        let mut data = TimetableData::new()
            .with_day("Mo", "Monday")
            .with_period("1", "")
            .with_period("2", "")
            .with_teacher(TeacherRecord::new("MEi", ""))
            .with_teacher(TeacherRecord::new("SuA", ""))
            .with_room(RoomRecord::new("R1", ""))
            .with_room(RoomRecord::new("R2", ""))
            .with_subject(SubjectRecord::new("Ph", "Physics"));
        let b1 = data.add_block(BlockRecord::anonymous());
        let b2 = data.add_block(BlockRecord::anonymous());
        let data = data
            .with_course(CourseRecord::new("", "*", "Ph", "MEi", b1).with_room_wish("R1/R2"))
            .with_course(CourseRecord::new("", "*", "Ph", "SuA", b2).with_room_wish("R1/R2"))
            .with_unit(LessonUnitRecord::new(b1, 1))
            .with_unit(LessonUnitRecord::new(b2, 1));
        let mut engine = Engine::build(&data);

        engine.try_place(1, 1).unwrap();
        engine.try_place(2, 1).unwrap();
        engine.resolve_room_choices();

        // First activity takes R1, second falls through to R2.
        assert_eq!(engine.store().state(1).rooms, vec![1]);
        assert_eq!(engine.store().state(2).rooms, vec![2]);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn test_resolve_room_choices_exhausted() {
        let mut data = TimetableData::new()
            .with_day("Mo", "Monday")
            .with_period("1", "")
            .with_period("2", "")
            .with_teacher(TeacherRecord::new("MEi", ""))
            .with_teacher(TeacherRecord::new("SuA", ""))
            .with_teacher(TeacherRecord::new("KlB", ""))
            .with_room(RoomRecord::new("R1", ""))
            .with_room(RoomRecord::new("R2", ""))
            .with_subject(SubjectRecord::new("Ph", ""));
        let b1 = data.add_block(BlockRecord::anonymous());
        let b2 = data.add_block(BlockRecord::anonymous());
        let b3 = data.add_block(BlockRecord::anonymous());
        let data = data
            .with_course(CourseRecord::new("", "*", "Ph", "MEi", b1).with_room_wish("R1"))
            .with_course(CourseRecord::new("", "*", "Ph", "SuA", b2).with_room_wish("R2"))
            .with_course(CourseRecord::new("", "*", "Ph", "KlB", b3).with_room_wish("R1/R2"))
            .with_unit(LessonUnitRecord::new(b1, 1))
            .with_unit(LessonUnitRecord::new(b2, 1))
            .with_unit(LessonUnitRecord::new(b3, 1));
        let mut engine = Engine::build(&data);

        // Both rooms are compulsory singles of the other activities;
        // the choice list has no free candidate left.
        engine.try_place(1, 1).unwrap();
        engine.try_place(2, 1).unwrap();
        engine.try_place(3, 1).unwrap();
        engine.resolve_room_choices();

        assert_eq!(engine.store().state(3).rooms, vec![0]);
        assert_eq!(
            engine
                .diagnostics()
                .count_of(DiagnosticKind::UnassignedChoiceRoom),
            1
        );
    }
}
