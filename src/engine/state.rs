//! Persisting and restoring placements.
//!
//! A [`PlacementRecord`] captures one lesson unit's position: its
//! timeslot and allocated rooms, by id. The line form is
//! `unit; timeslot; room|room|room` with 0 for unresolved rooms.
//! Import re-places through the ordinary placement path, so a stale
//! snapshot degrades into clash diagnostics rather than a corrupt
//! board.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::models::{RoomId, TimetableData, Timeslot};

use super::Engine;

/// One lesson unit's persisted placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    /// 1-based lesson-unit id.
    pub unit: usize,
    /// Start timeslot; 0 = unplaced.
    pub timeslot: Timeslot,
    /// Allocated rooms in state order; 0 = unresolved choice slot.
    pub rooms: Vec<RoomId>,
}

impl PlacementRecord {
    /// Renders the `unit; timeslot; rooms` line form.
    pub fn to_line(&self) -> String {
        let rooms: Vec<String> = self.rooms.iter().map(|r| r.to_string()).collect();
        format!("{}; {}; {}", self.unit, self.timeslot, rooms.join("|"))
    }

    /// Parses the line form; `None` for malformed input.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, ';').map(str::trim);
        let unit = parts.next()?.parse().ok()?;
        let timeslot = parts.next()?.parse().ok()?;
        let rooms_part = parts.next().unwrap_or("");
        let mut rooms = Vec::new();
        if !rooms_part.is_empty() {
            for token in rooms_part.split('|') {
                rooms.push(token.trim().parse().ok()?);
            }
        }
        Some(Self {
            unit,
            timeslot,
            rooms,
        })
    }
}

impl Engine {
    /// Snapshots the board: one record per activity, in unit order,
    /// unplaced units included with timeslot 0.
    pub fn export_state(&self) -> Vec<PlacementRecord> {
        self.activities
            .iter()
            .map(|a| {
                let state = self.store.state(a.id);
                PlacementRecord {
                    unit: a.unit,
                    timeslot: state.timeslot,
                    rooms: state.rooms.clone(),
                }
            })
            .collect()
    }

    /// Replays a snapshot onto the board.
    ///
    /// Each record goes through [`try_place`](Engine::try_place);
    /// recorded choice rooms are claimed afterwards when still free.
    /// Records that no longer apply (unknown unit, occupied slot,
    /// busy room) degrade into diagnostics.
    pub fn import_state(&mut self, records: &[PlacementRecord]) {
        for record in records {
            if record.timeslot == 0 {
                continue;
            }
            let Some(id) = self.activity_for_unit(record.unit) else {
                self.diagnostics.report(Diagnostic::warning(
                    DiagnosticKind::PlacementClash,
                    format!("placement for unknown lesson unit {}", record.unit),
                ));
                continue;
            };
            if let Err(e) = self.try_place(id, record.timeslot) {
                self.diagnostics.report(Diagnostic::warning(
                    DiagnosticKind::PlacementClash,
                    format!(
                        "stored placement of '{}' at {} no longer applies: {e}",
                        self.tile_label(id),
                        self.grid.format_timeslot(record.timeslot)
                    ),
                ));
                continue;
            }

            // Re-claim the recorded choice rooms.
            let singles = self.activities[id as usize - 1].rooms.singles.len();
            for slot in singles..record.rooms.len() {
                let room = record.rooms[slot];
                if room == 0 {
                    continue;
                }
                if room >= self.rooms.len() || slot >= self.store.state(id).rooms.len() {
                    self.diagnostics.report(Diagnostic::warning(
                        DiagnosticKind::PlacementClash,
                        format!(
                            "stored rooms of lesson unit {} do not match the model",
                            record.unit
                        ),
                    ));
                    break;
                }
                let act = &self.activities[id as usize - 1];
                if self.store.room_free(room, record.timeslot, act.length) {
                    self.store.claim_room(act, slot, room);
                } else {
                    self.diagnostics.report(Diagnostic::warning(
                        DiagnosticKind::UnassignedChoiceRoom,
                        format!(
                            "stored room '{}' for '{}' is taken",
                            self.rooms.room(room).tag,
                            self.tile_label(id)
                        ),
                    ));
                }
            }
        }
    }

    /// Converts the repository's persisted `placed_time` /
    /// `placed_rooms` columns into placement records, resolving room
    /// tags against the model. Unknown tags or times degrade into
    /// diagnostics.
    pub fn placements_from_records(&mut self, data: &TimetableData) -> Vec<PlacementRecord> {
        let mut records = Vec::new();
        for (index, unit) in data.units.iter().enumerate() {
            let unit_id = index + 1;
            let Some(text) = unit.placed_time.as_deref() else {
                continue;
            };
            let Some(timeslot) = self.grid.parse_timeslot(text) else {
                self.diagnostics.report(Diagnostic::warning(
                    DiagnosticKind::PlacementClash,
                    format!("lesson unit {unit_id}: bad stored time '{text}'"),
                ));
                continue;
            };
            if timeslot == 0 {
                continue;
            }

            let mut rooms = Vec::new();
            for token in unit.placed_rooms.split('|').map(str::trim) {
                if token.is_empty() || token == "0" {
                    rooms.push(0);
                } else if let Some(id) = self.rooms.lookup(token) {
                    rooms.push(id);
                } else {
                    self.diagnostics.report(Diagnostic::warning(
                        DiagnosticKind::InvalidRoomId,
                        format!("lesson unit {unit_id}: unknown stored room '{token}'"),
                    ));
                    rooms.push(0);
                }
            }
            records.push(PlacementRecord {
                unit: unit_id,
                timeslot,
                rooms,
            });
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BlockRecord, CourseRecord, LessonUnitRecord, RoomGroupRecord, RoomRecord, SubjectRecord,
        TeacherRecord,
    };

    fn data() -> TimetableData {
        let mut data = TimetableData::new()
            .with_day("Mo", "Monday")
            .with_day("Di", "Tuesday")
            .with_period("1", "")
            .with_period("2", "")
            .with_period("3", "")
            .with_teacher(TeacherRecord::new("MEi", ""))
            .with_teacher(TeacherRecord::new("SuA", ""))
            .with_room(RoomRecord::new("R1", ""))
            .with_room(RoomRecord::new("R2", ""))
            .with_room_group(RoomGroupRecord::new(
                "Any",
                vec!["R1".into(), "R2".into()],
            ))
            .with_subject(SubjectRecord::new("Ma", ""));
        let b1 = data.add_block(BlockRecord::anonymous());
        let b2 = data.add_block(BlockRecord::anonymous());
        data.with_course(CourseRecord::new("", "*", "Ma", "MEi", b1).with_room_wish("Any"))
            .with_course(CourseRecord::new("", "*", "Ma", "SuA", b2).with_room_wish("R1"))
            .with_unit(LessonUnitRecord::new(b1, 1))
            .with_unit(LessonUnitRecord::new(b2, 2))
    }

    #[test]
    fn test_line_roundtrip() {
        let record = PlacementRecord {
            unit: 12,
            timeslot: 7,
            rooms: vec![3, 0, 5],
        };
        let line = record.to_line();
        assert_eq!(line, "12; 7; 3|0|5");
        assert_eq!(PlacementRecord::parse_line(&line), Some(record));

        let record = PlacementRecord {
            unit: 1,
            timeslot: 0,
            rooms: vec![],
        };
        assert_eq!(
            PlacementRecord::parse_line(&record.to_line()),
            Some(record)
        );

        assert_eq!(PlacementRecord::parse_line("nonsense"), None);
        assert_eq!(PlacementRecord::parse_line("1; 2; x"), None);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let mut engine = Engine::build(&data());
        engine.try_place(1, 2).unwrap();
        engine.try_place(2, 4).unwrap();
        engine.resolve_room_choices();
        let snapshot = engine.export_state();

        let mut restored = Engine::build(&data());
        restored.import_state(&snapshot);
        assert!(restored.diagnostics().is_empty());
        assert_eq!(restored.export_state(), snapshot);
        assert_eq!(*restored.store(), *engine.store());
    }

    #[test]
    fn test_import_clash_degrades_to_diagnostic() {
        let mut engine = Engine::build(&data());
        // Units 1 and 2 share room R1 once unit 1's choice resolves,
        // but a conflicting snapshot must not corrupt the board.
        let records = vec![
            PlacementRecord {
                unit: 2,
                timeslot: 1,
                rooms: vec![1],
            },
            PlacementRecord {
                unit: 2,
                timeslot: 2,
                rooms: vec![1],
            },
        ];
        engine.import_state(&records);
        assert_eq!(engine.store().state(2).timeslot, 1);
        assert_eq!(
            engine.diagnostics().count_of(DiagnosticKind::PlacementClash),
            1
        );
    }

    #[test]
    fn test_import_busy_choice_room() {
        let mut engine = Engine::build(&data());
        // Unit 2 compulsorily takes R1 at Mo.1-Mo.2; the snapshot
        // wants R1 for unit 1's choice at Mo.1 as well.
        let records = vec![
            PlacementRecord {
                unit: 2,
                timeslot: 1,
                rooms: vec![1],
            },
            PlacementRecord {
                unit: 1,
                timeslot: 1,
                rooms: vec![1],
            },
        ];
        engine.import_state(&records);
        assert!(engine.store().is_placed(1));
        assert_eq!(engine.store().state(1).rooms, vec![0]);
        assert_eq!(
            engine
                .diagnostics()
                .count_of(DiagnosticKind::UnassignedChoiceRoom),
            1
        );
    }

    #[test]
    fn test_placements_from_records() {
        let mut source = data();
        source.units[0] = LessonUnitRecord::new(1, 1).with_placement("Mo.2", "R2");
        source.units[1] = LessonUnitRecord::new(2, 2).with_placement("Di.1", "R1");
        let mut engine = Engine::build(&source);

        let records = engine.placements_from_records(&source);
        assert_eq!(
            records,
            vec![
                PlacementRecord {
                    unit: 1,
                    timeslot: 2,
                    rooms: vec![2],
                },
                PlacementRecord {
                    unit: 2,
                    timeslot: 4,
                    rooms: vec![1],
                },
            ]
        );

        engine.import_state(&records);
        assert_eq!(engine.store().state(1).timeslot, 2);
        assert_eq!(engine.store().state(1).rooms, vec![2]);
        assert_eq!(engine.store().state(2).rooms, vec![1]);
    }
}
