//! Per-timeslot occupancy bookkeeping.
//!
//! Three fixed-width tables indexed by timeslot, one row per slot,
//! one column per teacher / atomic group / room. A cell holds the id
//! of the occupying activity, [`FREE`], or [`BLOCKED`] for slots a
//! hard `Unavailable` constraint seeded. Row and column 0 are never
//! written (timeslot 0 = unplaced, id 0 = sentinel).
//!
//! All tables are pre-allocated at build time; placement does no
//! allocation. Reads are O(1), writes for one activity are
//! O(length × resources).

use std::collections::BTreeSet;

use crate::models::{Activity, ActivityId, AtomicId, RoomId, TeacherId, Timeslot};

/// Cell value for a free slot.
pub const FREE: i32 = 0;
/// Cell value for a structurally unavailable slot.
pub const BLOCKED: i32 = -1;

/// Mutable placement state of one activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityState {
    /// Occupied timeslot; 0 = unplaced.
    pub timeslot: Timeslot,
    /// Allocated rooms, one entry per required room: compulsory
    /// singletons first, then one slot per choice list (0 =
    /// unresolved).
    pub rooms: Vec<RoomId>,
}

/// The collision-detection substrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyStore {
    teacher_slot: Vec<Vec<i32>>,
    group_slot: Vec<Vec<i32>>,
    room_slot: Vec<Vec<i32>>,
    states: Vec<ActivityState>,
}

impl OccupancyStore {
    /// Allocates empty tables. Counts are numbers of real entities;
    /// each table gets a sentinel row/column 0.
    pub fn new(
        week_length: usize,
        teacher_count: usize,
        atomic_count: usize,
        room_count: usize,
        activity_count: usize,
    ) -> Self {
        let rows = week_length + 1;
        Self {
            teacher_slot: vec![vec![FREE; teacher_count + 1]; rows],
            group_slot: vec![vec![FREE; atomic_count + 1]; rows],
            room_slot: vec![vec![FREE; room_count + 1]; rows],
            states: vec![
                ActivityState {
                    timeslot: 0,
                    rooms: Vec::new(),
                };
                activity_count + 1
            ],
        }
    }

    /// Sizes the room list of an activity's state to its required
    /// count. Called once per activity during build.
    pub fn init_state(&mut self, activity: &Activity) {
        self.states[activity.id as usize].rooms = vec![0; activity.required_rooms()];
    }

    pub fn teacher_at(&self, timeslot: Timeslot, teacher: TeacherId) -> i32 {
        self.teacher_slot[timeslot][teacher]
    }

    pub fn group_at(&self, timeslot: Timeslot, atomic: AtomicId) -> i32 {
        self.group_slot[timeslot][atomic]
    }

    pub fn room_at(&self, timeslot: Timeslot, room: RoomId) -> i32 {
        self.room_slot[timeslot][room]
    }

    pub fn state(&self, activity: ActivityId) -> &ActivityState {
        &self.states[activity as usize]
    }

    pub fn is_placed(&self, activity: ActivityId) -> bool {
        self.states[activity as usize].timeslot != 0
    }

    /// Marks teacher slots structurally unavailable.
    pub fn seed_teacher_unavailable(&mut self, teacher: TeacherId, slots: &BTreeSet<Timeslot>) {
        for &t in slots {
            self.teacher_slot[t][teacher] = BLOCKED;
        }
    }

    /// Marks atomic-group slots structurally unavailable.
    pub fn seed_group_unavailable(&mut self, atomic: AtomicId, slots: &BTreeSet<Timeslot>) {
        for &t in slots {
            self.group_slot[t][atomic] = BLOCKED;
        }
    }

    /// Scans the resources of `activity` over `start..start+length`.
    ///
    /// Returns the set of occupying activity ids and whether any
    /// [`BLOCKED`] cell was hit. Both empty/false means the span is
    /// free. Choice-list rooms are not scanned; they are resolved
    /// after placement.
    pub fn scan(&self, activity: &Activity, start: Timeslot) -> (BTreeSet<ActivityId>, bool) {
        let mut blockers = BTreeSet::new();
        let mut blocked = false;

        for t in start..start + activity.length {
            for &teacher in &activity.teachers {
                match self.teacher_slot[t][teacher] {
                    FREE => {}
                    BLOCKED => blocked = true,
                    id => {
                        blockers.insert(id);
                    }
                }
            }
            for &atomic in &activity.atomics {
                match self.group_slot[t][atomic] {
                    FREE => {}
                    BLOCKED => blocked = true,
                    id => {
                        blockers.insert(id);
                    }
                }
            }
            for &room in &activity.rooms.singles {
                match self.room_slot[t][room] {
                    FREE => {}
                    BLOCKED => blocked = true,
                    id => {
                        blockers.insert(id);
                    }
                }
            }
        }

        (blockers, blocked)
    }

    /// Commits an activity at `start`. The span must be free.
    pub fn write(&mut self, activity: &Activity, start: Timeslot) {
        for t in start..start + activity.length {
            for &teacher in &activity.teachers {
                debug_assert_eq!(self.teacher_slot[t][teacher], FREE);
                self.teacher_slot[t][teacher] = activity.id;
            }
            for &atomic in &activity.atomics {
                debug_assert_eq!(self.group_slot[t][atomic], FREE);
                self.group_slot[t][atomic] = activity.id;
            }
            for &room in &activity.rooms.singles {
                debug_assert_eq!(self.room_slot[t][room], FREE);
                self.room_slot[t][room] = activity.id;
            }
        }

        let state = &mut self.states[activity.id as usize];
        state.timeslot = start;
        state.rooms.clear();
        state.rooms.extend_from_slice(&activity.rooms.singles);
        state.rooms.resize(activity.required_rooms(), 0);
    }

    /// Reverses [`write`](Self::write) using the stored state,
    /// including any resolved choice rooms.
    pub fn clear(&mut self, activity: &Activity) {
        let start = self.states[activity.id as usize].timeslot;
        debug_assert_ne!(start, 0);
        let rooms = std::mem::take(&mut self.states[activity.id as usize].rooms);

        for t in start..start + activity.length {
            for &teacher in &activity.teachers {
                self.teacher_slot[t][teacher] = FREE;
            }
            for &atomic in &activity.atomics {
                self.group_slot[t][atomic] = FREE;
            }
            for &room in &rooms {
                if room != 0 {
                    self.room_slot[t][room] = FREE;
                }
            }
        }

        let state = &mut self.states[activity.id as usize];
        state.timeslot = 0;
        state.rooms = vec![0; activity.required_rooms()];
    }

    /// Whether a room is free over a span.
    pub fn room_free(&self, room: RoomId, start: Timeslot, length: usize) -> bool {
        (start..start + length).all(|t| self.room_slot[t][room] == FREE)
    }

    /// Allocates a choice room: writes the room cells over the
    /// activity's span and records it in slot `index` of the state's
    /// room list.
    pub fn claim_room(&mut self, activity: &Activity, index: usize, room: RoomId) {
        let start = self.states[activity.id as usize].timeslot;
        debug_assert_ne!(start, 0);
        debug_assert!(self.room_free(room, start, activity.length));
        for t in start..start + activity.length {
            self.room_slot[t][room] = activity.id;
        }
        self.states[activity.id as usize].rooms[index] = room;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rooms::SimplifiedRooms;

    fn activity(id: ActivityId, length: usize) -> Activity {
        Activity {
            id,
            unit: id as usize,
            length,
            teachers: vec![1],
            atomics: vec![1, 2],
            rooms: SimplifiedRooms {
                singles: vec![1],
                choices: vec![vec![2, 3]],
            },
            subject: "Ma".into(),
            group_names: vec![],
            parallel: None,
            fixed_time: None,
        }
    }

    fn store() -> OccupancyStore {
        // 2 days x 4 periods, 2 teachers, 3 atomics, 3 rooms, 4 activities
        let mut s = OccupancyStore::new(8, 2, 3, 3, 4);
        for id in 1..=4 {
            s.init_state(&activity(id, 1));
        }
        s
    }

    #[test]
    fn test_write_and_scan() {
        let mut s = store();
        let a = activity(1, 2);
        s.init_state(&a);

        let (blockers, blocked) = s.scan(&a, 1);
        assert!(blockers.is_empty() && !blocked);

        s.write(&a, 1);
        assert_eq!(s.teacher_at(1, 1), 1);
        assert_eq!(s.teacher_at(2, 1), 1);
        assert_eq!(s.group_at(1, 2), 1);
        assert_eq!(s.room_at(2, 1), 1);
        assert_eq!(s.state(1).timeslot, 1);
        // singleton allocated, choice slot unresolved
        assert_eq!(s.state(1).rooms, vec![1, 0]);

        let b = activity(2, 1);
        let (blockers, blocked) = s.scan(&b, 2);
        assert_eq!(blockers, BTreeSet::from([1]));
        assert!(!blocked);
    }

    #[test]
    fn test_clear_restores_store() {
        let mut s = store();
        let a = activity(1, 2);
        s.init_state(&a);
        let pristine = s.clone();

        s.write(&a, 3);
        assert_ne!(s, pristine);
        s.clear(&a);
        assert_eq!(s, pristine);
    }

    #[test]
    fn test_blocked_cells() {
        let mut s = store();
        s.seed_teacher_unavailable(1, &BTreeSet::from([3, 4]));

        let a = activity(1, 1);
        let (blockers, blocked) = s.scan(&a, 3);
        assert!(blockers.is_empty());
        assert!(blocked);

        let (_, free) = s.scan(&a, 1);
        assert!(!free);
    }

    #[test]
    fn test_claim_room() {
        let mut s = store();
        let a = activity(1, 2);
        s.init_state(&a);
        s.write(&a, 1);

        assert!(s.room_free(2, 1, 2));
        s.claim_room(&a, 1, 2);
        assert_eq!(s.room_at(1, 2), 1);
        assert_eq!(s.room_at(2, 2), 1);
        assert_eq!(s.state(1).rooms, vec![1, 2]);
        assert!(!s.room_free(2, 2, 1));

        // clear releases the claimed room too
        s.clear(&a);
        assert!(s.room_free(2, 1, 2));
        assert_eq!(s.state(1).rooms, vec![0, 0]);
    }
}
