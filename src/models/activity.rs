//! The placeable activity.
//!
//! An activity is the materialised form of one lesson unit: the
//! unit's length, plus everything its block pulls together — the
//! union of teachers, the union of atomic groups across all (class,
//! group) pairs, and the block's simplified room requirement. It is
//! the only object the placement layer and the occupancy store deal
//! in; courses and blocks never appear on the hot path.
//!
//! Activities reference entities by integer id into the engine's
//! arenas; there are no back-pointers.

use serde::{Deserialize, Serialize};

use crate::models::rooms::SimplifiedRooms;
use crate::models::{ActivityId, AtomicId, TeacherId, Timeslot};

/// A placeable lesson, derived from a lesson unit and its block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// 1-based activity id; 0 is never used.
    pub id: ActivityId,
    /// 1-based lesson-unit id this activity realises.
    pub unit: usize,
    /// Length in consecutive periods.
    pub length: usize,
    /// Teacher ids of all courses in the block, ascending, sentinel
    /// 0 excluded.
    pub teachers: Vec<TeacherId>,
    /// Global atomic-group ids of all (class, group) pairs in the
    /// block, ascending, deduplicated.
    pub atomics: Vec<AtomicId>,
    /// Simplified room requirement of the block.
    pub rooms: SimplifiedRooms,
    /// Subject tag for display.
    pub subject: String,
    /// Display forms of the block's (class, group) pairs, e.g.
    /// `10A.G`.
    pub group_names: Vec<String>,
    /// Index of the parallel tag linking this activity, if any.
    pub parallel: Option<usize>,
    /// Timeslot the lesson unit is pinned to, if any.
    pub fixed_time: Option<Timeslot>,
}

impl Activity {
    /// Total number of rooms a placement must allocate.
    pub fn required_rooms(&self) -> usize {
        self.rooms.required_count()
    }

    /// Whether the activity occupies any teacher, group, or room
    /// resource at all. Resource-free activities are placeable
    /// anywhere within a day.
    pub fn has_resources(&self) -> bool {
        !self.teachers.is_empty() || !self.atomics.is_empty() || self.required_rooms() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rooms() {
        let a = Activity {
            id: 1,
            unit: 1,
            length: 2,
            teachers: vec![3],
            atomics: vec![1, 2],
            rooms: SimplifiedRooms {
                singles: vec![4],
                choices: vec![vec![1, 2]],
            },
            subject: "Ma".into(),
            group_names: vec!["10A.*".into()],
            parallel: None,
            fixed_time: None,
        };
        assert_eq!(a.required_rooms(), 2);
        assert!(a.has_resources());
    }

    #[test]
    fn test_resource_free_activity() {
        let a = Activity {
            id: 1,
            unit: 1,
            length: 1,
            teachers: vec![],
            atomics: vec![],
            rooms: SimplifiedRooms::default(),
            subject: "AG".into(),
            group_names: vec![],
            parallel: None,
            fixed_time: None,
        };
        assert!(!a.has_resources());
    }
}
