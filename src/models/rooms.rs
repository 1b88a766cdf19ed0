//! Rooms, room groups, and room-requirement simplification.
//!
//! A course's room wish is a `/`-separated choice list of room tags,
//! e.g. `R1/R2/R3`. The token `$` stands for the owning class's
//! classroom; a room-group name expands to its member list. A trailing
//! `+` asks for one additional room, chosen greedily from all rooms.
//!
//! Because several courses share a lesson block, a block carries a
//! multiset of such choice lists. [`simplify_room_lists`] reduces them
//! to required singletons plus ordered choice lists, or detects that
//! the block can never be roomed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::RoomConflict;
use crate::models::RoomId;

/// A room. Id 0 is the reserved placeholder ("no room").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    /// Short tag used in wishes and text forms (e.g. "R1").
    pub tag: String,
    /// Display name.
    pub name: String,
}

/// Errors raised while parsing a room wish.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WishError {
    /// Token names neither a room nor a room group.
    #[error("unknown room id '{0}'")]
    UnknownRoom(String),
    /// `$` used by a course whose class has no classroom.
    #[error("'$' used but the class has no classroom")]
    NoClassroom,
}

/// One course's parsed room wish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomWish {
    /// Acceptable rooms, in wish order, duplicates removed.
    pub choices: Vec<RoomId>,
    /// Whether the `+` flexible marker was present.
    pub flexible: bool,
}

/// Room arena and named room groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomModel {
    rooms: Vec<Room>,
    by_tag: HashMap<String, RoomId>,
    groups: HashMap<String, Vec<RoomId>>,
}

impl Default for RoomModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomModel {
    /// Creates a model containing only the placeholder room 0.
    pub fn new() -> Self {
        Self {
            rooms: vec![Room {
                id: 0,
                tag: String::new(),
                name: String::new(),
            }],
            by_tag: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// Adds a room and returns its id (1-based).
    pub fn add_room(&mut self, tag: impl Into<String>, name: impl Into<String>) -> RoomId {
        let id = self.rooms.len();
        let tag = tag.into();
        self.by_tag.insert(tag.clone(), id);
        self.rooms.push(Room {
            id,
            tag,
            name: name.into(),
        });
        id
    }

    /// Registers a named room group.
    pub fn add_group(&mut self, name: impl Into<String>, members: Vec<RoomId>) {
        self.groups.insert(name.into(), members);
    }

    pub fn room(&self, id: RoomId) -> &Room {
        &self.rooms[id]
    }

    /// Resolves a room tag to its id.
    pub fn lookup(&self, tag: &str) -> Option<RoomId> {
        self.by_tag.get(tag).copied()
    }

    /// Number of rooms including the placeholder.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.len() == 1
    }

    /// Ids of all real rooms, ascending.
    pub fn all_room_ids(&self) -> Vec<RoomId> {
        (1..self.rooms.len()).collect()
    }

    /// Parses a wish string against this model.
    ///
    /// `classroom` resolves the `$` token. Tokens are matched first
    /// against room tags, then against group names.
    pub fn parse_wish(
        &self,
        text: &str,
        classroom: Option<RoomId>,
    ) -> Result<RoomWish, WishError> {
        let mut text = text.trim();
        let flexible = text.ends_with('+');
        if flexible {
            text = text[..text.len() - 1].trim_end();
        }

        let mut choices: Vec<RoomId> = Vec::new();
        for token in text.split('/') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if token == "$" {
                let room = classroom.ok_or(WishError::NoClassroom)?;
                if !choices.contains(&room) {
                    choices.push(room);
                }
            } else if let Some(id) = self.lookup(token) {
                if !choices.contains(&id) {
                    choices.push(id);
                }
            } else if let Some(members) = self.groups.get(token) {
                for &id in members {
                    if !choices.contains(&id) {
                        choices.push(id);
                    }
                }
            } else {
                return Err(WishError::UnknownRoom(token.to_string()));
            }
        }

        Ok(RoomWish { choices, flexible })
    }
}

/// A block's simplified room requirement.
///
/// The number of required rooms is `singles.len() + choices.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedRooms {
    /// Rooms the block needs unconditionally, ascending by id.
    pub singles: Vec<RoomId>,
    /// Remaining choice lists, shortest first.
    pub choices: Vec<Vec<RoomId>>,
}

impl SimplifiedRooms {
    pub fn required_count(&self) -> usize {
        self.singles.len() + self.choices.len()
    }
}

/// Reduces a block's choice lists to singletons plus choice lists.
///
/// 1. Length-1 lists become required singletons; a room required
///    twice is a conflict.
/// 2. Rooms already required are struck from every remaining list; a
///    list that empties is a conflict, a list that collapses to one
///    room becomes a singleton, and the striking repeats to a
///    fixpoint.
/// 3. Remaining lists are ordered shortest first so the greedy
///    resolver treats the most constrained choice first.
pub fn simplify_room_lists(lists: &[Vec<RoomId>]) -> Result<SimplifiedRooms, RoomConflict> {
    let mut singles: Vec<RoomId> = Vec::new();
    let mut multis: Vec<Vec<RoomId>> = Vec::new();

    for list in lists {
        match list.len() {
            0 => {}
            1 => {
                if singles.contains(&list[0]) {
                    return Err(RoomConflict);
                }
                singles.push(list[0]);
            }
            _ => multis.push(list.clone()),
        }
    }

    loop {
        let mut changed = false;
        let mut remaining = Vec::with_capacity(multis.len());

        for mut list in multis {
            let before = list.len();
            list.retain(|room| !singles.contains(room));
            if list.len() != before {
                changed = true;
            }
            match list.len() {
                0 => return Err(RoomConflict),
                1 => {
                    if singles.contains(&list[0]) {
                        return Err(RoomConflict);
                    }
                    singles.push(list[0]);
                    changed = true;
                }
                _ => remaining.push(list),
            }
        }

        multis = remaining;
        if !changed {
            break;
        }
    }

    singles.sort_unstable();
    multis.sort_by_key(|list| list.len());

    Ok(SimplifiedRooms {
        singles,
        choices: multis,
    })
}
