//! Class divisions and atomic pupil groups.
//!
//! A class may be divided along several independent axes ("divisions"),
//! e.g. language groups and level groups. The division text form is
//!
//! ```text
//! A+BG+R/G=A+BG/B=BG+R;I+II+III
//! ```
//!
//! Divisions are separated by `;`. Within a division the first
//! `/`-segment is the `+`-joined list of primary groups; the remaining
//! segments declare compound groups `Name=P1+P2+…` covering at least
//! two but not all primaries of that division.
//!
//! The Cartesian product of the primary lists yields the **atomic
//! groups** — the smallest pupil units, and the unit of collision
//! bookkeeping. Every group name (primary, compound, or the
//! whole-class `*`) maps to a set of atomic indices.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::DivisionError;

/// One division axis: its primary groups plus declared compounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Division {
    /// Primary groups in declaration order.
    pub primaries: Vec<String>,
    /// Compound groups: name and covered primaries, declaration order.
    pub compounds: Vec<(String, Vec<String>)>,
}

/// Parsed division structure of one class.
///
/// Atomic indices are class-local, contiguous from 0. A class without
/// divisions has the single atomic group `*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassGroups {
    divisions: Vec<Division>,
    /// Display names of the atomic groups ("A.I"), index = atomic index.
    atomics: Vec<String>,
    /// Group name → set of class-local atomic indices. Contains every
    /// primary, every compound, and `*` → all atomics.
    group_to_atoms: HashMap<String, BTreeSet<usize>>,
}

impl ClassGroups {
    /// Groups for an undivided class: one atomic group `*`.
    pub fn undivided() -> Self {
        let mut group_to_atoms = HashMap::new();
        group_to_atoms.insert("*".to_string(), BTreeSet::from([0]));
        Self {
            divisions: Vec::new(),
            atomics: vec!["*".to_string()],
            group_to_atoms,
        }
    }

    /// Parses a division specification.
    ///
    /// Empty (or whitespace-only) text yields the undivided form.
    pub fn parse(text: &str) -> Result<Self, DivisionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::undivided());
        }

        let mut divisions = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for division_text in text.split(';') {
            let division_text = division_text.trim();
            let mut segments = division_text.split('/');
            let primary_text = segments
                .next()
                .ok_or_else(|| DivisionError::Syntax(division_text.to_string()))?;

            let mut primaries = Vec::new();
            for name in primary_text.split('+') {
                let name = name.trim();
                check_name(name, division_text)?;
                if !seen.insert(name.to_string()) {
                    return Err(DivisionError::Duplicate(name.to_string()));
                }
                primaries.push(name.to_string());
            }
            if primaries.len() < 2 {
                return Err(DivisionError::TooFew(division_text.to_string()));
            }

            let mut compounds = Vec::new();
            for segment in segments {
                let segment = segment.trim();
                let (name, members_text) = segment
                    .split_once('=')
                    .ok_or_else(|| DivisionError::Syntax(segment.to_string()))?;
                let name = name.trim();
                check_name(name, segment)?;
                if !seen.insert(name.to_string()) {
                    return Err(DivisionError::Duplicate(name.to_string()));
                }

                let mut members = Vec::new();
                for member in members_text.split('+') {
                    let member = member.trim().to_string();
                    if !primaries.contains(&member) || members.contains(&member) {
                        return Err(DivisionError::CompoundInvalid(segment.to_string()));
                    }
                    members.push(member);
                }
                if members.len() < 2 || members.len() >= primaries.len() {
                    return Err(DivisionError::CompoundInvalid(segment.to_string()));
                }
                compounds.push((name.to_string(), members));
            }

            divisions.push(Division {
                primaries,
                compounds,
            });
        }

        Ok(Self::from_divisions(divisions))
    }

    fn from_divisions(divisions: Vec<Division>) -> Self {
        // Strides for the mixed-radix atomic index: the last division
        // varies fastest.
        let sizes: Vec<usize> = divisions.iter().map(|d| d.primaries.len()).collect();
        let count: usize = sizes.iter().product();
        let mut strides = vec![1usize; sizes.len()];
        for i in (0..sizes.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * sizes[i + 1];
        }

        let mut atomics = Vec::with_capacity(count);
        for index in 0..count {
            let parts: Vec<&str> = divisions
                .iter()
                .enumerate()
                .map(|(d, division)| {
                    division.primaries[(index / strides[d]) % sizes[d]].as_str()
                })
                .collect();
            atomics.push(parts.join("."));
        }

        let mut group_to_atoms: HashMap<String, BTreeSet<usize>> = HashMap::new();
        group_to_atoms.insert("*".to_string(), (0..count).collect());

        for (d, division) in divisions.iter().enumerate() {
            for (position, primary) in division.primaries.iter().enumerate() {
                let atoms: BTreeSet<usize> = (0..count)
                    .filter(|i| (i / strides[d]) % sizes[d] == position)
                    .collect();
                group_to_atoms.insert(primary.clone(), atoms);
            }
            for (name, members) in &division.compounds {
                let mut atoms = BTreeSet::new();
                for member in members {
                    atoms.extend(group_to_atoms[member].iter().copied());
                }
                group_to_atoms.insert(name.clone(), atoms);
            }
        }

        Self {
            divisions,
            atomics,
            group_to_atoms,
        }
    }

    /// Number of atomic groups (always at least 1).
    pub fn atomic_count(&self) -> usize {
        self.atomics.len()
    }

    /// Display name of an atomic group.
    pub fn atomic_name(&self, index: usize) -> &str {
        &self.atomics[index]
    }

    /// Atomic indices covered by a group name (`*`, primary, or
    /// compound). `None` for unknown names.
    pub fn atomic_indices(&self, group: &str) -> Option<&BTreeSet<usize>> {
        self.group_to_atoms.get(group)
    }

    /// Whether the class declares any divisions.
    pub fn is_divided(&self) -> bool {
        !self.divisions.is_empty()
    }

    pub fn divisions(&self) -> &[Division] {
        &self.divisions
    }

    /// Canonical text form. Deterministic: divisions in insertion
    /// order, primaries in insertion order, compounds in declaration
    /// order. Undivided classes emit the empty string.
    pub fn emit(&self) -> String {
        self.divisions
            .iter()
            .map(|division| {
                let mut text = division.primaries.join("+");
                for (name, members) in &division.compounds {
                    text.push('/');
                    text.push_str(name);
                    text.push('=');
                    text.push_str(&members.join("+"));
                }
                text
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

fn check_name(name: &str, context: &str) -> Result<(), DivisionError> {
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric()) {
        return Err(DivisionError::Syntax(context.to_string()));
    }
    Ok(())
}
