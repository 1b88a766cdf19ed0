//! Structured diagnostics.
//!
//! Domain problems (bad division text, unknown room references,
//! fixed-time clashes) do not abort model building or placement
//! loading: the offending entity is skipped and a [`Diagnostic`] is
//! recorded. The embedder drains the log and decides how to present
//! the entries; each report is also mirrored to the `log` facade at
//! the matching level.

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

/// Classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Two fixed-time activities compete for a resource.
    FixedTimeClash,
    /// The greedy room resolver found no free candidate for a choice list.
    UnassignedChoiceRoom,
    /// A class's division text could not be parsed.
    DivisionSyntax,
    /// A block's room requirements cannot be satisfied even in isolation.
    RoomConflictInBlock,
    /// A room wish references an unknown room or room group.
    InvalidRoomId,
    /// A constraint record names an unknown kind.
    UnknownConstraint,
    /// A constraint record carries an argument outside its legal range.
    ConstraintArgOutOfRange,
    /// A room wish used the `+` flexible-choice marker; the extra
    /// required room is picked greedily from all rooms.
    FlexibleRoomChoice,
    /// An entity was skipped because a reference it depends on was
    /// missing or itself skipped.
    SkippedEntity,
    /// An imported placement record could not be applied.
    PlacementClash,
}

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub kind: DiagnosticKind,
    /// Human-readable description naming the entities involved.
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            kind,
            message: message.into(),
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            kind,
            message: message.into(),
        }
    }

    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            kind,
            message: message.into(),
        }
    }
}

/// Accumulating diagnostic sink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic and mirrors it to the `log` facade.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            DiagnosticLevel::Error => {
                log::error!("{:?}: {}", diagnostic.kind, diagnostic.message)
            }
            DiagnosticLevel::Warning => {
                log::warn!("{:?}: {}", diagnostic.kind, diagnostic.message)
            }
            DiagnosticLevel::Info => {
                log::info!("{:?}: {}", diagnostic.kind, diagnostic.message)
            }
        }
        self.entries.push(diagnostic);
    }

    /// All recorded diagnostics, in report order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Removes and returns all recorded diagnostics.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }

    /// Number of entries of a given kind.
    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Whether any error-level diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.level == DiagnosticLevel::Error)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
