//! Penalty accumulation and incremental re-scoring.
//!
//! The evaluator caches one penalty per catalogue entry. A full pass
//! scores everything and primes the cache; after that, moving one
//! activity only re-scores the constraints whose
//! [`depends_on`](crate::constraints::ConstraintKind::depends_on)
//! says they observe it, and the week total is re-summed from the
//! cache. Any broken hard constraint makes the total
//! [`INFINITE_PENALTY`].

use serde::{Deserialize, Serialize};

use crate::constraints::{Constraint, EvalContext, INFINITE_PENALTY};
use crate::models::Activity;

/// One constraint's contribution to an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakage {
    /// Catalogue id of the broken constraint.
    pub constraint: usize,
    pub count: u64,
    pub description: String,
}

/// Result of an evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Total weighted penalty; [`INFINITE_PENALTY`] if any hard
    /// constraint is broken.
    pub penalty: u64,
    /// Broken constraints seen by this pass. A delta pass reports
    /// only the re-scored ones.
    pub breakages: Vec<Breakage>,
}

/// Caching penalty evaluator.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    /// Penalty per catalogue id, valid once primed.
    cached: Vec<u64>,
    primed: bool,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the cache; the next delta pass runs a full pass first.
    /// Call when the catalogue changes.
    pub fn invalidate(&mut self) {
        self.primed = false;
    }

    /// Scores every enabled constraint and primes the cache.
    pub fn full(&mut self, constraints: &[Constraint], ctx: &EvalContext) -> Evaluation {
        self.cached.clear();
        self.cached.resize(constraints.len(), 0);
        let mut breakages = Vec::new();
        for constraint in constraints {
            if let Some(b) = self.score(constraint, ctx) {
                breakages.push(b);
            }
        }
        self.primed = true;
        Evaluation {
            penalty: self.total(),
            breakages,
        }
    }

    /// Re-scores only the constraints observing `activity` and
    /// combines with the cached rest.
    pub fn delta(
        &mut self,
        constraints: &[Constraint],
        ctx: &EvalContext,
        activity: &Activity,
    ) -> Evaluation {
        if !self.primed || self.cached.len() != constraints.len() {
            return self.full(constraints, ctx);
        }
        let mut breakages = Vec::new();
        for constraint in constraints {
            if !constraint.kind.depends_on(activity, ctx.activities) {
                continue;
            }
            if let Some(b) = self.score(constraint, ctx) {
                breakages.push(b);
            }
        }
        Evaluation {
            penalty: self.total(),
            breakages,
        }
    }

    /// Scores one constraint into the cache; returns its breakage
    /// record if it is broken.
    fn score(&mut self, constraint: &Constraint, ctx: &EvalContext) -> Option<Breakage> {
        if !constraint.weight.is_enabled() {
            self.cached[constraint.id] = 0;
            return None;
        }
        let count = constraint.kind.breakages(ctx);
        self.cached[constraint.id] = constraint.weight.penalty(count);
        if count == 0 {
            return None;
        }
        Some(Breakage {
            constraint: constraint.id,
            count,
            description: format!("{}: {count} breakage(s)", constraint.kind.label()),
        })
    }

    fn total(&self) -> u64 {
        let mut total: u64 = 0;
        for &penalty in &self.cached {
            if penalty == INFINITE_PENALTY {
                return INFINITE_PENALTY;
            }
            total = total.saturating_add(penalty);
        }
        total
    }
}
