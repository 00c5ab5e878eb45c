//! Team membership deltas
//!
//! The model proposes a member adjustment (keep, add, remove) for the next
//! project. The new team is always computed locally from that proposal and
//! the employee pool; what the model claims it changed is only compared
//! against the locally computed delta for diagnostics.

use std::collections::BTreeSet;

use crate::synth::types::Employee;

/// Names added to and removed from a team
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl Delta {
    pub fn new<I, J, S, T>(added: I, removed: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            added: added.into_iter().map(Into::into).collect(),
            removed: removed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Delta turning team `prev` into team `next`
pub fn compute_delta<'a>(
    prev: impl IntoIterator<Item = &'a str>,
    next: impl IntoIterator<Item = &'a str>,
) -> Delta {
    let prev: BTreeSet<&str> = prev.into_iter().collect();
    let next: BTreeSet<&str> = next.into_iter().collect();
    Delta::new(next.difference(&prev).copied(), prev.difference(&next).copied())
}

/// The actual delta plus every way the requested one disagrees with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub delta: Delta,
    pub mismatches: Vec<String>,
}

impl Reconciliation {
    pub fn consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Compare the delta the model declared with the one actually applied.
///
/// The actual delta is authoritative and returned unchanged.
pub fn reconcile(requested: &Delta, actual: &Delta) -> Reconciliation {
    let mut mismatches = Vec::new();

    let describe = |what: &str, set: BTreeSet<&String>| {
        format!(
            "{}: {}",
            what,
            set.into_iter().cloned().collect::<Vec<_>>().join(", ")
        )
    };

    let claimed_not_added: BTreeSet<_> = requested.added.difference(&actual.added).collect();
    if !claimed_not_added.is_empty() {
        mismatches.push(describe("declared added but not added", claimed_not_added));
    }
    let added_not_claimed: BTreeSet<_> = actual.added.difference(&requested.added).collect();
    if !added_not_claimed.is_empty() {
        mismatches.push(describe("added without being declared", added_not_claimed));
    }
    let claimed_not_removed: BTreeSet<_> = requested.removed.difference(&actual.removed).collect();
    if !claimed_not_removed.is_empty() {
        mismatches.push(describe("declared removed but still present", claimed_not_removed));
    }
    let removed_not_claimed: BTreeSet<_> = actual.removed.difference(&requested.removed).collect();
    if !removed_not_claimed.is_empty() {
        mismatches.push(describe("removed without being declared", removed_not_claimed));
    }

    Reconciliation {
        delta: actual.clone(),
        mismatches,
    }
}

/// Team = (keep ∪ add) ∩ pool, in pool order; names outside the pool are
/// dropped and returned separately.
pub fn resolve_team<'p>(
    keep: &[String],
    add: &[String],
    pool: &'p [Employee],
) -> (Vec<&'p Employee>, Vec<String>) {
    let wanted: BTreeSet<&str> = keep.iter().chain(add).map(|s| s.trim()).collect();
    let team: Vec<&Employee> = pool
        .iter()
        .filter(|e| wanted.contains(e.name.as_str()))
        .collect();
    let known: BTreeSet<&str> = team.iter().map(|e| e.name.as_str()).collect();
    let unknown = wanted
        .into_iter()
        .filter(|name| !known.contains(name))
        .map(str::to_string)
        .collect();
    (team, unknown)
}
