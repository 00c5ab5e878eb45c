//! Tests for team adjustment between consecutive projects

use super::common::*;

use org_synth::synth::reconcile::{compute_delta, reconcile, resolve_team, Delta};
use org_synth::synth::types::Employee;

fn names(team: &[&Employee]) -> Vec<String> {
    team.iter().map(|e| e.name.clone()).collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Resolving the next team
// ============================================================================

#[test]
fn test_next_team_is_keep_plus_add_within_pool() {
    let pool = sample_roster(1, 2, 7);
    let keep = strings(&["员工01", "员工02", "员工04"]);
    let add = strings(&["员工09", "员工10", "外部专家"]);

    let (team, unknown) = resolve_team(&keep, &add, &pool);

    assert_eq!(
        names(&team),
        strings(&["员工01", "员工02", "员工04", "员工09", "员工10"])
    );
    assert_eq!(unknown, strings(&["外部专家"]));
}

#[test]
fn test_duplicates_and_whitespace_collapse() {
    let pool = sample_roster(0, 1, 3);
    let keep = strings(&["员工01", " 员工02 "]);
    let add = strings(&["员工02", "员工01"]);

    let (team, unknown) = resolve_team(&keep, &add, &pool);
    assert_eq!(names(&team), strings(&["员工01", "员工02"]));
    assert!(unknown.is_empty());
}

// ============================================================================
// Declared versus actual change
// ============================================================================

#[test]
fn test_declared_delta_is_diagnostic_only() {
    let pool = sample_roster(1, 1, 6);
    let previous = ["员工01", "员工02", "员工03", "员工04"];
    let keep = strings(&["员工01", "员工02", "员工03"]);
    let add = strings(&["员工07", "外部专家"]);

    let (team, _) = resolve_team(&keep, &add, &pool);
    let next = names(&team);
    let actual = compute_delta(previous, next.iter().map(String::as_str));
    assert_eq!(actual, Delta::new(["员工07"], ["员工04"]));

    // The model claims to have added the outsider and removed a member it kept
    let requested = Delta::new(["员工07", "外部专家"], ["员工04", "员工03"]);
    let result = reconcile(&requested, &actual);

    assert!(!result.consistent());
    assert_eq!(result.delta, actual);
    assert_eq!(result.mismatches.len(), 2);
    assert!(result.mismatches[0].contains("外部专家"));
    assert!(result.mismatches[1].contains("员工03"));
}

#[test]
fn test_matching_declaration_is_consistent() {
    let actual = compute_delta(["甲", "乙"], ["乙", "丙"]);
    let requested = Delta::new(["丙"], ["甲"]);
    assert!(reconcile(&requested, &actual).consistent());
    assert!(!actual.is_empty());
    assert!(compute_delta(["甲"], ["甲"]).is_empty());
}
