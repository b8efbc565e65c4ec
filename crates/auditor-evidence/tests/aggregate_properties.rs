//! Aggregation properties over mixed multi-goal input.

use auditor_evidence::{aggregate, Evidence};

fn sample() -> Vec<Evidence> {
    vec![
        Evidence::new("git_forensic_analysis", true, None, "/tmp/repo", "3 commits", 0.9).unwrap(),
        Evidence::new(
            "git_forensic_analysis",
            true,
            Some("src/state.py".into()),
            "report.pdf",
            "1 path",
            0.8,
        )
        .unwrap(),
        Evidence::new("graph_orchestration", false, None, "/tmp/repo", "no marker", 0.1).unwrap(),
        Evidence::new("graph_orchestration", false, None, "report.pdf", "0 paths", 0.2).unwrap(),
        Evidence::new("state_management", true, None, "/tmp/repo", "2 commits", 0.9).unwrap(),
    ]
}

#[test]
fn total_matches_input_length() {
    let input = sample();
    for n in 0..=input.len() {
        assert_eq!(aggregate(&input[..n]).total_evidences, n);
    }
}

#[test]
fn every_record_is_in_exactly_its_own_group() {
    let input = sample();
    let agg = aggregate(&input);
    for e in &input {
        assert!(agg.for_goal(&e.goal).contains(e));
        let other_groups = agg
            .by_goal
            .iter()
            .filter(|(goal, _)| *goal != &e.goal)
            .filter(|(_, items)| items.contains(e))
            .count();
        assert_eq!(other_groups, 0, "{e:?} leaked into another goal");
    }
    let grouped: usize = agg.by_goal.values().map(Vec::len).sum();
    assert_eq!(grouped, input.len());
}

#[test]
fn permuted_input_yields_same_groups_as_sets() {
    let forward = sample();
    let mut reversed = forward.clone();
    reversed.reverse();

    let a = aggregate(&forward);
    let b = aggregate(&reversed);
    assert_eq!(a.total_evidences, b.total_evidences);
    assert_eq!(a.found_total, b.found_total);
    assert_eq!(
        a.by_goal.keys().collect::<Vec<_>>(),
        b.by_goal.keys().collect::<Vec<_>>()
    );
    for (goal, items) in &a.by_goal {
        let other = &b.by_goal[goal];
        assert_eq!(items.len(), other.len());
        assert!(items.iter().all(|e| other.contains(e)));
    }
}
