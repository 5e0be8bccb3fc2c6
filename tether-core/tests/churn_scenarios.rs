//! Churn on the demo topology: four local backends and twelve probe keys.

use std::sync::Arc;

use tether_core::{
    diff, Backend, BackendId, ProbeSet, SharedBackend, Snapshot, Strategy, StrategyKind,
};

fn seeds() -> Vec<SharedBackend> {
    (8081..=8084)
        .map(|port| Arc::new(Backend::new(BackendId::localhost(port))))
        .collect()
}

fn with_8085() -> Vec<SharedBackend> {
    let mut backends = seeds();
    backends.push(Arc::new(Backend::new(BackendId::localhost(8085))));
    backends
}

fn churn_on_add(kind: StrategyKind, probes: &ProbeSet) -> tether_core::Diff {
    let before = Strategy::new(kind, seeds());
    let after = before.reinit(with_8085());
    diff(
        &Snapshot::capture(&before, probes),
        &Snapshot::capture(&after, probes),
    )
}

#[test]
fn adding_a_backend_keeps_a_consistent_hash_key_or_moves_it_to_the_newcomer() {
    let before = Strategy::new(StrategyKind::ConsistentHash, seeds());
    let x = before.select("10.0.0.1").unwrap().id().clone();

    let after = before.reinit(with_8085());
    let now = after.select("10.0.0.1").unwrap().id().clone();
    assert!(now == x || now == BackendId::localhost(8085), "moved to {now}");
}

#[test]
fn simple_hash_churns_far_more_than_consistent_hash_on_the_probe_set() {
    let probes = ProbeSet::demo();
    let simple = churn_on_add(StrategyKind::SimpleHash, &probes);
    let consistent = churn_on_add(StrategyKind::ConsistentHash, &probes);

    assert_eq!(simple.total, 12);
    assert_eq!(consistent.total, 12);
    assert!(simple.moved >= 6, "simple-hash moved {}/12", simple.moved);
    assert!(
        simple.moved > consistent.moved,
        "simple-hash {} vs consistent-hash {}",
        simple.moved,
        consistent.moved
    );
    for row in consistent.rows.iter().filter(|row| row.changed) {
        assert_eq!(row.after, "localhost:8085");
    }
}

#[test]
fn simple_hash_churns_more_than_consistent_hash_on_a_large_sample() {
    let probes = ProbeSet::new((0..2_000).map(|i| format!("client-{i}")));
    let simple = churn_on_add(StrategyKind::SimpleHash, &probes);
    let consistent = churn_on_add(StrategyKind::ConsistentHash, &probes);

    // Hash-modulo relabels about N/(N+1) of the keys, the ring about 1/(N+1).
    assert!(simple.moved_fraction() > 0.6, "{}", simple.moved_fraction());
    assert!(consistent.moved_fraction() < 0.4, "{}", consistent.moved_fraction());
    assert!(simple.moved_fraction() >= consistent.moved_fraction());
}

#[test]
fn removing_a_backend_hands_its_keys_to_the_next_clockwise_survivor() {
    let probes = ProbeSet::demo();
    for victim in 8081..=8084 {
        let before = Strategy::new(StrategyKind::ConsistentHash, seeds());
        let survivors: Vec<_> = seeds()
            .into_iter()
            .filter(|b| b.id().port() != victim)
            .collect();
        let after = before.reinit(survivors);

        let Strategy::ConsistentHash(ring_before) = &before else {
            unreachable!("built as consistent-hash");
        };
        let d = diff(
            &Snapshot::capture(&before, &probes),
            &Snapshot::capture(&after, &probes),
        );

        for row in &d.rows {
            let victim_id = BackendId::localhost(victim).to_string();
            if row.before != victim_id {
                assert!(!row.changed, "{} moved off a surviving backend", row.key);
                continue;
            }

            // Walk clockwise from the key's slot on the old ring to the first
            // entry that does not belong to the removed backend.
            let entries = ring_before.ring().entries();
            let slot = tether_core::load_balancer::hash::hash32(&row.key);
            let start = entries.partition_point(|e| e.position < slot);
            let next = (0..entries.len())
                .map(|step| &entries[(start + step) % entries.len()])
                .find(|e| e.backend.id().port() != victim)
                .unwrap();
            assert_eq!(row.after, next.backend.id().to_string(), "{}", row.key);
        }
    }
}

#[test]
fn switching_strategy_is_reported_as_churn() {
    let probes = ProbeSet::demo();
    let consistent = Strategy::new(StrategyKind::ConsistentHash, seeds());
    let pinned = Strategy::new(StrategyKind::Static, seeds());
    let d = diff(
        &Snapshot::capture(&consistent, &probes),
        &Snapshot::capture(&pinned, &probes),
    );
    let on_first = Snapshot::capture(&consistent, &probes)
        .iter()
        .filter(|(_, backend)| *backend == "localhost:8081")
        .count();
    assert_eq!(d.moved, 12 - on_first);
}
