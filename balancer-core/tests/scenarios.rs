//! End-to-end scenarios driving the public balancer API.

use balancer_core::{
    Balancer, BalancerError, LoadHeap, MigrationLimit, RebalanceOutcome, RebalanceTrigger,
    RebalancingConfig,
};

fn config(threshold_pct: f64, interval: u64) -> RebalancingConfig {
    RebalancingConfig {
        threshold_pct,
        interval,
        ..Default::default()
    }
}

/// **Test:** Scenario A - least-loaded selection on idle nodes
///
/// **Expectation:** with three idle nodes the first inserted wins the tie, and
/// after it takes a task one of the two remaining idle nodes comes out next.
#[test]
fn scenario_a_least_loaded_selection() {
    let mut heap = LoadHeap::new(3).unwrap();
    for id in 0..3 {
        heap.insert(id, 0.0).unwrap();
    }

    let first = heap.extract_min().unwrap();
    assert_eq!(first.node_id, 0);
    assert_eq!(first.load, 0.0);

    heap.insert(first.node_id, first.load + 10.0).unwrap();

    let next = heap.extract_min().unwrap();
    assert!(next.node_id == 1 || next.node_id == 2);
    assert_eq!(next.load, 0.0);
}

/// **Test:** Scenario A through the dispatch loop
#[test]
fn scenario_a_dispatch_spreads_over_idle_nodes() {
    let mut balancer = Balancer::new(&[100.0; 3], config(20.0, 1000)).unwrap();

    let reports = balancer.dispatch_all([10.0, 10.0, 10.0]).unwrap();
    let mut ids: Vec<u64> = reports.iter().map(|r| r.node_id).collect();
    assert_eq!(ids[0], 0);
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2]);
}

/// **Test:** Scenario B - imbalance above threshold
///
/// **Expectation:** loads [80, 20] on two nodes of capacity 100, threshold 20:
/// 15 moves from node 0 to node 1, leaving [65, 35].
#[test]
fn scenario_b_migration() {
    let mut balancer = Balancer::new(&[100.0, 100.0], config(20.0, 1000)).unwrap();
    balancer.dispatch(80.0).unwrap();
    balancer.dispatch(20.0).unwrap();

    let outcome = balancer.rebalance().unwrap();
    assert_eq!(
        outcome,
        RebalanceOutcome::Migrated {
            from: 0,
            to: 1,
            amount: 15.0,
            imbalance_before: 60.0,
            from_pct: 80.0,
            to_pct: 20.0,
        }
    );
    assert_eq!(balancer.node(0).unwrap().current_load(), 65.0);
    assert_eq!(balancer.node(1).unwrap().current_load(), 35.0);
    assert_eq!(balancer.heap().load_of(0), Some(65.0));
    assert_eq!(balancer.heap().load_of(1), Some(35.0));
}

/// **Test:** Scenario C - imbalance within threshold
#[test]
fn scenario_c_no_action() {
    let mut balancer = Balancer::new(&[100.0, 100.0], config(70.0, 1000)).unwrap();
    balancer.dispatch(80.0).unwrap();
    balancer.dispatch(20.0).unwrap();

    assert_eq!(
        balancer.rebalance().unwrap(),
        RebalanceOutcome::NoActionTaken
    );
    assert_eq!(balancer.node(0).unwrap().current_load(), 80.0);
    assert_eq!(balancer.node(1).unwrap().current_load(), 20.0);
    assert_eq!(balancer.history().total(), 0);
}

/// **Test:** Scenario D - heap error kinds
#[test]
fn scenario_d_heap_errors() {
    let mut heap = LoadHeap::new(2).unwrap();
    assert_eq!(heap.extract_min().unwrap_err(), BalancerError::Empty);

    heap.insert(0, 5.0).unwrap();
    assert_eq!(
        heap.update_load(9, 1.0).unwrap_err(),
        BalancerError::NodeNotFound(9)
    );
}

/// **Test:** Periodic rebalance inside the dispatch loop
///
/// **Expectation:** with interval 2, the second dispatch sees [80, 20] and
/// migrates; the migration is recorded as periodic at sequence 2.
#[test]
fn periodic_rebalance_is_recorded() {
    let mut balancer = Balancer::new(&[100.0, 100.0], config(20.0, 2)).unwrap();

    let first = balancer.dispatch(80.0).unwrap();
    assert!(first.rebalance.is_none());

    let second = balancer.dispatch(20.0).unwrap();
    assert!(matches!(
        second.rebalance,
        Some(RebalanceOutcome::Migrated { amount, .. }) if amount == 15.0
    ));

    let record = balancer.history().recent(1)[0];
    assert_eq!(record.trigger, RebalanceTrigger::Periodic);
    assert_eq!(record.dispatch_seq, 2);
}

/// **Test:** Headroom cap configured on the balancer
#[test]
fn headroom_limit_through_balancer() {
    let config = RebalancingConfig {
        threshold_pct: 20.0,
        interval: 1000,
        migration_limit: MigrationLimit::RecipientHeadroom,
        ..Default::default()
    };
    let mut balancer = Balancer::new(&[200.0, 10.0], config).unwrap();
    // idle tie goes to node 0
    balancer.dispatch(180.0).unwrap();

    let outcome = balancer.rebalance().unwrap();
    assert!(matches!(
        outcome,
        RebalanceOutcome::Migrated { to: 1, amount, .. } if amount == 10.0
    ));
    assert_eq!(balancer.node(1).unwrap().current_load(), 10.0);
    assert!(balancer.nodes().iter().all(|n| n.utilization_pct() <= 100.0));
}

#[test]
fn dispatch_all_stops_at_first_invalid_task() {
    let mut balancer = Balancer::new(&[100.0, 100.0], config(20.0, 5)).unwrap();

    let err = balancer.dispatch_all([5.0, 7.0, -1.0, 3.0]).unwrap_err();
    assert_eq!(err, BalancerError::InvalidTaskLoad(-1.0));
    assert_eq!(balancer.dispatched(), 2);
    assert_eq!(balancer.total_load(), 12.0);
}
