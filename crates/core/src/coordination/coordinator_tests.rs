// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::{FakeNetwork, LinkFault};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

fn node(id: u32) -> NodeId {
    NodeId::new(id).unwrap()
}

fn addr(id: u32) -> PeerId {
    PeerId::new(format!("node-{}", id)).unwrap()
}

struct Cluster {
    network: FakeNetwork,
    nodes: Vec<ExclusionCoordinator<FakeNetwork>>,
}

impl Cluster {
    fn new(size: u32) -> Self {
        Self::with_config(size, CoordinatorConfig::default())
    }

    fn with_config(size: u32, config: CoordinatorConfig) -> Self {
        let network = FakeNetwork::new();
        let nodes = (1..=size)
            .map(|id| {
                let peers = (1..=size).filter(|p| *p != id).map(addr).collect();
                let coordinator =
                    ExclusionCoordinator::new(node(id), peers, network.clone(), config.clone());
                network.register(addr(id), Arc::new(coordinator.clone()));
                coordinator
            })
            .collect();
        Self { network, nodes }
    }

    /// Node with the given 1-based id
    fn get(&self, id: u32) -> ExclusionCoordinator<FakeNetwork> {
        self.nodes[(id - 1) as usize].clone()
    }
}

/// Let every runnable task make progress
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn inbound(requester: u32, timestamp: u64) -> AccessRequest {
    AccessRequest {
        requester: node(requester),
        timestamp,
        request_number: 1,
    }
}

// =============================================================================
// Local acquire/release
// =============================================================================

#[tokio::test]
async fn lone_node_acquires_immediately() {
    let solo = ExclusionCoordinator::new(
        node(1),
        Vec::new(),
        FakeNetwork::new(),
        CoordinatorConfig::default(),
    );

    let pending = solo.acquire().await.unwrap();

    assert_eq!(pending.timestamp, 1);
    assert_eq!(pending.request_number, 1);
    assert_eq!(solo.state(), NodeState::Held);
}

#[tokio::test]
async fn duplicate_peers_are_collapsed() {
    let coordinator = ExclusionCoordinator::new(
        node(1),
        vec![addr(2), addr(2), addr(3)],
        FakeNetwork::new(),
        CoordinatorConfig::default(),
    );
    assert_eq!(coordinator.peers(), &[addr(2), addr(3)]);
}

#[tokio::test]
async fn acquire_while_held_is_rejected() {
    let cluster = Cluster::new(2);
    let a = cluster.get(1);
    a.acquire().await.unwrap();

    assert_eq!(
        a.acquire().await,
        Err(CoordinatorError::AlreadyRequested(NodeState::Held))
    );
}

#[tokio::test]
async fn release_without_holding_is_rejected() {
    let cluster = Cluster::new(2);
    assert_eq!(
        cluster.get(1).release().await,
        Err(CoordinatorError::NotHeld(NodeState::Released))
    );
}

#[tokio::test]
async fn release_returns_to_released_and_notifies_peers() {
    let cluster = Cluster::new(3);
    let a = cluster.get(1);

    a.acquire().await.unwrap();
    a.release().await.unwrap();

    assert_eq!(a.state(), NodeState::Released);
    let status = a.status();
    assert_eq!(status.pending_replies, 0);
    assert_eq!(status.deferred, 0);
    for peer in [2, 3] {
        let releases = cluster.network.releases_to(&addr(peer));
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].requester, node(1));
        assert_eq!(releases[0].request_number, 1);
    }
}

#[tokio::test]
async fn request_numbers_increase_per_cycle() {
    let cluster = Cluster::new(2);
    let a = cluster.get(1);

    let first = a.acquire().await.unwrap();
    a.release().await.unwrap();
    let second = a.acquire().await.unwrap();

    assert_eq!(first.request_number, 1);
    assert_eq!(second.request_number, 2);
    assert!(second.timestamp > first.timestamp);
}

#[tokio::test]
async fn acquire_fans_out_to_every_peer() {
    let cluster = Cluster::new(4);
    let a = cluster.get(1);

    let pending = a.acquire().await.unwrap();

    for peer in [2, 3, 4] {
        let requests = cluster.network.requests_to(&addr(peer));
        assert_eq!(
            requests,
            vec![AccessRequest {
                requester: node(1),
                timestamp: pending.timestamp,
                request_number: 1,
            }]
        );
    }
}

#[tokio::test]
async fn grants_advance_requester_clock() {
    let cluster = Cluster::new(2);
    let a = cluster.get(1);
    let b = cluster.get(2);
    b.clock().merge(40);

    a.acquire().await.unwrap();

    // b merges the request to 42 and grants at 43; a merges the grant to 44
    assert_eq!(a.clock().peek(), 44);
}

#[tokio::test]
async fn watch_reports_transitions() {
    let cluster = Cluster::new(2);
    let a = cluster.get(1);
    let mut states = a.watch_state();
    assert_eq!(*states.borrow(), NodeState::Released);

    a.acquire().await.unwrap();
    assert_eq!(*states.borrow_and_update(), NodeState::Held);

    a.release().await.unwrap();
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), NodeState::Released);
}

// =============================================================================
// Inbound handlers
// =============================================================================

#[tokio::test]
async fn released_node_grants_immediately() {
    let cluster = Cluster::new(2);
    let b = cluster.get(2);

    let response = b.request_access(inbound(1, 5)).await;

    assert!(response.granted);
    // merge(5) -> 6, then tick for the reply -> 7
    assert_eq!(response.timestamp, 7);
    assert_eq!(b.state(), NodeState::Released);
}

#[tokio::test(start_paused = true)]
async fn held_node_defers_until_release() {
    let cluster = Cluster::new(2);
    let a = cluster.get(1);
    a.acquire().await.unwrap();

    let handler = {
        let a = a.clone();
        tokio::spawn(async move { a.request_access(inbound(2, 1)).await })
    };
    settle().await;

    assert!(!handler.is_finished());
    assert_eq!(a.status().deferred, 1);

    a.release().await.unwrap();
    let response = handler.await.unwrap();

    assert!(response.granted);
    assert_eq!(a.status().deferred, 0);
}

#[tokio::test(start_paused = true)]
async fn wanted_node_grants_older_request_and_defers_newer() {
    let config = CoordinatorConfig::default().with_request_timeout(Duration::from_secs(3600));
    let cluster = Cluster::with_config(2, config);
    cluster.network.set_fault(&addr(2), LinkFault::Silent);
    let a = cluster.get(1);
    a.clock().merge(9);

    // a is stuck in Wanted with (11, 1) while its only peer stays silent
    let acquire = {
        let a = a.clone();
        tokio::spawn(async move { a.acquire().await })
    };
    settle().await;
    assert_eq!(a.state(), NodeState::Wanted);

    let older = a.request_access(inbound(3, 4)).await;
    assert!(older.granted);

    let newer = {
        let a = a.clone();
        tokio::spawn(async move { a.request_access(inbound(3, 30)).await })
    };
    settle().await;
    assert!(!newer.is_finished());
    assert_eq!(a.status().deferred, 1);

    acquire.abort();
}

#[tokio::test]
async fn release_notice_only_merges_clock() {
    let cluster = Cluster::new(2);
    let b = cluster.get(2);

    b.release_access(ReleaseNotice {
        requester: node(1),
        timestamp: 50,
        request_number: 3,
    })
    .await;

    assert_eq!(b.clock().peek(), 51);
    assert_eq!(b.state(), NodeState::Released);
}

// =============================================================================
// Priority and ordering
// =============================================================================

#[tokio::test(start_paused = true)]
async fn equal_timestamps_resolve_to_lower_id() {
    let cluster = Cluster::new(2);
    let a = cluster.get(1);
    let b = cluster.get(2);
    a.clock().merge(3);
    b.clock().merge(3);

    let a_task = {
        let a = a.clone();
        tokio::spawn(async move { a.acquire().await })
    };
    let b_task = {
        let b = b.clone();
        tokio::spawn(async move { b.acquire().await })
    };

    let a_pending = a_task.await.unwrap().unwrap();
    settle().await;

    assert_eq!(a_pending.timestamp, 5);
    assert_eq!(a.state(), NodeState::Held);
    assert_eq!(b.state(), NodeState::Wanted);
    assert_eq!(a.status().deferred, 1);
    assert!(!b_task.is_finished());

    a.release().await.unwrap();
    let b_pending = b_task.await.unwrap().unwrap();

    assert_eq!(b_pending.timestamp, 5);
    assert_eq!(b.state(), NodeState::Held);
    assert_eq!(a.state(), NodeState::Released);
}

#[tokio::test(start_paused = true)]
async fn three_node_scenario() {
    let cluster = Cluster::new(3);
    let a = cluster.get(1);
    let b = cluster.get(2);
    let c = cluster.get(3);
    let order = Arc::new(Mutex::new(Vec::new()));

    let spawn_cycle = |coordinator: ExclusionCoordinator<FakeNetwork>| {
        let order = Arc::clone(&order);
        tokio::spawn(async move {
            let pending = coordinator.acquire().await.unwrap();
            order
                .lock()
                .unwrap()
                .push((coordinator.node().get(), pending.timestamp));
            tokio::time::sleep(Duration::from_secs(2)).await;
            coordinator.release().await.unwrap();
        })
    };

    let a_task = spawn_cycle(a.clone());
    let b_task = spawn_cycle(b.clone());
    settle().await;

    // Both requests carried timestamp 1; A's (1, 1) beats B's (1, 2)
    assert_eq!(a.state(), NodeState::Held);
    assert_eq!(b.state(), NodeState::Wanted);
    assert_eq!(c.state(), NodeState::Released);
    assert_eq!(cluster.network.requests_to(&addr(3)).len(), 2);
    assert_eq!(c.status().deferred, 0);

    a_task.await.unwrap();
    b_task.await.unwrap();

    assert_eq!(*order.lock().unwrap(), vec![(1, 1), (2, 1)]);
    assert_eq!(b.state(), NodeState::Released);
}

// =============================================================================
// Deferred flush and mutual exclusion
// =============================================================================

#[tokio::test(start_paused = true)]
async fn release_flushes_every_deferred_reply() {
    let cluster = Cluster::new(4);
    let a = cluster.get(1);
    a.acquire().await.unwrap();

    let held = Arc::new(AtomicUsize::new(0));
    let max_held = Arc::new(AtomicUsize::new(0));
    let waiters: Vec<_> = [2, 3, 4]
        .into_iter()
        .map(|id| {
            let coordinator = cluster.get(id);
            let held = Arc::clone(&held);
            let max_held = Arc::clone(&max_held);
            tokio::spawn(async move {
                coordinator.acquire().await.unwrap();
                let now = held.fetch_add(1, Ordering::SeqCst) + 1;
                max_held.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                held.fetch_sub(1, Ordering::SeqCst);
                coordinator.release().await.unwrap();
            })
        })
        .collect();
    settle().await;

    assert_eq!(a.status().deferred, 3);
    assert!(waiters.iter().all(|w| !w.is_finished()));

    a.release().await.unwrap();
    assert_eq!(a.status().deferred, 0);

    for waiter in waiters {
        waiter.await.unwrap();
    }
    assert_eq!(max_held.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn at_most_one_node_holds_at_any_instant() {
    let cluster = Cluster::new(5);
    let held = Arc::new(AtomicUsize::new(0));
    let max_held = Arc::new(AtomicUsize::new(0));
    let entries = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (1..=5)
        .map(|id| {
            let coordinator = cluster.get(id);
            let held = Arc::clone(&held);
            let max_held = Arc::clone(&max_held);
            let entries = Arc::clone(&entries);
            tokio::spawn(async move {
                for round in 0..3u64 {
                    tokio::time::sleep(Duration::from_millis(u64::from(id) * 7 + round * 3)).await;
                    coordinator.acquire().await.unwrap();
                    assert_eq!(coordinator.state(), NodeState::Held);
                    let now = held.fetch_add(1, Ordering::SeqCst) + 1;
                    max_held.fetch_max(now, Ordering::SeqCst);
                    entries.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    held.fetch_sub(1, Ordering::SeqCst);
                    coordinator.release().await.unwrap();
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(max_held.load(Ordering::SeqCst), 1);
    assert_eq!(entries.load(Ordering::SeqCst), 15);
    for id in 1..=5 {
        assert_eq!(cluster.get(id).state(), NodeState::Released);
    }
}

// =============================================================================
// Fault handling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn silent_peer_is_pruned_after_timeout() {
    let config = CoordinatorConfig::default().with_request_timeout(Duration::from_secs(1));
    let cluster = Cluster::with_config(3, config);
    cluster.network.set_fault(&addr(3), LinkFault::Silent);
    let a = cluster.get(1);

    let started = Instant::now();
    a.acquire().await.unwrap();

    assert_eq!(a.state(), NodeState::Held);
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(a.status().pending_replies, 0);
}

#[tokio::test]
async fn unreachable_peer_counts_as_granted() {
    let cluster = Cluster::new(3);
    cluster.network.set_fault(&addr(2), LinkFault::Unreachable);
    let a = cluster.get(1);

    a.acquire().await.unwrap();

    assert_eq!(a.state(), NodeState::Held);
}

#[tokio::test(start_paused = true)]
async fn release_completes_despite_silent_peer() {
    let config = CoordinatorConfig::default().with_release_timeout(Duration::from_millis(200));
    let cluster = Cluster::with_config(3, config);
    let a = cluster.get(1);
    a.acquire().await.unwrap();
    cluster.network.set_fault(&addr(2), LinkFault::Silent);

    let started = Instant::now();
    a.release().await.unwrap();

    assert_eq!(a.state(), NodeState::Released);
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(started.elapsed() < Duration::from_secs(2));
}
