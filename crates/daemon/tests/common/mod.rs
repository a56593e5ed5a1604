// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for loopback cluster tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mx_adapters::{Request, Response, TcpPeerAdapter, TracedPeerAdapter};
use mx_core::{
    CoordinatorConfig, CycleConfig, ExclusionCoordinator, NodeId, PeerId, UseReceipt,
};
use mx_daemon::lifecycle::Config;
use mx_daemon::server::{serve, NodeService, Service};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub type TcpCoordinator = ExclusionCoordinator<TracedPeerAdapter<TcpPeerAdapter>>;

pub fn node(id: u32) -> NodeId {
    NodeId::new(id).unwrap()
}

/// Bind `count` loopback listeners and return them with their addresses
pub async fn bind_all(count: usize) -> (Vec<TcpListener>, Vec<String>) {
    let mut listeners = Vec::new();
    let mut addrs = Vec::new();
    for _ in 0..count {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        addrs.push(listener.local_addr().unwrap().to_string());
        listeners.push(listener);
    }
    (listeners, addrs)
}

/// Every address except the one at `own`
pub fn peers_of(addrs: &[String], own: usize) -> Vec<PeerId> {
    addrs
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != own)
        .map(|(_, addr)| PeerId::new(addr.clone()).unwrap())
        .collect()
}

/// Coordinators served over TCP without resource cycles; ids start at 1
pub async fn serve_coordinators(count: usize) -> (Vec<TcpCoordinator>, Vec<JoinHandle<()>>) {
    let (listeners, addrs) = bind_all(count).await;
    let mut coordinators = Vec::new();
    let mut servers = Vec::new();

    for (i, listener) in listeners.into_iter().enumerate() {
        let coordinator = ExclusionCoordinator::new(
            node(i as u32 + 1),
            peers_of(&addrs, i),
            TracedPeerAdapter::new(TcpPeerAdapter::new()),
            CoordinatorConfig::default(),
        );
        let service = Arc::new(NodeService::new(coordinator.clone()));
        servers.push(tokio::spawn(serve(listener, service, 64)));
        coordinators.push(coordinator);
    }

    (coordinators, servers)
}

/// Node config for a loopback cluster member
pub fn node_config(id: u32, listen: &str, resource: &str, peers: Vec<PeerId>) -> Config {
    Config {
        node: node(id),
        listen: listen.to_string(),
        resource: resource.to_string(),
        peers,
        coordinator: CoordinatorConfig::default(),
        cycle: CycleConfig::default()
            .with_interval(Duration::from_millis(20), Duration::from_millis(80))
            .with_hold_time(Duration::from_millis(10)),
        max_connections: 64,
    }
}

/// Printer stand-in that records how many jobs overlapped
#[derive(Default)]
pub struct OverlapPrinter {
    in_use: AtomicUsize,
    max_in_use: AtomicUsize,
    jobs: AtomicUsize,
}

impl OverlapPrinter {
    pub fn max_in_use(&self) -> usize {
        self.max_in_use.load(Ordering::SeqCst)
    }

    pub fn jobs(&self) -> usize {
        self.jobs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Service for OverlapPrinter {
    async fn handle(&self, request: Request) -> Response {
        let Request::UseResource(request) = request else {
            return Response::error("printer only serves UseResource");
        };
        let now = self.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_use.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(15)).await;

        self.in_use.fetch_sub(1, Ordering::SeqCst);
        let job = self.jobs.fetch_add(1, Ordering::SeqCst) + 1;
        Response::Used(UseReceipt {
            success: true,
            confirmation: format!("Print #{} completed", job),
            timestamp: request.timestamp,
        })
    }
}

/// Poll `condition` until it holds, failing the test after five seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
