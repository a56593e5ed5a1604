// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acquire → use → release loop driving one node

use crate::adapters::{PeerAdapter, ResourceAdapter, ResourceError};
use crate::config::CycleConfig;
use crate::coordination::{CoordinatorError, ExclusionCoordinator, PendingRequest};
use crate::message::{UseReceipt, UseRequest};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Result of the resource call inside one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseOutcome {
    Completed(UseReceipt),
    Failed(ResourceError),
}

/// Summary of one completed acquire/use/release cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub request_number: u64,
    /// Clock value carried by the use request
    pub timestamp: u64,
    pub outcome: UseOutcome,
}

/// Cooperative stop flag, observed between cycles only
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Repeatedly acquires the resource, uses it, and releases it
pub struct ResourceCycle<P, R> {
    coordinator: ExclusionCoordinator<P>,
    resource: R,
    config: CycleConfig,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl<P: PeerAdapter, R: ResourceAdapter> ResourceCycle<P, R> {
    pub fn new(coordinator: ExclusionCoordinator<P>, resource: R, config: CycleConfig) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            coordinator,
            resource,
            config,
            stop_tx: Arc::new(stop_tx),
        }
    }

    pub fn coordinator(&self) -> &ExclusionCoordinator<P> {
        &self.coordinator
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Run cycles at randomized intervals until stopped
    ///
    /// A stop request can cut short the idle wait before a cycle, but never a
    /// cycle already in progress. Returns the number of completed cycles.
    pub async fn run(&self) -> Result<u64, CoordinatorError> {
        let mut stop = self.stop_tx.subscribe();
        let mut completed = 0;

        loop {
            if *stop.borrow_and_update() {
                break;
            }

            let delay = self.next_delay();
            info!(
                node = %self.coordinator.node(),
                ?delay,
                "next request scheduled"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop_requested(&mut stop) => break,
            }

            self.run_once().await?;
            completed += 1;
        }

        info!(node = %self.coordinator.node(), completed, "resource cycle stopped");
        Ok(completed)
    }

    /// One full cycle; the resource is released even when its use fails
    pub async fn run_once(&self) -> Result<CycleReport, CoordinatorError> {
        let pending = self.coordinator.acquire().await?;
        let (timestamp, outcome) = self.use_resource(pending).await;

        if !self.config.hold_time.is_zero() {
            tokio::time::sleep(self.config.hold_time).await;
        }
        self.coordinator.release().await?;

        Ok(CycleReport {
            request_number: pending.request_number,
            timestamp,
            outcome,
        })
    }

    async fn use_resource(&self, pending: PendingRequest) -> (u64, UseOutcome) {
        let node = self.coordinator.node();
        let timestamp = self.coordinator.clock().tick();
        let request = UseRequest {
            client: node,
            content: format!("Message {} from node {}", pending.request_number, node),
            timestamp,
            request_number: pending.request_number,
        };
        info!(%node, ts = timestamp, content = %request.content, "using resource");

        let timeout = self.config.resource_timeout;
        let outcome = match tokio::time::timeout(timeout, self.resource.use_resource(request)).await
        {
            Ok(Ok(receipt)) => {
                if receipt.success {
                    info!(%node, confirmation = %receipt.confirmation, "resource use confirmed");
                } else {
                    warn!(%node, confirmation = %receipt.confirmation, "resource reported failure");
                }
                UseOutcome::Completed(receipt)
            }
            Ok(Err(e)) => {
                warn!(%node, error = %e, "resource use failed");
                UseOutcome::Failed(e)
            }
            Err(_) => {
                warn!(%node, ?timeout, "resource use timed out");
                UseOutcome::Failed(ResourceError::Timeout(timeout))
            }
        };
        (timestamp, outcome)
    }

    fn next_delay(&self) -> Duration {
        let CycleConfig {
            min_interval,
            max_interval,
            ..
        } = self.config;
        if max_interval <= min_interval {
            return min_interval;
        }
        rand::thread_rng().gen_range(min_interval..=max_interval)
    }
}

async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    while !*stop.borrow_and_update() {
        if stop.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
#[path = "cycle_tests.rs"]
mod tests;
