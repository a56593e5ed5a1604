// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapter implementations for testing
//!
//! `FakeNetwork` routes peer calls directly into registered in-process
//! handlers, so a whole cluster of coordinators can run inside one test.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::traits::*;
use crate::id::PeerId;
use crate::message::{AccessRequest, AccessResponse, ReleaseNotice, UseReceipt, UseRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded call through the fake network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCall {
    RequestAccess {
        to: PeerId,
        request: AccessRequest,
    },
    ReleaseAccess {
        to: PeerId,
        notice: ReleaseNotice,
    },
}

/// Failure mode injected on the link to a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFault {
    /// Calls fail immediately with `PeerError::Unreachable`
    Unreachable,
    /// Calls never complete; only a caller-side timeout ends them
    Silent,
}

enum Route {
    Deliver(Arc<dyn AccessHandler>),
    Silent,
}

#[derive(Default)]
struct NetworkState {
    routes: HashMap<PeerId, Arc<dyn AccessHandler>>,
    faults: HashMap<PeerId, LinkFault>,
    calls: Vec<NetworkCall>,
}

impl NetworkState {
    fn route(&self, peer: &PeerId) -> Result<Route, PeerError> {
        match self.faults.get(peer) {
            Some(LinkFault::Unreachable) => Err(PeerError::Unreachable(peer.to_string())),
            Some(LinkFault::Silent) => Ok(Route::Silent),
            None => self
                .routes
                .get(peer)
                .cloned()
                .map(Route::Deliver)
                .ok_or_else(|| PeerError::Unreachable(peer.to_string())),
        }
    }
}

/// In-memory peer transport shared by every node of a simulated cluster
#[derive(Clone, Default)]
pub struct FakeNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `handler` reachable under `peer`
    pub fn register(&self, peer: PeerId, handler: Arc<dyn AccessHandler>) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .routes
            .insert(peer, handler);
    }

    pub fn set_fault(&self, peer: &PeerId, fault: LinkFault) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .faults
            .insert(peer.clone(), fault);
    }

    pub fn clear_fault(&self, peer: &PeerId) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .faults
            .remove(peer);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<NetworkCall> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Access requests sent to `peer`, in send order
    pub fn requests_to(&self, peer: &PeerId) -> Vec<AccessRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                NetworkCall::RequestAccess { to, request } if &to == peer => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Release notices sent to `peer`, in send order
    pub fn releases_to(&self, peer: &PeerId) -> Vec<ReleaseNotice> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                NetworkCall::ReleaseAccess { to, notice } if &to == peer => Some(notice),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: NetworkCall, peer: &PeerId) -> Result<Route, PeerError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(call);
        state.route(peer)
    }
}

#[async_trait]
impl PeerAdapter for FakeNetwork {
    async fn request_access(
        &self,
        peer: &PeerId,
        request: AccessRequest,
    ) -> Result<AccessResponse, PeerError> {
        let call = NetworkCall::RequestAccess {
            to: peer.clone(),
            request,
        };
        match self.record(call, peer)? {
            Route::Deliver(handler) => Ok(handler.request_access(request).await),
            Route::Silent => std::future::pending().await,
        }
    }

    async fn release_access(&self, peer: &PeerId, notice: ReleaseNotice) -> Result<(), PeerError> {
        let call = NetworkCall::ReleaseAccess {
            to: peer.clone(),
            notice,
        };
        match self.record(call, peer)? {
            Route::Deliver(handler) => {
                handler.release_access(notice).await;
                Ok(())
            }
            Route::Silent => std::future::pending().await,
        }
    }
}

#[derive(Default)]
struct ResourceState {
    uses: Vec<UseRequest>,
    in_use: usize,
    max_in_use: usize,
    failing: bool,
}

/// Marks one use as finished when dropped, including when the caller's
/// timeout cancels the use mid-flight
struct InUse(Arc<Mutex<ResourceState>>);

impl Drop for InUse {
    fn drop(&mut self) {
        let mut state = self.0.lock().unwrap_or_else(|e| e.into_inner());
        state.in_use = state.in_use.saturating_sub(1);
    }
}

/// Fake resource service that detects overlapping use
#[derive(Clone, Default)]
pub struct FakeResource {
    state: Arc<Mutex<ResourceState>>,
    delay: Duration,
}

impl FakeResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold each use open for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make subsequent uses fail with `ResourceError::Unavailable`
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).failing = failing;
    }

    /// Get all recorded uses, in arrival order
    pub fn uses(&self) -> Vec<UseRequest> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .uses
            .clone()
    }

    /// Highest number of uses that were in flight at the same time
    pub fn max_concurrent_uses(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).max_in_use
    }
}

#[async_trait]
impl ResourceAdapter for FakeResource {
    async fn use_resource(&self, request: UseRequest) -> Result<UseReceipt, ResourceError> {
        let (count, failing) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.uses.push(request.clone());
            state.in_use += 1;
            state.max_in_use = state.max_in_use.max(state.in_use);
            (state.uses.len(), state.failing)
        };

        let _in_use = InUse(Arc::clone(&self.state));

        if !failing && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if failing {
            return Err(ResourceError::Unavailable("fake resource failing".to_string()));
        }
        Ok(UseReceipt {
            success: true,
            confirmation: format!("Print #{} completed", count),
            timestamp: request.timestamp,
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
