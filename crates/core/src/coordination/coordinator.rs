// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ricart–Agrawala exclusion coordinator
//!
//! One coordinator per node. It is both a server of the mutual-exclusion
//! surface (via [`AccessHandler`]) and a client of the same surface on every
//! peer (via an injected [`PeerAdapter`]).
//!
//! Locking: protocol state and the deferred queue each sit behind their own
//! mutex, always taken in that order. No lock is held across a peer call.

use super::state::{
    decide, CoordinatorStatus, Decision, DeferredReply, NodeState, PendingRequest,
};
use crate::adapters::{AccessHandler, PeerAdapter};
use crate::clock::LamportClock;
use crate::config::CoordinatorConfig;
use crate::id::{NodeId, PeerId};
use crate::message::{AccessRequest, AccessResponse, ReleaseNotice};
use crate::order::Timestamp;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::{watch, Notify};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Errors from local acquire/release calls
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("a request is already in flight (state {0})")]
    AlreadyRequested(NodeState),
    #[error("resource is not held (state {0})")]
    NotHeld(NodeState),
}

struct ProtocolState {
    state: NodeState,
    request_number: u64,
    pending: Option<PendingRequest>,
    /// Peers whose grant is still awaited for `pending`
    awaiting: HashSet<PeerId>,
}

struct Shared<P> {
    node: NodeId,
    peers: Vec<PeerId>,
    transport: P,
    config: CoordinatorConfig,
    clock: LamportClock,
    protocol: Mutex<ProtocolState>,
    deferred: Mutex<Vec<DeferredReply>>,
    replies_settled: Notify,
    state_tx: watch::Sender<NodeState>,
}

/// Per-node Ricart–Agrawala state machine
pub struct ExclusionCoordinator<P> {
    shared: Arc<Shared<P>>,
}

impl<P> Clone for ExclusionCoordinator<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: PeerAdapter> ExclusionCoordinator<P> {
    /// Create a coordinator over a fixed peer set
    ///
    /// Duplicate peer entries are collapsed; the set never changes afterwards.
    pub fn new(node: NodeId, peers: Vec<PeerId>, transport: P, config: CoordinatorConfig) -> Self {
        let mut seen = HashSet::new();
        let peers: Vec<PeerId> = peers
            .into_iter()
            .filter(|peer| seen.insert(peer.clone()))
            .collect();
        let (state_tx, _) = watch::channel(NodeState::Released);

        Self {
            shared: Arc::new(Shared {
                node,
                peers,
                transport,
                config,
                clock: LamportClock::new(),
                protocol: Mutex::new(ProtocolState {
                    state: NodeState::Released,
                    request_number: 0,
                    pending: None,
                    awaiting: HashSet::new(),
                }),
                deferred: Mutex::new(Vec::new()),
                replies_settled: Notify::new(),
                state_tx,
            }),
        }
    }

    pub fn node(&self) -> NodeId {
        self.shared.node
    }

    pub fn peers(&self) -> &[PeerId] {
        &self.shared.peers
    }

    pub fn clock(&self) -> &LamportClock {
        &self.shared.clock
    }

    pub fn state(&self) -> NodeState {
        self.lock_protocol().state
    }

    /// Subscribe to state transitions
    pub fn watch_state(&self) -> watch::Receiver<NodeState> {
        self.shared.state_tx.subscribe()
    }

    pub fn status(&self) -> CoordinatorStatus {
        let (state, request_number, pending_replies) = {
            let protocol = self.lock_protocol();
            (
                protocol.state,
                protocol.request_number,
                protocol.awaiting.len(),
            )
        };
        CoordinatorStatus {
            node: self.shared.node,
            state,
            clock: self.shared.clock.peek(),
            request_number,
            pending_replies,
            deferred: self.lock_deferred().len(),
        }
    }

    /// Request the resource and wait until every peer has answered
    ///
    /// Peers that fail or time out count as having granted. Returns the
    /// request that now holds the resource.
    pub async fn acquire(&self) -> Result<PendingRequest, CoordinatorError> {
        let shared = &self.shared;
        let pending = {
            let mut protocol = self.lock_protocol();
            if protocol.state != NodeState::Released {
                return Err(CoordinatorError::AlreadyRequested(protocol.state));
            }
            let timestamp = shared.clock.tick();
            protocol.request_number += 1;
            let pending = PendingRequest {
                timestamp,
                request_number: protocol.request_number,
            };
            protocol.pending = Some(pending);
            protocol.awaiting = shared.peers.iter().cloned().collect();
            self.transition(&mut protocol, NodeState::Wanted);
            pending
        };

        info!(
            node = %shared.node,
            ts = pending.timestamp,
            request_number = pending.request_number,
            peers = shared.peers.len(),
            "requesting access"
        );

        let request = AccessRequest {
            requester: shared.node,
            timestamp: pending.timestamp,
            request_number: pending.request_number,
        };
        let mut fan_out = JoinSet::new();
        for peer in shared.peers.iter().cloned() {
            let coordinator = self.clone();
            fan_out.spawn(async move { coordinator.solicit(peer, request).await });
        }

        self.wait_for_replies().await;
        while let Some(joined) = fan_out.join_next().await {
            if let Err(e) = joined {
                warn!(node = %shared.node, error = %e, "request task ended abnormally");
            }
        }

        {
            let mut protocol = self.lock_protocol();
            self.transition(&mut protocol, NodeState::Held);
        }
        info!(
            node = %shared.node,
            ts = shared.clock.peek(),
            request_number = pending.request_number,
            "access granted"
        );

        Ok(pending)
    }

    /// Leave the critical section
    ///
    /// Fires every deferred reply, then tells each peer about the release.
    /// Release notices are best-effort: failures are logged and never retried.
    pub async fn release(&self) -> Result<(), CoordinatorError> {
        let shared = &self.shared;
        let (notice, deferred) = {
            let mut protocol = self.lock_protocol();
            if protocol.state != NodeState::Held {
                return Err(CoordinatorError::NotHeld(protocol.state));
            }
            let timestamp = shared.clock.tick();
            protocol.pending = None;
            protocol.awaiting.clear();
            self.transition(&mut protocol, NodeState::Released);
            // Drained under the protocol lock so a later request cannot mix in
            let deferred = std::mem::take(&mut *self.lock_deferred());
            let notice = ReleaseNotice {
                requester: shared.node,
                timestamp,
                request_number: protocol.request_number,
            };
            (notice, deferred)
        };

        info!(
            node = %shared.node,
            ts = notice.timestamp,
            deferred = deferred.len(),
            "releasing access"
        );
        for reply in deferred {
            info!(
                node = %shared.node,
                requester = %reply.requester,
                requester_ts = reply.timestamp,
                "flushing deferred reply"
            );
            reply.fire();
        }

        let mut broadcast = JoinSet::new();
        for peer in shared.peers.iter().cloned() {
            let coordinator = self.clone();
            broadcast.spawn(async move { coordinator.announce_release(peer, notice).await });
        }
        while let Some(joined) = broadcast.join_next().await {
            if let Err(e) = joined {
                warn!(node = %shared.node, error = %e, "release task ended abnormally");
            }
        }

        Ok(())
    }

    /// Ask one peer for permission and settle it in the reply set
    async fn solicit(&self, peer: PeerId, request: AccessRequest) {
        let shared = &self.shared;
        let timeout = shared.config.request_timeout;
        let outcome =
            tokio::time::timeout(timeout, shared.transport.request_access(&peer, request)).await;

        match outcome {
            Ok(Ok(response)) if response.granted => {
                let now = shared.clock.merge(response.timestamp);
                debug!(node = %shared.node, %peer, ts = now, "permission received");
            }
            Ok(Ok(response)) => {
                shared.clock.merge(response.timestamp);
                warn!(
                    node = %shared.node,
                    %peer,
                    "peer answered without granting; treating as granted"
                );
            }
            Ok(Err(e)) => {
                warn!(
                    node = %shared.node,
                    %peer,
                    error = %e,
                    "access request failed; treating peer as granted"
                );
            }
            Err(_) => {
                warn!(
                    node = %shared.node,
                    %peer,
                    ?timeout,
                    "access request timed out; treating peer as granted"
                );
            }
        }

        self.settle(&peer);
    }

    async fn announce_release(&self, peer: PeerId, notice: ReleaseNotice) {
        let shared = &self.shared;
        let timeout = shared.config.release_timeout;
        match tokio::time::timeout(timeout, shared.transport.release_access(&peer, notice)).await
        {
            Ok(Ok(())) => debug!(node = %shared.node, %peer, "release delivered"),
            Ok(Err(e)) => warn!(node = %shared.node, %peer, error = %e, "release notice failed"),
            Err(_) => warn!(
                node = %shared.node,
                %peer,
                ?timeout,
                "release notice timed out"
            ),
        }
    }

    /// Drop `peer` from the reply set, waking the acquirer once it is empty
    fn settle(&self, peer: &PeerId) {
        let remaining = {
            let mut protocol = self.lock_protocol();
            if !protocol.awaiting.remove(peer) {
                return;
            }
            protocol.awaiting.len()
        };
        debug!(node = %self.shared.node, %peer, remaining, "reply settled");
        if remaining == 0 {
            self.shared.replies_settled.notify_waiters();
        }
    }

    async fn wait_for_replies(&self) {
        loop {
            let notified = self.shared.replies_settled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let settled = self.lock_protocol().awaiting.is_empty();
            if settled {
                return;
            }
            notified.await;
        }
    }

    fn transition(&self, protocol: &mut ProtocolState, next: NodeState) {
        let previous = protocol.state;
        protocol.state = next;
        self.shared.state_tx.send_replace(next);
        info!(
            node = %self.shared.node,
            from = %previous,
            to = %next,
            ts = self.shared.clock.peek(),
            "state transition"
        );
    }

    fn lock_protocol(&self) -> MutexGuard<'_, ProtocolState> {
        self.shared
            .protocol
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn lock_deferred(&self) -> MutexGuard<'_, Vec<DeferredReply>> {
        self.shared
            .deferred
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<P: PeerAdapter> AccessHandler for ExclusionCoordinator<P> {
    async fn request_access(&self, request: AccessRequest) -> AccessResponse {
        let shared = &self.shared;
        let now = shared.clock.merge(request.timestamp);

        let waiter = {
            let protocol = self.lock_protocol();
            let own = protocol
                .pending
                .map(|pending| Timestamp::new(pending.timestamp, shared.node));
            let decision = decide(protocol.state, own, request.priority());
            info!(
                node = %shared.node,
                ts = now,
                requester = %request.requester,
                requester_ts = request.timestamp,
                request_number = request.request_number,
                state = %protocol.state,
                own = ?own.map(|own| own.counter),
                ?decision,
                "access request received"
            );
            match decision {
                Decision::Grant => None,
                Decision::Defer => {
                    let (reply, waiter) = DeferredReply::new(&request);
                    self.lock_deferred().push(reply);
                    Some(waiter)
                }
            }
        };

        if let Some(waiter) = waiter {
            // Err only if the entry was dropped unfired; answer anyway rather than hang.
            let _ = waiter.await;
            debug!(
                node = %shared.node,
                requester = %request.requester,
                "sending deferred grant"
            );
        }

        AccessResponse::grant(shared.clock.tick())
    }

    async fn release_access(&self, notice: ReleaseNotice) {
        let now = self.shared.clock.merge(notice.timestamp);
        info!(
            node = %self.shared.node,
            ts = now,
            requester = %notice.requester,
            request_number = notice.request_number,
            "peer released the resource"
        );
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
