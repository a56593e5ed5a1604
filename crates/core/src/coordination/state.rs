// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ricart–Agrawala node state and the grant/defer decision

use crate::id::NodeId;
use crate::message::AccessRequest;
use crate::order::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Where a node is in its acquire/release cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Idle; grants every inbound request immediately
    #[default]
    Released,
    /// Request broadcast, waiting for every peer to answer
    Wanted,
    /// Holds the shared resource
    Held,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeState::Released => "RELEASED",
            NodeState::Wanted => "WANTED",
            NodeState::Held => "HELD",
        };
        f.write_str(name)
    }
}

/// The node's own in-flight request, defined while `Wanted` or `Held`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    pub timestamp: u64,
    pub request_number: u64,
}

/// An inbound request whose grant is withheld until the next release
#[derive(Debug)]
pub struct DeferredReply {
    pub requester: NodeId,
    pub timestamp: u64,
    pub request_number: u64,
    signal: oneshot::Sender<()>,
}

impl DeferredReply {
    /// Create the queue entry and the receiver its handler suspends on
    pub fn new(request: &AccessRequest) -> (Self, oneshot::Receiver<()>) {
        let (signal, waiter) = oneshot::channel();
        let reply = Self {
            requester: request.requester,
            timestamp: request.timestamp,
            request_number: request.request_number,
            signal,
        };
        (reply, waiter)
    }

    /// Wake the suspended handler so it sends its grant
    ///
    /// Consumes the entry, so each reply fires at most once.
    pub fn fire(self) {
        // The handler may already be gone (caller hung up); nothing to wake then.
        let _ = self.signal.send(());
    }
}

/// How to answer an inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Grant,
    Defer,
}

/// Decide whether to grant `incoming` now or defer it until release
///
/// `own` is the node's pending request, if any, tagged with the local node id.
pub fn decide(state: NodeState, own: Option<Timestamp>, incoming: Timestamp) -> Decision {
    match state {
        NodeState::Released => Decision::Grant,
        NodeState::Held => Decision::Defer,
        NodeState::Wanted => match own {
            Some(own) if own.precedes(&incoming) => Decision::Defer,
            _ => Decision::Grant,
        },
    }
}

/// Point-in-time view of a coordinator, for operators and tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub node: NodeId,
    pub state: NodeState,
    pub clock: u64,
    pub request_number: u64,
    pub pending_replies: usize,
    pub deferred: usize,
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
