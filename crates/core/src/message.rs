// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol messages exchanged between nodes and with the resource service

use crate::id::NodeId;
use crate::order::Timestamp;
use serde::{Deserialize, Serialize};

/// Ask a peer for permission to enter the critical section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub requester: NodeId,
    pub timestamp: u64,
    pub request_number: u64,
}

impl AccessRequest {
    /// The request's position in the total priority order
    pub fn priority(&self) -> Timestamp {
        Timestamp::new(self.timestamp, self.requester)
    }
}

/// A peer's answer to an [`AccessRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessResponse {
    pub granted: bool,
    pub timestamp: u64,
}

impl AccessResponse {
    pub fn grant(timestamp: u64) -> Self {
        Self {
            granted: true,
            timestamp,
        }
    }
}

/// Tell a peer the sender has left the critical section
///
/// Carries clock information only; receiving one never changes the receiver's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNotice {
    pub requester: NodeId,
    pub timestamp: u64,
    pub request_number: u64,
}

/// A single use of the shared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseRequest {
    pub client: NodeId,
    pub content: String,
    pub timestamp: u64,
    pub request_number: u64,
}

/// The resource service's confirmation of a [`UseRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseReceipt {
    pub success: bool,
    pub confirmation: String,
    /// Echo of the request timestamp; the service keeps no clock of its own
    pub timestamp: u64,
}
