// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter trait definitions for peer and resource calls

use crate::id::PeerId;
use crate::message::{AccessRequest, AccessResponse, ReleaseNotice, UseReceipt, UseRequest};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Peer Adapter (outbound mutual-exclusion calls)
// =============================================================================

/// Errors from calls to peer nodes
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    #[error("peer did not answer within {0:?}")]
    Timeout(Duration),
    #[error("peer rejected request: {0}")]
    Rejected(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Outbound half of the mutual-exclusion surface: invoke it on a peer
#[async_trait]
pub trait PeerAdapter: Clone + Send + Sync + 'static {
    /// Ask `peer` for permission; returns once the peer grants
    async fn request_access(
        &self,
        peer: &PeerId,
        request: AccessRequest,
    ) -> Result<AccessResponse, PeerError>;

    /// Notify `peer` that the local node released the resource
    async fn release_access(&self, peer: &PeerId, notice: ReleaseNotice) -> Result<(), PeerError>;
}

// =============================================================================
// Access Handler (inbound mutual-exclusion calls)
// =============================================================================

/// Inbound half of the mutual-exclusion surface: serve it for peers
///
/// `request_access` may suspend until the local node releases the resource.
#[async_trait]
pub trait AccessHandler: Send + Sync + 'static {
    async fn request_access(&self, request: AccessRequest) -> AccessResponse;

    async fn release_access(&self, notice: ReleaseNotice);
}

// =============================================================================
// Resource Adapter (the shared external resource)
// =============================================================================

/// Errors from calls to the resource service
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource service unavailable: {0}")]
    Unavailable(String),
    #[error("resource service did not answer within {0:?}")]
    Timeout(Duration),
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Adapter for the external resource service
#[async_trait]
pub trait ResourceAdapter: Clone + Send + Sync + 'static {
    async fn use_resource(&self, request: UseRequest) -> Result<UseReceipt, ResourceError>;
}
