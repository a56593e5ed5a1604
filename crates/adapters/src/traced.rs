// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use async_trait::async_trait;
use mx_core::{
    AccessRequest, AccessResponse, PeerAdapter, PeerError, PeerId, ReleaseNotice,
    ResourceAdapter, ResourceError, UseReceipt, UseRequest,
};
use std::time::Instant;
use tracing::Instrument;

/// Wrapper that adds tracing to any PeerAdapter
#[derive(Clone)]
pub struct TracedPeerAdapter<P> {
    inner: P,
}

impl<P> TracedPeerAdapter<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: PeerAdapter> PeerAdapter for TracedPeerAdapter<P> {
    async fn request_access(
        &self,
        peer: &PeerId,
        request: AccessRequest,
    ) -> Result<AccessResponse, PeerError> {
        let span = tracing::info_span!(
            "peer.request_access",
            %peer,
            ts = request.timestamp,
            request_number = request.request_number
        );

        async move {
            tracing::debug!("sending");
            let start = Instant::now();
            let result = self.inner.request_access(peer, request).await;
            let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match &result {
                Ok(response) => tracing::info!(
                    granted = response.granted,
                    reply_ts = response.timestamp,
                    elapsed_ms,
                    "reply received"
                ),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "request failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn release_access(&self, peer: &PeerId, notice: ReleaseNotice) -> Result<(), PeerError> {
        let span = tracing::info_span!("peer.release_access", %peer, ts = notice.timestamp);

        async move {
            let start = Instant::now();
            let result = self.inner.release_access(peer, notice).await;
            let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            // Best effort: callers never gate on delivery
            match &result {
                Ok(()) => tracing::debug!(elapsed_ms, "release delivered"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "release not delivered"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any ResourceAdapter
#[derive(Clone)]
pub struct TracedResourceAdapter<R> {
    inner: R,
}

impl<R> TracedResourceAdapter<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: ResourceAdapter> ResourceAdapter for TracedResourceAdapter<R> {
    async fn use_resource(&self, request: UseRequest) -> Result<UseReceipt, ResourceError> {
        let span = tracing::info_span!(
            "resource.use",
            client = %request.client,
            ts = request.timestamp,
            request_number = request.request_number
        );

        async move {
            tracing::info!(content_len = request.content.len(), "starting");
            let start = Instant::now();
            let result = self.inner.use_resource(request).await;
            let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match &result {
                Ok(receipt) => tracing::info!(
                    success = receipt.success,
                    confirmation = %receipt.confirmation,
                    elapsed_ms,
                    "resource answered"
                ),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "use failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
