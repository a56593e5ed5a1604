// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP transport for calls to peer nodes

use crate::client::{self, ClientError};
use crate::protocol::{ProtocolError, Request, Response, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use mx_core::{AccessRequest, AccessResponse, PeerAdapter, PeerError, PeerId, ReleaseNotice};
use std::time::Duration;

/// Peer adapter that opens one TCP connection per call
///
/// Peer ids are socket addresses (`host:port`).
#[derive(Clone, Debug)]
pub struct TcpPeerAdapter {
    io_timeout: Duration,
}

impl Default for TcpPeerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpPeerAdapter {
    pub fn new() -> Self {
        Self {
            io_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    async fn call(&self, peer: &PeerId, request: Request) -> Result<Response, PeerError> {
        client::exchange(peer.as_str(), &request, self.io_timeout)
            .await
            .map_err(|e| peer_error(peer, e, self.io_timeout))
    }
}

#[async_trait]
impl PeerAdapter for TcpPeerAdapter {
    async fn request_access(
        &self,
        peer: &PeerId,
        request: AccessRequest,
    ) -> Result<AccessResponse, PeerError> {
        match self.call(peer, Request::RequestAccess(request)).await? {
            Response::Access(response) => Ok(response),
            Response::Error { message } => Err(PeerError::Rejected(message)),
            other => Err(unexpected(other)),
        }
    }

    async fn release_access(&self, peer: &PeerId, notice: ReleaseNotice) -> Result<(), PeerError> {
        match self.call(peer, Request::ReleaseAccess(notice)).await? {
            Response::Released => Ok(()),
            Response::Error { message } => Err(PeerError::Rejected(message)),
            other => Err(unexpected(other)),
        }
    }
}

fn peer_error(peer: &PeerId, error: ClientError, io_timeout: Duration) -> PeerError {
    match error {
        ClientError::Connect { .. } | ClientError::ConnectTimeout(_) => {
            PeerError::Unreachable(format!("{}: {}", peer, error))
        }
        ClientError::Protocol(ProtocolError::Timeout) => PeerError::Timeout(io_timeout),
        ClientError::Protocol(ProtocolError::ConnectionClosed) => {
            PeerError::Unreachable(format!("{}: connection closed", peer))
        }
        ClientError::Protocol(e) => PeerError::Protocol(e.to_string()),
    }
}

fn unexpected(response: Response) -> PeerError {
    PeerError::Protocol(format!("unexpected response: {:?}", response))
}

#[cfg(test)]
#[path = "peer_tests.rs"]
mod tests;
