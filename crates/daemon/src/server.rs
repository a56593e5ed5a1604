// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP server and connection handling.

use std::sync::Arc;

use async_trait::async_trait;
use mx_adapters::protocol::{self, ProtocolError, Request, Response, DEFAULT_TIMEOUT};
use mx_core::{clock, AccessHandler, ExclusionCoordinator, PeerAdapter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// Something that answers protocol requests
#[async_trait]
pub trait Service: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> Response;
}

/// The mutual-exclusion surface of one node
pub struct NodeService<P> {
    coordinator: ExclusionCoordinator<P>,
}

impl<P> NodeService<P> {
    pub fn new(coordinator: ExclusionCoordinator<P>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl<P: PeerAdapter> Service for NodeService<P> {
    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,
            Request::Status => Response::Status(self.coordinator.status()),
            Request::RequestAccess(request) if !clock::accepts(request.timestamp) => {
                warn!(
                    requester = %request.requester,
                    ts = request.timestamp,
                    "rejecting access request"
                );
                Response::error(format!("timestamp {} is out of range", request.timestamp))
            }
            Request::RequestAccess(request) => {
                Response::Access(self.coordinator.request_access(request).await)
            }
            Request::ReleaseAccess(notice) if !clock::accepts(notice.timestamp) => {
                warn!(
                    requester = %notice.requester,
                    ts = notice.timestamp,
                    "rejecting release notice"
                );
                Response::error(format!("timestamp {} is out of range", notice.timestamp))
            }
            Request::ReleaseAccess(notice) => {
                self.coordinator.release_access(notice).await;
                Response::Released
            }
            Request::UseResource(_) => Response::error("node does not serve the resource"),
        }
    }
}

/// Accept connections forever, handling each on its own task
///
/// At most `max_connections` connections are served at once; further
/// connections wait in the listen backlog until a slot frees up.
pub async fn serve<S: Service>(listener: TcpListener, service: Arc<S>, max_connections: usize) {
    let slots = Arc::new(Semaphore::new(max_connections.max(1)));

    loop {
        let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
            break;
        };

        let (stream, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Error accepting connection: {}", e);
                continue;
            }
        };

        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = handle_connection(service.as_ref(), stream).await {
                warn!(%remote, error = %e, "connection failed");
            }
        });
    }
}

/// Handle a single client connection
pub async fn handle_connection<S: Service + ?Sized>(
    service: &S,
    stream: TcpStream,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    let response = service.handle(request).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
