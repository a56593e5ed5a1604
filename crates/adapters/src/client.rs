// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot request/response exchange over TCP

use crate::protocol::{self, ProtocolError, Request, Response};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connect to {0} timed out")]
    ConnectTimeout(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Open a connection to `addr`, send `request`, and wait for the response
///
/// `io_timeout` bounds connecting and writing. Reading the response is left
/// unbounded; callers wrap the whole exchange in their own timeout.
pub async fn exchange(
    addr: &str,
    request: &Request,
    io_timeout: Duration,
) -> Result<Response, ClientError> {
    let stream = tokio::time::timeout(io_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ClientError::ConnectTimeout(addr.to_string()))?
        .map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;
    let (mut reader, mut writer) = stream.into_split();

    protocol::write_request(&mut writer, request, io_timeout).await?;
    Ok(protocol::read_response(&mut reader).await?)
}
