// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP client for the shared resource service

use crate::client::{self, ClientError};
use crate::protocol::{Request, Response, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use mx_core::{ResourceAdapter, ResourceError, UseReceipt, UseRequest};
use std::time::Duration;

/// Resource adapter talking to a resource service at a fixed address
#[derive(Clone, Debug)]
pub struct TcpResourceAdapter {
    addr: String,
    io_timeout: Duration,
}

impl TcpResourceAdapter {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            io_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl ResourceAdapter for TcpResourceAdapter {
    async fn use_resource(&self, request: UseRequest) -> Result<UseReceipt, ResourceError> {
        let response = client::exchange(&self.addr, &Request::UseResource(request), self.io_timeout)
            .await
            .map_err(|e| match e {
                ClientError::Connect { .. } | ClientError::ConnectTimeout(_) => {
                    ResourceError::Unavailable(e.to_string())
                }
                ClientError::Protocol(e) => ResourceError::Protocol(e.to_string()),
            })?;

        match response {
            Response::Used(receipt) => Ok(receipt),
            Response::Error { message } => Err(ResourceError::Protocol(message)),
            other => Err(ResourceError::Protocol(format!(
                "unexpected response: {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
