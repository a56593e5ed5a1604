// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Network adapters: wire protocol, TCP transports, and tracing wrappers

pub mod client;
pub mod peer;
pub mod protocol;
pub mod resource;
pub mod traced;

pub use client::ClientError;
pub use peer::TcpPeerAdapter;
pub use protocol::{ProtocolError, Request, Response, DEFAULT_TIMEOUT};
pub use resource::TcpResourceAdapter;
pub use traced::{TracedPeerAdapter, TracedResourceAdapter};
