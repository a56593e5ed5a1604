// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter modules for peer and resource integrations

pub mod traits;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use traits::{AccessHandler, PeerAdapter, PeerError, ResourceAdapter, ResourceError};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNetwork, FakeResource, LinkFault, NetworkCall};
