// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mx-core: Distributed mutual exclusion for the mx node daemon
//!
//! This crate provides:
//! - A Lamport logical clock and the (timestamp, node id) total order
//! - The Ricart–Agrawala coordinator that grants, defers, and releases access
//! - Adapter traits for peer transport and the shared resource
//! - The acquire → use → release cycle that drives a node
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

pub mod adapters;
pub mod clock;
pub mod config;
pub mod coordination;
pub mod cycle;
pub mod id;
pub mod message;
pub mod order;

pub use clock::{LamportClock, MAX_TIMESTAMP};
pub use config::{ConfigError, CoordinatorConfig, CycleConfig, NodeConfig};
pub use coordination::{CoordinatorError, CoordinatorStatus, ExclusionCoordinator, NodeState};
pub use cycle::{CycleReport, ResourceCycle, StopHandle, UseOutcome};
pub use id::{IdError, NodeId, PeerId};
pub use message::{AccessRequest, AccessResponse, ReleaseNotice, UseReceipt, UseRequest};
pub use order::{compare, Precedence, Timestamp};

pub use adapters::{AccessHandler, PeerAdapter, PeerError, ResourceAdapter, ResourceError};

#[cfg(any(test, feature = "test-support"))]
pub use adapters::{FakeNetwork, FakeResource, LinkFault, NetworkCall};
