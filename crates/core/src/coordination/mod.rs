// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed mutual exclusion without a central lock manager
//!
//! This module provides:
//! - **NodeState** - Released/Wanted/Held and the grant-or-defer decision
//! - **ExclusionCoordinator** - The Ricart–Agrawala state machine for one node

pub mod coordinator;
pub mod state;

pub use coordinator::{CoordinatorError, ExclusionCoordinator};
pub use state::{decide, CoordinatorStatus, Decision, DeferredReply, NodeState, PendingRequest};
