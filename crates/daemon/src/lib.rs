// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mx-daemon: the node process (`mxd`) and the shared printer (`mx-printer`)

pub mod lifecycle;
pub mod logging;
pub mod printer;
pub mod server;

pub use lifecycle::{startup, Config, LifecycleError, Node, NodeArgs};
pub use printer::{PrinterArgs, PrinterService};
pub use server::{serve, NodeService, ServerError, Service};
