// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Total order over (clock value, node id) pairs
//!
//! The lower counter has priority; equal counters fall back to the lower
//! node id. Two distinct nodes can never compare `Equal`.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Outcome of comparing two timestamped requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// The left-hand request has priority
    Before,
    Equal,
    /// The right-hand request has priority
    After,
}

impl From<Ordering> for Precedence {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Precedence::Before,
            Ordering::Equal => Precedence::Equal,
            Ordering::Greater => Precedence::After,
        }
    }
}

/// Compare two requests by counter, then by node id
pub fn compare(ts_a: u64, id_a: NodeId, ts_b: u64, id_b: NodeId) -> Precedence {
    ts_a.cmp(&ts_b).then_with(|| id_a.cmp(&id_b)).into()
}

/// A Lamport timestamp tagged with the node that issued it
///
/// Field order matters: the derived `Ord` compares `counter` first and uses
/// `node` only as the tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub counter: u64,
    pub node: NodeId,
}

impl Timestamp {
    pub fn new(counter: u64, node: NodeId) -> Self {
        Self { counter, node }
    }

    /// Whether this request wins priority over `other`
    pub fn precedes(&self, other: &Timestamp) -> bool {
        self.precedence(other) == Precedence::Before
    }

    pub fn precedence(&self, other: &Timestamp) -> Precedence {
        compare(self.counter, self.node, other.counter, other.node)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.counter, self.node)
    }
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;
