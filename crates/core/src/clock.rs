// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lamport logical clock
//!
//! A single counter shared by every execution context of a node. All three
//! operations run under one critical section, so the values handed out by
//! `tick` and `merge` are strictly increasing for the lifetime of the clock,
//! up to [`MAX_TIMESTAMP`], where the clock saturates.

use std::sync::Mutex;

/// Highest value the clock reaches; it never wraps past this
pub const MAX_TIMESTAMP: u64 = u64::MAX;

/// Whether an inbound timestamp still leaves the clock room to advance
pub fn accepts(received: u64) -> bool {
    received < MAX_TIMESTAMP
}

/// Scalar logical clock implementing Lamport's increment and merge rules
#[derive(Debug, Default)]
pub struct LamportClock {
    time: Mutex<u64>,
}

impl LamportClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at a specific value
    pub fn starting_at(time: u64) -> Self {
        Self {
            time: Mutex::new(time),
        }
    }

    /// Advance the clock for a locally originated event and return the new value
    ///
    /// Must be called before timestamping any local action or outbound message.
    pub fn tick(&self) -> u64 {
        let mut time = self.time.lock().unwrap_or_else(|e| e.into_inner());
        *time = time.saturating_add(1);
        *time
    }

    /// Fold in a timestamp carried by an inbound message
    ///
    /// Sets the clock to `max(local, received) + 1` and returns the new value,
    /// which is strictly greater than both inputs unless it saturates at
    /// [`MAX_TIMESTAMP`].
    pub fn merge(&self, received: u64) -> u64 {
        let mut time = self.time.lock().unwrap_or_else(|e| e.into_inner());
        *time = (*time).max(received).saturating_add(1);
        *time
    }

    /// Read the current value without advancing it
    pub fn peek(&self) -> u64 {
        *self.time.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Display for LamportClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LamportClock(time={})", self.peek())
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
