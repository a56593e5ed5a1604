// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node and peer identities

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from identity construction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("node id must be a positive integer")]
    Zero,
    #[error("peer address must not be empty")]
    EmptyPeer,
}

/// Unique, positive identifier of a node, fixed for the process lifetime
///
/// Doubles as the tie-break key of the timestamp order: lower ids win ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(id: u32) -> Result<Self, IdError> {
        if id == 0 {
            return Err(IdError::Zero);
        }
        Ok(Self(id))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for NodeId {
    type Error = IdError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<NodeId> for u32 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address of a peer node, as configured at startup
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerId(String);

impl PeerId {
    pub fn new(addr: impl Into<String>) -> Result<Self, IdError> {
        let addr = addr.into();
        let trimmed = addr.trim();
        if trimmed.is_empty() {
            return Err(IdError::EmptyPeer);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a comma-separated peer list, skipping blank entries
    pub fn parse_list(list: &str) -> Vec<PeerId> {
        list.split(',')
            .filter_map(|entry| PeerId::new(entry).ok())
            .collect()
    }
}

impl TryFrom<String> for PeerId {
    type Error = IdError;

    fn try_from(addr: String) -> Result<Self, Self::Error> {
        Self::new(addr)
    }
}

impl From<PeerId> for String {
    fn from(id: PeerId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
