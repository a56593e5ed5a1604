// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node lifecycle management: configuration, startup, run, shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mx_adapters::{TcpPeerAdapter, TcpResourceAdapter, TracedPeerAdapter, TracedResourceAdapter};
use mx_core::{
    ConfigError, CoordinatorConfig, CoordinatorError, CycleConfig, ExclusionCoordinator, NodeConfig,
    NodeId, PeerId, ResourceCycle, StopHandle,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::server::{self, NodeService};

/// Peer transport used by a running node (wrapped with tracing)
pub type NodePeers = TracedPeerAdapter<TcpPeerAdapter>;

/// Resource client used by a running node (wrapped with tracing)
pub type NodeResource = TracedResourceAdapter<TcpResourceAdapter>;

/// mxd command-line arguments
///
/// Flags override values loaded from `--config`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "mxd",
    version,
    about = "mx node - distributed mutual exclusion over a shared printer"
)]
pub struct NodeArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Unique positive node id
    #[arg(long, value_parser = parse_node_id)]
    pub id: Option<NodeId>,

    /// Listen address for peer requests (host:port)
    #[arg(long, conflicts_with = "port")]
    pub listen: Option<String>,

    /// Listen on all interfaces at this port
    #[arg(long)]
    pub port: Option<u16>,

    /// Address of the printer service (host:port)
    #[arg(long)]
    pub server: Option<String>,

    /// Comma-separated peer addresses; empty for a single-node cluster
    #[arg(long)]
    pub clients: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

fn parse_node_id(value: &str) -> Result<NodeId, String> {
    let id: u32 = value
        .parse()
        .map_err(|_| format!("node id must be a positive integer, got '{}'", value))?;
    NodeId::new(id).map_err(|e| e.to_string())
}

/// Resolved node configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeId,
    pub listen: String,
    pub resource: String,
    pub peers: Vec<PeerId>,
    pub coordinator: CoordinatorConfig,
    pub cycle: CycleConfig,
    pub max_connections: usize,
}

impl Config {
    /// Load the optional config file, then apply command-line overrides
    pub fn from_args(args: &NodeArgs) -> Result<Self, LifecycleError> {
        let mut config = match &args.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };

        if let Some(id) = args.id {
            config.id = Some(id);
        }
        if let Some(listen) = &args.listen {
            config.listen = Some(listen.clone());
        }
        if let Some(port) = args.port {
            config.listen = Some(format!("0.0.0.0:{}", port));
        }
        if let Some(server) = &args.server {
            config.resource = Some(server.clone());
        }
        if let Some(clients) = &args.clients {
            config.peers = PeerId::parse_list(clients);
        }

        Self::resolve(config)
    }

    /// Validate a fully layered [`NodeConfig`]
    pub fn resolve(config: NodeConfig) -> Result<Self, LifecycleError> {
        config.validate()?;
        let NodeConfig {
            id: Some(node),
            listen: Some(listen),
            resource: Some(resource),
            peers,
            coordinator,
            cycle,
            max_connections,
        } = config
        else {
            return Err(ConfigError::Invalid("incomplete node configuration".to_string()).into());
        };

        Ok(Self {
            node,
            listen,
            resource,
            peers,
            coordinator,
            cycle,
            max_connections,
        })
    }
}

/// A node whose listener is bound and whose coordinator is built
pub struct Node {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    cycle: ResourceCycle<NodePeers, NodeResource>,
}

impl Node {
    /// Build a node around an already bound listener
    pub fn with_listener(config: Config, listener: TcpListener) -> Result<Self, LifecycleError> {
        let local_addr = listener.local_addr()?;

        let transport = TracedPeerAdapter::new(TcpPeerAdapter::new());
        let coordinator = ExclusionCoordinator::new(
            config.node,
            config.peers.clone(),
            transport,
            config.coordinator.clone(),
        );
        let resource = TracedResourceAdapter::new(TcpResourceAdapter::new(config.resource.clone()));
        let cycle = ResourceCycle::new(coordinator, resource, config.cycle.clone());

        info!(
            node = %config.node,
            %local_addr,
            peers = cycle.coordinator().peers().len(),
            resource = %config.resource,
            "node started"
        );

        Ok(Self {
            config,
            listener,
            local_addr,
            cycle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn coordinator(&self) -> &ExclusionCoordinator<NodePeers> {
        self.cycle.coordinator()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.cycle.stop_handle()
    }

    /// Serve peers and run resource cycles until `shutdown` resolves
    ///
    /// After `shutdown` the in-flight cycle, if any, runs to completion before
    /// the listener closes. Returns the number of completed cycles.
    pub async fn run<F>(self, shutdown: F) -> Result<u64, LifecycleError>
    where
        F: Future<Output = ()>,
    {
        let Node {
            config,
            listener,
            cycle,
            ..
        } = self;

        let service = Arc::new(NodeService::new(cycle.coordinator().clone()));
        let server = tokio::spawn(server::serve(listener, service, config.max_connections));

        let stop = cycle.stop_handle();
        let cycles = cycle.run();
        tokio::pin!(cycles);

        let result = tokio::select! {
            result = &mut cycles => result,
            _ = shutdown => {
                info!(node = %config.node, "stopping after the current cycle");
                stop.stop();
                cycles.await
            }
        };

        server.abort();
        Ok(result?)
    }
}

/// Bind the listener and build the node
///
/// A bind failure is fatal: a coordinator that peers cannot reach must not run.
pub async fn startup(config: Config) -> Result<Node, LifecycleError> {
    let listener = TcpListener::bind(&config.listen)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.listen.clone(), e))?;
    Node::with_listener(config, listener)
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to bind {0}: {1}")]
    BindFailed(String, std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Port {0} is outside the allowed range 1024-65535")]
    InvalidPort(u16),

    #[error("Invalid log file path: {0}")]
    InvalidLogPath(PathBuf),

    #[error("Coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
