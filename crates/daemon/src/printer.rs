// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared resource service: a printer that handles one job at a time.
//!
//! It knows nothing about mutual exclusion; the nodes guarantee that only
//! one of them prints at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use mx_adapters::protocol::{Request, Response};
use mx_core::{UseReceipt, UseRequest};
use rand::Rng;
use tracing::info;

use crate::lifecycle::LifecycleError;
use crate::server::Service;

/// Lowest port the printer accepts
pub const MIN_PORT: u16 = 1024;

/// mx-printer command-line arguments
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mx-printer",
    version,
    about = "Shared printer service for mx nodes"
)]
pub struct PrinterArgs {
    /// TCP port to listen on
    #[arg(long, default_value_t = 50051)]
    pub port: u16,

    /// Shortest simulated print time
    #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
    pub min_delay: Duration,

    /// Longest simulated print time
    #[arg(long, default_value = "3s", value_parser = humantime::parse_duration)]
    pub max_delay: Duration,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

impl PrinterArgs {
    /// Listen address after checking the port range
    pub fn listen_addr(&self) -> Result<String, LifecycleError> {
        validate_port(self.port)?;
        Ok(format!("0.0.0.0:{}", self.port))
    }
}

pub fn validate_port(port: u16) -> Result<(), LifecycleError> {
    if port < MIN_PORT {
        return Err(LifecycleError::InvalidPort(port));
    }
    Ok(())
}

/// Printer that answers `UseResource` after a random delay
pub struct PrinterService {
    jobs: AtomicU64,
    min_delay: Duration,
    max_delay: Duration,
}

impl PrinterService {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            jobs: AtomicU64::new(0),
            min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    /// Number of jobs printed so far
    pub fn jobs(&self) -> u64 {
        self.jobs.load(Ordering::SeqCst)
    }

    async fn print(&self, request: UseRequest) -> UseReceipt {
        let job = self.jobs.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            job,
            client = %request.client,
            ts = request.timestamp,
            request_number = request.request_number,
            "print job received"
        );

        println!(
            "[TS: {}] NODE {}: {}",
            request.timestamp, request.client, request.content
        );

        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        UseReceipt {
            success: true,
            confirmation: format!("Print #{} completed", job),
            timestamp: request.timestamp,
        }
    }

    fn next_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..=self.max_delay)
    }
}

#[async_trait]
impl Service for PrinterService {
    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,
            Request::UseResource(request) => Response::Used(self.print(request).await),
            _ => Response::error("printer only serves UseResource"),
        }
    }
}

#[cfg(test)]
#[path = "printer_tests.rs"]
mod tests;
