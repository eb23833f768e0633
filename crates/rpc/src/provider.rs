//! RPC provider for the in-process registry.

use crate::{FileLedger, MemoryLedger, Result, RpcError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Hands out handles to a [`MemoryLedger`]. Counts handle acquisitions and
/// can inject connection latency and failures.
pub struct LocalRpcProvider {
    ledger: MemoryLedger,
    network: String,
    latency: Option<Duration>,
    acquisitions: AtomicUsize,
    failures_remaining: AtomicUsize,
}

impl LocalRpcProvider {
    pub fn new(ledger: MemoryLedger) -> Self {
        Self {
            ledger,
            network: "local".to_string(),
            latency: None,
            acquisitions: AtomicUsize::new(0),
            failures_remaining: AtomicUsize::new(0),
        }
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Delay every handle acquisition by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next `count` acquisitions fail with a connection error.
    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Number of handle acquisitions attempted so far.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }
}

#[async_trait]
impl crate::RpcProvider for LocalRpcProvider {
    async fn ledger_handle(&self) -> Result<Arc<dyn FileLedger>> {
        let attempt = self.acquisitions.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let injected = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            warn!(network = %self.network, attempt, "injected ledger connection failure");
            return Err(RpcError::Connection(format!(
                "{} ledger unreachable",
                self.network
            )));
        }

        debug!(network = %self.network, caller = %self.ledger.caller(), attempt, "ledger handle issued");
        Ok(Arc::new(self.ledger.clone()))
    }

    fn network(&self) -> &str {
        &self.network
    }
}
