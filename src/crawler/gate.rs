//! Serialized access to the automation channel
//!
//! `GatewayGate` is the one critical section every worker goes through. There are two levels:
//!
//! - A `PageLease` gives one worker the browser page from navigation until the end of its
//!   scroll loop, so no other account can navigate away underneath it.
//! - Each operation additionally holds the operation lock. A lost tab is recovered while that
//!   lock is held, which pauses all other channel access until the service is back and the
//!   interrupted operation has been replayed.
//!
//! Each operation runs on its own task. A worker that is cancelled by its timeout drops only
//! the join handle; the operation and any recovery it triggered run to completion.

use super::recovery::{RecoveryController, RecoveryError};
use crate::gateway::{ChannelFault, Gateway, GatewayOp};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Failure of a gated channel operation
#[derive(Debug, Clone, Error)]
pub enum GateError {
    /// The operation failed and a restart would not help
    #[error("channel fault: {0}")]
    Fault(ChannelFault),

    /// This operation's fault used up the restart budget
    #[error("recovery exhausted after {restarts} restart(s)")]
    RecoveryExhausted { restarts: u32 },

    /// The channel was given up earlier in the run
    #[error("automation channel unavailable")]
    Halted,

    /// The operation task ended without a result
    #[error("channel operation aborted: {0}")]
    Aborted(String),
}

impl GateError {
    /// Whether the run can no longer use the channel
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RecoveryExhausted { .. } | Self::Halted)
    }
}

/// Mutual exclusion and fault routing around a `Gateway`
pub struct GatewayGate {
    gateway: Arc<dyn Gateway>,
    recovery: Mutex<RecoveryController>,
    page: Arc<Mutex<()>>,
    halted: AtomicBool,
    restarts: AtomicU32,
}

/// Exclusive use of the browser page, released on drop
///
/// Operations issued through a lease still queue on the operation lock behind any operation
/// left running by a cancelled worker.
pub struct PageLease {
    gate: Arc<GatewayGate>,
    _page: OwnedMutexGuard<()>,
}

impl PageLease {
    pub async fn navigate(&self, url: &str) -> Result<String, GateError> {
        self.gate.call(GatewayOp::Navigate(url.to_string())).await
    }

    pub async fn evaluate(&self, script: &str) -> Result<String, GateError> {
        self.gate.call(GatewayOp::Evaluate(script.to_string())).await
    }

    pub async fn send_key(&self, key: &str) -> Result<String, GateError> {
        self.gate.call(GatewayOp::SendKey(key.to_string())).await
    }
}

impl GatewayGate {
    pub fn new(gateway: Arc<dyn Gateway>, recovery: RecoveryController) -> Self {
        Self {
            gateway,
            recovery: Mutex::new(recovery),
            page: Arc::new(Mutex::new(())),
            halted: AtomicBool::new(false),
            restarts: AtomicU32::new(0),
        }
    }

    /// Whether recovery has been exhausted this run
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Service restarts performed so far
    pub fn restarts(&self) -> u32 {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Waits until no other worker holds the page
    pub async fn lease(self: &Arc<Self>) -> PageLease {
        let page = Arc::clone(&self.page).lock_owned().await;
        PageLease {
            gate: Arc::clone(self),
            _page: page,
        }
    }

    /// Runs one operation inside the critical section
    ///
    /// # Arguments
    ///
    /// * `op` - The operation to run; replayed as-is after a successful recovery
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Raw channel output
    /// * `Err(GateError)` - The operation failed or the channel is gone
    pub async fn call(self: &Arc<Self>, op: GatewayOp) -> Result<String, GateError> {
        if self.is_halted() {
            return Err(GateError::Halted);
        }

        let gate = Arc::clone(self);
        let handle = tokio::spawn(async move { gate.execute(op).await });

        match handle.await {
            Ok(result) => result,
            Err(e) => Err(GateError::Aborted(e.to_string())),
        }
    }

    async fn execute(&self, op: GatewayOp) -> Result<String, GateError> {
        let mut recovery = self.recovery.lock().await;

        loop {
            // Another operation may have exhausted recovery while this one waited
            if self.is_halted() {
                return Err(GateError::Halted);
            }

            let fault = match op.execute(self.gateway.as_ref()).await {
                Ok(output) => return Ok(output),
                Err(fault) => fault,
            };

            tracing::warn!("Channel fault classified as {}: {}", fault.kind, fault);

            if !fault.is_tab_lost() {
                return Err(GateError::Fault(fault));
            }

            match recovery.recover(&fault).await {
                Ok(()) => {
                    self.restarts.store(recovery.restarts(), Ordering::SeqCst);
                    tracing::info!("Replaying {} after recovery", op.name());
                }
                Err(RecoveryError::Exhausted { restarts }) => {
                    self.restarts.store(restarts, Ordering::SeqCst);
                    self.halted.store(true, Ordering::SeqCst);
                    return Err(GateError::RecoveryExhausted { restarts });
                }
                Err(RecoveryError::NotRecoverable(_)) => return Err(GateError::Fault(fault)),
            }
        }
    }
}
