//! Automation service recovery
//!
//! State machine:
//!
//! ```text
//! Idle -> Restarting -> AwaitingReady -> Idle
//! Idle -> Restarting -> Failed            (restart budget exceeded, terminal)
//! ```
//!
//! Only `TabLost` faults trigger a restart. The settle phase is a fixed delay; the service
//! offers no readiness signal worth polling.

use crate::config::RecoveryConfig;
use crate::gateway::{ChannelFault, FaultKind, ServiceControl};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Recovery controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Idle,
    Restarting,
    AwaitingReady,
    Failed,
}

/// Recovery could not bring the channel back
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
    #[error("restart budget exhausted after {restarts} restart(s)")]
    Exhausted { restarts: u32 },

    #[error("{0} faults are not recovered by a restart")]
    NotRecoverable(FaultKind),
}

/// Restarts the external automation service after a lost tab
pub struct RecoveryController {
    service: Arc<dyn ServiceControl>,
    budget: u32,
    restarts: u32,
    settle: Duration,
    stop_start_gap: Duration,
    state: RecoveryState,
}

impl RecoveryController {
    pub fn new(service: Arc<dyn ServiceControl>, config: &RecoveryConfig) -> Self {
        Self {
            service,
            budget: config.restart_budget,
            restarts: 0,
            settle: config.settle(),
            stop_start_gap: config.stop_start_gap(),
            state: RecoveryState::Idle,
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    /// Restarts performed so far this run
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Recovers from a channel fault
    ///
    /// A failed stop or start command uses up a restart and the cycle is tried again while
    /// budget remains.
    ///
    /// # Arguments
    ///
    /// * `fault` - The fault that interrupted an operation
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The service was restarted and has settled; retry the failed operation
    /// * `Err(RecoveryError::NotRecoverable)` - The fault is not a lost tab
    /// * `Err(RecoveryError::Exhausted)` - The budget is spent; the controller is now `Failed`
    pub async fn recover(&mut self, fault: &ChannelFault) -> Result<(), RecoveryError> {
        if self.state == RecoveryState::Failed {
            return Err(RecoveryError::Exhausted {
                restarts: self.restarts,
            });
        }

        if fault.kind != FaultKind::TabLost {
            return Err(RecoveryError::NotRecoverable(fault.kind));
        }

        loop {
            if self.restarts >= self.budget {
                self.state = RecoveryState::Failed;
                tracing::error!(
                    "Recovery Failed: restart budget exhausted ({}/{})",
                    self.restarts,
                    self.budget
                );
                return Err(RecoveryError::Exhausted {
                    restarts: self.restarts,
                });
            }

            self.restarts += 1;
            self.state = RecoveryState::Restarting;
            tracing::warn!(
                "Recovery Restarting after {} ({}/{})",
                fault,
                self.restarts,
                self.budget
            );

            if let Err(e) = self.restart_service().await {
                tracing::warn!(
                    "Restart {}/{} failed: {}",
                    self.restarts,
                    self.budget,
                    e
                );
                continue;
            }

            self.state = RecoveryState::AwaitingReady;
            tracing::info!(
                "Recovery AwaitingReady: settling for {:?} ({}/{})",
                self.settle,
                self.restarts,
                self.budget
            );
            tokio::time::sleep(self.settle).await;

            self.state = RecoveryState::Idle;
            tracing::info!(
                "Recovery Idle: service restarted ({}/{})",
                self.restarts,
                self.budget
            );
            return Ok(());
        }
    }

    async fn restart_service(&self) -> Result<(), crate::gateway::ServiceError> {
        // A stop failure usually means the service is already down
        if let Err(e) = self.service.stop().await {
            tracing::debug!("Ignoring stop failure: {}", e);
        }
        tokio::time::sleep(self.stop_start_gap).await;
        self.service.start().await
    }
}
