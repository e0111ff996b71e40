//! Crawler module for account crawling and channel fault handling
//!
//! This module contains the core crawling logic, including:
//! - Run orchestration over a bounded worker pool
//! - Serialized access to the automation channel with transparent tab recovery
//! - Per-account discovery by scrolling, and content resolution
//! - Page scripts evaluated through the channel

mod coordinator;
mod gate;
mod recovery;
mod scheduler;
pub mod scripts;
mod worker;

pub use coordinator::{Orchestrator, RunReport};
pub use gate::{GateError, GatewayGate, PageLease};
pub use recovery::{RecoveryController, RecoveryError, RecoveryState};
pub use scheduler::{ScheduledAccount, Scheduler};
pub use worker::AccountWorker;
