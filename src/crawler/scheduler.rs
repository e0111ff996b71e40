//! Account dispatch for the worker pool
//!
//! This module handles:
//! - The queue of accounts not yet started, in list order
//! - Pool size limiting via a semaphore
//! - Refusing to dispatch once the run has been halted

use crate::state::Account;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// An account cleared to start, holding its pool slot
pub struct ScheduledAccount {
    /// The account to crawl
    pub account: Account,

    /// Position in the account list (zero-based)
    pub position: usize,

    /// Pool slot; released when the account's task finishes
    pub _permit: OwnedSemaphorePermit,
}

/// Scheduler hands out queued accounts as pool slots free up
///
/// Accounts leave the queue in list order. Completion order is whatever the workers produce.
pub struct Scheduler {
    /// Semaphore bounding concurrent workers
    slots: Arc<Semaphore>,

    /// Accounts not yet dispatched, with their list positions
    queue: VecDeque<(usize, Account)>,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `accounts` - Accounts in list order
    /// * `worker_count` - Maximum concurrent workers
    pub fn new(accounts: Vec<Account>, worker_count: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(worker_count.max(1))),
            queue: accounts.into_iter().enumerate().collect(),
        }
    }

    /// Waits for a free slot and returns the next account
    ///
    /// # Arguments
    ///
    /// * `halted` - Checked again after the wait; a halted run dispatches nothing more
    ///
    /// # Returns
    ///
    /// * `Some(ScheduledAccount)` - The next account with its slot
    /// * `None` - The queue is empty or the run was halted
    pub async fn next_account(&mut self, halted: impl Fn() -> bool) -> Option<ScheduledAccount> {
        if self.queue.is_empty() || halted() {
            return None;
        }

        let permit = self.slots.clone().acquire_owned().await.ok()?;

        // The run may have been halted while every slot was busy
        if halted() {
            return None;
        }

        let (position, account) = self.queue.pop_front()?;
        tracing::trace!("Dispatching {} ({} queued)", account, self.queue.len());

        Some(ScheduledAccount {
            account,
            position,
            _permit: permit,
        })
    }

    /// Number of accounts not yet dispatched
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether every account has been dispatched
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Slots currently free
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}
