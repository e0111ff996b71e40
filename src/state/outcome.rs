//! Accounts, per-account crawl outcomes and run progress
//!
//! `CrawlOutcome` is the single value a worker hands back for an account. "Nothing new" and
//! "failed" are separate variants, so retry decisions never have to inspect an error.

use crate::state::post::PostEntry;
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A social account handle, without the leading `@`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account(String);

impl Account {
    /// Parses a handle, accepting an optional leading `@`
    ///
    /// Handles are ASCII letters, digits and underscores.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let handle = raw.trim().trim_start_matches('@');

        if handle.is_empty()
            || handle.len() > 50
            || !handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidAccount(raw.to_string()));
        }

        Ok(Self(handle.to_string()))
    }

    pub fn handle(&self) -> &str {
        &self.0
    }

    /// Profile page of this account under the given site root
    pub fn profile_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Terminal result of crawling one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlOutcome {
    /// Posts in discovery order; unresolvable posts are kept as placeholders
    Success(Vec<PostEntry>),

    /// Nothing was posted inside the recency window
    NoNewPosts,

    /// The account could not be crawled
    Failed(String),
}

impl CrawlOutcome {
    /// Converts the outcome kind to its journal representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::NoNewPosts => "no_new_posts",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Entries carried by the outcome (empty unless `Success`)
    pub fn entries(&self) -> &[PostEntry] {
        match self {
            Self::Success(entries) => entries,
            _ => &[],
        }
    }

    /// Number of post references, resolved or not
    pub fn post_count(&self) -> usize {
        self.entries().len()
    }

    /// Number of posts whose content could not be resolved
    pub fn unavailable_count(&self) -> usize {
        self.entries().iter().filter(|e| !e.is_resolved()).count()
    }

    /// Failure reason, if any
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Accounts completed so far out of the run total
///
/// Progress only moves forward; every written outcome gets the next value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub completed: usize,
    pub total: usize,
}

impl RunProgress {
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
        }
    }

    /// Advances by one completed account and returns the new value
    pub fn advance(&mut self) -> Self {
        self.completed += 1;
        *self
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

impl fmt::Display for RunProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.completed, self.total)
    }
}
