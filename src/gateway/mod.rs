//! Automation channel gateway
//!
//! The browser automation channel is an external program. This module defines the boundary the
//! crawler talks to:
//!
//! - `Gateway`: navigate, evaluate a script, send a key; each returns raw output text
//! - `ServiceControl`: stop and start the external automation service
//! - `ChannelFault`: a classified channel-level failure plus the operation in flight
//! - `FaultClassifier`: maps output text to a `FaultKind` from configurable patterns
//! - `payload`: extraction of the structured JSON payload from raw output
//! - `CliGateway`: the subprocess-backed implementation of both traits

mod cli;
pub mod payload;

pub use cli::CliGateway;

use crate::config::GatewayConfig;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Classification of a channel-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The browser tab is gone; only a service restart brings it back
    TabLost,

    /// The channel could not reach the page or the service
    NetworkError,

    /// Anything the classifier does not recognise
    Unknown,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TabLost => "tab_lost",
            Self::NetworkError => "network_error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single gateway operation, kept so a failed operation can be replayed after recovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOp {
    Navigate(String),
    Evaluate(String),
    SendKey(String),
}

impl GatewayOp {
    /// Runs this operation against a gateway
    pub async fn execute(&self, gateway: &dyn Gateway) -> Result<String, ChannelFault> {
        match self {
            Self::Navigate(url) => gateway.navigate(url).await,
            Self::Evaluate(script) => gateway.evaluate(script).await,
            Self::SendKey(key) => gateway.send_key(key).await,
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Navigate(_) => "navigate",
            Self::Evaluate(_) => "evaluate",
            Self::SendKey(_) => "send_key",
        }
    }
}

impl fmt::Display for GatewayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate(url) => write!(f, "navigate {}", url),
            Self::Evaluate(_) => f.write_str("evaluate <script>"),
            Self::SendKey(key) => write!(f, "send_key {}", key),
        }
    }
}

/// Channel-level failure of one gateway operation
#[derive(Debug, Clone, Error)]
#[error("{kind} during {operation}: {message}")]
pub struct ChannelFault {
    pub kind: FaultKind,
    pub operation: GatewayOp,
    pub message: String,
}

impl ChannelFault {
    pub fn new(kind: FaultKind, operation: GatewayOp, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation,
            message: message.into(),
        }
    }

    pub fn is_tab_lost(&self) -> bool {
        self.kind == FaultKind::TabLost
    }
}

/// Browser automation capabilities
///
/// Implementations are not required to be safe for concurrent use; callers serialize access.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Loads `url` in the automation tab
    async fn navigate(&self, url: &str) -> Result<String, ChannelFault>;

    /// Evaluates a script in the current page and returns the raw output
    async fn evaluate(&self, script: &str) -> Result<String, ChannelFault>;

    /// Sends a key press to the current page
    async fn send_key(&self, key: &str) -> Result<String, ChannelFault>;
}

/// Failure of a service control command
#[derive(Debug, Clone, Error)]
#[error("service {command} failed: {message}")]
pub struct ServiceError {
    pub command: &'static str,
    pub message: String,
}

/// Control commands for the external automation service
#[async_trait]
pub trait ServiceControl: Send + Sync {
    async fn stop(&self) -> Result<(), ServiceError>;

    async fn start(&self) -> Result<(), ServiceError>;
}

/// Maps raw channel output to a `FaultKind`
///
/// Matching is a case-insensitive substring search. Tab-lost patterns are checked first, so an
/// output matching both lists is treated as `TabLost`.
#[derive(Debug, Clone)]
pub struct FaultClassifier {
    tab_lost: Vec<String>,
    network: Vec<String>,
}

impl FaultClassifier {
    pub fn new(tab_lost: Vec<String>, network: Vec<String>) -> Self {
        Self {
            tab_lost: tab_lost.into_iter().map(|p| p.to_lowercase()).collect(),
            network: network.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.tab_lost_patterns.clone(),
            config.network_patterns.clone(),
        )
    }

    /// Classifies output text
    ///
    /// # Returns
    ///
    /// * `Some(FaultKind)` - The output matches a known pattern
    /// * `None` - No pattern matched
    pub fn classify(&self, output: &str) -> Option<FaultKind> {
        let lowered = output.to_lowercase();

        if self.tab_lost.iter().any(|p| lowered.contains(p.as_str())) {
            Some(FaultKind::TabLost)
        } else if self.network.iter().any(|p| lowered.contains(p.as_str())) {
            Some(FaultKind::NetworkError)
        } else {
            None
        }
    }
}

impl Default for FaultClassifier {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}
