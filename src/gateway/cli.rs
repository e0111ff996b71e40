//! Subprocess-backed gateway
//!
//! Every operation runs the automation program once, for example
//! `openclaw browser evaluate --target-id T --fn '<script>'`, and classifies its output.

use super::payload;
use super::{
    ChannelFault, FaultClassifier, FaultKind, Gateway, GatewayOp, ServiceControl, ServiceError,
};
use crate::config::GatewayConfig;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Gateway and service control over the automation program's command line
pub struct CliGateway {
    program: String,
    prefix_args: Vec<String>,
    command_timeout: Duration,
    classifier: FaultClassifier,

    /// Tab opened by the current page lease's navigation
    ///
    /// Only the worker holding the page lease navigates, so between its navigation and the
    /// end of its lease this is that worker's tab.
    target_id: Mutex<Option<String>>,
}

impl CliGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            program: config.program.clone(),
            prefix_args: config.args.clone(),
            command_timeout: Duration::from_secs(config.command_timeout_secs),
            classifier: FaultClassifier::from_config(config),
            target_id: Mutex::new(None),
        }
    }

    fn current_target(&self) -> Option<String> {
        self.target_id.lock().ok().and_then(|guard| guard.clone())
    }

    fn set_target(&self, target: Option<String>) {
        if let Ok(mut guard) = self.target_id.lock() {
            *guard = target;
        }
    }

    /// Runs one subcommand and returns its stdout
    ///
    /// # Arguments
    ///
    /// * `args` - Subcommand and its arguments, appended to the configured prefix
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The command exited cleanly and did not report a lost tab
    /// * `Err((FaultKind, String))` - Spawn failure, timeout, non-zero exit or a lost tab
    async fn run(&self, args: &[&str]) -> Result<String, (FaultKind, String)> {
        tracing::trace!("Running {} {:?} {:?}", self.program, self.prefix_args, args);

        let result = tokio::time::timeout(
            self.command_timeout,
            tokio::process::Command::new(&self.program)
                .args(&self.prefix_args)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err((
                    FaultKind::Unknown,
                    format!("failed to launch {}: {}", self.program, e),
                ));
            }
            Err(_) => {
                return Err((
                    FaultKind::NetworkError,
                    format!("command timed out after {:?}", self.command_timeout),
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{}\n{}", stderr, stdout);
        let kind = self.classifier.classify(&combined);

        // A lost tab can be reported with a clean exit status
        if kind == Some(FaultKind::TabLost) {
            return Err((FaultKind::TabLost, first_line(&combined)));
        }

        if !output.status.success() {
            return Err((
                kind.unwrap_or(FaultKind::Unknown),
                format!("exit status {}: {}", output.status, first_line(&combined)),
            ));
        }

        Ok(stdout)
    }

    async fn run_op(&self, args: &[&str], operation: GatewayOp) -> Result<String, ChannelFault> {
        self.run(args)
            .await
            .map_err(|(kind, message)| ChannelFault::new(kind, operation, message))
    }

    async fn control(&self, command: &'static str) -> Result<(), ServiceError> {
        self.run(&[command])
            .await
            .map(|_| ())
            .map_err(|(_, message)| ServiceError { command, message })
    }
}

#[async_trait]
impl Gateway for CliGateway {
    async fn navigate(&self, url: &str) -> Result<String, ChannelFault> {
        let op = GatewayOp::Navigate(url.to_string());

        // A failed navigation must not leave evaluations aimed at the previous account's tab
        self.set_target(None);
        let output = self.run_op(&["navigate", "--json", url], op).await?;

        let target = payload::target_id(&output);
        if target.is_none() {
            tracing::debug!("Navigation to {} reported no targetId", url);
        }
        self.set_target(target);

        Ok(output)
    }

    async fn evaluate(&self, script: &str) -> Result<String, ChannelFault> {
        let op = GatewayOp::Evaluate(script.to_string());

        match self.current_target() {
            Some(target) => {
                self.run_op(&["evaluate", "--target-id", &target, "--fn", script], op)
                    .await
            }
            None => self.run_op(&["evaluate", "--fn", script], op).await,
        }
    }

    async fn send_key(&self, key: &str) -> Result<String, ChannelFault> {
        self.run_op(&["press", key], GatewayOp::SendKey(key.to_string()))
            .await
    }
}

#[async_trait]
impl ServiceControl for CliGateway {
    async fn stop(&self) -> Result<(), ServiceError> {
        self.set_target(None);
        self.control("stop").await
    }

    async fn start(&self) -> Result<(), ServiceError> {
        self.control("start").await
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .to_string()
}
