//! Account list loading
//!
//! The list is maintained outside this crate. It is read once per run: one handle per line,
//! blank lines and `#` comments ignored, duplicates dropped while keeping the first position.

use crate::state::Account;
use crate::ConfigError;
use std::collections::HashSet;
use std::path::Path;

/// Loads the ordered account list from a file
///
/// # Arguments
///
/// * `path` - Path to the account list
///
/// # Returns
///
/// * `Ok(Vec<Account>)` - Accounts in file order
/// * `Err(ConfigError)` - The file is unreadable or contains an invalid handle
pub fn load_accounts(path: &Path) -> Result<Vec<Account>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let accounts = parse_accounts(&content)?;
    tracing::info!("Loaded {} accounts from {}", accounts.len(), path.display());
    Ok(accounts)
}

/// Parses account list text
pub fn parse_accounts(content: &str) -> Result<Vec<Account>, ConfigError> {
    let mut seen = HashSet::new();
    let mut accounts = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let account = Account::parse(line)?;
        if seen.insert(account.clone()) {
            accounts.push(account);
        } else {
            tracing::debug!("Skipping duplicate account {}", account);
        }
    }

    Ok(accounts)
}
