// ============================================================================
// Host Strategy Layer - native config file I/O per host
// ============================================================================

mod decode;
mod json_host;
pub mod paths;
mod toml_host;

pub use json_host::JsonHostStrategy;
pub use paths::{host_config_path, set_base_dir_override};
pub use toml_host::TomlHostStrategy;

use std::path::PathBuf;

use serde_json::Value;

use crate::error::AppError;
use crate::fields::{spec_for, CODEX, OPENCODE, VSCODE};
use crate::model::HostConfiguration;

/// One host's file I/O: where its config lives, how to decode it back into
/// canonical shape, and how to mutate single entries without touching anything
/// else in the file. Strategies are stateless; every call re-reads the file.
pub trait HostStrategy: Send + Sync {
    fn host(&self) -> &str;

    /// On-disk location of this host's native configuration file
    fn config_path(&self) -> Result<PathBuf, AppError>;

    /// Decode the whole file into canonical entries (empty when absent)
    fn read(&self) -> Result<HostConfiguration, AppError>;

    /// Insert or replace one entry, preserving every other entry and every
    /// unrelated key already present in the file
    fn write_server(&self, name: &str, record: &serde_json::Map<String, Value>)
        -> Result<(), AppError>;

    /// Remove one entry; returns whether it existed
    fn remove_server(&self, name: &str) -> Result<bool, AppError>;

    /// Remove every entry; returns how many were removed
    fn remove_all(&self) -> Result<usize, AppError>;
}

/// Strategy lookup by host identifier. Like the adapter registry, this is the
/// single place that maps host ids to concrete file handling.
pub fn strategy_for(host: &str) -> Result<Box<dyn HostStrategy>, AppError> {
    let spec = spec_for(host).ok_or_else(|| AppError::UnknownHost(host.to_string()))?;
    if host == CODEX {
        return Ok(Box::new(TomlHostStrategy::new(spec)));
    }
    // vscode nests servers under `servers`, opencode under `mcp`; everyone
    // else uses the common `mcpServers` key.
    let top_key = match host {
        VSCODE => "servers",
        OPENCODE => "mcp",
        _ => "mcpServers",
    };
    Ok(Box::new(JsonHostStrategy::new(spec, top_key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::host_ids;

    #[test]
    fn every_registered_host_has_a_strategy() {
        for host in host_ids() {
            let strategy = strategy_for(host).expect("strategy");
            assert_eq!(strategy.host(), host);
        }
    }

    #[test]
    fn unknown_host_has_none() {
        assert!(matches!(
            strategy_for("zed"),
            Err(AppError::UnknownHost(_))
        ));
    }
}
