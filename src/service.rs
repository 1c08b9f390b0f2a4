// ============================================================================
// Sync Orchestrator - configure / remove / cross-host synchronization
// ============================================================================

use std::path::PathBuf;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::adapters::AdapterRegistry;
use crate::backup::BackupManager;
use crate::error::AppError;
use crate::hosts::{strategy_for, HostStrategy};
use crate::merge::merge_partial_update;
use crate::model::ServerConfig;
use crate::report::{generate_report, ConversionReport, Operation};

/// Knobs for a single configure/remove/sync call
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions {
    /// Skip the pre-mutation backup
    pub no_backup: bool,
    /// Compute everything, write nothing
    pub dry_run: bool,
    /// Attach field-level conversion reports to the results
    pub generate_reports: bool,
}

impl ConfigureOptions {
    pub fn with_reports() -> Self {
        Self {
            generate_reports: true,
            ..Self::default()
        }
    }
}

/// Where a sync draws its source server set from
#[derive(Debug, Clone)]
pub enum SyncSource {
    /// A named environment, resolved through the registered `EnvironmentSource`
    Environment(String),
    /// Another host's live configuration file
    Host(String),
}

/// Which servers of the source set take part in a sync
#[derive(Debug, Clone)]
pub enum ServerFilter {
    All,
    /// Explicit name list; unknown names fail the whole call up front
    Names(Vec<String>),
    /// Regex over server names
    Pattern(String),
}

/// Outcome of one (server, host) unit of work
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationResult {
    pub success: bool,
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    pub backup_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub conversion_reports: Vec<ConversionReport>,
}

impl ConfigurationResult {
    fn ok(
        hostname: &str,
        server_name: Option<String>,
        backup_path: Option<PathBuf>,
        conversion_reports: Vec<ConversionReport>,
    ) -> Self {
        Self {
            success: true,
            hostname: hostname.to_string(),
            server_name,
            backup_created: backup_path.is_some(),
            backup_path,
            error_message: None,
            conversion_reports,
        }
    }

    /// Failed results always carry a message; an empty one is replaced so the
    /// "`error_message` present whenever `success` is false" invariant holds
    /// by construction.
    fn failed(hostname: &str, server_name: Option<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "未知错误".to_string()
        } else {
            message
        };
        Self {
            success: false,
            hostname: hostname.to_string(),
            server_name,
            backup_created: false,
            backup_path: None,
            error_message: Some(message),
            conversion_reports: Vec::new(),
        }
    }
}

/// Aggregate outcome of one sync call
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub success: bool,
    pub results: Vec<ConfigurationResult>,
    /// Distinct servers that reached at least one target
    pub servers_synced: usize,
    /// Distinct hosts that accepted at least one server
    pub hosts_updated: usize,
}

impl SyncResult {
    fn from_results(results: Vec<ConfigurationResult>) -> Self {
        let mut servers: Vec<&str> = results
            .iter()
            .filter(|r| r.success)
            .filter_map(|r| r.server_name.as_deref())
            .collect();
        servers.sort();
        servers.dedup();

        let mut hosts: Vec<&str> = results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.hostname.as_str())
            .collect();
        hosts.sort();
        hosts.dedup();

        Self {
            success: results.iter().all(|r| r.success),
            servers_synced: servers.len(),
            hosts_updated: hosts.len(),
            results,
        }
    }
}

/// External environment/package tracking collaborator. The core only uses it
/// to resolve sync sources and to emit one-way notifications; it never owns or
/// mutates environment state.
pub trait EnvironmentSource: Send + Sync {
    /// Resolve an environment name to its server set
    fn resolve_servers(&self, env_name: &str)
        -> Result<IndexMap<String, ServerConfig>, AppError>;

    /// Notification after a successful configure/restore; implementations may
    /// persist the (package, host, summary) tuple for later cross-reference
    fn on_configured(&self, _package: &str, _host: &str, _summary: &str) {}
}

/// Top-level facade over adapters, host strategies and backups.
///
/// Every single-server operation walks the same path: look up the adapter,
/// validate + serialize, look up the host strategy, back up unless suppressed,
/// write atomically, report. Per-unit errors are converted into failed
/// `ConfigurationResult`s so one bad target never aborts a multi-host sync.
pub struct SyncService {
    adapters: AdapterRegistry,
    backups: BackupManager,
    environment: Option<Box<dyn EnvironmentSource>>,
}

impl SyncService {
    pub fn new() -> Self {
        Self {
            adapters: AdapterRegistry::with_builtin_hosts(),
            backups: BackupManager::new(),
            environment: None,
        }
    }

    pub fn with_environment(mut self, source: Box<dyn EnvironmentSource>) -> Self {
        self.environment = Some(source);
        self
    }

    pub fn with_backups(mut self, backups: BackupManager) -> Self {
        self.backups = backups;
        self
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn adapters_mut(&mut self) -> &mut AdapterRegistry {
        &mut self.adapters
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Configure one server on one host (create or partial update)
    pub fn configure_server(
        &self,
        host: &str,
        config: &ServerConfig,
        opts: &ConfigureOptions,
    ) -> ConfigurationResult {
        let server_name = Some(config.name.clone()).filter(|n| !n.is_empty());
        match self.try_configure(host, config, opts, None) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("配置 MCP 服务器失败 ({host}): {err}");
                ConfigurationResult::failed(host, server_name, err.to_string())
            }
        }
    }

    fn try_configure(
        &self,
        host: &str,
        config: &ServerConfig,
        opts: &ConfigureOptions,
        source_host: Option<&str>,
    ) -> Result<ConfigurationResult, AppError> {
        if config.name.trim().is_empty() {
            return Err(AppError::InvalidInput("服务器名称不能为空".into()));
        }

        let adapter = self.adapters.get(host)?;
        let strategy = strategy_for(host)?;

        // Existing-server detection drives create-vs-update and the merge rule
        let current = strategy.read()?;
        let existing = current.get(&config.name);

        let (operation, effective) = match existing {
            Some(prev) => (Operation::Update, merge_partial_update(prev, config)?),
            None => {
                // A brand-new server must carry a transport payload up front
                config.validate()?;
                let operation = if source_host.is_some() {
                    // Host-to-host sync lands new entries as migrations
                    Operation::Migrate
                } else {
                    Operation::Create
                };
                (operation, config.clone())
            }
        };

        let native = adapter.serialize(&effective)?;

        let conversion_reports = if opts.generate_reports {
            vec![generate_report(
                operation,
                &effective.name,
                host,
                &effective,
                source_host,
                existing,
                opts.dry_run,
            )?]
        } else {
            Vec::new()
        };

        if opts.dry_run {
            log::info!(
                "[dry-run] MCP 服务器 '{}' 将写入宿主 '{host}'",
                effective.name
            );
            return Ok(ConfigurationResult::ok(
                host,
                Some(effective.name.clone()),
                None,
                conversion_reports,
            ));
        }

        let path = strategy.config_path()?;
        let backup_path = if opts.no_backup {
            None
        } else {
            self.backups.create_backup(host, &path)?
        };

        strategy.write_server(&effective.name, &native)?;
        log::info!("MCP 服务器 '{}' 已写入宿主 '{host}'", effective.name);

        if let Some(env) = &self.environment {
            env.on_configured(&effective.name, host, &effective.summary());
        }

        Ok(ConfigurationResult::ok(
            host,
            Some(effective.name.clone()),
            backup_path,
            conversion_reports,
        ))
    }

    /// Remove one server from one host
    pub fn remove_server(
        &self,
        host: &str,
        name: &str,
        opts: &ConfigureOptions,
    ) -> ConfigurationResult {
        match self.try_remove(host, name, opts) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("移除 MCP 服务器失败 ({host}/{name}): {err}");
                ConfigurationResult::failed(host, Some(name.to_string()), err.to_string())
            }
        }
    }

    fn try_remove(
        &self,
        host: &str,
        name: &str,
        opts: &ConfigureOptions,
    ) -> Result<ConfigurationResult, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("服务器名称不能为空".into()));
        }

        let strategy = strategy_for(host)?;
        let current = strategy.read()?;
        let Some(existing) = current.get(name) else {
            return Ok(ConfigurationResult::failed(
                host,
                Some(name.to_string()),
                format!("宿主 '{host}' 中不存在服务器 '{name}'"),
            ));
        };

        let conversion_reports = if opts.generate_reports {
            vec![generate_report(
                Operation::Delete,
                name,
                host,
                existing,
                None,
                None,
                opts.dry_run,
            )?]
        } else {
            Vec::new()
        };

        if opts.dry_run {
            log::info!("[dry-run] 将从宿主 '{host}' 移除 MCP 服务器 '{name}'");
            return Ok(ConfigurationResult::ok(
                host,
                Some(name.to_string()),
                None,
                conversion_reports,
            ));
        }

        let path = strategy.config_path()?;
        let backup_path = if opts.no_backup {
            None
        } else {
            self.backups.create_backup(host, &path)?
        };

        strategy.remove_server(name)?;
        log::info!("已从宿主 '{host}' 移除 MCP 服务器 '{name}'");

        Ok(ConfigurationResult::ok(
            host,
            Some(name.to_string()),
            backup_path,
            conversion_reports,
        ))
    }

    /// Remove every server entry from one host's configuration file
    pub fn remove_host_configuration(
        &self,
        host: &str,
        opts: &ConfigureOptions,
    ) -> ConfigurationResult {
        match self.try_remove_host(host, opts) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("清空宿主配置失败 ({host}): {err}");
                ConfigurationResult::failed(host, None, err.to_string())
            }
        }
    }

    fn try_remove_host(
        &self,
        host: &str,
        opts: &ConfigureOptions,
    ) -> Result<ConfigurationResult, AppError> {
        let strategy = strategy_for(host)?;

        if opts.dry_run {
            let count = strategy.read()?.len();
            log::info!("[dry-run] 将从宿主 '{host}' 移除 {count} 个 MCP 服务器");
            return Ok(ConfigurationResult::ok(host, None, None, Vec::new()));
        }

        let path = strategy.config_path()?;
        let backup_path = if opts.no_backup {
            None
        } else {
            self.backups.create_backup(host, &path)?
        };

        let removed = strategy.remove_all()?;
        log::info!("已从宿主 '{host}' 移除 {removed} 个 MCP 服务器");

        Ok(ConfigurationResult::ok(host, None, backup_path, Vec::new()))
    }

    /// Synchronize a set of servers from one source onto one or more targets.
    ///
    /// Each (server, target host) pair is configured independently; a failing
    /// pair is recorded and the remaining pairs still run. Source resolution
    /// and filter errors are global (the caller can correct them) and abort
    /// before any write happens.
    pub fn sync_configurations(
        &self,
        source: &SyncSource,
        to_hosts: &[&str],
        filter: &ServerFilter,
        opts: &ConfigureOptions,
    ) -> Result<SyncResult, AppError> {
        let servers = self.resolve_source(source)?;
        let selected = apply_filter(servers, filter)?;
        let source_host = match source {
            SyncSource::Host(id) => Some(id.as_str()),
            SyncSource::Environment(_) => None,
        };

        if selected.is_empty() {
            log::warn!("同步源中没有匹配的 MCP 服务器，跳过");
            return Ok(SyncResult::from_results(Vec::new()));
        }

        let mut results = Vec::with_capacity(selected.len() * to_hosts.len());
        for (name, config) in &selected {
            let mut unit = config.clone();
            unit.name = name.clone();
            for host in to_hosts {
                // Skip writing the source's own file back onto itself
                if source_host == Some(*host) {
                    log::debug!("跳过同步到源宿主自身: {host}");
                    continue;
                }
                let result = match self.try_configure(host, &unit, opts, source_host) {
                    Ok(result) => result,
                    Err(err) => {
                        log::warn!("同步 '{name}' 到宿主 '{host}' 失败: {err}");
                        ConfigurationResult::failed(host, Some(name.clone()), err.to_string())
                    }
                };
                results.push(result);
            }
        }

        let sync_result = SyncResult::from_results(results);
        log::info!(
            "同步完成: {} 个服务器, {} 个宿主更新, {} 个单元失败",
            sync_result.servers_synced,
            sync_result.hosts_updated,
            sync_result.results.iter().filter(|r| !r.success).count()
        );
        Ok(sync_result)
    }

    /// List one host's servers in canonical shape (shared read path for the
    /// CLI collaborator and for sync sources)
    pub fn read_host_configuration(
        &self,
        host: &str,
    ) -> Result<crate::model::HostConfiguration, AppError> {
        strategy_for(host)?.read()
    }

    fn resolve_source(
        &self,
        source: &SyncSource,
    ) -> Result<IndexMap<String, ServerConfig>, AppError> {
        match source {
            SyncSource::Environment(env_name) => {
                let env = self.environment.as_ref().ok_or_else(|| {
                    AppError::Config("未配置环境源，无法按环境名解析服务器".into())
                })?;
                env.resolve_servers(env_name)
            }
            SyncSource::Host(host) => Ok(strategy_for(host)?.read()?.servers),
        }
    }

    /// Restore a host's configuration file from a backup ("latest" or an
    /// exact backup filename). Reconciling any external cross-reference state
    /// against the restored server list is the caller's responsibility.
    pub fn restore_host_configuration(
        &self,
        host: &str,
        selector: &str,
    ) -> Result<PathBuf, AppError> {
        let strategy = strategy_for(host)?;
        let live_path = strategy.config_path()?;
        self.backups.restore_backup(host, selector, &live_path)
    }
}

impl Default for SyncService {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_filter(
    servers: IndexMap<String, ServerConfig>,
    filter: &ServerFilter,
) -> Result<IndexMap<String, ServerConfig>, AppError> {
    match filter {
        ServerFilter::All => Ok(servers),
        ServerFilter::Names(names) => {
            let missing: Vec<&str> = names
                .iter()
                .filter(|n| !servers.contains_key(n.as_str()))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "同步源中不存在这些服务器: {}",
                    missing.join(", ")
                )));
            }
            Ok(servers
                .into_iter()
                .filter(|(name, _)| names.iter().any(|n| n == name))
                .collect())
        }
        ServerFilter::Pattern(pattern) => {
            let regex = Regex::new(pattern).map_err(|e| {
                AppError::InvalidInput(format!("非法的服务器名模式 '{pattern}': {e}"))
            })?;
            Ok(servers
                .into_iter()
                .filter(|(name, _)| regex.is_match(name))
                .collect())
        }
    }
}
