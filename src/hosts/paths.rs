use std::path::{Path, PathBuf};
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::error::AppError;
use crate::fields::{
    CLAUDE_CODE, CLAUDE_DESKTOP, CODEX, CURSOR, GEMINI, KIRO, OPENCODE, VSCODE,
};

/// 全局基准目录覆盖：测试与嵌入方可以把所有宿主路径重定向到隔离目录
static BASE_DIR_OVERRIDE: Lazy<RwLock<Option<PathBuf>>> = Lazy::new(|| RwLock::new(None));

/// 设置基准目录覆盖；传 `None` 恢复默认（用户主目录）
pub fn set_base_dir_override(dir: Option<PathBuf>) {
    *BASE_DIR_OVERRIDE.write().expect("基准目录锁被毒化") = dir;
}

/// 当前基准目录：覆盖优先，否则用户主目录
fn base_dir() -> PathBuf {
    if let Some(dir) = BASE_DIR_OVERRIDE
        .read()
        .expect("基准目录锁被毒化")
        .clone()
    {
        return dir;
    }
    dirs::home_dir().expect("无法获取用户主目录")
}

/// Claude Desktop 的配置文件位置随平台变化
fn claude_desktop_config_path(home: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        home.join("Library")
            .join("Application Support")
            .join("Claude")
            .join("claude_desktop_config.json")
    } else if cfg!(target_os = "windows") {
        home.join("AppData")
            .join("Roaming")
            .join("Claude")
            .join("claude_desktop_config.json")
    } else {
        home.join(".config")
            .join("Claude")
            .join("claude_desktop_config.json")
    }
}

/// 获取指定宿主的原生配置文件路径
pub fn host_config_path(host: &str) -> Result<PathBuf, AppError> {
    let home = base_dir();
    let path = match host {
        CLAUDE_DESKTOP => claude_desktop_config_path(&home),
        CLAUDE_CODE => home.join(".claude.json"),
        CURSOR => home.join(".cursor").join("mcp.json"),
        VSCODE => home.join(".vscode").join("mcp.json"),
        CODEX => home.join(".codex").join("config.toml"),
        GEMINI => home.join(".gemini").join("settings.json"),
        KIRO => home.join(".kiro").join("settings").join("mcp.json"),
        OPENCODE => home.join(".config").join("opencode").join("opencode.json"),
        other => return Err(AppError::UnknownHost(other.to_string())),
    };
    Ok(path)
}

/// 应用自身的数据目录 (~/.mcp-hub)
pub fn hub_dir() -> PathBuf {
    base_dir().join(".mcp-hub")
}

/// 备份根目录 (~/.mcp-hub/backups)，每个宿主一个子目录
pub fn backup_root() -> PathBuf {
    hub_dir().join("backups")
}
