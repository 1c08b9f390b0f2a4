use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use mcp_hub_lib::set_base_dir_override;

/// 为测试设置隔离的基准目录，避免污染真实用户数据。
pub fn ensure_test_home() -> &'static Path {
    static HOME: OnceLock<PathBuf> = OnceLock::new();
    HOME.get_or_init(|| {
        let base = std::env::temp_dir().join("mcp-hub-test-home");
        if base.exists() {
            let _ = std::fs::remove_dir_all(&base);
        }
        std::fs::create_dir_all(&base).expect("create test home");
        base
    })
    .as_path()
}

/// 清理测试目录中生成的宿主配置与备份，并把所有宿主路径重定向到隔离目录。
pub fn reset_test_fs() -> &'static Path {
    let home = ensure_test_home();
    for sub in [
        ".claude.json",
        ".cursor",
        ".vscode",
        ".codex",
        ".gemini",
        ".kiro",
        ".config",
        ".mcp-hub",
        "Library",
        "AppData",
    ] {
        let path = home.join(sub);
        if path.is_dir() {
            if let Err(err) = std::fs::remove_dir_all(&path) {
                eprintln!("failed to clean {}: {}", path.display(), err);
            }
        } else if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
    }
    set_base_dir_override(Some(home.to_path_buf()));
    home
}

/// 串行化依赖文件系统状态的测试。
pub fn test_mutex() -> &'static Mutex<()> {
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX.get_or_init(|| Mutex::new(()))
}
