use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

use serde_json::Value;

use crate::error::AppError;

/// 读取 JSON 配置文件并反序列化
pub fn read_json_file<T: for<'a> Deserialize<'a>>(path: &Path) -> Result<T, AppError> {
    if !path.exists() {
        return Err(AppError::Config(format!("文件不存在: {}", path.display())));
    }

    let content = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;

    serde_json::from_str(&content).map_err(|e| AppError::json(path, e))
}

/// 读取 JSON 文件为宽松的 Value；文件不存在时返回空对象
pub fn read_json_value(path: &Path) -> Result<Value, AppError> {
    if !path.exists() {
        return Ok(serde_json::json!({}));
    }
    let content = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| AppError::json(path, e))
}

/// 写入 JSON 配置文件（pretty 格式，原子替换）
pub fn write_json_file<T: Serialize>(path: &Path, data: &T) -> Result<(), AppError> {
    let json =
        serde_json::to_string_pretty(data).map_err(|e| AppError::JsonSerialize { source: e })?;

    atomic_write(path, json.as_bytes())
}

/// 原子写入文本文件（用于 TOML/纯文本）
pub fn write_text_file(path: &Path, data: &str) -> Result<(), AppError> {
    atomic_write(path, data.as_bytes())
}

/// 原子写入：同目录临时文件落盘后 rename 替换，避免半写状态。
/// rename 之前的任何失败都不会触碰目标文件。
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AppError> {
    let parent = path
        .parent()
        .ok_or_else(|| AppError::Config(format!("无效的路径: {}", path.display())))?;
    fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".mcp-hub.")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| AppError::IoContext {
            context: format!("创建临时文件失败 ({})", parent.display()),
            source: e,
        })?;

    tmp.write_all(data)
        .map_err(|e| AppError::io(tmp.path(), e))?;
    tmp.flush().map_err(|e| AppError::io(tmp.path(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            let perm = meta.permissions().mode();
            let _ = fs::set_permissions(tmp.path(), fs::Permissions::from_mode(perm));
        }
    }

    #[cfg(windows)]
    {
        // Windows 上 rename 目标存在会失败，先移除再替换（尽量接近原子性）
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }

    tmp.persist(path).map_err(|e| AppError::IoContext {
        context: format!("原子替换失败: {}", path.display()),
        source: e.error,
    })?;
    Ok(())
}

/// 复制文件（目标目录不存在时创建）
pub fn copy_file(from: &Path, to: &Path) -> Result<(), AppError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| AppError::IoContext {
        context: format!("复制文件失败 ({} -> {})", from.display(), to.display()),
        source: e,
    })?;
    Ok(())
}

/// 删除文件（不存在视为成功）
pub fn delete_file(path: &Path) -> Result<(), AppError> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| AppError::io(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_missing_parent_dirs() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("a/b/config.json");

        atomic_write(&target, b"{}").expect("write");
        assert_eq!(fs::read_to_string(&target).expect("read"), "{}");
    }

    #[test]
    fn atomic_write_replaces_existing_content() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("config.json");

        atomic_write(&target, b"old").expect("first write");
        atomic_write(&target, b"new").expect("second write");
        assert_eq!(fs::read_to_string(&target).expect("read"), "new");
    }

    #[test]
    fn atomic_write_leaves_no_temp_files_behind() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("config.json");

        atomic_write(&target, b"data").expect("write");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "config.json")
            .collect();
        assert!(leftovers.is_empty(), "leftovers: {leftovers:?}");
    }

    #[test]
    fn read_json_value_returns_empty_object_for_missing_file() {
        let dir = TempDir::new().expect("temp dir");
        let value = read_json_value(&dir.path().join("absent.json")).expect("read");
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn read_json_file_reports_malformed_content_with_path() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("bad.json");
        fs::write(&target, "{ not json").expect("seed");

        let err = read_json_file::<Value>(&target).expect_err("must fail");
        assert!(err.to_string().contains("bad.json"));
    }
}
