use std::path::{Path, PathBuf};

use thiserror::Error;

/// 统一错误类型：适配器校验、宿主查找、文件 IO、备份恢复共用一个枚举
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置层面的问题（根结构不合法、路径无法解析等）
    #[error("配置错误: {0}")]
    Config(String),

    /// 调用方传入的参数不合法
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 适配器校验失败（传输方式互斥、字段组合非法等），调用方修正输入后可重试
    #[error("MCP 校验失败: {0}")]
    McpValidation(String),

    /// 宿主标识未注册
    #[error("未知宿主: '{0}'")]
    UnknownHost(String),

    /// 重复注册同名适配器
    #[error("适配器 '{0}' 已注册")]
    DuplicateAdapter(String),

    /// 请求恢复的备份不存在
    #[error("未找到备份: {0}")]
    BackupNotFound(String),

    #[error("IO 错误 ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    IoContext {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("解析 JSON 失败 ({}): {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON 序列化失败: {source}")]
    JsonSerialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("解析 TOML 失败 ({}): {message}", path.display())]
    Toml { path: PathBuf, message: String },
}

impl AppError {
    /// 构造带路径上下文的 IO 错误
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// 构造带路径上下文的 JSON 解析错误
    pub fn json(path: &Path, source: serde_json::Error) -> Self {
        AppError::Json {
            path: path.to_path_buf(),
            source,
        }
    }

    /// 构造带路径上下文的 TOML 解析错误
    pub fn toml(path: &Path, message: impl Into<String>) -> Self {
        AppError::Toml {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}
