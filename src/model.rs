use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::AppError;

/// MCP 服务器传输方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Sse,
    Http,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Stdio => "stdio",
            Transport::Sse => "sse",
            Transport::Http => "http",
        }
    }
}

/// OAuth 参数（仅部分宿主支持，序列化时省略未设置的子字段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OauthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

impl OauthConfig {
    /// 是否被显式禁用（enabled == false）
    pub fn is_disabled(&self) -> bool {
        self.enabled == Some(false)
    }
}

/// 规范化的 MCP 服务器定义：所有宿主字段的超集
///
/// 字段分组：
/// - 身份：`name`（仅内部使用，任何宿主文件都不落盘）
/// - 传输判别：`type`（可省略，省略时由负载字段推断）
/// - 传输负载：stdio 用 `command`+`args`，SSE 用 `url`+`headers`，HTTP streaming 用 `httpUrl`
/// - 共享：`env`
/// - 宿主专属长尾：超时、信任标记、工具允许/拒绝列表、OAuth、工作目录等
///
/// 未知字段通过 `extra` 原样保留（往返不丢失、核心不解释），
/// 宿主相关的校验全部下沉到各适配器，这里只做最小自校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// 服务器标识，仅作为宿主文件中的键使用，永不出现在条目内容里
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<IndexMap<String, String>>,

    #[serde(rename = "httpUrl", skip_serializing_if = "Option::is_none")]
    pub http_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<IndexMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust: Option<bool>,

    #[serde(rename = "includeTools", skip_serializing_if = "Option::is_none")]
    pub include_tools: Option<Vec<String>>,
    #[serde(rename = "excludeTools", skip_serializing_if = "Option::is_none")]
    pub exclude_tools: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OauthConfig>,

    #[serde(rename = "envFile", skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,

    /// 输入变量提示（目前仅 vscode 支持，结构由宿主定义，原样透传）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    #[serde(rename = "bearerTokenEnvVar", skip_serializing_if = "Option::is_none")]
    pub bearer_token_env_var: Option<String>,

    /// 未知字段的逃生舱：往返保留，核心不解释
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ServerConfig {
    /// 创建空白配置（仅设置标识）
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// 实际生效的传输方式：显式 `type` 优先，否则按负载字段推断
    /// （command → stdio，httpUrl → http，url → sse）
    pub fn effective_transport(&self) -> Option<Transport> {
        if let Some(t) = self.transport {
            return Some(t);
        }
        if self.command.is_some() {
            Some(Transport::Stdio)
        } else if self.http_url.is_some() {
            Some(Transport::Http)
        } else if self.url.is_some() {
            Some(Transport::Sse)
        } else {
            None
        }
    }

    /// 最小自校验：至少设置一个传输负载字段；远端地址必须是合法 URL。
    /// 宿主相关的规则（互斥、字段组合）由适配器负责。
    pub fn validate(&self) -> Result<(), AppError> {
        if self.command.is_none() && self.url.is_none() && self.http_url.is_none() {
            return Err(AppError::McpValidation(
                "至少需要设置 command、url 或 httpUrl 之一".into(),
            ));
        }
        for (field, value) in [("url", &self.url), ("httpUrl", &self.http_url)] {
            if let Some(raw) = value {
                Url::parse(raw).map_err(|e| {
                    AppError::McpValidation(format!("{field} 不是合法的 URL ('{raw}'): {e}"))
                })?;
            }
        }
        Ok(())
    }

    /// 以统一字段名导出所有显式设置的字段（不含未设置的 Option），
    /// 供适配器过滤与差异报告枚举使用。
    pub fn to_value_map(&self) -> Result<serde_json::Map<String, Value>, AppError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AppError::Config(
                "ServerConfig 序列化结果不是 JSON 对象".into(),
            )),
            Err(e) => Err(AppError::JsonSerialize { source: e }),
        }
    }

    /// 从统一字段名的 JSON 对象还原配置，未知键进入 `extra`
    pub fn from_value_map(name: &str, map: serde_json::Map<String, Value>) -> Result<Self, AppError> {
        let mut config: ServerConfig = serde_json::from_value(Value::Object(map))
            .map_err(|e| AppError::JsonSerialize { source: e })?;
        config.name = name.to_string();
        Ok(config)
    }

    /// 人类可读的一行摘要，用于同步完成后的外部通知
    pub fn summary(&self) -> String {
        match self.effective_transport() {
            Some(Transport::Stdio) => {
                let cmd = self.command.as_deref().unwrap_or("?");
                match &self.args {
                    Some(args) if !args.is_empty() => format!("stdio: {} {}", cmd, args.join(" ")),
                    _ => format!("stdio: {cmd}"),
                }
            }
            Some(Transport::Sse) => format!("sse: {}", self.url.as_deref().unwrap_or("?")),
            Some(Transport::Http) => format!("http: {}", self.http_url.as_deref().unwrap_or("?")),
            None => "未配置传输方式".into(),
        }
    }
}

/// 一个宿主配置文件解码后的全部内容：以服务器名为键、保持文件内顺序
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfiguration {
    #[serde(default)]
    pub servers: IndexMap<String, ServerConfig>,
}

impl HostConfiguration {
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn get(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.get(name)
    }
}
