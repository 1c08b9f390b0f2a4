use serde_json::Value;

use crate::error::AppError;
use crate::fields::{HostFieldSpec, TransportRule};
use crate::model::ServerConfig;

use super::{filter_fields, HostAdapter};

/// Data-driven adapter covering every flat-shape host. All per-host variation
/// lives in the `HostFieldSpec` it is constructed with; the pipeline itself is
/// identical for all of them.
#[derive(Debug, Clone, Copy)]
pub struct StandardAdapter {
    spec: &'static HostFieldSpec,
}

impl StandardAdapter {
    pub fn new(spec: &'static HostFieldSpec) -> Self {
        Self { spec }
    }

    /// Step 2 of the pipeline: structural rules over the filtered field set
    fn validate_filtered(&self, filtered: &serde_json::Map<String, Value>) -> Result<(), AppError> {
        let present: Vec<&str> = self
            .spec
            .transport_fields
            .iter()
            .copied()
            .filter(|f| filtered.contains_key(*f))
            .collect();

        match self.spec.transport_rule {
            TransportRule::ExactlyOne => {
                if present.is_empty() {
                    return Err(AppError::McpValidation(
                        "至少需要设置 command、url 或 httpUrl 之一".into(),
                    ));
                }
                if present.len() > 1 {
                    return Err(AppError::McpValidation(format!(
                        "宿主 '{}' 的传输字段互斥，不能同时设置 {}",
                        self.spec.host,
                        present.join("、")
                    )));
                }
            }
            TransportRule::AtLeastOneMultipleAllowed => {
                if present.is_empty() {
                    return Err(AppError::McpValidation(
                        "至少需要设置 command、url 或 httpUrl 之一".into(),
                    ));
                }
            }
        }

        if let Some(pair) = self.spec.tool_fields {
            if filtered.contains_key(pair.allow) && filtered.contains_key(pair.deny) {
                return Err(AppError::McpValidation(format!(
                    "宿主 '{}' 不允许同时设置 {} 与 {}",
                    self.spec.host, pair.allow, pair.deny
                )));
            }
        }

        Ok(())
    }

    /// Transport value for the emitted `type` discriminator, derived from the
    /// filtered payload when the canonical record did not carry one
    fn derived_type(filtered: &serde_json::Map<String, Value>) -> Option<&'static str> {
        if filtered.contains_key("command") {
            Some("stdio")
        } else if filtered.contains_key("httpUrl") {
            Some("http")
        } else if filtered.contains_key("url") {
            Some("sse")
        } else {
            None
        }
    }
}

impl HostAdapter for StandardAdapter {
    fn host(&self) -> &str {
        self.spec.host
    }

    fn supported_fields(&self) -> &'static [&'static str] {
        self.spec.supported
    }

    fn validate(&self, config: &ServerConfig) -> Result<(), AppError> {
        let filtered = filter_fields(config, self.spec.supported)?;
        self.validate_filtered(&filtered)
    }

    fn serialize(&self, config: &ServerConfig) -> Result<serde_json::Map<String, Value>, AppError> {
        // filter → validate → transform
        let mut filtered = filter_fields(config, self.spec.supported)?;
        self.validate_filtered(&filtered)?;

        // Hosts with an explicit discriminator always write one; the canonical
        // record may omit it, in which case it is derived from the payload.
        if self.spec.supports("type") && !filtered.contains_key("type") {
            if let Some(derived) = Self::derived_type(&filtered) {
                filtered.insert("type".into(), Value::String(derived.into()));
            }
        }

        let mut out = serde_json::Map::new();
        for (key, value) in filtered {
            out.insert(self.spec.native_name(&key).to_string(), value);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{spec_for, CLAUDE_CODE, CLAUDE_DESKTOP, CODEX, GEMINI, KIRO};
    use serde_json::json;

    fn adapter(host: &str) -> StandardAdapter {
        StandardAdapter::new(spec_for(host).expect("known host"))
    }

    fn stdio_config() -> ServerConfig {
        let mut cfg = ServerConfig::named("weather");
        cfg.command = Some("python".into());
        cfg.args = Some(vec!["server.py".into()]);
        cfg
    }

    #[test]
    fn filters_out_unsupported_fields() {
        let mut cfg = stdio_config();
        cfg.timeout = Some(60);
        cfg.trust = Some(true);

        let out = adapter(CLAUDE_DESKTOP).serialize(&cfg).expect("serialize");
        assert!(!out.contains_key("timeout"));
        assert!(!out.contains_key("trust"));
        assert_eq!(out.get("command"), Some(&json!("python")));
    }

    #[test]
    fn identity_field_never_reaches_the_output() {
        let out = adapter(CLAUDE_CODE).serialize(&stdio_config()).expect("serialize");
        assert!(!out.contains_key("name"));
    }

    #[test]
    fn exactly_one_host_rejects_dual_transport() {
        let mut cfg = stdio_config();
        cfg.url = Some("http://localhost:8080/sse".into());

        let err = adapter(CLAUDE_CODE).serialize(&cfg).expect_err("must reject");
        assert!(matches!(err, AppError::McpValidation(_)));
    }

    #[test]
    fn irrelevant_remote_field_cannot_cause_rejection() {
        // claude-desktop does not support url at all, so command+url is fine
        // there: the url is filtered before validation runs.
        let mut cfg = stdio_config();
        cfg.url = Some("http://localhost:8080/sse".into());

        let out = adapter(CLAUDE_DESKTOP).serialize(&cfg).expect("serialize");
        assert!(!out.contains_key("url"));
    }

    #[test]
    fn missing_transport_raises_canonical_error() {
        let mut cfg = ServerConfig::named("empty");
        cfg.env = Some([("A".to_string(), "1".to_string())].into_iter().collect());

        let err = adapter(CLAUDE_CODE).serialize(&cfg).expect_err("must reject");
        let msg = err.to_string();
        assert!(msg.contains("command、url 或 httpUrl"), "got: {msg}");
    }

    #[test]
    fn gemini_accepts_any_non_empty_transport_subset() {
        let mut cfg = stdio_config();
        cfg.url = Some("http://localhost:8080/sse".into());
        cfg.http_url = Some("http://localhost:8080/mcp".into());

        let out = adapter(GEMINI).serialize(&cfg).expect("serialize");
        assert!(out.contains_key("command"));
        assert!(out.contains_key("url"));
        assert!(out.contains_key("httpUrl"));
    }

    #[test]
    fn type_is_emitted_only_by_hosts_declaring_it() {
        let cfg = stdio_config();
        let with_type = adapter(CLAUDE_CODE).serialize(&cfg).expect("serialize");
        assert_eq!(with_type.get("type"), Some(&json!("stdio")));

        let without_type = adapter(CLAUDE_DESKTOP).serialize(&cfg).expect("serialize");
        assert!(!without_type.contains_key("type"));
    }

    #[test]
    fn codex_renames_args_and_headers() {
        let mut cfg = ServerConfig::named("remote");
        cfg.url = Some("http://localhost:8080/sse".into());
        cfg.headers = Some(
            [("Authorization".to_string(), "Bearer x".to_string())]
                .into_iter()
                .collect(),
        );
        cfg.timeout = Some(30);

        let out = adapter(CODEX).serialize(&cfg).expect("serialize");
        assert!(out.contains_key("http_headers"));
        assert!(!out.contains_key("headers"));
        assert_eq!(out.get("startup_timeout_sec"), Some(&json!(30)));
        assert!(!out.contains_key("timeout"));
        assert_eq!(out.get("type"), Some(&json!("sse")));
    }

    #[test]
    fn kiro_rejects_allow_and_deny_lists_together() {
        let mut cfg = stdio_config();
        cfg.include_tools = Some(vec!["get_forecast".into()]);
        cfg.exclude_tools = Some(vec!["delete_data".into()]);

        let err = adapter(KIRO).serialize(&cfg).expect_err("must reject");
        assert!(matches!(err, AppError::McpValidation(_)));
    }

    #[test]
    fn kiro_maps_tool_lists_to_native_names() {
        let mut cfg = stdio_config();
        cfg.include_tools = Some(vec!["get_forecast".into()]);

        let out = adapter(KIRO).serialize(&cfg).expect("serialize");
        assert_eq!(out.get("autoApprove"), Some(&json!(["get_forecast"])));
        assert!(!out.contains_key("includeTools"));
    }

    #[test]
    fn output_never_contains_null_values() {
        let mut cfg = stdio_config();
        cfg.extra.insert("env".into(), Value::Null); // pathological input

        let out = adapter(CLAUDE_CODE).serialize(&cfg).expect("serialize");
        assert!(out.values().all(|v| !v.is_null()));
    }
}
