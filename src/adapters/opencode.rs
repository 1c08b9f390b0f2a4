use serde_json::{json, Value};

use crate::error::AppError;
use crate::fields::{spec_for, HostFieldSpec, OPENCODE};
use crate::model::ServerConfig;

use super::{filter_fields, HostAdapter};

/// opencode stores servers as a `local`/`remote` discriminated union instead
/// of flat fields:
///
/// - `local`: `command` and `args` merge into one ordered list under
///   `command`, `env` is renamed `environment`;
/// - `remote`: `url`/`headers` pass through unchanged;
/// - OAuth is either the literal `false` (explicitly disabled) or a nested
///   object omitting absent sub-fields;
/// - `enabled` passes through.
#[derive(Debug, Clone, Copy)]
pub struct OpencodeAdapter {
    spec: &'static HostFieldSpec,
}

impl OpencodeAdapter {
    pub fn new() -> Self {
        Self {
            spec: spec_for(OPENCODE).expect("opencode registered in the field registry"),
        }
    }

    fn validate_filtered(&self, filtered: &serde_json::Map<String, Value>) -> Result<(), AppError> {
        let has_local = filtered.contains_key("command");
        let has_remote = filtered.contains_key("url");
        match (has_local, has_remote) {
            (false, false) => Err(AppError::McpValidation(
                "至少需要设置 command、url 或 httpUrl 之一".into(),
            )),
            (true, true) => Err(AppError::McpValidation(
                "宿主 'opencode' 的传输字段互斥，不能同时设置 command、url".into(),
            )),
            _ => Ok(()),
        }
    }

    /// OAuth projection: `false` when explicitly disabled, otherwise a nested
    /// object carrying only the sub-fields that are actually set.
    fn oauth_value(oauth: &Value) -> Option<Value> {
        let obj = oauth.as_object()?;
        if obj.get("enabled").and_then(Value::as_bool) == Some(false) {
            return Some(Value::Bool(false));
        }
        let mut out = serde_json::Map::new();
        for (key, value) in obj {
            if key == "enabled" || value.is_null() {
                continue;
            }
            out.insert(key.clone(), value.clone());
        }
        if out.is_empty() {
            None
        } else {
            Some(Value::Object(out))
        }
    }
}

impl Default for OpencodeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HostAdapter for OpencodeAdapter {
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
        let filtered = filter_fields(config, self.spec.supported)?;
        self.validate_filtered(&filtered)?;

        let mut out = serde_json::Map::new();

        if let Some(command) = filtered.get("command").and_then(Value::as_str) {
            // local: one ordered list, command first
            let mut merged = vec![json!(command)];
            if let Some(args) = filtered.get("args").and_then(Value::as_array) {
                merged.extend(args.iter().cloned());
            }
            out.insert("type".into(), json!("local"));
            out.insert("command".into(), Value::Array(merged));
            if let Some(env) = filtered.get("env") {
                out.insert("environment".into(), env.clone());
            }
        } else {
            out.insert("type".into(), json!("remote"));
            if let Some(url) = filtered.get("url") {
                out.insert("url".into(), url.clone());
            }
            if let Some(headers) = filtered.get("headers") {
                out.insert("headers".into(), headers.clone());
            }
        }

        if let Some(enabled) = filtered.get("enabled") {
            out.insert("enabled".into(), enabled.clone());
        }
        if let Some(oauth) = filtered.get("oauth") {
            if let Some(projected) = Self::oauth_value(oauth) {
                out.insert("oauth".into(), projected);
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OauthConfig;
    use serde_json::json;

    fn local_config() -> ServerConfig {
        let mut cfg = ServerConfig::named("weather");
        cfg.command = Some("python".into());
        cfg.args = Some(vec!["server.py".into(), "--port".into(), "9".into()]);
        cfg.env = Some([("KEY".to_string(), "v".to_string())].into_iter().collect());
        cfg
    }

    #[test]
    fn local_entry_merges_command_and_args() {
        let out = OpencodeAdapter::new().serialize(&local_config()).expect("serialize");
        assert_eq!(out.get("type"), Some(&json!("local")));
        assert_eq!(
            out.get("command"),
            Some(&json!(["python", "server.py", "--port", "9"]))
        );
        assert_eq!(out.get("environment"), Some(&json!({"KEY": "v"})));
        assert!(!out.contains_key("args"));
        assert!(!out.contains_key("env"));
    }

    #[test]
    fn remote_entry_passes_url_and_headers_through() {
        let mut cfg = ServerConfig::named("remote");
        cfg.url = Some("http://localhost:8080/sse".into());
        cfg.headers = Some(
            [("X-Token".to_string(), "t".to_string())]
                .into_iter()
                .collect(),
        );

        let out = OpencodeAdapter::new().serialize(&cfg).expect("serialize");
        assert_eq!(out.get("type"), Some(&json!("remote")));
        assert_eq!(out.get("url"), Some(&json!("http://localhost:8080/sse")));
        assert_eq!(out.get("headers"), Some(&json!({"X-Token": "t"})));
    }

    #[test]
    fn disabled_oauth_becomes_literal_false() {
        let mut cfg = local_config();
        cfg.oauth = Some(OauthConfig {
            enabled: Some(false),
            ..OauthConfig::default()
        });

        let out = OpencodeAdapter::new().serialize(&cfg).expect("serialize");
        assert_eq!(out.get("oauth"), Some(&json!(false)));
    }

    #[test]
    fn active_oauth_keeps_only_set_sub_fields() {
        let mut cfg = local_config();
        cfg.oauth = Some(OauthConfig {
            enabled: Some(true),
            client_id: Some("cid".into()),
            ..OauthConfig::default()
        });

        let out = OpencodeAdapter::new().serialize(&cfg).expect("serialize");
        assert_eq!(out.get("oauth"), Some(&json!({"clientId": "cid"})));
    }

    #[test]
    fn dual_transport_is_rejected() {
        let mut cfg = local_config();
        cfg.url = Some("http://localhost:8080/sse".into());
        assert!(OpencodeAdapter::new().serialize(&cfg).is_err());
    }

    #[test]
    fn enabled_flag_passes_through() {
        let mut cfg = local_config();
        cfg.enabled = Some(false);
        let out = OpencodeAdapter::new().serialize(&cfg).expect("serialize");
        assert_eq!(out.get("enabled"), Some(&json!(false)));
    }
}
