// Native record → canonical config decoding, the inverse of the adapter
// transforms. Must round-trip every field both the canonical model and the
// host support, so that diffing and existing-server detection see the same
// shape the adapters produce.

use serde_json::{Map, Value};

use crate::error::AppError;
use crate::fields::HostFieldSpec;
use crate::model::{OauthConfig, ServerConfig};

/// Decode a flat-shape host entry: reverse the rename table, then let serde
/// sort known fields from extras.
pub fn decode_flat_entry(
    spec: &HostFieldSpec,
    name: &str,
    value: &Value,
) -> Result<ServerConfig, AppError> {
    let obj = value.as_object().ok_or_else(|| {
        AppError::McpValidation(format!("宿主条目 '{name}' 必须为 JSON 对象"))
    })?;

    let mut universal = Map::new();
    for (key, val) in obj {
        universal.insert(spec.universal_name(key).to_string(), val.clone());
    }
    ServerConfig::from_value_map(name, universal)
}

/// Decode an opencode `local`/`remote` union entry back into flat canonical
/// fields: split the merged command list, rename `environment` → `env`,
/// expand the `false`-or-object OAuth shape.
pub fn decode_opencode_entry(name: &str, value: &Value) -> Result<ServerConfig, AppError> {
    let obj = value.as_object().ok_or_else(|| {
        AppError::McpValidation(format!("宿主条目 '{name}' 必须为 JSON 对象"))
    })?;

    let mut config = ServerConfig::named(name);

    let kind = obj.get("type").and_then(Value::as_str);
    let is_local = match kind {
        Some("local") => true,
        Some("remote") => false,
        // Tolerate entries written by the host itself without a tag
        None => obj.contains_key("command"),
        Some(other) => {
            return Err(AppError::McpValidation(format!(
                "宿主条目 '{name}' 的 type 必须是 'local' 或 'remote'，实际为 '{other}'"
            )));
        }
    };

    if is_local {
        let list = obj
            .get("command")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AppError::McpValidation(format!("宿主条目 '{name}' 的 command 必须为数组"))
            })?;
        let mut parts = list.iter().filter_map(Value::as_str);
        config.command = parts.next().map(str::to_string);
        let args: Vec<String> = parts.map(str::to_string).collect();
        if !args.is_empty() {
            config.args = Some(args);
        }
        if let Some(env) = obj.get("environment").and_then(Value::as_object) {
            config.env = Some(
                env.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect(),
            );
        }
    } else {
        config.url = obj.get("url").and_then(Value::as_str).map(str::to_string);
        if let Some(headers) = obj.get("headers").and_then(Value::as_object) {
            config.headers = Some(
                headers
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect(),
            );
        }
    }

    config.enabled = obj.get("enabled").and_then(Value::as_bool);

    match obj.get("oauth") {
        Some(Value::Bool(false)) => {
            config.oauth = Some(OauthConfig {
                enabled: Some(false),
                ..OauthConfig::default()
            });
        }
        Some(Value::Object(_)) => {
            let oauth: OauthConfig = serde_json::from_value(obj["oauth"].clone())
                .map_err(|e| AppError::JsonSerialize { source: e })?;
            config.oauth = Some(oauth);
        }
        _ => {}
    }

    // Preserve anything the union shape does not model
    for (key, val) in obj {
        if matches!(
            key.as_str(),
            "type" | "command" | "environment" | "url" | "headers" | "enabled" | "oauth"
        ) {
            continue;
        }
        config.extra.insert(key.clone(), val.clone());
    }

    Ok(config)
}
