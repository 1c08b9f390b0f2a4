use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use toml_edit::{DocumentMut, Item};

use crate::error::AppError;
use crate::fields::HostFieldSpec;
use crate::fileio::write_text_file;
use crate::model::HostConfiguration;

use super::decode::decode_flat_entry;
use super::paths::host_config_path;
use super::HostStrategy;

/// The lone TOML host. Edits go through `toml_edit` so user comments,
/// formatting and unrelated tables in config.toml survive every mutation.
pub struct TomlHostStrategy {
    spec: &'static HostFieldSpec,
}

const SERVERS_TABLE: &str = "mcp_servers";

impl TomlHostStrategy {
    pub fn new(spec: &'static HostFieldSpec) -> Self {
        Self { spec }
    }

    fn load_document(&self) -> Result<DocumentMut, AppError> {
        let path = self.config_path()?;
        if !path.exists() {
            return Ok(DocumentMut::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| AppError::io(&path, e))?;
        if content.trim().is_empty() {
            return Ok(DocumentMut::new());
        }
        content
            .parse::<DocumentMut>()
            .map_err(|e| AppError::toml(&path, e.to_string()))
    }

    fn save_document(&self, doc: &DocumentMut) -> Result<(), AppError> {
        let path = self.config_path()?;
        write_text_file(&path, &doc.to_string())
    }
}

impl HostStrategy for TomlHostStrategy {
    fn host(&self) -> &str {
        self.spec.host
    }

    fn config_path(&self) -> Result<PathBuf, AppError> {
        host_config_path(self.spec.host)
    }

    fn read(&self) -> Result<HostConfiguration, AppError> {
        let path = self.config_path()?;
        if !path.exists() {
            return Ok(HostConfiguration::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| AppError::io(&path, e))?;
        if content.trim().is_empty() {
            return Ok(HostConfiguration::default());
        }
        let root: toml::Table =
            toml::from_str(&content).map_err(|e| AppError::toml(&path, e.to_string()))?;

        let mut configuration = HostConfiguration::default();
        let Some(servers) = root.get(SERVERS_TABLE).and_then(|v| v.as_table()) else {
            return Ok(configuration);
        };

        for (name, entry) in servers {
            // TOML entry → JSON value → canonical, reusing the flat decoder
            // (which also reverses the codex rename table)
            let json_entry = serde_json::to_value(entry)
                .map_err(|e| AppError::JsonSerialize { source: e })?;
            match decode_flat_entry(self.spec, name, &json_entry) {
                Ok(config) => {
                    configuration.servers.insert(name.clone(), config);
                }
                Err(err) => {
                    log::warn!("跳过无效的 Codex MCP 条目 '{name}': {err}");
                }
            }
        }
        Ok(configuration)
    }

    fn write_server(
        &self,
        name: &str,
        record: &serde_json::Map<String, Value>,
    ) -> Result<(), AppError> {
        let mut doc = self.load_document()?;

        if !doc.contains_key(SERVERS_TABLE) {
            doc[SERVERS_TABLE] = toml_edit::table();
        }

        let table = json_record_to_toml_table(record)?;
        doc[SERVERS_TABLE][name] = Item::Table(table);

        self.save_document(&doc)
    }

    fn remove_server(&self, name: &str) -> Result<bool, AppError> {
        let path = self.config_path()?;
        if !path.exists() {
            return Ok(false);
        }

        let mut doc = self.load_document()?;
        let removed = doc
            .get_mut(SERVERS_TABLE)
            .and_then(|item| item.as_table_mut())
            .map(|table| table.remove(name).is_some())
            .unwrap_or(false);

        if removed {
            self.save_document(&doc)?;
        }
        Ok(removed)
    }

    fn remove_all(&self) -> Result<usize, AppError> {
        let path = self.config_path()?;
        if !path.exists() {
            return Ok(0);
        }

        let mut doc = self.load_document()?;
        let count = doc
            .get(SERVERS_TABLE)
            .and_then(|item| item.as_table())
            .map(|table| table.len())
            .unwrap_or(0);

        if doc.as_table_mut().remove(SERVERS_TABLE).is_none() {
            return Ok(0);
        }
        self.save_document(&doc)?;
        Ok(count)
    }
}

/// Convert one serialized server record into a TOML table.
/// Adapter output only contains strings, numbers, booleans, string arrays and
/// string maps, so the conversion is total for well-formed records; anything
/// else is skipped with a warning rather than written corrupted.
fn json_record_to_toml_table(
    record: &serde_json::Map<String, Value>,
) -> Result<toml_edit::Table, AppError> {
    let mut table = toml_edit::Table::new();
    for (key, value) in record {
        match json_value_to_toml_item(value, key) {
            Some(item) => {
                table[&key[..]] = item;
            }
            None => {
                log::warn!("跳过无法写入 TOML 的字段 '{key}'");
            }
        }
    }
    Ok(table)
}

/// Generic JSON value → TOML item conversion (simple types, shallow nesting)
fn json_value_to_toml_item(value: &Value, field_name: &str) -> Option<Item> {
    use toml_edit::{Array, InlineTable};

    match value {
        Value::String(s) => Some(toml_edit::value(s.as_str())),

        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(toml_edit::value(i))
            } else if let Some(f) = n.as_f64() {
                Some(toml_edit::value(f))
            } else {
                log::warn!("跳过字段 '{field_name}': 无法转换的数字类型 {n}");
                None
            }
        }

        Value::Bool(b) => Some(toml_edit::value(*b)),

        Value::Array(arr) => {
            let mut toml_arr = Array::default();
            for item in arr {
                match item {
                    Value::String(s) => toml_arr.push(s.as_str()),
                    Value::Number(n) if n.is_i64() => toml_arr.push(n.as_i64()?),
                    Value::Bool(b) => toml_arr.push(*b),
                    _ => {
                        log::warn!("跳过字段 '{field_name}': 数组元素类型不受支持");
                        return None;
                    }
                }
            }
            Some(Item::Value(toml_edit::Value::Array(toml_arr)))
        }

        Value::Object(obj) => {
            // Shallow string maps only (env / headers)
            let mut inline = InlineTable::new();
            for (k, v) in obj {
                let Some(s) = v.as_str() else {
                    log::warn!("跳过字段 '{field_name}': 对象值包含非字符串类型");
                    return None;
                };
                inline.insert(k, s.into());
            }
            Some(Item::Value(toml_edit::Value::InlineTable(inline)))
        }

        Value::Null => {
            log::debug!("跳过字段 '{field_name}': TOML 不支持 null 值");
            None
        }
    }
}
