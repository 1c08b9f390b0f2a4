use std::path::PathBuf;

use serde_json::Value;

use crate::error::AppError;
use crate::fields::{HostFieldSpec, OPENCODE};
use crate::fileio::{read_json_value, write_json_file};
use crate::model::HostConfiguration;

use super::decode::{decode_flat_entry, decode_opencode_entry};
use super::paths::host_config_path;
use super::HostStrategy;

/// JSON 宿主通用策略：读取整个文件、仅改写顶层键下的目标条目、
/// 其余内容（无关顶层键、其他服务器条目）原样保留。
pub struct JsonHostStrategy {
    spec: &'static HostFieldSpec,
    top_key: &'static str,
}

impl JsonHostStrategy {
    pub fn new(spec: &'static HostFieldSpec, top_key: &'static str) -> Self {
        Self { spec, top_key }
    }

    fn load_root(&self) -> Result<Value, AppError> {
        let path = self.config_path()?;
        let root = read_json_value(&path)?;
        if !root.is_object() {
            return Err(AppError::Config(format!(
                "{} 的根必须是 JSON 对象",
                path.display()
            )));
        }
        Ok(root)
    }

    fn decode_entry(&self, name: &str, value: &Value) -> Result<crate::model::ServerConfig, AppError> {
        if self.spec.host == OPENCODE {
            decode_opencode_entry(name, value)
        } else {
            decode_flat_entry(self.spec, name, value)
        }
    }
}

impl HostStrategy for JsonHostStrategy {
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

        let root = self.load_root()?;
        let mut configuration = HostConfiguration::default();
        let Some(entries) = root.get(self.top_key).and_then(Value::as_object) else {
            return Ok(configuration);
        };

        for (name, entry) in entries {
            match self.decode_entry(name, entry) {
                Ok(config) => {
                    configuration.servers.insert(name.clone(), config);
                }
                Err(err) => {
                    // 单条损坏不拖垮整个文件的读取
                    log::warn!("跳过无效的 MCP 条目 '{name}' ({}): {err}", self.spec.host);
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
        let path = self.config_path()?;
        let mut root = self.load_root()?;
        let obj = root
            .as_object_mut()
            .expect("load_root 已校验根为对象");

        let servers = obj
            .entry(self.top_key.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        let servers_obj = servers.as_object_mut().ok_or_else(|| {
            AppError::Config(format!(
                "{} 的 '{}' 键必须是 JSON 对象",
                path.display(),
                self.top_key
            ))
        })?;

        servers_obj.insert(name.to_string(), Value::Object(record.clone()));
        write_json_file(&path, &root)
    }

    fn remove_server(&self, name: &str) -> Result<bool, AppError> {
        let path = self.config_path()?;
        if !path.exists() {
            return Ok(false);
        }

        let mut root = self.load_root()?;
        let obj = root.as_object_mut().expect("load_root 已校验根为对象");
        // shift_remove 保持其余条目的相对顺序不变
        let removed = obj
            .get_mut(self.top_key)
            .and_then(Value::as_object_mut)
            .map(|servers| servers.shift_remove(name).is_some())
            .unwrap_or(false);

        if removed {
            write_json_file(&path, &root)?;
        }
        Ok(removed)
    }

    fn remove_all(&self) -> Result<usize, AppError> {
        let path = self.config_path()?;
        if !path.exists() {
            return Ok(0);
        }

        let mut root = self.load_root()?;
        let obj = root.as_object_mut().expect("load_root 已校验根为对象");
        let Some(removed) = obj.shift_remove(self.top_key) else {
            return Ok(0);
        };
        let count = removed.as_object().map(|m| m.len()).unwrap_or(0);

        write_json_file(&path, &root)?;
        Ok(count)
    }
}
