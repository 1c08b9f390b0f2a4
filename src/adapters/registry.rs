use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AppError;
use crate::fields::{HOSTS, OPENCODE};

use super::{HostAdapter, OpencodeAdapter, StandardAdapter};

/// 适配器注册表：以宿主标识为键的查找表。
/// 除注册表自身外，任何组件都不得按宿主身份写分支 —— 新增宿主只需要
/// 一条字段注册表记录加一个适配器实例。
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn HostAdapter>>,
}

impl AdapterRegistry {
    /// 空注册表（仅测试与嵌入方定制时使用）
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// 进程启动时的显式注册：内置八个宿主各一个实例
    pub fn with_builtin_hosts() -> Self {
        let mut registry = Self::new();
        for spec in HOSTS {
            let adapter: Arc<dyn HostAdapter> = if spec.host == OPENCODE {
                Arc::new(OpencodeAdapter::new())
            } else {
                Arc::new(StandardAdapter::new(spec))
            };
            registry
                .register(adapter)
                .expect("内置宿主标识不会重复");
        }
        registry
    }

    /// 注册适配器；同名重复注册报 `DuplicateAdapter`
    pub fn register(&mut self, adapter: Arc<dyn HostAdapter>) -> Result<(), AppError> {
        let host = adapter.host().to_string();
        if self.adapters.contains_key(&host) {
            return Err(AppError::DuplicateAdapter(host));
        }
        self.adapters.insert(host, adapter);
        Ok(())
    }

    /// 注销适配器；未注册的标识报 `UnknownHost`
    pub fn unregister(&mut self, host: &str) -> Result<Arc<dyn HostAdapter>, AppError> {
        self.adapters
            .remove(host)
            .ok_or_else(|| AppError::UnknownHost(host.to_string()))
    }

    /// 按宿主标识查找；未注册的标识报 `UnknownHost`
    pub fn get(&self, host: &str) -> Result<Arc<dyn HostAdapter>, AppError> {
        self.adapters
            .get(host)
            .cloned()
            .ok_or_else(|| AppError::UnknownHost(host.to_string()))
    }

    pub fn contains(&self, host: &str) -> bool {
        self.adapters.contains_key(host)
    }

    /// 已注册的宿主标识（排序后，便于稳定输出）
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.adapters.keys().cloned().collect();
        hosts.sort();
        hosts
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_builtin_hosts()
    }
}
