// ============================================================================
// Adapter Framework - per-host field filtering, validation and serialization
// ============================================================================

mod opencode;
mod registry;
mod standard;

pub use opencode::OpencodeAdapter;
pub use registry::AdapterRegistry;
pub use standard::StandardAdapter;

use serde_json::Value;

use crate::error::AppError;
use crate::model::ServerConfig;

/// Per-host adapter contract. The serialization pipeline is always
/// filter → validate → transform:
///
/// 1. drop fields outside this host's supported set plus the always-excluded
///    identity field;
/// 2. validate the *filtered* result, so a field irrelevant to this host can
///    never cause a spurious rejection;
/// 3. apply field renames and structural reshaping.
///
/// The output never contains a null value and never the identity field.
pub trait HostAdapter: Send + Sync + std::fmt::Debug {
    /// Host identifier this adapter serves
    fn host(&self) -> &str;

    /// Exactly the field registry's declared set for this host
    fn supported_fields(&self) -> &'static [&'static str];

    /// Validate the host's structural rules against the fields actually
    /// present after filtering (transport exclusivity, field combinations)
    fn validate(&self, config: &ServerConfig) -> Result<(), AppError>;

    /// Project a canonical config into this host's native record shape
    fn serialize(&self, config: &ServerConfig) -> Result<serde_json::Map<String, Value>, AppError>;
}

/// Shared step 1 of the pipeline: keep only supported, non-excluded,
/// non-null fields of the canonical record.
pub(crate) fn filter_fields(
    config: &ServerConfig,
    supported: &[&str],
) -> Result<serde_json::Map<String, Value>, AppError> {
    let full = config.to_value_map()?;
    let mut filtered = serde_json::Map::new();
    for (key, value) in full {
        if value.is_null() {
            continue;
        }
        if crate::fields::EXCLUDED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if supported.contains(&key.as_str()) {
            filtered.insert(key, value);
        }
    }
    Ok(filtered)
}
