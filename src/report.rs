use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::fields::{spec_for, EXCLUDED_FIELDS};
use crate::model::ServerConfig;

/// Operation being reported on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Migrate,
}

/// What happens to one field when projecting onto the target host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldOperationKind {
    Updated,
    Unsupported,
    Unchanged,
}

/// Field-level diff entry. Produced only by `generate_report`, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct FieldOperation {
    pub field_name: String,
    pub kind: FieldOperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// Field-by-field account of what a configure/sync operation will do on the
/// target host. Advisory output, but its completeness is load-bearing: this is
/// the single place where "what will actually change on disk" is computed.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub operation: Operation,
    pub server_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_host: Option<String>,
    pub target_host: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub field_operations: Vec<FieldOperation>,
    pub dry_run: bool,
}

/// Compute the field diff between `new_config` and the optional `old_config`
/// against `target_host`'s supported field set.
///
/// Every explicitly set, non-excluded field of `new_config` yields exactly one
/// `FieldOperation`:
/// - not supported by the target → `Unsupported`, regardless of the old value
///   (dropped fields are reported once, never as updated/unchanged);
/// - supported, no old config → `Updated` (pure creation);
/// - supported, old value differs → `Updated{old, new}`;
/// - supported, old value equal → `Unchanged{value}`;
/// - supported, absent in old → `Updated{old: absent, new}`.
#[allow(clippy::too_many_arguments)]
pub fn generate_report(
    operation: Operation,
    server_name: &str,
    target_host: &str,
    new_config: &ServerConfig,
    source_host: Option<&str>,
    old_config: Option<&ServerConfig>,
    dry_run: bool,
) -> Result<ConversionReport, AppError> {
    let spec =
        spec_for(target_host).ok_or_else(|| AppError::UnknownHost(target_host.to_string()))?;

    let new_fields = new_config.to_value_map()?;
    let old_fields = match old_config {
        Some(old) => Some(old.to_value_map()?),
        None => None,
    };

    let mut field_operations = Vec::with_capacity(new_fields.len());
    for (field, new_value) in &new_fields {
        if EXCLUDED_FIELDS.contains(&field.as_str()) {
            continue;
        }

        if !spec.supports(field) {
            field_operations.push(FieldOperation {
                field_name: field.clone(),
                kind: FieldOperationKind::Unsupported,
                old_value: None,
                new_value: Some(new_value.clone()),
            });
            continue;
        }

        let old_value = old_fields.as_ref().and_then(|m| m.get(field));
        let op = match old_value {
            Some(old) if old == new_value => FieldOperation {
                field_name: field.clone(),
                kind: FieldOperationKind::Unchanged,
                old_value: Some(old.clone()),
                new_value: Some(new_value.clone()),
            },
            other => FieldOperation {
                field_name: field.clone(),
                kind: FieldOperationKind::Updated,
                old_value: other.cloned(),
                new_value: Some(new_value.clone()),
            },
        };
        field_operations.push(op);
    }

    Ok(ConversionReport {
        operation,
        server_name: server_name.to_string(),
        source_host: source_host.map(str::to_string),
        target_host: target_host.to_string(),
        success: true,
        error_message: None,
        field_operations,
        dry_run,
    })
}
