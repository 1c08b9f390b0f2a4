// Partial-update merge: overlay newly supplied fields onto an existing
// canonical record, then clean up after a transport switch so no host is
// handed a record carrying payload fields of the losing transport.

use serde_json::Value;

use crate::error::AppError;
use crate::model::{ServerConfig, Transport};

/// Fields that only make sense for a local (stdio) transport
const LOCAL_PAYLOAD: &[&str] = &["command", "args"];
/// Fields that only make sense for a remote (sse/http) transport
const REMOTE_PAYLOAD: &[&str] = &["url", "httpUrl", "headers"];

/// Merge a partial update into an existing record:
///
/// 1. start from the existing record's explicitly-set fields;
/// 2. overlay the newly supplied fields;
/// 3. if the update introduces a remote payload while the existing record was
///    local (or vice versa), drop the now-irrelevant payload fields of the
///    losing transport and recompute the `type` discriminator to match.
///
/// The cleanup operates on the canonical record, before any adapter sees it,
/// so it is host-independent by construction.
pub fn merge_partial_update(
    existing: &ServerConfig,
    update: &ServerConfig,
) -> Result<ServerConfig, AppError> {
    let mut merged = existing.to_value_map()?;
    let update_map = update.to_value_map()?;
    for (key, value) in update_map {
        if key == "name" {
            continue;
        }
        merged.insert(key, value);
    }

    let update_brings_local = update.command.is_some() || update.args.is_some();
    let update_brings_remote = update.url.is_some() || update.http_url.is_some();
    let existing_was_local = existing.command.is_some();
    let existing_was_remote = existing.url.is_some() || existing.http_url.is_some();

    let switched = if update_brings_remote && !update_brings_local && existing_was_local {
        for field in LOCAL_PAYLOAD {
            merged.shift_remove(*field);
        }
        true
    } else if update_brings_local && !update_brings_remote && existing_was_remote {
        for field in REMOTE_PAYLOAD {
            // headers may ride along with a local update; keep them only then
            if update.headers.is_some() && *field == "headers" {
                continue;
            }
            merged.shift_remove(*field);
        }
        true
    } else {
        false
    };

    // After a switch, an explicit discriminator must follow the winning
    // transport; without one, inference from the payload already does.
    if switched && merged.contains_key("type") {
        let winning = if merged.contains_key("command") {
            Transport::Stdio
        } else if merged.contains_key("httpUrl") {
            Transport::Http
        } else {
            Transport::Sse
        };
        merged.insert("type".into(), Value::String(winning.as_str().into()));
    }

    let name = if update.name.is_empty() {
        existing.name.as_str()
    } else {
        update.name.as_str()
    };
    let result = ServerConfig::from_value_map(name, merged)?;
    result.validate()?;
    Ok(result)
}
