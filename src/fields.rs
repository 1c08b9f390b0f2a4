//! Static per-host field metadata. Single source of truth for every adapter,
//! for the conversion-diff engine, and for the test matrices — nothing else in
//! the crate may hard-code a host's field set.

/// Transport exclusivity rule for one host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportRule {
    /// Exactly one transport payload may be present after filtering
    ExactlyOne,
    /// Any non-empty subset of the transport fields is allowed simultaneously
    AtLeastOneMultipleAllowed,
}

/// Tool allow/deny list field-name pair (universal names).
/// Hosts carrying a pair reject configs that set both at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolFieldPair {
    pub allow: &'static str,
    pub deny: &'static str,
}

/// Everything the rest of the crate needs to know about one host's field surface
#[derive(Debug, Clone, Copy)]
pub struct HostFieldSpec {
    pub host: &'static str,
    /// Universal field names this host accepts (everything else is dropped)
    pub supported: &'static [&'static str],
    /// Universal name → host-native name, applied only at serialization
    pub renames: &'static [(&'static str, &'static str)],
    /// Subset of `supported` acting as transport discriminators
    pub transport_fields: &'static [&'static str],
    pub transport_rule: TransportRule,
    pub tool_fields: Option<ToolFieldPair>,
}

/// Fields that never reach any host file, regardless of support declarations.
/// Currently just the identity field.
pub const EXCLUDED_FIELDS: &[&str] = &["name"];

pub const CLAUDE_DESKTOP: &str = "claude-desktop";
pub const CLAUDE_CODE: &str = "claude-code";
pub const CURSOR: &str = "cursor";
pub const VSCODE: &str = "vscode";
pub const CODEX: &str = "codex";
pub const GEMINI: &str = "gemini";
pub const KIRO: &str = "kiro";
pub const OPENCODE: &str = "opencode";

pub const HOSTS: &[HostFieldSpec] = &[
    // Claude Desktop: stdio only, no `type` in the file (the app infers it)
    HostFieldSpec {
        host: CLAUDE_DESKTOP,
        supported: &["command", "args", "env"],
        renames: &[],
        transport_fields: &["command"],
        transport_rule: TransportRule::ExactlyOne,
        tool_fields: None,
    },
    HostFieldSpec {
        host: CLAUDE_CODE,
        supported: &["type", "command", "args", "env", "url", "headers"],
        renames: &[],
        transport_fields: &["command", "url"],
        transport_rule: TransportRule::ExactlyOne,
        tool_fields: None,
    },
    // Cursor re-derives the transport from the payload, so `type` is unsupported
    HostFieldSpec {
        host: CURSOR,
        supported: &["command", "args", "env", "url", "headers", "cwd"],
        renames: &[],
        transport_fields: &["command", "url"],
        transport_rule: TransportRule::ExactlyOne,
        tool_fields: None,
    },
    HostFieldSpec {
        host: VSCODE,
        supported: &[
            "type", "command", "args", "env", "url", "headers", "cwd", "envFile", "inputs",
        ],
        renames: &[],
        transport_fields: &["command", "url"],
        transport_rule: TransportRule::ExactlyOne,
        tool_fields: None,
    },
    // Codex is the lone TOML host and the lone renamer
    HostFieldSpec {
        host: CODEX,
        supported: &[
            "type",
            "command",
            "args",
            "env",
            "cwd",
            "url",
            "headers",
            "timeout",
            "envFile",
            "bearerTokenEnvVar",
        ],
        renames: &[
            ("args", "arguments"),
            ("headers", "http_headers"),
            ("timeout", "startup_timeout_sec"),
            ("envFile", "env_file"),
            ("bearerTokenEnvVar", "bearer_token_env_var"),
        ],
        transport_fields: &["command", "url"],
        transport_rule: TransportRule::ExactlyOne,
        tool_fields: None,
    },
    // Gemini CLI: multi-transport, no `type` concept, carries the long tail
    HostFieldSpec {
        host: GEMINI,
        supported: &[
            "command",
            "args",
            "env",
            "cwd",
            "url",
            "httpUrl",
            "headers",
            "timeout",
            "trust",
            "includeTools",
            "excludeTools",
            "oauth",
        ],
        renames: &[],
        transport_fields: &["command", "url", "httpUrl"],
        transport_rule: TransportRule::AtLeastOneMultipleAllowed,
        tool_fields: Some(ToolFieldPair {
            allow: "includeTools",
            deny: "excludeTools",
        }),
    },
    HostFieldSpec {
        host: KIRO,
        supported: &[
            "command",
            "args",
            "env",
            "url",
            "headers",
            "disabled",
            "includeTools",
            "excludeTools",
        ],
        renames: &[("includeTools", "autoApprove"), ("excludeTools", "autoBlock")],
        transport_fields: &["command", "url"],
        transport_rule: TransportRule::ExactlyOne,
        tool_fields: Some(ToolFieldPair {
            allow: "includeTools",
            deny: "excludeTools",
        }),
    },
    // opencode uses a local/remote discriminated union; the adapter owns the
    // structural reshaping, this entry only declares the accepted surface
    HostFieldSpec {
        host: OPENCODE,
        supported: &["command", "args", "env", "url", "headers", "enabled", "oauth"],
        renames: &[],
        transport_fields: &["command", "url"],
        transport_rule: TransportRule::ExactlyOne,
        tool_fields: None,
    },
];

/// Look up the field spec for a host id
pub fn spec_for(host: &str) -> Option<&'static HostFieldSpec> {
    HOSTS.iter().find(|spec| spec.host == host)
}

/// All known host ids, in registration order
pub fn host_ids() -> Vec<&'static str> {
    HOSTS.iter().map(|spec| spec.host).collect()
}

impl HostFieldSpec {
    pub fn supports(&self, field: &str) -> bool {
        self.supported.contains(&field)
    }

    pub fn is_transport_field(&self, field: &str) -> bool {
        self.transport_fields.contains(&field)
    }

    /// Host-native name for a universal field (identity when unmapped)
    pub fn native_name<'a>(&self, field: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(from, _)| *from == field)
            .map(|(_, to)| *to)
            .unwrap_or(field)
    }

    /// Universal name for a host-native key (identity when unmapped)
    pub fn universal_name<'a>(&self, native: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(_, to)| *to == native)
            .map(|(from, _)| *from)
            .unwrap_or(native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_host_id_is_unique() {
        let ids = host_ids();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
    }

    #[test]
    fn transport_fields_are_always_supported() {
        for spec in HOSTS {
            for field in spec.transport_fields {
                assert!(
                    spec.supports(field),
                    "{}: transport field '{}' missing from supported set",
                    spec.host,
                    field
                );
            }
        }
    }

    #[test]
    fn rename_sources_are_always_supported() {
        for spec in HOSTS {
            for (from, _) in spec.renames {
                assert!(
                    spec.supports(from),
                    "{}: rename source '{}' missing from supported set",
                    spec.host,
                    from
                );
            }
        }
    }

    #[test]
    fn tool_field_pairs_are_always_supported() {
        for spec in HOSTS {
            if let Some(pair) = spec.tool_fields {
                assert!(spec.supports(pair.allow));
                assert!(spec.supports(pair.deny));
            }
        }
    }

    #[test]
    fn excluded_fields_never_appear_in_any_supported_set() {
        for spec in HOSTS {
            for excluded in EXCLUDED_FIELDS {
                assert!(
                    !spec.supports(excluded),
                    "{}: excluded field '{}' must not be declared supported",
                    spec.host,
                    excluded
                );
            }
        }
    }

    #[test]
    fn rename_map_round_trips() {
        let codex = spec_for(CODEX).expect("codex spec");
        assert_eq!(codex.native_name("args"), "arguments");
        assert_eq!(codex.universal_name("arguments"), "args");
        assert_eq!(codex.native_name("command"), "command");
    }

    #[test]
    fn only_gemini_allows_multiple_transports() {
        for spec in HOSTS {
            let multi = spec.transport_rule == TransportRule::AtLeastOneMultipleAllowed;
            assert_eq!(multi, spec.host == GEMINI);
        }
    }
}
