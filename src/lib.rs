mod adapters;
mod backup;
mod error;
mod fields;
mod fileio;
mod hosts;
mod merge;
mod model;
mod report;
mod service;

pub use adapters::{AdapterRegistry, HostAdapter, OpencodeAdapter, StandardAdapter};
pub use backup::{BackupManager, BackupRecord};
pub use error::AppError;
pub use fields::{
    host_ids, spec_for, HostFieldSpec, ToolFieldPair, TransportRule, EXCLUDED_FIELDS,
};
pub use fileio::{
    atomic_write, copy_file, delete_file, read_json_file, read_json_value, write_json_file,
    write_text_file,
};
pub use hosts::{host_config_path, set_base_dir_override, strategy_for, HostStrategy};
pub use merge::merge_partial_update;
pub use model::{HostConfiguration, OauthConfig, ServerConfig, Transport};
pub use report::{
    generate_report, ConversionReport, FieldOperation, FieldOperationKind, Operation,
};
pub use service::{
    ConfigurationResult, ConfigureOptions, EnvironmentSource, ServerFilter, SyncResult,
    SyncService, SyncSource,
};
