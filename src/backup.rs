use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::fileio;
use crate::hosts::paths::backup_root;

const BACKUP_EXT: &str = "bak";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%3f";

/// One captured backup of a host configuration file
#[derive(Debug, Clone, Serialize)]
pub struct BackupRecord {
    pub hostname: String,
    pub timestamp: DateTime<Utc>,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub age_days: i64,
}

/// Timestamped backups of host configuration files, one subdirectory per
/// host under the backup root. Backups are immutable once written and only
/// ever removed through explicit retention cleanup.
pub struct BackupManager {
    root: PathBuf,
}

impl BackupManager {
    /// Manager over the default backup root (~/.mcp-hub/backups)
    pub fn new() -> Self {
        Self {
            root: backup_root(),
        }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn host_dir(&self, host: &str) -> PathBuf {
        self.root.join(host)
    }

    /// Capture a timestamped copy of `source` before it is mutated.
    /// Returns `None` when there is nothing to capture (file absent).
    pub fn create_backup(&self, host: &str, source: &Path) -> Result<Option<PathBuf>, AppError> {
        if !source.exists() {
            return Ok(None);
        }

        let dir = self.host_dir(host);
        fs::create_dir_all(&dir).map_err(|e| AppError::io(&dir, e))?;

        let stamp = Utc::now().format(TIMESTAMP_FORMAT);
        let backup_path = dir.join(format!("{host}_{stamp}.{BACKUP_EXT}"));
        fileio::copy_file(source, &backup_path)?;

        log::debug!("已备份 {} -> {}", source.display(), backup_path.display());
        Ok(Some(backup_path))
    }

    /// All backups for one host, newest first
    pub fn list_backups(&self, host: &str) -> Result<Vec<BackupRecord>, AppError> {
        let dir = self.host_dir(host);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut records = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|e| AppError::io(&dir, e))?;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().map(|ext| ext != BACKUP_EXT).unwrap_or(true) {
                continue;
            }
            let Some(timestamp) = parse_backup_timestamp(host, &path) else {
                log::warn!("忽略无法解析时间戳的备份文件: {}", path.display());
                continue;
            };
            let file_size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            records.push(BackupRecord {
                hostname: host.to_string(),
                timestamp,
                file_path: path,
                file_size,
                age_days: (now - timestamp).num_days(),
            });
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// Retention cleanup: removes the union of backups older than
    /// `older_than_days` and backups ranked beyond `keep_count` (newest kept).
    /// A no-op returning 0 when neither criterion is supplied.
    pub fn clean_backups(
        &self,
        host: &str,
        older_than_days: Option<i64>,
        keep_count: Option<usize>,
    ) -> Result<usize, AppError> {
        if older_than_days.is_none() && keep_count.is_none() {
            return Ok(0);
        }

        let records = self.list_backups(host)?;
        let mut to_delete: Vec<&BackupRecord> = Vec::new();

        for (rank, record) in records.iter().enumerate() {
            let too_old = older_than_days
                .map(|days| record.age_days > days)
                .unwrap_or(false);
            let beyond_keep = keep_count.map(|keep| rank >= keep).unwrap_or(false);
            if too_old || beyond_keep {
                to_delete.push(record);
            }
        }

        let mut removed = 0;
        for record in to_delete {
            match fs::remove_file(&record.file_path) {
                Ok(()) => removed += 1,
                Err(err) => {
                    log::warn!("删除备份失败 {}: {err}", record.file_path.display());
                }
            }
        }
        Ok(removed)
    }

    /// Restore one backup over the live file, atomically. `selector` is either
    /// a backup filename or `"latest"`.
    pub fn restore_backup(
        &self,
        host: &str,
        selector: &str,
        live_path: &Path,
    ) -> Result<PathBuf, AppError> {
        let records = self.list_backups(host)?;

        let chosen = if selector == "latest" {
            records.first()
        } else {
            records.iter().find(|r| {
                r.file_path
                    .file_name()
                    .map(|n| n == selector)
                    .unwrap_or(false)
            })
        };

        let Some(record) = chosen else {
            return Err(AppError::BackupNotFound(format!(
                "宿主 '{host}' 没有匹配 '{selector}' 的备份"
            )));
        };

        let content =
            fs::read(&record.file_path).map_err(|e| AppError::io(&record.file_path, e))?;
        fileio::atomic_write(live_path, &content)?;

        log::info!(
            "已从备份恢复 {} -> {}",
            record.file_path.display(),
            live_path.display()
        );
        Ok(record.file_path.clone())
    }
}

impl Default for BackupManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `<host>_<YYYYmmdd_HHMMSSmmm>.bak` back into its capture time,
/// falling back to the file mtime for names written by other tools.
fn parse_backup_timestamp(host: &str, path: &Path) -> Option<DateTime<Utc>> {
    let stem = path.file_stem()?.to_str()?;
    let stamp = stem.strip_prefix(&format!("{host}_"))?;
    if let Ok(naive) = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let modified = path.metadata().ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::TempDir;

    fn seeded_manager() -> (TempDir, BackupManager, PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let manager = BackupManager::with_root(dir.path().join("backups"));
        let live = dir.path().join("settings.json");
        fs::write(&live, "{}").expect("seed live file");
        (dir, manager, live)
    }

    #[test]
    fn missing_source_yields_no_backup() {
        let dir = TempDir::new().expect("temp dir");
        let manager = BackupManager::with_root(dir.path());
        let result = manager
            .create_backup("gemini", &dir.path().join("absent.json"))
            .expect("create");
        assert!(result.is_none());
    }

    #[test]
    fn backups_list_newest_first() {
        let (_dir, manager, live) = seeded_manager();
        for _ in 0..3 {
            manager.create_backup("gemini", &live).expect("backup");
            sleep(Duration::from_millis(5));
        }

        let records = manager.list_backups("gemini").expect("list");
        assert_eq!(records.len(), 3);
        assert!(records[0].timestamp >= records[1].timestamp);
        assert!(records[1].timestamp >= records[2].timestamp);
    }

    #[test]
    fn keep_count_removes_exactly_the_oldest() {
        let (_dir, manager, live) = seeded_manager();
        let mut created = Vec::new();
        for _ in 0..5 {
            created.push(
                manager
                    .create_backup("gemini", &live)
                    .expect("backup")
                    .expect("path"),
            );
            sleep(Duration::from_millis(5));
        }

        let removed = manager
            .clean_backups("gemini", None, Some(2))
            .expect("clean");
        assert_eq!(removed, 3);

        let remaining = manager.list_backups("gemini").expect("list");
        assert_eq!(remaining.len(), 2);
        // The two newest captures must be the survivors
        let survivors: Vec<_> = remaining.iter().map(|r| r.file_path.clone()).collect();
        assert!(survivors.contains(created.last().expect("last")));
    }

    #[test]
    fn clean_without_criteria_is_a_no_op() {
        let (_dir, manager, live) = seeded_manager();
        manager.create_backup("gemini", &live).expect("backup");

        let removed = manager.clean_backups("gemini", None, None).expect("clean");
        assert_eq!(removed, 0);
        assert_eq!(manager.list_backups("gemini").expect("list").len(), 1);
    }

    #[test]
    fn restore_latest_rewrites_the_live_file() {
        let (_dir, manager, live) = seeded_manager();
        fs::write(&live, "original").expect("seed");
        manager.create_backup("gemini", &live).expect("backup");
        fs::write(&live, "clobbered").expect("clobber");

        manager
            .restore_backup("gemini", "latest", &live)
            .expect("restore");
        assert_eq!(fs::read_to_string(&live).expect("read"), "original");
    }

    #[test]
    fn restore_without_backups_is_a_distinguishable_error() {
        let (_dir, manager, live) = seeded_manager();
        let err = manager
            .restore_backup("gemini", "latest", &live)
            .expect_err("must fail");
        assert!(matches!(err, AppError::BackupNotFound(_)));
    }
}
