//! Age- and size-bounded pruning of cache directories.
//!
//! Eviction is best effort: every filesystem failure is logged and skipped, and
//! nothing is ever returned to the caller as an error.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::entities::CacheKey;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Which files in a directory the policy manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPattern {
    /// `<prefix>*.<ext>` with `ext` from a fixed set (case-insensitive).
    Prefixed {
        /// Required file name prefix.
        prefix: String,
        /// Accepted extensions, without the dot.
        extensions: Vec<String>,
    },
    /// `<64 lowercase hex>.<any ext>`, as written by the disk image cache.
    ContentAddressed,
}

impl EntryPattern {
    /// Pattern for exported images: `<prefix>*.jpg` and `<prefix>*.png`.
    #[must_use]
    pub fn exports(prefix: impl Into<String>) -> Self {
        Self::Prefixed {
            prefix: prefix.into(),
            extensions: vec!["jpg".to_string(), "png".to_string()],
        }
    }

    /// Returns true if `file_name` is a managed entry.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        let Some((stem, ext)) = file_name.rsplit_once('.') else {
            return false;
        };
        if ext.is_empty() {
            return false;
        }
        match self {
            Self::Prefixed { prefix, extensions } => {
                stem.starts_with(prefix.as_str())
                    && extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
            }
            Self::ContentAddressed => CacheKey::is_key_like(stem),
        }
    }
}

/// Limits applied by [`EvictionPolicy::prune`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Entries older than this are always removed.
    pub max_age: Duration,
    /// Upper bound on the total size of the remaining entries.
    pub max_total_bytes: u64,
    /// Which files are managed.
    pub pattern: EntryPattern,
}

/// Outcome of one prune run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Entries removed by the age pass.
    pub removed_by_age: usize,
    /// Entries removed by the size pass.
    pub removed_by_size: usize,
    /// Bytes released by both passes.
    pub bytes_freed: u64,
    /// Total size of managed entries after pruning.
    pub remaining_bytes: u64,
}

impl PruneReport {
    /// Returns the number of entries removed.
    #[must_use]
    pub const fn removed(&self) -> usize {
        self.removed_by_age + self.removed_by_size
    }
}

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    modified: SystemTime,
    size: u64,
}

impl EvictionPolicy {
    /// Creates a policy from day and byte limits.
    #[must_use]
    pub fn new(max_age_days: u64, max_total_bytes: u64, pattern: EntryPattern) -> Self {
        Self {
            max_age: Duration::from_secs(max_age_days.saturating_mul(SECS_PER_DAY)),
            max_total_bytes,
            pattern,
        }
    }

    /// Prunes `dir` against the current time.
    pub async fn prune(&self, dir: &Path) -> PruneReport {
        self.prune_at(dir, SystemTime::now()).await
    }

    /// Runs [`prune`](Self::prune) on a detached task.
    #[must_use = "dropping the handle detaches the prune task"]
    pub fn spawn_prune(&self, dir: PathBuf) -> JoinHandle<PruneReport> {
        let policy = self.clone();
        tokio::spawn(async move { policy.prune(&dir).await })
    }

    /// Prunes `dir` as if the current time were `now`.
    ///
    /// Age pass first, then the oldest remaining entries go until the total size
    /// fits. Running it twice with no writes in between removes nothing the second
    /// time.
    pub async fn prune_at(&self, dir: &Path, now: SystemTime) -> PruneReport {
        let mut report = PruneReport::default();

        let cutoff = now.checked_sub(self.max_age).unwrap_or(SystemTime::UNIX_EPOCH);
        for entry in self.scan(dir).await {
            if entry.modified < cutoff && remove(&entry.path).await {
                report.removed_by_age += 1;
                report.bytes_freed += entry.size;
            }
        }

        let mut entries = self.scan(dir).await;
        let mut total: u64 = entries.iter().map(|e| e.size).sum();
        if total > self.max_total_bytes {
            debug!(
                total = total,
                max_total_bytes = self.max_total_bytes,
                "Cache over size limit, removing oldest entries"
            );
            entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

            for entry in entries {
                if total <= self.max_total_bytes {
                    break;
                }
                if remove(&entry.path).await {
                    total = total.saturating_sub(entry.size);
                    report.removed_by_size += 1;
                    report.bytes_freed += entry.size;
                }
            }
        }
        report.remaining_bytes = total;

        if report.removed() > 0 {
            info!(
                dir = %dir.display(),
                removed_by_age = report.removed_by_age,
                removed_by_size = report.removed_by_size,
                bytes_freed = report.bytes_freed,
                "Pruned cache directory"
            );
        }
        report
    }

    async fn scan(&self, dir: &Path) -> Vec<Entry> {
        let mut found = Vec::new();
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(dir = %dir.display(), error = %e, "Failed to read cache dir");
                }
                return found;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            if !name.to_str().is_some_and(|n| self.pattern.matches(n)) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let modified = meta
                .modified()
                .or_else(|_| meta.created())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            found.push(Entry {
                path: entry.path(),
                modified,
                size: meta.len(),
            });
        }
        found
    }
}

/// Removes a file, treating an already-missing file as removed.
async fn remove(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed cache entry");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove cache entry");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;
    use test_case::test_case;

    const DAY: Duration = Duration::from_secs(SECS_PER_DAY);

    fn base_time() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn write_entry(dir: &Path, name: &str, size: usize, modified: SystemTime) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; size]).unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
        path
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn export_policy(max_age_days: u64, max_total_bytes: u64) -> EvictionPolicy {
        EvictionPolicy::new(max_age_days, max_total_bytes, EntryPattern::exports("lenso_export_"))
    }

    #[test_case("lenso_export_1700000000.jpg", true ; "jpg")]
    #[test_case("lenso_export_1700000000.PNG", true ; "png_uppercase")]
    #[test_case("lenso_export_1700000000.webp", false ; "other_extension")]
    #[test_case("holiday.jpg", false ; "foreign_file")]
    #[test_case("lenso_export_", false ; "no_extension")]
    #[test_case(".tmpA1b2C3", false ; "temp_file")]
    fn test_export_pattern(name: &str, expected: bool) {
        assert_eq!(EntryPattern::exports("lenso_export_").matches(name), expected);
    }

    #[test]
    fn test_content_addressed_pattern() {
        let key = CacheKey::from_url("https://cdn.example.com/a.png");
        assert!(EntryPattern::ContentAddressed.matches(&format!("{key}.png")));
        assert!(EntryPattern::ContentAddressed.matches(&format!("{key}.dat")));
        assert!(!EntryPattern::ContentAddressed.matches("overlays.json"));
        assert!(!EntryPattern::ContentAddressed.matches(key.as_str()));
    }

    #[tokio::test]
    async fn test_age_pass_removes_only_old_entries() {
        let dir = TempDir::new().unwrap();
        let now = base_time();
        write_entry(dir.path(), "lenso_export_1.jpg", 10, now - DAY * 10);
        write_entry(dir.path(), "lenso_export_2.jpg", 10, now - DAY * 8);
        write_entry(dir.path(), "lenso_export_3.png", 10, now - DAY * 2);
        write_entry(dir.path(), "lenso_export_4.jpg", 10, now);

        let report = export_policy(7, u64::MAX).prune_at(dir.path(), now).await;

        assert_eq!(report.removed_by_age, 2);
        assert_eq!(report.removed_by_size, 0);
        assert_eq!(names(dir.path()), vec!["lenso_export_3.png", "lenso_export_4.jpg"]);
    }

    #[tokio::test]
    async fn test_size_pass_removes_oldest_first() {
        let dir = TempDir::new().unwrap();
        let now = base_time();
        write_entry(dir.path(), "lenso_export_c.jpg", 100, now - DAY * 3);
        write_entry(dir.path(), "lenso_export_a.jpg", 100, now - DAY);
        write_entry(dir.path(), "lenso_export_b.jpg", 100, now - DAY * 2);
        write_entry(dir.path(), "lenso_export_d.jpg", 100, now);

        let report = export_policy(30, 250).prune_at(dir.path(), now).await;

        assert_eq!(report.removed_by_size, 2);
        assert_eq!(report.bytes_freed, 200);
        assert_eq!(report.remaining_bytes, 200);
        assert_eq!(names(dir.path()), vec!["lenso_export_a.jpg", "lenso_export_d.jpg"]);
    }

    #[tokio::test]
    async fn test_ignores_unmanaged_files() {
        let dir = TempDir::new().unwrap();
        let now = base_time();
        write_entry(dir.path(), "notes.txt", 500, now - DAY * 100);
        write_entry(dir.path(), "lenso_export_1.jpg", 50, now - DAY * 100);

        let report = export_policy(7, 0).prune_at(dir.path(), now).await;

        assert_eq!(report.removed(), 1);
        assert_eq!(report.remaining_bytes, 0);
        assert_eq!(names(dir.path()), vec!["notes.txt"]);
    }

    #[tokio::test]
    async fn test_second_prune_is_noop() {
        let dir = TempDir::new().unwrap();
        let now = base_time();
        for i in 0..6u32 {
            write_entry(
                dir.path(),
                &format!("lenso_export_{i}.jpg"),
                64,
                now - DAY * (i * 3),
            );
        }
        let policy = export_policy(10, 150);

        let first = policy.prune_at(dir.path(), now).await;
        let after_first = names(dir.path());
        let second = policy.prune_at(dir.path(), now).await;

        assert!(first.removed() > 0);
        assert_eq!(second.removed(), 0);
        assert_eq!(second.remaining_bytes, first.remaining_bytes);
        assert_eq!(names(dir.path()), after_first);
        assert!(first.remaining_bytes <= 150);
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty_report() {
        let dir = TempDir::new().unwrap();
        let report = export_policy(1, 0)
            .prune_at(&dir.path().join("missing"), base_time())
            .await;
        assert_eq!(report, PruneReport::default());
    }

    #[tokio::test]
    async fn test_spawned_prune_reports_result() {
        let dir = TempDir::new().unwrap();
        let key = CacheKey::from_url("https://cdn.example.com/old.png");
        write_entry(
            dir.path(),
            &format!("{key}.png"),
            10,
            SystemTime::now() - DAY * 40,
        );
        let policy = EvictionPolicy::new(30, u64::MAX, EntryPattern::ContentAddressed);

        let report = policy.spawn_prune(dir.path().to_path_buf()).await.unwrap();

        assert_eq!(report.removed_by_age, 1);
        assert!(names(dir.path()).is_empty());
    }
}
