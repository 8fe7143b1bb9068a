//! Reading and writing scheduler snapshots as JSON state files.
//!
//! Writes go to a uniquely named sibling temporary file that is renamed over
//! the target, so a reader never observes a half-written state file and
//! overlapping writers never share a temporary file.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;

use crate::error::Result;
use crate::scheduler::SchedulerSnapshot;

/// Write `snapshot` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be encoded or the file cannot be
/// written.
pub async fn save_snapshot(path: &Path, snapshot: &SchedulerSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let json = snapshot.to_json()?;
    let tmp = temp_path(path);
    if let Err(e) = write_and_rename(&tmp, path, json).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    tracing::info!(
        path = %path.display(),
        queued = snapshot.queue.len(),
        executed = snapshot.history.len(),
        "Saved scheduler state"
    );
    Ok(())
}

/// Read a snapshot from `path`.
///
/// # Errors
///
/// Returns [`crate::error::SchedulerError::Io`] if the file cannot be read and
/// [`crate::error::SchedulerError::MalformedState`] if it is not a valid
/// snapshot.
pub async fn load_snapshot(path: &Path) -> Result<SchedulerSnapshot> {
    let raw = fs::read_to_string(path).await?;
    let snapshot = SchedulerSnapshot::from_json(&raw)?;
    tracing::info!(path = %path.display(), "Loaded scheduler state");
    Ok(snapshot)
}

/// Like [`load_snapshot`], but a missing file is `Ok(None)`.
pub async fn load_snapshot_if_exists(path: &Path) -> Result<Option<SchedulerSnapshot>> {
    match load_snapshot(path).await {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(crate::error::SchedulerError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No state file yet");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn write_and_rename(tmp: &Path, path: &Path, json: String) -> std::io::Result<()> {
    fs::write(tmp, json).await?;
    fs::rename(tmp, path).await
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `<name>.<pid>.<n>.tmp` next to `path`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("state"));
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    name.push(format!(".{}.{}.tmp", std::process::id(), n));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_paths_are_unique_siblings() {
        let target = Path::new("/var/lib/sched/state.json");
        let a = temp_path(target);
        let b = temp_path(target);
        assert_ne!(a, b);
        assert_eq!(a.parent(), target.parent());
        assert!(a.to_string_lossy().ends_with(".tmp"));
    }
}
