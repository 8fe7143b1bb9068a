//! Tests for snapshot/restore and state file handling.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use task_scheduler::config::SchedulerConfig;
use task_scheduler::persistence::{load_snapshot, load_snapshot_if_exists, save_snapshot};
use task_scheduler::scheduler::{
    JobLocation, JobStatus, Scheduler, SchedulerSnapshot, SnapshotJob,
};
use task_scheduler::{SchedulerError, SchedulerService};

fn populated_scheduler() -> Scheduler {
    let mut scheduler = Scheduler::new(7);
    for id in [10, 15, 8, 101] {
        scheduler.submit(id).unwrap();
    }
    scheduler.run_next().unwrap();
    scheduler.run_next().unwrap();
    scheduler
}

fn leftover_temp_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .ends_with(".tmp")
        })
        .count()
}

fn queued(id: i64) -> SnapshotJob {
    SnapshotJob {
        job_id: id,
        submit_timestamp: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        status: JobStatus::Queued,
        execution_timestamp: None,
    }
}

fn executed(id: i64) -> SnapshotJob {
    SnapshotJob {
        status: JobStatus::Executed,
        execution_timestamp: Some(Utc.with_ymd_and_hms(2026, 1, 2, 3, 5, 0).unwrap()),
        ..queued(id)
    }
}

// ============================================================================
// Snapshot / restore
// ============================================================================

#[test]
fn test_restore_round_trip() {
    let original = populated_scheduler();
    let snapshot = original.persist();
    assert_eq!(snapshot.queue.len(), 2);
    assert_eq!(snapshot.history.len(), 2);

    let mut restored = Scheduler::new(7);
    restored.restore(snapshot.clone()).unwrap();

    assert_eq!(restored.persist(), snapshot);
    let queue: Vec<_> = restored.queue_snapshot().iter().map(|j| j.id).collect();
    let history: Vec<_> = restored.history_snapshot().iter().map(|j| j.id).collect();
    assert_eq!(queue, vec![8, 101]);
    assert_eq!(history, vec![10, 15]);
}

#[test]
fn test_round_trip_through_json() {
    let original = populated_scheduler();
    let json = original.persist().to_json().unwrap();

    let mut restored = Scheduler::new(7);
    restored
        .restore(SchedulerSnapshot::from_json(&json).unwrap())
        .unwrap();
    assert_eq!(restored.persist(), original.persist());
}

#[test]
fn test_restore_rebuilds_index_and_executed_ids() {
    let mut scheduler = Scheduler::new(7);
    scheduler.restore(populated_scheduler().persist()).unwrap();

    assert_eq!(scheduler.find_job(8).unwrap().0, JobLocation::Queued);
    assert_eq!(scheduler.find_job(10).unwrap().0, JobLocation::Executed);
    assert!(scheduler.submit(8).unwrap_err().is_duplicate_submission());
    assert!(scheduler.submit(10).unwrap_err().is_duplicate_submission());

    // Queue and index share the restored job
    let (_, indexed) = scheduler.find_job(8).unwrap();
    assert!(Arc::ptr_eq(&indexed, &scheduler.queue_snapshot()[0]));

    assert_eq!(scheduler.run_next().unwrap().id, 8);
}

#[test]
fn test_restore_replaces_instead_of_merging() {
    let mut scheduler = Scheduler::new(7);
    scheduler.submit(500).unwrap();
    scheduler.submit(501).unwrap();
    scheduler.run_next().unwrap();

    scheduler.restore(populated_scheduler().persist()).unwrap();
    assert!(scheduler.find_job(500).is_none());
    assert!(scheduler.find_job(501).is_none());
    scheduler.submit(500).unwrap();
}

#[test]
fn test_restore_keeps_bucket_count() {
    let mut scheduler = Scheduler::new(11);
    scheduler.restore(populated_scheduler().persist()).unwrap();
    assert_eq!(scheduler.bucket_count(), 11);
}

#[test]
fn test_missing_sections_are_empty() {
    let snapshot = SchedulerSnapshot::from_json("{}").unwrap();
    assert!(snapshot.queue.is_empty());
    assert!(snapshot.history.is_empty());

    let snapshot = SchedulerSnapshot::from_json(
        r#"{"history": [{"job_id": 3, "submit_timestamp": "2026-01-02T03:04:05Z",
            "status": "executed", "execution_timestamp": "2026-01-02T03:05:00Z"}]}"#,
    )
    .unwrap();
    let mut scheduler = Scheduler::new(3);
    scheduler.restore(snapshot).unwrap();
    assert_eq!(scheduler.executed_count(), 1);
    assert_eq!(scheduler.pending_count(), 0);
}

#[test]
fn test_reads_naive_timestamps() {
    let raw = r#"{
      "queue": [
        {"job_id": 15, "submit_timestamp": "2025-11-30T18:22:41.512340",
         "status": "queued", "execution_timestamp": null}
      ],
      "history": [
        {"job_id": 10, "submit_timestamp": "2025-11-30T18:22:41.512300",
         "status": "executed", "execution_timestamp": "2025-11-30T18:22:41.513001"}
      ]
    }"#;
    let mut scheduler = Scheduler::new(7);
    scheduler.restore(SchedulerSnapshot::from_json(raw).unwrap()).unwrap();

    let (_, job) = scheduler.find_job(10).unwrap();
    assert_eq!(
        job.executed_at.unwrap(),
        Utc.with_ymd_and_hms(2025, 11, 30, 18, 22, 41).unwrap()
            + chrono::Duration::microseconds(513_001)
    );
}

#[test]
fn test_json_field_names() {
    let json = SchedulerSnapshot {
        queue: vec![queued(1)],
        history: vec![executed(2)],
    }
    .to_json()
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["queue"][0]["job_id"], 1);
    assert_eq!(value["queue"][0]["status"], "queued");
    assert_eq!(value["queue"][0]["submit_timestamp"], "2026-01-02T03:04:05Z");
    assert!(value["queue"][0]["execution_timestamp"].is_null());
    assert_eq!(value["history"][0]["status"], "executed");
    assert_eq!(value["history"][0]["execution_timestamp"], "2026-01-02T03:05:00Z");
}

#[test]
fn test_malformed_json_is_rejected() {
    for raw in [
        "not json",
        r#"{"queue": [{"job_id": 1, "status": "queued"}]}"#,
        r#"{"queue": [{"job_id": 1, "submit_timestamp": "soon", "status": "queued"}]}"#,
        r#"{"queue": [{"job_id": 1, "submit_timestamp": "2026-01-02T03:04:05Z", "status": "running"}]}"#,
    ] {
        let err = SchedulerSnapshot::from_json(raw).unwrap_err();
        assert!(matches!(err, SchedulerError::MalformedState(_)), "{raw}");
    }
}

#[test]
fn test_restore_is_atomic() {
    let mut scheduler = populated_scheduler();
    let before = scheduler.persist();

    let bad_snapshots = [
        // history entry without an execution time
        SchedulerSnapshot {
            queue: vec![queued(1)],
            history: vec![SnapshotJob {
                execution_timestamp: None,
                ..executed(2)
            }],
        },
        // executed job in the queue section
        SchedulerSnapshot {
            queue: vec![queued(1), executed(2)],
            history: vec![],
        },
        // queued job carrying an execution time
        SchedulerSnapshot {
            queue: vec![SnapshotJob {
                status: JobStatus::Queued,
                ..executed(1)
            }],
            history: vec![],
        },
        // same id twice in the queue
        SchedulerSnapshot {
            queue: vec![queued(1), queued(1)],
            history: vec![],
        },
        // same id pending and executed
        SchedulerSnapshot {
            queue: vec![queued(1)],
            history: vec![executed(1)],
        },
        // same id executed twice
        SchedulerSnapshot {
            queue: vec![],
            history: vec![executed(4), executed(4)],
        },
    ];

    for snapshot in bad_snapshots {
        let err = scheduler.restore(snapshot).unwrap_err();
        assert!(matches!(err, SchedulerError::MalformedState(_)));
        assert_eq!(scheduler.persist(), before);
    }
}

// ============================================================================
// State files
// ============================================================================

#[tokio::test]
async fn test_save_and_load_state_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/state.json");

    let snapshot = populated_scheduler().persist();
    save_snapshot(&path, &snapshot).await.unwrap();
    assert!(path.exists());
    assert_eq!(leftover_temp_files(&dir.path().join("nested")), 0);

    let loaded = load_snapshot(&path).await.unwrap();
    assert_eq!(loaded, snapshot);
}

#[tokio::test]
async fn test_missing_state_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    assert!(load_snapshot_if_exists(&path).await.unwrap().is_none());
    let err = load_snapshot(&path).await.unwrap_err();
    assert!(matches!(err, SchedulerError::Io(_)));
}

#[tokio::test]
async fn test_corrupt_state_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    tokio::fs::write(&path, "{\"queue\": [").await.unwrap();

    let err = load_snapshot_if_exists(&path).await.unwrap_err();
    assert!(matches!(err, SchedulerError::MalformedState(_)));
}

#[tokio::test]
async fn test_service_save_then_reload() {
    let dir = TempDir::new().unwrap();
    let config = SchedulerConfig::new(7, dir.path().join("state.json"));

    let service = SchedulerService::new(&config);
    assert!(!service.load_if_exists().await.unwrap());
    for id in [10, 15, 8] {
        service.submit(id).await.unwrap();
    }
    assert_eq!(service.run_next().await.unwrap().id, 10);
    service.save().await.unwrap();

    let reloaded = SchedulerService::new(&config);
    assert!(reloaded.load_if_exists().await.unwrap());
    let queue: Vec<_> = reloaded.queue_snapshot().await.iter().map(|j| j.id).collect();
    assert_eq!(queue, vec![15, 8]);
    let (location, job) = reloaded.find_job(10).await.unwrap();
    assert_eq!(location, JobLocation::Executed);
    assert_eq!(job.status, JobStatus::Executed);
    assert!(reloaded.submit(10).await.unwrap_err().is_duplicate_submission());

    // A failed load leaves the previous state in place
    tokio::fs::write(config.state_path.clone(), "garbage").await.unwrap();
    assert!(reloaded.load().await.is_err());
    assert_eq!(reloaded.queue_snapshot().await.len(), 2);
}

#[tokio::test]
async fn test_concurrent_submissions_stay_consistent() {
    let dir = TempDir::new().unwrap();
    let service = SchedulerService::new(&SchedulerConfig::new(3, dir.path().join("s.json")));

    let mut handles = Vec::new();
    for worker in 0..4 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let mut accepted = 0;
            // Every worker tries the same ids; each id must be accepted once
            for id in 0..50 {
                if service.submit(id).await.is_ok() {
                    accepted += 1;
                }
                if id % 10 == worker {
                    service.run_next().await;
                }
            }
            accepted
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        accepted += handle.await.unwrap();
    }
    assert_eq!(accepted, 50);

    service.run_all().await;
    let history: Vec<_> = service.history_snapshot().await.iter().map(|j| j.id).collect();
    let mut sorted = history.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    assert_eq!(history.len(), 50);
    assert!(service.index_snapshot().await.iter().all(|b| b.is_empty()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_all_succeed() {
    let dir = TempDir::new().unwrap();
    let config = SchedulerConfig::new(7, dir.path().join("state.json"));
    let service = SchedulerService::new(&config);
    for id in 0..2000 {
        service.submit(id).await.unwrap();
    }

    for round in 0..20 {
        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.save().await }));
        }
        // Saves racing with a mutation must still leave the newest state on disk
        service.run_next().await.unwrap();
        service.save().await.unwrap();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        service.save().await.unwrap();

        let on_disk = load_snapshot(&config.state_path).await.unwrap();
        assert_eq!(on_disk.history.len(), round + 1);
        assert_eq!(on_disk.queue.len(), 2000 - (round + 1));
    }

    assert_eq!(leftover_temp_files(dir.path()), 0);
}
