use super::*;

fn tracker(tag: &str) -> SessionStateTracker {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("texbake_{tag}_{}_{stamp}", std::process::id()));
    SessionStateTracker::at(dir.join("last_session.json"))
}

#[test]
fn lifecycle_start_update_finish() {
    let t = tracker("state_life");
    assert!(t.read().is_none());
    t.start("Hero", 4).unwrap();
    let rec = t.read().unwrap();
    assert_eq!(rec.status, SessionStatus::Started);
    assert_eq!(rec.total_steps, 4);
    let started = rec.started_at;

    t.update_step(2, "Crate", "Roughness").unwrap();
    let rec = t.read().unwrap();
    assert_eq!(rec.status, SessionStatus::Running);
    assert_eq!(rec.job_name, "Hero");
    assert_eq!(rec.current_step, 2);
    assert_eq!(rec.current_object, "Crate");
    assert_eq!(rec.current_channel, "Roughness");
    assert_eq!(rec.started_at, started);

    assert!(t.has_crash_record());
    t.finish();
    assert!(!t.has_crash_record());
    t.finish();
}

#[test]
fn errors_keep_the_record() {
    let t = tracker("state_err");
    t.start("Hero", 1).unwrap();
    t.log_error("renderer crashed").unwrap();
    let rec = t.read().unwrap();
    assert_eq!(rec.status, SessionStatus::Error);
    assert_eq!(rec.last_error, "renderer crashed");
    assert!(t.has_crash_record());
    let _ = std::fs::remove_dir_all(t.path().parent().unwrap());
}

#[test]
fn corrupt_record_reads_as_absent_and_update_starts_fresh() {
    let t = tracker("state_corrupt");
    std::fs::create_dir_all(t.path().parent().unwrap()).unwrap();
    std::fs::write(t.path(), "{ not json").unwrap();
    assert!(t.read().is_none());
    assert!(t.has_crash_record());

    t.update_step(1, "Crate", "Color").unwrap();
    let rec = t.read().unwrap();
    assert_eq!(rec.status, SessionStatus::Running);
    assert_eq!(rec.job_name, "");
    let _ = std::fs::remove_dir_all(t.path().parent().unwrap());
}

#[test]
fn status_serializes_uppercase() {
    let json = serde_json::to_string(&SessionStatus::Running).unwrap();
    assert_eq!(json, "\"RUNNING\"");
}
