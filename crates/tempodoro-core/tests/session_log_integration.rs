//! Integration tests for the session history on a real SQLite file.

use chrono::{Duration, Utc};
use tempfile::TempDir;

use tempodoro_core::storage::SESSIONS_KEY;
use tempodoro_core::{
    Database, HistoryFilter, KeyValueStore, PomodoroEngine, PomodoroSettings, SessionLog,
    SessionRecord,
};

fn engine_with_cycles(cycles: u32) -> PomodoroEngine {
    let mut engine = PomodoroEngine::new(PomodoroSettings::new(1, 2, 3, 4));
    for _ in 0..cycles {
        engine.toggle();
        while engine.tick().is_none() {}
        engine.reset();
    }
    engine
}

fn open(dir: &TempDir) -> SessionLog<Database> {
    SessionLog::new(Database::open_at(&dir.path().join("tempodoro.db")).unwrap())
}

#[test]
fn saved_session_lists_back_identically() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    let mut engine = engine_with_cycles(3);

    let saved = {
        let mut log = open(&dir);
        log.save(&mut engine, now).unwrap()
    };
    assert_eq!(engine.completed_cycles(), 0);
    assert_eq!(engine.total_work_minutes(), 0);

    let log = open(&dir);
    let listed = log.list(HistoryFilter::All, Utc::now());
    assert_eq!(listed.len(), 1);
    let record: &SessionRecord = listed[0];
    assert_eq!(record, &saved);
    assert_eq!(record.completed_cycles, 3);
    assert_eq!(record.total_work_time, 3);
    assert_eq!(record.work_duration, 1);
    assert_eq!(record.break_duration, 2);
    assert_eq!(record.long_break_duration, 3);
    assert_eq!(record.sessions_before_long_break, 4);
    assert_eq!(record.id, now.timestamp_millis().to_string());
}

#[test]
fn save_with_no_cycles_leaves_the_store_alone() {
    let dir = TempDir::new().unwrap();
    let mut log = open(&dir);
    let mut engine = engine_with_cycles(0);
    assert!(log.save(&mut engine, Utc::now()).is_none());
    assert!(log.store().get(SESSIONS_KEY).unwrap().is_none());
}

#[test]
fn delete_removes_only_that_record_and_clear_empties_the_store() {
    let dir = TempDir::new().unwrap();
    let base = Utc::now();
    let mut log = open(&dir);
    let mut ids = Vec::new();
    for i in 0..3 {
        let mut engine = engine_with_cycles(1);
        ids.push(log.save(&mut engine, base + Duration::seconds(i)).unwrap().id);
    }

    assert!(log.delete(&ids[1]));
    let remaining: Vec<String> = open(&dir)
        .records()
        .iter()
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(remaining, vec![ids[2].clone(), ids[0].clone()]);

    assert!(log.clear_all());
    assert!(log.is_empty());
    assert!(log.store().get(SESSIONS_KEY).unwrap().is_none());
    assert!(open(&dir).is_empty());
}

#[test]
fn corrupt_history_reads_as_empty_and_recovers_on_next_save() {
    let dir = TempDir::new().unwrap();
    {
        let mut db = Database::open_at(&dir.path().join("tempodoro.db")).unwrap();
        db.set(SESSIONS_KEY, "[{\"id\": 12").unwrap();
    }
    let mut log = open(&dir);
    assert!(log.is_empty());

    let mut engine = engine_with_cycles(2);
    assert!(log.save(&mut engine, Utc::now()).is_some());
    assert_eq!(open(&dir).len(), 1);
}

#[test]
fn reads_history_written_by_other_front_ends() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now().timestamp_millis();
    let json = format!(
        r#"[
            {{"id":"1","date":{old},"workDuration":25,"breakDuration":5,"longBreakDuration":15,
              "sessionsBeforeLongBreak":4,"completedCycles":4,"totalWorkTime":100}},
            {{"id":"2","date":{now},"workDuration":50,"breakDuration":10,"longBreakDuration":30,
              "sessionsBeforeLongBreak":2,"completedCycles":1,"totalWorkTime":50}}
        ]"#,
        old = now - 3 * 24 * 60 * 60 * 1000,
    );
    {
        let mut db = Database::open_at(&dir.path().join("tempodoro.db")).unwrap();
        db.set(SESSIONS_KEY, &json).unwrap();
    }

    let log = open(&dir);
    let today = log.list(HistoryFilter::Today, Utc::now());
    assert_eq!(today.len(), 1);
    assert_eq!(today[0].id, "2");
    let week = log.summary(HistoryFilter::Week, Utc::now());
    assert_eq!(week.sessions, 2);
    assert_eq!(week.cycles, 5);
    assert_eq!(week.work_minutes, 150);
    assert_eq!(week.average_minutes, 75);
}
