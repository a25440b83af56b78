//! A session wired to the SQLite store through `DbHooks`.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use pomocycle_core::{
    Clock, CycleDurations, CycleSession, Database, DbHooks, FakeClock, FatigueConfig, TaskCategory,
    TaskFilter, TaskRecord, TaskStatus, TimerMode,
};

fn wired(db: &Arc<Mutex<Database>>, durations: CycleDurations) -> CycleSession {
    let hooks = DbHooks::new(Arc::clone(db), Some("user-7".into()));
    CycleSession::new(durations, FatigueConfig::default())
        .with_session_emitter(hooks.clone())
        .with_progress_updater(hooks.clone())
        .with_overwork_log(hooks.clone())
        .with_task_lookup(hooks)
}

#[test]
fn focus_phases_land_in_the_database() {
    let db = Arc::new(Mutex::new(Database::open_memory().unwrap()));
    let task = TaskRecord::new("Write chapter", TaskCategory::Study, 2).unwrap();
    db.lock().unwrap().insert_task(&task).unwrap();

    let mut session = wired(&db, CycleDurations::new(120, 60, 300, 4));
    let clock = FakeClock::new();
    session.select_task(&task.id, clock.now());

    for _ in 0..2 {
        session.start(clock.now());
        clock.advance_secs(120);
        session.reconcile(clock.now());
        assert_eq!(session.engine().mode(), TimerMode::ShortBreak);
        session.start(clock.now());
        clock.advance_secs(60);
        session.reconcile(clock.now());
    }

    let db = db.lock().unwrap();
    let sessions = db.list_sessions(10).unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().all(|s| s.duration_min == 2));
    assert!(sessions.iter().all(|s| s.task_id.as_deref() == Some(task.id.as_str())));
    assert!(sessions.iter().all(|s| s.user_id.as_deref() == Some("user-7")));

    let stored = db.get_task(&task.id).unwrap().unwrap();
    assert_eq!(stored.pomodoros_completed, 2);
    assert_eq!(stored.status, TaskStatus::Completed);
    assert!(db.list_tasks(TaskFilter::Active).unwrap().is_empty());

    let stats = db.stats().unwrap();
    assert_eq!(stats.total_pomodoros, 2);
    assert_eq!(stats.total_focus_min, 4);
    assert_eq!(stats.tasks_done, 1);
}

#[test]
fn completed_task_in_store_cannot_be_selected() {
    let db = Arc::new(Mutex::new(Database::open_memory().unwrap()));
    let task = TaskRecord::new("Done already", TaskCategory::Work, 1).unwrap();
    {
        let db = db.lock().unwrap();
        db.insert_task(&task).unwrap();
        db.set_task_status(&task.id, TaskStatus::Completed).unwrap();
    }

    let mut session = wired(&db, CycleDurations::default());
    assert!(session.select_task(&task.id, Utc::now()).is_empty());
    assert!(session.engine().selected_task().is_none());
}

#[test]
fn cycle_fatigue_is_logged_with_account() {
    let db = Arc::new(Mutex::new(Database::open_memory().unwrap()));
    let mut session = wired(&db, CycleDurations::new(60, 60, 60, 1));
    let clock = FakeClock::new();

    session.start(clock.now());
    clock.advance_secs(60);
    session.reconcile(clock.now());

    let db = db.lock().unwrap();
    let logs = db.list_overwork(10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].rule_code, "pomodoro-cycle");
    assert_eq!(logs[0].user_id.as_deref(), Some("user-7"));
    assert!(!logs[0].notes.is_empty());
    assert_eq!(db.stats().unwrap().overwork_events, 1);
}

#[test]
fn unknown_task_progress_does_not_stop_the_cycle() {
    let db = Arc::new(Mutex::new(Database::open_memory().unwrap()));
    let task = TaskRecord::new("Ephemeral", TaskCategory::Personal, 3).unwrap();
    db.lock().unwrap().insert_task(&task).unwrap();

    let mut session = wired(&db, CycleDurations::new(60, 60, 60, 4));
    let clock = FakeClock::new();
    session.select_task(&task.id, clock.now());
    session.start(clock.now());

    // Deleted while the focus phase runs.
    db.lock().unwrap().delete_task(&task.id).unwrap();
    clock.advance_secs(60);
    session.reconcile(clock.now());

    assert_eq!(session.engine().mode(), TimerMode::ShortBreak);
    assert_eq!(db.lock().unwrap().list_sessions(10).unwrap().len(), 1);
}
